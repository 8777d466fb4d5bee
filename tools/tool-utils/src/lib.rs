//! Helpers shared by the operator-facing tools: running external commands
//! and prompting the operator on the terminal.

use eyre::{eyre, Result};
use std::io::{self, Write};
use std::process::{Command, Stdio};

/// Execute a command with real-time output streaming, failing on a non-zero exit status
pub fn run_command(mut cmd: Command) -> Result<()> {
    cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
    let status = cmd.status()?;

    if status.success() {
        Ok(())
    } else {
        Err(eyre!("Command failed with status: {}", status))
    }
}

/// General function to prompt for input with a specific message
pub fn prompt_for_input(prompt: &str) -> io::Result<String> {
    print!("{}: ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    Ok(input.trim().to_string())
}

/// Prompt the operator for a yes / no answer, re-prompting until one is given
pub fn prompt_for_confirmation(prompt: &str) -> Result<bool> {
    loop {
        let input = prompt_for_input(&format!("{prompt} [y/n]"))?;
        match parse_confirmation(&input) {
            Some(answer) => return Ok(answer),
            None => println!("Please answer 'y' or 'n'."),
        }
    }
}

/// Parse a yes / no answer, accepting the usual short and long forms
fn parse_confirmation(input: &str) -> Option<bool> {
    match input.to_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_confirmation() {
        assert_eq!(parse_confirmation("Y"), Some(true));
        assert_eq!(parse_confirmation("yes"), Some(true));
        assert_eq!(parse_confirmation("No"), Some(false));
        assert_eq!(parse_confirmation(""), None);
        assert_eq!(parse_confirmation("maybe"), None);
    }

    #[test]
    fn test_run_command_reports_failure() {
        assert!(run_command(Command::new("true")).is_ok());
        assert!(run_command(Command::new("false")).is_err());
    }
}
