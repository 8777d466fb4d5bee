//! Waiting on the River administrator to point River at the Oracle

use std::io::{self, Write};

use tokio::time::sleep;
use tracing::debug;

use crate::{
    chain::Chain,
    constants::{ORACLE, POLL_DOTS_PER_LINE, RIVER},
    deployer::DeployContext,
    errors::ScriptError,
    solidity::{getAdministratorCall, getOracleCall},
};

use super::log_administrator_hint;

/// Whether River already points at the deployed Oracle
pub(super) async fn oracle_is_set<C: Chain>(ctx: &DeployContext<C>) -> Result<bool, ScriptError> {
    let river = ctx.store.require(RIVER)?.address;
    let oracle = ctx.store.require(ORACLE)?.address;

    Ok(ctx.read(river, getOracleCall {}).await?.oracle == oracle)
}

/// Ask the River administrator to call `setOracle` and poll River until it did
pub(super) async fn run<C: Chain>(ctx: &DeployContext<C>) -> Result<(), ScriptError> {
    let river = ctx.store.require(RIVER)?.address;
    let oracle = ctx.store.require(ORACLE)?.address;

    if ctx.read(river, getOracleCall {}).await?.oracle != oracle {
        let administrator = ctx
            .read(river, getAdministratorCall {})
            .await?
            .administrator;
        log_administrator_hint(
            administrator,
            river,
            "setOracle(address)",
            &[oracle.to_string()],
            None,
        );
    }

    let mut rounds = 0u64;
    while ctx.read(river, getOracleCall {}).await?.oracle != oracle {
        print!(".");
        if let Err(e) = io::stdout().flush() {
            debug!("Failed to flush progress dots: {e}");
        }

        sleep(ctx.poll_interval).await;
        rounds += 1;
        if rounds % POLL_DOTS_PER_LINE == 0 {
            println!();
        }
    }

    if rounds % POLL_DOTS_PER_LINE != 0 {
        println!();
    }

    Ok(())
}
