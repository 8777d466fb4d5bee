//! Loading of compiled contract artifacts (ABI + creation bytecode)

use std::{
    fs,
    path::{Path, PathBuf},
};

use alloy_primitives::Bytes;
use serde::Deserialize;
use serde_json::Value;

use crate::errors::ScriptError;

/// The creation bytecode field, either a bare hex string (hardhat) or an
/// object with the hex string under `object` (foundry)
#[derive(Deserialize)]
#[serde(untagged)]
enum BytecodeField {
    /// `"bytecode": "0x..."`
    Hex(Bytes),
    /// `"bytecode": { "object": "0x..." }`
    Object {
        /// The creation bytecode
        object: Bytes,
    },
}

/// The subset of an artifact file the scripts read
#[derive(Deserialize)]
struct ArtifactFile {
    /// The contract ABI
    abi: Value,
    /// The creation bytecode
    bytecode: BytecodeField,
}

/// A compiled contract
#[derive(Clone, Debug, PartialEq)]
pub struct ContractArtifact {
    /// The contract name, e.g. `RiverV1`
    pub contract_name: String,
    /// The contract ABI
    pub abi: Value,
    /// The creation bytecode
    pub bytecode: Bytes,
}

impl ContractArtifact {
    /// The init code deploying this contract with the given encoded constructor arguments
    pub fn init_code(&self, encoded_args: &[u8]) -> Bytes {
        [self.bytecode.as_ref(), encoded_args].concat().into()
    }
}

/// Remove the constructor from an ABI
pub fn abi_without_constructor(abi: &Value) -> Vec<Value> {
    abi_entries(abi)
        .filter(|entry| entry["type"] != "constructor")
        .cloned()
        .collect()
}

/// The ABI entries that may change state, i.e. everything but `view` and `pure` functions
pub fn mutating_entries(abi: &Value) -> Vec<Value> {
    abi_entries(abi)
        .filter(|entry| {
            entry["stateMutability"] != "view" && entry["stateMutability"] != "pure"
        })
        .cloned()
        .collect()
}

/// The entries of an ABI, none if it is not an array
fn abi_entries(abi: &Value) -> impl Iterator<Item = &Value> {
    abi.as_array().into_iter().flatten()
}

/// A directory of compiled artifacts, either flat (`<dir>/<Name>.json`) or in
/// the foundry layout (`<dir>/<Name>.sol/<Name>.json`)
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    /// The artifacts directory
    dir: PathBuf,
}

impl ArtifactStore {
    /// Open the artifacts directory
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Load the artifact of `contract_name`
    pub fn load(&self, contract_name: &str) -> Result<ContractArtifact, ScriptError> {
        let candidates = [
            self.dir.join(format!("{contract_name}.json")),
            self.dir
                .join(format!("{contract_name}.sol"))
                .join(format!("{contract_name}.json")),
        ];

        let path = candidates
            .iter()
            .find(|path| path.exists())
            .ok_or_else(|| {
                ScriptError::ArtifactParsing(format!(
                    "no artifact for {contract_name} in {}",
                    self.dir.display()
                ))
            })?;

        let content = fs::read_to_string(path)
            .map_err(|e| ScriptError::ArtifactParsing(format!("{}: {}", path.display(), e)))?;
        let file: ArtifactFile = serde_json::from_str(&content)
            .map_err(|e| ScriptError::ArtifactParsing(format!("{}: {}", path.display(), e)))?;

        let bytecode = match file.bytecode {
            BytecodeField::Hex(bytecode) | BytecodeField::Object { object: bytecode } => bytecode,
        };
        if bytecode.is_empty() {
            return Err(ScriptError::ArtifactParsing(format!(
                "{contract_name} has no creation bytecode (abstract contract or interface?)"
            )));
        }

        Ok(ContractArtifact {
            contract_name: contract_name.to_string(),
            abi: file.abi,
            bytecode,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_load_both_layouts() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("Firewall.json"),
            json!({ "contractName": "Firewall", "abi": [], "bytecode": "0x6001" }).to_string(),
        )
        .unwrap();
        fs::create_dir_all(dir.path().join("TUPProxy.sol")).unwrap();
        fs::write(
            dir.path().join("TUPProxy.sol").join("TUPProxy.json"),
            json!({ "abi": [], "bytecode": { "object": "0x6002" } }).to_string(),
        )
        .unwrap();

        let store = ArtifactStore::new(dir.path());
        assert_eq!(
            store.load("Firewall").unwrap().bytecode,
            Bytes::from(vec![0x60, 0x01])
        );
        assert_eq!(
            store.load("TUPProxy").unwrap().bytecode,
            Bytes::from(vec![0x60, 0x02])
        );
        assert!(matches!(
            store.load("RiverV1"),
            Err(ScriptError::ArtifactParsing(_))
        ));
    }

    #[test]
    fn test_abi_filters() {
        let abi = json!([
            { "type": "constructor", "inputs": [] },
            { "type": "function", "name": "getOracle", "stateMutability": "view" },
            { "type": "function", "name": "setOracle", "stateMutability": "nonpayable" },
            { "type": "function", "name": "version", "stateMutability": "pure" },
            { "type": "event", "name": "SetOracle" },
        ]);

        let names = |entries: Vec<Value>| -> Vec<String> {
            entries
                .iter()
                .map(|e| e["name"].as_str().unwrap_or("constructor").to_string())
                .collect()
        };

        assert_eq!(
            names(abi_without_constructor(&abi)),
            vec!["getOracle", "setOracle", "version", "SetOracle"]
        );
        assert_eq!(
            names(mutating_entries(&abi)),
            vec!["constructor", "setOracle", "SetOracle"]
        );
    }

    #[test]
    fn test_init_code_appends_args() {
        let artifact = ContractArtifact {
            contract_name: "Firewall".to_string(),
            abi: json!([]),
            bytecode: Bytes::from(vec![0xaa]),
        };

        assert_eq!(
            artifact.init_code(&[0xbb, 0xcc]),
            Bytes::from(vec![0xaa, 0xbb, 0xcc])
        );
    }
}
