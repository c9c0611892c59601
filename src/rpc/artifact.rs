use serde::Deserialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::core::error::FactoryError;
use crate::core::plan::DeploymentUnit;

/// The part of a Hardhat compilation artifact the factory needs.
#[derive(Debug, Deserialize)]
pub struct Artifact {
    #[serde(rename = "contractName", default)]
    pub contract_name: Option<String>,
    pub bytecode: String,
}

/// Looks up compiled unit definitions under an artifacts directory
/// (`<root>/contracts/<File>.sol/<Unit>.json`, at any depth).
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn locate(&self, unit: &DeploymentUnit) -> Option<PathBuf> {
        let file_name = format!("{}.json", unit.name());
        WalkDir::new(&self.root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| !entry.path().components().any(|c| c.as_os_str() == "build-info"))
            .find(|entry| entry.file_name().to_str() == Some(file_name.as_str()))
            .map(|entry| entry.into_path())
    }

    pub fn load(&self, unit: &DeploymentUnit) -> Result<Artifact, FactoryError> {
        let path = self
            .locate(unit)
            .ok_or_else(|| FactoryError::UnknownUnit(unit.name().to_string()))?;
        log::debug!("Loading artifact for {} from {}", unit, path.display());
        let raw = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Creation bytecode of `unit`, without the `0x` prefix.
    pub fn bytecode(&self, unit: &DeploymentUnit) -> Result<String, FactoryError> {
        let artifact = self.load(unit)?;
        let code = artifact.bytecode.trim_start_matches("0x");
        if code.is_empty() {
            return Err(FactoryError::Rejected(format!(
                "{} has no creation bytecode (abstract contract or interface?)",
                unit
            )));
        }
        Ok(code.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_artifact(root: &Path, file: &str, name: &str, bytecode: &str) {
        let dir = root.join("contracts").join(file);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join(format!("{}.json", name)),
            format!(
                r#"{{"contractName":"{}","abi":[],"bytecode":"{}"}}"#,
                name, bytecode
            ),
        )
        .unwrap();
    }

    #[test]
    fn test_finds_nested_artifact() {
        let tmp = tempfile::tempdir().unwrap();
        write_artifact(tmp.path(), "MyToken.sol", "MyToken", "0x6080");
        fs::write(
            tmp.path().join("contracts/MyToken.sol/MyToken.dbg.json"),
            r#"{"buildInfo":"x"}"#,
        )
        .unwrap();

        let store = ArtifactStore::new(tmp.path());
        let unit = DeploymentUnit::new("MyToken");
        assert_eq!(store.bytecode(&unit).unwrap(), "6080");
        assert_eq!(
            store.load(&unit).unwrap().contract_name.as_deref(),
            Some("MyToken")
        );
    }

    #[test]
    fn test_unknown_unit() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(tmp.path());
        assert!(matches!(
            store.bytecode(&DeploymentUnit::new("Missing")),
            Err(FactoryError::UnknownUnit(name)) if name == "Missing"
        ));
    }

    #[test]
    fn test_interface_has_no_bytecode() {
        let tmp = tempfile::tempdir().unwrap();
        write_artifact(tmp.path(), "IToken.sol", "IToken", "0x");
        let store = ArtifactStore::new(tmp.path());
        assert!(matches!(
            store.bytecode(&DeploymentUnit::new("IToken")),
            Err(FactoryError::Rejected(_))
        ));
    }
}
