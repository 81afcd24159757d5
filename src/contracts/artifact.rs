use std::fs;

use alloy::primitives::Bytes;
use serde_json::Value;

use super::abi::{ContractAbi, parse_abi};
use super::codec::encode_params;
use crate::error::{HarnessError, HarnessResult};
use crate::project::Project;

/// Compiled contract: ABI plus creation bytecode
#[derive(Debug, Clone)]
pub struct ContractArtifact {
    pub name: String,
    pub abi: ContractAbi,
    pub bytecode: Bytes,
}

impl ContractArtifact {
    /// Parse a Truffle, Foundry or Hardhat artifact
    pub fn from_json(name: &str, content: &str) -> HarnessResult<Self> {
        let invalid = |reason: String| {
            HarnessError::ArtifactNotFound(format!("{}: {}", name, reason))
        };

        let json: Value = serde_json::from_str(content).map_err(|e| invalid(e.to_string()))?;

        let abi = json
            .get("abi")
            .ok_or_else(|| invalid("missing abi".to_string()))?;
        let abi = parse_abi(abi)?;

        // Truffle and Hardhat store a hex string, Foundry nests it under "object"
        let bytecode = match json.get("bytecode") {
            Some(Value::String(hex)) => hex.as_str(),
            Some(Value::Object(obj)) => obj.get("object").and_then(Value::as_str).unwrap_or(""),
            _ => "",
        };
        let bytecode = hex::decode(bytecode.strip_prefix("0x").unwrap_or(bytecode))
            .map_err(|e| invalid(format!("bad bytecode: {}", e)))?;

        Ok(Self {
            name: name.to_string(),
            abi,
            bytecode: bytecode.into(),
        })
    }

    /// Creation bytecode with the ABI-encoded constructor arguments appended
    pub fn creation_code(&self, args: &[String]) -> HarnessResult<Bytes> {
        if self.bytecode.is_empty() {
            return Err(HarnessError::InvalidArgument(format!(
                "{} has no creation bytecode (abstract contract or interface?)",
                self.name
            )));
        }

        let params = self.abi.constructor.as_deref().unwrap_or(&[]);
        let mut code = self.bytecode.to_vec();
        code.extend(encode_params(params, args)?);
        Ok(code.into())
    }
}

/// Where contract artifacts come from
pub trait ArtifactSource {
    fn load(&self, name: &str) -> HarnessResult<ContractArtifact>;
}

/// Artifacts read from a project's build output
pub struct ArtifactStore {
    project: Project,
}

impl ArtifactStore {
    pub fn new(project: Project) -> Self {
        Self { project }
    }
}

impl ArtifactSource for ArtifactStore {
    fn load(&self, name: &str) -> HarnessResult<ContractArtifact> {
        let path = self.project.artifact_path(name);
        let content = fs::read_to_string(&path).map_err(|e| {
            HarnessError::ArtifactNotFound(format!("{} ({}: {})", name, path.display(), e))
        })?;

        tracing::debug!(artifact = name, path = %path.display(), "Loaded artifact");
        ContractArtifact::from_json(name, &content)
    }
}

#[cfg(test)]
impl ArtifactSource for Vec<ContractArtifact> {
    fn load(&self, name: &str) -> HarnessResult<ContractArtifact> {
        self.iter()
            .find(|a| a.name == name)
            .cloned()
            .ok_or_else(|| HarnessError::ArtifactNotFound(name.to_string()))
    }
}
