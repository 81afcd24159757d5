use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use alloy::primitives::{Address, B256};
use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};

/// A recorded contract deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub address: Address,
    pub tx_hash: B256,
    /// Unix seconds
    pub deployed_at: u64,
}

/// Deployed addresses for one network, persisted as `<dir>/<network>.json`
///
/// Only the deployment runner writes here. Lookups never trigger deployments
/// and the runner never consults the registry to skip steps.
#[derive(Debug)]
pub struct DeploymentRegistry {
    network: String,
    path: Option<PathBuf>,
    records: BTreeMap<String, DeploymentRecord>,
}

impl DeploymentRegistry {
    /// Load the registry for `network`; a missing file is an empty registry
    pub fn load(dir: &Path, network: &str) -> Result<Self> {
        let path = dir.join(format!("{}.json", network));

        let records = if path.exists() {
            let content =
                fs::read_to_string(&path).wrap_err_with(|| format!("Failed to read {:?}", path))?;
            serde_json::from_str(&content).wrap_err_with(|| format!("Failed to parse {:?}", path))?
        } else {
            BTreeMap::new()
        };

        tracing::debug!(network, count = records.len(), "Loaded deployment registry");

        Ok(Self {
            network: network.to_string(),
            path: Some(path),
            records,
        })
    }

    /// Registry that is never written to disk
    #[cfg(test)]
    pub fn in_memory(network: &str) -> Self {
        Self {
            network: network.to_string(),
            path: None,
            records: BTreeMap::new(),
        }
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn get(&self, artifact: &str) -> Option<&DeploymentRecord> {
        self.records.get(artifact)
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = (&String, &DeploymentRecord)> {
        self.records.iter()
    }

    /// Record (or replace) the instance for `artifact` and persist immediately
    pub fn record(&mut self, artifact: &str, address: Address, tx_hash: B256) -> Result<()> {
        let deployed_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        self.records.insert(
            artifact.to_string(),
            DeploymentRecord {
                address,
                tx_hash,
                deployed_at,
            },
        );
        self.save()
    }

    fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .wrap_err_with(|| format!("Failed to create {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(&self.records)?;
        fs::write(path, content).wrap_err_with(|| format!("Failed to write {:?}", path))?;
        Ok(())
    }
}
