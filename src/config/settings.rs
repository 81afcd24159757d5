use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use eyre::{Result, WrapErr};
use serde::Deserialize;

use super::network::{ChainId, NetworkName, NetworkProfile, SignerConfig};
use crate::error::{HarnessError, HarnessResult};

const CONFIG_DIR: &str = "campaign-deployer";
const CONFIG_FILE: &str = "networks.toml";

/// Network settings file; every section overrides one built-in profile
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkOverride>,

    #[serde(default)]
    pub defaults: Option<Defaults>,

    #[serde(skip)]
    config_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkOverride {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub chain_id: Option<ChainId>,
    pub gas_limit: Option<u64>,
    pub gas_price: Option<u64>,
    pub signer: Option<SignerConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Defaults {
    pub network: Option<String>,
}

impl Settings {
    /// Load settings from the default location, or fall back to built-ins
    pub fn load() -> Result<Self> {
        match Self::default_config_path() {
            Ok(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config file: {:?}", path))?;

        let mut settings = Self::parse(&content)
            .wrap_err_with(|| format!("Invalid config file: {:?}", path))?;

        settings.config_path = Some(path.to_path_buf());
        tracing::debug!("Loaded network settings from {:?}", path);
        Ok(settings)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content).wrap_err("Failed to parse config file")?;

        // Only the static network set may be configured
        for name in settings.networks.keys() {
            name.parse::<NetworkName>()?;
        }

        Ok(settings)
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre::eyre!("Could not determine config directory"))?;

        Ok(config_dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Name of the network to use when none is given on the command line
    pub fn default_network(&self) -> &str {
        self.defaults
            .as_ref()
            .and_then(|d| d.network.as_deref())
            .unwrap_or(NetworkName::Development.as_str())
    }

    /// Resolve the active profile by name
    pub fn resolve(&self, name: &str) -> HarnessResult<NetworkProfile> {
        let network: NetworkName = name.parse()?;
        let mut profile = NetworkProfile::builtin(network);

        if let Some(overrides) = self.networks.get(name) {
            if let Some(host) = &overrides.host {
                profile.host = host.clone();
            }
            if let Some(port) = overrides.port {
                profile.port = port;
            }
            if let Some(chain_id) = overrides.chain_id {
                profile.chain_id = chain_id;
            }
            if let Some(signer) = &overrides.signer {
                profile.signer = Some(signer.clone());
            }
            if overrides.gas_limit.is_some() || overrides.gas_price.is_some() {
                let base = profile.gas.unwrap_or_default();
                let gas = base.with_overrides(overrides.gas_limit, overrides.gas_price)?;
                profile.gas = Some(gas);
            }
        }

        if let Some(signer) = &profile.signer {
            if !signer.mnemonic.is_external() {
                return Err(HarnessError::PlaintextSecret("mnemonic".to_string()));
            }
        }

        tracing::debug!(
            network = %network,
            chain_id = %profile.chain_id,
            "Resolved network profile"
        );
        Ok(profile)
    }

    /// All resolvable profiles, in declaration order
    pub fn profiles(&self) -> HarnessResult<Vec<NetworkProfile>> {
        NetworkName::ALL
            .iter()
            .map(|name| self.resolve(name.as_str()))
            .collect()
    }
}
