use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use zeroize::Zeroizing;

use super::secrets::SecretRef;
use crate::error::{HarnessError, HarnessResult};

pub const DEFAULT_GAS_LIMIT: u64 = 4_500_000;
pub const DEFAULT_GAS_PRICE: u128 = 1_000_000_000;
pub const DEFAULT_SIGNER_ACCOUNTS: u32 = 3;

/// The statically enumerated networks a run may target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NetworkName {
    Development,
    Testnet,
    Infura,
}

impl NetworkName {
    pub const ALL: [NetworkName; 3] = [
        NetworkName::Development,
        NetworkName::Testnet,
        NetworkName::Infura,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkName::Development => "development",
            NetworkName::Testnet => "testnet",
            NetworkName::Infura => "infura",
        }
    }
}

impl FromStr for NetworkName {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NetworkName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| HarnessError::UnknownNetwork(s.to_string()))
    }
}

impl fmt::Display for NetworkName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chain identifier a profile accepts; `"*"` matches any chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "RawChainId")]
pub enum ChainId {
    #[default]
    Any,
    Id(u64),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawChainId {
    Id(u64),
    Text(String),
}

impl TryFrom<RawChainId> for ChainId {
    type Error = String;

    fn try_from(raw: RawChainId) -> Result<Self, Self::Error> {
        match raw {
            RawChainId::Id(id) => Ok(ChainId::Id(id)),
            RawChainId::Text(text) if text == "*" => Ok(ChainId::Any),
            RawChainId::Text(text) => text
                .parse()
                .map(ChainId::Id)
                .map_err(|_| format!("invalid chain id '{}'", text)),
        }
    }
}

impl ChainId {
    pub fn matches(&self, actual: u64) -> bool {
        match self {
            ChainId::Any => true,
            ChainId::Id(id) => *id == actual,
        }
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainId::Any => f.write_str("*"),
            ChainId::Id(id) => write!(f, "{}", id),
        }
    }
}

/// Gas bounds attached to every deployment and state-changing call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasPolicy {
    gas_limit: u64,
    gas_price: u128,
}

impl GasPolicy {
    pub fn new(gas_limit: u64, gas_price: u128) -> HarnessResult<Self> {
        if gas_limit == 0 || gas_price == 0 {
            return Err(HarnessError::InvalidGasPolicy {
                gas_limit,
                gas_price,
            });
        }
        Ok(Self {
            gas_limit,
            gas_price,
        })
    }

    pub fn gas_limit(&self) -> u64 {
        self.gas_limit
    }

    /// Price per gas unit in wei
    pub fn gas_price(&self) -> u128 {
        self.gas_price
    }

    /// Fill unset fields from `self`, validating the result
    pub fn with_overrides(
        &self,
        gas_limit: Option<u64>,
        gas_price: Option<u64>,
    ) -> HarnessResult<Self> {
        GasPolicy::new(
            gas_limit.unwrap_or(self.gas_limit),
            gas_price.map(u128::from).unwrap_or(self.gas_price),
        )
    }
}

impl Default for GasPolicy {
    fn default() -> Self {
        Self {
            gas_limit: DEFAULT_GAS_LIMIT,
            gas_price: DEFAULT_GAS_PRICE,
        }
    }
}

/// Transaction-signing capability for remote endpoints
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignerConfig {
    pub mnemonic: SecretRef,
    pub rpc_url: SecretRef,
    #[serde(default = "default_signer_accounts")]
    pub accounts: u32,
}

fn default_signer_accounts() -> u32 {
    DEFAULT_SIGNER_ACCOUNTS
}

impl SignerConfig {
    /// Resolve the recovery phrase; literals in configuration are refused
    pub fn mnemonic_phrase(&self) -> HarnessResult<Zeroizing<String>> {
        if !self.mnemonic.is_external() {
            return Err(HarnessError::PlaintextSecret("mnemonic".to_string()));
        }
        self.mnemonic.resolve()
    }
}

/// A resolved, immutable network profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkProfile {
    pub name: NetworkName,
    pub host: String,
    pub port: u16,
    pub chain_id: ChainId,
    pub signer: Option<SignerConfig>,
    pub gas: Option<GasPolicy>,
}

impl NetworkProfile {
    /// Built-in profile for a network before any file overrides
    pub fn builtin(name: NetworkName) -> Self {
        match name {
            NetworkName::Development => Self::local(name, 7545),
            NetworkName::Testnet => Self::local(name, 8545),
            NetworkName::Infura => Self {
                name,
                host: "ropsten.infura.io".to_string(),
                port: 443,
                chain_id: ChainId::Id(3),
                signer: Some(SignerConfig {
                    mnemonic: SecretRef::Env("MNEMONIC".to_string()),
                    rpc_url: SecretRef::Env("INFURA_URL".to_string()),
                    accounts: DEFAULT_SIGNER_ACCOUNTS,
                }),
                gas: Some(GasPolicy {
                    gas_limit: DEFAULT_GAS_LIMIT,
                    gas_price: DEFAULT_GAS_PRICE,
                }),
            },
        }
    }

    fn local(name: NetworkName, port: u16) -> Self {
        Self {
            name,
            host: "127.0.0.1".to_string(),
            port,
            chain_id: ChainId::Any,
            signer: None,
            gas: None,
        }
    }

    /// Endpoint URL; remote profiles take it from their signer configuration
    pub fn rpc_url(&self) -> HarnessResult<String> {
        match &self.signer {
            Some(signer) => Ok(signer.rpc_url.resolve()?.to_string()),
            None => Ok(format!("http://{}:{}", self.host, self.port)),
        }
    }

    pub fn is_remote(&self) -> bool {
        self.signer.is_some()
    }

    pub fn default_gas(&self) -> GasPolicy {
        self.gas.unwrap_or_default()
    }
}
