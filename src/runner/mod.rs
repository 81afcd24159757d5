mod deploy;
mod interact;

pub use deploy::{DeploymentPlan, DeploymentRunner};
pub use interact::{FailurePolicy, InteractionRunner, InteractionScript};

use std::fmt;

use alloy::primitives::Address;
use serde::Deserialize;

use crate::error::{HarnessError, HarnessResult};
use crate::transport::Transport;

/// Sender of a transaction: an index into the node's accounts or a literal address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum AccountRef {
    Index(usize),
    Address(Address),
}

impl Default for AccountRef {
    fn default() -> Self {
        AccountRef::Index(0)
    }
}

impl AccountRef {
    pub fn resolve(&self, accounts: &[Address]) -> HarnessResult<Address> {
        match self {
            AccountRef::Address(address) => Ok(*address),
            AccountRef::Index(index) => accounts.get(*index).copied().ok_or_else(|| {
                HarnessError::InvalidArgument(format!(
                    "account index {} out of range ({} accounts available)",
                    index,
                    accounts.len()
                ))
            }),
        }
    }

    pub async fn fetch<T: Transport>(&self, transport: &T) -> HarnessResult<Address> {
        match self {
            AccountRef::Address(address) => Ok(*address),
            AccountRef::Index(_) => self.resolve(&transport.accounts().await?),
        }
    }
}

impl fmt::Display for AccountRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountRef::Index(index) => write!(f, "account[{}]", index),
            AccountRef::Address(address) => write!(f, "{}", address),
        }
    }
}
