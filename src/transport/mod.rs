//! Seam between the harness and the external chain.
//!
//! Every method blocks the calling sequence until the node answers: a
//! submitted transaction resolves only once it is mined (or rejected), so
//! callers never observe a pending state.

#[cfg(test)]
pub mod memory;
mod rpc;
pub mod units;

pub use rpc::RpcTransport;

use alloy::primitives::{Address, B256, Bytes, U256};

use crate::config::GasPolicy;
use crate::error::HarnessResult;

/// Contract creation transaction
#[derive(Debug, Clone)]
pub struct DeployRequest {
    pub from: Address,
    /// Creation bytecode with ABI-encoded constructor arguments appended
    pub code: Bytes,
    pub gas: GasPolicy,
}

/// State-changing call against a deployed contract
#[derive(Debug, Clone)]
pub struct CallRequest {
    pub from: Address,
    pub to: Address,
    pub input: Bytes,
    pub value: U256,
    pub gas: GasPolicy,
}

/// Log entry exactly as the node returned it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

/// Mined transaction receipt
#[derive(Debug, Clone)]
pub struct Receipt {
    pub tx_hash: B256,
    pub contract_address: Option<Address>,
    pub logs: Vec<RawLog>,
}

#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Accounts available for signing, in node order
    async fn accounts(&self) -> HarnessResult<Vec<Address>>;

    /// Submit a creation transaction and wait for it to be mined
    async fn deploy(&self, request: DeployRequest) -> HarnessResult<Receipt>;

    /// Submit a call transaction and wait for it to be mined
    async fn call(&self, request: CallRequest) -> HarnessResult<Receipt>;
}
