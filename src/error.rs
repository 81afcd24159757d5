use thiserror::Error;

/// Failures surfaced by the resolvers, the transport and the runners
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("unknown network '{0}' (expected one of: development, testnet, infura)")]
    UnknownNetwork(String),

    #[error("{artifact} is not deployed on network '{network}'")]
    NotDeployed { artifact: String, network: String },

    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    #[error("transport unavailable: {0}")]
    TransportUnavailable(String),

    #[error("connected to chain {actual} but network '{network}' expects chain {expected}")]
    ChainMismatch {
        network: String,
        expected: u64,
        actual: u64,
    },

    #[error(
        "invalid gas policy: gas limit {gas_limit} and gas price {gas_price} must both be positive"
    )]
    InvalidGasPolicy { gas_limit: u64, gas_price: u128 },

    #[error("artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("{contract} has no method {method} taking {arity} argument(s)")]
    UnknownMethod {
        contract: String,
        method: String,
        arity: usize,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("secret '{0}' must come from env: or keychain:, not a literal")]
    PlaintextSecret(String),

    #[error("secret not available: {0}")]
    MissingSecret(String),
}

impl HarnessError {
    pub fn transaction_failed(err: impl std::fmt::Display) -> Self {
        Self::TransactionFailed(err.to_string())
    }

    pub fn transport_unavailable(err: impl std::fmt::Display) -> Self {
        Self::TransportUnavailable(err.to_string())
    }

    pub fn invalid_argument(err: impl std::fmt::Display) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

pub type HarnessResult<T> = std::result::Result<T, HarnessError>;
