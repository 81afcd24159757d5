mod network;
mod secrets;
mod settings;

pub use network::{ChainId, GasPolicy, NetworkProfile, SignerConfig};
pub use secrets::KeychainManager;
pub use settings::Settings;
