mod abi;
mod artifact;
mod codec;
mod handle;
mod registry;

#[cfg(test)]
pub use artifact::ContractArtifact;
pub use artifact::{ArtifactSource, ArtifactStore};
pub use codec::EventLogEntry;
pub use handle::{ContractResolver, DeployedInstance};
pub use registry::DeploymentRegistry;
