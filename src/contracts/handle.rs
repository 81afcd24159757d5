use alloy::primitives::{Address, B256, U256};

use super::artifact::{ArtifactSource, ContractArtifact};
use super::codec::{EventLogEntry, decode_log, encode_call};
use super::registry::{DeploymentRecord, DeploymentRegistry};
use crate::config::GasPolicy;
use crate::error::{HarnessError, HarnessResult};
use crate::transport::{CallRequest, DeployRequest, Transport};

/// A contract instance created on the active network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedInstance {
    pub artifact: String,
    pub network: String,
    pub address: Address,
    pub tx_hash: B256,
}

/// Turns artifact names into handles bound to the active network
pub struct ContractResolver<'a, T, A> {
    transport: &'a T,
    artifacts: A,
    registry: DeploymentRegistry,
}

impl<'a, T: Transport, A: ArtifactSource> ContractResolver<'a, T, A> {
    pub fn new(transport: &'a T, artifacts: A, registry: DeploymentRegistry) -> Self {
        Self {
            transport,
            artifacts,
            registry,
        }
    }

    /// Load the artifact and snapshot its registry entry
    pub fn resolve(&self, name: &str) -> HarnessResult<ContractHandle<'a, T>> {
        Ok(ContractHandle {
            transport: self.transport,
            artifact: self.artifacts.load(name)?,
            network: self.registry.network().to_string(),
            record: self.registry.get(name).cloned(),
        })
    }

    /// Persist a freshly deployed instance
    pub fn record(&mut self, instance: &DeployedInstance) -> eyre::Result<()> {
        self.registry
            .record(&instance.artifact, instance.address, instance.tx_hash)
    }

    #[cfg(test)]
    pub fn registry(&self) -> &DeploymentRegistry {
        &self.registry
    }

    pub fn transport(&self) -> &'a T {
        self.transport
    }
}

pub struct ContractHandle<'a, T> {
    transport: &'a T,
    artifact: ContractArtifact,
    network: String,
    record: Option<DeploymentRecord>,
}

impl<T: Transport> ContractHandle<'_, T> {
    /// The recorded instance on this network. Never deploys.
    pub fn deployed(&self) -> HarnessResult<DeployedInstance> {
        let record = self.record.as_ref().ok_or_else(|| HarnessError::NotDeployed {
            artifact: self.artifact.name.clone(),
            network: self.network.clone(),
        })?;

        Ok(DeployedInstance {
            artifact: self.artifact.name.clone(),
            network: self.network.clone(),
            address: record.address,
            tx_hash: record.tx_hash,
        })
    }

    /// Submit a creation transaction and wait for it to be mined.
    ///
    /// Every call creates a new instance; nothing is recorded here.
    pub async fn deploy(
        &self,
        from: Address,
        gas: GasPolicy,
        args: &[String],
    ) -> HarnessResult<DeployedInstance> {
        let code = self.artifact.creation_code(args)?;

        let receipt = self
            .transport
            .deploy(DeployRequest { from, code, gas })
            .await?;

        let address = receipt.contract_address.ok_or_else(|| {
            HarnessError::TransactionFailed(format!(
                "receipt {} carries no contract address",
                receipt.tx_hash
            ))
        })?;

        Ok(DeployedInstance {
            artifact: self.artifact.name.clone(),
            network: self.network.clone(),
            address,
            tx_hash: receipt.tx_hash,
        })
    }

    /// Call `method` on the deployed instance and decode the emitted events in receipt order
    pub async fn transact(
        &self,
        method: &str,
        args: &[String],
        value: U256,
        from: Address,
        gas: GasPolicy,
    ) -> HarnessResult<Vec<EventLogEntry>> {
        let instance = self.deployed()?;

        let function = self
            .artifact
            .abi
            .function(method, args.len())
            .ok_or_else(|| HarnessError::UnknownMethod {
                contract: self.artifact.name.clone(),
                method: method.to_string(),
                arity: args.len(),
            })?;

        if !value.is_zero() && !function.is_payable() {
            return Err(HarnessError::InvalidArgument(format!(
                "{}.{} is not payable",
                self.artifact.name, method
            )));
        }

        let input = encode_call(function.selector(), &function.inputs, args)?;

        let receipt = self
            .transport
            .call(CallRequest {
                from,
                to: instance.address,
                input,
                value,
                gas,
            })
            .await?;

        Ok(receipt
            .logs
            .iter()
            .map(|log| decode_log(&self.artifact.abi, log))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::memory::{SimulatedChain, campaign_artifacts};
    use crate::transport::units::parse_amount;

    fn resolver(
        chain: &SimulatedChain,
    ) -> ContractResolver<'_, SimulatedChain, Vec<ContractArtifact>> {
        ContractResolver::new(
            chain,
            campaign_artifacts(),
            DeploymentRegistry::in_memory("development"),
        )
    }

    #[tokio::test]
    async fn test_deploying_twice_yields_distinct_instances() {
        let chain = SimulatedChain::new();
        let resolver = resolver(&chain);
        let from = chain.accounts().await.unwrap()[0];

        let handle = resolver.resolve("DonationCampaigns").unwrap();
        let first = handle.deploy(from, GasPolicy::default(), &[]).await.unwrap();
        let second = handle.deploy(from, GasPolicy::default(), &[]).await.unwrap();

        assert_ne!(first.address, second.address);
        assert_eq!(chain.contract_count(), 2);
    }

    #[tokio::test]
    async fn test_deployed_requires_a_record() {
        let chain = SimulatedChain::new();
        let mut resolver = resolver(&chain);
        let from = chain.accounts().await.unwrap()[0];

        let handle = resolver.resolve("DonationCampaigns").unwrap();
        assert!(matches!(
            handle.deployed(),
            Err(HarnessError::NotDeployed { .. })
        ));

        let instance = handle.deploy(from, GasPolicy::default(), &[]).await.unwrap();
        // The handle is a snapshot; only a fresh resolve sees the record
        assert!(handle.deployed().is_err());
        resolver.record(&instance).unwrap();
        assert_eq!(
            resolver.resolve("DonationCampaigns").unwrap().deployed().unwrap(),
            instance
        );
    }

    #[tokio::test]
    async fn test_unknown_artifact_and_method() {
        let chain = SimulatedChain::new();
        let mut resolver = resolver(&chain);
        let from = chain.accounts().await.unwrap()[0];

        assert!(matches!(
            resolver.resolve("Crowdsale"),
            Err(HarnessError::ArtifactNotFound(_))
        ));

        let handle = resolver.resolve("DonationCampaigns").unwrap();
        let instance = handle.deploy(from, GasPolicy::default(), &[]).await.unwrap();
        resolver.record(&instance).unwrap();

        let handle = resolver.resolve("DonationCampaigns").unwrap();
        let err = handle
            .transact("donate", &[], U256::ZERO, from, GasPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, HarnessError::UnknownMethod { arity: 0, .. }));

        let err = handle
            .transact("withdraw", &["0".to_string()], U256::from(1), from, GasPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, HarnessError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_donate_to_missing_campaign_fails() {
        let chain = SimulatedChain::new();
        let mut resolver = resolver(&chain);
        let accounts = chain.accounts().await.unwrap();

        let handle = resolver.resolve("DonationCampaigns").unwrap();
        let instance = handle
            .deploy(accounts[0], GasPolicy::default(), &[])
            .await
            .unwrap();
        resolver.record(&instance).unwrap();
        let handle = resolver.resolve("DonationCampaigns").unwrap();

        for amount in ["1 wei", "6 ether", "50 ether"] {
            let err = handle
                .transact(
                    "donate",
                    &["7".to_string()],
                    parse_amount(amount).unwrap(),
                    accounts[1],
                    GasPolicy::default(),
                )
                .await
                .unwrap_err();
            assert!(matches!(err, HarnessError::TransactionFailed(_)), "{}", amount);
        }
    }

    #[tokio::test]
    async fn test_new_campaign_emits_decoded_event() {
        let chain = SimulatedChain::new();
        let mut resolver = resolver(&chain);
        let owner = chain.accounts().await.unwrap()[2];

        let handle = resolver.resolve("DonationCampaigns").unwrap();
        let instance = handle.deploy(owner, GasPolicy::default(), &[]).await.unwrap();
        resolver.record(&instance).unwrap();

        let events = resolver
            .resolve("DonationCampaigns")
            .unwrap()
            .transact(
                "newCampaign",
                &["10000000000000000000".to_string()],
                U256::ZERO,
                owner,
                GasPolicy::default(),
            )
            .await
            .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_name, "CampaignCreated");
        assert_eq!(events[0].arg("campaignId"), Some("0"));
        assert_eq!(events[0].arg("owner"), Some(format!("{:?}", owner).as_str()));
        assert_eq!(events[0].arg("target"), Some("10000000000000000000"));
    }
}
