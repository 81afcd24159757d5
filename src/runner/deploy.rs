use std::fs;
use std::path::Path;

use alloy::primitives::Address;
use eyre::{Result, WrapErr};
use serde::Deserialize;
use thiserror::Error;

use super::AccountRef;
use crate::config::GasPolicy;
use crate::contracts::{ArtifactSource, ContractResolver, DeployedInstance};
use crate::error::{HarnessError, HarnessResult};
use crate::transport::Transport;

const DEFAULT_ARTIFACTS: [&str; 3] = ["Migrations", "DonationCampaigns", "DonationCampaignsTime"];

/// Ordered list of artifacts to deploy, read from TOML:
///
/// ```toml
/// [defaults]
/// gas_limit = 4500000
/// gas_price = 1000000000
///
/// [[step]]
/// artifact = "DonationCampaigns"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeploymentPlan {
    #[serde(default)]
    pub defaults: PlanDefaults,
    #[serde(default, rename = "step")]
    pub steps: Vec<PlanStep>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanDefaults {
    #[serde(default)]
    pub from: AccountRef,
    pub gas_limit: Option<u64>,
    pub gas_price: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanStep {
    pub artifact: String,
    pub gas_limit: Option<u64>,
    pub gas_price: Option<u64>,
    /// Constructor arguments
    #[serde(default)]
    pub args: Vec<String>,
}

/// One resolved deployment
#[derive(Debug, Clone)]
pub struct DeploymentStep {
    pub artifact: String,
    pub gas: GasPolicy,
    pub args: Vec<String>,
}

impl Default for DeploymentPlan {
    fn default() -> Self {
        Self {
            defaults: PlanDefaults::default(),
            steps: DEFAULT_ARTIFACTS
                .iter()
                .map(|name| PlanStep {
                    artifact: name.to_string(),
                    gas_limit: None,
                    gas_price: None,
                    args: Vec::new(),
                })
                .collect(),
        }
    }
}

impl DeploymentPlan {
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).wrap_err_with(|| format!("Failed to read {:?}", path))?;
        Self::parse(&content).wrap_err_with(|| format!("Invalid deployment plan {:?}", path))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let plan: Self = toml::from_str(content)?;
        if plan.steps.is_empty() {
            eyre::bail!("deployment plan has no [[step]] entries");
        }
        Ok(plan)
    }

    /// Resolve gas for each step, leaving out the artifacts in `skip`
    pub fn steps(&self, base: GasPolicy, skip: &[String]) -> HarnessResult<Vec<DeploymentStep>> {
        if let Some(unknown) = skip
            .iter()
            .find(|name| !self.steps.iter().any(|s| &s.artifact == *name))
        {
            return Err(HarnessError::InvalidArgument(format!(
                "cannot skip '{}': not part of the plan",
                unknown
            )));
        }

        let base = base.with_overrides(self.defaults.gas_limit, self.defaults.gas_price)?;

        self.steps
            .iter()
            .filter(|step| !skip.contains(&step.artifact))
            .map(|step| {
                Ok(DeploymentStep {
                    artifact: step.artifact.clone(),
                    gas: base.with_overrides(step.gas_limit, step.gas_price)?,
                    args: step.args.clone(),
                })
            })
            .collect()
    }
}

/// A deployment run stopped at `step`
#[derive(Debug, Error)]
#[error("deployment halted at step {step} ({artifact}) after {completed} completed step(s)")]
pub struct DeploymentFailure {
    pub step: usize,
    pub artifact: String,
    pub completed: usize,
    #[source]
    pub source: HarnessError,
}

/// Deploys steps strictly in order, recording each instance as soon as it is mined
pub struct DeploymentRunner<'a, T, A> {
    resolver: ContractResolver<'a, T, A>,
    deployer: AccountRef,
}

impl<'a, T: Transport, A: ArtifactSource> DeploymentRunner<'a, T, A> {
    pub fn new(resolver: ContractResolver<'a, T, A>, deployer: AccountRef) -> Self {
        Self { resolver, deployer }
    }

    #[cfg(test)]
    pub fn resolver(&self) -> &ContractResolver<'a, T, A> {
        &self.resolver
    }

    /// Run all steps. The first failure halts the run; earlier instances stay recorded.
    pub async fn run(&mut self, steps: &[DeploymentStep]) -> Result<Vec<DeployedInstance>> {
        let from = self.deployer.fetch(self.resolver.transport()).await?;
        let mut deployed = Vec::with_capacity(steps.len());

        for (index, step) in steps.iter().enumerate() {
            tracing::info!(
                step = index + 1,
                artifact = %step.artifact,
                gas_limit = step.gas.gas_limit(),
                gas_price = step.gas.gas_price(),
                "Deploying"
            );

            let instance = self
                .deploy_step(step, from)
                .await
                .map_err(|source| DeploymentFailure {
                    step: index + 1,
                    artifact: step.artifact.clone(),
                    completed: deployed.len(),
                    source,
                })?;

            self.resolver
                .record(&instance)
                .wrap_err_with(|| format!("Failed to record {}", instance.artifact))?;

            tracing::info!(
                artifact = %instance.artifact,
                address = %instance.address,
                tx_hash = %instance.tx_hash,
                "Deployed"
            );
            deployed.push(instance);
        }

        Ok(deployed)
    }

    async fn deploy_step(
        &self,
        step: &DeploymentStep,
        from: Address,
    ) -> HarnessResult<DeployedInstance> {
        let handle = self.resolver.resolve(&step.artifact)?;
        handle.deploy(from, step.gas, &step.args).await
    }
}
