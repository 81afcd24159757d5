use std::fmt;
use std::fs;
use std::path::Path;

use alloy::primitives::U256;
use eyre::{Result, WrapErr};
use serde::Deserialize;

use super::AccountRef;
use crate::config::GasPolicy;
use crate::contracts::{ArtifactSource, ContractResolver, EventLogEntry};
use crate::error::{HarnessError, HarnessResult};
use crate::transport::Transport;
use crate::transport::units::{format_ether, parse_amount};

/// What to do after an action fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Report the failure and run the remaining actions
    #[default]
    Continue,
    /// Stop at the first failure
    Halt,
}

/// A TOML list of `[[action]]` tables plus an optional `policy`
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionScript {
    pub policy: Option<FailurePolicy>,
    #[serde(default, rename = "action")]
    actions: Vec<ActionSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ActionName {
    NewCampaign,
    Donate,
    Withdraw,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ActionSpec {
    kind: ActionName,
    contract: String,
    #[serde(default)]
    from: AccountRef,
    target: Option<String>,
    deadline: Option<u64>,
    campaign: Option<u64>,
    amount: Option<String>,
    gas_limit: Option<u64>,
    gas_price: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    /// `deadline` selects the time-locked variant
    NewCampaign { target: U256, deadline: Option<u64> },
    Donate { campaign: u64, amount: U256 },
    Withdraw { campaign: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub contract: String,
    pub from: AccountRef,
    pub kind: ActionKind,
    pub gas_limit: Option<u64>,
    pub gas_price: Option<u64>,
}

impl TryFrom<ActionSpec> for Action {
    type Error = HarnessError;

    fn try_from(spec: ActionSpec) -> HarnessResult<Self> {
        let require = |field: &str, value: bool| {
            if value {
                Ok(())
            } else {
                Err(HarnessError::InvalidArgument(format!(
                    "{:?} action on {} needs `{}`",
                    spec.kind, spec.contract, field
                )))
            }
        };

        let kind = match spec.kind {
            ActionName::NewCampaign => {
                require("target", spec.target.is_some())?;
                ActionKind::NewCampaign {
                    target: parse_amount(spec.target.as_deref().unwrap_or_default())?,
                    deadline: spec.deadline,
                }
            }
            ActionName::Donate => {
                require("campaign", spec.campaign.is_some())?;
                require("amount", spec.amount.is_some())?;
                ActionKind::Donate {
                    campaign: spec.campaign.unwrap_or_default(),
                    amount: parse_amount(spec.amount.as_deref().unwrap_or_default())?,
                }
            }
            ActionName::Withdraw => {
                require("campaign", spec.campaign.is_some())?;
                ActionKind::Withdraw {
                    campaign: spec.campaign.unwrap_or_default(),
                }
            }
        };

        Ok(Action {
            contract: spec.contract,
            from: spec.from,
            kind,
            gas_limit: spec.gas_limit,
            gas_price: spec.gas_price,
        })
    }
}

impl Action {
    fn call(&self) -> (&'static str, Vec<String>, U256) {
        match &self.kind {
            ActionKind::NewCampaign { target, deadline } => {
                let mut args = vec![target.to_string()];
                args.extend(deadline.map(|d| d.to_string()));
                ("newCampaign", args, U256::ZERO)
            }
            ActionKind::Donate { campaign, amount } => {
                ("donate", vec![campaign.to_string()], *amount)
            }
            ActionKind::Withdraw { campaign } => {
                ("withdraw", vec![campaign.to_string()], U256::ZERO)
            }
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (method, args, value) = self.call();
        write!(f, "{}.{}({})", self.contract, method, args.join(", "))?;
        if !value.is_zero() {
            write!(f, " value {} ether", format_ether(value))?;
        }
        write!(f, " from {}", self.from)
    }
}

impl InteractionScript {
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).wrap_err_with(|| format!("Failed to read {:?}", path))?;
        Self::parse(&content).wrap_err_with(|| format!("Invalid interaction script {:?}", path))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Validate every action up front so a malformed script runs nothing
    pub fn actions(&self) -> HarnessResult<Vec<Action>> {
        self.actions.iter().cloned().map(Action::try_from).collect()
    }
}

#[derive(Debug)]
pub struct ActionOutcome {
    pub index: usize,
    pub label: String,
    pub result: HarnessResult<Vec<EventLogEntry>>,
}

#[derive(Debug, Default)]
pub struct InteractionReport {
    pub outcomes: Vec<ActionOutcome>,
    /// Set when the halt policy stopped the run early
    pub halted: bool,
}

impl InteractionReport {
    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }

    pub fn is_success(&self) -> bool {
        self.failures() == 0
    }
}

/// Executes actions one at a time, in declaration order
pub struct InteractionRunner<'r, 'a, T, A> {
    resolver: &'r ContractResolver<'a, T, A>,
    base_gas: GasPolicy,
    policy: FailurePolicy,
}

impl<'r, 'a, T: Transport, A: ArtifactSource> InteractionRunner<'r, 'a, T, A> {
    pub fn new(
        resolver: &'r ContractResolver<'a, T, A>,
        base_gas: GasPolicy,
        policy: FailurePolicy,
    ) -> Self {
        Self {
            resolver,
            base_gas,
            policy,
        }
    }

    pub async fn run(&self, actions: &[Action]) -> InteractionReport {
        let mut report = InteractionReport::default();

        for (index, action) in actions.iter().enumerate() {
            let label = action.to_string();
            tracing::info!(action = index + 1, "{}", label);

            let result = self.execute(action).await;
            match &result {
                Ok(events) => {
                    for event in events {
                        tracing::info!(action = index + 1, "{}", event);
                    }
                }
                Err(e) => tracing::error!(action = index + 1, "{} failed: {}", label, e),
            }

            let failed = result.is_err();
            report.outcomes.push(ActionOutcome {
                index,
                label,
                result,
            });

            if failed && self.policy == FailurePolicy::Halt {
                tracing::warn!(remaining = actions.len() - index - 1, "Halting interaction run");
                report.halted = true;
                break;
            }
        }

        report
    }

    async fn execute(&self, action: &Action) -> HarnessResult<Vec<EventLogEntry>> {
        let gas = self
            .base_gas
            .with_overrides(action.gas_limit, action.gas_price)?;
        let from = action.from.fetch(self.resolver.transport()).await?;
        let handle = self.resolver.resolve(&action.contract)?;

        let (method, args, value) = action.call();
        handle.transact(method, &args, value, from, gas).await
    }
}
