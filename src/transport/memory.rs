//! In-process chain used by tests.
//!
//! Models just enough of the donation-campaign contracts to observe their
//! events: campaigns, donations, time-locked withdrawals and reverts.

use std::collections::HashMap;
use std::sync::Mutex;

use alloy::primitives::{Address, B256, Bytes, U256, keccak256};

use super::{CallRequest, DeployRequest, RawLog, Receipt, Transport};
use crate::contracts::ContractArtifact;
use crate::error::{HarnessError, HarnessResult};

pub const BLOCK_GAS_LIMIT: u64 = 6_721_975;

pub const MIGRATIONS_CODE: &str = "0x6080604052600080";
pub const CAMPAIGNS_CODE: &str = "0x6080604052600180";
pub const TIMED_CAMPAIGNS_CODE: &str = "0x6080604052600280";

const CAMPAIGN_CREATED: &str = "CampaignCreated(uint256,address,uint256,uint256)";
const DONATION_RECEIVED: &str = "DonationReceived(uint256,address,uint256,uint256)";
const TARGET_REACHED: &str = "TargetReached(uint256,uint256)";
const FUNDS_WITHDRAWN: &str = "FundsWithdrawn(uint256,address,uint256)";

const CAMPAIGN_EVENTS_ABI: &str = r#"
    {"type": "event", "name": "CampaignCreated", "anonymous": false, "inputs": [
        {"name": "campaignId", "type": "uint256", "indexed": true},
        {"name": "owner", "type": "address", "indexed": true},
        {"name": "target", "type": "uint256", "indexed": false},
        {"name": "deadline", "type": "uint256", "indexed": false}]},
    {"type": "event", "name": "DonationReceived", "anonymous": false, "inputs": [
        {"name": "campaignId", "type": "uint256", "indexed": true},
        {"name": "donor", "type": "address", "indexed": true},
        {"name": "amount", "type": "uint256", "indexed": false},
        {"name": "total", "type": "uint256", "indexed": false}]},
    {"type": "event", "name": "TargetReached", "anonymous": false, "inputs": [
        {"name": "campaignId", "type": "uint256", "indexed": true},
        {"name": "total", "type": "uint256", "indexed": false}]},
    {"type": "event", "name": "FundsWithdrawn", "anonymous": false, "inputs": [
        {"name": "campaignId", "type": "uint256", "indexed": true},
        {"name": "owner", "type": "address", "indexed": true},
        {"name": "amount", "type": "uint256", "indexed": false}]},
    {"type": "function", "name": "donate", "stateMutability": "payable", "outputs": [],
        "inputs": [{"name": "campaignId", "type": "uint256"}]},
    {"type": "function", "name": "withdraw", "stateMutability": "nonpayable", "outputs": [],
        "inputs": [{"name": "campaignId", "type": "uint256"}]}
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContractKind {
    Plain,
    Campaigns,
    TimedCampaigns,
}

#[derive(Debug, Clone)]
struct Campaign {
    owner: Address,
    target: U256,
    deadline: u64,
    total: U256,
    withdrawn: bool,
}

#[derive(Debug)]
struct SimContract {
    kind: ContractKind,
    campaigns: Vec<Campaign>,
}

#[derive(Debug)]
struct ChainState {
    accounts: Vec<Address>,
    balances: HashMap<Address, U256>,
    nonces: HashMap<Address, u64>,
    contracts: HashMap<Address, SimContract>,
    now: u64,
    tx_count: u64,
}

/// Simulated chain with ten funded accounts
pub struct SimulatedChain {
    state: Mutex<ChainState>,
}

impl SimulatedChain {
    pub fn new() -> Self {
        let accounts: Vec<Address> = (1..=10u8).map(|i| Address::repeat_byte(i)).collect();
        let funding = U256::from(100u64) * U256::from(10u64).pow(U256::from(18u64));
        let balances = accounts.iter().map(|a| (*a, funding)).collect();

        Self {
            state: Mutex::new(ChainState {
                accounts,
                balances,
                nonces: HashMap::new(),
                contracts: HashMap::new(),
                now: 1_534_000_000,
                tx_count: 0,
            }),
        }
    }

    pub fn now(&self) -> u64 {
        self.state.lock().unwrap().now
    }

    pub fn set_time(&self, timestamp: u64) {
        self.state.lock().unwrap().now = timestamp;
    }

    pub fn contract_count(&self) -> usize {
        self.state.lock().unwrap().contracts.len()
    }

    pub fn balance(&self, account: Address) -> U256 {
        self.state
            .lock()
            .unwrap()
            .balances
            .get(&account)
            .copied()
            .unwrap_or_default()
    }
}

impl Transport for SimulatedChain {
    async fn accounts(&self) -> HarnessResult<Vec<Address>> {
        Ok(self.state.lock().unwrap().accounts.clone())
    }

    async fn deploy(&self, request: DeployRequest) -> HarnessResult<Receipt> {
        let mut state = self.state.lock().unwrap();

        if request.gas.gas_limit() > BLOCK_GAS_LIMIT {
            return Err(HarnessError::TransactionFailed(
                "exceeds block gas limit".to_string(),
            ));
        }
        state.charge(request.from, U256::ZERO, request.gas.gas_limit(), request.gas.gas_price())?;

        let kind = code_kind(&request.code);
        let nonce = state.nonces.entry(request.from).or_default();
        let address = request.from.create(*nonce);
        *nonce += 1;

        state.contracts.insert(
            address,
            SimContract {
                kind,
                campaigns: Vec::new(),
            },
        );

        Ok(Receipt {
            tx_hash: state.next_tx_hash(),
            contract_address: Some(address),
            logs: Vec::new(),
        })
    }

    async fn call(&self, request: CallRequest) -> HarnessResult<Receipt> {
        let mut state = self.state.lock().unwrap();
        state.charge(
            request.from,
            request.value,
            request.gas.gas_limit(),
            request.gas.gas_price(),
        )?;

        let now = state.now;
        let contract = state
            .contracts
            .get_mut(&request.to)
            .ok_or_else(|| revert("no contract code at address"))?;
        let logs = contract.execute(&request, now)?;

        if !request.value.is_zero() {
            let balance = state.balances.entry(request.from).or_default();
            *balance -= request.value;
        }
        if let Some(payout) = withdrawal_payout(&logs) {
            *state.balances.entry(payout.0).or_default() += payout.1;
        }
        *state.nonces.entry(request.from).or_default() += 1;

        Ok(Receipt {
            tx_hash: state.next_tx_hash(),
            contract_address: None,
            logs,
        })
    }
}

impl ChainState {
    fn charge(
        &self,
        from: Address,
        value: U256,
        gas_limit: u64,
        gas_price: u128,
    ) -> HarnessResult<()> {
        let upfront = U256::from(gas_limit) * U256::from(gas_price) + value;
        let balance = self.balances.get(&from).copied().unwrap_or_default();
        if balance < upfront {
            return Err(HarnessError::TransactionFailed(
                "sender doesn't have enough funds to send tx".to_string(),
            ));
        }
        Ok(())
    }

    fn next_tx_hash(&mut self) -> B256 {
        self.tx_count += 1;
        keccak256(self.tx_count.to_be_bytes())
    }
}

impl SimContract {
    fn execute(&mut self, request: &CallRequest, now: u64) -> HarnessResult<Vec<RawLog>> {
        let input = request.input.as_ref();
        if input.len() < 4 || self.kind == ContractKind::Plain {
            return Err(revert("function not found"));
        }
        let (selector, body) = input.split_at(4);
        let args: Vec<U256> = body.chunks(32).map(U256::from_be_slice).collect();
        let contract = request.to;

        if selector == sel("newCampaign(uint256)") && self.kind == ContractKind::Campaigns {
            let target = *args.first().ok_or_else(|| revert("missing target"))?;
            Ok(vec![self.open(contract, request.from, target, 0)])
        } else if selector == sel("newCampaign(uint256,uint256)")
            && self.kind == ContractKind::TimedCampaigns
        {
            let (target, deadline) = match args.as_slice() {
                [target, deadline, ..] => (*target, deadline.saturating_to::<u64>()),
                _ => return Err(revert("missing arguments")),
            };
            if deadline <= now {
                return Err(revert("deadline must be in the future"));
            }
            Ok(vec![self.open(contract, request.from, target, deadline)])
        } else if selector == sel("donate(uint256)") {
            let id = campaign_index(&args)?;
            let campaign = self.campaigns.get_mut(id).ok_or_else(|| revert("no such campaign"))?;
            if request.value.is_zero() || campaign.withdrawn {
                return Err(revert("donation rejected"));
            }

            let before = campaign.total;
            campaign.total += request.value;
            let mut logs = vec![event(
                contract,
                DONATION_RECEIVED,
                &[topic(id), request.from.into_word()],
                &[request.value, campaign.total],
            )];
            if before < campaign.target && campaign.total >= campaign.target {
                logs.push(event(contract, TARGET_REACHED, &[topic(id)], &[campaign.total]));
            }
            Ok(logs)
        } else if selector == sel("withdraw(uint256)") {
            let id = campaign_index(&args)?;
            let campaign = self.campaigns.get_mut(id).ok_or_else(|| revert("no such campaign"))?;
            if campaign.owner != request.from
                || campaign.withdrawn
                || now < campaign.deadline
                || campaign.total < campaign.target
            {
                return Err(revert("withdrawal not allowed"));
            }

            campaign.withdrawn = true;
            Ok(vec![event(
                contract,
                FUNDS_WITHDRAWN,
                &[topic(id), campaign.owner.into_word()],
                &[campaign.total],
            )])
        } else {
            Err(revert("function not found"))
        }
    }

    fn open(&mut self, contract: Address, owner: Address, target: U256, deadline: u64) -> RawLog {
        let id = self.campaigns.len();
        self.campaigns.push(Campaign {
            owner,
            target,
            deadline,
            total: U256::ZERO,
            withdrawn: false,
        });
        event(
            contract,
            CAMPAIGN_CREATED,
            &[topic(id), owner.into_word()],
            &[target, U256::from(deadline)],
        )
    }
}

fn revert(reason: &str) -> HarnessError {
    HarnessError::TransactionFailed(format!(
        "VM Exception while processing transaction: revert {}",
        reason
    ))
}

fn sel(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature);
    [hash[0], hash[1], hash[2], hash[3]]
}

fn campaign_index(args: &[U256]) -> HarnessResult<usize> {
    args.first()
        .map(|id| id.saturating_to::<usize>())
        .ok_or_else(|| revert("missing campaign id"))
}

fn topic(id: usize) -> B256 {
    B256::from(U256::from(id).to_be_bytes::<32>())
}

fn event(contract: Address, signature: &str, indexed: &[B256], data: &[U256]) -> RawLog {
    let mut topics = vec![keccak256(signature)];
    topics.extend_from_slice(indexed);
    let data: Vec<u8> = data.iter().flat_map(|word| word.to_be_bytes::<32>()).collect();
    RawLog {
        address: contract,
        topics,
        data: data.into(),
    }
}

fn withdrawal_payout(logs: &[RawLog]) -> Option<(Address, U256)> {
    let log = logs.iter().find(|l| l.topics.first() == Some(&keccak256(FUNDS_WITHDRAWN)))?;
    let owner = Address::from_word(*log.topics.get(2)?);
    Some((owner, U256::from_be_slice(log.data.get(..32)?)))
}

fn code_kind(code: &Bytes) -> ContractKind {
    let matches = |hex: &str| hex::decode(&hex[2..]).is_ok_and(|prefix| code.starts_with(&prefix));
    if matches(TIMED_CAMPAIGNS_CODE) {
        ContractKind::TimedCampaigns
    } else if matches(CAMPAIGNS_CODE) {
        ContractKind::Campaigns
    } else {
        ContractKind::Plain
    }
}

/// Truffle-style artifact JSON for the given contract
pub fn artifact_json(name: &str) -> String {
    let (bytecode, creation) = match name {
        "DonationCampaigns" => (
            CAMPAIGNS_CODE,
            r#"{"type": "function", "name": "newCampaign", "stateMutability": "nonpayable",
                "outputs": [], "inputs": [{"name": "target", "type": "uint256"}]},"#,
        ),
        "DonationCampaignsTime" => (
            TIMED_CAMPAIGNS_CODE,
            r#"{"type": "function", "name": "newCampaign", "stateMutability": "nonpayable",
                "outputs": [], "inputs": [
                    {"name": "target", "type": "uint256"},
                    {"name": "deadline", "type": "uint256"}
                ]},"#,
        ),
        _ => {
            return format!(
                r#"{{"contractName": "{}", "abi": [], "bytecode": "{}"}}"#,
                name, MIGRATIONS_CODE
            );
        }
    };

    format!(
        r#"{{"contractName": "{}", "abi": [{} {}], "bytecode": "{}"}}"#,
        name, creation, CAMPAIGN_EVENTS_ABI, bytecode
    )
}

pub fn artifact(name: &str) -> ContractArtifact {
    ContractArtifact::from_json(name, &artifact_json(name)).unwrap()
}

/// Migrations, DonationCampaigns and DonationCampaignsTime
pub fn campaign_artifacts() -> Vec<ContractArtifact> {
    ["Migrations", "DonationCampaigns", "DonationCampaignsTime"]
        .into_iter()
        .map(artifact)
        .collect()
}
