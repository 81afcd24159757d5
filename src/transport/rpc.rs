use alloy::{
    network::{EthereumWallet, TransactionBuilder},
    primitives::Address,
    providers::{Provider, ProviderBuilder},
    rpc::types::{TransactionReceipt, TransactionRequest},
    signers::local::{MnemonicBuilder, PrivateKeySigner, coins_bip39::English},
    transports::{RpcError, TransportError},
};

use super::{CallRequest, DeployRequest, RawLog, Receipt, Transport};
use crate::config::{ChainId, NetworkProfile, SignerConfig};
use crate::error::{HarnessError, HarnessResult};

/// JSON-RPC transport backed by alloy providers
pub struct RpcTransport {
    rpc_url: String,
    network: String,
    wallet: Option<EthereumWallet>,
    signer_addresses: Vec<Address>,
}

impl RpcTransport {
    /// Connect to the profile's endpoint and check the chain id.
    ///
    /// Remote profiles derive their signing accounts here, on first use.
    pub async fn connect(profile: &NetworkProfile) -> HarnessResult<Self> {
        let rpc_url = profile.rpc_url()?;

        let (wallet, signer_addresses) = match &profile.signer {
            Some(config) => {
                let signers = derive_signers(config)?;
                let addresses: Vec<Address> = signers.iter().map(|s| s.address()).collect();

                let mut iter = signers.into_iter();
                let first = iter
                    .next()
                    .ok_or_else(|| HarnessError::MissingSecret("no signing accounts".to_string()))?;
                let mut wallet = EthereumWallet::from(first);
                for signer in iter {
                    wallet.register_signer(signer);
                }
                (Some(wallet), addresses)
            }
            None => (None, Vec::new()),
        };

        let provider = ProviderBuilder::new()
            .connect(&rpc_url)
            .await
            .map_err(HarnessError::transport_unavailable)?;

        let actual = provider
            .get_chain_id()
            .await
            .map_err(HarnessError::transport_unavailable)?;

        check_chain(profile, actual)?;
        tracing::info!(network = %profile.name, chain_id = actual, "Connected");

        Ok(Self {
            rpc_url,
            network: profile.name.to_string(),
            wallet,
            signer_addresses,
        })
    }

    async fn submit(&self, tx: TransactionRequest) -> HarnessResult<Receipt> {
        let receipt = match &self.wallet {
            Some(wallet) => {
                let provider = ProviderBuilder::new()
                    .wallet(wallet.clone())
                    .connect(&self.rpc_url)
                    .await
                    .map_err(HarnessError::transport_unavailable)?;
                send_and_wait(&provider, tx).await?
            }
            None => {
                let provider = ProviderBuilder::new()
                    .connect(&self.rpc_url)
                    .await
                    .map_err(HarnessError::transport_unavailable)?;
                send_and_wait(&provider, tx).await?
            }
        };

        Ok(into_receipt(receipt))
    }
}

impl Transport for RpcTransport {
    async fn accounts(&self) -> HarnessResult<Vec<Address>> {
        if !self.signer_addresses.is_empty() {
            return Ok(self.signer_addresses.clone());
        }

        let provider = ProviderBuilder::new()
            .connect(&self.rpc_url)
            .await
            .map_err(HarnessError::transport_unavailable)?;

        provider.get_accounts().await.map_err(classify)
    }

    async fn deploy(&self, request: DeployRequest) -> HarnessResult<Receipt> {
        let tx = TransactionRequest::default()
            .with_from(request.from)
            .with_deploy_code(request.code)
            .with_gas_limit(request.gas.gas_limit())
            .with_gas_price(request.gas.gas_price());

        tracing::debug!(
            network = %self.network,
            from = %request.from,
            "Submitting creation transaction"
        );
        self.submit(tx).await
    }

    async fn call(&self, request: CallRequest) -> HarnessResult<Receipt> {
        let tx = TransactionRequest::default()
            .with_from(request.from)
            .with_to(request.to)
            .with_input(request.input)
            .with_value(request.value)
            .with_gas_limit(request.gas.gas_limit())
            .with_gas_price(request.gas.gas_price());

        tracing::debug!(
            network = %self.network,
            to = %request.to,
            "Submitting call transaction"
        );
        self.submit(tx).await
    }
}

/// Derive `config.accounts` signers along m/44'/60'/0'/0/i
fn derive_signers(config: &SignerConfig) -> HarnessResult<Vec<PrivateKeySigner>> {
    let phrase = config.mnemonic_phrase()?;

    (0..config.accounts.max(1))
        .map(|index| {
            MnemonicBuilder::<English>::default()
                .phrase(phrase.as_str())
                .index(index)
                .and_then(|builder| builder.build())
                .map_err(|e| {
                    HarnessError::MissingSecret(format!("cannot derive account {}: {}", index, e))
                })
        })
        .collect()
}

async fn send_and_wait<P: Provider>(
    provider: &P,
    tx: TransactionRequest,
) -> HarnessResult<TransactionReceipt> {
    let pending = provider.send_transaction(tx).await.map_err(classify)?;
    let tx_hash = *pending.tx_hash();
    tracing::debug!(%tx_hash, "Waiting for receipt");

    let receipt = pending
        .get_receipt()
        .await
        .map_err(HarnessError::transaction_failed)?;

    if !receipt.status() {
        return Err(HarnessError::TransactionFailed(format!(
            "transaction {} reverted",
            tx_hash
        )));
    }

    Ok(receipt)
}

/// A profile pinned to a chain id refuses any other chain
fn check_chain(profile: &NetworkProfile, actual: u64) -> HarnessResult<()> {
    match profile.chain_id {
        ChainId::Id(expected) if !profile.chain_id.matches(actual) => {
            Err(HarnessError::ChainMismatch {
                network: profile.name.to_string(),
                expected,
                actual,
            })
        }
        _ => Ok(()),
    }
}

/// Node-side rejections are transaction failures; the rest means the endpoint is unusable
fn classify(err: TransportError) -> HarnessError {
    match err {
        RpcError::Transport(kind) => HarnessError::TransportUnavailable(kind.to_string()),
        other => HarnessError::TransactionFailed(other.to_string()),
    }
}

fn into_receipt(receipt: TransactionReceipt) -> Receipt {
    let logs = receipt
        .inner
        .logs()
        .iter()
        .map(|log| RawLog {
            address: log.address(),
            topics: log.topics().to_vec(),
            data: log.data().data.clone(),
        })
        .collect();

    Receipt {
        tx_hash: receipt.transaction_hash,
        contract_address: receipt.contract_address,
        logs,
    }
}
