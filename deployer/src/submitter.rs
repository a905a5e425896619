//! The transaction submitter: the seam between the orchestrator and the chain

use std::{future::Future, str::FromStr};

use alloy::{
    dyn_abi::DynSolValue,
    network::{Ethereum, TransactionBuilder},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
    transports::http::reqwest::Url,
};
use alloy_primitives::{Address, Bytes, TxHash};
use tracing::{debug, info};

use crate::{
    artifacts::Artifact,
    errors::{DeployError, SubmissionError},
    types::{ContractName, DeployerContext, GasParams},
};

/// Everything needed to submit one contract creation transaction
#[derive(Debug)]
pub struct DeploymentRequest<'a> {
    /// The contract instance being deployed
    pub contract: &'a ContractName,
    /// The artifact being deployed
    pub artifact: &'a Artifact,
    /// The resolved constructor arguments
    pub args: &'a [DynSolValue],
    /// The creation code: bytecode followed by the encoded constructor arguments
    pub init_code: Bytes,
    /// The gas parameters for the transaction
    pub gas: GasParams,
    /// The deploying account
    pub deployer: &'a DeployerContext,
}

/// A successfully deployed contract
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeployedContract {
    /// The address the contract was deployed to
    pub address: Address,
    /// The hash of the deployment transaction
    pub transaction_hash: TxHash,
}

/// Submits contract creation transactions.
///
/// A submission is attempted exactly once; any failure is reported to the
/// caller rather than retried.
pub trait Submitter {
    /// Submit a deployment and wait for it to be mined
    fn submit(
        &self,
        request: DeploymentRequest<'_>,
    ) -> impl Future<Output = Result<DeployedContract, SubmissionError>> + Send;
}

/// The provider type used to talk to the network
pub type Wallet = DynProvider<Ethereum>;

/// A submitter sending transactions over JSON-RPC from a local private key
#[derive(Clone)]
pub struct RpcSubmitter {
    /// The signing provider
    provider: Wallet,
    /// The address of the signing account
    address: Address,
}

impl RpcSubmitter {
    /// Sets up a signing client for the given RPC URL and private key
    pub async fn connect(rpc_url: &str, priv_key: &str) -> Result<Self, DeployError> {
        let url =
            Url::parse(rpc_url).map_err(|e| DeployError::ClientInitialization(e.to_string()))?;
        let signer = PrivateKeySigner::from_str(priv_key)
            .map_err(|e| DeployError::ClientInitialization(e.to_string()))?;
        let address = signer.address();

        let provider = DynProvider::new(ProviderBuilder::new().wallet(signer).connect_http(url));
        let chain_id = provider
            .get_chain_id()
            .await
            .map_err(|e| DeployError::ClientInitialization(e.to_string()))?;

        info!(%address, chain_id, "connected to {}", rpc_url);
        Ok(Self { provider, address })
    }

    /// The address of the signing account
    pub fn address(&self) -> Address {
        self.address
    }
}

impl Submitter for RpcSubmitter {
    async fn submit(
        &self,
        request: DeploymentRequest<'_>,
    ) -> Result<DeployedContract, SubmissionError> {
        let tx = TransactionRequest::default()
            .with_from(request.deployer.address)
            .with_deploy_code(request.init_code)
            .with_gas_limit(request.gas.gas_limit)
            .with_gas_price(request.gas.gas_price_wei);

        let pending = self.provider.send_transaction(tx).await.map_err(SubmissionError::new)?;
        debug!(tx = %pending.tx_hash(), "submitted deployment of {}", request.contract);

        let receipt = pending.get_receipt().await.map_err(SubmissionError::new)?;
        if !receipt.status() {
            return Err(SubmissionError(format!(
                "deployment transaction {} reverted",
                receipt.transaction_hash
            )));
        }

        let address = receipt.contract_address.ok_or_else(|| {
            SubmissionError(format!(
                "receipt for {} carries no contract address",
                receipt.transaction_hash
            ))
        })?;

        Ok(DeployedContract {
            address,
            transaction_hash: receipt.transaction_hash,
        })
    }
}
