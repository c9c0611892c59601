//! JSON-RPC unit factory for Ethereum-compatible nodes.
//!
//! Binds the [`UnitFactory`] boundary to a node that manages its own accounts
//! (a local Hardhat or Anvil node, for instance): deployments are sent with
//! `eth_sendTransaction` and confirmed by polling `eth_getTransactionReceipt`.

pub mod abi;
pub mod artifact;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::core::ArgValue;
use crate::core::error::FactoryError;
use crate::core::factory::{Confirmation, Identity, PendingHandle, UnitFactory};
use crate::core::plan::DeploymentUnit;
pub use artifact::{Artifact, ArtifactStore};

/// Configuration for [`RpcFactory`]
#[derive(Clone, Debug)]
pub struct RpcConfig {
    /// Node URL (default: http://127.0.0.1:8545)
    pub url: String,
    /// Hardhat artifacts directory (default: artifacts)
    pub artifacts: String,
    /// Sending account; the node's first account when unset
    pub from: Option<String>,
    /// Delay between receipt polls (default: 500ms)
    pub poll_interval: Duration,
    /// Give up waiting for a receipt after this long (default: wait indefinitely)
    pub timeout: Option<Duration>,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8545".to_string(),
            artifacts: "artifacts".to_string(),
            from: None,
            poll_interval: Duration::from_millis(500),
            timeout: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: ArgValue,
    #[serde(default)]
    error: Option<RpcError>,
}

/// Publishes units through a JSON-RPC node.
pub struct RpcFactory {
    client: reqwest::Client,
    config: RpcConfig,
    artifacts: ArtifactStore,
    sender: OnceCell<String>,
    next_id: AtomicU64,
}

impl RpcFactory {
    pub fn new(config: RpcConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            artifacts: ArtifactStore::new(&config.artifacts),
            config,
            sender: OnceCell::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &RpcConfig {
        &self.config
    }

    async fn call(&self, method: &str, params: ArgValue) -> Result<ArgValue, FactoryError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response: RpcResponse = self
            .client
            .post(&self.config.url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match response.error {
            Some(err) => Err(FactoryError::Rejected(format!(
                "{} failed: {} (code {})",
                method, err.message, err.code
            ))),
            None => Ok(response.result),
        }
    }

    async fn sender(&self) -> Result<&str, FactoryError> {
        let sender = self
            .sender
            .get_or_try_init(|| async {
                if let Some(from) = &self.config.from {
                    return Ok(from.clone());
                }
                let accounts = self.call("eth_accounts", json!([])).await?;
                accounts
                    .get(0)
                    .and_then(ArgValue::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| {
                        FactoryError::InvalidResponse("node has no unlocked accounts".into())
                    })
            })
            .await?;
        Ok(sender.as_str())
    }

    async fn send_transaction(&self, mut tx: ArgValue) -> Result<PendingHandle, FactoryError> {
        tx["from"] = json!(self.sender().await?);
        let hash = self.call("eth_sendTransaction", json!([tx])).await?;
        hash.as_str()
            .map(PendingHandle::new)
            .ok_or_else(|| FactoryError::InvalidResponse(format!("transaction hash: {}", hash)))
    }

    fn creation_data(
        &self,
        unit: &DeploymentUnit,
        args: &[ArgValue],
    ) -> Result<String, FactoryError> {
        let bytecode = self.artifacts.bytecode(unit)?;
        let encoded = abi::encode_args(args)?;
        Ok(format!("0x{}{}", bytecode, hex::encode(encoded)))
    }

    async fn wait_for_receipt(&self, hash: &str) -> Result<ArgValue, FactoryError> {
        let started = tokio::time::Instant::now();
        loop {
            let receipt = self.call("eth_getTransactionReceipt", json!([hash])).await?;
            if !receipt.is_null() {
                return Ok(receipt);
            }
            if let Some(limit) = self.config.timeout {
                if started.elapsed() >= limit {
                    return Err(FactoryError::TimedOut(format!("receipt of {}", hash)));
                }
            }
            log::trace!("No receipt yet for {}", hash);
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}

/// Reads the live identity out of a mined receipt.
///
/// A failed transaction (`status == 0x0`) is reported as reverted. The identity is
/// the created contract's address, or the called contract for upgrade transactions.
pub fn identity_from_receipt(hash: &str, receipt: &ArgValue) -> Result<Identity, FactoryError> {
    if receipt.get("status").and_then(ArgValue::as_str) == Some("0x0") {
        return Err(FactoryError::Reverted(format!("transaction {}", hash)));
    }
    ["contractAddress", "to"]
        .iter()
        .find_map(|key| receipt.get(*key).and_then(ArgValue::as_str))
        .map(Identity::new)
        .ok_or_else(|| {
            FactoryError::InvalidResponse(format!("receipt of {} names no address", hash))
        })
}

#[async_trait]
impl UnitFactory for RpcFactory {
    async fn submit(
        &self,
        unit: &DeploymentUnit,
        args: &[ArgValue],
    ) -> Result<PendingHandle, FactoryError> {
        let data = self.creation_data(unit, args)?;
        self.send_transaction(json!({ "data": data })).await
    }

    async fn confirm(&self, pending: PendingHandle) -> Result<Confirmation, FactoryError> {
        let receipt = self.wait_for_receipt(pending.as_str()).await?;
        let identity = identity_from_receipt(pending.as_str(), &receipt)?;
        Ok(Confirmation { identity, receipt })
    }

    /// Deploys `unit` as a new implementation, then points the proxy at `identity` to it.
    async fn upgrade(
        &self,
        identity: &Identity,
        unit: &DeploymentUnit,
    ) -> Result<PendingHandle, FactoryError> {
        let implementation = self.submit(unit, &[]).await?;
        let implementation = self.confirm(implementation).await?.identity;
        log::info!("{} implementation deployed to: {}", unit, implementation);

        let data = abi::encode_upgrade_to(implementation.as_str())?;
        self.send_transaction(json!({
            "to": identity.as_str(),
            "data": format!("0x{}", hex::encode(data)),
        }))
        .await
    }
}
