//! JSON-RPC over WebSocket transport to a ledger node.
//!
//! Each submission looks up the account nonce, the genesis hash, the
//! runtime version and metadata, signs a v4 extrinsic, then follows
//! `author_submitAndWatchExtrinsic` until the node reports it finalized or
//! gives up on it. Once finalized, the extrinsic is located in its block and
//! the block's `System.Events` decide whether its dispatch succeeded.

mod extrinsic;
mod metadata;
mod status;
mod value;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jsonrpsee::core::client::{ClientT, SubscriptionClientT, Subscription};
use jsonrpsee::core::params::ArrayParams;
use jsonrpsee::core::ClientError;
use jsonrpsee::rpc_params;
use jsonrpsee::ws_client::{WsClient, WsClientBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::block::{BlockHash, Inclusion};
use super::call::{Call, CallIndices};
use super::transport::{LedgerConnector, LedgerSession, TransportError, WatchError};
use crate::crypto::{Signer, DEFAULT_SS58_PREFIX};

pub use extrinsic::{
    build_signed, signing_payload, ChainState, CidConfig, Hashing, RuntimeVersion,
    SignedExtension, SignedExtra,
};
pub use metadata::{ExtrinsicOutcome, MetadataError, RuntimeTypes, SYSTEM_EVENTS_KEY};
pub use status::TransactionStatus;

/// Settings for talking to a ledger node. Call indices and signed
/// extensions must match the target runtime; extensions are checked against
/// its metadata before anything is signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    pub connection_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Largest request or response frame, in bytes. Payloads travel
    /// hex-encoded, so this must be a bit over twice the largest upload.
    pub max_payload_size: u32,
    pub ss58_prefix: u16,
    pub call_indices: CallIndices,
    pub extensions: Vec<SignedExtension>,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            connection_timeout_secs: 10,
            request_timeout_secs: 60,
            max_payload_size: 32 * 1024 * 1024,
            ss58_prefix: DEFAULT_SS58_PREFIX,
            call_indices: CallIndices::default(),
            extensions: SignedExtension::bulletin(),
        }
    }
}

impl RpcConfig {
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Opens a fresh WebSocket connection per session.
#[derive(Debug, Clone, Default)]
pub struct RpcConnector {
    config: RpcConfig,
}

impl RpcConnector {
    pub fn new(config: RpcConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RpcConfig {
        &self.config
    }
}

#[async_trait]
impl LedgerConnector for RpcConnector {
    type Session = RpcSession;

    async fn connect(&self, endpoint: &str) -> Result<Self::Session, TransportError> {
        tracing::debug!(endpoint, "connecting to ledger node");
        let client = WsClientBuilder::default()
            .connection_timeout(self.config.connection_timeout())
            .request_timeout(self.config.request_timeout())
            .max_request_size(self.config.max_payload_size)
            .max_response_size(self.config.max_payload_size)
            .build(endpoint)
            .await
            .map_err(|e| {
                tracing::error!(endpoint, error = %e, "ledger connection failed");
                TransportError::Connect {
                    endpoint: endpoint.to_string(),
                    reason: e.to_string(),
                }
            })?;
        Ok(RpcSession {
            client,
            endpoint: endpoint.to_string(),
            config: self.config.clone(),
            chain: None,
            types: None,
        })
    }
}

/// One WebSocket connection to a ledger node.
#[derive(Debug)]
pub struct RpcSession {
    client: WsClient,
    endpoint: String,
    config: RpcConfig,
    /// Looked up on first submission
    chain: Option<ChainState>,
    types: Option<Arc<RuntimeTypes>>,
}

#[derive(Debug, Deserialize)]
struct SignedBlock {
    block: Block,
}

#[derive(Debug, Deserialize)]
struct Block {
    header: Header,
    extrinsics: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Header {
    number: String,
}

fn decode_hex(what: &str, value: &str) -> Result<Vec<u8>, TransportError> {
    hex::decode(value.strip_prefix("0x").unwrap_or(value))
        .map_err(|e| TransportError::Protocol(format!("malformed {what}: {e}")))
}

impl RpcSession {
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn request<R: DeserializeOwned>(
        &self,
        method: &str,
        params: ArrayParams,
    ) -> Result<R, TransportError> {
        self.client
            .request(method, params)
            .await
            .map_err(|e| TransportError::Request {
                method: method.to_string(),
                reason: e.to_string(),
            })
    }

    async fn chain_state(&mut self) -> Result<ChainState, TransportError> {
        if let Some(chain) = self.chain {
            return Ok(chain);
        }
        let genesis_hash: BlockHash = self.request("chain_getBlockHash", rpc_params![0]).await?;
        let runtime: RuntimeVersion = self
            .request("state_getRuntimeVersion", rpc_params![])
            .await?;
        tracing::debug!(
            %genesis_hash,
            spec_version = runtime.spec_version,
            transaction_version = runtime.transaction_version,
            "fetched chain state"
        );
        let chain = ChainState {
            genesis_hash,
            runtime,
        };
        self.chain = Some(chain);
        Ok(chain)
    }

    async fn runtime_types(&mut self) -> Result<Arc<RuntimeTypes>, TransportError> {
        if let Some(types) = &self.types {
            return Ok(types.clone());
        }
        let encoded: String = self.request("state_getMetadata", rpc_params![]).await?;
        let types = RuntimeTypes::decode(&decode_hex("metadata", &encoded)?)
            .map_err(|e| TransportError::Protocol(e.to_string()))?;
        tracing::debug!(
            extensions = ?types.extension_identifiers(),
            "fetched runtime metadata"
        );
        let types = Arc::new(types);
        self.types = Some(types.clone());
        Ok(types)
    }

    /// Follow the status stream until the transaction is finalized.
    async fn watch(
        &self,
        mut subscription: Subscription<TransactionStatus>,
    ) -> Result<BlockHash, WatchError> {
        while let Some(status) = subscription.next().await {
            let status = status.map_err(|e| {
                TransportError::Protocol(format!("malformed transaction status: {e}"))
            })?;
            tracing::debug!(endpoint = %self.endpoint, ?status, "transaction status");
            if let Some(reason) = status.failure() {
                tracing::error!(endpoint = %self.endpoint, %reason, "transaction will not finalize");
                return Err(WatchError::Rejected(reason));
            }
            match status {
                TransactionStatus::Retracted(block) => {
                    tracing::warn!(%block, "block containing transaction was retracted");
                }
                TransactionStatus::Finalized(block_hash) => return Ok(block_hash),
                _ => {}
            }
        }
        tracing::error!(endpoint = %self.endpoint, "status stream closed before finality");
        Err(TransportError::StreamClosed.into())
    }

    /// Locate `extrinsic` in the finalized block and read its outcome from
    /// the block's events.
    async fn inclusion(
        &self,
        block_hash: BlockHash,
        extrinsic: &str,
        types: &RuntimeTypes,
    ) -> Result<Inclusion, TransportError> {
        let signed: SignedBlock = self.request("chain_getBlock", rpc_params![block_hash]).await?;
        let position = signed
            .block
            .extrinsics
            .iter()
            .position(|xt| xt.eq_ignore_ascii_case(extrinsic))
            .ok_or_else(|| {
                TransportError::Protocol(format!("extrinsic missing from finalized block {block_hash}"))
            })?;
        let extrinsic_index = u32::try_from(position)
            .map_err(|_| TransportError::Protocol(format!("extrinsic index {position} out of range")))?;
        let number = &signed.block.header.number;
        let block_number = u32::from_str_radix(number.trim_start_matches("0x"), 16)
            .map_err(|e| TransportError::Protocol(format!("malformed block number {number}: {e}")))?;

        let events: Option<String> = self
            .request("state_getStorage", rpc_params![SYSTEM_EVENTS_KEY, block_hash])
            .await?;
        let events = match events {
            Some(encoded) => decode_hex("events", &encoded)?,
            None => Vec::new(),
        };
        let outcome = types
            .outcome(&events, extrinsic_index)
            .map_err(|e| TransportError::Protocol(e.to_string()))?;
        tracing::debug!(
            %block_hash,
            block_number,
            extrinsic_index,
            ?outcome,
            "resolved dispatch outcome"
        );

        Ok(Inclusion {
            block_hash,
            block_number: Some(block_number),
            index: outcome.stored_index,
            dispatch_error: outcome.dispatch_error,
        })
    }
}

/// A JSON-RPC error on submission means the node refused the extrinsic.
/// Anything else leaves its fate unknown.
fn submit_error(e: ClientError) -> WatchError {
    match e {
        ClientError::Call(err) => {
            let reason = match err.data() {
                Some(data) => format!("{}: {}", err.message(), data.get()),
                None => err.message().to_string(),
            };
            WatchError::Rejected(reason)
        }
        other => {
            tracing::error!(error = %other, "submission failed in flight");
            TransportError::StreamClosed.into()
        }
    }
}

#[async_trait]
impl LedgerSession for RpcSession {
    async fn submit_and_watch(
        &mut self,
        call: &Call<'_>,
        signer: &Signer,
    ) -> Result<Inclusion, WatchError> {
        let address = signer
            .account_id()
            .to_ss58(self.config.ss58_prefix)
            .map_err(|e| TransportError::Protocol(e.to_string()))?;
        let nonce: u64 = self
            .request("system_accountNextIndex", rpc_params![address.clone()])
            .await?;
        let chain = self.chain_state().await?;
        let types = self.runtime_types().await?;
        types
            .check_extensions(&self.config.extensions)
            .map_err(TransportError::Protocol)?;

        let encoded = call.encode(&self.config.call_indices);
        let extra = SignedExtra::new(nonce, &self.config.extensions);
        let extrinsic = format!(
            "0x{}",
            hex::encode(build_signed(&encoded, signer, &extra, &chain))
        );
        tracing::debug!(
            call = call.name(),
            %address,
            nonce,
            len = extrinsic.len() / 2 - 1,
            "submitting extrinsic"
        );

        let subscription = self
            .client
            .subscribe(
                "author_submitAndWatchExtrinsic",
                rpc_params![extrinsic.clone()],
                "author_unwatchExtrinsic",
            )
            .await
            .map_err(submit_error)?;
        let block_hash = self.watch(subscription).await?;

        // the transaction is final, so no failure from here on is retryable
        self.inclusion(block_hash, &extrinsic, &types)
            .await
            .map_err(|e| match e {
                TransportError::Request { method, reason } => TransportError::Protocol(format!(
                    "{method} failed after {block_hash} was finalized: {reason}"
                )),
                other => other,
            })
            .map_err(WatchError::from)
    }

    async fn close(self) -> Result<(), TransportError> {
        tracing::debug!(endpoint = %self.endpoint, "closing ledger connection");
        drop(self.client);
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        self.client.is_connected()
    }
}
