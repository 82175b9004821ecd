use serde::Serialize;
use tracing::Instrument;

use super::error::UploadError;
use super::options::UploadOptions;
use crate::crypto::{AccountId, Signer};
use crate::ledger::{
    BlockHash, Call, Inclusion, LedgerConnector, LedgerSession, RpcConnector,
};
use crate::linked_data::{compute_cid, ContentId};

/// What an upload produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    pub cid: ContentId,
    pub block_hash: BlockHash,
    /// `gateway_base_url` followed by the CID.
    pub gateway_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u32>,
    /// Index of the stored entry within its block, when known. Needed to
    /// renew the entry later.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
}

/// Writes content to the ledger.
///
/// Every operation opens its own session through the connector and closes
/// it before returning, on success and on failure alike. Nothing is retried
/// here: resubmitting a store can pay for it twice.
#[derive(Debug, Clone, Default)]
pub struct BulletinClient<C: LedgerConnector = RpcConnector> {
    connector: C,
}

impl<C: LedgerConnector> BulletinClient<C> {
    pub fn new(connector: C) -> Self {
        Self { connector }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Store `data` on the ledger and wait for finality.
    ///
    /// The CID is computed before any network activity. `data` is submitted
    /// as-is.
    #[tracing::instrument(
        name = "upload",
        skip_all,
        fields(len = data.len(), cid = tracing::field::Empty)
    )]
    pub async fn upload(
        &self,
        data: &[u8],
        opts: &UploadOptions,
    ) -> Result<UploadResult, UploadError> {
        opts.validate_transport()?;
        opts.validate_gateway()?;

        let cid = compute_cid(data);
        tracing::Span::current().record("cid", tracing::field::display(&cid));

        let signer = opts.signer()?;
        let call = Call::store(data).authorized(opts.authorization);
        let inclusion = self.submit(&call, &signer, opts).await?;

        let result = UploadResult {
            cid,
            block_hash: inclusion.block_hash,
            gateway_url: opts.gateway_url(&cid),
            block_number: inclusion.block_number,
            index: inclusion.index,
        };
        tracing::info!(
            cid = %result.cid,
            block = %result.block_hash,
            url = %result.gateway_url,
            "upload finalized"
        );
        Ok(result)
    }

    /// Serialize `value` as pretty-printed JSON and upload the UTF-8 bytes.
    pub async fn upload_json<T: Serialize + ?Sized>(
        &self,
        value: &T,
        opts: &UploadOptions,
    ) -> Result<UploadResult, UploadError> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.upload(&bytes, opts).await
    }

    /// Extend the retention of the entry stored at `index` in `block`.
    pub async fn renew(
        &self,
        block: u32,
        index: u32,
        opts: &UploadOptions,
    ) -> Result<Inclusion, UploadError> {
        opts.validate_transport()?;
        let signer = opts.signer()?;
        let call = Call::Renew { block, index }.authorized(opts.authorization);
        let span = tracing::info_span!("renew", block, index);
        let inclusion = self.submit(&call, &signer, opts).instrument(span).await?;
        tracing::info!(block, index, renewed_in = %inclusion.block_hash, "entry renewed");
        Ok(inclusion)
    }

    /// Grant `who` storage quota. Needs root, so `opts.authorization` is
    /// normally [`AuthorizationMode::Sudo`](crate::ledger::AuthorizationMode::Sudo).
    pub async fn authorize_account(
        &self,
        who: AccountId,
        transactions: u32,
        bytes: u64,
        opts: &UploadOptions,
    ) -> Result<Inclusion, UploadError> {
        opts.validate_transport()?;
        let signer = opts.signer()?;
        let call = Call::AuthorizeAccount {
            who,
            transactions,
            bytes,
        }
        .authorized(opts.authorization);
        let span = tracing::info_span!("authorize_account", %who, transactions, bytes);
        let inclusion = self.submit(&call, &signer, opts).instrument(span).await?;
        tracing::info!(%who, transactions, bytes, "account authorized");
        Ok(inclusion)
    }

    /// Connect, submit, and always close.
    async fn submit(
        &self,
        call: &Call<'_>,
        signer: &Signer,
        opts: &UploadOptions,
    ) -> Result<Inclusion, UploadError> {
        let mut session = self.connector.connect(&opts.transport_endpoint).await?;
        tracing::debug!(
            call = call.name(),
            account = %signer.account_id(),
            authorization = %opts.authorization,
            "submitting"
        );

        let outcome = match opts.finality_timeout {
            Some(limit) => {
                match tokio::time::timeout(limit, session.submit_and_watch(call, signer)).await {
                    Ok(outcome) => outcome.map_err(UploadError::from),
                    Err(_) => {
                        tracing::warn!(?limit, "gave up waiting for finality");
                        Err(UploadError::FinalityTimeout(limit))
                    }
                }
            }
            None => session
                .submit_and_watch(call, signer)
                .await
                .map_err(UploadError::from),
        };

        if let Err(e) = session.close().await {
            tracing::warn!(error = %e, "failed to close ledger session");
        }

        let inclusion = outcome?;
        if let Some(dispatch_error) = &inclusion.dispatch_error {
            tracing::error!(
                call = call.name(),
                block = %inclusion.block_hash,
                error = %dispatch_error,
                "transaction dispatch failed"
            );
            return Err(UploadError::Submission {
                detail: dispatch_error.to_string(),
                block_hash: Some(inclusion.block_hash),
            });
        }
        Ok(inclusion)
    }
}

/// Upload through a fresh WebSocket connection with default settings.
pub async fn upload(data: &[u8], opts: &UploadOptions) -> Result<UploadResult, UploadError> {
    BulletinClient::<RpcConnector>::default()
        .upload(data, opts)
        .await
}

/// JSON flavour of [`upload`].
pub async fn upload_json<T: Serialize + ?Sized>(
    value: &T,
    opts: &UploadOptions,
) -> Result<UploadResult, UploadError> {
    BulletinClient::<RpcConnector>::default()
        .upload_json(value, opts)
        .await
}
