use async_trait::async_trait;

use super::block::Inclusion;
use super::call::Call;
use crate::crypto::Signer;

/// Failures talking to a ledger node. None of these mean the ledger
/// rejected a transaction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("failed to connect to {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },
    #[error("rpc request {method} failed: {reason}")]
    Request { method: String, reason: String },
    #[error("unexpected response from node: {0}")]
    Protocol(String),
    /// The status stream ended after the transaction went out. The
    /// transaction may still be included.
    #[error("status stream closed before finality, transaction may still land")]
    StreamClosed,
    /// Every pooled session is checked out.
    #[error("session pool exhausted ({capacity} sessions in use)")]
    PoolExhausted { capacity: usize },
}

impl TransportError {
    /// Whether retrying the whole operation is safe: true only when nothing
    /// can have been submitted.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connect { .. } | Self::Request { .. } | Self::PoolExhausted { .. } => true,
            Self::Protocol(_) | Self::StreamClosed => false,
        }
    }
}

/// Failures while submitting and following a transaction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WatchError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The node refused the transaction or dropped it from its pool.
    #[error("transaction rejected: {0}")]
    Rejected(String),
}

/// Opens sessions to ledger nodes.
#[async_trait]
pub trait LedgerConnector: Send + Sync + std::fmt::Debug + 'static {
    type Session: LedgerSession;

    async fn connect(&self, endpoint: &str) -> Result<Self::Session, TransportError>;
}

/// An open session with a ledger node, owned by one operation at a time.
#[async_trait]
pub trait LedgerSession: Send + std::fmt::Debug + 'static {
    /// Sign `call` with `signer`, submit it, and wait until it is included in
    /// a finalized block.
    ///
    /// # Returns
    /// * `Ok(Inclusion)` - The transaction was finalized. Check
    ///   `dispatch_error` before assuming it took effect.
    /// * `Err(WatchError::Rejected)` - The node refused or dropped it.
    /// * `Err(WatchError::Transport)` - The session failed. See
    ///   [`TransportError::is_retryable`] for whether it went out.
    async fn submit_and_watch(
        &mut self,
        call: &Call<'_>,
        signer: &Signer,
    ) -> Result<Inclusion, WatchError>;

    /// Release the session.
    async fn close(self) -> Result<(), TransportError>;

    /// Whether the session can be handed to another operation.
    fn is_healthy(&self) -> bool {
        true
    }
}
