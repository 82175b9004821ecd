use std::time::Duration;

use crate::crypto::{MnemonicError, SignerError};
use crate::ledger::{BlockHash, TransportError, WatchError};

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// Missing or malformed options. Nothing touched the network.
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("invalid seed: {0}")]
    InvalidSeed(#[from] MnemonicError),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    /// The ledger refused the transaction or its dispatch failed.
    #[error("submission failed: {detail}")]
    Submission {
        detail: String,
        /// Block the failed transaction was included in, if it got that far.
        block_hash: Option<BlockHash>,
    },
    /// Finality did not arrive in time. The transaction is in flight and may
    /// still land.
    #[error("not finalized within {0:?}, transaction may still land")]
    FinalityTimeout(Duration),
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

impl UploadError {
    /// Whether repeating the call is safe. Only failures that happened
    /// before anything was submitted qualify.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_retryable(),
            _ => false,
        }
    }
}

impl From<SignerError> for UploadError {
    fn from(e: SignerError) -> Self {
        match e {
            SignerError::InvalidSeed(e) => Self::InvalidSeed(e),
            other => Self::Configuration(other.to_string()),
        }
    }
}

impl From<WatchError> for UploadError {
    fn from(e: WatchError) -> Self {
        match e {
            WatchError::Transport(e) => Self::Transport(e),
            WatchError::Rejected(detail) => Self::Submission {
                detail,
                block_hash: None,
            },
        }
    }
}
