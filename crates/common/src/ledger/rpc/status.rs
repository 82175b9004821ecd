use serde::Deserialize;

use crate::ledger::BlockHash;

/// Status notifications of `author_submitAndWatchExtrinsic`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionStatus {
    /// Waiting on an earlier nonce.
    Future,
    Ready,
    Broadcast(Vec<String>),
    InBlock(BlockHash),
    /// The block it was in is no longer on the best chain.
    Retracted(BlockHash),
    /// Finality stalled for too long after inclusion.
    FinalityTimeout(BlockHash),
    Finalized(BlockHash),
    /// Replaced by another transaction with the same nonce.
    Usurped(String),
    Dropped,
    Invalid,
}

impl TransactionStatus {
    /// Why the transaction will never be finalized, if this status ends it.
    pub fn failure(&self) -> Option<String> {
        match self {
            Self::Invalid => Some("invalid".to_string()),
            Self::Dropped => Some("dropped".to_string()),
            Self::Usurped(by) => Some(format!("usurped by {by}")),
            Self::FinalityTimeout(block) => Some(format!("finality timeout in block {block}")),
            _ => None,
        }
    }
}
