use std::fmt;

use parity_scale_codec::Encode;
use serde::{Deserialize, Serialize};

use crate::crypto::AccountId;

/// Position of a pallet call in the runtime: `[pallet index, call index]`.
pub type CallIndex = [u8; 2];

/// Where the calls this client submits live in the target runtime.
///
/// These have to agree with the runtime metadata of the chain being
/// written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallIndices {
    pub store: CallIndex,
    pub renew: CallIndex,
    pub authorize_account: CallIndex,
    pub sudo: CallIndex,
}

impl Default for CallIndices {
    fn default() -> Self {
        Self {
            store: [40, 0],
            renew: [40, 1],
            authorize_account: [40, 2],
            sudo: [255, 0],
        }
    }
}

/// How a call reaches the ledger.
///
/// `Sudo` wraps the call in a privileged envelope. It only works for the
/// chain's sudo key and exists for development networks where that key is
/// public; production accounts submit `Direct` and need storage quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorizationMode {
    #[default]
    Direct,
    Sudo,
}

impl fmt::Display for AuthorizationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => f.write_str("direct"),
            Self::Sudo => f.write_str("sudo"),
        }
    }
}

impl std::str::FromStr for AuthorizationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "sudo" => Ok(Self::Sudo),
            other => Err(format!("unknown authorization mode: {other}")),
        }
    }
}

/// A runtime call this client knows how to encode.
#[derive(Clone, PartialEq, Eq)]
pub enum Call<'a> {
    /// Store `data` verbatim.
    Store { data: &'a [u8] },
    /// Extend the retention period of an entry stored earlier.
    Renew { block: u32, index: u32 },
    /// Grant `who` quota for `transactions` stores totalling `bytes`.
    AuthorizeAccount {
        who: AccountId,
        transactions: u32,
        bytes: u64,
    },
    /// Dispatch `call` with root origin.
    Sudo { call: Box<Call<'a>> },
}

impl<'a> Call<'a> {
    pub fn store(data: &'a [u8]) -> Self {
        Self::Store { data }
    }

    pub fn sudo(call: Call<'a>) -> Self {
        Self::Sudo {
            call: Box::new(call),
        }
    }

    /// Wrap in a sudo envelope when `mode` asks for it.
    pub fn authorized(self, mode: AuthorizationMode) -> Self {
        match mode {
            AuthorizationMode::Direct => self,
            AuthorizationMode::Sudo => Self::sudo(self),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Store { .. } => "TransactionStorage.store",
            Self::Renew { .. } => "TransactionStorage.renew",
            Self::AuthorizeAccount { .. } => "TransactionStorage.authorize_account",
            Self::Sudo { .. } => "Sudo.sudo",
        }
    }

    /// SCALE encoding of the call: its index followed by its arguments.
    pub fn encode(&self, indices: &CallIndices) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_to(indices, &mut out);
        out
    }

    fn encode_to(&self, indices: &CallIndices, out: &mut Vec<u8>) {
        match self {
            Self::Store { data } => {
                out.extend_from_slice(&indices.store);
                data.encode_to(out);
            }
            Self::Renew { block, index } => {
                out.extend_from_slice(&indices.renew);
                block.encode_to(out);
                index.encode_to(out);
            }
            Self::AuthorizeAccount {
                who,
                transactions,
                bytes,
            } => {
                out.extend_from_slice(&indices.authorize_account);
                who.0.encode_to(out);
                transactions.encode_to(out);
                bytes.encode_to(out);
            }
            Self::Sudo { call } => {
                out.extend_from_slice(&indices.sudo);
                call.encode_to(indices, out);
            }
        }
    }
}

impl fmt::Debug for Call<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store { data } => f
                .debug_struct("Store")
                .field("len", &data.len())
                .finish(),
            Self::Renew { block, index } => f
                .debug_struct("Renew")
                .field("block", block)
                .field("index", index)
                .finish(),
            Self::AuthorizeAccount {
                who,
                transactions,
                bytes,
            } => f
                .debug_struct("AuthorizeAccount")
                .field("who", who)
                .field("transactions", transactions)
                .field("bytes", bytes)
                .finish(),
            Self::Sudo { call } => f.debug_tuple("Sudo").field(call).finish(),
        }
    }
}
