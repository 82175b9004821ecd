use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parity_scale_codec::Encode;
use parking_lot::RwLock;

use super::block::{BlockHash, DispatchError, Inclusion};
use super::call::{Call, CallIndices};
use super::transport::{LedgerConnector, LedgerSession, TransportError, WatchError};
use crate::crypto::{self, AccountId, Signer};
use crate::linked_data::{blake2b_256, compute_cid, ContentId};

/// Largest payload a single store accepts.
pub const DEFAULT_MAX_TRANSACTION_SIZE: usize = 8 * 1024 * 1024;

/// Public key of `//Alice` under the development phrase, the sudo key of
/// development chains.
pub const DEV_SUDO_KEY: AccountId = AccountId([
    0xd4, 0x35, 0x93, 0xc7, 0x15, 0xfd, 0xd3, 0x1c, 0x61, 0x14, 0x1a, 0xbd, 0x04, 0xa9, 0x9f, 0xd6,
    0x82, 0x2c, 0x85, 0x58, 0x85, 0x4c, 0xcd, 0xe3, 0x9a, 0x56, 0x84, 0xe7, 0xa5, 0x6d, 0xa2, 0x7d,
]);

/// Failure to inject into the next operations against a [`MemoryLedger`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FailureMode {
    #[default]
    None,
    /// Refuse new connections.
    RefuseConnections,
    /// Lose the connection before the transaction is sent.
    DropBeforeSubmit,
    /// Refuse the transaction at the pool with the given reason.
    Reject(String),
    /// Accept the transaction, then end the status stream without a verdict.
    CloseStream,
    /// Accept the transaction and never finalize it.
    NeverFinalize,
}

/// Counters for what callers did against the ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerStats {
    pub connect_attempts: usize,
    pub connects: usize,
    pub closes: usize,
    pub submissions: usize,
}

impl LedgerStats {
    /// Sessions opened and not yet closed.
    pub fn open_sessions(&self) -> usize {
        self.connects.saturating_sub(self.closes)
    }
}

/// Remaining storage quota of an account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Authorization {
    pub transactions: u32,
    pub bytes: u64,
}

impl Authorization {
    fn allows(&self, size: usize) -> bool {
        self.transactions > 0 && self.bytes >= size as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub cid: ContentId,
    pub size: usize,
    pub block: u32,
    pub index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryBlock {
    pub number: u32,
    pub hash: BlockHash,
    pub parent: BlockHash,
    /// Entries stored or renewed by this block.
    pub entries: Vec<StoredEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Signed(AccountId),
    Root,
}

/// An in-process ledger with transaction-storage semantics.
///
/// Every submission is finalized immediately in a block of its own. Content
/// stored through it can be read back by CID, which makes it usable as the
/// backing store of a test gateway.
#[derive(Debug, Clone)]
pub struct MemoryLedger {
    inner: Arc<RwLock<MemoryLedgerInner>>,
}

#[derive(Debug)]
struct MemoryLedgerInner {
    blocks: Vec<MemoryBlock>,
    /// Stored bytes by CID
    content: HashMap<ContentId, Bytes>,
    /// Stored entries by (block, index)
    entries: HashMap<(u32, u32), StoredEntry>,
    authorizations: HashMap<AccountId, Authorization>,
    nonces: HashMap<AccountId, u64>,
    sudo_key: AccountId,
    indices: CallIndices,
    max_transaction_size: usize,
    failure: FailureMode,
    stats: LedgerStats,
}

impl MemoryLedger {
    pub fn new() -> Self {
        let genesis = MemoryBlock {
            number: 0,
            hash: BlockHash(blake2b_256(b"memory-ledger-genesis")),
            parent: BlockHash::default(),
            entries: Vec::new(),
        };
        Self {
            inner: Arc::new(RwLock::new(MemoryLedgerInner {
                blocks: vec![genesis],
                content: HashMap::new(),
                entries: HashMap::new(),
                authorizations: HashMap::new(),
                nonces: HashMap::new(),
                sudo_key: DEV_SUDO_KEY,
                indices: CallIndices::default(),
                max_transaction_size: DEFAULT_MAX_TRANSACTION_SIZE,
                failure: FailureMode::None,
                stats: LedgerStats::default(),
            })),
        }
    }

    pub fn with_sudo_key(self, sudo_key: AccountId) -> Self {
        self.inner.write().sudo_key = sudo_key;
        self
    }

    pub fn with_max_transaction_size(self, size: usize) -> Self {
        self.inner.write().max_transaction_size = size;
        self
    }

    pub fn sudo_key(&self) -> AccountId {
        self.inner.read().sudo_key
    }

    pub fn set_failure(&self, failure: FailureMode) {
        self.inner.write().failure = failure;
    }

    pub fn stats(&self) -> LedgerStats {
        self.inner.read().stats
    }

    pub fn content(&self, cid: &ContentId) -> Option<Bytes> {
        self.inner.read().content.get(cid).cloned()
    }

    pub fn entry(&self, block: u32, index: u32) -> Option<StoredEntry> {
        self.inner.read().entries.get(&(block, index)).cloned()
    }

    pub fn block(&self, hash: &BlockHash) -> Option<MemoryBlock> {
        self.inner
            .read()
            .blocks
            .iter()
            .find(|block| block.hash == *hash)
            .cloned()
    }

    pub fn best_block(&self) -> MemoryBlock {
        let inner = self.inner.read();
        // genesis is always present
        inner.blocks[inner.blocks.len() - 1].clone()
    }

    pub fn nonce(&self, account: &AccountId) -> u64 {
        self.inner.read().nonces.get(account).copied().unwrap_or(0)
    }

    pub fn authorization(&self, account: &AccountId) -> Authorization {
        self.inner
            .read()
            .authorizations
            .get(account)
            .copied()
            .unwrap_or_default()
    }

    /// Grant quota directly, as a genesis config would.
    pub fn authorize(&self, account: AccountId, transactions: u32, bytes: u64) {
        self.inner
            .write()
            .grant(account, Authorization { transactions, bytes });
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedgerInner {
    fn grant(&mut self, account: AccountId, grant: Authorization) {
        let current = self.authorizations.entry(account).or_default();
        current.transactions = current.transactions.saturating_add(grant.transactions);
        current.bytes = current.bytes.saturating_add(grant.bytes);
    }

    /// Pool-level checks. Failing these keeps the transaction out of a block.
    fn validate(&self, origin: Origin, call: &Call<'_>) -> Result<(), String> {
        let Origin::Signed(account) = origin else {
            return Ok(());
        };
        let size = match call {
            Call::Store { data } => data.len(),
            Call::Renew { block, index } => match self.entries.get(&(*block, *index)) {
                Some(entry) => entry.size,
                None => return Ok(()),
            },
            _ => return Ok(()),
        };
        let quota = self.authorizations.get(&account).copied().unwrap_or_default();
        if !quota.allows(size) {
            return Err(format!(
                "invalid transaction: {} is not authorized to store {} bytes",
                account, size
            ));
        }
        Ok(())
    }

    fn consume(&mut self, origin: Origin, size: usize) {
        if let Origin::Signed(account) = origin {
            if let Some(quota) = self.authorizations.get_mut(&account) {
                quota.transactions = quota.transactions.saturating_sub(1);
                quota.bytes = quota.bytes.saturating_sub(size as u64);
            }
        }
    }

    fn dispatch(
        &mut self,
        origin: Origin,
        call: &Call<'_>,
        block: u32,
        stored: &mut Vec<StoredEntry>,
    ) -> Result<Option<u32>, DispatchError> {
        match call {
            Call::Store { data } => {
                if data.is_empty() {
                    return Err(DispatchError::module("TransactionStorage", "EmptyTransaction"));
                }
                if data.len() > self.max_transaction_size {
                    return Err(DispatchError::module(
                        "TransactionStorage",
                        "TransactionTooLarge",
                    ));
                }
                self.consume(origin, data.len());
                let cid = compute_cid(data);
                self.content
                    .entry(cid)
                    .or_insert_with(|| Bytes::copy_from_slice(data));
                Ok(Some(push_entry(stored, cid, data.len(), block)))
            }
            Call::Renew {
                block: old_block,
                index,
            } => {
                let entry = self
                    .entries
                    .get(&(*old_block, *index))
                    .cloned()
                    .ok_or_else(|| DispatchError::module("TransactionStorage", "RenewedNotFound"))?;
                self.consume(origin, entry.size);
                Ok(Some(push_entry(stored, entry.cid, entry.size, block)))
            }
            Call::AuthorizeAccount {
                who,
                transactions,
                bytes,
            } => {
                if origin != Origin::Root {
                    return Err(DispatchError::other("BadOrigin"));
                }
                self.grant(
                    *who,
                    Authorization {
                        transactions: *transactions,
                        bytes: *bytes,
                    },
                );
                Ok(None)
            }
            Call::Sudo { call } => match origin {
                Origin::Signed(account) if account != self.sudo_key => {
                    Err(DispatchError::module("Sudo", "RequireSudo"))
                }
                _ => self.dispatch(Origin::Root, call, block, stored),
            },
        }
    }

    fn seal_block(&mut self, seed: &[u8], entries: Vec<StoredEntry>) -> MemoryBlock {
        let parent = self.blocks[self.blocks.len() - 1].hash;
        let number = self.blocks.len() as u32;
        let mut preimage = parent.0.to_vec();
        preimage.extend_from_slice(&number.to_le_bytes());
        preimage.extend_from_slice(seed);
        let block = MemoryBlock {
            number,
            hash: BlockHash(blake2b_256(&preimage)),
            parent,
            entries,
        };
        for entry in &block.entries {
            self.entries.insert((entry.block, entry.index), entry.clone());
        }
        self.blocks.push(block.clone());
        block
    }
}

fn push_entry(stored: &mut Vec<StoredEntry>, cid: ContentId, size: usize, block: u32) -> u32 {
    let index = stored.len() as u32;
    stored.push(StoredEntry {
        cid,
        size,
        block,
        index,
    });
    index
}

#[async_trait]
impl LedgerConnector for MemoryLedger {
    type Session = MemorySession;

    async fn connect(&self, endpoint: &str) -> Result<Self::Session, TransportError> {
        let mut inner = self.inner.write();
        inner.stats.connect_attempts += 1;
        if endpoint.is_empty() || inner.failure == FailureMode::RefuseConnections {
            return Err(TransportError::Connect {
                endpoint: endpoint.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        inner.stats.connects += 1;
        tracing::debug!(endpoint, "memory ledger session opened");
        Ok(MemorySession {
            ledger: self.clone(),
            endpoint: endpoint.to_string(),
            healthy: true,
        })
    }
}

/// A session against a [`MemoryLedger`].
#[derive(Debug)]
pub struct MemorySession {
    ledger: MemoryLedger,
    endpoint: String,
    healthy: bool,
}

impl MemorySession {
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl MemoryLedger {
    /// Run one submission to completion. `Ok(None)` means the transaction
    /// was accepted but will never finalize.
    fn process(&self, call: &Call<'_>, signer: &Signer) -> Result<Option<Inclusion>, WatchError> {
        let mut inner = self.inner.write();
        let failure = inner.failure.clone();
        match &failure {
            FailureMode::DropBeforeSubmit => {
                return Err(TransportError::Request {
                    method: "system_accountNextIndex".to_string(),
                    reason: "connection reset".to_string(),
                }
                .into());
            }
            FailureMode::Reject(reason) => return Err(WatchError::Rejected(reason.clone())),
            _ => {}
        }

        let account = signer.account_id();
        let nonce = inner.nonces.get(&account).copied().unwrap_or(0);
        let mut payload = call.encode(&inner.indices);
        nonce.encode_to(&mut payload);
        let signature = signer.sign(&payload);
        if !crypto::verify(&account, &payload, &signature) {
            return Err(WatchError::Rejected(
                "invalid transaction: bad signature".to_string(),
            ));
        }

        let origin = Origin::Signed(account);
        inner.validate(origin, call).map_err(WatchError::Rejected)?;
        inner.stats.submissions += 1;

        match failure {
            FailureMode::CloseStream => return Err(TransportError::StreamClosed.into()),
            FailureMode::NeverFinalize => return Ok(None),
            _ => {}
        }

        let number = inner.blocks.len() as u32;
        let mut stored = Vec::new();
        let outcome = inner.dispatch(origin, call, number, &mut stored);
        inner.nonces.insert(account, nonce + 1);
        let block = inner.seal_block(&payload, stored);

        let (index, dispatch_error) = match outcome {
            Ok(index) => (index, None),
            Err(e) => (None, Some(e)),
        };
        tracing::debug!(
            call = call.name(),
            block = block.number,
            ?dispatch_error,
            "memory ledger finalized transaction"
        );
        Ok(Some(Inclusion {
            block_hash: block.hash,
            block_number: Some(block.number),
            index,
            dispatch_error,
        }))
    }
}

#[async_trait]
impl LedgerSession for MemorySession {
    async fn submit_and_watch(
        &mut self,
        call: &Call<'_>,
        signer: &Signer,
    ) -> Result<Inclusion, WatchError> {
        match self.ledger.process(call, signer) {
            Ok(Some(inclusion)) => Ok(inclusion),
            Ok(None) => Ok(std::future::pending::<Inclusion>().await),
            Err(WatchError::Transport(e)) => {
                self.healthy = false;
                Err(e.into())
            }
            Err(e) => Err(e),
        }
    }

    async fn close(self) -> Result<(), TransportError> {
        self.ledger.inner.write().stats.closes += 1;
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        self.healthy
    }
}
