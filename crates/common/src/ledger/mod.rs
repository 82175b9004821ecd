//! The write side: calls, and the transports that carry them to a ledger.
//!
//! The ledger is an append-only chain with a transaction-storage pallet.
//! A submitted call is signed by an account, included in a block, and
//! eventually finalized. This module does not care how a node is reached;
//! [`LedgerConnector`] and [`LedgerSession`] are the seam:
//!
//! - [`RpcConnector`]: JSON-RPC over WebSocket to a real node
//! - [`MemoryLedger`]: an in-process ledger for tests and local tooling
//! - [`SessionPool`]: a bounded pool over either of the above

mod block;
mod call;
pub mod memory;
mod pool;
pub mod rpc;
mod transport;

pub use block::{BlockHash, BlockHashError, DispatchError, Inclusion, BLOCK_HASH_SIZE};
pub use call::{AuthorizationMode, Call, CallIndex, CallIndices};
pub use memory::MemoryLedger;
pub use pool::{PooledSession, SessionPool, DEFAULT_POOL_CAPACITY};
pub use rpc::{RpcConfig, RpcConnector, RpcSession, SignedExtension};
pub use transport::{LedgerConnector, LedgerSession, TransportError, WatchError};
