/**
 * Write-side client for the Bulletin Chain.
 *  Stores bytes or JSON through a signed ledger
 *  transaction and reports where to read them back.
 */
pub mod bulletin;
/**
 * Key material and signing.
 *  - Mnemonic phrases and derivation paths
 *  - Sr25519 / Ed25519 signers
 *  - SS58 account addresses
 */
pub mod crypto;
/**
 * Read-side client: fetch content from an
 *  HTTP gateway by CID, with an optional
 *  TTL cache in front.
 */
pub mod gateway;
/**
 * Ledger transport. Calls, inclusion results
 *  and the connector/session traits that the
 *  WebSocket, pooled and in-memory ledgers implement.
 */
pub mod ledger;
/**
 * Content identifiers. CIDv1 over raw bytes
 *  with a blake2b-256 multihash, plus the
 *  unsigned varint helper they are built from.
 */
pub mod linked_data;
/**
 * Helper for setting build version information
 *  at compile time.
 */
pub mod version;

pub mod prelude {
    pub use crate::bulletin::{
        upload, upload_json, BulletinClient, UploadError, UploadOptions, UploadResult,
    };
    pub use crate::crypto::{derive_signer, AccountId, SignatureScheme, Signer};
    pub use crate::gateway::{read_bytes, read_json, GatewayError, GatewayReader, ReadCache};
    pub use crate::ledger::{AuthorizationMode, MemoryLedger, RpcConnector, SessionPool};
    pub use crate::linked_data::{compute_cid, ContentId};
    pub use crate::version::build_info;
}
