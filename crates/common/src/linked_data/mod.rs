//! Content addressing.
//!
//! Content identifiers here are CIDv1 with the `raw` codec over a
//! BLAKE2b-256 multihash, rendered as base32:
//!
//! ```text
//! varint(1) || varint(0x55) || varint(0xb220) || varint(32) || digest
//! ```
//!
//! The mapping is one way. A CID names content, it does not contain it;
//! getting bytes back from a CID takes a gateway lookup.

mod content_id;
pub mod varint;

pub use content_id::{
    blake2b_256, cid_bytes, cid_to_bytes32, compute_cid, multihash_bytes, verify, CidError,
    ContentId, BLAKE2B_256, DIGEST_SIZE, RAW,
};
pub use ::cid::multibase;
pub use ::cid::Cid;
