//! The upload client.
//!
//! An upload is: compute the CID, derive the signer, open a session, submit
//! a store call (sudo-wrapped only when asked to), wait for finality, close
//! the session, and hand back the CID with the block hash and a gateway URL.
//!
//! Failures keep their retry semantics, see [`UploadError::is_retryable`].

mod client;
mod error;
mod options;

pub use client::{upload, upload_json, BulletinClient, UploadResult};
pub use error::UploadError;
pub use options::{UploadOptions, DEFAULT_DERIVATION_PATH};
