//! Key material for ledger accounts.
//!
//! Accounts are derived, never stored:
//!
//! - **Mnemonic**: a BIP39 English phrase is reduced to its entropy, and the
//!   entropy (not the phrase text) is stretched with PBKDF2-HMAC-SHA512 into a
//!   32 byte mini-secret.
//! - **Derivation path**: `//hard` and `/soft` junctions walk from the
//!   mini-secret to a child key. A `///password` suffix salts the seed.
//! - **Signer**: the resulting sr25519 (default) or ed25519 keypair. Its
//!   public key doubles as the ledger account id.
//!
//! The same phrase and path always produce the same signer, so an upload
//! identity survives process restarts without any key file on disk.

mod address;
mod junction;
mod mnemonic;
mod signer;

pub use address::{AccountId, AddressError, ACCOUNT_ID_SIZE, DEFAULT_SS58_PREFIX};
pub use junction::{DerivationPath, Junction, PathError};
pub use mnemonic::{
    entropy_from_phrase, mini_secret_from_phrase, seed_from_phrase, MnemonicError, DEV_PHRASE,
};
pub use signer::{
    derive_signer, verify, Signature, SignatureScheme, Signer, SignerError, SIGNATURE_SIZE,
    SR25519_CONTEXT,
};
