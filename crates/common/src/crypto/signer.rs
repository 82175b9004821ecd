use std::fmt;
use std::str::FromStr;

use ed25519_dalek::{Signer as _, SigningKey, Verifier as _, VerifyingKey};
use parity_scale_codec::Encode;
use schnorrkel::derive::{ChainCode, Derivation};
use schnorrkel::{ExpansionMode, Keypair};
use serde::{Deserialize, Serialize};

use super::address::AccountId;
use super::junction::{DerivationPath, Junction, PathError};
use super::mnemonic::{mini_secret_from_phrase, seed_from_phrase, MnemonicError};
use crate::linked_data::blake2b_256;

/// Size of a signature under either scheme.
pub const SIGNATURE_SIZE: usize = 64;
/// Signing context the ledger expects for sr25519 signatures.
pub const SR25519_CONTEXT: &[u8] = b"substrate";

#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("invalid seed: {0}")]
    InvalidSeed(#[from] MnemonicError),
    #[error("invalid derivation path: {0}")]
    InvalidPath(#[from] PathError),
    #[error("{0} does not support soft derivation")]
    SoftDerivationUnsupported(SignatureScheme),
}

/// Signature scheme a signer derives keys for.
///
/// The discriminant is the `MultiSignature` variant index used when the
/// signature is placed in an extrinsic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureScheme {
    Ed25519 = 0,
    #[default]
    Sr25519 = 1,
}

impl SignatureScheme {
    pub fn multi_signature_index(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for SignatureScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ed25519 => f.write_str("ed25519"),
            Self::Sr25519 => f.write_str("sr25519"),
        }
    }
}

impl FromStr for SignatureScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ed25519" => Ok(Self::Ed25519),
            "sr25519" => Ok(Self::Sr25519),
            other => Err(format!("unknown signature scheme: {other}")),
        }
    }
}

/// A 64 byte signature, tagged by the scheme that produced it.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub scheme: SignatureScheme,
    pub bytes: [u8; SIGNATURE_SIZE],
}

impl Signature {
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.bytes))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}, {})", self.scheme, self.to_hex())
    }
}

/// `MultiSignature` encoding: the scheme index followed by the raw bytes.
impl Encode for Signature {
    fn size_hint(&self) -> usize {
        1 + SIGNATURE_SIZE
    }

    fn encode_to<T: parity_scale_codec::Output + ?Sized>(&self, dest: &mut T) {
        dest.push_byte(self.scheme.multi_signature_index());
        dest.write(&self.bytes);
    }
}

#[derive(Clone)]
enum Keys {
    Sr25519(Keypair),
    Ed25519(SigningKey),
}

/// A keypair derived from a mnemonic and a derivation path.
///
/// Derivation is deterministic: the same phrase, path and scheme always give
/// the same keys, so an identity can be rebuilt without storing key material.
#[derive(Clone)]
pub struct Signer {
    keys: Keys,
}

impl Signer {
    /// Derive a signer from a BIP39 phrase and a derivation path such as
    /// `//Alice`. The phrase is validated before any derivation happens.
    pub fn from_phrase(
        phrase: &str,
        path: &str,
        scheme: SignatureScheme,
    ) -> Result<Self, SignerError> {
        // phrase errors take precedence over path errors
        let path = match DerivationPath::parse(path) {
            Ok(path) => path,
            Err(e) => {
                seed_from_phrase(phrase, None)?;
                return Err(e.into());
            }
        };
        let keys = match scheme {
            SignatureScheme::Sr25519 => Keys::Sr25519(derive_sr25519(phrase, &path)?),
            SignatureScheme::Ed25519 => Keys::Ed25519(derive_ed25519(phrase, &path)?),
        };
        Ok(Self { keys })
    }

    pub fn scheme(&self) -> SignatureScheme {
        match self.keys {
            Keys::Sr25519(_) => SignatureScheme::Sr25519,
            Keys::Ed25519(_) => SignatureScheme::Ed25519,
        }
    }

    pub fn public_key(&self) -> [u8; 32] {
        match &self.keys {
            Keys::Sr25519(pair) => pair.public.to_bytes(),
            Keys::Ed25519(key) => key.verifying_key().to_bytes(),
        }
    }

    pub fn account_id(&self) -> AccountId {
        AccountId(self.public_key())
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        let bytes = match &self.keys {
            Keys::Sr25519(pair) => pair.sign_simple(SR25519_CONTEXT, message).to_bytes(),
            Keys::Ed25519(key) => key.sign(message).to_bytes(),
        };
        Signature {
            scheme: self.scheme(),
            bytes,
        }
    }

    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        signature.scheme == self.scheme() && verify(&self.account_id(), message, signature)
    }
}

/// Check `signature` over `message` against an account's public key.
pub fn verify(account: &AccountId, message: &[u8], signature: &Signature) -> bool {
    match signature.scheme {
        SignatureScheme::Sr25519 => {
            let Ok(public) = schnorrkel::PublicKey::from_bytes(&account.0) else {
                return false;
            };
            let Ok(sig) = schnorrkel::Signature::from_bytes(&signature.bytes) else {
                return false;
            };
            public
                .verify_simple(SR25519_CONTEXT, message, &sig)
                .is_ok()
        }
        SignatureScheme::Ed25519 => {
            let Ok(public) = VerifyingKey::from_bytes(&account.0) else {
                return false;
            };
            let sig = ed25519_dalek::Signature::from_bytes(&signature.bytes);
            public.verify(message, &sig).is_ok()
        }
    }
}

/// Derive an sr25519 signer from a mnemonic and a path.
pub fn derive_signer(mnemonic: &str, path: &str) -> Result<Signer, SignerError> {
    Signer::from_phrase(mnemonic, path, SignatureScheme::Sr25519)
}

fn derive_sr25519(phrase: &str, path: &DerivationPath) -> Result<Keypair, SignerError> {
    let mini = mini_secret_from_phrase(phrase, path.password())?;
    let mut secret = mini.expand(ExpansionMode::Ed25519);
    for junction in path.junctions() {
        secret = match junction {
            Junction::Hard(cc) => secret
                .hard_derive_mini_secret_key(Some(ChainCode(*cc)), b"")
                .0
                .expand(ExpansionMode::Ed25519),
            Junction::Soft(cc) => secret.derived_key_simple(ChainCode(*cc), b"").0,
        };
    }
    Ok(secret.to_keypair())
}

fn derive_ed25519(phrase: &str, path: &DerivationPath) -> Result<SigningKey, SignerError> {
    let mut seed = *seed_from_phrase(phrase, path.password())?;
    for junction in path.junctions() {
        match junction {
            Junction::Hard(cc) => {
                seed = blake2b_256(&("Ed25519HDKD", seed, cc).encode());
            }
            Junction::Soft(_) => {
                return Err(SignerError::SoftDerivationUnsupported(
                    SignatureScheme::Ed25519,
                ))
            }
        }
    }
    let key = SigningKey::from_bytes(&seed);
    zeroize::Zeroize::zeroize(&mut seed);
    Ok(key)
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("scheme", &self.scheme())
            .field("account", &self.account_id())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::DEV_PHRASE;

    const ALICE_SR: &str = "d43593c715fdd31c61141abd04a99fd6822c8558854ccde39a5684e7a56da27d";
    const BOB_SR: &str = "8eaf04151687736326c9fea17e25fc5287613693c912909cb226aa4794f26a48";
    const ALICE_ED: &str = "88dc3417d5058ec4b4503e0c12ea1a0a89be200fe98922423d4334014fa6b0ee";
    const BOB_ED: &str = "d17c2d7823ebf260fd138f2d7e27d114c0145d968b5ff5006125f2414fadae69";
    const ROOT_ED: &str = "345071da55e5dccefaaa440339415ef9f2663338a38f7da0df21be5ab4e055ef";

    #[test]
    fn test_sr25519_well_known_accounts() {
        let alice = derive_signer(DEV_PHRASE, "//Alice").unwrap();
        let bob = derive_signer(DEV_PHRASE, "//Bob").unwrap();
        assert_eq!(hex::encode(alice.public_key()), ALICE_SR);
        assert_eq!(hex::encode(bob.public_key()), BOB_SR);
        assert_eq!(
            alice.account_id().to_string(),
            "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY"
        );
    }

    #[test]
    fn test_ed25519_well_known_accounts() {
        let alice = Signer::from_phrase(DEV_PHRASE, "//Alice", SignatureScheme::Ed25519).unwrap();
        let bob = Signer::from_phrase(DEV_PHRASE, "//Bob", SignatureScheme::Ed25519).unwrap();
        let root = Signer::from_phrase(DEV_PHRASE, "", SignatureScheme::Ed25519).unwrap();
        assert_eq!(hex::encode(alice.public_key()), ALICE_ED);
        assert_eq!(hex::encode(bob.public_key()), BOB_ED);
        assert_eq!(hex::encode(root.public_key()), ROOT_ED);
    }

    #[test]
    fn test_ed25519_rejects_soft_junctions() {
        let result = Signer::from_phrase(DEV_PHRASE, "//Alice/0", SignatureScheme::Ed25519);
        assert!(matches!(
            result,
            Err(SignerError::SoftDerivationUnsupported(SignatureScheme::Ed25519))
        ));
    }

    #[test]
    fn test_sr25519_soft_derivation() {
        let parent = derive_signer(DEV_PHRASE, "//Alice").unwrap();
        let child = derive_signer(DEV_PHRASE, "//Alice/0").unwrap();
        let again = derive_signer(DEV_PHRASE, "//Alice/0").unwrap();
        assert_ne!(parent.public_key(), child.public_key());
        assert_eq!(child.public_key(), again.public_key());
    }

    #[test]
    fn test_password_changes_keys() {
        let plain = derive_signer(DEV_PHRASE, "//Alice").unwrap();
        let with_password = derive_signer(DEV_PHRASE, "//Alice///secret").unwrap();
        assert_ne!(plain.public_key(), with_password.public_key());
    }

    #[test]
    fn test_sign_and_verify() {
        for scheme in [SignatureScheme::Sr25519, SignatureScheme::Ed25519] {
            let signer = Signer::from_phrase(DEV_PHRASE, "//Alice", scheme).unwrap();
            let signature = signer.sign(b"store this");
            assert_eq!(signature.scheme, scheme);
            assert!(signer.verify(b"store this", &signature));
            assert!(!signer.verify(b"store that", &signature));
            assert!(verify(&signer.account_id(), b"store this", &signature));
        }
    }

    #[test]
    fn test_signature_from_other_account_fails() {
        let alice = derive_signer(DEV_PHRASE, "//Alice").unwrap();
        let bob = derive_signer(DEV_PHRASE, "//Bob").unwrap();
        let signature = alice.sign(b"payload");
        assert!(!bob.verify(b"payload", &signature));
    }

    #[test]
    fn test_invalid_seed() {
        let result = derive_signer("not a mnemonic at all", "//Alice");
        assert!(matches!(result, Err(SignerError::InvalidSeed(_))));
    }

    #[test]
    fn test_invalid_seed_reported_before_path() {
        let result = derive_signer("not a mnemonic", "Alice");
        assert!(matches!(result, Err(SignerError::InvalidSeed(_))));
        let result = derive_signer(DEV_PHRASE, "Alice");
        assert!(matches!(result, Err(SignerError::InvalidPath(_))));
    }

    #[test]
    fn test_multi_signature_encoding() {
        let signer = derive_signer(DEV_PHRASE, "//Alice").unwrap();
        let signature = signer.sign(b"x");
        let encoded = signature.encode();
        assert_eq!(encoded.len(), 65);
        assert_eq!(encoded[0], 1);
        assert_eq!(&encoded[1..], &signature.bytes);
    }

    #[test]
    fn test_debug_hides_secret() {
        let signer = derive_signer(DEV_PHRASE, "//Alice").unwrap();
        let debug = format!("{signer:?}");
        assert!(debug.contains("Sr25519"));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_scheme_parse() {
        assert_eq!("SR25519".parse::<SignatureScheme>(), Ok(SignatureScheme::Sr25519));
        assert_eq!("ed25519".parse::<SignatureScheme>(), Ok(SignatureScheme::Ed25519));
        assert!("ecdsa".parse::<SignatureScheme>().is_err());
    }
}
