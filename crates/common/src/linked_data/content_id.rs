use std::fmt;
use std::str::FromStr;

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use cid::multibase::Base;
use cid::Cid;
use multihash::Multihash;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::varint;

/// Multicodec code for BLAKE2b with a 256-bit digest.
pub const BLAKE2B_256: u64 = 0xb220;
/// Multicodec code for uninterpreted bytes.
pub const RAW: u64 = 0x55;
/// Length in bytes of the digests we produce.
pub const DIGEST_SIZE: usize = 32;

/// BLAKE2b-256 digest of `data`.
pub fn blake2b_256(data: &[u8]) -> [u8; DIGEST_SIZE] {
    let mut hasher = Blake2b::<U32>::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Multihash bytes for a BLAKE2b-256 digest:
/// `varint(code) || varint(len) || digest`.
pub fn multihash_bytes(digest: &[u8; DIGEST_SIZE]) -> Vec<u8> {
    let mut out = Vec::with_capacity(3 + 1 + DIGEST_SIZE);
    varint::encode_into(BLAKE2B_256, &mut out);
    varint::encode_into(DIGEST_SIZE as u64, &mut out);
    out.extend_from_slice(digest);
    out
}

/// Binary CIDv1 for `data`: `varint(1) || varint(raw) || multihash`.
pub fn cid_bytes(data: &[u8]) -> Vec<u8> {
    let digest = blake2b_256(data);
    let mut out = Vec::with_capacity(2 + 3 + 1 + DIGEST_SIZE);
    varint::encode_into(1, &mut out);
    varint::encode_into(RAW, &mut out);
    out.extend_from_slice(&multihash_bytes(&digest));
    out
}

/// Compute the content identifier of `data`.
///
/// Total over all inputs, including the empty slice. The bytes are hashed
/// exactly as given.
pub fn compute_cid(data: &[u8]) -> ContentId {
    let bytes = cid_bytes(data);
    // a v1 prefix over a 32 byte multihash always parses
    let cid = Cid::try_from(bytes.as_slice()).expect("well-formed CIDv1 bytes");
    ContentId(cid)
}

/// Whether `data` hashes to `cid`.
pub fn verify(data: &[u8], cid: &ContentId) -> bool {
    compute_cid(data) == *cid
}

/// BLAKE2b-256 of the CID's canonical text form.
///
/// Used to key CIDs in fixed-width (`bytes32`) contract storage.
pub fn cid_to_bytes32(cid: &ContentId) -> [u8; DIGEST_SIZE] {
    blake2b_256(cid.to_string().as_bytes())
}

#[derive(Debug, thiserror::Error)]
pub enum CidError {
    #[error("invalid cid: {0}")]
    Invalid(#[from] cid::Error),
    #[error("invalid multihash: {0}")]
    Multihash(#[from] multihash::Error),
    #[error("unsupported cid version {0}, expected v1")]
    UnsupportedVersion(u64),
}

/// A CIDv1 naming a byte sequence by its content.
///
/// Renders as lowercase base32 with the `b` multibase prefix. Parsing a
/// CID exposes its structure (codec, hash function, digest) but never the
/// content it names.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentId(Cid);

impl ContentId {
    pub fn parse(s: &str) -> Result<Self, CidError> {
        let cid = Cid::try_from(s.trim())?;
        if cid.version() != cid::Version::V1 {
            return Err(CidError::UnsupportedVersion(cid.version().into()));
        }
        Ok(Self(cid))
    }

    /// Rebuild the CID of some content from its BLAKE2b-256 digest alone,
    /// e.g. a content hash reported by the ledger.
    pub fn from_digest(digest: &[u8; DIGEST_SIZE]) -> Result<Self, CidError> {
        let hash = Multihash::<64>::wrap(BLAKE2B_256, digest)?;
        Ok(Self(Cid::new_v1(RAW, hash)))
    }

    pub fn codec(&self) -> u64 {
        self.0.codec()
    }

    pub fn hash_code(&self) -> u64 {
        self.0.hash().code()
    }

    /// The raw digest carried by the multihash.
    pub fn digest(&self) -> &[u8] {
        self.0.hash().digest()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes()
    }

    pub fn to_bytes32(&self) -> [u8; DIGEST_SIZE] {
        cid_to_bytes32(self)
    }

    pub fn as_cid(&self) -> &Cid {
        &self.0
    }
}

impl From<ContentId> for Cid {
    fn from(id: ContentId) -> Self {
        id.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.to_string_of_base(Base::Base32Lower) {
            Ok(s) => f.write_str(&s),
            Err(_) => write!(f, "{}", self.0),
        }
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({self})")
    }
}

impl FromStr for ContentId {
    type Err = CidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ContentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ContentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
