use std::fmt;
use std::str::FromStr;

use parity_scale_codec::Encode;

use crate::linked_data::blake2b_256;

/// Size of a junction's chain code.
pub const JUNCTION_ID_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("derivation path must start with '/', got {0:?}")]
    MissingSeparator(String),
    #[error("derivation path {0:?} has an empty junction")]
    EmptyJunction(String),
}

/// One step of a hierarchical derivation.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Junction {
    /// `//name`: the child secret cannot be computed from the parent public key.
    Hard([u8; JUNCTION_ID_LEN]),
    /// `/name`: the child public key can be computed from the parent public key.
    Soft([u8; JUNCTION_ID_LEN]),
}

impl Junction {
    pub fn hard(segment: &str) -> Self {
        Self::Hard(chain_code(segment))
    }

    pub fn soft(segment: &str) -> Self {
        Self::Soft(chain_code(segment))
    }

    pub fn chain_code(&self) -> [u8; JUNCTION_ID_LEN] {
        match self {
            Self::Hard(cc) | Self::Soft(cc) => *cc,
        }
    }

    pub fn is_hard(&self) -> bool {
        matches!(self, Self::Hard(_))
    }
}

impl fmt::Debug for Junction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hard(cc) => write!(f, "Hard(0x{})", hex::encode(cc)),
            Self::Soft(cc) => write!(f, "Soft(0x{})", hex::encode(cc)),
        }
    }
}

/// Numeric segments encode as a little-endian u64, anything else as a
/// SCALE string. Encodings longer than the chain code are hashed down.
fn chain_code(segment: &str) -> [u8; JUNCTION_ID_LEN] {
    let encoded = match segment.parse::<u64>() {
        Ok(n) => n.encode(),
        Err(_) => segment.encode(),
    };
    if encoded.len() > JUNCTION_ID_LEN {
        return blake2b_256(&encoded);
    }
    let mut cc = [0u8; JUNCTION_ID_LEN];
    cc[..encoded.len()].copy_from_slice(&encoded);
    cc
}

/// A parsed derivation path such as `//Alice`, `//polkadot/0` or
/// `//wallet///password`.
///
/// The optional `///password` suffix is not a junction. It is fed into the
/// BIP39 seed computation as the passphrase.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct DerivationPath {
    junctions: Vec<Junction>,
    password: Option<String>,
}

impl DerivationPath {
    pub fn parse(path: &str) -> Result<Self, PathError> {
        let (path_part, password) = match path.find("///") {
            Some(at) => (&path[..at], Some(path[at + 3..].to_string())),
            None => (path, None),
        };

        let mut junctions = Vec::new();
        let mut rest = path_part;
        while !rest.is_empty() {
            let (hard, tail) = if let Some(tail) = rest.strip_prefix("//") {
                (true, tail)
            } else if let Some(tail) = rest.strip_prefix('/') {
                (false, tail)
            } else {
                return Err(PathError::MissingSeparator(path.to_string()));
            };
            let end = tail.find('/').unwrap_or(tail.len());
            let segment = &tail[..end];
            if segment.is_empty() {
                return Err(PathError::EmptyJunction(path.to_string()));
            }
            junctions.push(if hard {
                Junction::hard(segment)
            } else {
                Junction::soft(segment)
            });
            rest = &tail[end..];
        }

        Ok(Self {
            junctions,
            password,
        })
    }

    pub fn junctions(&self) -> &[Junction] {
        &self.junctions
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn is_root(&self) -> bool {
        self.junctions.is_empty()
    }
}

// never print the password
impl fmt::Debug for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivationPath")
            .field("junctions", &self.junctions)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl FromStr for DerivationPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_hard_named_junction() {
        let path = DerivationPath::parse("//Alice").unwrap();
        assert_eq!(path.junctions().len(), 1);
        let junction = path.junctions()[0];
        assert!(junction.is_hard());
        let mut expected = [0u8; 32];
        expected[0] = 5 << 2;
        expected[1..6].copy_from_slice(b"Alice");
        assert_eq!(junction.chain_code(), expected);
        assert_eq!(path.password(), None);
    }

    #[test]
    fn test_numeric_junction_is_u64_le() {
        let path = DerivationPath::parse("/42").unwrap();
        let junction = path.junctions()[0];
        assert!(!junction.is_hard());
        let mut expected = [0u8; 32];
        expected[0] = 42;
        assert_eq!(junction.chain_code(), expected);
    }

    #[test]
    fn test_long_junction_is_hashed() {
        let long = "a".repeat(40);
        let junction = Junction::hard(&long);
        assert_eq!(junction.chain_code(), blake2b_256(&long.encode()));
    }

    #[test]
    fn test_mixed_path_with_password() {
        let path = DerivationPath::parse("//polkadot/0//stash///secret pass").unwrap();
        let kinds: Vec<bool> = path.junctions().iter().map(Junction::is_hard).collect();
        assert_eq!(kinds, vec![true, false, true]);
        assert_eq!(path.password(), Some("secret pass"));
    }

    #[test]
    fn test_password_only() {
        let path = DerivationPath::parse("///pw").unwrap();
        assert!(path.is_root());
        assert_eq!(path.password(), Some("pw"));
    }

    #[test]
    fn test_empty_path_is_root() {
        let path = DerivationPath::parse("").unwrap();
        assert!(path.is_root());
        assert_eq!(path, DerivationPath::default());
    }

    #[test]
    fn test_rejects_bad_paths() {
        assert!(matches!(
            DerivationPath::parse("Alice"),
            Err(PathError::MissingSeparator(_))
        ));
        assert!(matches!(
            DerivationPath::parse("//Alice/"),
            Err(PathError::EmptyJunction(_))
        ));
    }

    #[test]
    fn test_debug_hides_password() {
        let path = DerivationPath::parse("//Alice///hunter2").unwrap();
        assert!(!format!("{path:?}").contains("hunter2"));
    }
}
