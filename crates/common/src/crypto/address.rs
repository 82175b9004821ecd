use std::fmt;
use std::str::FromStr;

use blake2::{Blake2b512, Digest};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Size of an account id (a raw 32 byte public key).
pub const ACCOUNT_ID_SIZE: usize = 32;
/// Generic substrate address format.
pub const DEFAULT_SS58_PREFIX: u16 = 42;

const SS58_CHECKSUM_PREFIX: &[u8] = b"SS58PRE";
const CHECKSUM_LEN: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("address is not valid base58: {0}")]
    Base58(String),
    #[error("address has invalid length {0}")]
    BadLength(usize),
    #[error("address checksum mismatch")]
    BadChecksum,
    #[error("address format {0} is out of range")]
    BadFormat(u16),
    #[error("account id hex decode error")]
    Hex,
}

/// The 32 byte identity of an account on the ledger.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId(pub [u8; ACCOUNT_ID_SIZE]);

impl AccountId {
    pub fn to_bytes(&self) -> [u8; ACCOUNT_ID_SIZE] {
        self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse a raw account id from hex. Accepts both plain and "0x"-prefixed hex.
    pub fn from_hex(hex: &str) -> Result<Self, AddressError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let mut buff = [0u8; ACCOUNT_ID_SIZE];
        hex::decode_to_slice(hex, &mut buff).map_err(|_| AddressError::Hex)?;
        Ok(Self(buff))
    }

    /// Render as an SS58 address with the given network prefix.
    pub fn to_ss58(&self, prefix: u16) -> Result<String, AddressError> {
        let mut data = match prefix {
            0..=63 => vec![prefix as u8],
            64..=16_383 => {
                let first = ((prefix & 0b0000_0000_1111_1100) as u8 >> 2) | 0b0100_0000;
                let second = ((prefix >> 8) as u8) | (((prefix & 0b0000_0000_0000_0011) as u8) << 6);
                vec![first, second]
            }
            _ => return Err(AddressError::BadFormat(prefix)),
        };
        data.extend_from_slice(&self.0);
        let checksum = ss58_checksum(&data);
        data.extend_from_slice(&checksum);
        Ok(bs58::encode(data).into_string())
    }

    /// Parse an SS58 address, returning the account and its network prefix.
    pub fn from_ss58(address: &str) -> Result<(Self, u16), AddressError> {
        let data = bs58::decode(address)
            .into_vec()
            .map_err(|e| AddressError::Base58(e.to_string()))?;
        if data.len() < 2 {
            return Err(AddressError::BadLength(data.len()));
        }
        let (prefix_len, prefix) = match data[0] {
            0..=63 => (1, u16::from(data[0])),
            64..=127 => {
                let lower = (data[0] << 2) | (data[1] >> 6);
                let upper = data[1] & 0b0011_1111;
                (2, u16::from(lower) | (u16::from(upper) << 8))
            }
            _ => return Err(AddressError::BadFormat(u16::from(data[0]))),
        };
        if data.len() != prefix_len + ACCOUNT_ID_SIZE + CHECKSUM_LEN {
            return Err(AddressError::BadLength(data.len()));
        }
        let body_end = prefix_len + ACCOUNT_ID_SIZE;
        let checksum = ss58_checksum(&data[..body_end]);
        if data[body_end..] != checksum {
            return Err(AddressError::BadChecksum);
        }
        let mut account = [0u8; ACCOUNT_ID_SIZE];
        account.copy_from_slice(&data[prefix_len..body_end]);
        Ok((Self(account), prefix))
    }
}

fn ss58_checksum(data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let mut hasher = Blake2b512::new();
    hasher.update(SS58_CHECKSUM_PREFIX);
    hasher.update(data);
    let hash = hasher.finalize();
    [hash[0], hash[1]]
}

impl From<[u8; ACCOUNT_ID_SIZE]> for AccountId {
    fn from(bytes: [u8; ACCOUNT_ID_SIZE]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for AccountId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Displays as an SS58 address with the generic prefix.
impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_ss58(DEFAULT_SS58_PREFIX) {
            Ok(address) => f.write_str(&address),
            Err(_) => f.write_str(&self.to_hex()),
        }
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.to_hex())
    }
}

/// Accepts an SS58 address (any prefix) or 0x-prefixed hex.
impl FromStr for AccountId {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with("0x") {
            return Self::from_hex(s);
        }
        Self::from_ss58(s).map(|(account, _)| account)
    }
}

impl Serialize for AccountId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const ALICE: &str = "d43593c715fdd31c61141abd04a99fd6822c8558854ccde39a5684e7a56da27d";
    const ALICE_SS58: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";

    #[test]
    fn test_alice_generic_address() {
        let alice = AccountId::from_hex(ALICE).unwrap();
        assert_eq!(alice.to_ss58(42).unwrap(), ALICE_SS58);
        assert_eq!(alice.to_string(), ALICE_SS58);
    }

    #[test]
    fn test_alice_polkadot_address() {
        let alice = AccountId::from_hex(ALICE).unwrap();
        assert_eq!(
            alice.to_ss58(0).unwrap(),
            "15oF4uVJwmo4TdGW7VfQxNLavjCXviqxT9S1MgbjMNHr6Sp5"
        );
    }

    #[test]
    fn test_parse_returns_prefix() {
        let (account, prefix) = AccountId::from_ss58(ALICE_SS58).unwrap();
        assert_eq!(prefix, 42);
        assert_eq!(hex::encode(account.0), ALICE);
    }

    #[test]
    fn test_two_byte_prefix() {
        let alice = AccountId::from_hex(ALICE).unwrap();
        for prefix in [64u16, 255, 1284, 16_383] {
            let address = alice.to_ss58(prefix).unwrap();
            assert_eq!(AccountId::from_ss58(&address).unwrap(), (alice, prefix));
        }
        assert!(matches!(
            alice.to_ss58(16_384),
            Err(AddressError::BadFormat(16_384))
        ));
    }

    #[test]
    fn test_bad_checksum() {
        let mut chars: Vec<char> = ALICE_SS58.chars().collect();
        let last = chars.len() - 1;
        chars[last] = if chars[last] == 'Y' { 'Z' } else { 'Y' };
        let tampered: String = chars.into_iter().collect();
        assert!(AccountId::from_ss58(&tampered).is_err());
    }

    #[test]
    fn test_from_str_accepts_hex_and_ss58() {
        let from_hex: AccountId = format!("0x{ALICE}").parse().unwrap();
        let from_ss58: AccountId = ALICE_SS58.parse().unwrap();
        assert_eq!(from_hex, from_ss58);
        assert!("not an address".parse::<AccountId>().is_err());
    }
}
