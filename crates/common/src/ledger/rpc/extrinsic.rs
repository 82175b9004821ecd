//! Version 4 signed extrinsics.
//!
//! ```text
//! compact(len) || 0x84 || 0x00 account(32) || scheme(1) signature(64) || extra || call
//! ```
//!
//! `extra` and `additional` are the concatenated contributions of the
//! runtime's signed extensions, in the runtime's order. For a Bulletin
//! runtime `extra` is an immortal era, the compact nonce and an absent CID
//! config, while `additional` is the spec and transaction versions followed
//! by the genesis hash twice (once for the genesis check, once as the
//! immortal era's birth block). The signature covers
//! `call || extra || additional`. Payloads over 256 bytes are hashed with
//! BLAKE2b-256 before signing.

use parity_scale_codec::{Compact, Encode};
use serde::{Deserialize, Serialize};

use crate::crypto::Signer;
use crate::ledger::BlockHash;
use crate::linked_data::blake2b_256;

const EXTRINSIC_VERSION: u8 = 4;
const SIGNED_FLAG: u8 = 0b1000_0000;
/// `MultiAddress::Id`
const ADDRESS_ID: u8 = 0x00;
const IMMORTAL_ERA: u8 = 0x00;
const MAX_UNHASHED_PAYLOAD: usize = 256;

/// Runtime versions as returned by `state_getRuntimeVersion`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeVersion {
    pub spec_version: u32,
    pub transaction_version: u32,
}

/// Chain facts every signature commits to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainState {
    pub genesis_hash: BlockHash,
    pub runtime: RuntimeVersion,
}

/// How content identifiers for a stored payload are derived, as the
/// `ProvideCidConfig` extension carries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CidConfig {
    pub codec: u64,
    pub hashing: Hashing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Hashing {
    Blake2b256,
    Sha2_256,
    Keccak256,
}

impl Hashing {
    fn index(self) -> u8 {
        match self {
            Self::Blake2b256 => 0,
            Self::Sha2_256 => 1,
            Self::Keccak256 => 2,
        }
    }
}

/// One signed extension of the target runtime. The configured list must
/// follow the runtime's order; each entry appends its bytes to `extra`
/// (carried in the extrinsic) and `additional` (signed only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name")]
pub enum SignedExtension {
    CheckNonZeroSender,
    CheckSpecVersion,
    CheckTxVersion,
    CheckGenesis,
    /// Always immortal
    CheckMortality,
    CheckNonce,
    CheckWeight,
    ChargeTransactionPayment,
    /// Always disabled
    CheckMetadataHash,
    ProvideCidConfig {
        #[serde(default)]
        cid: Option<CidConfig>,
    },
    /// Anything else, with fixed bytes.
    Other {
        identifier: String,
        #[serde(default)]
        extra: Vec<u8>,
        #[serde(default)]
        additional: Vec<u8>,
    },
}

impl SignedExtension {
    /// The extensions of a Bulletin runtime, in order.
    pub fn bulletin() -> Vec<Self> {
        vec![
            Self::CheckNonZeroSender,
            Self::CheckSpecVersion,
            Self::CheckTxVersion,
            Self::CheckGenesis,
            Self::CheckMortality,
            Self::CheckNonce,
            Self::CheckWeight,
            Self::ProvideCidConfig { cid: None },
        ]
    }

    /// The identifier the runtime lists this extension under.
    pub fn identifier(&self) -> &str {
        match self {
            Self::CheckNonZeroSender => "CheckNonZeroSender",
            Self::CheckSpecVersion => "CheckSpecVersion",
            Self::CheckTxVersion => "CheckTxVersion",
            Self::CheckGenesis => "CheckGenesis",
            Self::CheckMortality => "CheckMortality",
            Self::CheckNonce => "CheckNonce",
            Self::CheckWeight => "CheckWeight",
            Self::ChargeTransactionPayment => "ChargeTransactionPayment",
            Self::CheckMetadataHash => "CheckMetadataHash",
            Self::ProvideCidConfig { .. } => "ProvideCidConfig",
            Self::Other { identifier, .. } => identifier,
        }
    }

    /// Whether the extension contributes no bytes at all.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::CheckNonZeroSender | Self::CheckWeight => true,
            Self::Other {
                extra, additional, ..
            } => extra.is_empty() && additional.is_empty(),
            _ => false,
        }
    }

    fn encode_extra(&self, signed: &SignedExtra<'_>, out: &mut Vec<u8>) {
        match self {
            Self::CheckMortality => out.push(IMMORTAL_ERA),
            Self::CheckNonce => Compact(signed.nonce).encode_to(out),
            Self::ChargeTransactionPayment => Compact(signed.tip).encode_to(out),
            // mode: disabled
            Self::CheckMetadataHash => out.push(0x00),
            Self::ProvideCidConfig { cid } => match cid {
                None => out.push(0x00),
                Some(cid) => {
                    out.push(0x01);
                    cid.codec.encode_to(out);
                    out.push(cid.hashing.index());
                }
            },
            Self::Other { extra, .. } => out.extend_from_slice(extra),
            _ => {}
        }
    }

    fn encode_additional(&self, chain: &ChainState, out: &mut Vec<u8>) {
        match self {
            Self::CheckSpecVersion => chain.runtime.spec_version.encode_to(out),
            Self::CheckTxVersion => chain.runtime.transaction_version.encode_to(out),
            // immortal transactions are born at genesis
            Self::CheckGenesis | Self::CheckMortality => {
                out.extend_from_slice(&chain.genesis_hash.0)
            }
            // no metadata hash
            Self::CheckMetadataHash => out.push(0x00),
            Self::Other { additional, .. } => out.extend_from_slice(additional),
            _ => {}
        }
    }
}

/// Per-transaction signed extension values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignedExtra<'a> {
    pub nonce: u64,
    pub tip: u128,
    pub extensions: &'a [SignedExtension],
}

impl<'a> SignedExtra<'a> {
    pub fn new(nonce: u64, extensions: &'a [SignedExtension]) -> Self {
        Self {
            nonce,
            tip: 0,
            extensions,
        }
    }

    fn extra(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(16);
        for extension in self.extensions {
            extension.encode_extra(self, &mut out);
        }
        out
    }

    fn additional(&self, chain: &ChainState) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + 4 + 32 + 32 + 1);
        for extension in self.extensions {
            extension.encode_additional(chain, &mut out);
        }
        out
    }
}

/// The bytes a signer signs for `call`.
pub fn signing_payload(call: &[u8], extra: &SignedExtra<'_>, chain: &ChainState) -> Vec<u8> {
    let mut payload = Vec::with_capacity(call.len() + 128);
    payload.extend_from_slice(call);
    payload.extend_from_slice(&extra.extra());
    payload.extend_from_slice(&extra.additional(chain));
    if payload.len() > MAX_UNHASHED_PAYLOAD {
        return blake2b_256(&payload).to_vec();
    }
    payload
}

/// Sign `call` and assemble the length-prefixed extrinsic.
pub fn build_signed(
    call: &[u8],
    signer: &Signer,
    extra: &SignedExtra<'_>,
    chain: &ChainState,
) -> Vec<u8> {
    let signature = signer.sign(&signing_payload(call, extra, chain));

    let mut body = Vec::with_capacity(1 + 33 + 65 + 16 + call.len());
    body.push(SIGNED_FLAG | EXTRINSIC_VERSION);
    body.push(ADDRESS_ID);
    body.extend_from_slice(&signer.public_key());
    signature.encode_to(&mut body);
    body.extend_from_slice(&extra.extra());
    body.extend_from_slice(call);

    // Vec<u8> encodes as compact length followed by the bytes
    body.encode()
}

#[cfg(test)]
mod test {
    use parity_scale_codec::Decode;

    use super::*;
    use crate::crypto::{derive_signer, verify, Signature, SignatureScheme, DEV_PHRASE};

    fn chain() -> ChainState {
        ChainState {
            genesis_hash: BlockHash([0x42; 32]),
            runtime: RuntimeVersion {
                spec_version: 1_000_000,
                transaction_version: 1,
            },
        }
    }

    #[test]
    fn test_runtime_version_from_rpc() {
        let json = r#"{"specName":"bulletin","specVersion":1000000,"transactionVersion":1,"apis":[]}"#;
        let version: RuntimeVersion = serde_json::from_str(json).unwrap();
        assert_eq!(version, chain().runtime);
    }

    #[test]
    fn test_bulletin_payload_layout() {
        let extensions = SignedExtension::bulletin();
        let extra = SignedExtra::new(5, &extensions);
        let payload = signing_payload(&[1, 2, 3], &extra, &chain());
        // call, immortal era, nonce, no CID config
        let mut expected = vec![1, 2, 3, IMMORTAL_ERA, 5 << 2, 0x00];
        expected.extend_from_slice(&1_000_000u32.to_le_bytes());
        expected.extend_from_slice(&1u32.to_le_bytes());
        expected.extend_from_slice(&[0x42; 64]);
        assert_eq!(payload, expected);
    }

    #[test]
    fn test_extension_order_is_kept() {
        let extensions = vec![
            SignedExtension::CheckMortality,
            SignedExtension::CheckNonce,
            SignedExtension::ChargeTransactionPayment,
            SignedExtension::ProvideCidConfig {
                cid: Some(CidConfig {
                    codec: 0x55,
                    hashing: Hashing::Sha2_256,
                }),
            },
            SignedExtension::CheckMetadataHash,
            SignedExtension::Other {
                identifier: "Custom".into(),
                extra: vec![0xee],
                additional: vec![0xdd],
            },
            SignedExtension::CheckSpecVersion,
        ];
        let signed = SignedExtra::new(1, &extensions);
        assert_eq!(
            signed.extra(),
            vec![IMMORTAL_ERA, 1 << 2, 0, 0x01, 0x55, 0, 0, 0, 0, 0, 0, 0, 1, 0x00, 0xee]
        );
        let mut additional = vec![0x42; 32];
        additional.extend_from_slice(&[0x00, 0xdd]);
        additional.extend_from_slice(&1_000_000u32.to_le_bytes());
        assert_eq!(signed.additional(&chain()), additional);
    }

    #[test]
    fn test_empty_extensions() {
        assert!(SignedExtension::CheckWeight.is_empty());
        assert!(!SignedExtension::ProvideCidConfig { cid: None }.is_empty());
        let none = SignedExtra::new(3, &[]);
        assert!(none.extra().is_empty());
        assert!(none.additional(&chain()).is_empty());
    }

    #[test]
    fn test_extensions_from_config() {
        let toml = r#"
            [[extensions]]
            name = "CheckNonce"

            [[extensions]]
            name = "ProvideCidConfig"
            cid = { codec = 85, hashing = "Blake2b256" }
        "#;
        #[derive(Deserialize)]
        struct Wrapper {
            extensions: Vec<SignedExtension>,
        }
        let parsed: Wrapper = toml::from_str(toml).unwrap();
        assert_eq!(
            parsed.extensions,
            vec![
                SignedExtension::CheckNonce,
                SignedExtension::ProvideCidConfig {
                    cid: Some(CidConfig {
                        codec: 0x55,
                        hashing: Hashing::Blake2b256
                    })
                },
            ]
        );
    }

    #[test]
    fn test_large_payload_is_hashed() {
        let call = vec![0u8; 300];
        let extensions = SignedExtension::bulletin();
        let extra = SignedExtra::new(0, &extensions);
        let payload = signing_payload(&call, &extra, &chain());
        assert_eq!(payload.len(), 32);
    }

    #[test]
    fn test_signed_extrinsic_layout() {
        let signer = derive_signer(DEV_PHRASE, "//Alice").unwrap();
        let call = [40u8, 0, 4, 0xaa];
        let extensions = SignedExtension::bulletin();
        let extra = SignedExtra::new(7, &extensions);
        let xt = build_signed(&call, &signer, &extra, &chain());

        let body = Vec::<u8>::decode(&mut &xt[..]).unwrap();
        assert_eq!(body[0], 0x84);
        assert_eq!(body[1], ADDRESS_ID);
        assert_eq!(&body[2..34], &signer.public_key());
        assert_eq!(body[34], SignatureScheme::Sr25519.multi_signature_index());
        assert_eq!(&body[99..102], &[IMMORTAL_ERA, 7 << 2, 0x00]);
        assert_eq!(&body[102..], &call);

        let mut bytes = [0u8; 64];
        bytes.copy_from_slice(&body[35..99]);
        let signature = Signature {
            scheme: SignatureScheme::Sr25519,
            bytes,
        };
        let payload = signing_payload(&call, &extra, &chain());
        assert!(verify(&signer.account_id(), &payload, &signature));
    }
}
