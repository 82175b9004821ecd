use bip39::{Language, Mnemonic};
use schnorrkel::MiniSecretKey;
use zeroize::Zeroizing;

/// The well-known development phrase. Every key derived from it is public
/// knowledge; it only makes sense against development and test networks.
pub const DEV_PHRASE: &str = "bottom drive obey lake curtain smoke basket hold race lonely fit walk";

#[derive(Debug, thiserror::Error)]
pub enum MnemonicError {
    #[error("invalid mnemonic: {0}")]
    Phrase(#[from] bip39::Error),
    #[error("mnemonic entropy has an unsupported length")]
    Entropy,
}

/// Recover the BIP39 entropy behind an English phrase.
///
/// Word count and checksum are both checked; extra whitespace between words
/// is tolerated.
pub fn entropy_from_phrase(phrase: &str) -> Result<Zeroizing<Vec<u8>>, MnemonicError> {
    let mnemonic = Mnemonic::parse_in_normalized(Language::English, phrase)?;
    let (entropy, len) = mnemonic.to_entropy_array();
    let entropy = Zeroizing::new(entropy);
    Ok(Zeroizing::new(entropy[..len].to_vec()))
}

/// The 32 byte mini-secret: the head of the PBKDF2 seed computed over the
/// entropy (not the phrase) with `"mnemonic" + password` as salt.
pub fn mini_secret_from_phrase(
    phrase: &str,
    password: Option<&str>,
) -> Result<MiniSecretKey, MnemonicError> {
    let entropy = entropy_from_phrase(phrase)?;
    substrate_bip39::mini_secret_from_entropy(&entropy, password.unwrap_or(""))
        .map_err(|_| MnemonicError::Entropy)
}

/// Same derivation as [`mini_secret_from_phrase`], as raw bytes.
pub fn seed_from_phrase(
    phrase: &str,
    password: Option<&str>,
) -> Result<Zeroizing<[u8; 32]>, MnemonicError> {
    let entropy = entropy_from_phrase(phrase)?;
    let seed = Zeroizing::new(
        substrate_bip39::seed_from_entropy(&entropy, password.unwrap_or(""))
            .map_err(|_| MnemonicError::Entropy)?,
    );
    let mut out = Zeroizing::new([0u8; 32]);
    out.copy_from_slice(&seed[..32]);
    Ok(out)
}
