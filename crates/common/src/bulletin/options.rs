use std::fmt;
use std::time::Duration;

use url::Url;

use super::error::UploadError;
use crate::crypto::{SignatureScheme, Signer, DEV_PHRASE};
use crate::ledger::AuthorizationMode;

pub const DEFAULT_DERIVATION_PATH: &str = "//Alice";

/// Where and as whom to write.
///
/// Defaults to the development phrase at `//Alice`, which is only useful on
/// development chains. Authorization is explicit: nothing about the seed
/// decides whether a call is sudo-wrapped.
#[derive(Clone)]
pub struct UploadOptions {
    /// WebSocket endpoint of a ledger node.
    pub transport_endpoint: String,
    /// Gateway prefix the CID is appended to, e.g. `https://host/ipfs/`.
    pub gateway_base_url: String,
    /// BIP39 phrase of the submitting account.
    pub account_seed: String,
    pub derivation_path: String,
    pub scheme: SignatureScheme,
    pub authorization: AuthorizationMode,
    /// Give up waiting for finality after this long.
    pub finality_timeout: Option<Duration>,
}

impl UploadOptions {
    pub fn new(transport_endpoint: impl Into<String>, gateway_base_url: impl Into<String>) -> Self {
        Self {
            transport_endpoint: transport_endpoint.into(),
            gateway_base_url: gateway_base_url.into(),
            account_seed: DEV_PHRASE.to_string(),
            derivation_path: DEFAULT_DERIVATION_PATH.to_string(),
            scheme: SignatureScheme::default(),
            authorization: AuthorizationMode::default(),
            finality_timeout: None,
        }
    }

    pub fn with_account(mut self, seed: impl Into<String>, path: impl Into<String>) -> Self {
        self.account_seed = seed.into();
        self.derivation_path = path.into();
        self
    }

    pub fn with_scheme(mut self, scheme: SignatureScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_authorization(mut self, authorization: AuthorizationMode) -> Self {
        self.authorization = authorization;
        self
    }

    pub fn with_finality_timeout(mut self, timeout: Duration) -> Self {
        self.finality_timeout = Some(timeout);
        self
    }

    pub(crate) fn validate_transport(&self) -> Result<(), UploadError> {
        if self.transport_endpoint.trim().is_empty() {
            return Err(UploadError::Configuration(
                "transport endpoint is required".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn validate_gateway(&self) -> Result<(), UploadError> {
        let base = &self.gateway_base_url;
        if base.trim().is_empty() {
            return Err(UploadError::Configuration(
                "gateway base url is required".to_string(),
            ));
        }
        if !base.ends_with('/') {
            return Err(UploadError::Configuration(format!(
                "gateway base url must end with '/': {base}"
            )));
        }
        Url::parse(base)
            .map_err(|e| UploadError::Configuration(format!("invalid gateway base url: {e}")))?;
        Ok(())
    }

    pub(crate) fn signer(&self) -> Result<Signer, UploadError> {
        Ok(Signer::from_phrase(
            &self.account_seed,
            &self.derivation_path,
            self.scheme,
        )?)
    }

    pub fn gateway_url(&self, cid: &impl fmt::Display) -> String {
        format!("{}{}", self.gateway_base_url, cid)
    }
}

impl fmt::Debug for UploadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadOptions")
            .field("transport_endpoint", &self.transport_endpoint)
            .field("gateway_base_url", &self.gateway_base_url)
            .field("account_seed", &"<redacted>")
            .field("derivation_path", &self.derivation_path)
            .field("scheme", &self.scheme)
            .field("authorization", &self.authorization)
            .field("finality_timeout", &self.finality_timeout)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = UploadOptions::new("ws://node", "https://gw/ipfs/");
        assert_eq!(opts.account_seed, DEV_PHRASE);
        assert_eq!(opts.derivation_path, "//Alice");
        assert_eq!(opts.scheme, SignatureScheme::Sr25519);
        assert_eq!(opts.authorization, AuthorizationMode::Direct);
        assert_eq!(opts.finality_timeout, None);
        assert!(opts.validate_transport().is_ok());
        assert!(opts.validate_gateway().is_ok());
    }

    #[test]
    fn test_empty_endpoint() {
        let opts = UploadOptions::new("", "https://x/");
        assert!(matches!(
            opts.validate_transport(),
            Err(UploadError::Configuration(_))
        ));
    }

    #[test]
    fn test_gateway_needs_trailing_slash() {
        let opts = UploadOptions::new("ws://node", "https://gw/ipfs");
        assert!(matches!(
            opts.validate_gateway(),
            Err(UploadError::Configuration(_))
        ));
        let opts = UploadOptions::new("ws://node", "");
        assert!(matches!(
            opts.validate_gateway(),
            Err(UploadError::Configuration(_))
        ));
        let opts = UploadOptions::new("ws://node", "not a url/");
        assert!(matches!(
            opts.validate_gateway(),
            Err(UploadError::Configuration(_))
        ));
    }

    #[test]
    fn test_gateway_url_is_plain_concatenation() {
        let opts = UploadOptions::new("ws://node", "https://gw/ipfs/");
        assert_eq!(opts.gateway_url(&"bafy"), "https://gw/ipfs/bafy");
    }

    #[test]
    fn test_debug_redacts_seed() {
        let opts = UploadOptions::new("ws://node", "https://gw/");
        assert!(!format!("{opts:?}").contains("bottom"));
    }

    #[test]
    fn test_bad_path_is_configuration() {
        let opts = UploadOptions::new("ws://node", "https://gw/").with_account(DEV_PHRASE, "Alice");
        assert!(matches!(opts.signer(), Err(UploadError::Configuration(_))));
        let opts = UploadOptions::new("ws://node", "https://gw/").with_account("one two", "//Alice");
        assert!(matches!(opts.signer(), Err(UploadError::InvalidSeed(_))));
    }
}
