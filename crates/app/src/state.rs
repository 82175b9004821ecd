use std::{fs, path::PathBuf, time::Duration};

use common::bulletin::{UploadOptions, DEFAULT_DERIVATION_PATH};
use common::crypto::{SignatureScheme, DEV_PHRASE};
use common::gateway::DEFAULT_READ_TIMEOUT;
use common::ledger::{AuthorizationMode, RpcConfig};
use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "bulletin";
pub const CONFIG_FILE_NAME: &str = "config.toml";
/// Takes precedence over any mnemonic in the config file.
pub const MNEMONIC_ENV_VAR: &str = "BULLETIN_MNEMONIC";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// WebSocket endpoint of a ledger node
    #[serde(default = "default_transport_endpoint")]
    pub transport_endpoint: String,
    /// Gateway prefix CIDs are appended to, with a trailing slash
    #[serde(default = "default_gateway_base_url")]
    pub gateway_base_url: String,
    #[serde(default = "default_derivation_path")]
    pub derivation_path: String,
    #[serde(default)]
    pub scheme: SignatureScheme,
    #[serde(default)]
    pub authorization: AuthorizationMode,
    /// Give up waiting for finality after this many seconds
    #[serde(default)]
    pub finality_timeout_secs: Option<u64>,
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
    /// Account mnemonic. Prefer the environment variable; this file is
    /// plain text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mnemonic: Option<String>,
    #[serde(default)]
    pub rpc: RpcConfig,
}

fn default_transport_endpoint() -> String {
    "ws://127.0.0.1:9944".to_string()
}

fn default_gateway_base_url() -> String {
    "http://127.0.0.1:8283/ipfs/".to_string()
}

fn default_derivation_path() -> String {
    DEFAULT_DERIVATION_PATH.to_string()
}

fn default_read_timeout_secs() -> u64 {
    DEFAULT_READ_TIMEOUT.as_secs()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            transport_endpoint: default_transport_endpoint(),
            gateway_base_url: default_gateway_base_url(),
            derivation_path: default_derivation_path(),
            scheme: SignatureScheme::default(),
            authorization: AuthorizationMode::default(),
            finality_timeout_secs: None,
            read_timeout_secs: default_read_timeout_secs(),
            mnemonic: None,
            rpc: RpcConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    /// The mnemonic to sign with: environment, then config file, then the
    /// development phrase.
    pub fn mnemonic(&self) -> String {
        std::env::var(MNEMONIC_ENV_VAR)
            .ok()
            .filter(|m| !m.trim().is_empty())
            .or_else(|| self.mnemonic.clone())
            .unwrap_or_else(|| DEV_PHRASE.to_string())
    }

    pub fn upload_options(&self) -> UploadOptions {
        let mut opts = UploadOptions::new(&self.transport_endpoint, &self.gateway_base_url)
            .with_account(self.mnemonic(), &self.derivation_path)
            .with_scheme(self.scheme)
            .with_authorization(self.authorization);
        if let Some(secs) = self.finality_timeout_secs {
            opts = opts.with_finality_timeout(Duration::from_secs(secs));
        }
        opts
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the bulletin directory (~/.bulletin)
    pub bulletin_dir: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the bulletin directory path (custom or default ~/.bulletin)
    pub fn bulletin_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new bulletin directory with `config`
    pub fn init(custom_path: Option<PathBuf>, config: AppConfig) -> Result<Self, StateError> {
        let bulletin_dir = Self::bulletin_dir(custom_path)?;
        let config_path = bulletin_dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            return Err(StateError::AlreadyInitialized);
        }

        fs::create_dir_all(&bulletin_dir)?;
        let config_toml = toml::to_string_pretty(&config)?;
        fs::write(&config_path, config_toml)?;

        Ok(Self {
            bulletin_dir,
            config_path,
            config,
        })
    }

    /// Load existing state from the bulletin directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let bulletin_dir = Self::bulletin_dir(custom_path)?;
        let config_path = bulletin_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Err(StateError::NotInitialized);
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            bulletin_dir,
            config_path,
            config,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("bulletin directory not initialized. Run 'bulletin init' first")]
    NotInitialized,

    #[error("bulletin directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}
