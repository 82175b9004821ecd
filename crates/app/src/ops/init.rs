use clap::Args;

use common::crypto::SignatureScheme;
use common::ledger::AuthorizationMode;

use crate::state::{AppConfig, AppState};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// WebSocket endpoint of the ledger node
    #[arg(long, default_value = "ws://127.0.0.1:9944")]
    pub endpoint: String,

    /// Gateway base url, with a trailing slash
    #[arg(long, default_value = "http://127.0.0.1:8283/ipfs/")]
    pub gateway: String,

    /// Derivation path of the signing account
    #[arg(long, default_value = "//Alice")]
    pub path: String,

    /// Signature scheme (sr25519 or ed25519)
    #[arg(long, default_value = "sr25519")]
    pub scheme: SignatureScheme,

    /// How calls are authorized (direct or sudo)
    #[arg(long, default_value = "direct")]
    pub authorization: AuthorizationMode,

    /// Seconds to wait for finality before giving up
    #[arg(long)]
    pub finality_timeout: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] crate::state::StateError),
}

#[async_trait::async_trait]
impl crate::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = AppConfig {
            transport_endpoint: self.endpoint.clone(),
            gateway_base_url: self.gateway.clone(),
            derivation_path: self.path.clone(),
            scheme: self.scheme,
            authorization: self.authorization,
            finality_timeout_secs: self.finality_timeout,
            ..AppConfig::default()
        };

        let state = AppState::init(ctx.config_path.clone(), config)?;

        let finality = match state.config.finality_timeout_secs {
            Some(secs) => format!("{}s", secs),
            None => "none".to_string(),
        };

        let output = format!(
            "Initialized bulletin directory at: {}\n\
             - Config: {}\n\
             - Ledger endpoint: {}\n\
             - Gateway: {}\n\
             - Account path: {} ({})\n\
             - Authorization: {}\n\
             - Finality timeout: {}",
            state.bulletin_dir.display(),
            state.config_path.display(),
            state.config.transport_endpoint,
            state.config.gateway_base_url,
            state.config.derivation_path,
            state.config.scheme,
            state.config.authorization,
            finality
        );

        Ok(output)
    }
}
