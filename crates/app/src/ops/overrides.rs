use clap::Args;

use common::bulletin::{BulletinClient, UploadOptions};
use common::ledger::{AuthorizationMode, RpcConnector};

use crate::state::AppState;

/// Flags that override the config file for one write.
#[derive(Args, Debug, Clone, Default)]
pub struct LedgerOverrides {
    /// Ledger endpoint for this call only
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Gateway base url for this call only
    #[arg(long)]
    pub gateway: Option<String>,

    /// Authorization mode for this call only (direct or sudo)
    #[arg(long)]
    pub authorization: Option<AuthorizationMode>,

    /// Seconds to wait for finality for this call only
    #[arg(long)]
    pub finality_timeout: Option<u64>,
}

impl LedgerOverrides {
    pub fn apply(&self, state: &AppState) -> UploadOptions {
        let mut opts = state.config.upload_options();
        if let Some(endpoint) = &self.endpoint {
            opts.transport_endpoint = endpoint.clone();
        }
        if let Some(gateway) = &self.gateway {
            opts.gateway_base_url = gateway.clone();
        }
        if let Some(authorization) = self.authorization {
            opts.authorization = authorization;
        }
        if let Some(secs) = self.finality_timeout {
            opts.finality_timeout = Some(std::time::Duration::from_secs(secs));
        }
        opts
    }
}

pub fn client(state: &AppState) -> BulletinClient<RpcConnector> {
    BulletinClient::new(RpcConnector::new(state.config.rpc.clone()))
}
