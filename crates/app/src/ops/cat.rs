use std::path::PathBuf;

use clap::Args;

use common::gateway::{GatewayError, GatewayReader};
use common::linked_data::ContentId;

#[derive(Args, Debug, Clone)]
pub struct Cat {
    /// CID of the content to read
    pub cid: ContentId,

    /// Write the content to this file instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Check the content hashes to the CID
    #[arg(long)]
    pub verify: bool,

    /// Gateway base url for this read only
    #[arg(long)]
    pub gateway: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CatError {
    #[error("state error: {0}")]
    State(#[from] crate::state::StateError),
    #[error("read failed: {0}")]
    Gateway(#[from] GatewayError),
    #[error("failed to write {0}: {1}")]
    Write(PathBuf, std::io::Error),
}

#[async_trait::async_trait]
impl crate::op::Op for Cat {
    type Error = CatError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = ctx.state()?;
        let base = self
            .gateway
            .clone()
            .unwrap_or_else(|| state.config.gateway_base_url.clone());

        let reader = GatewayReader::new()?.with_timeout(state.config.read_timeout());
        let bytes = if self.verify {
            reader.read_verified(&base, &self.cid).await?
        } else {
            reader.read_bytes(&format!("{}{}", base, self.cid)).await?
        };

        if let Some(out) = &self.out {
            tokio::fs::write(out, &bytes)
                .await
                .map_err(|e| CatError::Write(out.clone(), e))?;
            return Ok(format!("Wrote {} bytes to {}", bytes.len(), out.display()));
        }

        // Try to show text, or hex if binary
        match String::from_utf8(bytes.to_vec()) {
            Ok(text) => Ok(text),
            Err(_) => Ok(format!("Binary content (hex): {}", hex::encode(&bytes))),
        }
    }
}
