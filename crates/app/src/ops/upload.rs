use std::path::PathBuf;

use clap::Args;

use common::bulletin::UploadError;

use super::overrides::{client, LedgerOverrides};

#[derive(Args, Debug, Clone)]
pub struct Upload {
    /// File to store
    pub file: PathBuf,

    /// Parse the file as JSON and store its pretty-printed form
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub overrides: LedgerOverrides,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadOpError {
    #[error("state error: {0}")]
    State(#[from] crate::state::StateError),
    #[error("failed to read {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("file is not valid JSON: {0}")]
    Json(#[source] serde_json::Error),
    #[error("upload failed: {0}")]
    Upload(#[from] UploadError),
    #[error("failed to render result: {0}")]
    Render(#[source] serde_json::Error),
}

#[async_trait::async_trait]
impl crate::op::Op for Upload {
    type Error = UploadOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = ctx.state()?;
        let opts = self.overrides.apply(&state);
        let data = tokio::fs::read(&self.file)
            .await
            .map_err(|e| UploadOpError::Read(self.file.clone(), e))?;

        let client = client(&state);
        let result = if self.json {
            client.upload_json(&json_payload(&data)?, &opts).await?
        } else {
            client.upload(&data, &opts).await?
        };

        serde_json::to_string_pretty(&result).map_err(UploadOpError::Render)
    }
}

/// Parse a JSON document, keeping its object keys in file order.
fn json_payload(data: &[u8]) -> Result<serde_json::Value, UploadOpError> {
    serde_json::from_slice(data).map_err(UploadOpError::Json)
}
