use clap::Args;

use common::bulletin::UploadError;

use super::overrides::{client, LedgerOverrides};

#[derive(Args, Debug, Clone)]
pub struct Renew {
    /// Block number the entry was stored (or last renewed) in
    #[arg(long)]
    pub block: u32,

    /// Index of the entry within that block
    #[arg(long)]
    pub index: u32,

    #[command(flatten)]
    pub overrides: LedgerOverrides,
}

#[derive(Debug, thiserror::Error)]
pub enum RenewError {
    #[error("state error: {0}")]
    State(#[from] crate::state::StateError),
    #[error("renew failed: {0}")]
    Renew(#[from] UploadError),
}

#[async_trait::async_trait]
impl crate::op::Op for Renew {
    type Error = RenewError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = ctx.state()?;
        let opts = self.overrides.apply(&state);

        let inclusion = client(&state).renew(self.block, self.index, &opts).await?;

        let mut output = format!(
            "Renewed entry {}:{} in block {}",
            self.block, self.index, inclusion.block_hash
        );
        if let (Some(block), Some(index)) = (inclusion.block_number, inclusion.index) {
            output.push_str(&format!("\nNew position: {}:{}", block, index));
        }
        Ok(output)
    }
}
