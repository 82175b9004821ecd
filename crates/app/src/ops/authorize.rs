use clap::Args;

use common::bulletin::UploadError;
use common::crypto::AccountId;
use common::ledger::AuthorizationMode;

use super::overrides::{client, LedgerOverrides};

#[derive(Args, Debug, Clone)]
pub struct Authorize {
    /// Account to grant quota to (SS58 or 0x hex)
    #[arg(long)]
    pub who: AccountId,

    /// Number of store transactions granted
    #[arg(long)]
    pub transactions: u32,

    /// Total bytes granted
    #[arg(long)]
    pub bytes: u64,

    #[command(flatten)]
    pub overrides: LedgerOverrides,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthorizeError {
    #[error("state error: {0}")]
    State(#[from] crate::state::StateError),
    #[error("authorization failed: {0}")]
    Authorize(#[from] UploadError),
}

#[async_trait::async_trait]
impl crate::op::Op for Authorize {
    type Error = AuthorizeError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = ctx.state()?;
        let mut opts = self.overrides.apply(&state);
        // granting quota needs root
        if self.overrides.authorization.is_none() {
            opts.authorization = AuthorizationMode::Sudo;
        }

        let inclusion = client(&state)
            .authorize_account(self.who, self.transactions, self.bytes, &opts)
            .await?;

        Ok(format!(
            "Authorized {} for {} transactions / {} bytes in block {}",
            self.who, self.transactions, self.bytes, inclusion.block_hash
        ))
    }
}
