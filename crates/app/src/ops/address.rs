use clap::Args;

use common::crypto::{Signer, DEFAULT_SS58_PREFIX};

#[derive(Args, Debug, Clone)]
pub struct Address {
    /// SS58 network prefix to render the address with
    #[arg(long, default_value_t = DEFAULT_SS58_PREFIX)]
    pub prefix: u16,
}

#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    #[error("state error: {0}")]
    State(#[from] crate::state::StateError),
    #[error("invalid account: {0}")]
    Signer(#[from] common::crypto::SignerError),
    #[error("invalid address: {0}")]
    Address(#[from] common::crypto::AddressError),
}

#[async_trait::async_trait]
impl crate::op::Op for Address {
    type Error = AddressError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = ctx.state()?;
        let config = &state.config;
        let signer = Signer::from_phrase(&config.mnemonic(), &config.derivation_path, config.scheme)?;
        let account = signer.account_id();

        Ok(format!(
            "Account: {}\nPublic key: {}\nScheme: {}\nPath: {}",
            account.to_ss58(self.prefix)?,
            account.to_hex(),
            signer.scheme(),
            config.derivation_path
        ))
    }
}
