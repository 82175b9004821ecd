use std::path::PathBuf;

use clap::Args;

use common::linked_data::compute_cid;

#[derive(Args, Debug, Clone)]
pub struct Cid {
    /// File to compute the CID of
    pub file: PathBuf,

    /// Also print the 32 byte contract storage key of the CID
    #[arg(long)]
    pub bytes32: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum CidError {
    #[error("failed to read {0}: {1}")]
    Read(PathBuf, std::io::Error),
}

#[async_trait::async_trait]
impl crate::op::Op for Cid {
    type Error = CidError;
    type Output = String;

    async fn execute(&self, _ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let data = tokio::fs::read(&self.file)
            .await
            .map_err(|e| CidError::Read(self.file.clone(), e))?;
        let cid = compute_cid(&data);

        if self.bytes32 {
            Ok(format!("{}\n0x{}", cid, hex::encode(cid.to_bytes32())))
        } else {
            Ok(cid.to_string())
        }
    }
}
