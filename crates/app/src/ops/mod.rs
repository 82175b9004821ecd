pub mod address;
pub mod authorize;
pub mod cat;
pub mod cid;
pub mod init;
mod overrides;
pub mod renew;
pub mod upload;
pub mod version;

pub use address::Address;
pub use authorize::Authorize;
pub use cat::Cat;
pub use cid::Cid;
pub use init::Init;
pub use renew::Renew;
pub use upload::Upload;
pub use version::Version;
