pub mod build_status;
pub mod manifest;
pub mod storage;

pub use build_status::BuildStatus;
pub use manifest::{Manifest, ManifestFile};
