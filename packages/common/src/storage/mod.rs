mod error;
mod hash;
mod traits;

pub mod filesystem;
pub mod memory;
#[cfg(feature = "object-storage")]
pub mod s3;

pub use error::StorageError;
pub use hash::ContentHash;
pub use traits::{
    ObjectMetadata, ObjectStore, ObjectSummary, UserMetadata, normalize_key, validate_key,
};
