//! The build-and-publish pipeline: scan, upload, assemble, record.

pub mod manifest;
mod publisher;
pub mod scanner;

pub use publisher::{ArtifactPublisher, RebuildError, RebuildRequest};
