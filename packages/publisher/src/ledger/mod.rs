mod service;
mod stuck;

pub use service::{BuildLedger, CompletedBuild, LedgerError};
pub use stuck::fail_interrupted_builds;
