pub mod build;
pub mod manifest;
pub mod preflight;
pub mod profile;
