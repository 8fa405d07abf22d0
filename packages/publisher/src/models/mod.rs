pub mod build;
pub mod preflight;
pub mod profile;
pub mod shared;
