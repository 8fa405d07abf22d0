pub mod build;
pub mod preflight_run;
pub mod profile;
pub mod server;
