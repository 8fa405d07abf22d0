mod common;
mod preflight;
mod profile;
mod rebuild;
