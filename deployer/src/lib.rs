//! Cloud Run deployer library
//!
//! Deploys a container image to Cloud Run from a CI job, reports progress on
//! the pull request and optionally tears the service down again.

pub mod app;
pub mod authn;
pub mod deploy;
pub mod errors;
pub mod http;
pub mod image;
pub mod logs;
pub mod models;
pub mod report;
pub mod utils;
