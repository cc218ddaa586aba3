//! Remote API clients

pub mod client;
pub mod github;
pub mod registry;
pub mod run;
