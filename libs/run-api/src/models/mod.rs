//! API models

mod error;
mod iam;
mod service;

pub use error::*;
pub use iam::*;
pub use service::*;
