//! Data models

pub mod github;
pub mod image;
