//! Wire models for the Cloud Run admin API
//!
//! Serde projections of the Knative `serving.knative.dev/v1` Service resource,
//! the IAM policy endpoints, and Google's JSON error envelope.

pub mod models;

pub use models::*;
