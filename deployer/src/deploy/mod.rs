//! Deployment reconciliation engine

pub mod access;
pub mod delete;
pub mod events;
pub mod fsm;
pub mod platform;
pub mod poll;
pub mod probe;
pub mod readiness;
pub mod reconciler;
pub mod request;
pub mod spec;
pub mod upsert;

pub use events::{LogSink, Phase, ProgressEvent, ProgressSink};
pub use platform::{ImageRegistry, ServiceLocation, ServicePlatform};
pub use poll::PollPolicy;
pub use reconciler::{DeploymentReconciler, ReconcilerSettings, ReconciliationOutcome};
pub use request::{DeploymentRequest, EnvironmentMapping, ServiceName};
