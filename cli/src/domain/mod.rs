//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod artifacts;
pub mod check;
pub mod config;
pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod metrics;
pub mod report;
pub mod status;

pub use artifacts::{Artifact, ConfigArtifactSet, generate};
pub use check::{CheckId, CheckResult, CheckStatus, ProbeOutcome};
pub use config::{OpsConfig, validate_config};
pub use error::{ConfigError, LifecycleError, RemediationError};
pub use identity::{IdentityField, InstanceIdentity};
pub use lifecycle::{LifecycleState, ProcessHandle, StartOutcome, StopOutcome};
pub use metrics::{LoadAverage, ResourceSample};
pub use report::{HealthReport, OverallStatus, score};
pub use status::StatusSnapshot;
