//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use thiserror::Error;

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors raised while validating the static ops configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid threshold {key}: {value} (must be greater than 0 and at most 100)")]
    InvalidThreshold { key: &'static str, value: f64 },

    #[error("Invalid worker count: {0} (need at least 1)")]
    InvalidWorkers(u32),

    #[error("Invalid credential mode '{0}': expected an octal permission such as 600")]
    InvalidMode(String),

    #[error("Invalid feature flag name '{0}': must match ^[a-z][a-z0-9_]*$")]
    InvalidFeatureName(String),

    #[error("Invalid {key} port: {port}")]
    InvalidPort { key: &'static str, port: u16 },

    #[error("Firewall port {0} is used by both ssh and the API")]
    PortConflict(u16),

    #[error("Invalid {key} '{value}': use up to 64 letters, digits, '.', '_' or '-', starting with a letter or digit")]
    InvalidUnitName { key: &'static str, value: String },

    #[error("Invalid log_rotation.max_size '{0}': expected a number with an optional k, M or G suffix")]
    InvalidMaxSize(String),

    #[error("Invalid api.bind_host '{0}': the API binds to a wildcard address (0.0.0.0 or ::)")]
    NonWildcardBind(String),
}

// ── Lifecycle errors ──────────────────────────────────────────────────────────

/// Errors related to the managed service lifecycle.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Precondition '{check}' failed: {message}\n\nRun 'ndt-ops health' for the full picture.")]
    PreconditionFailed { check: String, message: String },

    #[error("Failed to launch the managed service: {0}")]
    LaunchFailed(String),

    #[error("Failed to stop the managed service: {0}")]
    StopFailed(String),

    #[error("Invalid lifecycle transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}

// ── Remediation errors ────────────────────────────────────────────────────────

/// Errors raised by a single remediation attempt. Always reported, never
/// escalated beyond the check that triggered the remediation.
#[derive(Debug, Error)]
pub enum RemediationError {
    #[error("cannot change mode of {path} to {mode:o}: {reason}")]
    Permission {
        path: String,
        mode: u32,
        reason: String,
    },

    #[error("cannot start {service}: {reason}")]
    ServiceStart { service: String, reason: String },

    #[error("{service} started but did not become reachable")]
    Unconfirmed { service: String },
}
