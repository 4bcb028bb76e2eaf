//! Application service: provisioning use-case.
//!
//! Resolves identity, generates the artifact set, and writes it whole.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::application::ports::{LocalFs, MetadataClient, ProgressReporter};
use crate::application::services::metadata::resolve;
use crate::domain::artifacts::{Artifact, ConfigArtifactSet, generate};
use crate::domain::config::OpsConfig;
use crate::domain::identity::InstanceIdentity;

/// One artifact after provisioning.
#[derive(Debug, Clone, Serialize)]
pub struct WrittenArtifact {
    pub path: PathBuf,
    pub sha256: String,
    pub bytes: usize,
    #[serde(skip)]
    pub contents: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProvisionOutcome {
    pub identity: InstanceIdentity,
    pub dry_run: bool,
    pub artifacts: Vec<WrittenArtifact>,
}

/// Resolve, generate, and (unless `dry_run`) overwrite every artifact.
///
/// # Errors
///
/// Returns an error if an artifact cannot be written. Artifacts already
/// written stay in place; rerunning converges.
pub async fn provision(
    host: &(impl MetadataClient + LocalFs),
    cfg: &OpsConfig,
    dry_run: bool,
    reporter: &impl ProgressReporter,
) -> Result<ProvisionOutcome> {
    reporter.step("resolving instance identity...");
    let identity = resolve(host, &cfg.metadata).await;
    reporter.success(&format!("identity {} ({})", identity.instance_id, identity.region));

    let set: ConfigArtifactSet = generate(&identity, cfg);
    let dir = PathBuf::from(&cfg.service.artifact_dir);
    let mut artifacts = Vec::with_capacity(4);
    for artifact in set.iter() {
        let path = dir.join(&artifact.file_name);
        if !dry_run {
            reporter.step(&format!("writing {}...", path.display()));
            host.write_atomic(&path, artifact.contents.as_bytes(), artifact.mode)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
        }
        artifacts.push(describe(path, artifact));
    }
    if !dry_run {
        reporter.success(&format!("{} artifacts written to {}", artifacts.len(), dir.display()));
    }
    Ok(ProvisionOutcome {
        identity,
        dry_run,
        artifacts,
    })
}

fn describe(path: PathBuf, artifact: &Artifact) -> WrittenArtifact {
    WrittenArtifact {
        path,
        sha256: hex_digest(artifact.contents.as_bytes()),
        bytes: artifact.contents.len(),
        contents: artifact.contents.clone(),
    }
}

/// Lowercase hex SHA-256 of `bytes`.
#[must_use]
pub fn hex_digest(bytes: &[u8]) -> String {
    use std::fmt::Write as _;
    Sha256::digest(bytes)
        .iter()
        .fold(String::with_capacity(64), |mut s, b| {
            let _ = write!(s, "{b:02x}");
            s
        })
}
