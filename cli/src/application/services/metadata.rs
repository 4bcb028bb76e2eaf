//! Application service: host identity resolution.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use crate::application::ports::MetadataClient;
use crate::domain::config::MetadataConfig;
use crate::domain::identity::{IdentityField, InstanceIdentity, clean_metadata_value};

/// Resolve every identity field. Never fails.
///
/// Each field is resolved on its own: token, then token-authenticated fetch,
/// then an unauthenticated fetch of the same path, then the configured
/// fallback literal.
pub async fn resolve(client: &impl MetadataClient, cfg: &MetadataConfig) -> InstanceIdentity {
    let mut identity = InstanceIdentity::from_fallback(&cfg.fallback);
    for field in IdentityField::ALL {
        match resolve_field(client, cfg, field).await {
            Some(value) => identity.set(field, value),
            None => tracing::debug!(
                field = field.metadata_path(),
                fallback = identity.get(field),
                "metadata unavailable, using fallback"
            ),
        }
    }
    identity
}

async fn resolve_field(
    client: &impl MetadataClient,
    cfg: &MetadataConfig,
    field: IdentityField,
) -> Option<String> {
    let path = field.metadata_path();
    match client.acquire_token(cfg.token_ttl_secs).await {
        Ok(token) => match client.fetch(path, Some(&token)).await {
            Ok(raw) => return clean_metadata_value(&raw),
            Err(e) => tracing::debug!(field = path, error = %e, "token fetch failed"),
        },
        Err(e) => tracing::debug!(field = path, error = %e, "token acquisition failed"),
    }
    match client.fetch(path, None).await {
        Ok(raw) => clean_metadata_value(&raw),
        Err(e) => {
            tracing::debug!(field = path, error = %e, "direct fetch failed");
            None
        }
    }
}
