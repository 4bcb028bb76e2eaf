//! Identity resolution tests.

use std::collections::HashMap;

use ndt_ops::application::services::metadata::resolve;
use ndt_ops::domain::config::MetadataConfig;

use crate::helpers::FakeHost;

fn full_metadata() -> HashMap<String, String> {
    HashMap::from([
        ("instance-type".to_string(), "t3.large".to_string()),
        ("instance-id".to_string(), "i-0123456789abcdef0".to_string()),
        ("public-ipv4".to_string(), "54.1.2.3".to_string()),
        ("local-ipv4".to_string(), "10.0.0.5\n".to_string()),
        ("placement/region".to_string(), "eu-central-1".to_string()),
        ("placement/availability-zone".to_string(), "eu-central-1b".to_string()),
    ])
}

#[tokio::test]
async fn test_unreachable_metadata_service_yields_every_fallback() {
    let host = FakeHost::healthy();
    let cfg = MetadataConfig::default();

    let identity = resolve(&host, &cfg).await;

    assert_eq!(identity.instance_type, "unknown");
    assert_eq!(identity.instance_id, "local");
    assert_eq!(identity.public_ip, "127.0.0.1");
    assert_eq!(identity.private_ip, "127.0.0.1");
    assert_eq!(identity.region, "us-east-1");
    assert_eq!(identity.availability_zone, "us-east-1a");
}

#[tokio::test]
async fn test_token_authenticated_fetch_fills_every_field() {
    let mut host = FakeHost::healthy();
    host.metadata = Some(full_metadata());
    host.token_available = true;

    let identity = resolve(&host, &MetadataConfig::default()).await;

    assert_eq!(identity.instance_type, "t3.large");
    assert_eq!(identity.private_ip, "10.0.0.5");
    assert_eq!(identity.availability_zone, "eu-central-1b");
    assert!(
        host.metadata_calls
            .lock()
            .expect("lock")
            .iter()
            .all(|(_, with_token)| *with_token)
    );
}

#[tokio::test]
async fn test_token_failure_falls_back_to_direct_fetch() {
    let mut host = FakeHost::healthy();
    host.metadata = Some(full_metadata());
    host.token_available = false;

    let identity = resolve(&host, &MetadataConfig::default()).await;

    assert_eq!(identity.instance_id, "i-0123456789abcdef0");
    assert!(
        host.metadata_calls
            .lock()
            .expect("lock")
            .iter()
            .all(|(_, with_token)| !*with_token)
    );
}

#[tokio::test]
async fn test_each_field_falls_back_independently() {
    let mut host = FakeHost::healthy();
    let mut partial = full_metadata();
    partial.remove("public-ipv4");
    partial.insert("instance-type".to_string(), "   ".to_string());
    host.metadata = Some(partial);
    host.token_available = true;

    let mut cfg = MetadataConfig::default();
    cfg.fallback.public_ip = "0.0.0.0".to_string();
    let identity = resolve(&host, &cfg).await;

    assert_eq!(identity.public_ip, "0.0.0.0");
    assert_eq!(identity.instance_type, "unknown");
    assert_eq!(identity.region, "eu-central-1");
}
