//! Host identity as reported by the local metadata service.

use serde::{Deserialize, Serialize};

use crate::domain::config::IdentityFallback;

/// Identity of the host the managed service runs on.
///
/// Every field is always populated, either with a live metadata value or the
/// configured fallback literal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceIdentity {
    pub instance_type: String,
    pub instance_id: String,
    pub public_ip: String,
    pub private_ip: String,
    pub region: String,
    pub availability_zone: String,
}

impl InstanceIdentity {
    /// Identity built purely from fallback literals.
    #[must_use]
    pub fn from_fallback(fallback: &IdentityFallback) -> Self {
        Self {
            instance_type: fallback.instance_type.clone(),
            instance_id: fallback.instance_id.clone(),
            public_ip: fallback.public_ip.clone(),
            private_ip: fallback.private_ip.clone(),
            region: fallback.region.clone(),
            availability_zone: fallback.availability_zone.clone(),
        }
    }

    /// Replace one field in place.
    pub fn set(&mut self, field: IdentityField, value: String) {
        match field {
            IdentityField::InstanceType => self.instance_type = value,
            IdentityField::InstanceId => self.instance_id = value,
            IdentityField::PublicIp => self.public_ip = value,
            IdentityField::PrivateIp => self.private_ip = value,
            IdentityField::Region => self.region = value,
            IdentityField::AvailabilityZone => self.availability_zone = value,
        }
    }

    #[must_use]
    pub fn get(&self, field: IdentityField) -> &str {
        match field {
            IdentityField::InstanceType => &self.instance_type,
            IdentityField::InstanceId => &self.instance_id,
            IdentityField::PublicIp => &self.public_ip,
            IdentityField::PrivateIp => &self.private_ip,
            IdentityField::Region => &self.region,
            IdentityField::AvailabilityZone => &self.availability_zone,
        }
    }
}

/// One metadata field, in resolution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityField {
    InstanceType,
    InstanceId,
    PublicIp,
    PrivateIp,
    Region,
    AvailabilityZone,
}

impl IdentityField {
    pub const ALL: [IdentityField; 6] = [
        IdentityField::InstanceType,
        IdentityField::InstanceId,
        IdentityField::PublicIp,
        IdentityField::PrivateIp,
        IdentityField::Region,
        IdentityField::AvailabilityZone,
    ];

    /// Path under `meta-data/`.
    #[must_use]
    pub fn metadata_path(self) -> &'static str {
        match self {
            IdentityField::InstanceType => "instance-type",
            IdentityField::InstanceId => "instance-id",
            IdentityField::PublicIp => "public-ipv4",
            IdentityField::PrivateIp => "local-ipv4",
            IdentityField::Region => "placement/region",
            IdentityField::AvailabilityZone => "placement/availability-zone",
        }
    }
}

/// Normalise a raw metadata response body. Empty bodies count as missing.
#[must_use]
pub fn clean_metadata_value(raw: &str) -> Option<String> {
    let value = raw.trim();
    if value.is_empty() || value.contains('\n') || value.len() > 255 {
        return None;
    }
    Some(value.to_string())
}
