//! The canonical Unified Host entity and its sub-structures.
//!
//! Everything here is plain data. Vendor-specific extraction lives in
//! `crate::normalize`; matching and merging live in `crate::dedup`.

use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A short string identifying which vendor observed a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SourceTag {
    Qualys,
    CrowdStrike,
    Tenable,
    /// A `source_ids` key the deduplicator does not recognize. Never produced
    /// by the three vendor normalizers; exists so merge logic has a total
    /// function from key to tag instead of panicking on unexpected input.
    Unknown,
}

impl SourceTag {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Qualys => "Qualys",
            Self::CrowdStrike => "CrowdStrike",
            Self::Tenable => "Tenable",
            Self::Unknown => "Unknown",
        }
    }

    /// Derives the source tag from a `source_ids` map key, per the
    /// `qualys_id` / `crowdstrike_id` / `tenable_id` convention.
    #[must_use]
    pub fn from_source_id_key(key: &str) -> Self {
        match key {
            "qualys_id" => Self::Qualys,
            "crowdstrike_id" => Self::CrowdStrike,
            "tenable_id" => Self::Tenable,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for SourceTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns the current instant as a UTC ISO-8601 string with microsecond
/// precision and a trailing `Z`.
#[must_use]
pub fn now_iso8601() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkInterface {
    pub mac_address: Option<String>,
    pub private_ip_v4: Option<String>,
    pub public_ip_v4: Option<String>,
    pub ip_v6: Option<String>,
    pub sources: BTreeSet<SourceTag>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CloudContext {
    pub provider: Option<String>,
    pub account_id: Option<String>,
    pub instance_id: Option<String>,
    pub instance_type: Option<String>,
    pub region: Option<String>,
    pub availability_zone: Option<String>,
    pub image_id: Option<String>,
    pub vpc_id: Option<String>,
    pub subnet_id: Option<String>,
}

impl CloudContext {
    /// `true` if every field is `None` — callers treat such a context as absent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Shallow field-level merge: `incoming`'s non-null fields win, otherwise
    /// `self`'s value is kept.
    #[must_use]
    pub fn merged_with(self, incoming: &Self) -> Self {
        Self {
            provider: incoming.provider.clone().or(self.provider),
            account_id: incoming.account_id.clone().or(self.account_id),
            instance_id: incoming.instance_id.clone().or(self.instance_id),
            instance_type: incoming.instance_type.clone().or(self.instance_type),
            region: incoming.region.clone().or(self.region),
            availability_zone: incoming.availability_zone.clone().or(self.availability_zone),
            image_id: incoming.image_id.clone().or(self.image_id),
            vpc_id: incoming.vpc_id.clone().or(self.vpc_id),
            subnet_id: incoming.subnet_id.clone().or(self.subnet_id),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenPort {
    pub port: Option<i64>,
    pub protocol: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualysSecurityInfo {
    pub agent_version: Option<String>,
    pub last_checked_in: Option<String>,
    pub last_vuln_scan: Option<String>,
    pub vulnerability_qids: Vec<i64>,
    pub open_ports: Vec<OpenPort>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrowdStrikeSecurityInfo {
    pub agent_version: Option<String>,
    pub status: Option<String>,
    pub first_seen: Option<String>,
    pub last_seen: Option<String>,
    pub policies: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TenableTag {
    pub id: Option<String>,
    pub category: Option<String>,
    pub value: Option<String>,
    #[serde(rename = "type")]
    pub tag_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TenableMitigation {
    pub id: Option<String>,
    pub vendor_name: Option<String>,
    pub product_name: Option<String>,
    pub version: Option<String>,
    pub form_factor: Option<String>,
    /// Normalized name; the vendor payload spells this `last_Detected`.
    pub last_detected: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TenableSecurityInfo {
    pub has_agent: Option<bool>,
    pub last_authenticated_scan_time: Option<String>,
    /// Opaque to the deduplicator; replaced wholesale on re-observation.
    pub vulnerability_counts: serde_json::Value,
    pub tags: Vec<TenableTag>,
    pub mitigations: Vec<TenableMitigation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Software {
    pub vendor: Option<String>,
    pub product: String,
    pub version: Option<String>,
    pub sources: BTreeSet<SourceTag>,
}

impl Software {
    #[must_use]
    pub fn key(&self) -> (Option<&str>, &str, Option<&str>) {
        (self.vendor.as_deref(), self.product.as_str(), self.version.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnifiedHost {
    // --- Strong identifiers ---
    pub primary_mac_address: Option<String>,
    pub cloud_instance_id: Option<String>,

    // --- Source identifiers ---
    pub source_ids: HashMap<String, String>,

    // --- Host identity ---
    pub hostname: Option<String>,
    pub os_name: Option<String>,
    pub os_platform: Option<String>,
    pub kernel_version: Option<String>,
    pub last_boot_timestamp: Option<String>,

    // --- Hardware ---
    pub manufacturer: Option<String>,
    pub product_model: Option<String>,
    pub processor_info: Option<String>,
    pub total_memory_mb: Option<i64>,

    // --- Network ---
    pub public_ip: Option<String>,
    pub private_ip: Option<String>,
    pub default_gateway: Option<String>,
    pub network_interfaces: Vec<NetworkInterface>,

    // --- Cloud context ---
    pub cloud_context: Option<CloudContext>,

    // --- Per-source security blobs ---
    pub qualys_security: Option<QualysSecurityInfo>,
    pub crowdstrike_security: Option<CrowdStrikeSecurityInfo>,
    pub tenable_security: Option<TenableSecurityInfo>,

    // --- Software inventory ---
    pub installed_software: Vec<Software>,

    // --- Provenance ---
    pub record_created_at: String,
    pub record_last_updated_at: String,
}

impl UnifiedHost {
    /// The single source tag this canonical record was produced by.
    ///
    /// A freshly normalized host always carries exactly one `source_ids`
    /// entry; an empty or unrecognized key falls back to `SourceTag::Unknown`
    /// rather than panicking, since a stored (already-merged) record can
    /// carry several entries and this is also called on those.
    #[must_use]
    pub fn incoming_source_tag(&self) -> SourceTag {
        self.source_ids
            .keys()
            .next()
            .map_or(SourceTag::Unknown, |k| SourceTag::from_source_id_key(k))
    }

    /// Equality ignoring `record_last_updated_at`, used by idempotence tests.
    #[must_use]
    pub fn equal_ignoring_timestamps(&self, other: &Self) -> bool {
        Self {
            record_last_updated_at: String::new(),
            ..self.clone()
        } == Self {
            record_last_updated_at: String::new(),
            ..other.clone()
        }
    }
}
