//! Core business objects: the canonical Unified Host and its sub-structures.
//!
//! Independent of HTTP, storage and configuration concerns by design —
//! every other module depends on this one, never the reverse.

pub mod host;

pub use host::{
    CloudContext, CrowdStrikeSecurityInfo, NetworkInterface, OpenPort, QualysSecurityInfo,
    Software, SourceTag, TenableMitigation, TenableSecurityInfo, TenableTag, UnifiedHost,
    now_iso8601,
};
