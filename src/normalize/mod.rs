//! Vendor-specific raw-JSON-to-canonical-host mapping.
//!
//! Each function here is pure and stateless: same input, same output except
//! for the two timestamp fields. None of them suspend or touch I/O.

mod crowdstrike;
mod qualys;
mod tenable;

use crate::domain::{SourceTag, UnifiedHost};
use crate::json_ext::{is_blank, RawRecord};

/// Dispatches to the vendor-specific normalizer. Returns `None` iff
/// `raw_record` is blank (null, empty object, or empty array) or `source`
/// has no normalizer.
#[must_use]
pub fn normalize_host(raw_record: &RawRecord, source: SourceTag) -> Option<UnifiedHost> {
    if is_blank(raw_record) {
        return None;
    }
    match source {
        SourceTag::Qualys => Some(qualys::normalize(raw_record)),
        SourceTag::CrowdStrike => Some(crowdstrike::normalize(raw_record)),
        SourceTag::Tenable => Some(tenable::normalize(raw_record)),
        SourceTag::Unknown => {
            tracing::warn!("no normalizer available for source: {source}");
            None
        }
    }
}
