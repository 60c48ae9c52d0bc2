//! Paginated vendor ingestion.
//!
//! A `SourceClient` is a pull-based, lazy, finite sequence of raw records:
//! callers drive it with `next_record().await` until it returns `Ok(None)`.
//! Two pagination strategies back the three vendors — skip/limit (Qualys,
//! CrowdStrike) and opaque-cursor (Tenable) — implemented once in
//! [`pager`] and parameterized per vendor, per the composition-over-
//! inheritance note in the design notes.

pub mod crowdstrike;
pub mod http_api;
pub mod pager;
pub mod qualys;
pub mod tenable;

use async_trait::async_trait;

pub use crate::error::SourceClientError;
use crate::json_ext::RawRecord;

/// A lazy, finite sequence of raw vendor records.
///
/// `next_record` returns `Ok(Some(record))` for each record in vendor
/// page-and-within-page order, `Ok(None)` once the stream has cleanly
/// terminated, and `Err` exactly once for a fatal condition — after an
/// `Err`, the stream is considered terminated and must not be polled again.
#[async_trait]
pub trait SourceClient: Send {
    async fn next_record(&mut self) -> Result<Option<RawRecord>, SourceClientError>;
}
