//! Typed error taxonomy for the subsystem boundaries callers actually
//! pattern-match on. Orchestration seams that only log and move on
//! use `anyhow::Result` instead — see `crate::pipeline`.

use thiserror::Error;

/// Errors a `SourceClient` can surface to the pipeline driver.
#[derive(Debug, Error)]
pub enum SourceClientError {
    /// Connection, timeout, or non-2xx status that isn't a recognized
    /// end-of-data sentinel. Fatal for the current source's stream.
    #[error("transport error talking to {source_name}: {message}")]
    Transport { source_name: &'static str, message: String },

    /// The server rejected `skip`/`limit` as structurally invalid (not an
    /// end-of-data condition). Fatal for the current source's stream.
    #[error("{source_name} rejected pagination parameters: {message}")]
    ApiConstraint { source_name: &'static str, message: String },

    /// The vendor's "no more hosts at this skip/limit" sentinel. Not
    /// a fatal condition — callers catch this variant and run shrink-retry
    /// rather than propagating it.
    #[error("end of data")]
    EndOfDataSentinel,

    /// HTTP client construction failed (bad token header, bad base URL).
    #[error("failed to build HTTP client for {source_name}: {message}")]
    ClientConfig { source_name: &'static str, message: String },
}

/// Errors surfaced by an `AssetStore` implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("asset store I/O error: {0}")]
    Io(String),

    #[error("stored record is not valid JSON: {0}")]
    Corrupt(String),
}
