//! The two pagination state machines, each generic over the wire
//! call that actually fetches a page, so the retry/termination logic is
//! written once and shared by every vendor.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{SourceClient, SourceClientError};
use crate::json_ext::RawRecord;

/// The fixed inter-page backoff between successful pages.
const PAGE_BACKOFF: Duration = Duration::from_millis(50);

/// Fetches one skip/limit page. Implemented by `VendorHttpApi` for the real
/// wire call; test doubles implement it directly to drive the state machine
/// without a network.
#[async_trait]
pub trait SkipLimitApi: Send {
    /// Vendor name, for log lines and error messages.
    fn source_name(&self) -> &'static str;
    async fn fetch_page(&self, skip: u64, limit: u32) -> Result<Vec<RawRecord>, SourceClientError>;
}

/// Skip/limit pager shared by Qualys and CrowdStrike.
pub struct SkipLimitPager<A: SkipLimitApi> {
    api: A,
    skip: u64,
    limit: u32,
    max_skip: u64,
    buffer: VecDeque<RawRecord>,
    terminated: bool,
}

impl<A: SkipLimitApi> SkipLimitPager<A> {
    /// `page_limit` defaults to `max_limit` when `None`; `start_skip`
    /// defaults to `0`. Returns a configuration fault if `page_limit` is
    /// outside `1..=max_limit`.
    pub fn new(
        api: A,
        page_limit: Option<u32>,
        start_skip: Option<u64>,
        max_limit: u32,
        max_skip: u64,
    ) -> Result<Self, SourceClientError> {
        let limit = page_limit.unwrap_or(max_limit);
        if limit == 0 || limit > max_limit {
            return Err(SourceClientError::ApiConstraint {
                source_name: api.source_name(),
                message: format!(
                    "requested page_limit ({limit}) must be between 1 and {max_limit} inclusive"
                ),
            });
        }
        Ok(Self {
            api,
            skip: start_skip.unwrap_or(0),
            limit,
            max_skip,
            buffer: VecDeque::new(),
            terminated: false,
        })
    }

    async fn fetch_next_page(&mut self) -> Result<(), SourceClientError> {
        if self.skip > self.max_skip {
            info!(
                source = self.api.source_name(),
                skip = self.skip,
                max_skip = self.max_skip,
                "reached documented maximum skip, stopping"
            );
            self.terminated = true;
            return Ok(());
        }

        debug!(
            source = self.api.source_name(),
            skip = self.skip,
            limit = self.limit,
            "fetching page"
        );

        match self.api.fetch_page(self.skip, self.limit).await {
            Ok(page) if page.is_empty() => {
                debug!(source = self.api.source_name(), "empty page, clean termination");
                self.terminated = true;
            }
            Ok(page) => {
                self.skip += u64::from(self.limit);
                self.buffer.extend(page);
                tokio::time::sleep(PAGE_BACKOFF).await;
            }
            Err(SourceClientError::EndOfDataSentinel) => {
                warn!(
                    source = self.api.source_name(),
                    skip = self.skip,
                    limit = self.limit,
                    "end-of-data sentinel, entering shrink-retry"
                );
                self.shrink_retry().await;
                self.terminated = true;
            }
            Err(err) => {
                self.terminated = true;
                return Err(err);
            }
        }
        Ok(())
    }

    /// Decreasing `limit` from `actual_limit - 1` down to `1`, retrying the
    /// same `skip`. Stops at the first non-empty success; leaves the buffer
    /// untouched if every shrink fails.
    async fn shrink_retry(&mut self) {
        for retry_limit in (1..self.limit).rev() {
            debug!(
                source = self.api.source_name(),
                skip = self.skip,
                retry_limit,
                "shrink-retry attempt"
            );
            match self.api.fetch_page(self.skip, retry_limit).await {
                Ok(page) if !page.is_empty() => {
                    info!(
                        source = self.api.source_name(),
                        skip = self.skip,
                        retry_limit,
                        yielded = page.len(),
                        "shrink-retry succeeded"
                    );
                    self.buffer.extend(page);
                    return;
                }
                Ok(_) => {}
                Err(err) => {
                    debug!(
                        source = self.api.source_name(),
                        retry_limit,
                        error = %err,
                        "shrink-retry attempt failed"
                    );
                }
            }
        }
        warn!(
            source = self.api.source_name(),
            skip = self.skip,
            "no smaller limit drained any data, stopping"
        );
    }
}

#[async_trait]
impl<A: SkipLimitApi> SourceClient for SkipLimitPager<A> {
    async fn next_record(&mut self) -> Result<Option<RawRecord>, SourceClientError> {
        loop {
            if let Some(record) = self.buffer.pop_front() {
                return Ok(Some(record));
            }
            if self.terminated {
                return Ok(None);
            }
            self.fetch_next_page().await?;
        }
    }
}

/// One cursor-strategy page: the records plus the cursor to present
/// on the next call.
pub struct CursorPage {
    pub hosts: Vec<RawRecord>,
    pub next_cursor: String,
}

/// Fetches one cursor page. Implemented by `VendorHttpApi` for Tenable.
#[async_trait]
pub trait CursorApi: Send {
    fn source_name(&self) -> &'static str;
    async fn fetch_page(&self, cursor: &str) -> Result<CursorPage, SourceClientError>;
}

/// Opaque-cursor pager used by Tenable.
pub struct CursorPager<A: CursorApi> {
    api: A,
    cursor: String,
    buffer: VecDeque<RawRecord>,
    terminated: bool,
}

impl<A: CursorApi> CursorPager<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            cursor: String::new(),
            buffer: VecDeque::new(),
            terminated: false,
        }
    }

    async fn fetch_next_page(&mut self) -> Result<(), SourceClientError> {
        debug!(source = self.api.source_name(), cursor = %self.cursor, "fetching page");
        let page = self.api.fetch_page(&self.cursor).await?;
        if page.hosts.is_empty() {
            debug!(source = self.api.source_name(), "empty hosts, clean termination");
            self.terminated = true;
        } else {
            self.cursor = page.next_cursor;
            self.buffer.extend(page.hosts);
        }
        Ok(())
    }
}

#[async_trait]
impl<A: CursorApi> SourceClient for CursorPager<A> {
    async fn next_record(&mut self) -> Result<Option<RawRecord>, SourceClientError> {
        loop {
            if let Some(record) = self.buffer.pop_front() {
                return Ok(Some(record));
            }
            if self.terminated {
                return Ok(None);
            }
            self.fetch_next_page().await?;
        }
    }
}
