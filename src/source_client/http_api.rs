//! The actual wire call shared by all three vendors.
//!
//! One `VendorHttpApi` per source, each owning its own `reqwest::Client`.
//! Request shape and response parsing are identical across vendors except
//! for the body they POST (`{skip,limit}` vs `{cursor}`), so both
//! `pager::SkipLimitApi` and `pager::CursorApi` are implemented on the same
//! type and each vendor module picks whichever it needs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;

use super::pager::{CursorApi, CursorPage, SkipLimitApi};
use super::SourceClientError;
use crate::json_ext::RawRecord;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The exact phrase a non-2xx response body carries when the skip/limit
/// cursor has run past the end of the vendor's host list, distinguishing
/// that condition from a genuine transport failure.
const END_OF_DATA_ERROR_MESSAGE: &str = "Error invalid skip/limit combo (>number of hosts)";

/// The exact phrase Tenable returns for a cursor that has expired or never
/// existed. Treated as a clean empty page, not an error.
const INVALID_CURSOR_MESSAGE: &str = "Invalid cursor";

/// Thin wrapper over a per-source `reqwest::Client` implementing both
/// pagination strategies' wire-call traits.
pub struct VendorHttpApi {
    client: Client,
    base_url: String,
    endpoint_path: &'static str,
    source: &'static str,
}

impl VendorHttpApi {
    pub fn new(
        base_url: impl Into<String>,
        token: &str,
        endpoint_path: &'static str,
        source: &'static str,
    ) -> Result<Self, SourceClientError> {
        let mut headers = reqwest::header::HeaderMap::new();
        let mut token_value = reqwest::header::HeaderValue::from_str(token).map_err(|err| {
            SourceClientError::ClientConfig {
                source_name: source,
                message: format!("token is not a valid header value: {err}"),
            }
        })?;
        token_value.set_sensitive(true);
        headers.insert("token", token_value);

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()
            .map_err(|err| SourceClientError::ClientConfig {
                source_name: source,
                message: err.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            endpoint_path,
            source,
        })
    }

    fn url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.endpoint_path)
    }

    /// POSTs `query` as query-string parameters with an empty body, per the
    /// vendor APIs' calling convention.
    async fn post(&self, query: &[(&str, String)]) -> Result<Value, SourceClientError> {
        let response = self
            .client
            .post(self.url())
            .query(query)
            .send()
            .await
            .map_err(|err| SourceClientError::Transport {
                source_name: self.source,
                message: err.to_string(),
            })?;

        let status = response.status();
        let body_text = response.text().await.map_err(|err| SourceClientError::Transport {
            source_name: self.source,
            message: err.to_string(),
        })?;

        if status != StatusCode::OK {
            if body_text.contains(END_OF_DATA_ERROR_MESSAGE) {
                return Err(SourceClientError::EndOfDataSentinel);
            }
            return Err(SourceClientError::Transport {
                source_name: self.source,
                message: format!("HTTP {status}: {body_text}"),
            });
        }

        serde_json::from_str(&body_text).map_err(|err| SourceClientError::Transport {
            source_name: self.source,
            message: format!("response body is not valid JSON: {err}"),
        })
    }

    /// Inspects a successfully-parsed JSON body for the `error` shape the
    /// original tool checked before trusting a 200 response. Vendor
    /// validation errors arrive as a list of Zod-style objects
    /// (`{"code": "too_big", "maximum": 2, "message": "..."}`), so entries
    /// are matched by substring against their stringified form rather than
    /// assumed to be plain strings.
    fn check_structured_error(&self, body: &Value) -> Result<(), SourceClientError> {
        let Some(errors) = body.get("error").and_then(Value::as_array) else {
            return Ok(());
        };
        if errors.is_empty() {
            return Ok(());
        }
        let joined = errors
            .iter()
            .map(std::string::ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Err(SourceClientError::ApiConstraint {
            source_name: self.source,
            message: joined,
        })
    }
}

#[async_trait]
impl SkipLimitApi for VendorHttpApi {
    fn source_name(&self) -> &'static str {
        self.source
    }

    async fn fetch_page(&self, skip: u64, limit: u32) -> Result<Vec<RawRecord>, SourceClientError> {
        let body = self
            .post(&[("skip", skip.to_string()), ("limit", limit.to_string())])
            .await?;

        if let Some(list) = body.as_array() {
            return Ok(list.clone());
        }

        self.check_structured_error(&body)?;

        debug!(source = self.source, "response was a JSON object with no error key, treating as empty page");
        Ok(Vec::new())
    }
}

#[async_trait]
impl CursorApi for VendorHttpApi {
    fn source_name(&self) -> &'static str {
        self.source
    }

    async fn fetch_page(&self, cursor: &str) -> Result<CursorPage, SourceClientError> {
        let query: &[(&str, String)] = if cursor.is_empty() {
            &[]
        } else {
            &[("cursor", cursor.to_string())]
        };
        let body = match self.post(query).await {
            Ok(body) => body,
            Err(SourceClientError::Transport { message, .. }) if message.contains(INVALID_CURSOR_MESSAGE) => {
                debug!(source = self.source, "cursor rejected as invalid, treating as end of stream");
                return Ok(CursorPage { hosts: Vec::new(), next_cursor: String::new() });
            }
            Err(err) => return Err(err),
        };

        self.check_structured_error(&body)?;

        let hosts = body
            .get("hosts")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let next_cursor = body
            .get("cursor")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();

        Ok(CursorPage { hosts, next_cursor })
    }
}
