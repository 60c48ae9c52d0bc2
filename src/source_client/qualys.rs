//! Qualys source client: skip/limit pagination.

use super::http_api::VendorHttpApi;
use super::pager::SkipLimitPager;
use super::SourceClientError;

const SOURCE: &str = "Qualys";
const ENDPOINT_PATH: &str = "/api/qualys/hosts/get";

/// Documented ceiling on a single page's `limit`.
pub const MAX_API_LIMIT: u32 = 2;

/// Documented ceiling on `skip`; beyond this the vendor always returns empty.
pub const MAX_API_SKIP: u64 = 6;

/// Builds a fully paginated Qualys client starting at `skip = 0` with the
/// maximum page size.
pub fn build(base_url: &str, token: &str) -> Result<SkipLimitPager<VendorHttpApi>, SourceClientError> {
    let api = VendorHttpApi::new(base_url, token, ENDPOINT_PATH, SOURCE)?;
    SkipLimitPager::new(api, Some(MAX_API_LIMIT), Some(0), MAX_API_LIMIT, MAX_API_SKIP)
}
