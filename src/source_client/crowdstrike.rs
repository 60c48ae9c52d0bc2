//! CrowdStrike source client: skip/limit pagination.
//!
//! Identical state machine to [`super::qualys`]; only the endpoint path and
//! documented limits differ, so this module is a thin parameterization
//! rather than a copy.

use super::http_api::VendorHttpApi;
use super::pager::SkipLimitPager;
use super::SourceClientError;

const SOURCE: &str = "CrowdStrike";
const ENDPOINT_PATH: &str = "/api/crowdstrike/hosts/get";

pub const MAX_API_LIMIT: u32 = 2;
pub const MAX_API_SKIP: u64 = 6;

pub fn build(base_url: &str, token: &str) -> Result<SkipLimitPager<VendorHttpApi>, SourceClientError> {
    let api = VendorHttpApi::new(base_url, token, ENDPOINT_PATH, SOURCE)?;
    SkipLimitPager::new(api, Some(MAX_API_LIMIT), Some(0), MAX_API_LIMIT, MAX_API_SKIP)
}
