//! Tenable source client: opaque-cursor pagination.

use super::http_api::VendorHttpApi;
use super::pager::CursorPager;
use super::SourceClientError;

const SOURCE: &str = "Tenable";
const ENDPOINT_PATH: &str = "/api/tenable/hosts/get";

pub fn build(base_url: &str, token: &str) -> Result<CursorPager<VendorHttpApi>, SourceClientError> {
    let api = VendorHttpApi::new(base_url, token, ENDPOINT_PATH, SOURCE)?;
    Ok(CursorPager::new(api))
}
