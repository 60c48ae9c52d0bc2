//! Environment-driven pipeline configuration.
//!
//! Everything the pipeline needs to run comes from the process environment,
//! optionally pre-loaded from a `.env` file.

use anyhow::{Context, Result};

/// Configuration read once at process start.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Base URL shared by all three vendor APIs.
    pub api_base_url: String,
    /// Bearer-style token sent as the `token` header to every vendor.
    pub api_token: String,
    /// Connection string for the `AssetStore` backend.
    pub database_url: String,
}

impl PipelineConfig {
    /// Loads `.env` (best-effort, missing file is not an error) then reads
    /// `API_BASE_URL`, `API_TOKEN`, and `DATABASE_URL` from the environment.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            api_base_url: std::env::var("API_BASE_URL").context("API_BASE_URL is not set")?,
            api_token: std::env::var("API_TOKEN").context("API_TOKEN is not set")?,
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructs_from_explicit_fields() {
        let config = PipelineConfig {
            api_base_url: "https://api.example.test".to_owned(),
            api_token: "secret".to_owned(),
            database_url: "sqlite://assets.db".to_owned(),
        };
        assert_eq!(config.api_base_url, "https://api.example.test");
    }
}
