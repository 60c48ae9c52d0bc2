use asset_unifier::dedup::sqlite_store::SqliteAssetStore;
use asset_unifier::domain::SourceTag;
use asset_unifier::source_client::{crowdstrike, qualys, tenable, SourceClient};
use asset_unifier::{Deduplicator, PipelineConfig, PipelineDriver};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    asset_unifier::logging::init_logging()?;

    let config = PipelineConfig::from_env()?;

    let store = SqliteAssetStore::new(&config.database_url).await?;
    let deduplicator = Deduplicator::new(store);
    deduplicator.ensure_indexes().await?;

    let sources: Vec<(SourceTag, Box<dyn SourceClient>)> = vec![
        (
            SourceTag::Qualys,
            Box::new(qualys::build(&config.api_base_url, &config.api_token)?),
        ),
        (
            SourceTag::CrowdStrike,
            Box::new(crowdstrike::build(&config.api_base_url, &config.api_token)?),
        ),
        (
            SourceTag::Tenable,
            Box::new(tenable::build(&config.api_base_url, &config.api_token)?),
        ),
    ];

    let driver = PipelineDriver::new(deduplicator);
    let counts = driver.run(sources).await;

    for (source, count) in &counts {
        tracing::info!(source = %source, count, "pipeline run complete");
    }

    Ok(())
}
