use anyhow::Context;
use tracing::{info, warn};

use learnhub_infra::{PostgresLearningStore, StoreConfig};

/// Apply the learnhub schema to the configured Postgres database.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    learnhub_observability::init();

    let config = StoreConfig::from_env().context("reading store configuration")?;

    match config {
        StoreConfig::Memory => {
            warn!("LEARNHUB_STORE is memory; nothing to migrate");
        }
        StoreConfig::Postgres(pg) => {
            let store = PostgresLearningStore::connect(&pg)
                .await
                .context("connecting to postgres")?;
            store.migrate().await.context("applying schema")?;
            info!("schema applied");
        }
    }

    Ok(())
}
