//! Migrate command - brings the schema up to date

use tracing::info;

/// Apply every pending migration and exit
pub async fn run() -> anyhow::Result<()> {
    let config = super::bootstrap()?;

    let store = crate::connect_store(&config).await?;
    store.close().await;

    info!("Migrations complete");

    Ok(())
}
