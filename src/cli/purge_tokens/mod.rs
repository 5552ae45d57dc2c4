//! Purge-tokens command - sweeps expired token rows

use tracing::info;

pub async fn run() -> anyhow::Result<()> {
    let config = super::bootstrap()?;

    let service = crate::build_identity_service(&config).await?;
    let purged = service.purge_expired_tokens().await?;

    info!(purged, "Token sweep complete");

    Ok(())
}
