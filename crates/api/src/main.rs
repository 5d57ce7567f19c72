//! Station Feed - Main Entry Point

use api::{init_logging, run_server, settings::Settings};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    init_logging(settings.log_format);

    info!("=== Station Feed v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        "Storage backend {:?}, decimation window {} ms",
        settings.storage.backend,
        settings.query.window_ms.millis()
    );

    run_server(settings).await?;

    Ok(())
}
