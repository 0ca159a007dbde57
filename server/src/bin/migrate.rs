// Standalone migration runner: brings the database schema up to date and
// exits. The server also migrates at startup; this exists for deploy
// pipelines that migrate before rolling the service.

use skycast_core::store::{migrations, Store};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let database_path = std::env::var("SKYCAST_DB")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "skycast.db".to_string());

    let store = Store::new(&database_path);
    let applied = store.migrate().await?;

    info!(
        target: "migrate",
        db = %database_path,
        applied,
        version = migrations::latest_version(),
        "Migrations complete"
    );
    Ok(())
}
