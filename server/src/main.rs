mod config;

use config::ServerConfig;
use skycast_core::api::{ApiServer, AppState};
use skycast_core::chat::ChatOrchestrator;
use skycast_core::llm::LlmClient;
use skycast_core::store::Store;
use skycast_core::tools::{ToolRegistry, WeatherByDateTool, WeatherListTool};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Logging / tracing
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let cfg = ServerConfig::load();
    info!(
        target: "skycast",
        db = %cfg.database_path,
        model = %cfg.llm.model,
        "Starting Skycast server"
    );

    // Store: open and bring the schema up to date
    let store = Arc::new(Store::new(&cfg.database_path));
    store.migrate().await?;

    // Tool registry: populated once here, read-only afterwards
    let registry = Arc::new(ToolRegistry::new());
    registry.register(Arc::new(WeatherListTool::new(Arc::clone(&store))))?;
    registry.register(Arc::new(WeatherByDateTool::new(Arc::clone(&store))))?;

    // Provider client and orchestrator
    let llm = Arc::new(LlmClient::new(cfg.llm.clone())?);
    let chat = Arc::new(ChatOrchestrator::new(llm, Arc::clone(&registry)));

    let state = AppState {
        store,
        registry,
        chat,
    };
    ApiServer::new(cfg.api.clone(), state).serve().await?;

    Ok(())
}
