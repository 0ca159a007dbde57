// HTTP API server
//
// REST endpoints over the weather store plus the /chat endpoint that runs
// the tool-calling orchestrator.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::chat::ChatOrchestrator;
use crate::store::{NewLocation, NewWeather, Store, StoreError};
use crate::tools::ToolRegistry;

/// API server configuration
#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// Shared state behind every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub registry: Arc<ToolRegistry>,
    pub chat: Arc<ChatOrchestrator>,
}

/// API HTTP server
pub struct ApiServer {
    config: ApiConfig,
    state: AppState,
}

impl ApiServer {
    pub fn new(config: ApiConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Bind and serve until the process is stopped
    pub async fn serve(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let app = router(self.state);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!(
            target: "api",
            url = %format!("http://{}", addr),
            "API server ready"
        );

        axum::serve(listener, app).await?;
        Ok(())
    }
}

/// Build the router; split out so tests can drive it without a socket
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/chat", post(chat_handler))
        .route("/weather", get(list_weather_handler).post(create_weather_handler))
        .route("/weather/:date", get(weather_by_date_handler))
        .route("/locations", get(list_locations_handler).post(create_location_handler))
        .route("/locations/:id", get(location_by_id_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[derive(Deserialize)]
struct ChatRequest {
    #[serde(default)]
    message: String,
}

async fn chat_handler(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Response {
    let message = req.message.trim();
    if message.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "message must not be empty"})),
        )
            .into_response();
    }

    // The orchestrator never fails; provider faults come back as apology text
    let response = state.chat.respond(message).await;
    (StatusCode::OK, Json(json!({"response": response}))).into_response()
}

async fn health_handler(State(state): State<AppState>) -> Response {
    (
        StatusCode::OK,
        Json(json!({"status": "ok", "tools": state.registry.len()})),
    )
        .into_response()
}

#[derive(Deserialize)]
struct WeatherPage {
    #[serde(default)]
    offset: u32,
    #[serde(default = "default_weather_limit")]
    limit: u32,
}

fn default_weather_limit() -> u32 {
    100
}

async fn list_weather_handler(
    State(state): State<AppState>,
    Query(page): Query<WeatherPage>,
) -> Response {
    match state.store.list_weather(page.offset, page.limit).await {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(e) => store_error_response(e),
    }
}

async fn weather_by_date_handler(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Response {
    let date = match NaiveDate::parse_from_str(&date, "%Y-%m-%d") {
        Ok(d) => d,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"detail": "Expected date formatted YYYY-MM-DD"})),
            )
                .into_response();
        }
    };

    match state.store.get_weather_by_date(date).await {
        Ok(Some(record)) => (StatusCode::OK, Json(record)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({"detail": "Date not found"})),
        )
            .into_response(),
        Err(e) => store_error_response(e),
    }
}

async fn create_weather_handler(
    State(state): State<AppState>,
    Json(new): Json<NewWeather>,
) -> Response {
    match state.store.insert_weather(new).await {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(e) => store_error_response(e),
    }
}

#[derive(Deserialize)]
struct LocationPage {
    #[serde(default)]
    offset: u32,
    #[serde(default = "default_location_limit")]
    limit: u32,
}

fn default_location_limit() -> u32 {
    10
}

async fn list_locations_handler(
    State(state): State<AppState>,
    Query(page): Query<LocationPage>,
) -> Response {
    match state.store.list_locations(page.offset, page.limit).await {
        Ok(locations) => (StatusCode::OK, Json(locations)).into_response(),
        Err(e) => store_error_response(e),
    }
}

async fn location_by_id_handler(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match state.store.get_location(id).await {
        Ok(Some(location)) => (StatusCode::OK, Json(location)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({"detail": "Location not found"})),
        )
            .into_response(),
        Err(e) => store_error_response(e),
    }
}

async fn create_location_handler(
    State(state): State<AppState>,
    Json(new): Json<NewLocation>,
) -> Response {
    match state.store.insert_location(new).await {
        Ok(location) => (StatusCode::CREATED, Json(location)).into_response(),
        Err(e) => store_error_response(e),
    }
}

fn store_error_response(error: StoreError) -> Response {
    match &error {
        StoreError::InvalidGeometry(msg) => (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": msg.clone()})),
        )
            .into_response(),
        StoreError::Conflict(msg) => {
            (StatusCode::CONFLICT, Json(json!({"detail": msg.clone()}))).into_response()
        }
        _ => {
            warn!(target: "api", error = %error, "Store operation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"detail": "Internal server error"})),
            )
                .into_response()
        }
    }
}
