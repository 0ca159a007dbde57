use std::fs;
use std::path::Path;

use serde::Deserialize;
use skycast_core::api::ApiConfig;
use skycast_core::llm::LlmClientConfig;

/// High-level configuration for the Skycast server
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub api: ApiConfig,
    pub database_path: String,
    pub llm: LlmClientConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                host: std::env::var("SKYCAST_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
                port: std::env::var("SKYCAST_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8000),
            },
            database_path: std::env::var("SKYCAST_DB")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "skycast.db".to_string()),
            llm: LlmClientConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file (path via SKYCAST_CONFIG or
    /// ./skycast.toml), overlaying values onto env-driven defaults.
    pub fn load() -> Self {
        let default = Self::default();
        let path = std::env::var("SKYCAST_CONFIG").unwrap_or_else(|_| "skycast.toml".into());
        let p = Path::new(&path);
        if !p.exists() {
            tracing::info!(target: "config", path = %path, "No TOML config found; using defaults/env");
            return default;
        }
        match fs::read_to_string(p) {
            Ok(s) => match toml::from_str::<ServerToml>(&s) {
                Ok(t) => t.overlay(default),
                Err(e) => {
                    tracing::warn!(target: "config", error = %e, "Failed to parse TOML; using defaults");
                    default
                }
            },
            Err(e) => {
                tracing::warn!(target: "config", error = %e, "Failed to read TOML; using defaults");
                default
            }
        }
    }
}

/// TOML overlay: every field optional, unset fields keep their defaults
#[derive(Debug, Deserialize)]
struct ServerToml {
    host: Option<String>,
    port: Option<u16>,
    database_path: Option<String>,
    llm: Option<LlmToml>,
}

#[derive(Debug, Deserialize)]
struct LlmToml {
    base_url: Option<String>,
    model: Option<String>,
    api_key: Option<String>,
    request_timeout_ms: Option<u64>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl ServerToml {
    fn overlay(self, mut config: ServerConfig) -> ServerConfig {
        if let Some(host) = self.host {
            config.api.host = host;
        }
        if let Some(port) = self.port {
            config.api.port = port;
        }
        if let Some(database_path) = self.database_path {
            config.database_path = database_path;
        }
        if let Some(llm) = self.llm {
            if let Some(base_url) = llm.base_url {
                config.llm.base_url = base_url;
            }
            if let Some(model) = llm.model {
                config.llm.model = model;
            }
            if let Some(api_key) = llm.api_key {
                config.llm.api_key = Some(api_key);
            }
            if let Some(timeout) = llm.request_timeout_ms {
                config.llm.request_timeout_ms = timeout;
            }
            if let Some(temperature) = llm.temperature {
                config.llm.temperature = temperature;
            }
            if let Some(max_tokens) = llm.max_tokens {
                config.llm.max_tokens = max_tokens;
            }
        }
        config
    }
}
