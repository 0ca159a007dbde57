// One-shot importer for historical daily weather from the Open-Meteo
// archive API. Ensures the target location exists, then bulk-inserts the
// daily series; dates already present are left untouched.

use chrono::NaiveDate;
use serde::Deserialize;
use skycast_core::geom::Point;
use skycast_core::store::{NewLocation, NewWeather, Store};
use std::time::Duration;
use tracing::{info, warn};

const ARCHIVE_ENDPOINT: &str = "https://archive-api.open-meteo.com/v1/archive";

#[derive(Debug, Clone)]
struct FetchConfig {
    latitude: f64,
    longitude: f64,
    start_date: String,
    end_date: String,
    location_name: String,
    database_path: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            latitude: env_parse("SKYCAST_FETCH_LAT", 6.9271),
            longitude: env_parse("SKYCAST_FETCH_LON", 79.8612),
            start_date: env_or("SKYCAST_FETCH_START", "2000-01-01"),
            end_date: env_or("SKYCAST_FETCH_END", "2025-06-01"),
            location_name: env_or("SKYCAST_FETCH_LOCATION", "Colombo"),
            database_path: env_or("SKYCAST_DB", "skycast.db"),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Archive response: parallel arrays under `daily`, one entry per day
#[derive(Debug, Deserialize)]
struct ArchiveResponse {
    daily: DailySeries,
}

#[derive(Debug, Deserialize)]
struct DailySeries {
    time: Vec<String>,
    temperature_2m_max: Vec<Option<f64>>,
    temperature_2m_min: Vec<Option<f64>>,
    precipitation_sum: Vec<Option<f64>>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let cfg = FetchConfig::default();
    info!(
        target: "fetch_weather",
        location = %cfg.location_name,
        start = %cfg.start_date,
        end = %cfg.end_date,
        "Importing archive weather data"
    );

    let store = Store::new(&cfg.database_path);
    store.migrate().await?;

    // Upsert the location the series belongs to
    let location = match store.get_location_by_name(cfg.location_name.clone()).await? {
        Some(existing) => existing,
        None => {
            let geom = Point::new(cfg.longitude, cfg.latitude).to_wkt();
            store
                .insert_location(NewLocation {
                    name: cfg.location_name.clone(),
                    geom,
                })
                .await?
        }
    };

    let url = format!(
        "{}?latitude={}&longitude={}&start_date={}&end_date={}\
         &daily=temperature_2m_max,temperature_2m_min,precipitation_sum&timezone=auto",
        ARCHIVE_ENDPOINT, cfg.latitude, cfg.longitude, cfg.start_date, cfg.end_date
    );

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()?;
    let resp = http.get(&url).send().await?;
    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(format!("Archive API error: status={} body={}", status, body).into());
    }
    let data: ArchiveResponse = resp.json().await?;

    let mut rows = Vec::with_capacity(data.daily.time.len());
    let mut skipped = 0usize;
    for (i, day) in data.daily.time.iter().enumerate() {
        let date = match NaiveDate::parse_from_str(day, "%Y-%m-%d") {
            Ok(d) => d,
            Err(e) => {
                warn!(target: "fetch_weather", day = %day, error = %e, "Unparsable date in series");
                skipped += 1;
                continue;
            }
        };
        // Days with any missing measurement are skipped rather than stored as zeros
        let (temp_max, temp_min, precipitation) = match (
            data.daily.temperature_2m_max.get(i).copied().flatten(),
            data.daily.temperature_2m_min.get(i).copied().flatten(),
            data.daily.precipitation_sum.get(i).copied().flatten(),
        ) {
            (Some(max), Some(min), Some(precip)) => (max, min, precip),
            _ => {
                skipped += 1;
                continue;
            }
        };
        rows.push(NewWeather {
            date,
            temp_max,
            temp_min,
            precipitation,
            location_id: Some(location.id),
        });
    }

    let total = rows.len();
    let inserted = store.insert_weather_batch(rows).await?;
    info!(
        target: "fetch_weather",
        inserted,
        already_present = total - inserted,
        skipped,
        "Import complete"
    );
    Ok(())
}
