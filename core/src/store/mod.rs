// Relational store for locations and daily weather records
//
// Backed by a SQLite file. Every operation acquires its own connection
// inside `spawn_blocking` and releases it on every exit path, so the store
// is freely shareable across request handlers via `Arc`.

pub mod migrations;
pub mod models;

pub use models::{Location, NewLocation, NewWeather, WeatherRecord};

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;
use tracing::{debug, info};

use crate::geom::Point;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("date parse error: {0}")]
    Chrono(#[from] chrono::ParseError),

    #[error("storage task join error: {0}")]
    Task(String),

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("conflict: {0}")]
    Conflict(String),
}

#[derive(Debug, Clone)]
pub struct Store {
    db_path: PathBuf,
}

impl Store {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    /// Apply pending schema migrations, returning how many steps ran
    pub async fn migrate(&self) -> StoreResult<usize> {
        let applied = self
            .with_connection(|conn| Ok(migrations::apply(conn)?))
            .await?;
        info!(
            target: "store",
            applied,
            version = migrations::latest_version(),
            "Schema migrations up to date"
        );
        Ok(applied)
    }

    /// List weather records ordered by date, location joined in
    pub async fn list_weather(&self, offset: u32, limit: u32) -> StoreResult<Vec<WeatherRecord>> {
        debug!(target: "store", offset, limit, "Listing weather records");
        self.with_connection(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT w.id, w.date, w.temp_max, w.temp_min, w.precipitation, w.location_id,
                        l.id, l.name, l.geom
                 FROM weather w
                 LEFT JOIN location l ON l.id = w.location_id
                 ORDER BY w.date
                 LIMIT ?1 OFFSET ?2",
            )?;
            let rows = stmt.query_map(params![limit, offset], weather_from_row)?;
            let mut records = Vec::new();
            for row in rows {
                records.push(row?);
            }
            Ok(records)
        })
        .await
    }

    /// Fetch the weather record for one date, if any
    pub async fn get_weather_by_date(&self, date: NaiveDate) -> StoreResult<Option<WeatherRecord>> {
        debug!(target: "store", date = %date, "Fetching weather by date");
        self.with_connection(move |conn| {
            let record = conn
                .query_row(
                    "SELECT w.id, w.date, w.temp_max, w.temp_min, w.precipitation, w.location_id,
                            l.id, l.name, l.geom
                     FROM weather w
                     LEFT JOIN location l ON l.id = w.location_id
                     WHERE w.date = ?1",
                    params![date.to_string()],
                    weather_from_row,
                )
                .optional()?;
            Ok(record)
        })
        .await
    }

    /// Insert one weather record; the date must be unused
    pub async fn insert_weather(&self, new: NewWeather) -> StoreResult<WeatherRecord> {
        self.with_connection(move |conn| {
            conn.execute(
                "INSERT INTO weather (date, temp_max, temp_min, precipitation, location_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    new.date.to_string(),
                    new.temp_max,
                    new.temp_min,
                    new.precipitation,
                    new.location_id
                ],
            )
            .map_err(|e| map_constraint(e, format!("weather record for {} already exists", new.date)))?;

            let id = conn.last_insert_rowid();
            conn.query_row(
                "SELECT w.id, w.date, w.temp_max, w.temp_min, w.precipitation, w.location_id,
                        l.id, l.name, l.geom
                 FROM weather w
                 LEFT JOIN location l ON l.id = w.location_id
                 WHERE w.id = ?1",
                params![id],
                weather_from_row,
            )
            .map_err(StoreError::from)
        })
        .await
    }

    /// Bulk-insert weather rows in one transaction, skipping dates that are
    /// already present. Returns the number of rows actually inserted.
    pub async fn insert_weather_batch(&self, rows: Vec<NewWeather>) -> StoreResult<usize> {
        self.with_connection(move |conn| {
            let tx = conn.unchecked_transaction()?;
            let mut inserted = 0;
            {
                let mut stmt = tx.prepare(
                    "INSERT OR IGNORE INTO weather (date, temp_max, temp_min, precipitation, location_id)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                for row in &rows {
                    inserted += stmt.execute(params![
                        row.date.to_string(),
                        row.temp_max,
                        row.temp_min,
                        row.precipitation,
                        row.location_id
                    ])?;
                }
            }
            tx.commit()?;
            Ok(inserted)
        })
        .await
    }

    pub async fn list_locations(&self, offset: u32, limit: u32) -> StoreResult<Vec<Location>> {
        debug!(target: "store", offset, limit, "Listing locations");
        self.with_connection(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, geom FROM location ORDER BY id LIMIT ?1 OFFSET ?2",
            )?;
            let rows = stmt.query_map(params![limit, offset], location_from_row)?;
            let mut locations = Vec::new();
            for row in rows {
                locations.push(row?);
            }
            Ok(locations)
        })
        .await
    }

    pub async fn get_location(&self, id: i64) -> StoreResult<Option<Location>> {
        self.with_connection(move |conn| {
            let location = conn
                .query_row(
                    "SELECT id, name, geom FROM location WHERE id = ?1",
                    params![id],
                    location_from_row,
                )
                .optional()?;
            Ok(location)
        })
        .await
    }

    /// Fetch a location by its unique name
    pub async fn get_location_by_name(&self, name: String) -> StoreResult<Option<Location>> {
        self.with_connection(move |conn| {
            let location = conn
                .query_row(
                    "SELECT id, name, geom FROM location WHERE name = ?1",
                    params![name],
                    location_from_row,
                )
                .optional()?;
            Ok(location)
        })
        .await
    }

    /// Insert a location; geometry is validated as a WKT point first and
    /// stored in canonical form
    pub async fn insert_location(&self, new: NewLocation) -> StoreResult<Location> {
        let point = Point::from_wkt(&new.geom)
            .map_err(|e| StoreError::InvalidGeometry(e.to_string()))?;

        self.with_connection(move |conn| {
            conn.execute(
                "INSERT INTO location (name, geom) VALUES (?1, ?2)",
                params![new.name, point.to_wkt()],
            )
            .map_err(|e| map_constraint(e, format!("location '{}' already exists", new.name)))?;

            let id = conn.last_insert_rowid();
            conn.query_row(
                "SELECT id, name, geom FROM location WHERE id = ?1",
                params![id],
                location_from_row,
            )
            .map_err(StoreError::from)
        })
        .await
    }

    async fn with_connection<T, F>(&self, func: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
    {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let connection = open_connection(&db_path)?;
            func(&connection)
        })
        .await
        .map_err(|error| StoreError::Task(error.to_string()))?
    }
}

fn open_connection(db_path: &Path) -> StoreResult<Connection> {
    let connection = Connection::open(db_path)?;
    connection.pragma_update(None, "foreign_keys", "ON")?;
    connection.busy_timeout(std::time::Duration::from_secs(5))?;
    Ok(connection)
}

fn map_constraint(error: rusqlite::Error, message: String) -> StoreError {
    match &error {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StoreError::Conflict(message)
        }
        _ => StoreError::Sqlite(error),
    }
}

fn weather_from_row(row: &Row<'_>) -> rusqlite::Result<WeatherRecord> {
    let date_text: String = row.get(1)?;
    let date = NaiveDate::parse_from_str(&date_text, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let location = match row.get::<_, Option<i64>>(6)? {
        Some(id) => Some(Location {
            id,
            name: row.get(7)?,
            geom_wkt: row.get(8)?,
        }),
        None => None,
    };
    Ok(WeatherRecord {
        id: row.get(0)?,
        date,
        temp_max: row.get(2)?,
        temp_min: row.get(3)?,
        precipitation: row.get(4)?,
        location_id: row.get(5)?,
        location,
    })
}

fn location_from_row(row: &Row<'_>) -> rusqlite::Result<Location> {
    Ok(Location {
        id: row.get(0)?,
        name: row.get(1)?,
        geom_wkt: row.get(2)?,
    })
}
