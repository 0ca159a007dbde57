use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A named place with an optional WKT point geometry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub id: i64,
    pub name: String,
    pub geom_wkt: Option<String>,
}

/// One day of recorded weather, with the owning location joined in on reads
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeatherRecord {
    pub id: i64,
    pub date: NaiveDate,
    pub temp_max: f64,
    pub temp_min: f64,
    pub precipitation: f64,
    pub location_id: Option<i64>,
    pub location: Option<Location>,
}

/// Input for creating a location; `geom` is a WKT `POINT(lon lat)` string
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLocation {
    pub name: String,
    pub geom: String,
}

/// Input for creating a daily weather record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWeather {
    pub date: NaiveDate,
    pub temp_max: f64,
    pub temp_min: f64,
    pub precipitation: f64,
    pub location_id: Option<i64>,
}
