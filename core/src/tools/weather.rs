// Weather data tools
//
// These are the data-access capabilities exposed to the language model.
// They go through the same `Store` calls as the REST handlers, so a tool
// answer and an API answer always agree.

use crate::store::Store;
use crate::tools::{Tool, ToolError, ToolResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

const DEFAULT_LIST_LIMIT: u32 = 100;

/// `get_weather_data`: paginated listing of daily weather records
pub struct WeatherListTool {
    store: Arc<Store>,
}

impl WeatherListTool {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for WeatherListTool {
    fn name(&self) -> String {
        "get_weather_data".to_string()
    }

    fn description(&self) -> String {
        "Get recorded daily weather data (max/min temperature and precipitation), \
         optionally paginated"
            .to_string()
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "offset": {
                    "type": "integer",
                    "description": "Number of records to skip",
                    "default": 0
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of records to return",
                    "default": DEFAULT_LIST_LIMIT
                }
            },
            "required": []
        })
    }

    async fn call(&self, arguments: Value) -> ToolResult<Value> {
        let offset = optional_u32(&arguments, "offset")?.unwrap_or(0);
        let limit = optional_u32(&arguments, "limit")?.unwrap_or(DEFAULT_LIST_LIMIT);

        debug!(target: "weather_tools", offset, limit, "Listing weather data");

        let records = self
            .store
            .list_weather(offset, limit)
            .await
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;

        serde_json::to_value(records).map_err(|e| ToolError::ExecutionFailed(e.to_string()))
    }
}

/// `get_weather_data_by_date`: single-day lookup
pub struct WeatherByDateTool {
    store: Arc<Store>,
}

impl WeatherByDateTool {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for WeatherByDateTool {
    fn name(&self) -> String {
        "get_weather_data_by_date".to_string()
    }

    fn description(&self) -> String {
        "Get the recorded weather (max/min temperature and precipitation) for a \
         specific date"
            .to_string()
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "date": {
                    "type": "string",
                    "description": "The date to look up, formatted YYYY-MM-DD"
                }
            },
            "required": ["date"]
        })
    }

    async fn call(&self, arguments: Value) -> ToolResult<Value> {
        let date_text = arguments["date"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'date'".to_string()))?;
        let date = NaiveDate::parse_from_str(date_text, "%Y-%m-%d").map_err(|e| {
            ToolError::InvalidArguments(format!("Bad date '{}': {}", date_text, e))
        })?;

        debug!(target: "weather_tools", date = %date, "Fetching weather by date");

        let record = self
            .store
            .get_weather_by_date(date)
            .await
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?
            .ok_or_else(|| {
                ToolError::ExecutionFailed(format!("No weather data recorded for {}", date))
            })?;

        serde_json::to_value(record).map_err(|e| ToolError::ExecutionFailed(e.to_string()))
    }
}

fn optional_u32(arguments: &Value, key: &str) -> ToolResult<Option<u32>> {
    match arguments.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| {
                ToolError::InvalidArguments(format!("'{}' must be a non-negative integer", key))
            }),
    }
}
