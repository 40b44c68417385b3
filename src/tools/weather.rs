//! Current-weather lookup tool

use async_trait::async_trait;
use serde_json::Value;

use crate::core::{Result, RoundtableError};
use crate::tools::http::RemoteClient;
use crate::tools::traits::Tool;

/// Looks up current conditions for a city
pub struct WeatherTool {
    name: String,
    remote: RemoteClient,
    api_key: Option<String>,
}

impl WeatherTool {
    /// Create a weather tool for a resolved WeatherAPI `current.json` endpoint
    pub fn new(remote: RemoteClient, api_key: Option<String>) -> Self {
        Self {
            name: "get_weather".to_string(),
            remote,
            api_key,
        }
    }

    /// Override the registered name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn format_report(city: &str, data: &Value) -> Result<String> {
        let condition = data["current"]["condition"]["text"]
            .as_str()
            .ok_or_else(|| RoundtableError::other("weather response missing condition text"))?;
        let temperature = data["current"]["temp_c"]
            .as_f64()
            .ok_or_else(|| RoundtableError::other("weather response missing temp_c"))?;

        Ok(format!(
            "Weather in {}: {}, Temperature: {}°C",
            city, condition, temperature
        ))
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Get the current weather for a city"
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "city": {
                    "type": "string",
                    "description": "City name, e.g. Taipei"
                }
            },
            "required": ["city"]
        })
    }

    async fn invoke(&self, arguments: Value) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| RoundtableError::config("WEATHER_API_KEY is not set"))?;
        let city = arguments["city"]
            .as_str()
            .ok_or_else(|| RoundtableError::other("missing 'city' argument"))?;

        let text = self.remote.get(&[("key", api_key), ("q", city)]).await?;
        let data: Value = serde_json::from_str(&text)?;

        Self::format_report(city, &data)
    }
}
