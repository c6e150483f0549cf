//! Weather lookup tool backed by OpenWeatherMap.
//!
//! Two sequential calls: current conditions, then the next forecast slot.
//! The tool degrades instead of failing, so the model always gets a line of
//! text it can relay to the farmer:
//!
//! 1. both calls succeed: current plus next forecast
//! 2. forecast fails: current plus "Forecast not available."
//! 3. current fails: "Could not retrieve weather for {location}."
//!
//! Each request is bounded by its own timeout, and a request that runs out
//! of time fails into the same tier as any other error.
//!
//! Without an API key the tool answers with a fixed unavailable message.

use async_trait::async_trait;
use mkulima_config::ToolsConfig;
use mkulima_core::error::ToolError;
use mkulima_core::tool::{Tool, ToolResult};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const TOOL_NAME: &str = "get_weather";

pub const UNAVAILABLE: &str = "Weather service is temporarily unavailable.";

/// Tool output never exceeds one SMS segment.
pub const MAX_OUTPUT_CHARS: usize = 160;

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// One observation or forecast slot, in metric units.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReading {
    pub city: String,
    pub temp_c: f64,
    pub condition: String,
}

/// The weather backend the tool talks to.
#[async_trait]
pub trait WeatherApi: Send + Sync {
    async fn current(&self, location: &str) -> Result<WeatherReading, ToolError>;

    /// The first forecast slot after now.
    async fn forecast(&self, location: &str) -> Result<WeatherReading, ToolError>;
}

/// OpenWeatherMap `/weather` and `/forecast` over HTTPS.
pub struct OpenWeatherMap {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenWeatherMap {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    async fn get_json(
        &self,
        path: &str,
        location: &str,
        extra: &[(&str, &str)],
    ) -> Result<serde_json::Value, ToolError> {
        let url = format!("{}/{path}", self.base_url);
        let mut query: Vec<(&str, &str)> = vec![
            ("q", location),
            ("appid", self.api_key.as_str()),
            ("units", "metric"),
        ];
        query.extend_from_slice(extra);

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("{path} returned {status}")));
        }

        response.json().await.map_err(|e| failed(e.to_string()))
    }
}

fn failed(reason: String) -> ToolError {
    ToolError::ExecutionFailed {
        tool_name: TOOL_NAME.into(),
        reason,
    }
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct OwmCondition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwmSlot {
    main: OwmMain,
    weather: Vec<OwmCondition>,
}

#[derive(Debug, Deserialize)]
struct OwmCurrent {
    name: String,
    #[serde(flatten)]
    slot: OwmSlot,
}

#[derive(Debug, Deserialize)]
struct OwmForecast {
    city: OwmCity,
    list: Vec<OwmSlot>,
}

#[derive(Debug, Deserialize)]
struct OwmCity {
    name: String,
}

fn reading(city: String, slot: OwmSlot) -> Result<WeatherReading, ToolError> {
    let condition = slot
        .weather
        .into_iter()
        .next()
        .map(|w| w.description)
        .ok_or_else(|| failed("response has no weather condition".into()))?;
    Ok(WeatherReading {
        city,
        temp_c: slot.main.temp,
        condition,
    })
}

#[async_trait]
impl WeatherApi for OpenWeatherMap {
    async fn current(&self, location: &str) -> Result<WeatherReading, ToolError> {
        let raw = self.get_json("weather", location, &[]).await?;
        let parsed: OwmCurrent =
            serde_json::from_value(raw).map_err(|e| failed(format!("bad shape: {e}")))?;
        reading(parsed.name, parsed.slot)
    }

    async fn forecast(&self, location: &str) -> Result<WeatherReading, ToolError> {
        let raw = self.get_json("forecast", location, &[("cnt", "1")]).await?;
        let parsed: OwmForecast =
            serde_json::from_value(raw).map_err(|e| failed(format!("bad shape: {e}")))?;
        let slot = parsed
            .list
            .into_iter()
            .next()
            .ok_or_else(|| failed("forecast list is empty".into()))?;
        reading(parsed.city.name, slot)
    }
}

/// The `get_weather` tool.
pub struct WeatherLookupTool {
    api: Option<Arc<dyn WeatherApi>>,
    call_timeout: Duration,
}

impl WeatherLookupTool {
    pub fn new(api: Arc<dyn WeatherApi>) -> Self {
        Self {
            api: Some(api),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Bound each of the two weather requests separately.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// A tool with no backend; every call reports the service unavailable.
    pub fn unavailable() -> Self {
        Self {
            api: None,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// OpenWeatherMap when a key is configured, otherwise `unavailable()`.
    pub fn from_config(config: &ToolsConfig) -> Self {
        match config.weather_api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            Some(key) => Self::new(Arc::new(OpenWeatherMap::new(
                config.weather_api_url.clone(),
                key,
                config.call_timeout(),
            )))
            .with_call_timeout(config.call_timeout()),
            None => Self::unavailable(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.api.is_some()
    }

    async fn bounded<F>(&self, request: F) -> Result<WeatherReading, ToolError>
    where
        F: Future<Output = Result<WeatherReading, ToolError>>,
    {
        tokio::time::timeout(self.call_timeout, request)
            .await
            .unwrap_or_else(|_| {
                Err(ToolError::Timeout {
                    tool_name: TOOL_NAME.into(),
                    timeout_ms: self.call_timeout.as_millis() as u64,
                })
            })
    }

    async fn describe(&self, api: &dyn WeatherApi, location: &str) -> (bool, String) {
        let current = match self.bounded(api.current(location)).await {
            Ok(c) => c,
            Err(e) => {
                warn!(location, error = %e, "Current weather lookup failed");
                return (false, format!("Could not retrieve weather for {location}."));
            }
        };

        let head = format!(
            "Weather in {}: {}°C, {}.",
            current.city,
            round_temp(current.temp_c),
            current.condition
        );

        match self.bounded(api.forecast(location)).await {
            Ok(next) => (
                true,
                format!(
                    "{head} Next: {}°C, {}.",
                    round_temp(next.temp_c),
                    next.condition
                ),
            ),
            Err(e) => {
                debug!(location, error = %e, "Forecast lookup failed");
                (true, format!("{head} Forecast not available."))
            }
        }
    }
}

fn round_temp(t: f64) -> f64 {
    // -0.04 rounds to -0.0, which would print as "-0"
    (t * 10.0).round() / 10.0 + 0.0
}

fn clip(text: String) -> String {
    if text.chars().count() <= MAX_OUTPUT_CHARS {
        text
    } else {
        text.chars().take(MAX_OUTPUT_CHARS).collect()
    }
}

#[async_trait]
impl Tool for WeatherLookupTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Get the current weather and the next forecast for a town or region. Use it for planting, spraying, irrigation or harvest timing questions."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "Town or region name, e.g. Eldoret or Nakuru"
                }
            },
            "required": ["location"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let location = arguments["location"].as_str().map(str::trim).unwrap_or("");

        let (success, output) = match (&self.api, location) {
            (None, _) => (false, UNAVAILABLE.to_string()),
            (Some(_), "") => (false, "Could not retrieve weather for an unknown location.".into()),
            (Some(api), location) => self.describe(api.as_ref(), location).await,
        };

        let output = clip(output);
        Ok(if success {
            ToolResult::ok(output)
        } else {
            ToolResult::degraded(output)
        })
    }
}
