//! Tools the advisory agent may call mid-conversation.
//!
//! The registry built here is the fixed capability list: the workflow only
//! dispatches tool calls whose name is registered.

pub mod weather_lookup;

use mkulima_config::ToolsConfig;
use mkulima_core::tool::ToolRegistry;

pub use weather_lookup::{OpenWeatherMap, WeatherApi, WeatherLookupTool, WeatherReading};

/// The registry used by the gateway and the CLI.
pub fn default_registry(config: &ToolsConfig) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(WeatherLookupTool::from_config(config)));
    registry
}
