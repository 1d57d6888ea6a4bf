use crate::error::{config_error, env_error, AppResult};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::str::FromStr;

/// Default calendar provider serving the public iCal feeds
pub const DEFAULT_CALENDAR_BASE_URL: &str = "https://www.google.com";

/// Default Redis instance
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Component toggles file
pub const COMPONENTS_FILE: &str = "config/components.toml";

/// Main configuration structure for the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Public calendar to pull events from
    pub calendar_id: Option<String>,
    /// Scheme and host of the calendar provider
    pub calendar_base_url: String,
    /// Seconds between scheduled calendar syncs
    pub calendar_sync_interval: u64,
    /// Redis connection URL
    pub redis_url: String,
    /// Address the HTTP server binds to
    pub bind_addr: String,
    /// Port the HTTP server listens on
    pub port: u16,
    /// Inactivity delay before an application is autosaved
    pub autosave_delay_ms: u64,
    /// TOML file describing the application form
    pub application_form_path: String,
    /// Map of component names to their enabled status
    pub components: HashMap<String, bool>,
}

impl Default for Config {
    fn default() -> Self {
        let mut components = HashMap::new();
        components.insert("calendar_sync".to_string(), true);

        Self {
            calendar_id: None,
            calendar_base_url: DEFAULT_CALENDAR_BASE_URL.to_string(),
            calendar_sync_interval: 900,
            redis_url: DEFAULT_REDIS_URL.to_string(),
            bind_addr: "127.0.0.1".to_string(),
            port: 3000,
            autosave_delay_ms: 5000,
            application_form_path: "config/application.toml".to_string(),
            components,
        }
    }
}

impl Config {
    /// Load configuration from environment and config file
    pub fn load() -> AppResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let defaults = Config::default();

        let calendar_id = env::var("CALENDAR_ID").ok().filter(|id| !id.is_empty());
        let calendar_base_url =
            env::var("CALENDAR_BASE_URL").unwrap_or(defaults.calendar_base_url);
        let redis_url = env::var("REDIS_URL").unwrap_or(defaults.redis_url);
        let bind_addr = env::var("BIND_ADDR").unwrap_or(defaults.bind_addr);
        let application_form_path =
            env::var("APPLICATION_FORM_PATH").unwrap_or(defaults.application_form_path);

        let calendar_sync_interval =
            parse_var("CALENDAR_SYNC_INTERVAL", defaults.calendar_sync_interval)?;
        let port = parse_var("PORT", defaults.port)?;
        let autosave_delay_ms = parse_var("AUTOSAVE_DELAY_MS", defaults.autosave_delay_ms)?;

        if calendar_sync_interval == 0 {
            return Err(config_error("CALENDAR_SYNC_INTERVAL must be greater than zero"));
        }

        let mut components = defaults.components;

        // Load components configuration from file if it exists
        if let Ok(content) = fs::read_to_string(COMPONENTS_FILE) {
            let file_components = toml::from_str::<HashMap<String, bool>>(&content)?;
            // Merge with defaults
            components.extend(file_components);
        }

        Ok(Config {
            calendar_id,
            calendar_base_url,
            calendar_sync_interval,
            redis_url,
            bind_addr,
            port,
            autosave_delay_ms,
            application_form_path,
            components,
        })
    }

    /// Check if a component is enabled
    pub fn is_component_enabled(&self, name: &str) -> bool {
        *self.components.get(name).unwrap_or(&false)
    }
}

/// Read an optional environment variable, falling back to a default
fn parse_var<T: FromStr>(name: &str, default: T) -> AppResult<T> {
    match env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| env_error(&format!("Invalid {} format", name))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_calendar_sync() {
        let config = Config::default();
        assert!(config.is_component_enabled("calendar_sync"));
        assert!(!config.is_component_enabled("unknown"));
        assert_eq!(config.calendar_base_url, DEFAULT_CALENDAR_BASE_URL);
        assert_eq!(config.autosave_delay_ms, 5000);
    }

    #[test]
    fn parse_var_falls_back_to_default() {
        let value: u64 = parse_var("HACKBOARD_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }
}
