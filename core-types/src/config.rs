use config::{Config, ConfigError};
use serde::{Deserialize, Serialize};

/// Workspace configuration: pricing defaults and the schedule store location.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Currency applied when a schedule is created without one.
    #[serde(default = "default_currency")]
    pub default_currency: String,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            default_currency: default_currency(),
        }
    }
}

fn default_currency() -> String {
    "ZMW".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> String {
    "tankpulse.db".to_string()
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(config::File::with_name("config.toml").required(false))
            .add_source(config::Environment::with_prefix("TANKPULSE").separator("__"))
            .build()?;
        settings.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_empty_config() {
        let config = AppConfig::default();
        assert_eq!(config.pricing.default_currency, "ZMW");
        assert_eq!(config.store.path, "tankpulse.db");
    }

    #[test]
    fn partial_document_keeps_field_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"pricing":{}}"#)
            .expect("deserialize partial config");
        assert_eq!(config.pricing.default_currency, "ZMW");
        assert_eq!(config.store.path, "tankpulse.db");
    }
}
