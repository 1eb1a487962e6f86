//! Gateway settings: bind address, service name, and the placeholder classifier output.
//!
//! Precedence: env `NEURO__*` > file (`NEURO_CONFIG` path, else `config/gateway.toml`) >
//! defaults. Agent settings (keys, models, validation) live in [`neuro_core::AgentConfig`].

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub app_name: String,
    pub host: String,
    pub port: u16,
    /// `[stroke, degenerative, normal]` returned by the placeholder classifier.
    pub classifier_probabilities: [f64; 3],
    /// Optional TOML file for the agent config; environment is used when unset.
    #[serde(default)]
    pub agent_config_path: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            app_name: "Neuro Screening Gateway".to_string(),
            host: "127.0.0.1".to_string(),
            port: 8010,
            classifier_probabilities: [0.1, 0.1, 0.8],
            agent_config_path: None,
        }
    }
}

impl GatewayConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("NEURO_CONFIG").unwrap_or_else(|_| "config/gateway.toml".to_string());
        Self::load_from(Path::new(&config_path))
    }

    pub fn load_from(path: &Path) -> Result<Self, config::ConfigError> {
        let defaults = Self::default();
        let builder = config::Config::builder()
            .set_default("app_name", defaults.app_name)?
            .set_default("host", defaults.host)?
            .set_default("port", i64::from(defaults.port))?
            .set_default(
                "classifier_probabilities",
                defaults.classifier_probabilities.to_vec(),
            )?;

        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder
        };

        builder
            .add_source(config::Environment::with_prefix("NEURO").separator("__"))
            .build()?
            .try_deserialize()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_file_missing() {
        let cfg = GatewayConfig::load_from(Path::new("/nonexistent/neuro/gateway.toml")).unwrap();
        assert_eq!(cfg.port, 8010);
        assert_eq!(cfg.classifier_probabilities, [0.1, 0.1, 0.8]);
        assert!(cfg.agent_config_path.is_none());
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.toml");
        std::fs::write(
            &path,
            "app_name = \"Test Gateway\"\nport = 9100\nclassifier_probabilities = [0.6, 0.3, 0.1]\n",
        )
        .unwrap();
        let cfg = GatewayConfig::load_from(&path).unwrap();
        assert_eq!(cfg.app_name, "Test Gateway");
        assert_eq!(cfg.port, 9100);
        assert_eq!(cfg.classifier_probabilities, [0.6, 0.3, 0.1]);
        assert_eq!(cfg.host, "127.0.0.1");
    }
}
