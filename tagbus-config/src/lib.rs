//! # tagbus Configuration System
//!
//! Layered configuration for tagbus clients.
//!
//! ## Features
//! - **Unified Configuration**: one structure for connection, registry and telemetry
//! - **Validation**: endpoints, sizes and log levels are checked after loading
//! - **Environment Awareness**: per-environment YAML overrides and `TAGBUS_*` variables

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod connection;
mod error;
mod registry;
mod telemetry;
mod validation;

pub use connection::ConnectionConfig;
pub use error::ConfigError;
pub use registry::{DuplicatePolicy, RegistryConfig};
pub use telemetry::TelemetryConfig;

/// Top‑level configuration container for a tagbus client.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone)]
pub struct TagbusConfig {
    /// Peer endpoint and transport limits.
    #[serde(default)]
    #[validate(nested)]
    pub connection: ConnectionConfig,

    /// Handler registration policy.
    #[serde(default)]
    #[validate(nested)]
    pub registry: RegistryConfig,

    /// Logging and metrics.
    #[serde(default)]
    #[validate(nested)]
    pub telemetry: TelemetryConfig,
}

impl TagbusConfig {
    /// Load configuration from default files and environment.
    ///
    /// Hierarchy:
    /// 1. Default Values
    /// 2. `config/tagbus.yaml` - Base settings. If missing, defaults are used.
    /// 3. `config/<TAGBUS_ENV>.yaml` - Environment‑specific overrides.
    /// 4. `TAGBUS_*` environment variables, nested keys split on `__`.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(TagbusConfig::default()));

        if Path::new("config/tagbus.yaml").exists() {
            figment = figment.merge(Yaml::file("config/tagbus.yaml"));
        }

        if let Ok(env) = std::env::var("TAGBUS_ENV") {
            let env_file = format!("config/{}.yaml", env);
            if Path::new(&env_file).exists() {
                figment = figment.merge(Yaml::file(env_file));
            }
        }

        Self::extract(figment.merge(Env::prefixed("TAGBUS_").split("__")))
    }

    /// Load configuration from a specific path, still honouring `TAGBUS_*`.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        Self::extract(
            Figment::from(Serialized::defaults(TagbusConfig::default()))
                .merge(Yaml::file(path))
                .merge(Env::prefixed("TAGBUS_").split("__")),
        )
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn full_config_validation() {
        let config = TagbusConfig::default();
        config.validate().expect("Default config should validate");
        assert_eq!(config.connection.endpoint, "127.0.0.1:47758");
        assert_eq!(config.registry.duplicate_policy, DuplicatePolicy::Replace);
    }

    #[test]
    fn environment_override() {
        Jail::expect_with(|jail| {
            jail.set_env("TAGBUS_CONNECTION__MAX_FRAME_SIZE", "8192");
            jail.set_env("TAGBUS_REGISTRY__DUPLICATE_POLICY", "reject");
            let config = TagbusConfig::load().expect("load");
            assert_eq!(config.connection.max_frame_size, 8192);
            assert_eq!(config.registry.duplicate_policy, DuplicatePolicy::Reject);
            Ok(())
        });
    }

    #[test]
    fn yaml_file_and_environment_layers() {
        Jail::expect_with(|jail| {
            jail.create_dir("config")?;
            jail.create_file(
                "config/tagbus.yaml",
                "connection:\n  endpoint: \"10.0.0.5:47758\"\ntelemetry:\n  log_level: debug\n",
            )?;
            jail.create_file("config/staging.yaml", "connection:\n  connect_timeout_ms: 250\n")?;
            jail.set_env("TAGBUS_ENV", "staging");
            let config = TagbusConfig::load().expect("load");
            assert_eq!(config.connection.endpoint, "10.0.0.5:47758");
            assert_eq!(config.connection.connect_timeout_ms, 250);
            assert_eq!(config.telemetry.log_level, "debug");
            Ok(())
        });
    }

    #[test]
    fn invalid_values_are_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("bad.yaml", "connection:\n  endpoint: \"no-port\"\n")?;
            let result = TagbusConfig::load_from_path("bad.yaml");
            assert!(matches!(result, Err(ConfigError::Validation { .. })));
            Ok(())
        });
    }

    #[test]
    fn validation_names_nested_keys() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "bad.yaml",
                "connection:\n  endpoint: \"no-port\"\n  max_frame_size: 8\ntelemetry:\n  log_level: loud\n",
            )?;
            let err = TagbusConfig::load_from_path("bad.yaml").unwrap_err();
            assert_eq!(
                err.invalid_keys(),
                vec![
                    "connection.endpoint",
                    "connection.max_frame_size",
                    "telemetry.log_level"
                ]
            );
            let message = err.to_string();
            assert!(message.contains("connection.endpoint: invalid_endpoint"));
            assert!(!message.contains('\n'));
            Ok(())
        });
    }

    #[test]
    fn parse_failure_names_the_key() {
        Jail::expect_with(|jail| {
            jail.create_file("bad.yaml", "connection:\n  connect_timeout_ms: soon\n")?;
            match TagbusConfig::load_from_path("bad.yaml") {
                Err(ConfigError::Parsing { key, .. }) => {
                    assert_eq!(key.as_deref(), Some("connection.connect_timeout_ms"));
                }
                other => panic!("expected a parsing error, got {other:?}"),
            }
            Ok(())
        });
    }

    #[test]
    fn missing_file_is_reported() {
        assert!(matches!(
            TagbusConfig::load_from_path("does/not/exist.yaml"),
            Err(ConfigError::FileNotFound(_))
        ));
    }
}
