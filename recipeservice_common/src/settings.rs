use anyhow::Context;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::auth::{JwtKeys, DEVELOPMENT_JWT_SECRET};
use crate::connection::PostgresConfig;

pub const ENV_PREFIX: &str = "RECIPESERVICE";

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub use_in_memory: bool,
    pub hostname: String,
    pub username: String,
    pub password: String,
}

impl DatabaseSettings {
    pub fn postgres_config(&self) -> PostgresConfig {
        PostgresConfig {
            hostname: self.hostname.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    pub jwt_secret: Option<String>,
    pub token_ttl_hours: i64,
}

impl AuthSettings {
    pub fn jwt_keys(&self) -> anyhow::Result<JwtKeys> {
        let secret = match &self.jwt_secret {
            Some(secret) if !secret.is_empty() => secret.as_str(),
            _ => {
                tracing::warn!("No jwt secret configured, falling back to the development secret");
                DEVELOPMENT_JWT_SECRET
            }
        };
        JwtKeys::new(secret, chrono::Duration::hours(self.token_ttl_hours))
    }
}

/// Layers defaults, optional `config/<service_name>.toml` and `RECIPESERVICE_*` variables.
/// Nested keys use `__` in variable names, e.g. `RECIPESERVICE_DATABASE__HOSTNAME`.
/// `JWT_SECRET` is honoured as well.
pub fn settings_builder(service_name: &str) -> anyhow::Result<ConfigBuilder<DefaultState>> {
    Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8080)?
        .set_default("database.use_in_memory", false)?
        .set_default("database.hostname", "127.0.0.1")?
        .set_default("database.username", "postgres")?
        .set_default("database.password", "postgres")?
        .set_default("auth.token_ttl_hours", 24 * 7)?
        .add_source(File::with_name(&format!("config/{}", service_name)).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .set_override_option("auth.jwt_secret", std::env::var("JWT_SECRET").ok())
        .context("Failed to apply JWT_SECRET")
}

pub fn load_settings<T: DeserializeOwned>(
    builder: ConfigBuilder<DefaultState>,
) -> anyhow::Result<T> {
    builder
        .build()
        .context("Failed to read configuration")?
        .try_deserialize()
        .context("Invalid configuration")
}

#[cfg(test)]
mod settings_tests {
    use super::*;

    #[derive(Deserialize)]
    struct TestSettings {
        server: ServerSettings,
        database: DatabaseSettings,
        auth: AuthSettings,
    }

    #[test]
    fn defaults_are_complete() {
        let settings: TestSettings =
            load_settings(settings_builder("does_not_exist").unwrap()).unwrap();

        assert_eq!(settings.server.port, 8080);
        assert!(!settings.database.use_in_memory);
        assert_eq!(settings.database.hostname, "127.0.0.1");
        assert_eq!(settings.auth.token_ttl_hours, 168);
        assert!(settings.auth.jwt_keys().is_ok());
    }

    #[test]
    fn overrides_take_precedence_over_defaults() {
        let builder = settings_builder("does_not_exist")
            .unwrap()
            .set_override("database.use_in_memory", true)
            .unwrap();
        let settings: TestSettings = load_settings(builder).unwrap();

        assert!(settings.database.use_in_memory);
    }
}
