use crate::error::Result;
use serde::Deserialize;

/// Runtime configuration, read from the environment (and `.env`) over defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// PostgreSQL connection string. Without it the library lives in memory.
    #[serde(default)]
    pub database_url: Option<String>,
    pub database_max_connections: u32,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_source(config::Environment::default().try_parsing(true))
    }

    fn from_source<S>(source: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config = config::Config::builder()
            .set_default("host", "127.0.0.1")?
            .set_default("port", 8080)?
            .set_default("database_max_connections", 5)?
            .add_source(source)
            .build()?
            .try_deserialize::<Config>()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_source(vars: &[(&str, &str)]) -> config::Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        config::Environment::default()
            .try_parsing(true)
            .source(Some(map))
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_source(env_source(&[])).unwrap();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert!(config.database_url.is_none());
        assert_eq!(config.database_max_connections, 5);
    }

    #[test]
    fn test_environment_overrides() {
        let config = Config::from_source(env_source(&[
            ("PORT", "3000"),
            ("DATABASE_URL", "postgres://localhost/commonplace"),
            ("DATABASE_MAX_CONNECTIONS", "12"),
        ]))
        .unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/commonplace")
        );
        assert_eq!(config.database_max_connections, 12);
    }
}
