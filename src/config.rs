use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use regex::Regex;

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid")
});

/// Settings for the storage layer, handed to the stores at construction
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub event_table: String,
    pub unique_email_table: String,
    /// Deadline applied to every storage operation
    pub operation_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            event_table: "eventstore".to_string(),
            unique_email_table: "unique_email_addresses".to_string(),
            operation_timeout: Duration::from_secs(5),
        }
    }
}

impl StoreConfig {
    /// Table names end up in SQL text, so they must be plain identifiers
    pub fn validate(&self) -> Result<()> {
        for table in [&self.event_table, &self.unique_email_table] {
            if !IDENTIFIER.is_match(table) {
                bail!("invalid table name: {table:?}");
            }
        }
        if self.event_table == self.unique_email_table {
            bail!("event table and unique email table must differ");
        }
        if self.operation_timeout.is_zero() {
            bail!("operation timeout must be positive");
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub metrics_enabled: bool,
    pub store: StoreConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` plugs in the process environment
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = StoreConfig::default();

        let database_url = lookup("CUSTOMER_ES_DATABASE_URL")
            .unwrap_or_else(|| "sqlite://customer_es.db".to_string());

        let max_connections: u32 = match lookup("CUSTOMER_ES_MAX_CONNECTIONS") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("CUSTOMER_ES_MAX_CONNECTIONS is not a number: {raw}"))?,
            None => 5,
        };
        if max_connections == 0 {
            bail!("CUSTOMER_ES_MAX_CONNECTIONS must be at least 1");
        }

        let operation_timeout = match lookup("CUSTOMER_ES_OPERATION_TIMEOUT_MS") {
            Some(raw) => {
                let millis = raw.parse().with_context(|| {
                    format!("CUSTOMER_ES_OPERATION_TIMEOUT_MS is not a number: {raw}")
                })?;
                Duration::from_millis(millis)
            }
            None => defaults.operation_timeout,
        };

        let metrics_enabled = lookup("CUSTOMER_ES_METRICS_ENABLED")
            .map(|v| v == "1" || v.to_lowercase() == "true")
            .unwrap_or(true);

        let store = StoreConfig {
            event_table: lookup("CUSTOMER_ES_EVENT_TABLE").unwrap_or(defaults.event_table),
            unique_email_table: lookup("CUSTOMER_ES_UNIQUE_EMAIL_TABLE")
                .unwrap_or(defaults.unique_email_table),
            operation_timeout,
        };
        store.validate()?;

        Ok(Self {
            database_url,
            max_connections,
            metrics_enabled,
            store,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.database_url, "sqlite://customer_es.db");
        assert_eq!(config.max_connections, 5);
        assert!(config.metrics_enabled);
        assert_eq!(config.store.event_table, "eventstore");
        assert_eq!(config.store.unique_email_table, "unique_email_addresses");
        assert_eq!(config.store.operation_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("CUSTOMER_ES_DATABASE_URL", "sqlite::memory:"),
            ("CUSTOMER_ES_MAX_CONNECTIONS", "1"),
            ("CUSTOMER_ES_OPERATION_TIMEOUT_MS", "250"),
            ("CUSTOMER_ES_METRICS_ENABLED", "false"),
            ("CUSTOMER_ES_EVENT_TABLE", "customer_events"),
        ]))
        .unwrap();

        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.max_connections, 1);
        assert!(!config.metrics_enabled);
        assert_eq!(config.store.event_table, "customer_events");
        assert_eq!(config.store.operation_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_rejects_table_name_that_is_not_an_identifier() {
        let result =
            Config::from_lookup(lookup(&[("CUSTOMER_ES_EVENT_TABLE", "events; DROP TABLE x")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_garbage_numbers() {
        assert!(Config::from_lookup(lookup(&[("CUSTOMER_ES_MAX_CONNECTIONS", "many")])).is_err());
        assert!(Config::from_lookup(lookup(&[("CUSTOMER_ES_MAX_CONNECTIONS", "0")])).is_err());
        let result = Config::from_lookup(lookup(&[("CUSTOMER_ES_OPERATION_TIMEOUT_MS", "soon")]));
        assert!(result.is_err());
    }
}
