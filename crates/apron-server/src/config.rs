//! Server configuration from environment.

use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    /// SQLite file; `None` keeps everything in memory
    pub database_path: Option<String>,
    pub database_max_connections: u32,
    pub seed_gates: bool,
    /// Searches a detection makes after losing a gate race before it gives up
    pub claim_attempts: u32,
    pub event_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            database_path: None,
            database_max_connections: 5,
            seed_gates: true,
            claim_attempts: 3,
            event_capacity: 256,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: parse_var("APRON_PORT").unwrap_or(defaults.server_port),
            database_path: env::var("APRON_DATABASE_PATH")
                .ok()
                .filter(|path| !path.trim().is_empty()),
            database_max_connections: parse_var("APRON_DATABASE_MAX_CONNECTIONS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.database_max_connections),
            seed_gates: env::var("APRON_SEED_GATES")
                .ok()
                .map(|value| parse_bool(&value))
                .unwrap_or(defaults.seed_gates),
            claim_attempts: parse_var("APRON_CLAIM_ATTEMPTS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.claim_attempts),
            event_capacity: parse_var("APRON_EVENT_CAPACITY")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.event_capacity),
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("TRUE"));
        assert!(parse_bool(" 1 "));
        assert!(!parse_bool("off"));
        assert!(!parse_bool(""));
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server_port, 3000);
        assert!(config.database_path.is_none());
        assert_eq!(config.claim_attempts, 3);
    }
}
