use std::env;
use std::str::FromStr;

/// Selects the in-process store instead of PostgreSQL.
pub const MEMORY_DATABASE_URL: &str = "memory";

/// Upper bound on `TOKEN_TTL_HOURS`: one leap year.
const MAX_TOKEN_TTL_HOURS: i64 = 24 * 366;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} must be a valid {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host to bind to.
    pub host: String,
    /// Server port to bind to.
    pub port: u16,
    /// PostgreSQL connection URL, or `memory`.
    pub database_url: String,
    /// Maximum database connections in the pool.
    pub db_max_connections: u32,
    /// Minimum database connections in the pool.
    pub db_min_connections: u32,
    /// Session token signing secret.
    pub secret_key: String,
    /// Session lifetime, also used as the cookie max-age.
    pub token_ttl_hours: i64,
    /// Production mode: session cookie is `Secure` and `SameSite=None`.
    pub production: bool,
    /// Origins allowed to make credentialed cross-site requests.
    pub allowed_origins: Vec<String>,
    /// Log level (e.g., "info", "debug", "trace").
    pub log_level: String,
}

impl AppConfig {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        Ok(Self {
            host: var("HOST", "0.0.0.0"),
            port: parse(&lookup, "PORT", 3000, "port number")?,
            database_url: lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            db_max_connections: parse(&lookup, "DB_MAX_CONNECTIONS", 20, "u32")?,
            db_min_connections: parse(&lookup, "DB_MIN_CONNECTIONS", 1, "u32")?,
            secret_key: var("SECRET_KEY", "dev-secret-change-me-in-production"),
            token_ttl_hours: token_ttl_hours(&lookup)?,
            production: lookup("APP_ENV").is_some_and(|v| v.eq_ignore_ascii_case("production")),
            allowed_origins: var("ALLOWED_ORIGINS", "http://localhost:5173")
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(String::from)
                .collect(),
            log_level: var("LOG_LEVEL", "info"),
        })
    }

    /// Build the socket address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_url == MEMORY_DATABASE_URL
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.token_ttl_hours)
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            expected,
            value,
        }),
    }
}

fn token_ttl_hours(lookup: &impl Fn(&str) -> Option<String>) -> Result<i64, ConfigError> {
    const EXPECTED: &str = "number of hours between 1 and 8784";
    let hours = parse(lookup, "TOKEN_TTL_HOURS", 24, EXPECTED)?;
    if (1..=MAX_TOKEN_TTL_HOURS).contains(&hours) {
        Ok(hours)
    } else {
        Err(ConfigError::Invalid {
            name: "TOKEN_TTL_HOURS",
            expected: EXPECTED,
            value: hours.to_string(),
        })
    }
}

#[cfg(test)]
impl AppConfig {
    /// In-memory configuration for router tests.
    pub fn for_tests() -> Self {
        Self::from_lookup(|name| (name == "DATABASE_URL").then(|| MEMORY_DATABASE_URL.to_string()))
            .unwrap()
    }
}
