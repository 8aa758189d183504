//! Configuration module for the dashboard backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use crate::errors::AppError;
use crate::history::DEFAULT_CAPACITY;
use crate::models::ServerTarget;

/// Default timeout for one game server query, in milliseconds.
pub const DEFAULT_QUERY_TIMEOUT_MS: u64 = 2000;

/// Default poll interval for per-server player-count history, in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Game servers to query
    pub servers: ServerRegistry,
    /// Upper bound for a whole query exchange with one server
    pub query_timeout: Duration,
    /// Interval of the background poller, `None` disables it
    pub poll_interval: Option<Duration>,
    /// Maximum number of samples kept per history
    pub history_capacity: usize,
    /// Connection URL of the timer plugin's database
    pub database_url: Option<String>,
    /// Pre-shared key protecting write endpoints
    pub api_psk: Option<String>,
}

/// Error raised when an environment variable holds an unusable value.
#[derive(Debug)]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
    pub reason: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {} value {:?}: {}", self.key, self.value, self.reason)
    }
}

impl std::error::Error for ConfigError {}

/// The configured game servers.
///
/// A malformed `SERVER_IPS` does not abort startup. The error is kept and
/// reported by every request that needs the server list.
#[derive(Debug, Clone)]
pub enum ServerRegistry {
    Valid(Vec<ServerTarget>),
    Invalid(String),
}

impl ServerRegistry {
    /// Parse the JSON array form `[{"ip": "1.2.3.4", "port": 27015}, ...]`.
    /// A missing or blank value is an empty registry.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return ServerRegistry::Valid(Vec::new());
        };

        match serde_json::from_str::<Vec<ServerTarget>>(raw) {
            Ok(targets) => ServerRegistry::Valid(targets),
            Err(e) => ServerRegistry::Invalid(format!("SERVER_IPS is not a valid server list: {}", e)),
        }
    }

    pub fn targets(&self) -> Result<&[ServerTarget], AppError> {
        match self {
            ServerRegistry::Valid(targets) => Ok(targets),
            ServerRegistry::Invalid(reason) => Err(AppError::ServerRegistry(reason.clone())),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let bind_addr = parse_var("BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 3000)))?;

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let servers = ServerRegistry::parse(env::var("SERVER_IPS").ok().as_deref());

        let query_timeout = Duration::from_millis(parse_var(
            "QUERY_TIMEOUT_MS",
            DEFAULT_QUERY_TIMEOUT_MS,
        )?);

        let poll_interval = match parse_var("POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)? {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        let history_capacity = parse_var("HISTORY_CAPACITY", DEFAULT_CAPACITY)?;
        if history_capacity == 0 {
            return Err(ConfigError {
                key: "HISTORY_CAPACITY",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let database_url = database_url_from_env();

        let api_psk = env::var("DASHBOARD_API_PSK").ok().filter(|k| !k.is_empty());

        Ok(Self {
            bind_addr,
            log_level,
            servers,
            query_timeout,
            poll_interval,
            history_capacity,
            database_url,
            api_psk,
        })
    }
}

fn parse_var<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match env::var(key) {
        Ok(value) => {
            let parsed = value.trim().parse::<T>();
            parsed.map_err(|e| ConfigError {
                key,
                value,
                reason: e.to_string(),
            })
        }
        Err(_) => Ok(default),
    }
}

/// `DATABASE_URL` wins; otherwise a MySQL URL is assembled from the
/// `DB_*` variables. Credentials containing URL-reserved characters must be
/// given through `DATABASE_URL` in encoded form.
fn database_url_from_env() -> Option<String> {
    if let Some(url) = env::var("DATABASE_URL").ok().filter(|u| !u.is_empty()) {
        return Some(url);
    }

    let host = env::var("DB_HOST").ok().filter(|h| !h.is_empty())?;
    let port = env::var("DB_PORT").unwrap_or_else(|_| "3306".to_string());
    let user = env::var("DB_USER").unwrap_or_default();
    let password = env::var("DB_PASSWORD").unwrap_or_default();
    let name = env::var("DB_NAME").unwrap_or_default();

    Some(mysql_url(&host, &port, &user, &password, &name))
}

fn mysql_url(host: &str, port: &str, user: &str, password: &str, name: &str) -> String {
    let credentials = match (user.is_empty(), password.is_empty()) {
        (true, _) => String::new(),
        (false, true) => format!("{}@", user),
        (false, false) => format!("{}:{}@", user, password),
    };
    format!("mysql://{}{}:{}/{}", credentials, host, port, name)
}
