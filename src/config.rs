use crate::cors::CorsPolicy;
use crate::error::ConfigError;
use std::env;
use std::net::{IpAddr, SocketAddr};

static DEFAULT_DATABASE_URL: &str = "test.db";
static DEFAULT_HOST: &str = "0.0.0.0";
static DEFAULT_PORT: u16 = 8080;

/// Service settings, read from the environment (and `.env`, if present).
///
/// | Variable | Default |
/// |---|---|
/// | `DATABASE_URL` | `test.db` |
/// | `HOST` | `0.0.0.0` |
/// | `PORT` | `8080` |
/// | `CORS_ALLOWED_ORIGINS` | `*` |
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub addr: SocketAddr,
    pub cors: CorsPolicy,
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        Config::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let ip: IpAddr = host
            .parse()
            .map_err(|_| ConfigError::InvalidHost(host.clone()))?;

        let port = match lookup("PORT") {
            Some(port) => port
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(port.clone()))?,
            None => DEFAULT_PORT,
        };

        let cors = match lookup("CORS_ALLOWED_ORIGINS") {
            Some(setting) => CorsPolicy::from_setting(&setting)?,
            None => CorsPolicy::default(),
        };

        Ok(Config {
            database_url,
            addr: SocketAddr::new(ip, port),
            cors,
        })
    }
}
