//! Process configuration from environment variables.
//!
//! Variables may also come from a `.env` file; a missing or unreadable file
//! is logged and otherwise ignored. The process environment takes precedence
//! over the file. Empty values count as unset.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::rmv::{DEFAULT_BASE_URL, RmvConfig};
use crate::web::AllowedOrigins;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_LOOKAHEAD_MINS: u32 = 60;
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CACHE_TTL_SECS: u64 = 5 * 60;

/// Longest accepted cache TTL (one day).
const MAX_CACHE_TTL_SECS: u64 = 24 * 60 * 60;

/// Errors found while reading configuration. All are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Variables read from a `.env` file.
///
/// The file is parsed into memory and never written into the process
/// environment.
#[derive(Debug, Clone, Default)]
pub struct EnvFile {
    vars: HashMap<String, String>,
}

impl EnvFile {
    /// Parse the file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, dotenv::Error> {
        #[allow(deprecated)]
        let iter = dotenv::from_path_iter(path.as_ref())?;
        let vars = iter.collect::<Result<HashMap<_, _>, _>>()?;
        Ok(Self { vars })
    }

    /// Value from the file alone.
    pub fn get(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }

    /// Value from the process environment, falling back to the file.
    pub fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().or_else(|| self.get(key))
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// RMV access ID (`RMV_API_KEY`)
    pub api_key: String,
    /// Stop served by `/next-departures` (`STOP_ID`)
    pub stop_id: String,
    /// Listen port (`PORT`)
    pub port: u16,
    /// CORS allow-list (`ALLOWED_ORIGINS`, comma separated)
    pub allowed_origins: AllowedOrigins,
    /// Departure board endpoint (`RMV_BASE_URL`)
    pub base_url: String,
    /// Lookahead window in minutes (`LOOKAHEAD_MINUTES`)
    pub lookahead_mins: u32,
    /// Upstream request timeout (`UPSTREAM_TIMEOUT_SECS`)
    pub upstream_timeout: Duration,
    /// TTL for cached boards (`CACHE_TTL_SECS`)
    pub cache_ttl: Duration,
    /// Bound on cached stops (`CACHE_MAX_ENTRIES`)
    pub cache_max_entries: Option<u64>,
    /// Share one upstream fetch between concurrent misses (`COALESCE_FETCHES`)
    pub coalesce_fetches: bool,
}

impl Config {
    /// Read configuration from the process environment, falling back to
    /// values from `env_file`.
    pub fn from_env(env_file: &EnvFile) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env_file.var(key))
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let api_key = get("RMV_API_KEY").ok_or(ConfigError::Missing("RMV_API_KEY"))?;
        let stop_id = get("STOP_ID").ok_or(ConfigError::Missing("STOP_ID"))?;

        let cache_ttl_secs = parse_or(&get, "CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS)?;
        if cache_ttl_secs > MAX_CACHE_TTL_SECS {
            return Err(ConfigError::Invalid {
                var: "CACHE_TTL_SECS",
                value: cache_ttl_secs.to_string(),
                reason: format!("must be at most {MAX_CACHE_TTL_SECS}"),
            });
        }

        let upstream_timeout_secs =
            parse_or(&get, "UPSTREAM_TIMEOUT_SECS", DEFAULT_UPSTREAM_TIMEOUT_SECS)?;
        if upstream_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "UPSTREAM_TIMEOUT_SECS",
                value: upstream_timeout_secs.to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        let cache_max_entries = match get("CACHE_MAX_ENTRIES") {
            Some(raw) => Some(parse_value("CACHE_MAX_ENTRIES", &raw)?),
            None => None,
        };

        Ok(Self {
            api_key,
            stop_id,
            port: parse_or(&get, "PORT", DEFAULT_PORT)?,
            allowed_origins: get("ALLOWED_ORIGINS")
                .map(|raw| AllowedOrigins::parse(&raw))
                .unwrap_or_default(),
            base_url: get("RMV_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            lookahead_mins: parse_or(&get, "LOOKAHEAD_MINUTES", DEFAULT_LOOKAHEAD_MINS)?,
            upstream_timeout: Duration::from_secs(upstream_timeout_secs),
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            cache_max_entries,
            coalesce_fetches: parse_or(&get, "COALESCE_FETCHES", false)?,
        })
    }

    /// Upstream client configuration.
    pub fn rmv_config(&self) -> RmvConfig {
        RmvConfig::new(&self.api_key)
            .with_base_url(&self.base_url)
            .with_lookahead(self.lookahead_mins)
            .with_timeout(self.upstream_timeout)
    }

    /// Cache configuration.
    pub fn cache_config(&self) -> CacheConfig {
        let config = CacheConfig::default().with_ttl(self.cache_ttl);
        match self.cache_max_entries {
            Some(n) => config.with_max_entries(n),
            None => config,
        }
    }
}

fn parse_or<T>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(var) {
        Some(raw) => parse_value(var, &raw),
        None => Ok(default),
    }
}

fn parse_value<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}
