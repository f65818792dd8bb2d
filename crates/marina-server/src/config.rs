use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use chrono::TimeDelta;

use marina_api::password::HashCost;

/// Server settings, read from `MARINA_*` environment variables.
#[derive(Clone)]
pub struct Config {
    /// HS256 signing secret. Required, there is no fallback.
    pub jwt_secret: String,
    pub token_ttl: TimeDelta,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    /// Directory served for any path the API does not handle.
    pub static_dir: Option<PathBuf>,
    pub hash_cost: HashCost,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source. Empty values
    /// count as unset.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = var("MARINA_JWT_SECRET")
            .context("MARINA_JWT_SECRET must be set to a non-empty signing secret")?;

        let ttl_hours: i64 = parse_or(var("MARINA_TOKEN_TTL_HOURS"), "MARINA_TOKEN_TTL_HOURS", 24)?;
        if ttl_hours <= 0 {
            bail!("MARINA_TOKEN_TTL_HOURS must be positive, got {}", ttl_hours);
        }
        let token_ttl = TimeDelta::try_hours(ttl_hours)
            .context("MARINA_TOKEN_TTL_HOURS is out of range")?;

        let defaults = HashCost::default();
        let hash_cost = HashCost {
            memory_kib: parse_or(var("MARINA_HASH_MEMORY_KIB"), "MARINA_HASH_MEMORY_KIB", defaults.memory_kib)?,
            iterations: parse_or(var("MARINA_HASH_ITERATIONS"), "MARINA_HASH_ITERATIONS", defaults.iterations)?,
            parallelism: parse_or(var("MARINA_HASH_PARALLELISM"), "MARINA_HASH_PARALLELISM", defaults.parallelism)?,
        };

        Ok(Self {
            jwt_secret,
            token_ttl,
            db_path: var("MARINA_DB_PATH")
                .unwrap_or_else(|| "marina.db".to_string())
                .into(),
            host: var("MARINA_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(var("MARINA_PORT"), "MARINA_PORT", 3000)?,
            static_dir: var("MARINA_STATIC_DIR").map(PathBuf::from),
            hash_cost,
        })
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {key}: {raw:?}")),
        None => Ok(default),
    }
}
