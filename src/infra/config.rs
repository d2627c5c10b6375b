use anyhow::Context;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub store_dir: PathBuf,
    pub schema_cache_ttl_hours: i64,
    pub pool_max_connections: u32,
    pub max_result_rows: usize,
    pub sample_rows: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            store_dir: PathBuf::from("data"),
            schema_cache_ttl_hours: 24,
            pool_max_connections: 5,
            max_result_rows: 1000,
            sample_rows: 5,
        }
    }
}

impl AppConfig {
    /// 从环境变量读取，调用前应已执行 `dotenvy::dotenv()`
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            bind_addr: parse_or(&lookup, "BIND_ADDR", defaults.bind_addr)?,
            store_dir: lookup("STORE_DIR").map(PathBuf::from).unwrap_or(defaults.store_dir),
            schema_cache_ttl_hours: parse_or(
                &lookup,
                "SCHEMA_CACHE_TTL_HOURS",
                defaults.schema_cache_ttl_hours,
            )?,
            pool_max_connections: parse_or(
                &lookup,
                "POOL_MAX_CONNECTIONS",
                defaults.pool_max_connections,
            )?,
            max_result_rows: parse_or(&lookup, "MAX_RESULT_ROWS", defaults.max_result_rows)?,
            sample_rows: parse_or(&lookup, "SAMPLE_ROWS", defaults.sample_rows)?,
        })
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}
