use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_REDIS_PORT: u16 = 6379;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_idle_conns: u32,
    pub db_max_open_conns: u32,
    pub db_conn_max_lifetime_secs: u64,
    pub redis_host: String,
    pub redis_port: u16,
    pub redis_password: Option<String>,
    pub redis_db: i64,
    pub cache_expiration_minutes: u64,
    pub server_host: String,
    pub server_port: u16,
    pub read_timeout_secs: u64,
    pub is_production: bool,
    /// 批量查询的并发上限，未设置时不限制
    pub batch_max_concurrency: Option<usize>,
    /// JSON 日志文件路径，未设置时只输出到控制台
    pub log_file: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 通过任意查找函数构建配置，便于在测试中不修改进程环境
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let (redis_host, redis_port) = parse_addr(&required("REDIS_ADDR")?)?;

        let cache_expiration_minutes =
            parse_or("CACHE_EXPIRATION_MINUTES", get("CACHE_EXPIRATION_MINUTES"), 10u64)?;
        if cache_expiration_minutes == 0 {
            return Err(ConfigError::Invalid {
                name: "CACHE_EXPIRATION_MINUTES",
                value: "0".into(),
            });
        }

        let batch_max_concurrency = match get("BATCH_MAX_CONCURRENCY") {
            Some(raw) => match raw.parse::<usize>() {
                Ok(limit) if limit > 0 => Some(limit),
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "BATCH_MAX_CONCURRENCY",
                        value: raw,
                    });
                }
            },
            None => None,
        };

        Ok(Config {
            database_url: required("DATABASE_URL")?,
            db_max_idle_conns: parse_or("DB_MAX_IDLE_CONNS", get("DB_MAX_IDLE_CONNS"), 2)?,
            db_max_open_conns: parse_or("DB_MAX_OPEN_CONNS", get("DB_MAX_OPEN_CONNS"), 10)?,
            db_conn_max_lifetime_secs: parse_or(
                "DB_CONN_MAX_LIFETIME",
                get("DB_CONN_MAX_LIFETIME"),
                1800,
            )?,
            redis_host,
            redis_port,
            redis_password: get("REDIS_PASSWORD"),
            redis_db: parse_or("REDIS_DB", get("REDIS_DB"), 0)?,
            cache_expiration_minutes,
            server_host: get("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            server_port: parse_or("SERVER_PORT", get("SERVER_PORT"), 3000)?,
            read_timeout_secs: parse_or("SERVER_READ_TIMEOUT", get("SERVER_READ_TIMEOUT"), 10)?,
            is_production: get("APP_ENV")
                .map(|v| v.eq_ignore_ascii_case("production") || v.eq_ignore_ascii_case("prod"))
                .unwrap_or(false),
            batch_max_concurrency,
            log_file: get("LOG_FILE"),
        })
    }

    pub fn cache_expiration(&self) -> Duration {
        Duration::from_secs(self.cache_expiration_minutes * 60)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn db_conn_max_lifetime(&self) -> Duration {
        Duration::from_secs(self.db_conn_max_lifetime_secs)
    }
}

fn parse_or<T: FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        None => Ok(default),
    }
}

// "host:port"，省略端口时使用 Redis 默认端口
fn parse_addr(addr: &str) -> Result<(String, u16), ConfigError> {
    let invalid = || ConfigError::Invalid {
        name: "REDIS_ADDR",
        value: addr.to_string(),
    };
    match addr.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() => {
            let port = port.parse().map_err(|_| invalid())?;
            Ok((host.to_string(), port))
        }
        Some(_) => Err(invalid()),
        None => Ok((addr.to_string(), DEFAULT_REDIS_PORT)),
    }
}
