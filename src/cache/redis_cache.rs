use std::time::Duration;

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, Client as RedisClient, ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use tokio::sync::OnceCell;

use super::CacheStore;
use crate::config::Config;
use crate::error::CacheError;

// 建立连接和单次命令的超时，缓存慢时宁可回源数据库
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(1);
const RECONNECT_RETRIES: usize = 3;

/// Redis 缓存
///
/// 整个进程共用一个 `ConnectionManager`，第一次使用时建立，之后每次调用只克隆句柄。
/// 首次连接失败时返回错误，下一次调用会重新尝试，因此 Redis 暂时不可用不会影响启动。
/// 连接建立之后如果断开（Redis 重启、网络中断），manager 会在后台重连，
/// 断开时正在进行的命令返回错误，之后的命令走新的连接。
pub struct RedisCache {
    client: RedisClient,
    conn: OnceCell<ConnectionManager>,
}

impl RedisCache {
    pub fn new(config: &Config) -> Result<Self, CacheError> {
        let info = ConnectionInfo {
            addr: ConnectionAddr::Tcp(config.redis_host.clone(), config.redis_port),
            redis: RedisConnectionInfo {
                db: config.redis_db,
                password: config.redis_password.clone(),
                ..Default::default()
            },
        };

        Ok(Self {
            client: RedisClient::open(info)?,
            conn: OnceCell::new(),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, CacheError> {
        let conn = self
            .conn
            .get_or_try_init(|| {
                let config = ConnectionManagerConfig::new()
                    .set_connection_timeout(CONNECT_TIMEOUT)
                    .set_response_timeout(RESPONSE_TIMEOUT)
                    .set_number_of_retries(RECONNECT_RETRIES);
                ConnectionManager::new_with_config(self.client.clone(), config)
            })
            .await?;
        Ok(conn.clone())
    }

    /// 检查 Redis 是否可用
    pub async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.get(key).await?;

        match &value {
            Some(_) => tracing::debug!("Cache hit for key '{}'", key),
            None => tracing::debug!("Cache miss for key '{}'", key),
        }

        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        // SET EX 不接受 0 秒
        let ttl_secs = ttl.as_secs().max(1);

        let _: () = conn.set_ex(key, value, ttl_secs).await?;

        tracing::debug!("Cached key '{}' with TTL {}s", key, ttl_secs);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let deleted: i64 = conn.del(key).await?;

        tracing::debug!("Deleted key '{}': {}", key, deleted > 0);
        Ok(())
    }
}
