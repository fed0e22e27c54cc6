// 缓存模块
// 用户快照的旁路缓存，带过期时间，不是权威数据

pub mod keys;
pub mod operations;
pub mod redis_cache;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheError;

// 重新导出常用类型，方便其他模块使用
pub use operations::user::{CacheLookup, UserCacheOperations};
pub use redis_cache::RedisCache;

/// 键值缓存
///
/// 值是序列化后的字符串，条目在 `ttl` 之后视为不存在。
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// 删除不存在的键不算错误
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}
