use std::time::Duration;

use crate::cache::CacheStore;
use crate::cache::keys::user_key;
use crate::error::CacheError;
use crate::models::{User, UserId};

/// 一次缓存查询的结果
///
/// 损坏的缓存内容和缓存不可用都按未命中处理，由调用方回源到数据库。
#[derive(Debug)]
pub enum CacheLookup {
    Hit(User),
    Miss,
    Corrupt(serde_json::Error),
    Unavailable(CacheError),
}

/// 用户缓存操作
pub struct UserCacheOperations;

impl UserCacheOperations {
    /// 将用户快照写入缓存，覆盖已有的条目
    pub async fn cache_user(
        cache: &dyn CacheStore,
        user: &User,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let json = serde_json::to_string(user)
            .map_err(|e| CacheError::Backend(format!("Serialization error: {e}")))?;

        cache.set(&user_key(user.id), &json, ttl).await
    }

    /// 从缓存读取用户
    pub async fn get_cached_user(cache: &dyn CacheStore, user_id: UserId) -> CacheLookup {
        match cache.get(&user_key(user_id)).await {
            Ok(Some(json)) => match serde_json::from_str::<User>(&json) {
                // 快照必须和请求的ID一致，否则视为损坏
                Ok(user) if user.id == user_id => CacheLookup::Hit(user),
                Ok(_) => CacheLookup::Corrupt(serde::de::Error::custom("cached id mismatch")),
                Err(e) => CacheLookup::Corrupt(e),
            },
            Ok(None) => CacheLookup::Miss,
            Err(e) => CacheLookup::Unavailable(e),
        }
    }

    /// 从缓存中删除用户
    pub async fn remove_user_from_cache(
        cache: &dyn CacheStore,
        user_id: UserId,
    ) -> Result<(), CacheError> {
        cache.delete(&user_key(user_id)).await
    }
}
