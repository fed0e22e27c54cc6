use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::cache::{CacheLookup, CacheStore, UserCacheOperations};
use crate::database::UserStore;
use crate::error::AppError;
use crate::models::{NewUser, User, UserId, UserPatch};
use crate::utils::{DEFAULT_COST, hash_password};

/// 用户读写路径
///
/// 读：先查缓存，未命中再查数据库并回填缓存。
/// 写：先写数据库，更新成功后覆盖缓存，删除成功后删除缓存。
/// 缓存的任何失败都只记录日志，不影响调用结果。
///
/// 所有字段都是共享句柄，克隆的开销很小，批量查询会为每个任务克隆一份。
#[derive(Clone)]
pub struct UserService {
    pub(super) store: Arc<dyn UserStore>,
    pub(super) cache: Arc<dyn CacheStore>,
    cache_ttl: Duration,
    hash_cost: u32,
    pub(super) batch_limit: Option<Arc<Semaphore>>,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>, cache: Arc<dyn CacheStore>, cache_ttl: Duration) -> Self {
        Self {
            store,
            cache,
            cache_ttl,
            hash_cost: DEFAULT_COST,
            batch_limit: None,
        }
    }

    /// 限制批量查询同时进行的查询数
    pub fn with_batch_limit(mut self, max_concurrency: usize) -> Self {
        self.batch_limit = Some(Arc::new(Semaphore::new(max_concurrency)));
        self
    }

    /// bcrypt 计算成本，测试中使用较低的值
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    pub async fn get(&self, id: UserId) -> Result<User, AppError> {
        match UserCacheOperations::get_cached_user(self.cache.as_ref(), id).await {
            CacheLookup::Hit(user) => {
                debug!(user_id = id, "user served from cache");
                return Ok(user);
            }
            CacheLookup::Miss => {}
            CacheLookup::Corrupt(e) => {
                warn!(user_id = id, error = %e, "corrupt cache entry, reading from store");
            }
            CacheLookup::Unavailable(e) => {
                warn!(user_id = id, error = %e, "cache lookup failed, reading from store");
            }
        }

        let user = self
            .store
            .fetch_by_id(id)
            .await?
            .ok_or(AppError::NotFound(id))?;

        self.refresh_cache(&user).await;
        Ok(user)
    }

    /// 创建用户，不写缓存，第一次读取时再回填
    pub async fn create(&self, input: NewUser) -> Result<User, AppError> {
        input.validate()?;

        let password = self.hash_secret(input.password).await?;
        let input = NewUser { password, ..input };

        let user = self.store.insert(&input).await?;
        info!(user_id = user.id, "user created");
        Ok(user)
    }

    /// 部分更新，成功后用新快照覆盖缓存
    pub async fn update(&self, id: UserId, patch: UserPatch) -> Result<User, AppError> {
        patch.validate()?;

        let password = self.hash_secret(patch.password).await?;
        let patch = UserPatch { password, ..patch };

        let user = self
            .store
            .update_by_id(id, &patch)
            .await?
            .ok_or(AppError::NotFound(id))?;

        self.refresh_cache(&user).await;
        info!(user_id = id, "user updated");
        Ok(user)
    }

    /// 删除用户，数据库删除成功后再删缓存
    pub async fn delete(&self, id: UserId) -> Result<(), AppError> {
        if !self.store.delete_by_id(id).await? {
            return Err(AppError::NotFound(id));
        }

        // 数据库里已经没有这一行了，缓存删除失败时旧条目最多存活到过期
        if let Err(e) = UserCacheOperations::remove_user_from_cache(self.cache.as_ref(), id).await
        {
            warn!(user_id = id, error = %e, "Failed to delete user from cache");
        }

        info!(user_id = id, "user deleted");
        Ok(())
    }

    async fn refresh_cache(&self, user: &User) {
        if let Err(e) =
            UserCacheOperations::cache_user(self.cache.as_ref(), user, self.cache_ttl).await
        {
            warn!(user_id = user.id, error = %e, "Failed to set cache");
        }
    }

    async fn hash_secret(&self, secret: Option<String>) -> Result<Option<String>, AppError> {
        let Some(secret) = secret else {
            return Ok(None);
        };
        let cost = self.hash_cost;
        let hashed = tokio::task::spawn_blocking(move || hash_password(&secret, cost))
            .await
            .map_err(|e| AppError::Internal(format!("password hashing task failed: {e}")))?
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))?;
        Ok(Some(hashed))
    }
}
