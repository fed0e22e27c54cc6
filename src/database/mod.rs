// 数据库模块
// 用户记录的持久化存储，是数据的唯一可信来源

pub mod postgres;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{NewUser, User, UserId, UserPatch};

pub use postgres::{PgUserStore, connect, migrate};

/// 用户记录存储
///
/// 实现必须可以被多个任务并发使用。
#[async_trait]
pub trait UserStore: Send + Sync {
    /// 按ID读取，不存在时返回 `None`
    async fn fetch_by_id(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// 插入新用户，ID 由存储分配
    async fn insert(&self, user: &NewUser) -> Result<User, StoreError>;

    /// 部分更新，没有匹配的行时返回 `None`
    async fn update_by_id(
        &self,
        id: UserId,
        patch: &UserPatch,
    ) -> Result<Option<User>, StoreError>;

    /// 删除，返回是否真的删除了一行
    async fn delete_by_id(&self, id: UserId) -> Result<bool, StoreError>;
}
