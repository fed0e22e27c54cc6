use crate::models::UserId;

/// 生成用户信息缓存键
///
/// 键就是十进制的用户ID，没有前缀，与共用同一个 Redis 库的其他服务保持一致。
pub fn user_key(user_id: UserId) -> String {
    user_id.to_string()
}
