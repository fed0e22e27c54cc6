/// 缓存操作

// 用户缓存操作
pub mod user;

pub use user::{CacheLookup, UserCacheOperations};
