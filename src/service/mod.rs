// 业务逻辑模块
// 缓存旁路读写和批量查询

pub mod batch;
pub mod user;

pub use batch::BatchOutcome;
pub use user::UserService;
