pub mod system;
pub mod user;
