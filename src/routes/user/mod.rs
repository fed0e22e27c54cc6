mod handler;

pub use handler::{create_user, delete_user, get_user, get_users, update_user};
