pub mod admin;
pub mod connect;
pub mod error_page;
pub mod health;

pub use admin::{clear_token_cache, token_info};
pub use connect::handle_connect;
pub use error_page::handle_error_page;
pub use health::{health_check, ready_check};
