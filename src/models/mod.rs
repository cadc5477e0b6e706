pub mod connect;
pub mod error_type;

pub use connect::*;
pub use error_type::{ErrorPageInfo, ErrorType};
