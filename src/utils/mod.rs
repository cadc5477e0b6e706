pub mod error;
pub mod logging;
pub mod string_utils;

pub use error::*;
pub use string_utils::{escape_html, mask_secret, truncate_safe};
