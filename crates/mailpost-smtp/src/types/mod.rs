//! Core SMTP types.

mod address;
mod reply;

pub use address::{Address, HeaderValue, has_line_break};
pub use reply::{Reply, ReplyCode};
