//! Transport layer: wire-format details (URL/body encoding, user agent,
//! response classification).

mod classify;
mod encode;
mod user_agent;

pub use classify::{classify_response, format_error_message};
pub use encode::{build_url, encode_form, encode_json};
pub use user_agent::{append_user_agent, default_user_agent};
