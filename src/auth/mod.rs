//! Per-request session credentials.
//!
//! Cookies arrive with the resolve request (raw header string or browser
//! jar export), are normalized once into a `Cookie` header value, and live
//! only as long as the request. There is no persistence and no jar shared
//! across requests.

mod cookies;

pub use cookies::{SessionCredentials, normalize_cookies};
