//! Share-link parsing: turning a pasted URL into a [`ShareReference`].
//!
//! Accepted shapes:
//!
//! - `https://{host}/s/<code>` (canonical share link)
//! - `https://{host}/...?surl=<code>` (share-init redirect form)
//! - any URL whose final path segment is the code
//! - a bare pasted code or `/s/<code>` fragment (canonical host assumed)
//!
//! # Example
//!
//! ```
//! use sharebox_core::parser::parse_share_url;
//!
//! let share = parse_share_url("https://terabox.com/s/1AbCdEf?pwd=1234")?;
//! assert_eq!(share.short_code, "1AbCdEf");
//! # Ok::<(), sharebox_core::parser::ParseError>(())
//! ```

mod error;
mod share_url;

pub use error::{MAX_URL_LENGTH, ParseError};
pub use share_url::{DEFAULT_HOST, ShareReference, parse_share_url};
