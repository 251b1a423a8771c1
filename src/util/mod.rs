//! Small helpers shared by the store, the app and the terminal renderer.
//!
//! - **Text**: control-sequence stripping for remote text, char-based truncation
//! - **URLs**: validation of article links before they reach the browser

mod text;
mod url_validator;

pub use text::{single_line, strip_control_chars, truncate_chars};
pub use url_validator::{validate_article_url, UrlValidationError};

/// Longest keyword query sent to the search endpoint.
pub const MAX_SEARCH_QUERY_LENGTH: usize = 500;
