//! Base-URL resolution for client apps.
//!
//! Consumers pass an explicit URL (CLI flag, build setting) which wins over
//! the `SEODANG_API_URL` environment variable; without either the client
//! talks to a local development server.

use crate::util::normalize_text_option;

/// Environment variable consulted when no explicit API URL is given.
pub const API_URL_ENV: &str = "SEODANG_API_URL";

/// Default API base URL for local development.
pub const DEFAULT_API_URL: &str = "http://localhost:3000";

/// Resolve the API base URL from an explicit value and the environment.
///
/// Precedence: explicit value, then `env_value` (the caller reads the
/// environment so this stays a pure function), then [`DEFAULT_API_URL`].
pub fn resolve_base_url(explicit: Option<String>, env_value: Option<String>) -> String {
    normalize_text_option(explicit)
        .or_else(|| normalize_text_option(env_value))
        .unwrap_or_else(|| DEFAULT_API_URL.to_string())
}
