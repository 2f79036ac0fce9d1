//! Shared REST client for the Seodang API.
//!
//! A single request path: JSON (or multipart) out, bearer token attached when
//! a session exists, and every response normalized into either a parsed
//! payload or an [`Error::Api`] carrying a human-readable message.

use async_trait::async_trait;
use reqwest::{multipart, Method, StatusCode};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::UploadFile;
use crate::util::is_http_url;

/// Transport seam between the resource stores and the wire.
///
/// Stores hold an `Arc<dyn Api>`; production uses [`ApiClient`] while tests
/// inject a recording fake. Payloads stay as `serde_json::Value` here and are
/// shaped into typed models by the stores, mirroring the untyped server
/// exchange.
#[async_trait]
pub trait Api: Send + Sync {
    /// The normalized base URL this client talks to.
    fn base_url(&self) -> &str;

    /// Issue a JSON request against `path` (relative to the base URL).
    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<Value>,
        token: Option<&str>,
    ) -> Result<Value>;

    /// Issue a multipart upload with a `file` part and an optional `title` field.
    async fn upload(
        &self,
        path: &str,
        file: UploadFile,
        title: Option<String>,
        token: Option<&str>,
    ) -> Result<Value>;
}

/// reqwest-backed [`Api`] implementation.
///
/// No retries, timeouts, or cancellation live at this layer; a failed request
/// surfaces immediately to the caller.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    /// Builds a client for an explicit API base URL.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let base_url = normalize_base_url(base_url.as_ref())?;
        let client = reqwest::Client::builder().build()?;
        Ok(Self { base_url, client })
    }

    async fn handle_response(&self, response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        let text = response.text().await?;
        let payload = decode_body(&text);
        if status.is_success() {
            Ok(payload)
        } else {
            Err(Error::Api(extract_error_message(status, &payload)))
        }
    }
}

#[async_trait]
impl Api for ApiClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<Value>,
        token: Option<&str>,
    ) -> Result<Value> {
        let url = format!("{}{}", self.base_url, normalize_path(path));
        tracing::debug!(%method, %url, "issuing API request");

        let mut request = self.client.request(method, url);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        self.handle_response(response).await
    }

    async fn upload(
        &self,
        path: &str,
        file: UploadFile,
        title: Option<String>,
        token: Option<&str>,
    ) -> Result<Value> {
        let url = format!("{}{}", self.base_url, normalize_path(path));
        let part = multipart::Part::bytes(file.bytes)
            .file_name(file.name)
            .mime_str(&file.mime)?;
        let mut form = multipart::Form::new().part("file", part);
        if let Some(title) = title {
            form = form.text("title", title);
        }

        // Content type is left to reqwest so the multipart boundary survives.
        let mut request = self.client.post(url).multipart(form);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        self.handle_response(response).await
    }
}

/// Normalize a base URL: scheme required, trailing slash stripped.
pub(crate) fn normalize_base_url(raw: &str) -> Result<String> {
    let base = raw.trim().trim_end_matches('/').to_string();
    if base.is_empty() {
        return Err(Error::InvalidConfiguration(
            "API base URL must not be empty".to_string(),
        ));
    }
    if !is_http_url(&base) {
        return Err(Error::InvalidConfiguration(
            "API base URL must include http:// or https://".to_string(),
        ));
    }
    Ok(base)
}

/// Ensure exactly one leading slash on a request path.
fn normalize_path(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}

/// Decode a response body: JSON when it parses, the raw text otherwise.
///
/// An empty body becomes `null`. Parse failure alone is never an error;
/// plain-text 200 responses and plain-text error bodies both pass through.
fn decode_body(text: &str) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Derive the error message for a non-2xx response.
///
/// Priority: `message` field in the parsed body, then `error` field, then the
/// HTTP status text.
fn extract_error_message(status: StatusCode, payload: &Value) -> String {
    payload
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| payload.get("error").and_then(Value::as_str))
        .map_or_else(
            || {
                status
                    .canonical_reason()
                    .map_or_else(|| format!("HTTP {}", status.as_u16()), ToString::to_string)
            },
            ToString::to_string,
        )
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn normalize_base_url_rejects_invalid_values() {
        assert!(normalize_base_url("").is_err());
        assert!(normalize_base_url("example.com").is_err());
    }

    #[test]
    fn normalize_base_url_trims_trailing_slash() {
        assert_eq!(
            normalize_base_url("https://api.example.com/").unwrap(),
            "https://api.example.com"
        );
    }

    #[test]
    fn normalize_path_forces_single_leading_slash() {
        assert_eq!(normalize_path("posts"), "/posts");
        assert_eq!(normalize_path("/posts"), "/posts");
        assert_eq!(normalize_path("//posts"), "/posts");
    }

    #[test]
    fn decode_body_falls_back_to_raw_text() {
        assert_eq!(decode_body(""), Value::Null);
        assert_eq!(decode_body(r#"{"id":"n1"}"#), json!({"id": "n1"}));
        assert_eq!(decode_body("plain text"), json!("plain text"));
    }

    #[test]
    fn error_message_prefers_message_field() {
        let message = extract_error_message(
            StatusCode::UNAUTHORIZED,
            &json!({"message": "invalid credentials", "error": "unauthorized"}),
        );
        assert_eq!(message, "invalid credentials");
    }

    #[test]
    fn error_message_falls_back_to_error_field() {
        let message =
            extract_error_message(StatusCode::CONFLICT, &json!({"error": "email exists"}));
        assert_eq!(message, "email exists");
    }

    #[test]
    fn error_message_falls_back_to_status_text() {
        let message = extract_error_message(StatusCode::NOT_FOUND, &json!("missing"));
        assert_eq!(message, "Not Found");

        let message = extract_error_message(StatusCode::BAD_GATEWAY, &Value::Null);
        assert_eq!(message, "Bad Gateway");
    }
}
