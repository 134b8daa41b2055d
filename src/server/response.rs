use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;
use smallvec::SmallVec;
use std::sync::Arc;

/// Maximum inline headers before heap allocation.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Header storage for requests and responses.
///
/// Header names use `Arc<str>` because the same handful of names
/// (`content-type`, `authorization`, ...) repeat on every request.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Opaque message returned for every unexpected failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Default message for an auth failure that did not supply one.
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized";

/// Response produced by the validation pipeline.
///
/// The host transport turns this into a wire response: `status` becomes the
/// status line, `body` is serialized as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct HandlerResponse {
    /// HTTP status code (200, 400, 401, 500, ...)
    pub status: u16,
    /// Response headers
    #[serde(skip_serializing)]
    pub headers: HeaderVec,
    /// Response body as JSON
    pub body: Value,
}

impl HandlerResponse {
    #[must_use]
    pub fn new(status: u16, headers: HeaderVec, body: Value) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// JSON response with a `content-type: application/json` header.
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "application/json".to_string()));
        Self {
            status,
            headers,
            body,
        }
    }

    /// 200 with the handler output as the body, no envelope.
    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self::json(200, body)
    }

    /// `{"error": message}` with the given status.
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, serde_json::json!({ "error": message }))
    }

    /// 400 carrying the per-slot error mapping under `errors`.
    #[must_use]
    pub fn validation_failed(errors: Value) -> Self {
        Self::json(400, serde_json::json!({ "errors": errors }))
    }

    /// Opaque 500. Never carries internal detail.
    #[must_use]
    pub fn internal_error() -> Self {
        Self::error(500, INTERNAL_ERROR_MESSAGE)
    }

    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or replace a header (case-insensitive match on the name).
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }

    /// Convert into an `http::Response` for hosts built on the `http` types.
    ///
    /// A string body under a non-JSON content type (the YAML document) is
    /// written as raw text; everything else is serialized as JSON.
    ///
    /// # Errors
    ///
    /// Fails if the status or a header is not valid HTTP.
    pub fn into_http(self) -> Result<http::Response<Bytes>, http::Error> {
        let raw_text = match (&self.body, self.get_header("content-type")) {
            (Value::String(text), Some(ct)) if !ct.starts_with("application/json") => {
                Some(Bytes::from(text.clone()))
            }
            _ => None,
        };
        let body = raw_text.unwrap_or_else(|| Bytes::from(self.body.to_string()));

        let mut builder = http::Response::builder().status(self.status);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_ref(), value.as_str());
        }
        builder.body(body)
    }

    /// Canonical reason phrase for the status code.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        status_reason(self.status)
    }
}

fn status_reason(status: u16) -> &'static str {
    http::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_reason() {
        assert_eq!(status_reason(200), "OK");
        assert_eq!(status_reason(401), "Unauthorized");
        assert_eq!(status_reason(999), "Unknown");
    }

    #[test]
    fn test_set_header_replaces_case_insensitively() {
        let mut resp = HandlerResponse::ok(json!({}));
        resp.set_header("Content-Type", "text/yaml".to_string());
        assert_eq!(resp.get_header("content-type"), Some("text/yaml"));
        assert_eq!(resp.headers.len(), 1);
    }

    #[test]
    fn test_into_http() {
        let resp = HandlerResponse::validation_failed(json!({ "query": "bad" }));
        let http = resp.into_http().unwrap();
        assert_eq!(http.status(), 400);
        assert_eq!(http.headers()["content-type"], "application/json");
        let body: Value = serde_json::from_slice(http.body()).unwrap();
        assert_eq!(body, json!({ "errors": { "query": "bad" } }));

        let mut yaml = HandlerResponse::ok(Value::String("openapi: 3.1.0\n".to_string()));
        yaml.set_header("content-type", "text/yaml".to_string());
        let http = yaml.into_http().unwrap();
        assert_eq!(http.body().as_ref(), b"openapi: 3.1.0\n");
    }

    #[test]
    fn test_internal_error_is_opaque() {
        let resp = HandlerResponse::internal_error();
        assert_eq!(resp.status, 500);
        assert_eq!(resp.body, json!({ "error": "Internal server error" }));
    }
}
