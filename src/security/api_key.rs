use super::{AuthHandler, AuthOutcome, CredentialOptions};
use crate::server::IncomingRequest;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::debug;

/// Static API key authentication.
///
/// Keys are looked up in the configured header (default `x-api-key`), falling
/// back to `Authorization: Bearer <key>`. Each key maps to a client name that
/// becomes the request's user as `{"client": name}`.
#[derive(Debug, Clone)]
pub struct ApiKeyAuth {
    header_name: String,
    keys: HashMap<String, String>,
}

impl Default for ApiKeyAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiKeyAuth {
    #[must_use]
    pub fn new() -> Self {
        Self {
            header_name: "x-api-key".to_string(),
            keys: HashMap::new(),
        }
    }

    /// Header the key is read from.
    pub fn header_name(mut self, name: impl Into<String>) -> Self {
        self.header_name = name.into().to_ascii_lowercase();
        self
    }

    /// Accept `key`, identifying the caller as `client`.
    pub fn key(mut self, client: impl Into<String>, key: impl Into<String>) -> Self {
        self.keys.insert(key.into(), client.into());
        self
    }

    fn extract_key<'a>(&self, req: &'a dyn IncomingRequest) -> Option<&'a str> {
        req.get_header(&self.header_name).or_else(|| {
            req.get_header("authorization")
                .and_then(|h| h.strip_prefix("Bearer "))
        })
    }
}

#[async_trait]
impl AuthHandler for ApiKeyAuth {
    async fn authenticate(
        &self,
        req: &dyn IncomingRequest,
        options: &Value,
    ) -> anyhow::Result<AuthOutcome> {
        let options = CredentialOptions::from_value(options)?;
        let Some(presented) = self.extract_key(req) else {
            if options.required {
                debug!(header = %self.header_name, "API key missing");
                return Ok(AuthOutcome::rejected("Missing API key"));
            }
            return Ok(AuthOutcome::anonymous());
        };

        Ok(match self.keys.get(presented.trim()) {
            Some(client) => AuthOutcome::authenticated(json!({ "client": client })),
            None => {
                debug!(header = %self.header_name, "API key not recognised");
                AuthOutcome::rejected("Invalid API key")
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::ParsedRequest;
    use http::Method;

    fn auth() -> ApiKeyAuth {
        ApiKeyAuth::new().header_name("X-API-Key").key("pet-store", "test123")
    }

    #[tokio::test]
    async fn test_header_key() {
        let req = ParsedRequest::new(Method::GET, "/pets").header("X-API-Key", "test123");
        let outcome = auth().authenticate(&req, &Value::Null).await.unwrap();
        assert_eq!(outcome.user(), Some(&json!({ "client": "pet-store" })));
    }

    #[tokio::test]
    async fn test_bearer_fallback() {
        let req = ParsedRequest::new(Method::GET, "/pets").header("authorization", "Bearer test123");
        assert!(auth().authenticate(&req, &Value::Null).await.unwrap().is_success());
    }

    #[tokio::test]
    async fn test_wrong_and_missing_key() {
        let wrong = ParsedRequest::new(Method::GET, "/pets").header("x-api-key", "nope");
        let outcome = auth().authenticate(&wrong, &Value::Null).await.unwrap();
        assert_eq!(outcome, AuthOutcome::rejected("Invalid API key"));
        assert_eq!(outcome.status_code(), Some(401));

        let missing = ParsedRequest::new(Method::GET, "/pets");
        let outcome = auth()
            .authenticate(&missing, &json!({ "required": false }))
            .await
            .unwrap();
        assert_eq!(outcome, AuthOutcome::anonymous());
    }
}
