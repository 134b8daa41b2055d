use super::{AuthHandler, AuthOutcome, CredentialOptions};
use crate::server::IncomingRequest;
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde_json::Value;
use tracing::debug;

/// Reasons a bearer token is refused.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenRejection {
    MissingToken,
    InvalidToken { error: String },
    InsufficientScopes { required: Vec<String>, got: Vec<String> },
}

impl TokenRejection {
    fn message(&self) -> &'static str {
        match self {
            TokenRejection::MissingToken => "Missing bearer token",
            TokenRejection::InvalidToken { .. } => "Invalid token",
            TokenRejection::InsufficientScopes { .. } => "Insufficient scope",
        }
    }

    fn status(&self) -> u16 {
        match self {
            TokenRejection::InsufficientScopes { .. } => 403,
            _ => 401,
        }
    }

    fn log(&self) {
        match self {
            TokenRejection::MissingToken => {
                debug!("JWT validation failed: missing token (no Authorization header or cookie)");
            }
            TokenRejection::InvalidToken { error } => {
                debug!(error = %error, "JWT validation failed: invalid token");
            }
            TokenRejection::InsufficientScopes { required, got } => {
                debug!(
                    required = ?required,
                    got = ?got,
                    "JWT validation failed: insufficient scopes"
                );
            }
        }
    }

    fn into_outcome(self) -> AuthOutcome {
        self.log();
        AuthOutcome::rejected_with_status(self.message(), self.status())
    }
}

/// Bearer JWT authentication with a shared HMAC secret.
///
/// The token is read from `Authorization: Bearer <token>`, or from the
/// configured cookie when the header is absent. On success the decoded
/// claims become the request's user.
///
/// Scopes requested through the endpoint options are checked against the
/// whitespace separated `scope` claim or the `scp` array claim.
///
/// ```rust
/// use brrtendpoint::security::{AuthConfig, JwtBearerAuth};
/// use serde_json::json;
///
/// let auth = AuthConfig::new(JwtBearerAuth::hs256("secret").issuer("https://issuer.example"))
///     .options(json!({ "scopes": ["pets:write"] }));
/// ```
pub struct JwtBearerAuth {
    key: DecodingKey,
    validation: Validation,
    cookie_name: Option<String>,
}

impl JwtBearerAuth {
    /// HS256 with `secret`.
    pub fn hs256(secret: impl AsRef<[u8]>) -> Self {
        Self::with_algorithm(secret, Algorithm::HS256)
    }

    /// HMAC secret with an explicit algorithm (HS256, HS384 or HS512).
    pub fn with_algorithm(secret: impl AsRef<[u8]>, algorithm: Algorithm) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_ref()),
            validation: Validation::new(algorithm),
            cookie_name: None,
        }
    }

    /// Require the `iss` claim to equal `issuer`.
    #[must_use]
    pub fn issuer(mut self, issuer: &str) -> Self {
        self.validation.set_issuer(&[issuer]);
        self
    }

    /// Require the `aud` claim to contain `audience`.
    #[must_use]
    pub fn audience(mut self, audience: &str) -> Self {
        self.validation.set_audience(&[audience]);
        self
    }

    /// Clock skew tolerance for `exp`/`nbf`, in seconds.
    #[must_use]
    pub fn leeway(mut self, seconds: u64) -> Self {
        self.validation.leeway = seconds;
        self
    }

    /// Also accept the token from this cookie.
    pub fn cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = Some(name.into());
        self
    }

    fn extract_token(&self, req: &dyn IncomingRequest) -> Option<String> {
        if let Some(token) = req
            .get_header("authorization")
            .and_then(|h| h.strip_prefix("Bearer "))
        {
            return Some(token.trim().to_string());
        }
        self.cookie_name
            .as_deref()
            .and_then(|name| req.get_cookie(name))
    }

    fn check(&self, token: &str, required_scopes: &[String]) -> Result<Value, TokenRejection> {
        let claims = jsonwebtoken::decode::<Value>(token, &self.key, &self.validation)
            .map_err(|e| TokenRejection::InvalidToken {
                error: e.to_string(),
            })?
            .claims;

        let granted = token_scopes(&claims);
        if required_scopes.iter().all(|s| granted.contains(s)) {
            Ok(claims)
        } else {
            Err(TokenRejection::InsufficientScopes {
                required: required_scopes.to_vec(),
                got: granted,
            })
        }
    }
}

fn token_scopes(claims: &Value) -> Vec<String> {
    if let Some(scope) = claims.get("scope").and_then(|v| v.as_str()) {
        return scope.split_whitespace().map(str::to_string).collect();
    }
    claims
        .get("scp")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|s| s.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl AuthHandler for JwtBearerAuth {
    async fn authenticate(
        &self,
        req: &dyn IncomingRequest,
        options: &Value,
    ) -> anyhow::Result<AuthOutcome> {
        let options = CredentialOptions::from_value(options)?;
        let Some(token) = self.extract_token(req) else {
            if options.required {
                return Ok(TokenRejection::MissingToken.into_outcome());
            }
            debug!("No bearer token presented; continuing anonymously");
            return Ok(AuthOutcome::anonymous());
        };

        Ok(match self.check(&token, &options.scopes) {
            Ok(claims) => AuthOutcome::authenticated(claims),
            Err(rejection) => rejection.into_outcome(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::ParsedRequest;
    use http::Method;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;
    use std::time::{SystemTime, UNIX_EPOCH};

    const SECRET: &str = "test-secret";

    fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    fn token(claims: Value) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn request_with(token: &str) -> ParsedRequest {
        ParsedRequest::new(Method::GET, "/me").header("Authorization", format!("Bearer {token}"))
    }

    #[tokio::test]
    async fn test_valid_token_yields_claims() {
        let auth = JwtBearerAuth::hs256(SECRET);
        let t = token(json!({ "sub": "user-1", "exp": now() + 600 }));
        let outcome = auth.authenticate(&request_with(&t), &Value::Null).await.unwrap();
        assert_eq!(outcome.user().and_then(|u| u.get("sub")), Some(&json!("user-1")));
    }

    #[tokio::test]
    async fn test_missing_token_required_vs_optional() {
        let auth = JwtBearerAuth::hs256(SECRET);
        let req = ParsedRequest::new(Method::GET, "/me");

        let outcome = auth.authenticate(&req, &Value::Null).await.unwrap();
        assert_eq!(outcome.status_code(), Some(401));

        let outcome = auth
            .authenticate(&req, &json!({ "required": false }))
            .await
            .unwrap();
        assert!(outcome.is_success());
        assert!(outcome.user().is_none());
    }

    #[tokio::test]
    async fn test_bad_signature_and_expiry_are_rejected() {
        let auth = JwtBearerAuth::hs256("another-secret");
        let t = token(json!({ "sub": "u", "exp": now() + 600 }));
        let outcome = auth
            .authenticate(&request_with(&t), &json!({ "required": false }))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            AuthOutcome::rejected_with_status("Invalid token", 401)
        );

        let auth = JwtBearerAuth::hs256(SECRET);
        let expired = token(json!({ "sub": "u", "exp": now() - 3600 }));
        let outcome = auth.authenticate(&request_with(&expired), &Value::Null).await.unwrap();
        assert_eq!(outcome.status_code(), Some(401));
    }

    #[tokio::test]
    async fn test_scopes() {
        let auth = JwtBearerAuth::hs256(SECRET);
        let t = token(json!({ "sub": "u", "exp": now() + 600, "scope": "pets:read pets:write" }));
        let ok = auth
            .authenticate(&request_with(&t), &json!({ "scopes": ["pets:write"] }))
            .await
            .unwrap();
        assert!(ok.is_success());

        let denied = auth
            .authenticate(&request_with(&t), &json!({ "scopes": ["admin"] }))
            .await
            .unwrap();
        assert_eq!(denied.status_code(), Some(403));
    }

    #[tokio::test]
    async fn test_cookie_fallback() {
        let auth = JwtBearerAuth::hs256(SECRET).cookie_name("auth_token");
        let t = token(json!({ "sub": "cookie-user", "exp": now() + 600 }));
        let req = ParsedRequest::new(Method::GET, "/me").header("cookie", format!("auth_token={t}"));
        let outcome = auth.authenticate(&req, &Value::Null).await.unwrap();
        assert!(outcome.is_success());
    }

    #[test]
    fn test_scp_array_claim() {
        assert_eq!(
            token_scopes(&json!({ "scp": ["a", "b"] })),
            vec!["a".to_string(), "b".to_string()]
        );
        assert!(token_scopes(&json!({})).is_empty());
    }
}
