//! # Security Module
//!
//! Authentication for endpoints. An endpoint may carry one [`AuthConfig`]: an
//! [`AuthHandler`], the opaque options handed to it on every call, and the
//! name of the security scheme the documentation registry advertises.
//!
//! ## Flow
//!
//! 1. The pipeline calls [`AuthHandler::authenticate`] before any validator runs
//! 2. [`AuthOutcome::Rejected`] ends the request with the handler's message and
//!    status (401 when the handler gives none)
//! 3. [`AuthOutcome::Authenticated`] carries an optional user into the
//!    handler's input bundle; `None` is a legitimate anonymous success
//! 4. An `Err` from the handler is an unexpected failure and becomes a 500
//!
//! ## Built-in handlers
//!
//! - [`JwtBearerAuth`] - signed JWTs from `Authorization: Bearer` or a cookie
//! - [`ApiKeyAuth`] - static API keys in a header
//!
//! Both understand the options `{"required": bool, "scopes": [..]}`
//! (`scopes` only for JWTs). `required: false` lets requests without
//! credentials through as anonymous; presented-but-bad credentials are still
//! rejected.
//!
//! ## Custom handlers
//!
//! ```rust
//! use async_trait::async_trait;
//! use brrtendpoint::security::{AuthHandler, AuthOutcome};
//! use brrtendpoint::server::IncomingRequest;
//! use serde_json::{json, Value};
//!
//! struct TenantHeader;
//!
//! #[async_trait]
//! impl AuthHandler for TenantHeader {
//!     async fn authenticate(
//!         &self,
//!         req: &dyn IncomingRequest,
//!         _options: &Value,
//!     ) -> anyhow::Result<AuthOutcome> {
//!         Ok(match req.get_header("x-tenant") {
//!             Some(t) => AuthOutcome::authenticated(json!({ "tenant": t })),
//!             None => AuthOutcome::rejected_with_status("Unknown tenant", 403),
//!         })
//!     }
//! }
//! ```

use crate::server::IncomingRequest;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

mod api_key;
mod jwt_bearer;

pub use api_key::ApiKeyAuth;
pub use jwt_bearer::JwtBearerAuth;

/// Scheme name used when an endpoint configures auth without naming one.
pub const DEFAULT_SECURITY_SCHEME: &str = "bearerAuth";

/// Status used for a rejection that does not specify one.
pub const DEFAULT_AUTH_FAILURE_STATUS: u16 = 401;

/// Result of one authentication attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome {
    /// Credentials accepted, or absent where that is allowed
    Authenticated { user: Option<Value> },
    /// Credentials refused
    Rejected {
        error: Option<String>,
        status_code: Option<u16>,
    },
}

impl AuthOutcome {
    #[must_use]
    pub fn authenticated(user: Value) -> Self {
        AuthOutcome::Authenticated { user: Some(user) }
    }

    /// Success without a user.
    #[must_use]
    pub fn anonymous() -> Self {
        AuthOutcome::Authenticated { user: None }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        AuthOutcome::Rejected {
            error: Some(error.into()),
            status_code: None,
        }
    }

    pub fn rejected_with_status(error: impl Into<String>, status: u16) -> Self {
        AuthOutcome::Rejected {
            error: Some(error.into()),
            status_code: Some(status),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, AuthOutcome::Authenticated { .. })
    }

    #[must_use]
    pub fn user(&self) -> Option<&Value> {
        match self {
            AuthOutcome::Authenticated { user } => user.as_ref(),
            AuthOutcome::Rejected { .. } => None,
        }
    }

    /// Failure status, defaulting to 401. `None` on success.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            AuthOutcome::Authenticated { .. } => None,
            AuthOutcome::Rejected { status_code, .. } => {
                Some(status_code.unwrap_or(DEFAULT_AUTH_FAILURE_STATUS))
            }
        }
    }
}

/// Authentication capability invoked at the head of the pipeline.
#[async_trait]
pub trait AuthHandler: Send + Sync {
    /// Decide whether `req` may proceed.
    ///
    /// `options` is whatever the endpoint attached to its [`AuthConfig`];
    /// `Value::Null` when it attached nothing.
    async fn authenticate(
        &self,
        req: &dyn IncomingRequest,
        options: &Value,
    ) -> anyhow::Result<AuthOutcome>;
}

/// Auth attached to one endpoint.
#[derive(Clone)]
pub struct AuthConfig {
    pub handler: Arc<dyn AuthHandler>,
    pub options: Value,
    /// Security scheme advertised in the documentation
    pub scheme: String,
}

impl AuthConfig {
    pub fn new(handler: impl AuthHandler + 'static) -> Self {
        Self::from_arc(Arc::new(handler))
    }

    /// Share one handler between endpoints.
    #[must_use]
    pub fn from_arc(handler: Arc<dyn AuthHandler>) -> Self {
        Self {
            handler,
            options: Value::Null,
            scheme: DEFAULT_SECURITY_SCHEME.to_string(),
        }
    }

    #[must_use]
    pub fn options(mut self, options: Value) -> Self {
        self.options = options;
        self
    }

    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("options", &self.options)
            .field("scheme", &self.scheme)
            .finish_non_exhaustive()
    }
}

/// Options understood by the built-in handlers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct CredentialOptions {
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub scopes: Vec<String>,
}

fn default_required() -> bool {
    true
}

impl Default for CredentialOptions {
    fn default() -> Self {
        Self {
            required: true,
            scopes: Vec::new(),
        }
    }
}

impl CredentialOptions {
    pub(crate) fn from_value(options: &Value) -> anyhow::Result<Self> {
        if options.is_null() {
            return Ok(Self::default());
        }
        Ok(Self::deserialize(options)?)
    }
}
