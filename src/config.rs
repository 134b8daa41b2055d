//! # Configuration Module
//!
//! YAML configuration for services built on the pipeline: document-level
//! information for the synthesized OpenAPI document and the credentials the
//! built-in auth handlers check.
//!
//! ```yaml
//! docs:
//!   title: Pet Store
//!   version: 1.0.0
//!   servers:
//!     - url: https://api.example.com
//!
//! security:
//!   api_keys:
//!     ApiKeyHeader:
//!       header_name: X-API-Key
//!       keys:
//!         pet-store-web: test123
//!   bearer:
//!     bearerAuth:
//!       secret_env: JWT_SECRET
//!       issuer: https://auth.example.com
//!       cookie_name: auth_token
//! ```
//!
//! The file path is read from `BRRTR_CONFIG` by [`AppConfig::load`]. Each
//! entry under `security` is a named scheme: [`AppConfig::auth`] builds the
//! matching handler and [`AppConfig::document_info`] declares the scheme in
//! the document.

use crate::docs::{DocumentInfo, SecuritySchemeDoc};
use crate::security::{ApiKeyAuth, AuthConfig, AuthHandler, JwtBearerAuth};
use anyhow::{bail, Context};
use jsonwebtoken::Algorithm;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV_VAR: &str = "BRRTR_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub docs: DocumentInfo,
    #[serde(default)]
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SecurityConfig {
    /// API key schemes by name
    #[serde(default)]
    pub api_keys: BTreeMap<String, ApiKeyConfig>,
    /// Bearer JWT schemes by name
    #[serde(default)]
    pub bearer: BTreeMap<String, BearerConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiKeyConfig {
    #[serde(default = "default_api_key_header")]
    pub header_name: String,
    /// Client name to key
    #[serde(default)]
    pub keys: BTreeMap<String, String>,
    /// Single key, identified by the scheme name
    #[serde(default)]
    pub key: Option<String>,
}

fn default_api_key_header() -> String {
    "X-API-Key".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BearerConfig {
    /// HMAC secret inline
    #[serde(default)]
    pub secret: Option<String>,
    /// Environment variable holding the secret; wins over `secret`
    #[serde(default)]
    pub secret_env: Option<String>,
    /// HS256 (default), HS384 or HS512
    #[serde(default)]
    pub algorithm: Option<String>,
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub audience: Option<String>,
    #[serde(default)]
    pub cookie_name: Option<String>,
    #[serde(default)]
    pub leeway_secs: Option<u64>,
}

impl BearerConfig {
    fn resolve_secret(&self, scheme: &str) -> anyhow::Result<String> {
        if let Some(var) = &self.secret_env {
            if let Ok(secret) = env::var(var) {
                return Ok(secret);
            }
        }
        match &self.secret {
            Some(secret) => Ok(secret.clone()),
            None => bail!("bearer scheme '{scheme}' has no secret (set `secret` or `secret_env`)"),
        }
    }

    fn build(&self, scheme: &str) -> anyhow::Result<JwtBearerAuth> {
        let algorithm = match self.algorithm.as_deref() {
            None => Algorithm::HS256,
            Some(name) => Algorithm::from_str(name)
                .with_context(|| format!("bearer scheme '{scheme}': unknown algorithm '{name}'"))?,
        };
        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            bail!("bearer scheme '{scheme}': only HMAC algorithms are supported, got {algorithm:?}");
        }

        let mut auth = JwtBearerAuth::with_algorithm(self.resolve_secret(scheme)?, algorithm);
        if let Some(issuer) = &self.issuer {
            auth = auth.issuer(issuer);
        }
        if let Some(audience) = &self.audience {
            auth = auth.audience(audience);
        }
        if let Some(cookie) = &self.cookie_name {
            auth = auth.cookie_name(cookie.clone());
        }
        if let Some(leeway) = self.leeway_secs {
            auth = auth.leeway(leeway);
        }
        Ok(auth)
    }
}

impl ApiKeyConfig {
    fn build(&self, scheme: &str) -> ApiKeyAuth {
        let mut auth = ApiKeyAuth::new().header_name(self.header_name.clone());
        if let Some(key) = &self.key {
            auth = auth.key(scheme, key.clone());
        }
        for (client, key) in &self.keys {
            auth = auth.key(client.clone(), key.clone());
        }
        auth
    }
}

impl AppConfig {
    /// Parse configuration from YAML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid configuration YAML.
    pub fn from_yaml_str(text: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(text).context("Failed to parse configuration YAML")
    }

    /// Read and parse the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: AppConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        info!(
            path = %path.display(),
            api_key_schemes = config.security.api_keys.len(),
            bearer_schemes = config.security.bearer.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Load the file named by `BRRTR_CONFIG`.
    ///
    /// Returns `Ok(None)` when the variable is unset.
    ///
    /// # Errors
    ///
    /// Returns an error if the named file cannot be read or parsed.
    pub fn load() -> anyhow::Result<Option<Self>> {
        match env::var(CONFIG_ENV_VAR) {
            Ok(path) => Self::load_from(Path::new(&path)).map(Some),
            Err(_) => Ok(None),
        }
    }

    /// Build the handler for the named scheme.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown scheme or an unusable bearer setup.
    pub fn auth_handler(&self, scheme: &str) -> anyhow::Result<Arc<dyn AuthHandler>> {
        if let Some(bearer) = self.security.bearer.get(scheme) {
            return Ok(Arc::new(bearer.build(scheme)?));
        }
        if let Some(api_key) = self.security.api_keys.get(scheme) {
            return Ok(Arc::new(api_key.build(scheme)));
        }
        bail!("no security scheme named '{scheme}' is configured")
    }

    /// [`AuthConfig`] for the named scheme, advertised under the same name.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::auth_handler`].
    pub fn auth(&self, scheme: &str) -> anyhow::Result<AuthConfig> {
        Ok(AuthConfig::from_arc(self.auth_handler(scheme)?).scheme(scheme))
    }

    /// Document info with every configured scheme declared.
    ///
    /// Schemes already declared under `docs.security_schemes` are kept as
    /// written.
    #[must_use]
    pub fn document_info(&self) -> DocumentInfo {
        let mut info = self.docs.clone();
        for name in self.security.bearer.keys() {
            info.security_schemes
                .entry(name.clone())
                .or_insert_with(SecuritySchemeDoc::bearer_jwt);
        }
        for (name, api_key) in &self.security.api_keys {
            info.security_schemes
                .entry(name.clone())
                .or_insert_with(|| SecuritySchemeDoc::api_key_header(api_key.header_name.clone()));
        }
        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
docs:
  title: Pet Store
  version: 1.0.0
security:
  api_keys:
    ApiKeyHeader:
      key: test123
  bearer:
    bearerAuth:
      secret: s3cret
      algorithm: HS384
"#;

    #[test]
    fn test_parse_and_defaults() {
        let config = AppConfig::from_yaml_str(YAML).unwrap();
        assert_eq!(config.docs.title, "Pet Store");
        let api_key = &config.security.api_keys["ApiKeyHeader"];
        assert_eq!(api_key.header_name, "X-API-Key");
        assert_eq!(api_key.key.as_deref(), Some("test123"));
        assert_eq!(
            config.security.bearer["bearerAuth"].algorithm.as_deref(),
            Some("HS384")
        );
    }

    #[test]
    fn test_empty_config() {
        let config = AppConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.docs.title, "API");
    }

    #[test]
    fn test_auth_for_known_and_unknown_schemes() {
        let config = AppConfig::from_yaml_str(YAML).unwrap();
        assert_eq!(config.auth("bearerAuth").unwrap().scheme, "bearerAuth");
        assert_eq!(config.auth("ApiKeyHeader").unwrap().scheme, "ApiKeyHeader");
        assert!(config.auth("oauth2").is_err());
    }

    #[test]
    fn test_bearer_requires_hmac_secret() {
        let missing = BearerConfig::default();
        assert!(missing.build("b").is_err());

        let rsa = BearerConfig {
            secret: Some("x".to_string()),
            algorithm: Some("RS256".to_string()),
            ..BearerConfig::default()
        };
        assert!(rsa.build("b").is_err());
    }

    #[test]
    fn test_document_info_declares_schemes() {
        let config = AppConfig::from_yaml_str(YAML).unwrap();
        let info = config.document_info();
        assert_eq!(
            info.security_schemes["bearerAuth"],
            SecuritySchemeDoc::bearer_jwt()
        );
        assert_eq!(
            info.security_schemes["ApiKeyHeader"],
            SecuritySchemeDoc::api_key_header("X-API-Key")
        );
    }
}
