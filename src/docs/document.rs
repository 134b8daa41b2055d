use super::descriptor::OperationDoc;
use super::registry::DocEntry;
use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// OpenAPI version emitted by synthesis.
pub const OPENAPI_VERSION: &str = "3.1.0";

/// A server entry of the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDoc {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A security scheme declared under `components.securitySchemes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SecuritySchemeDoc {
    /// `type: http`, e.g. bearer tokens
    Http {
        scheme: String,
        #[serde(
            rename = "bearerFormat",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        bearer_format: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    /// `type: apiKey`
    ApiKey {
        name: String,
        #[serde(rename = "in")]
        location: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
}

impl SecuritySchemeDoc {
    /// `Authorization: Bearer` with JWTs.
    #[must_use]
    pub fn bearer_jwt() -> Self {
        SecuritySchemeDoc::Http {
            scheme: "bearer".to_string(),
            bearer_format: Some("JWT".to_string()),
            description: None,
        }
    }

    /// API key carried in header `name`.
    pub fn api_key_header(name: impl Into<String>) -> Self {
        SecuritySchemeDoc::ApiKey {
            name: name.into(),
            location: "header".to_string(),
            description: None,
        }
    }
}

/// Document-level information supplied at synthesis time.
///
/// Missing fields fall back to [`DocumentInfo::default`] when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentInfo {
    pub title: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub servers: Vec<ServerDoc>,
    #[serde(default)]
    pub security_schemes: BTreeMap<String, SecuritySchemeDoc>,
}

impl Default for DocumentInfo {
    fn default() -> Self {
        Self::new("API", "1.0.0")
    }
}

impl DocumentInfo {
    pub fn new(title: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            version: version.into(),
            description: None,
            servers: Vec::new(),
            security_schemes: BTreeMap::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn server(mut self, url: impl Into<String>) -> Self {
        self.servers.push(ServerDoc {
            url: url.into(),
            description: None,
        });
        self
    }

    pub fn security_scheme(mut self, name: impl Into<String>, scheme: SecuritySchemeDoc) -> Self {
        self.security_schemes.insert(name.into(), scheme);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InfoDoc {
    pub title: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentsDoc {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub security_schemes: BTreeMap<String, SecuritySchemeDoc>,
}

impl ComponentsDoc {
    fn is_empty(&self) -> bool {
        self.security_schemes.is_empty()
    }
}

/// Operations of one path, keyed by lower-case method.
pub type PathItemDoc = BTreeMap<String, OperationDoc>;

/// A synthesized OpenAPI 3.1 document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiDocument {
    pub openapi: String,
    pub info: InfoDoc,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<ServerDoc>,
    pub paths: BTreeMap<String, PathItemDoc>,
    #[serde(skip_serializing_if = "ComponentsDoc::is_empty")]
    pub components: ComponentsDoc,
}

impl ApiDocument {
    /// Assemble a document from registry entries in registration order.
    ///
    /// Entries sharing a method and path collapse into one operation; the
    /// later entry wins.
    pub fn from_entries<'a>(
        info: &DocumentInfo,
        entries: impl IntoIterator<Item = &'a DocEntry>,
    ) -> Self {
        let mut paths: BTreeMap<String, PathItemDoc> = BTreeMap::new();
        for entry in entries {
            paths
                .entry(entry.path.clone())
                .or_default()
                .insert(method_key(&entry.method), entry.operation.clone());
        }
        Self {
            openapi: OPENAPI_VERSION.to_string(),
            info: InfoDoc {
                title: info.title.clone(),
                version: info.version.clone(),
                description: info.description.clone(),
            },
            servers: info.servers.clone(),
            paths,
            components: ComponentsDoc {
                security_schemes: info.security_schemes.clone(),
            },
        }
    }

    /// Operation registered for `method` at canonical `path`.
    #[must_use]
    pub fn operation(&self, method: &Method, path: &str) -> Option<&OperationDoc> {
        self.paths.get(path)?.get(&method_key(method))
    }

    /// The document as a JSON value.
    ///
    /// # Errors
    ///
    /// Fails only if a schema embedded in an operation cannot be serialized.
    pub fn to_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// The document as YAML text.
    ///
    /// # Errors
    ///
    /// Returns the `serde_yaml` error if serialization fails.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Parse the document into the typed `oas3` model.
    ///
    /// # Errors
    ///
    /// Fails if the document does not fit the `oas3` model, which points at a
    /// malformed schema supplied by an endpoint.
    pub fn to_oas3(&self) -> anyhow::Result<oas3::OpenApiV3Spec> {
        let value = self.to_json()?;
        Ok(serde_json::from_value(value)?)
    }
}

fn method_key(method: &Method) -> String {
    method.as_str().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_security_scheme_serialization() {
        assert_eq!(
            serde_json::to_value(SecuritySchemeDoc::bearer_jwt()).unwrap(),
            json!({ "type": "http", "scheme": "bearer", "bearerFormat": "JWT" })
        );
        assert_eq!(
            serde_json::to_value(SecuritySchemeDoc::api_key_header("X-API-Key")).unwrap(),
            json!({ "type": "apiKey", "name": "X-API-Key", "in": "header" })
        );
    }

    #[test]
    fn test_document_info_from_yaml() {
        let info: DocumentInfo = serde_yaml::from_str(
            r#"
title: Pet Store
version: 2.0.0
servers:
  - url: https://api.example.com
security_schemes:
  bearerAuth:
    type: http
    scheme: bearer
"#,
        )
        .unwrap();
        assert_eq!(info.title, "Pet Store");
        assert_eq!(info.servers[0].url, "https://api.example.com");
        assert!(matches!(
            info.security_schemes["bearerAuth"],
            SecuritySchemeDoc::Http { .. }
        ));
    }

    #[test]
    fn test_empty_document_shape() {
        let doc = ApiDocument::from_entries(&DocumentInfo::new("Empty", "0.1.0"), []);
        assert_eq!(
            doc.to_json().unwrap(),
            json!({
                "openapi": "3.1.0",
                "info": { "title": "Empty", "version": "0.1.0" },
                "paths": {}
            })
        );
    }
}
