use http::Method;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Media type used for JSON request and response bodies.
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// Media type used for form-data request bodies.
pub const MULTIPART_MEDIA_TYPE: &str = "multipart/form-data";

/// Where a documented parameter travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
}

impl fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterLocation::Path => write!(f, "path"),
            ParameterLocation::Query => write!(f, "query"),
            ParameterLocation::Header => write!(f, "header"),
        }
    }
}

/// Schema wrapper for one media type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaTypeDoc {
    pub schema: Value,
}

/// One documented parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterDoc {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub schema: Value,
}

/// One documented response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseDoc {
    pub description: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub content: BTreeMap<String, MediaTypeDoc>,
}

impl ResponseDoc {
    /// A response without a body.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            content: BTreeMap::new(),
        }
    }

    /// A response with a JSON body of shape `schema`.
    pub fn json(description: impl Into<String>, schema: Value) -> Self {
        Self::new(description).with_content(JSON_MEDIA_TYPE, schema)
    }

    pub fn with_content(mut self, media_type: impl Into<String>, schema: Value) -> Self {
        self.content
            .insert(media_type.into(), MediaTypeDoc { schema });
        self
    }
}

/// A documented request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestBodyDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
    pub content: BTreeMap<String, MediaTypeDoc>,
}

impl RequestBodyDoc {
    /// Required body under a single media type.
    pub fn new(media_type: impl Into<String>, schema: Value) -> Self {
        let mut content = BTreeMap::new();
        content.insert(media_type.into(), MediaTypeDoc { schema });
        Self {
            description: None,
            required: true,
            content,
        }
    }

    #[must_use]
    pub fn json(schema: Value) -> Self {
        Self::new(JSON_MEDIA_TYPE, schema)
    }

    #[must_use]
    pub fn multipart(schema: Value) -> Self {
        Self::new(MULTIPART_MEDIA_TYPE, schema)
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// Documentation metadata attached to an endpoint definition.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointMeta {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub operation_id: Option<String>,
    /// Merged over the standard responses, replacing entries with the same status
    pub responses: BTreeMap<String, ResponseDoc>,
    /// Used only when neither a body nor a form schema is configured
    pub request_body: Option<RequestBodyDoc>,
    /// `false` keeps the endpoint dispatchable but out of the registry
    pub include_in_docs: bool,
}

impl Default for EndpointMeta {
    fn default() -> Self {
        Self {
            summary: None,
            description: None,
            tags: Vec::new(),
            operation_id: None,
            responses: BTreeMap::new(),
            request_body: None,
            include_in_docs: true,
        }
    }
}

/// Everything an endpoint definition exposes for documentation.
///
/// Schemas are the JSON Schema views of the configured validators.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointDoc {
    pub method: Method,
    /// Path as written at definition time (either dialect)
    pub path: String,
    pub body: Option<Value>,
    pub form_data: Option<Value>,
    pub query: Option<Value>,
    pub path_params: Option<Value>,
    pub headers: Option<Value>,
    pub response: Option<Value>,
    /// Security scheme name when auth is configured
    pub security_scheme: Option<String>,
    pub meta: EndpointMeta,
}

impl EndpointDoc {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            form_data: None,
            query: None,
            path_params: None,
            headers: None,
            response: None,
            security_scheme: None,
            meta: EndpointMeta::default(),
        }
    }
}

/// A rendered OpenAPI operation object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterDoc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBodyDoc>,
    pub responses: BTreeMap<String, ResponseDoc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<Vec<BTreeMap<String, Vec<String>>>>,
}

/// Shape of the 400 body: per-slot error detail.
pub(crate) fn validation_error_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "errors": {
                "type": "object",
                "additionalProperties": {}
            }
        },
        "required": ["errors"]
    })
}

/// Shape of the 401 and 500 bodies.
pub(crate) fn error_message_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": { "error": { "type": "string" } },
        "required": ["error"]
    })
}

/// Parameters declared by an object schema's `properties`.
///
/// `required` follows the schema's `required` list, except that path
/// parameters are always required. Non-object schemas declare nothing.
pub(crate) fn parameters_from_schema(
    schema: &Value,
    location: ParameterLocation,
) -> Vec<ParameterDoc> {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Vec::new();
    };
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    properties
        .iter()
        .map(|(name, prop)| ParameterDoc {
            name: name.clone(),
            location,
            required: location == ParameterLocation::Path || required.contains(&name.as_str()),
            description: prop
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string),
            schema: strip_description(prop),
        })
        .collect()
}

fn strip_description(prop: &Value) -> Value {
    match prop {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(k, _)| k.as_str() != "description")
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<Map<String, Value>>(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parameters_follow_required_list() {
        let schema = json!({
            "type": "object",
            "properties": {
                "q": { "type": "string", "minLength": 2, "description": "Search text" },
                "limit": { "type": "integer" }
            },
            "required": ["q"]
        });
        let params = parameters_from_schema(&schema, ParameterLocation::Query);
        let q = params.iter().find(|p| p.name == "q").unwrap();
        assert!(q.required);
        assert_eq!(q.description.as_deref(), Some("Search text"));
        assert_eq!(q.schema, json!({ "type": "string", "minLength": 2 }));
        let limit = params.iter().find(|p| p.name == "limit").unwrap();
        assert!(!limit.required);
    }

    #[test]
    fn test_path_parameters_always_required() {
        let schema = json!({ "type": "object", "properties": { "id": { "type": "string" } } });
        let params = parameters_from_schema(&schema, ParameterLocation::Path);
        assert_eq!(params.len(), 1);
        assert!(params[0].required);
        assert_eq!(
            serde_json::to_value(&params[0]).unwrap()["in"],
            json!("path")
        );
    }

    #[test]
    fn test_non_object_schema_declares_nothing() {
        assert!(parameters_from_schema(&json!({}), ParameterLocation::Header).is_empty());
        assert!(parameters_from_schema(&json!(true), ParameterLocation::Query).is_empty());
    }

    #[test]
    fn test_response_doc_serialization() {
        assert_eq!(
            serde_json::to_value(ResponseDoc::new("No content")).unwrap(),
            json!({ "description": "No content" })
        );
        assert_eq!(
            serde_json::to_value(ResponseDoc::json("Pet", json!({ "type": "object" }))).unwrap(),
            json!({
                "description": "Pet",
                "content": { "application/json": { "schema": { "type": "object" } } }
            })
        );
    }
}
