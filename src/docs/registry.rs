use super::descriptor::{
    error_message_schema, parameters_from_schema, validation_error_schema, EndpointDoc,
    OperationDoc, ParameterDoc, ParameterLocation, RequestBodyDoc, ResponseDoc,
};
use super::document::{ApiDocument, DocumentInfo};
use super::path::{normalize_path, path_param_names};
use http::Method;
use parking_lot::RwLock;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// How [`DocRegistry::register`] treats a second entry for the same
/// method and path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistrationMode {
    /// Keep every registration, duplicates included
    #[default]
    Append,
    /// Overwrite the earlier entry in place
    ReplaceByKey,
}

/// A registered endpoint: canonical key plus its rendered operation.
#[derive(Debug, Clone, PartialEq)]
pub struct DocEntry {
    pub method: Method,
    /// Canonical `{name}` template
    pub path: String,
    pub operation: OperationDoc,
}

impl DocEntry {
    /// Build the documentation entry for an endpoint definition.
    ///
    /// Responses start from 400, 401 and 500 (plus 200 when a response
    /// shape is known); custom responses are merged over them by status.
    /// The request body comes from the JSON body schema, else the form
    /// schema, else the custom descriptor.
    #[must_use]
    pub fn from_endpoint(doc: &EndpointDoc) -> Self {
        let path = normalize_path(&doc.path);
        let meta = &doc.meta;

        let mut responses = BTreeMap::new();
        if let Some(schema) = &doc.response {
            responses.insert(
                "200".to_string(),
                ResponseDoc::json("Successful response", schema.clone()),
            );
        }
        responses.insert(
            "400".to_string(),
            ResponseDoc::json("Validation error", validation_error_schema()),
        );
        responses.insert(
            "401".to_string(),
            ResponseDoc::json("Unauthorized", error_message_schema()),
        );
        responses.insert(
            "500".to_string(),
            ResponseDoc::json("Internal server error", error_message_schema()),
        );
        for (status, response) in &meta.responses {
            responses.insert(status.clone(), response.clone());
        }

        let request_body = match (&doc.body, &doc.form_data) {
            (Some(schema), _) => Some(RequestBodyDoc::json(schema.clone())),
            (None, Some(schema)) => Some(RequestBodyDoc::multipart(schema.clone())),
            (None, None) => meta.request_body.clone(),
        };

        let security = doc
            .security_scheme
            .as_ref()
            .map(|scheme| vec![BTreeMap::from([(scheme.clone(), Vec::new())])]);

        let operation = OperationDoc {
            summary: meta.summary.clone(),
            description: meta.description.clone(),
            tags: meta.tags.clone(),
            operation_id: meta.operation_id.clone(),
            parameters: collect_parameters(doc, &path),
            request_body,
            responses,
            security,
        };
        DocEntry {
            method: doc.method.clone(),
            path,
            operation,
        }
    }
}

fn collect_parameters(doc: &EndpointDoc, path: &str) -> Vec<ParameterDoc> {
    let mut params = Vec::new();
    if let Some(schema) = &doc.path_params {
        params.extend(parameters_from_schema(schema, ParameterLocation::Path));
    }
    // Template parameters the schema does not describe are still declared.
    for name in path_param_names(path) {
        let declared = params
            .iter()
            .any(|p| p.location == ParameterLocation::Path && p.name == name);
        if !declared {
            params.push(ParameterDoc {
                name,
                location: ParameterLocation::Path,
                required: true,
                description: None,
                schema: json!({ "type": "string" }),
            });
        }
    }
    if let Some(schema) = &doc.query {
        params.extend(parameters_from_schema(schema, ParameterLocation::Query));
    }
    if let Some(schema) = &doc.headers {
        params.extend(parameters_from_schema(schema, ParameterLocation::Header));
    }
    params
}

/// Ordered collection of documented endpoints.
///
/// Registration happens when endpoints are defined; synthesis reads a
/// snapshot and never mutates. Create one per process (or per test) and pass
/// it by reference or `Arc`.
///
/// ```rust
/// use brrtendpoint::docs::{DocRegistry, DocumentInfo, EndpointDoc};
/// use http::Method;
///
/// let registry = DocRegistry::new();
/// registry.register(&EndpointDoc::new(Method::GET, "/users/[id]"));
/// let doc = registry.synthesize(&DocumentInfo::new("Users", "1.0.0"));
/// assert!(doc.operation(&Method::GET, "/users/{id}").is_some());
/// ```
#[derive(Debug, Default)]
pub struct DocRegistry {
    mode: RegistrationMode,
    entries: RwLock<Vec<DocEntry>>,
}

impl DocRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_mode(mode: RegistrationMode) -> Self {
        Self {
            mode,
            entries: RwLock::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn mode(&self) -> RegistrationMode {
        self.mode
    }

    /// Record an endpoint definition.
    ///
    /// Returns `false` when the endpoint opted out of documentation.
    pub fn register(&self, doc: &EndpointDoc) -> bool {
        if !doc.meta.include_in_docs {
            debug!(method = %doc.method, path = %doc.path, "Endpoint excluded from docs");
            return false;
        }
        let entry = DocEntry::from_endpoint(doc);
        let mut entries = self.entries.write();
        let existing = match self.mode {
            RegistrationMode::Append => None,
            RegistrationMode::ReplaceByKey => entries
                .iter()
                .position(|e| e.method == entry.method && e.path == entry.path),
        };
        debug!(
            method = %entry.method,
            path = %entry.path,
            replaced = existing.is_some(),
            "Endpoint documented"
        );
        match existing {
            Some(index) => entries[index] = entry,
            None => entries.push(entry),
        }
        true
    }

    /// Snapshot of the entries in registration order.
    #[must_use]
    pub fn entries(&self) -> Vec<DocEntry> {
        self.entries.read().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every entry.
    pub fn reset(&self) {
        let mut entries = self.entries.write();
        info!(cleared = entries.len(), "Documentation registry reset");
        entries.clear();
    }

    /// Render the registry into one OpenAPI document.
    ///
    /// Reads a snapshot; calling it repeatedly on an unchanged registry
    /// yields equal documents.
    #[must_use]
    pub fn synthesize(&self, info: &DocumentInfo) -> ApiDocument {
        let entries = self.entries.read();
        ApiDocument::from_entries(info, entries.iter())
    }
}
