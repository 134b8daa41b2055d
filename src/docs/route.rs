use super::document::DocumentInfo;
use super::registry::DocRegistry;
use crate::endpoint::{DispatchContext, Route};
use crate::server::{HandlerResponse, IncomingRequest};
use futures::future::BoxFuture;
use http::Method;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error};

/// Serialization served by [`OpenApiRoute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocFormat {
    #[default]
    Json,
    /// YAML text as a JSON string body, with `content-type: text/yaml`
    Yaml,
}

/// `GET` route that serves the synthesized document.
///
/// The document is synthesized on every call, so endpoints registered after
/// the route was created still show up.
#[derive(Debug, Clone)]
pub struct OpenApiRoute {
    method: Method,
    path: String,
    registry: Arc<DocRegistry>,
    info: DocumentInfo,
    format: DocFormat,
}

impl OpenApiRoute {
    pub fn new(path: impl Into<String>, registry: Arc<DocRegistry>, info: DocumentInfo) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            registry,
            info,
            format: DocFormat::Json,
        }
    }

    #[must_use]
    pub fn format(mut self, format: DocFormat) -> Self {
        self.format = format;
        self
    }

    /// Synthesize and render the document.
    #[must_use]
    pub fn render(&self) -> HandlerResponse {
        let document = self.registry.synthesize(&self.info);
        debug!(
            operations = document.paths.values().map(|p| p.len()).sum::<usize>(),
            format = ?self.format,
            "Serving API document"
        );
        match self.format {
            DocFormat::Json => match document.to_json() {
                Ok(body) => HandlerResponse::ok(body),
                Err(e) => {
                    error!(error = %e, "Failed to serialize API document as JSON");
                    HandlerResponse::internal_error()
                }
            },
            DocFormat::Yaml => match document.to_yaml() {
                Ok(text) => {
                    let mut response = HandlerResponse::ok(Value::String(text));
                    response.set_header("content-type", "text/yaml".to_string());
                    response
                }
                Err(e) => {
                    error!(error = %e, "Failed to serialize API document as YAML");
                    HandlerResponse::internal_error()
                }
            },
        }
    }
}

impl Route for OpenApiRoute {
    fn method(&self) -> &Method {
        &self.method
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn call(
        &self,
        _request: Arc<dyn IncomingRequest>,
        _ctx: DispatchContext,
    ) -> BoxFuture<'_, HandlerResponse> {
        Box::pin(async move { self.render() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::EndpointDoc;
    use crate::server::ParsedRequest;

    fn registry() -> Arc<DocRegistry> {
        let registry = Arc::new(DocRegistry::new());
        registry.register(&EndpointDoc::new(Method::GET, "/pets"));
        registry
    }

    #[tokio::test]
    async fn test_json_document_served() {
        let route = OpenApiRoute::new("/openapi.json", registry(), DocumentInfo::new("Pets", "1.0.0"));
        let req: Arc<dyn IncomingRequest> = Arc::new(ParsedRequest::new(Method::GET, "/openapi.json"));
        let res = route.call(req, DispatchContext::new()).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["info"]["title"], "Pets");
        assert!(res.body["paths"]["/pets"]["get"].is_object());
    }

    #[tokio::test]
    async fn test_late_registration_visible() {
        let registry = registry();
        let route = OpenApiRoute::new("/openapi.json", Arc::clone(&registry), DocumentInfo::default());
        registry.register(&EndpointDoc::new(Method::POST, "/pets"));
        let res = route.render();
        assert!(res.body["paths"]["/pets"]["post"].is_object());
    }

    #[test]
    fn test_yaml_format() {
        let route = OpenApiRoute::new("/openapi.yaml", registry(), DocumentInfo::default())
            .format(DocFormat::Yaml);
        let res = route.render();
        assert_eq!(res.get_header("content-type"), Some("text/yaml"));
        let text = res.body.as_str().unwrap();
        assert!(text.contains("openapi: 3.1.0"));
        assert_eq!(Route::method(&route), &Method::GET);
    }
}
