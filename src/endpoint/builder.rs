use super::{describe_parts, Endpoint, HandlerFn, RequestInputs, Validators};
use crate::docs::{
    normalize_path, DocRegistry, EndpointDoc, EndpointMeta, RequestBodyDoc, ResponseDoc,
};
use crate::security::AuthConfig;
use crate::validator::Schema;
use futures::FutureExt;
use http::Method;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// Builder for [`Endpoint`].
///
/// Each slot's output type is a type parameter that starts as `()` and
/// changes when a validator is attached, so the handler's
/// [`RequestInputs`] carry exactly the types that were configured.
///
/// `body` and `form_data` pick the body slot's type and are only available
/// while it is unset. To configure both, fix the type with one and add the
/// other through [`body_schema`](Self::body_schema) or
/// [`form_schema`](Self::form_schema).
pub struct EndpointBuilder<B = (), Q = (), P = (), H = ()> {
    method: Method,
    path: String,
    validators: Validators<B, Q, P, H>,
    auth: Option<AuthConfig>,
    response: Option<Value>,
    meta: EndpointMeta,
}

impl EndpointBuilder {
    pub(crate) fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: normalize_path(path),
            validators: Validators::default(),
            auth: None,
            response: None,
            meta: EndpointMeta::default(),
        }
    }
}

impl<Q, P, H> EndpointBuilder<(), Q, P, H> {
    /// Validate the JSON body.
    pub fn body<T>(self, schema: impl Schema<T> + 'static) -> EndpointBuilder<T, Q, P, H> {
        self.map_validators(|v| Validators {
            body: Some(Arc::new(schema)),
            form_data: None,
            query: v.query,
            path_params: v.path_params,
            headers: v.headers,
        })
    }

    /// Validate the body as form data; the result is delivered as `body`.
    pub fn form_data<T>(self, schema: impl Schema<T> + 'static) -> EndpointBuilder<T, Q, P, H> {
        self.map_validators(|v| Validators {
            body: None,
            form_data: Some(Arc::new(schema)),
            query: v.query,
            path_params: v.path_params,
            headers: v.headers,
        })
    }
}

impl<B, Q, P, H> EndpointBuilder<B, Q, P, H> {
    fn map_validators<B2, Q2, P2, H2>(
        self,
        f: impl FnOnce(Validators<B, Q, P, H>) -> Validators<B2, Q2, P2, H2>,
    ) -> EndpointBuilder<B2, Q2, P2, H2> {
        EndpointBuilder {
            method: self.method,
            path: self.path,
            validators: f(self.validators),
            auth: self.auth,
            response: self.response,
            meta: self.meta,
        }
    }

    /// Set the JSON body validator for an already typed body slot.
    #[must_use]
    pub fn body_schema(mut self, schema: impl Schema<B> + 'static) -> Self {
        self.validators.body = Some(Arc::new(schema));
        self
    }

    /// Set the form-data validator for an already typed body slot.
    #[must_use]
    pub fn form_schema(mut self, schema: impl Schema<B> + 'static) -> Self {
        self.validators.form_data = Some(Arc::new(schema));
        self
    }

    /// Validate the query string, presented as a flat object of strings.
    pub fn query<T>(self, schema: impl Schema<T> + 'static) -> EndpointBuilder<B, T, P, H> {
        self.map_validators(|v| Validators {
            body: v.body,
            form_data: v.form_data,
            query: Some(Arc::new(schema)),
            path_params: v.path_params,
            headers: v.headers,
        })
    }

    /// Validate the path parameters the router supplies at dispatch.
    pub fn path_params<T>(self, schema: impl Schema<T> + 'static) -> EndpointBuilder<B, Q, T, H> {
        self.map_validators(|v| Validators {
            body: v.body,
            form_data: v.form_data,
            query: v.query,
            path_params: Some(Arc::new(schema)),
            headers: v.headers,
        })
    }

    /// Validate the headers, presented as a flat object keyed by
    /// lower-case name.
    pub fn headers<T>(self, schema: impl Schema<T> + 'static) -> EndpointBuilder<B, Q, P, T> {
        self.map_validators(|v| Validators {
            body: v.body,
            form_data: v.form_data,
            query: v.query,
            path_params: v.path_params,
            headers: Some(Arc::new(schema)),
        })
    }

    #[must_use]
    pub fn auth(mut self, auth: AuthConfig) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Document the 200 body with `schema`'s shape.
    ///
    /// Handler output is not validated against it.
    #[must_use]
    pub fn response<R>(mut self, schema: &impl Schema<R>) -> Self {
        self.response = Some(schema.json_schema());
        self
    }

    /// Document the 200 body with a raw JSON Schema.
    #[must_use]
    pub fn response_json_schema(mut self, schema: Value) -> Self {
        self.response = Some(schema);
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.meta.summary = Some(summary.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.meta.description = Some(description.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.meta.tags.push(tag.into());
        self
    }

    pub fn operation_id(mut self, operation_id: impl Into<String>) -> Self {
        self.meta.operation_id = Some(operation_id.into());
        self
    }

    /// Add or override the documented response for `status`.
    pub fn response_doc(mut self, status: u16, response: ResponseDoc) -> Self {
        self.meta.responses.insert(status.to_string(), response);
        self
    }

    /// Document a request body when no body or form validator describes one.
    #[must_use]
    pub fn request_body_doc(mut self, request_body: RequestBodyDoc) -> Self {
        self.meta.request_body = Some(request_body);
        self
    }

    #[must_use]
    pub fn include_in_docs(mut self, include: bool) -> Self {
        self.meta.include_in_docs = include;
        self
    }

    /// Replace all documentation metadata at once.
    #[must_use]
    pub fn meta(mut self, meta: EndpointMeta) -> Self {
        self.meta = meta;
        self
    }

    /// Documentation view of the endpoint as configured so far.
    #[must_use]
    pub fn describe(&self) -> EndpointDoc {
        describe_parts(
            &self.method,
            &self.path,
            &self.validators,
            self.auth.as_ref(),
            self.response.as_ref(),
            &self.meta,
        )
    }

    /// Record the endpoint in `registry`.
    ///
    /// A no-op for endpoints excluded from the docs.
    pub fn register_docs(self, registry: &DocRegistry) -> Self {
        registry.register(&self.describe());
        self
    }
}

impl<B, Q, P, H> EndpointBuilder<B, Q, P, H>
where
    B: Send + 'static,
    Q: Send + 'static,
    P: Send + 'static,
    H: Send + 'static,
{
    /// Attach the business handler and finish the definition.
    ///
    /// The handler runs only for requests that passed auth and every
    /// validator. Its output is serialized as the 200 body; an `Err` becomes
    /// an opaque 500.
    pub fn handle<F, Fut, R>(self, handler: F) -> Endpoint<B, Q, P, H>
    where
        F: Fn(RequestInputs<B, Q, P, H>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
        R: Serialize + Send + 'static,
    {
        let handler: HandlerFn<B, Q, P, H> = Arc::new(move |inputs: RequestInputs<B, Q, P, H>| {
            let fut = handler(inputs);
            async move {
                let output = fut.await?;
                Ok::<Value, anyhow::Error>(serde_json::to_value(output)?)
            }
            .boxed()
        });
        Endpoint {
            method: self.method,
            path: self.path,
            validators: self.validators,
            auth: self.auth,
            response: self.response,
            meta: self.meta,
            handler,
        }
    }
}
