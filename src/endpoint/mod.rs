//! # Endpoint Module
//!
//! Typed endpoints: a method and path, up to five validators, optional auth,
//! documentation metadata, and an async handler that only ever sees validated
//! input.
//!
//! ## Request Flow
//!
//! ```text
//! request ─► auth gate ──reject──► {"error": ...}          (401 / handler's status)
//!               │
//!               ▼
//!        ┌─ body ─► formData ─┐
//!        ├─ query             │  evaluated together, no fail-fast
//!        ├─ pathParams        │
//!        └─ headers ──────────┘
//!               │
//!          any errors? ──yes──► {"errors": {<slot>: ...}} (400)
//!               │
//!               ▼
//!           handler ─────────► output verbatim           (200)
//!
//! anything unexpected along the way ──► {"error": "Internal server error"} (500)
//! ```
//!
//! ## Defining an endpoint
//!
//! ```rust
//! use brrtendpoint::endpoint::{DispatchContext, Endpoint};
//! use brrtendpoint::server::ParsedRequest;
//! use brrtendpoint::validator::JsonSchema;
//! use http::Method;
//! use serde::Deserialize;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[derive(Deserialize)]
//! struct Greeting { name: String }
//!
//! let endpoint = Endpoint::post("/greet")
//!     .body(JsonSchema::<Greeting>::new(json!({
//!         "type": "object",
//!         "properties": { "name": { "type": "string" } },
//!         "required": ["name"]
//!     })).unwrap())
//!     .handle(|input| async move {
//!         let name = input.body.map(|g| g.name).unwrap_or_default();
//!         Ok(json!({ "message": format!("hello {name}") }))
//!     });
//!
//! # tokio_test_block(async {
//! let req = ParsedRequest::new(Method::POST, "/greet").json_body(&json!({ "name": "Ada" }));
//! let res = endpoint.dispatch(Arc::new(req), DispatchContext::new()).await;
//! assert_eq!(res.status, 200);
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) {
//! #     tokio::runtime::Runtime::new().unwrap().block_on(f);
//! # }
//! ```

use crate::docs::{EndpointDoc, EndpointMeta};
use crate::security::AuthConfig;
use crate::server::{HandlerResponse, IncomingRequest};
use crate::validator::Schema;
use futures::future::BoxFuture;
use http::Method;
use serde_json::Value;
use std::sync::Arc;

mod builder;
mod pipeline;
mod slots;

pub use builder::EndpointBuilder;
pub use slots::{
    DispatchContext, RequestInputs, Slot, SlotError, SlotErrors, ValidationOutcome,
    INVALID_FORM_DATA, INVALID_JSON_BODY,
};

/// Type-erased handler: validated inputs in, JSON out.
pub type HandlerFn<B, Q, P, H> =
    Arc<dyn Fn(RequestInputs<B, Q, P, H>) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync>;

/// The validators configured on an endpoint, one per slot.
///
/// The body and form-data validators share an output type because a form
/// value is delivered in the body slot.
pub(crate) struct Validators<B, Q, P, H> {
    pub body: Option<Arc<dyn Schema<B>>>,
    pub form_data: Option<Arc<dyn Schema<B>>>,
    pub query: Option<Arc<dyn Schema<Q>>>,
    pub path_params: Option<Arc<dyn Schema<P>>>,
    pub headers: Option<Arc<dyn Schema<H>>>,
}

impl<B, Q, P, H> Default for Validators<B, Q, P, H> {
    fn default() -> Self {
        Self {
            body: None,
            form_data: None,
            query: None,
            path_params: None,
            headers: None,
        }
    }
}

impl<B, Q, P, H> Clone for Validators<B, Q, P, H> {
    fn clone(&self) -> Self {
        Self {
            body: self.body.clone(),
            form_data: self.form_data.clone(),
            query: self.query.clone(),
            path_params: self.path_params.clone(),
            headers: self.headers.clone(),
        }
    }
}

impl<B, Q, P, H> Validators<B, Q, P, H> {
    fn describe(&self, doc: &mut EndpointDoc) {
        doc.body = self.body.as_ref().map(|s| s.json_schema());
        doc.form_data = self.form_data.as_ref().map(|s| s.json_schema());
        doc.query = self.query.as_ref().map(|s| s.json_schema());
        doc.path_params = self.path_params.as_ref().map(|s| s.json_schema());
        doc.headers = self.headers.as_ref().map(|s| s.json_schema());
    }
}

/// A fully defined endpoint.
///
/// Built with [`Endpoint::builder`] (or the per-method shortcuts) and
/// finished with [`EndpointBuilder::handle`]. Cloning is cheap; validators
/// and the handler are shared.
pub struct Endpoint<B = (), Q = (), P = (), H = ()> {
    method: Method,
    path: String,
    validators: Validators<B, Q, P, H>,
    auth: Option<AuthConfig>,
    response: Option<Value>,
    meta: EndpointMeta,
    handler: HandlerFn<B, Q, P, H>,
}

impl<B, Q, P, H> Clone for Endpoint<B, Q, P, H> {
    fn clone(&self) -> Self {
        Self {
            method: self.method.clone(),
            path: self.path.clone(),
            validators: self.validators.clone(),
            auth: self.auth.clone(),
            response: self.response.clone(),
            meta: self.meta.clone(),
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<B, Q, P, H> std::fmt::Debug for Endpoint<B, Q, P, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("auth", &self.auth)
            .field("include_in_docs", &self.meta.include_in_docs)
            .finish_non_exhaustive()
    }
}

impl Endpoint {
    /// Start defining an endpoint for `method` at `path`.
    ///
    /// `path` may use either `[name]` or `{name}` parameters; it is stored
    /// in the `{name}` form.
    pub fn builder(method: Method, path: impl Into<String>) -> EndpointBuilder {
        EndpointBuilder::new(method, &path.into())
    }

    pub fn get(path: impl Into<String>) -> EndpointBuilder {
        Self::builder(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> EndpointBuilder {
        Self::builder(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> EndpointBuilder {
        Self::builder(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> EndpointBuilder {
        Self::builder(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> EndpointBuilder {
        Self::builder(Method::DELETE, path)
    }
}

impl<B, Q, P, H> Endpoint<B, Q, P, H> {
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path in canonical `{name}` form.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn meta(&self) -> &EndpointMeta {
        &self.meta
    }

    /// Documentation view of this endpoint.
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
}

fn describe_parts<B, Q, P, H>(
    method: &Method,
    path: &str,
    validators: &Validators<B, Q, P, H>,
    auth: Option<&AuthConfig>,
    response: Option<&Value>,
    meta: &EndpointMeta,
) -> EndpointDoc {
    let mut doc = EndpointDoc::new(method.clone(), path);
    validators.describe(&mut doc);
    doc.response = response.cloned();
    doc.security_scheme = auth.map(|a| a.scheme.clone());
    doc.meta = meta.clone();
    doc
}

/// A dispatchable route as seen by a host router.
///
/// Implemented by every [`Endpoint`] and by [`crate::docs::OpenApiRoute`],
/// so a router can hold them side by side as `Arc<dyn Route>`.
pub trait Route: Send + Sync {
    fn method(&self) -> &Method;

    /// Path in canonical `{name}` form.
    fn path(&self) -> &str;

    /// Run the request through this route.
    fn call(
        &self,
        request: Arc<dyn IncomingRequest>,
        ctx: DispatchContext,
    ) -> BoxFuture<'_, HandlerResponse>;

    /// Documentation view, if the route has one.
    fn describe(&self) -> Option<EndpointDoc> {
        None
    }
}

impl<B, Q, P, H> Route for Endpoint<B, Q, P, H>
where
    B: Send + 'static,
    Q: Send + 'static,
    P: Send + 'static,
    H: Send + 'static,
{
    fn method(&self) -> &Method {
        &self.method
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn call(
        &self,
        request: Arc<dyn IncomingRequest>,
        ctx: DispatchContext,
    ) -> BoxFuture<'_, HandlerResponse> {
        Box::pin(self.dispatch(request, ctx))
    }

    fn describe(&self) -> Option<EndpointDoc> {
        Some(Endpoint::describe(self))
    }
}
