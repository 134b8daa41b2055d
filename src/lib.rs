//! # brrtendpoint
//!
//! **brrtendpoint** is a typed adapter between HTTP route handlers and a JSON
//! Schema validation capability. It also keeps an
//! [OpenAPI 3.1.0](https://spec.openapis.org/oas/v3.1.0) document up to date as
//! a byproduct of defining endpoints.
//!
//! ## Overview
//!
//! An endpoint declares what it accepts: a JSON body or form data, query
//! string, path parameters, headers, and optionally an auth handler. Every
//! request is checked against those declarations before the business handler
//! runs, so the handler only ever sees validated, typed input. The same
//! declarations feed a documentation registry that synthesizes the API
//! document on demand.
//!
//! The crate does not own a server or a router. The host framework hands over
//! an [`server::IncomingRequest`] (plus any path parameters it extracted) and
//! writes the returned [`server::HandlerResponse`] back out.
//!
//! ## Architecture
//!
//! - **[`endpoint`]** - Endpoint builder and the validation pipeline
//! - **[`validator`]** - The `Schema<T>` capability and its JSON Schema implementation
//! - **[`security`]** - Auth handlers (bearer JWT, API keys) and auth outcomes
//! - **[`docs`]** - Documentation registry and OpenAPI synthesis
//! - **[`server`]** - Request and response types shared with the host
//! - **[`config`]** - YAML configuration for docs and credentials
//! - **[`logging`]** - `tracing-subscriber` setup
//!
//! ### Request Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Host as Host framework
//!     participant EP as Endpoint::dispatch
//!     participant Auth as AuthHandler
//!     participant Val as Schema validators
//!     participant H as Handler
//!
//!     Host->>EP: IncomingRequest + DispatchContext
//!     EP->>Auth: authenticate(request, options)
//!     alt rejected
//!         Auth-->>EP: Rejected { error, status }
//!         EP-->>Host: 401 {"error": ...}
//!     else authenticated
//!         Auth-->>EP: Authenticated { user }
//!         EP->>Val: body → formData, query, pathParams, headers
//!         alt any slot failed
//!             Val-->>EP: errors per slot
//!             EP-->>Host: 400 {"errors": {...}}
//!         else all passed
//!             Val-->>EP: typed values
//!             EP->>H: RequestInputs { body, query, params, headers, user }
//!             H-->>EP: output
//!             EP-->>Host: 200 output
//!         end
//!     end
//!     Note over EP,Host: errors and panics anywhere become 500 {"error": "Internal server error"}
//! ```
//!
//! ### Documentation Flow
//!
//! ```mermaid
//! flowchart LR
//!     Def[EndpointBuilder] -->|register_docs| Reg[(DocRegistry)]
//!     Reg -->|synthesize| Doc[ApiDocument]
//!     Doc --> JSON
//!     Doc --> YAML
//!     Doc --> OAS3[oas3::OpenApiV3Spec]
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use brrtendpoint::docs::{DocRegistry, DocumentInfo};
//! use brrtendpoint::endpoint::{DispatchContext, Endpoint};
//! use brrtendpoint::server::ParsedRequest;
//! use brrtendpoint::validator::JsonSchema;
//! use http::Method;
//! use serde::Deserialize;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[derive(Deserialize)]
//! struct Search { q: String }
//!
//! let registry = DocRegistry::new();
//! let search = Endpoint::get("/pets")
//!     .summary("Search pets")
//!     .query(JsonSchema::<Search>::new(json!({
//!         "type": "object",
//!         "properties": { "q": { "type": "string", "minLength": 2 } },
//!         "required": ["q"]
//!     })).unwrap())
//!     .register_docs(&registry)
//!     .handle(|input| async move {
//!         let q = input.query.map(|s| s.q).unwrap_or_default();
//!         Ok(json!({ "results": [], "q": q }))
//!     });
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! let res = runtime.block_on(search.dispatch(
//!     Arc::new(ParsedRequest::new(Method::GET, "/pets?q=x")),
//!     DispatchContext::new(),
//! ));
//! assert_eq!(res.status, 400);
//!
//! let doc = registry.synthesize(&DocumentInfo::new("Pets", "1.0.0"));
//! assert!(doc.operation(&Method::GET, "/pets").is_some());
//! ```
//!
//! ## Logging
//!
//! Everything is reported through `tracing` with structured fields. Each
//! dispatch runs inside an `endpoint` span carrying the method, path and a
//! ULID request id (reused from `x-request-id` when the caller sent one).
//! Internal failure detail is logged, never returned to the client.

pub mod config;
pub mod docs;
pub mod endpoint;
pub mod ids;
pub mod logging;
pub mod security;
pub mod server;
pub mod validator;

pub use docs::{ApiDocument, DocRegistry, DocumentInfo, OpenApiRoute, RegistrationMode};
pub use endpoint::{DispatchContext, Endpoint, EndpointBuilder, RequestInputs, Route};
pub use security::{ApiKeyAuth, AuthConfig, AuthHandler, AuthOutcome, JwtBearerAuth};
pub use server::{HandlerResponse, IncomingRequest, ParsedRequest};
pub use validator::{JsonSchema, Schema, SchemaError};
