//! # Docs Module
//!
//! Documentation registry and OpenAPI 3.1 synthesis.
//!
//! Endpoints are documented as a side effect of being defined: each
//! definition registers an [`EndpointDoc`] with a [`DocRegistry`], which turns
//! it into a [`DocEntry`] straight away. Dispatch never touches the registry.
//! [`DocRegistry::synthesize`] later renders every entry into one
//! [`ApiDocument`].
//!
//! ## What a registration records
//!
//! - the path in canonical `{name}` form (`/users/[id]` becomes `/users/{id}`)
//! - parameters from the query, path-parameter and header schemas
//! - the request body: JSON body schema, else form schema, else the custom
//!   descriptor
//! - responses 400, 401 and 500, plus 200 when a response shape is known;
//!   custom responses override by status
//! - a security requirement on the endpoint's scheme when auth is configured
//!
//! Endpoints with `include_in_docs = false` are skipped.
//!
//! ## Duplicates
//!
//! The default [`RegistrationMode::Append`] keeps every registration. In the
//! synthesized `paths` object the later of two entries with the same method
//! and path is the one rendered. [`RegistrationMode::ReplaceByKey`] replaces
//! the earlier entry at registration time instead.

mod descriptor;
mod document;
mod path;
mod registry;
mod route;

pub use descriptor::{
    EndpointDoc, EndpointMeta, MediaTypeDoc, OperationDoc, ParameterDoc, ParameterLocation,
    RequestBodyDoc, ResponseDoc, JSON_MEDIA_TYPE, MULTIPART_MEDIA_TYPE,
};
pub use document::{
    ApiDocument, ComponentsDoc, DocumentInfo, InfoDoc, PathItemDoc, SecuritySchemeDoc, ServerDoc,
    OPENAPI_VERSION,
};
pub use path::{normalize_path, path_param_names};
pub use registry::{DocEntry, DocRegistry, RegistrationMode};
pub use route::{DocFormat, OpenApiRoute};
