//! # Server Module
//!
//! The request and response types the pipeline exchanges with its host.
//!
//! The transport itself belongs to the host framework: it implements
//! [`IncomingRequest`] over its own request type (or buffers into a
//! [`ParsedRequest`]) and writes the returned [`HandlerResponse`] back out.

pub mod request;
pub mod response;

pub use request::{
    parse_cookies, parse_query_params, BodyError, FileUpload, FormValue, IncomingRequest,
    ParamVec, ParsedRequest, MAX_INLINE_PARAMS,
};
pub use response::{
    HandlerResponse, HeaderVec, INTERNAL_ERROR_MESSAGE, MAX_INLINE_HEADERS, UNAUTHORIZED_MESSAGE,
};
