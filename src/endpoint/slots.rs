use crate::ids::RequestId;
use crate::server::{IncomingRequest, ParamVec};
use crate::validator::SchemaError;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Recorded under `body` when the body cannot be read or parsed as JSON.
pub const INVALID_JSON_BODY: &str = "Invalid JSON body";

/// Recorded under `formData` when the body cannot be decoded as a form.
pub const INVALID_FORM_DATA: &str = "Invalid form data";

/// A validation slot, named as it appears in the 400 error mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Slot {
    Body,
    FormData,
    Query,
    PathParams,
    Headers,
}

impl Slot {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Body => "body",
            Slot::FormData => "formData",
            Slot::Query => "query",
            Slot::PathParams => "pathParams",
            Slot::Headers => "headers",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why one slot failed.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotError {
    /// The raw payload never became a value; carries a fixed sentinel
    Malformed(&'static str),
    /// The schema refused the value
    Rejected(SchemaError),
}

impl SlotError {
    /// Payload under the slot's key: the sentinel string or the issue tree.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            SlotError::Malformed(sentinel) => Value::String((*sentinel).to_string()),
            SlotError::Rejected(err) => err.format(),
        }
    }
}

impl Serialize for SlotError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SlotError::Malformed(sentinel) => serializer.serialize_str(sentinel),
            SlotError::Rejected(err) => err.serialize(serializer),
        }
    }
}

/// Per-slot failures of one request. Empty means the request may dispatch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotErrors(BTreeMap<Slot, SlotError>);

impl SlotErrors {
    pub fn insert(&mut self, slot: Slot, error: SlotError) {
        self.0.insert(slot, error);
    }

    #[must_use]
    pub fn get(&self, slot: Slot) -> Option<&SlotError> {
        self.0.get(&slot)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Failed slots in a stable order.
    pub fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.0.keys().copied()
    }

    /// The mapping placed under `errors` in a 400 body.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(slot, err)| (slot.as_str().to_string(), err.to_json()))
                .collect::<Map<String, Value>>(),
        )
    }
}

impl Serialize for SlotErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(slot, err)| (slot.as_str(), err)))
    }
}

/// Result of running every configured validator against one request.
///
/// Values are present only for slots that were configured and succeeded.
/// Form data that validates lands in `body`.
#[derive(Debug)]
pub struct ValidationOutcome<B, Q, P, H> {
    pub body: Option<B>,
    pub query: Option<Q>,
    pub params: Option<P>,
    pub headers: Option<H>,
    pub errors: SlotErrors,
}

impl<B, Q, P, H> ValidationOutcome<B, Q, P, H> {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// What a handler receives once the request has passed every gate.
pub struct RequestInputs<B, Q, P, H> {
    pub body: Option<B>,
    pub query: Option<Q>,
    pub params: Option<P>,
    pub headers: Option<H>,
    /// Set by the auth handler; `None` for anonymous access or no auth
    pub user: Option<Value>,
    /// The untouched incoming request
    pub request: Arc<dyn IncomingRequest>,
    pub request_id: RequestId,
}

impl<B, Q, P, H> fmt::Debug for RequestInputs<B, Q, P, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestInputs")
            .field("has_body", &self.body.is_some())
            .field("has_query", &self.query.is_some())
            .field("has_params", &self.params.is_some())
            .field("has_headers", &self.headers.is_some())
            .field("user", &self.user)
            .field("method", self.request.method())
            .field("path", &self.request.path())
            .field("request_id", &self.request_id)
            .finish()
    }
}

/// Per-call information the host's router supplies alongside the request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchContext {
    /// Extracted path parameters; `None` when the router provided none
    pub path_params: Option<ParamVec>,
}

impl DispatchContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path_params<K, V>(params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            path_params: Some(
                params
                    .into_iter()
                    .map(|(k, v)| (Arc::from(k.as_ref()), v.into()))
                    .collect(),
            ),
        }
    }
}

/// Flatten `pairs` into a JSON object of strings; later keys overwrite
/// earlier ones.
pub(crate) fn string_map<'a>(
    pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    lowercase_keys: bool,
) -> Value {
    let mut map = Map::new();
    for (key, value) in pairs {
        let key = if lowercase_keys {
            key.to_ascii_lowercase()
        } else {
            key.to_string()
        };
        map.insert(key, Value::String(value.to_string()));
    }
    Value::Object(map)
}
