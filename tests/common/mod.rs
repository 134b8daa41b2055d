#![allow(dead_code)]

pub mod requests {
    use brrtendpoint::server::{IncomingRequest, ParsedRequest};
    use http::Method;
    use serde_json::Value;
    use std::sync::Arc;

    pub fn get(uri: &str) -> ParsedRequest {
        ParsedRequest::new(Method::GET, uri)
    }

    pub fn post_json(uri: &str, body: &Value) -> ParsedRequest {
        ParsedRequest::new(Method::POST, uri).json_body(body)
    }

    pub fn post_raw(uri: &str, content_type: &str, body: &'static str) -> ParsedRequest {
        ParsedRequest::new(Method::POST, uri)
            .header("content-type", content_type)
            .body(body)
    }

    pub fn shared(req: ParsedRequest) -> Arc<dyn IncomingRequest> {
        Arc::new(req)
    }
}

pub mod schemas {
    use brrtendpoint::validator::JsonSchema;
    use serde::Deserialize;
    use serde_json::{json, Value};

    #[derive(Debug, Clone, Deserialize, PartialEq)]
    pub struct FooBody {
        pub foo: String,
    }

    #[derive(Debug, Clone, Deserialize, PartialEq)]
    pub struct Search {
        pub q: String,
    }

    #[derive(Debug, Clone, Deserialize, PartialEq)]
    pub struct UserId {
        pub id: String,
    }

    #[derive(Debug, Clone, Deserialize, PartialEq)]
    pub struct TraceHeaders {
        #[serde(rename = "x-trace-id")]
        pub trace_id: String,
    }

    pub fn foo_body() -> JsonSchema<FooBody> {
        JsonSchema::new(json!({
            "type": "object",
            "properties": { "foo": { "type": "string" } },
            "required": ["foo"]
        }))
        .unwrap()
    }

    pub fn search_query() -> JsonSchema<Search> {
        JsonSchema::new(json!({
            "type": "object",
            "properties": { "q": { "type": "string", "minLength": 2 } },
            "required": ["q"]
        }))
        .unwrap()
    }

    pub fn user_id_params() -> JsonSchema<UserId> {
        JsonSchema::new(json!({
            "type": "object",
            "properties": { "id": { "type": "string", "pattern": "^[0-9]+$" } },
            "required": ["id"]
        }))
        .unwrap()
    }

    pub fn trace_headers() -> JsonSchema<TraceHeaders> {
        JsonSchema::new(json!({
            "type": "object",
            "properties": {
                "x-trace-id": { "type": "string", "pattern": "^[a-f0-9]{8}$" }
            },
            "required": ["x-trace-id"]
        }))
        .unwrap()
    }

    pub fn untyped(schema: Value) -> JsonSchema {
        JsonSchema::untyped(schema).unwrap()
    }
}

pub mod auth {
    use async_trait::async_trait;
    use brrtendpoint::security::{AuthHandler, AuthOutcome};
    use brrtendpoint::server::IncomingRequest;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Returns a fixed outcome and counts calls.
    pub struct FixedAuth {
        pub outcome: AuthOutcome,
        pub calls: Arc<AtomicUsize>,
    }

    impl FixedAuth {
        pub fn new(outcome: AuthOutcome) -> Self {
            Self {
                outcome,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl AuthHandler for FixedAuth {
        async fn authenticate(
            &self,
            _req: &dyn IncomingRequest,
            _options: &Value,
        ) -> anyhow::Result<AuthOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.outcome.clone())
        }
    }

    /// Always fails unexpectedly.
    pub struct BrokenAuth;

    #[async_trait]
    impl AuthHandler for BrokenAuth {
        async fn authenticate(
            &self,
            _req: &dyn IncomingRequest,
            _options: &Value,
        ) -> anyhow::Result<AuthOutcome> {
            anyhow::bail!("identity provider unreachable at 10.0.0.7")
        }
    }
}

pub mod counters {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Default)]
    pub struct CallCounter(Arc<AtomicUsize>);

    impl CallCounter {
        pub fn hit(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }

        pub fn count(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }
}
