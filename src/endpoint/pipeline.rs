use super::slots::string_map;
use super::{
    DispatchContext, Endpoint, RequestInputs, Slot, SlotError, SlotErrors, ValidationOutcome,
    INVALID_FORM_DATA, INVALID_JSON_BODY,
};
use crate::ids::{RequestId, REQUEST_ID_HEADER};
use crate::security::{AuthOutcome, DEFAULT_AUTH_FAILURE_STATUS};
use crate::server::{BodyError, FormValue, HandlerResponse, IncomingRequest, UNAUTHORIZED_MESSAGE};
use crate::validator::{Schema, SchemaError};
use futures::FutureExt;
use http::Method;
use serde_json::{Map, Value};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Where the pipeline stopped.
enum Stage {
    /// Auth refused the request
    Rejected(HandlerResponse),
    /// At least one slot failed
    Invalid(HandlerResponse),
    /// The handler ran and produced this body
    Handled(Value),
}

impl<B, Q, P, H> Endpoint<B, Q, P, H>
where
    B: Send + 'static,
    Q: Send + 'static,
    P: Send + 'static,
    H: Send + 'static,
{
    /// Run one request through auth, validation and the handler.
    ///
    /// Never fails: auth rejections, validation failures and unexpected
    /// errors (including panics) are all turned into responses here. The
    /// response carries the request id in `x-request-id`.
    pub async fn dispatch(
        &self,
        request: Arc<dyn IncomingRequest>,
        ctx: DispatchContext,
    ) -> HandlerResponse {
        let request_id = RequestId::for_request(&*request);
        let span = info_span!(
            "endpoint",
            method = %self.method,
            path = %self.path,
            request_id = %request_id
        );
        let started = Instant::now();

        let result = AssertUnwindSafe(self.run(request, ctx, request_id))
            .catch_unwind()
            .instrument(span.clone())
            .await;

        span.in_scope(|| {
            let mut response = match result {
                Ok(Ok(Stage::Handled(body))) => HandlerResponse::ok(body),
                Ok(Ok(Stage::Rejected(response) | Stage::Invalid(response))) => response,
                Ok(Err(err)) => {
                    error!(error = %err, "Unexpected failure while handling request");
                    HandlerResponse::internal_error()
                }
                Err(panic) => {
                    error!(panic = %panic_message(panic.as_ref()), "Handler panicked");
                    HandlerResponse::internal_error()
                }
            };
            response.set_header(REQUEST_ID_HEADER, request_id.to_string());
            info!(
                status = response.status,
                latency_ms = started.elapsed().as_millis() as u64,
                "Request completed"
            );
            response
        })
    }

    async fn run(
        &self,
        request: Arc<dyn IncomingRequest>,
        ctx: DispatchContext,
        request_id: RequestId,
    ) -> anyhow::Result<Stage> {
        let user = match &self.auth {
            None => None,
            Some(auth) => {
                match auth
                    .handler
                    .authenticate(request.as_ref(), &auth.options)
                    .await?
                {
                    AuthOutcome::Authenticated { user } => {
                        debug!(scheme = %auth.scheme, has_user = user.is_some(), "Authenticated");
                        user
                    }
                    AuthOutcome::Rejected { error, status_code } => {
                        let status = status_code.unwrap_or(DEFAULT_AUTH_FAILURE_STATUS);
                        let message = error.as_deref().unwrap_or(UNAUTHORIZED_MESSAGE);
                        warn!(scheme = %auth.scheme, status, error = %message, "Authentication failed");
                        return Ok(Stage::Rejected(HandlerResponse::error(status, message)));
                    }
                }
            }
        };

        let outcome = self.validate(request.as_ref(), &ctx).await;
        if !outcome.is_valid() {
            let failed: Vec<&str> = outcome.errors.slots().map(|s| s.as_str()).collect();
            warn!(slots = ?failed, "Request validation failed");
            return Ok(Stage::Invalid(HandlerResponse::validation_failed(
                outcome.errors.to_json(),
            )));
        }

        let inputs = RequestInputs {
            body: outcome.body,
            query: outcome.query,
            params: outcome.params,
            headers: outcome.headers,
            user,
            request,
            request_id,
        };
        let body = (self.handler)(inputs).await?;
        Ok(Stage::Handled(body))
    }

    /// Run every configured validator against `request`.
    ///
    /// The body and form-data validators run in sequence (form data wins the
    /// body slot when both succeed); query, path parameters and headers run
    /// alongside them. Every applicable slot is evaluated even when another
    /// has already failed.
    pub async fn validate(
        &self,
        request: &dyn IncomingRequest,
        ctx: &DispatchContext,
    ) -> ValidationOutcome<B, Q, P, H> {
        let body_chain = async {
            let mut value = None;
            let mut errors = Vec::new();
            if let Some(schema) = &self.validators.body {
                match read_json(request).await {
                    Ok(raw) => match parse_slot(schema.as_ref(), raw, Slot::Body) {
                        Ok(v) => value = Some(v),
                        Err(e) => errors.push((Slot::Body, e)),
                    },
                    Err(e) => {
                        debug!(error = %e, "Body is not JSON");
                        errors.push((Slot::Body, SlotError::Malformed(INVALID_JSON_BODY)));
                    }
                }
            }
            if let Some(schema) = &self.validators.form_data {
                match request.form_data().await {
                    Ok(fields) => {
                        match parse_slot(schema.as_ref(), form_object(fields), Slot::FormData) {
                            Ok(v) => value = Some(v),
                            Err(e) => errors.push((Slot::FormData, e)),
                        }
                    }
                    Err(e) => {
                        debug!(error = %e, "Body is not form data");
                        errors.push((Slot::FormData, SlotError::Malformed(INVALID_FORM_DATA)));
                    }
                }
            }
            (value, errors)
        };

        let query = async {
            self.validators.query.as_ref().map(|schema| {
                let raw = string_map(
                    request.query_pairs().iter().map(|(k, v)| (k.as_ref(), v.as_str())),
                    false,
                );
                parse_slot(schema.as_ref(), raw, Slot::Query)
            })
        };

        let params = async {
            match (&self.validators.path_params, &ctx.path_params) {
                (Some(schema), Some(supplied)) => {
                    let raw = string_map(
                        supplied.iter().map(|(k, v)| (k.as_ref(), v.as_str())),
                        false,
                    );
                    Some(parse_slot(schema.as_ref(), raw, Slot::PathParams))
                }
                (Some(_), None) => {
                    debug!("No path parameters supplied; pathParams not validated");
                    None
                }
                (None, _) => None,
            }
        };

        let headers = async {
            self.validators.headers.as_ref().map(|schema| {
                let raw = string_map(
                    request.headers().iter().map(|(k, v)| (k.as_ref(), v.as_str())),
                    true,
                );
                parse_slot(schema.as_ref(), raw, Slot::Headers)
            })
        };

        let ((body, body_errors), query, params, headers) =
            futures::join!(body_chain, query, params, headers);

        let mut errors = SlotErrors::default();
        for (slot, err) in body_errors {
            errors.insert(slot, err);
        }
        let query = settle(query, Slot::Query, &mut errors);
        let params = settle(params, Slot::PathParams, &mut errors);
        let headers = settle(headers, Slot::Headers, &mut errors);

        ValidationOutcome {
            body,
            query,
            params,
            headers,
            errors,
        }
    }
}

/// Read the body as JSON; GET and HEAD carry none and validate `{}`.
async fn read_json(request: &dyn IncomingRequest) -> Result<Value, BodyError> {
    if matches!(*request.method(), Method::GET | Method::HEAD) {
        return Ok(Value::Object(Map::new()));
    }
    request.json().await
}

fn parse_slot<T>(schema: &dyn Schema<T>, raw: Value, slot: Slot) -> Result<T, SlotError> {
    schema.parse(raw).map_err(|e: SchemaError| {
        debug!(slot = %slot, issues = e.issues().len(), "Schema rejected slot");
        SlotError::Rejected(e)
    })
}

fn settle<T>(
    result: Option<Result<T, SlotError>>,
    slot: Slot,
    errors: &mut SlotErrors,
) -> Option<T> {
    match result? {
        Ok(value) => Some(value),
        Err(err) => {
            errors.insert(slot, err);
            None
        }
    }
}

/// Form fields as a JSON object; repeated names keep the last value.
fn form_object(fields: Vec<(String, FormValue)>) -> Value {
    let mut map = Map::new();
    for (name, value) in fields {
        map.insert(name, value.to_json());
    }
    Value::Object(map)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
