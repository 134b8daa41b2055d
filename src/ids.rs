use crate::server::IncomingRequest;
use std::fmt;
use tracing::debug;
use ulid::Ulid;

/// Header a caller uses to correlate its own logs with ours.
///
/// Read on the way in, always written on the way out.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Correlation id of one dispatch.
///
/// Recorded on the `endpoint` span, handed to the handler and echoed in the
/// response, so auth, validation and handler log lines of a request join up.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct RequestId(Ulid);

impl RequestId {
    /// Id for `request`.
    ///
    /// A ULID in `x-request-id` is adopted so ids survive a hop between
    /// services. Anything else in that header is ignored.
    #[must_use]
    pub fn for_request(request: &dyn IncomingRequest) -> Self {
        let Some(raw) = request.get_header(REQUEST_ID_HEADER) else {
            return Self::mint();
        };
        match Ulid::from_string(raw.trim()) {
            Ok(ulid) => Self(ulid),
            Err(err) => {
                debug!(header = raw, error = %err, "Ignoring malformed x-request-id");
                Self::mint()
            }
        }
    }

    #[must_use]
    pub fn mint() -> Self {
        Self(Ulid::new())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::ParsedRequest;
    use http::Method;

    #[test]
    fn test_caller_ulid_is_adopted() {
        let sent = Ulid::new().to_string();
        let req = ParsedRequest::new(Method::GET, "/").header("X-Request-Id", format!(" {sent} "));
        assert_eq!(RequestId::for_request(&req).to_string(), sent);
    }

    #[test]
    fn test_missing_or_malformed_header_mints() {
        let bare = ParsedRequest::new(Method::GET, "/");
        let junk = ParsedRequest::new(Method::GET, "/").header(REQUEST_ID_HEADER, "req-42");

        let a = RequestId::for_request(&bare);
        let b = RequestId::for_request(&junk);
        assert_ne!(a, b);
        assert_ne!(b.to_string(), "req-42");
        assert_eq!(b.to_string().len(), 26);
    }
}
