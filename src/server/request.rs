use super::response::HeaderVec;
use async_trait::async_trait;
use bytes::Bytes;
use http::Method;
use serde_json::Value;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Maximum number of path/query parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Parameter storage for query strings and extracted path parameters.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Failure to read or decode a request payload at the transport level.
///
/// Distinct from schema rejection: these mean the bytes never became a
/// structured value in the first place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyError {
    /// The transport could not deliver the body
    Read(String),
    /// The body is not valid JSON (an empty body included)
    InvalidJson(String),
    /// `form_data()` was called on a body that is neither urlencoded nor multipart
    UnsupportedContentType(String),
    /// The multipart payload is structurally broken
    InvalidMultipart(String),
}

impl fmt::Display for BodyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyError::Read(msg) => write!(f, "failed to read request body: {msg}"),
            BodyError::InvalidJson(msg) => write!(f, "request body is not valid JSON: {msg}"),
            BodyError::UnsupportedContentType(ct) => {
                write!(f, "content type '{ct}' cannot be decoded as form data")
            }
            BodyError::InvalidMultipart(msg) => write!(f, "malformed multipart body: {msg}"),
        }
    }
}

impl std::error::Error for BodyError {}

/// A file part of a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// One value of a decoded form: plain text or a file-like part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    File(FileUpload),
}

impl FormValue {
    /// JSON view handed to form schemas.
    ///
    /// Files are described rather than inlined; handlers that need the bytes
    /// read them from the raw request.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            FormValue::Text(s) => Value::String(s.clone()),
            FormValue::File(file) => serde_json::json!({
                "filename": file.filename,
                "contentType": file.content_type,
                "size": file.data.len(),
            }),
        }
    }
}

/// The request object the pipeline consumes.
///
/// Host frameworks implement this over their own request type. Reads that
/// touch the transport are async; header and query access is not.
#[async_trait]
pub trait IncomingRequest: Send + Sync {
    /// HTTP method of the request
    fn method(&self) -> &Method;

    /// Request path without the query string
    fn path(&self) -> &str;

    /// All header entries, names lower-cased
    fn headers(&self) -> &[(Arc<str>, String)];

    /// All query-string entries in order of appearance
    fn query_pairs(&self) -> &[(Arc<str>, String)];

    /// Read the whole body as JSON.
    async fn json(&self) -> Result<Value, BodyError>;

    /// Read the body as form data (urlencoded or multipart).
    async fn form_data(&self) -> Result<Vec<(String, FormValue)>, BodyError>;

    /// Header lookup, case-insensitive per RFC 7230.
    fn get_header(&self, name: &str) -> Option<&str> {
        self.headers()
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Cookie lookup from the `cookie` header.
    fn get_cookie(&self, name: &str) -> Option<String> {
        self.get_header("cookie")
            .and_then(|raw| parse_cookies(raw).remove(name))
    }
}

/// In-memory request assembled from raw parts.
///
/// Serves hosts that already buffered the body, and the test suites.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderVec,
    pub query_params: ParamVec,
    pub body: Bytes,
}

impl ParsedRequest {
    /// Start a request for `uri`; the query string, if any, is parsed off.
    #[must_use]
    pub fn new(method: Method, uri: &str) -> Self {
        let path = uri.split('?').next().unwrap_or("/").to_string();
        Self {
            method,
            path,
            headers: HeaderVec::new(),
            query_params: parse_query_params(uri),
            body: Bytes::new(),
        }
    }

    /// Append a header; the name is lower-cased.
    #[must_use]
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers
            .push((Arc::from(name.to_ascii_lowercase()), value.into()));
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Set a JSON body and the matching content type.
    #[must_use]
    pub fn json_body(self, value: &Value) -> Self {
        self.header("content-type", "application/json")
            .body(value.to_string())
    }

    /// Build from an `http::Request` whose body is already buffered.
    #[must_use]
    pub fn from_http(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        let uri = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let mut parsed = Self::new(parts.method, uri);
        for (name, value) in parts.headers.iter() {
            parsed.headers.push((
                Arc::from(name.as_str()),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            ));
        }
        debug!(
            method = %parsed.method,
            path = %parsed.path,
            header_count = parsed.headers.len(),
            query_count = parsed.query_params.len(),
            body_size_bytes = body.len(),
            "HTTP request parsed"
        );
        parsed.body = body;
        parsed
    }

    fn content_type(&self) -> &str {
        self.get_header("content-type").unwrap_or("")
    }
}

#[async_trait]
impl IncomingRequest for ParsedRequest {
    fn method(&self) -> &Method {
        &self.method
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn headers(&self) -> &[(Arc<str>, String)] {
        &self.headers
    }

    fn query_pairs(&self) -> &[(Arc<str>, String)] {
        &self.query_params
    }

    async fn json(&self) -> Result<Value, BodyError> {
        serde_json::from_slice(&self.body).map_err(|e| BodyError::InvalidJson(e.to_string()))
    }

    async fn form_data(&self) -> Result<Vec<(String, FormValue)>, BodyError> {
        let content_type = self.content_type();
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        match mime.as_str() {
            "application/x-www-form-urlencoded" => Ok(url::form_urlencoded::parse(&self.body)
                .map(|(k, v)| (k.into_owned(), FormValue::Text(v.into_owned())))
                .collect()),
            "multipart/form-data" => {
                let boundary = multipart_boundary(content_type).ok_or_else(|| {
                    BodyError::InvalidMultipart("missing boundary parameter".to_string())
                })?;
                parse_multipart(&self.body, &boundary)
            }
            _ => Err(BodyError::UnsupportedContentType(content_type.to_string())),
        }
    }
}

/// Parse a `Cookie` header value into name/value pairs.
#[must_use]
pub fn parse_cookies(raw: &str) -> HashMap<String, String> {
    raw.split(';')
        .filter_map(|pair| {
            let mut parts = pair.trim().splitn(2, '=');
            let name = parts.next()?.trim();
            if name.is_empty() {
                return None;
            }
            let value = parts.next().unwrap_or("").trim().to_string();
            Some((name.to_string(), value))
        })
        .collect()
}

/// Parse the query string of `uri` into ordered, URL-decoded pairs.
///
/// Duplicates are kept; consumers that want a flat map apply last-wins.
#[must_use]
pub fn parse_query_params(uri: &str) -> ParamVec {
    match uri.split_once('?') {
        Some((_, query)) => url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (Arc::from(k.as_ref()), v.into_owned()))
            .collect(),
        None => ParamVec::new(),
    }
}

fn multipart_boundary(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.trim().split_once('=')?;
        if key.trim().eq_ignore_ascii_case("boundary") {
            let value = value.trim().trim_matches('"');
            (!value.is_empty()).then(|| value.to_string())
        } else {
            None
        }
    })
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Split a multipart body into named parts.
///
/// Line breaks may be CRLF or bare LF, and a delimiter line may carry
/// trailing spaces or tabs (RFC 2046 transport padding).
fn parse_multipart(body: &[u8], boundary: &str) -> Result<Vec<(String, FormValue)>, BodyError> {
    let delimiter = format!("--{boundary}");

    let (_, mut rest) = next_delimiter(body, delimiter.as_bytes())
        .ok_or_else(|| BodyError::InvalidMultipart("opening boundary not found".to_string()))?;
    let mut fields = Vec::new();

    loop {
        if rest.starts_with(b"--") {
            return Ok(fields);
        }
        rest = skip_delimiter_line(rest).ok_or_else(|| {
            BodyError::InvalidMultipart("boundary not followed by a line break".to_string())
        })?;
        let (part, after) = next_delimiter(rest, delimiter.as_bytes())
            .ok_or_else(|| BodyError::InvalidMultipart("closing boundary not found".to_string()))?;
        fields.push(parse_part(part)?);
        rest = after;
    }
}

/// Find the next delimiter that starts a line.
///
/// Returns the bytes before it, minus the line break that belongs to the
/// delimiter, and the bytes after it.
fn next_delimiter<'a>(body: &'a [u8], delimiter: &[u8]) -> Option<(&'a [u8], &'a [u8])> {
    let mut offset = 0;
    while let Some(pos) = find_subslice(&body[offset..], delimiter) {
        let at = offset + pos;
        if at == 0 || body[at - 1] == b'\n' {
            let before = &body[..at];
            let before = match before.strip_suffix(b"\n") {
                Some(b) => b.strip_suffix(b"\r").unwrap_or(b),
                None => before,
            };
            return Some((before, &body[at + delimiter.len()..]));
        }
        offset = at + 1;
    }
    None
}

fn skip_delimiter_line(rest: &[u8]) -> Option<&[u8]> {
    let padding = rest
        .iter()
        .take_while(|b| **b == b' ' || **b == b'\t')
        .count();
    let rest = &rest[padding..];
    rest.strip_prefix(b"\r\n").or_else(|| rest.strip_prefix(b"\n"))
}

fn parse_part(part: &[u8]) -> Result<(String, FormValue), BodyError> {
    let (header_end, data_start) = find_subslice(part, b"\r\n\r\n")
        .map(|end| (end, end + 4))
        .or_else(|| find_subslice(part, b"\n\n").map(|end| (end, end + 2)))
        .ok_or_else(|| BodyError::InvalidMultipart("part headers not terminated".to_string()))?;
    let head = std::str::from_utf8(&part[..header_end])
        .map_err(|_| BodyError::InvalidMultipart("part headers are not UTF-8".to_string()))?;
    let data = &part[data_start..];

    let mut name = None;
    let mut filename = None;
    let mut content_type = None;
    for line in head.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if key.eq_ignore_ascii_case("content-disposition") {
            for param in value.split(';').skip(1) {
                if let Some((k, v)) = param.trim().split_once('=') {
                    let v = v.trim().trim_matches('"').to_string();
                    match k.trim() {
                        "name" => name = Some(v),
                        "filename" => filename = Some(v),
                        _ => {}
                    }
                }
            }
        } else if key.eq_ignore_ascii_case("content-type") {
            content_type = Some(value.trim().to_string());
        }
    }

    let name = name.ok_or_else(|| {
        BodyError::InvalidMultipart("part without a content-disposition name".to_string())
    })?;
    let value = match filename {
        Some(filename) => FormValue::File(FileUpload {
            filename,
            content_type,
            data: Bytes::copy_from_slice(data),
        }),
        None => FormValue::Text(
            String::from_utf8(data.to_vec())
                .map_err(|_| BodyError::InvalidMultipart(format!("field '{name}' is not UTF-8")))?,
        ),
    };
    Ok((name, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_cookies() {
        let cookies = parse_cookies("a=b; c=d;;");
        assert_eq!(cookies.get("a"), Some(&"b".to_string()));
        assert_eq!(cookies.get("c"), Some(&"d".to_string()));
        assert_eq!(cookies.len(), 2);
    }

    #[test]
    fn test_parse_query_params_keeps_duplicates_in_order() {
        let q = parse_query_params("/p?x=1&y=hello%20world&x=2");
        let pairs: Vec<(&str, &str)> = q.iter().map(|(k, v)| (k.as_ref(), v.as_str())).collect();
        assert_eq!(pairs, vec![("x", "1"), ("y", "hello world"), ("x", "2")]);
        assert!(parse_query_params("/p").is_empty());
    }

    #[test]
    fn test_from_http_lowercases_and_splits_query() {
        let req = http::Request::builder()
            .method("POST")
            .uri("/users/7?verbose=true")
            .header("X-Trace", "abc")
            .body(Bytes::from_static(b"{}"))
            .unwrap();
        let parsed = ParsedRequest::from_http(req);
        assert_eq!(parsed.path, "/users/7");
        assert_eq!(parsed.get_header("x-trace"), Some("abc"));
        assert_eq!(parsed.query_params[0].1, "true");
    }

    #[tokio::test]
    async fn test_json_rejects_empty_body() {
        let req = ParsedRequest::new(Method::POST, "/x");
        assert!(matches!(req.json().await, Err(BodyError::InvalidJson(_))));
        let req = ParsedRequest::new(Method::POST, "/x").json_body(&json!({"a": 1}));
        assert_eq!(req.json().await.unwrap(), json!({"a": 1}));
    }

    #[tokio::test]
    async fn test_urlencoded_form() {
        let req = ParsedRequest::new(Method::POST, "/f")
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body("name=Fluffy&tags=a+b");
        let form = req.form_data().await.unwrap();
        assert_eq!(form[0], ("name".to_string(), FormValue::Text("Fluffy".to_string())));
        assert_eq!(form[1], ("tags".to_string(), FormValue::Text("a b".to_string())));
    }

    #[tokio::test]
    async fn test_multipart_form_with_file() {
        let body = "--XyZ\r\n\
            Content-Disposition: form-data; name=\"title\"\r\n\r\n\
            holiday\r\n\
            --XyZ\r\n\
            Content-Disposition: form-data; name=\"photo\"; filename=\"cat.png\"\r\n\
            Content-Type: image/png\r\n\r\n\
            PNGDATA\r\n\
            --XyZ--\r\n";
        let req = ParsedRequest::new(Method::POST, "/upload")
            .header("content-type", "multipart/form-data; boundary=\"XyZ\"")
            .body(body);
        let form = req.form_data().await.unwrap();
        assert_eq!(form.len(), 2);
        assert_eq!(form[0].1, FormValue::Text("holiday".to_string()));
        match &form[1].1 {
            FormValue::File(file) => {
                assert_eq!(file.filename, "cat.png");
                assert_eq!(file.content_type.as_deref(), Some("image/png"));
                assert_eq!(&file.data[..], b"PNGDATA");
            }
            other => panic!("expected file part, got {other:?}"),
        }
        assert_eq!(
            form[1].1.to_json(),
            json!({"filename": "cat.png", "contentType": "image/png", "size": 7})
        );
    }

    #[tokio::test]
    async fn test_form_data_errors() {
        let req = ParsedRequest::new(Method::POST, "/f").json_body(&json!({}));
        assert!(matches!(
            req.form_data().await,
            Err(BodyError::UnsupportedContentType(_))
        ));

        let req = ParsedRequest::new(Method::POST, "/f")
            .header("content-type", "multipart/form-data; boundary=abc")
            .body("--abc\r\nContent-Disposition: form-data; name=\"x\"\r\n\r\nno end");
        assert!(matches!(
            req.form_data().await,
            Err(BodyError::InvalidMultipart(_))
        ));
    }

    #[tokio::test]
    async fn test_multipart_tolerates_padding_and_bare_newlines() {
        let body = "preamble\n--b1  \t\n\
            Content-Disposition: form-data; name=\"title\"\n\n\
            holiday\n\
            --b1 \r\n\
            Content-Disposition: form-data; name=\"note\"\r\n\r\n\
            see --b1x inline\r\n\
            --b1--\n";
        let req = ParsedRequest::new(Method::POST, "/upload")
            .header("content-type", "multipart/form-data; boundary=b1")
            .body(body);
        let form = req.form_data().await.unwrap();
        assert_eq!(form.len(), 2);
        assert_eq!(form[0], ("title".to_string(), FormValue::Text("holiday".to_string())));
        assert_eq!(
            form[1],
            ("note".to_string(), FormValue::Text("see --b1x inline".to_string()))
        );
    }

    #[test]
    fn test_get_cookie() {
        let req = ParsedRequest::new(Method::GET, "/").header("Cookie", "session=abc; theme=dark");
        assert_eq!(req.get_cookie("session").as_deref(), Some("abc"));
        assert_eq!(req.get_cookie("missing"), None);
    }
}
