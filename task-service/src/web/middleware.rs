use axum::body::{Body, Bytes, HttpBody};
use axum::extract::{FromRequest, Multipart, Query, Request, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderName, Uri};
use axum::middleware::Next;
use axum::response::Response;
use futures::{StreamExt, future, stream};
use regex::Regex;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

const MASK: &str = "***";
const BODY_TOO_LARGE: &str = "<body too large>";
const BODY_UNREADABLE: &str = "<body unreadable>";

/// Largest body the logger buffers, matching axum's default extractor limit.
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Redacts the values of configured JSON fields in serialized text.
///
/// This is a textual substitution over `"field" : "value"` occurrences, so it
/// works on bodies, parameters and multipart parts alike without parsing them.
#[derive(Clone, Debug)]
pub struct FieldMasker {
    pattern: Option<Regex>,
}

impl FieldMasker {
    pub fn new<I, S>(fields: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let alternatives: Vec<String> = fields
            .into_iter()
            .map(|field| regex::escape(field.as_ref()))
            .filter(|field| !field.is_empty())
            .collect();
        if alternatives.is_empty() {
            return Ok(Self { pattern: None });
        }
        let pattern = Regex::new(&format!(
            r#"("(?:{})")\s*:\s*"(?:[^"\\]|\\.)*""#,
            alternatives.join("|")
        ))?;
        Ok(Self {
            pattern: Some(pattern),
        })
    }

    pub fn mask<'a>(&self, text: &'a str) -> Cow<'a, str> {
        match &self.pattern {
            Some(pattern) => pattern.replace_all(text, r#"$1 : "***""#),
            None => Cow::Borrowed(text),
        }
    }
}

/// Settings of the request/response logging middleware.
#[derive(Clone, Debug)]
pub struct RequestLogger {
    scope: String,
    masker: FieldMasker,
    sensitive_headers: Vec<HeaderName>,
    body_limit: usize,
}

impl RequestLogger {
    pub fn new(scope: impl Into<String>, masker: FieldMasker, sensitive_headers: Vec<HeaderName>) -> Self {
        Self {
            scope: scope.into(),
            masker,
            sensitive_headers,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Bodies longer than `limit` bytes are passed through without being captured.
    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    /// Returns true if requests to `path` are logged.
    pub fn applies_to(&self, path: &str) -> bool {
        path.starts_with(&self.scope)
    }

    fn is_sensitive(&self, name: &HeaderName) -> bool {
        *name == AUTHORIZATION || self.sensitive_headers.contains(name)
    }

    fn request_headers(&self, headers: &HeaderMap) -> Vec<(String, String)> {
        headers
            .iter()
            .map(|(name, value)| {
                let rendered = if value.is_sensitive() || self.is_sensitive(name) {
                    MASK.to_string()
                } else {
                    self.masker
                        .mask(&String::from_utf8_lossy(value.as_bytes()))
                        .into_owned()
                };
                (name.to_string(), rendered)
            })
            .collect()
    }

    fn parameters(&self, uri: &Uri) -> BTreeMap<String, String> {
        let Ok(Query(pairs)) = Query::<Vec<(String, String)>>::try_from_uri(uri) else {
            return BTreeMap::new();
        };
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (key, value) in pairs {
            grouped.entry(key).or_default().push(value);
        }
        grouped
            .into_iter()
            .map(|(key, values)| {
                let rendered = format!("[{}]", values.join(", "));
                (key, self.masker.mask(&rendered).into_owned())
            })
            .collect()
    }

    fn body(&self, bytes: &Bytes) -> String {
        self.masker.mask(&String::from_utf8_lossy(bytes)).into_owned()
    }
}

/// One combined request/response log record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogEntry {
    pub method: String,
    pub path: String,
    pub parameters: BTreeMap<String, String>,
    pub parts: BTreeMap<String, String>,
    pub request_headers: Vec<(String, String)>,
    pub request_body: String,
    pub status: u16,
    pub response_headers: Vec<(String, String)>,
    pub response_body: String,
}

fn write_pairs<'a>(
    f: &mut fmt::Formatter<'_>,
    pairs: impl IntoIterator<Item = (&'a String, &'a String)>,
) -> fmt::Result {
    f.write_str("{")?;
    for (index, (key, value)) in pairs.into_iter().enumerate() {
        if index > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{key}: {value}")?;
    }
    f.write_str("}")
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "REQUEST:")?;
        writeln!(f, "{} {}", self.method, self.path)?;
        f.write_str("parameters: ")?;
        write_pairs(f, &self.parameters)?;
        f.write_str("\nparts: ")?;
        write_pairs(f, &self.parts)?;
        f.write_str("\nheaders:\n")?;
        write_pairs(f, self.request_headers.iter().map(|(k, v)| (k, v)))?;
        writeln!(f, "\nbody:")?;
        writeln!(f, "{}", self.request_body)?;
        writeln!(f, "RESPONSE: {}", self.status)?;
        f.write_str("headers:\n")?;
        write_pairs(f, self.response_headers.iter().map(|(k, v)| (k, v)))?;
        writeln!(f, "\nbody:")?;
        f.write_str(&self.response_body)
    }
}

/// Collects the `application/json` parts of a multipart body. Failures yield no parts.
async fn extract_json_parts(headers: &HeaderMap, body: Bytes) -> BTreeMap<String, String> {
    let mut parts = BTreeMap::new();
    let is_multipart = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|content_type| content_type.starts_with("multipart/form-data"));
    if !is_multipart {
        return parts;
    }

    let mut request = Request::new(Body::from(body));
    *request.headers_mut() = headers.clone();
    let Ok(mut multipart) = Multipart::from_request(request, &()).await else {
        return parts;
    };
    while let Ok(Some(field)) = multipart.next_field().await {
        let is_json = field.content_type() == Some("application/json");
        let name = field.name().unwrap_or_default().to_string();
        if !is_json {
            continue;
        }
        if let Ok(text) = field.text().await {
            parts.insert(name, text);
        }
    }
    parts
}

/// Buffers `body` up to `limit` bytes.
///
/// Returns a body replaying exactly what the original would have produced,
/// together with the captured bytes. Nothing is captured when the body is
/// larger than the limit or fails mid-read; the replay then carries the rest
/// of the stream, or the read error, unchanged.
async fn capture_body(body: Body, limit: usize) -> (Body, Result<Bytes, &'static str>) {
    if body.size_hint().lower() > limit as u64 {
        return (body, Err(BODY_TOO_LARGE));
    }

    let mut data = body.into_data_stream();
    let mut buffer = Vec::new();
    while let Some(chunk) = data.next().await {
        match chunk {
            Ok(chunk) => {
                buffer.extend_from_slice(&chunk);
                if buffer.len() > limit {
                    let read = stream::once(future::ready(Ok(Bytes::from(buffer))));
                    return (Body::from_stream(read.chain(data)), Err(BODY_TOO_LARGE));
                }
            }
            Err(err) => {
                tracing::warn!("Failed to read body for logging: {}", err);
                let replay = stream::iter([Ok(Bytes::from(buffer)), Err(err)]);
                return (Body::from_stream(replay), Err(BODY_UNREADABLE));
            }
        }
    }
    let bytes = Bytes::from(buffer);
    (Body::from(bytes.clone()), Ok(bytes))
}

/// Logs every request below the configured scope together with its response.
///
/// Bodies within the capture limit are buffered and handed on unchanged, so
/// what the handler reads and what the client receives are the exact bytes
/// that were captured. Larger or unreadable bodies are streamed through and
/// logged as a placeholder.
pub async fn log_request_middleware(
    State(logger): State<Arc<RequestLogger>>,
    request: Request,
    next: Next,
) -> Response {
    if !logger.applies_to(request.uri().path()) {
        return next.run(request).await;
    }

    let (parts, body) = request.into_parts();
    let (body, captured) = capture_body(body, logger.body_limit).await;

    let mut entry = LogEntry {
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        parameters: logger.parameters(&parts.uri),
        request_headers: logger.request_headers(&parts.headers),
        ..Default::default()
    };
    match captured {
        Ok(bytes) => {
            entry.request_body = logger.body(&bytes);
            entry.parts = extract_json_parts(&parts.headers, bytes)
                .await
                .into_iter()
                .map(|(name, text)| (name, logger.masker.mask(&text).into_owned()))
                .collect();
        }
        Err(placeholder) => entry.request_body = placeholder.to_string(),
    }

    let response = next.run(Request::from_parts(parts, body)).await;

    let (response_parts, body) = response.into_parts();
    let (body, captured) = capture_body(body, logger.body_limit).await;

    entry.status = response_parts.status.as_u16();
    entry.response_headers = response_parts
        .headers
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    entry.response_body = match captured {
        Ok(bytes) => logger.body(&bytes),
        Err(placeholder) => placeholder.to_string(),
    };
    tracing::info!("{}", entry);

    Response::from_parts(response_parts, body)
}
