//! Outgoing HTTP response type, the JSON envelope and the [`IntoResponse`]
//! conversion trait.
//!
//! Every success and error produced by routekit itself goes out in the same
//! envelope:
//!
//! ```json
//! { "status": true, "message": "Success", "data": { "id": 42 } }
//! ```
//!
//! All three keys are always present; `data` is `null` when there is nothing
//! to send.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;
use http_body_util::Full;
use serde::Serialize;
use tracing::{error, warn};

use crate::pagination::Page;

/// The message sent to clients when something failed that they cannot fix,
/// or whose details must not leak.
pub const ERROR_MESSAGE: &str = "Sorry, something went wrong! Please try again later.";

/// Sent verbatim when an envelope itself cannot be serialized.
const FALLBACK_BODY: &str =
    r#"{"status":false,"message":"Sorry, something went wrong! Please try again later.","data":null}"#;

const JSON: &str = "application/json";
const TEXT: &str = "text/plain; charset=utf-8";

// ── Envelope ──────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct Envelope<'a, T: Serialize + ?Sized> {
    status: bool,
    message: &'a str,
    data: Option<&'a T>,
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// # Envelope senders
///
/// ```rust
/// use http::StatusCode;
/// use routekit::Response;
///
/// Response::data(&serde_json::json!({ "id": 1 }));
/// Response::error(StatusCode::NOT_FOUND, "No such user");
/// Response::bad_request("Invalid request");
/// ```
///
/// # Raw bodies and the builder
///
/// ```rust
/// use http::StatusCode;
/// use routekit::Response;
///
/// Response::text("hello");
/// Response::status(StatusCode::NO_CONTENT);
/// Response::builder()
///     .status(StatusCode::CREATED)
///     .header("location", "/users/42")
///     .json(br#"{"id":42}"#.to_vec());
/// ```
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    /// `200 OK` with `data` wrapped in the success envelope.
    pub fn data<T: Serialize + ?Sized>(data: &T) -> Self {
        Self::envelope(StatusCode::OK, true, "Success", Some(data))
    }

    /// Error envelope with `data: null`.
    pub fn error(status: StatusCode, message: &str) -> Self {
        Self::envelope::<()>(status, false, message, None)
    }

    /// Error envelope carrying `data`.
    pub fn error_with<T: Serialize + ?Sized>(status: StatusCode, message: &str, data: &T) -> Self {
        Self::envelope(status, false, message, Some(data))
    }

    /// `400 Bad Request` error envelope.
    pub fn bad_request(message: &str) -> Self {
        Self::error(StatusCode::BAD_REQUEST, message)
    }

    /// `401 Unauthorized` error envelope.
    pub fn unauthorized() -> Self {
        Self::error(StatusCode::UNAUTHORIZED, "Unauthorized")
    }

    /// `200 OK` with a pagination page as `data`.
    pub fn page<T: Serialize>(page: &Page<T>) -> Self {
        Self::data(page)
    }

    /// `200 OK` with a raw `application/json` body.
    pub fn json(body: impl Into<Bytes>) -> Self {
        Self::with_content_type(JSON, body.into())
    }

    /// `200 OK` with a `text/plain; charset=utf-8` body.
    pub fn text(body: impl Into<String>) -> Self {
        Self::with_content_type(TEXT, Bytes::from(body.into()))
    }

    /// Response with no body.
    pub fn status(status: StatusCode) -> Self {
        Self { status, headers: HeaderMap::new(), body: Bytes::new() }
    }

    /// Builder for responses that need a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { status: StatusCode::OK, headers: HeaderMap::new() }
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub(crate) fn into_inner(self) -> http::Response<Full<Bytes>> {
        let mut res = http::Response::new(Full::new(self.body));
        *res.status_mut() = self.status;
        *res.headers_mut() = self.headers;
        res
    }

    fn envelope<T: Serialize + ?Sized>(
        status: StatusCode,
        ok: bool,
        message: &str,
        data: Option<&T>,
    ) -> Self {
        let envelope = Envelope { status: ok, message, data };
        match serde_json::to_vec(&envelope) {
            Ok(body) => Self::builder().status(status).json(body),
            Err(e) => {
                error!(error = %e, %status, envelope_message = message, "failed to serialize response envelope");
                Self::builder().status(StatusCode::BAD_REQUEST).json(FALLBACK_BODY)
            }
        }
    }

    fn with_content_type(content_type: &'static str, body: Bytes) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        Self { status: StatusCode::OK, headers, body }
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `200 OK`. Terminated by a
/// typed body method.
pub struct ResponseBuilder {
    status: StatusCode,
    headers: HeaderMap,
}

impl ResponseBuilder {
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Appends a header. Names or values that are not valid HTTP are dropped
    /// with a warning.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => warn!(name, value, "dropping invalid response header"),
        }
        self
    }

    /// Terminate with a JSON body (`application/json`).
    pub fn json(self, body: impl Into<Bytes>) -> Response {
        self.finish(JSON, body.into())
    }

    /// Terminate with a plain-text body (`text/plain; charset=utf-8`).
    pub fn text(self, body: impl Into<String>) -> Response {
        self.finish(TEXT, Bytes::from(body.into()))
    }

    /// Terminate with no body (e.g. `204 No Content`).
    pub fn no_body(self) -> Response {
        Response { status: self.status, headers: self.headers, body: Bytes::new() }
    }

    fn finish(mut self, content_type: &'static str, body: Bytes) -> Response {
        self.headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        Response { status: self.status, headers: self.headers, body }
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
///
/// Implement on your own types to return them directly from handlers.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response {
        self
    }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response {
        Response::text(self)
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Response {
        Response::text(self)
    }
}

/// Return a bare status from a handler: `return StatusCode::NO_CONTENT`.
impl IntoResponse for StatusCode {
    fn into_response(self) -> Response {
        Response::status(self)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    fn body_json(res: &Response) -> Value {
        serde_json::from_slice(res.body()).unwrap()
    }

    #[test]
    fn success_envelope() {
        let res = Response::data(&json!({ "id": 1 }));

        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.headers()[CONTENT_TYPE], JSON);
        assert_eq!(
            body_json(&res),
            json!({ "status": true, "message": "Success", "data": { "id": 1 } })
        );
    }

    #[test]
    fn error_envelope_always_has_data_key() {
        let res = Response::error(StatusCode::NOT_FOUND, "gone");

        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(&res), json!({ "status": false, "message": "gone", "data": null }));
    }

    #[test]
    fn unserializable_data_falls_back_to_generic_400() {
        // Maps with non-string keys cannot be JSON objects.
        let data: std::collections::HashMap<(u8, u8), u8> = [((1, 2), 3)].into();
        let res = Response::data(&data);

        assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(&res),
            json!({ "status": false, "message": ERROR_MESSAGE, "data": null })
        );
    }

    #[test]
    fn builder_drops_invalid_headers() {
        let res = Response::builder()
            .status(StatusCode::CREATED)
            .header("location", "/users/1")
            .header("bad header", "x")
            .no_body();

        assert_eq!(res.status_code(), StatusCode::CREATED);
        assert_eq!(res.headers().len(), 1);
        assert_eq!(res.headers()["location"], "/users/1");
    }
}
