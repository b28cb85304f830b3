//! Incoming HTTP request type.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName};
use http::request::Parts;
use http::Uri;

use crate::context::{Context, PayloadKind};

/// An incoming HTTP request with its body already buffered.
///
/// Besides the raw parts, a request carries the parameters and pattern of the
/// route it matched and a typed [`Context`] that validation and auth
/// middleware fill for downstream handlers.
pub struct Request {
    parts: Parts,
    body: Bytes,
    params: HashMap<String, String>,
    malformed_params: Vec<String>,
    pattern: Option<Arc<str>>,
    remote_addr: Option<SocketAddr>,
    context: Context,
}

impl Request {
    pub fn method(&self) -> &http::Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    /// The raw query string, without the leading `?`.
    pub fn query(&self) -> Option<&str> {
        self.parts.uri.query()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.parts.headers
    }

    /// Case-insensitive header lookup. Values that are not visible ASCII read
    /// as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = HeaderName::try_from(name).ok()?;
        self.parts.headers.get(name)?.to_str().ok()
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns a named path parameter, percent-decoded.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns
    /// `Some("42")`, and on `/users/a%20b` returns `Some("a b")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    /// The pattern of the matched route, e.g. `/users/{id}`.
    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub(crate) fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    /// The payload bound from path parameters by
    /// [`validate_path`](crate::middleware::validate_path).
    pub fn path_payload<T: 'static>(&self) -> Option<&T> {
        self.context.payload(PayloadKind::Path)
    }

    /// The payload bound from the query string by
    /// [`validate_query`](crate::middleware::validate_query).
    pub fn query_payload<T: 'static>(&self) -> Option<&T> {
        self.context.payload(PayloadKind::Query)
    }

    /// The payload bound from a form body by
    /// [`validate_form`](crate::middleware::validate_form).
    pub fn form_payload<T: 'static>(&self) -> Option<&T> {
        self.context.payload(PayloadKind::Form)
    }

    /// The payload bound from a JSON body by
    /// [`validate_json`](crate::middleware::validate_json).
    pub fn json_payload<T: 'static>(&self) -> Option<&T> {
        self.context.payload(PayloadKind::Json)
    }

    /// Claims stored by [`Jwt::authenticate`](crate::middleware::Jwt::authenticate).
    pub fn claims<C: 'static>(&self) -> Option<&C> {
        self.context.claims()
    }

    pub(crate) fn set_route(
        &mut self,
        pattern: Arc<str>,
        params: HashMap<String, String>,
        malformed_params: Vec<String>,
    ) {
        self.pattern = Some(pattern);
        self.params = params;
        self.malformed_params = malformed_params;
    }

    /// Path parameters whose percent-decoding failed; [`param`](Self::param)
    /// returns their raw text.
    pub(crate) fn malformed_params(&self) -> &[String] {
        &self.malformed_params
    }
}

impl From<http::Request<Bytes>> for Request {
    fn from(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        Self {
            parts,
            body,
            params: HashMap::new(),
            malformed_params: Vec::new(),
            pattern: None,
            remote_addr: None,
            context: Context::default(),
        }
    }
}
