//! Cross-Origin Resource Sharing.
//!
//! When enabled on a [`Mux`](crate::Mux), every request is evaluated here
//! before the route table is consulted. Preflight requests (`OPTIONS` with
//! `Access-Control-Request-Method`) are answered directly and never reach
//! route middleware or handlers; other requests pass through and have the
//! matching `Access-Control-*` headers added to their response.
//!
//! ```rust
//! use http::Method;
//! use routekit::{CorsOptions, Mux};
//!
//! let mut mux = Mux::new();
//! mux.enable_cors_with(
//!     CorsOptions::new()
//!         .allowed_origins(["https://*.example.com"])
//!         .allowed_methods([Method::GET, Method::PUT])
//!         .allow_credentials(true),
//! );
//! ```

use std::future::Future;
use std::time::Duration;

use http::header::{self, HeaderMap, HeaderValue};
use http::{Method, StatusCode};
use tracing::debug;

use crate::request::Request;
use crate::response::Response;

const PREFLIGHT_VARY: &str = "Origin, Access-Control-Request-Method, Access-Control-Request-Headers";

const DEFAULT_HEADERS: [&str; 3] = ["accept", "content-type", "x-requested-with"];

// ── Options ───────────────────────────────────────────────────────────────────

/// User-facing CORS configuration. Turned into a [`Cors`] policy by
/// [`Cors::new`].
///
/// Empty lists fall back to permissive-but-safe defaults: any origin,
/// `GET`/`POST`/`HEAD`, and the simple headers `Accept`, `Content-Type` and
/// `X-Requested-With`.
#[derive(Clone, Debug)]
pub struct CorsOptions {
    origins: Vec<String>,
    methods: Vec<Method>,
    headers: Vec<String>,
    exposed: Vec<String>,
    credentials: bool,
    max_age: Option<Duration>,
    passthrough: bool,
    success_status: StatusCode,
}

impl Default for CorsOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl CorsOptions {
    pub fn new() -> Self {
        Self {
            origins: Vec::new(),
            methods: Vec::new(),
            headers: Vec::new(),
            exposed: Vec::new(),
            credentials: false,
            max_age: None,
            passthrough: false,
            success_status: StatusCode::NO_CONTENT,
        }
    }

    /// Any origin, the common REST methods and any request header.
    pub fn allow_all() -> Self {
        Self::new()
            .allowed_origins(["*"])
            .allowed_methods([
                Method::HEAD,
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
            ])
            .allowed_headers(["*"])
    }

    /// Exact origins, `*` for any, or a pattern with a single `*` such as
    /// `https://*.example.com`.
    pub fn allowed_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.origins = origins.into_iter().map(Into::into).collect();
        self
    }

    pub fn allowed_methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.methods = methods.into_iter().collect();
        self
    }

    /// Request headers a client may send; `*` allows any.
    pub fn allowed_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headers = headers.into_iter().map(Into::into).collect();
        self
    }

    /// Response headers the browser may expose to scripts.
    pub fn exposed_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exposed = headers.into_iter().map(Into::into).collect();
        self
    }

    pub fn allow_credentials(mut self, allow: bool) -> Self {
        self.credentials = allow;
        self
    }

    /// How long a preflight answer may be cached. Zero is not sent.
    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Let preflight requests continue down the chain after evaluation.
    pub fn options_passthrough(mut self, passthrough: bool) -> Self {
        self.passthrough = passthrough;
        self
    }

    /// Status for answered preflight requests. Defaults to `204 No Content`.
    pub fn options_success_status(mut self, status: StatusCode) -> Self {
        self.success_status = status;
        self
    }
}

// ── Policy ────────────────────────────────────────────────────────────────────

#[derive(Debug)]
enum Origins {
    Any,
    List { exact: Vec<String>, wildcards: Vec<(String, String)> },
}

impl Origins {
    fn allows(&self, origin: &str) -> bool {
        let origin = origin.to_ascii_lowercase();
        match self {
            Self::Any => true,
            Self::List { exact, wildcards } => {
                exact.iter().any(|o| *o == origin)
                    || wildcards.iter().any(|(prefix, suffix)| {
                        origin.len() >= prefix.len() + suffix.len()
                            && origin.starts_with(prefix.as_str())
                            && origin.ends_with(suffix.as_str())
                    })
            }
        }
    }
}

#[derive(Debug)]
enum Headers {
    Any,
    List(Vec<String>),
}

impl Headers {
    fn allows(&self, requested: &str) -> bool {
        match self {
            Self::Any => true,
            Self::List(allowed) => requested
                .split(',')
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .all(|h| allowed.iter().any(|a| a.eq_ignore_ascii_case(h))),
        }
    }
}

/// What a CORS policy decided for one request.
#[derive(Debug)]
pub struct CorsDecision {
    /// The request is a preflight (`OPTIONS` + `Access-Control-Request-Method`).
    pub preflight: bool,
    /// Origin, method and requested headers are all allowed.
    pub allowed: bool,
    /// Headers to add to the response. Always carries `Vary`.
    pub headers: HeaderMap,
}

/// A compiled CORS policy.
#[derive(Debug)]
pub struct Cors {
    origins: Origins,
    methods: Vec<Method>,
    headers: Headers,
    exposed: Option<HeaderValue>,
    credentials: bool,
    max_age: Option<HeaderValue>,
    passthrough: bool,
    success_status: StatusCode,
}

impl Cors {
    pub fn new(options: CorsOptions) -> Self {
        let origins = if options.origins.is_empty() || options.origins.iter().any(|o| o == "*") {
            Origins::Any
        } else {
            let mut exact = Vec::new();
            let mut wildcards = Vec::new();
            for origin in options.origins.iter().map(|o| o.to_ascii_lowercase()) {
                match origin.split_once('*') {
                    Some((prefix, suffix)) => wildcards.push((prefix.to_owned(), suffix.to_owned())),
                    None => exact.push(origin),
                }
            }
            Origins::List { exact, wildcards }
        };

        let methods = if options.methods.is_empty() {
            vec![Method::GET, Method::POST, Method::HEAD]
        } else {
            options.methods
        };

        let headers = if options.headers.iter().any(|h| h == "*") {
            Headers::Any
        } else {
            let mut list: Vec<String> = if options.headers.is_empty() {
                DEFAULT_HEADERS.iter().map(|h| (*h).to_owned()).collect()
            } else {
                options.headers
            };
            list.push("origin".to_owned());
            Headers::List(list)
        };

        let exposed = (!options.exposed.is_empty())
            .then(|| HeaderValue::try_from(options.exposed.join(", ")).ok())
            .flatten();
        let max_age = options
            .max_age
            .filter(|age| age.as_secs() > 0)
            .map(|age| HeaderValue::from(age.as_secs()));

        Self {
            origins,
            methods,
            headers,
            exposed,
            credentials: options.credentials,
            max_age,
            passthrough: options.passthrough,
            success_status: options.success_status,
        }
    }

    pub fn allow_all() -> Self {
        Self::new(CorsOptions::allow_all())
    }

    /// Decides whether `req` is allowed and which headers its response gets.
    pub fn evaluate(&self, req: &Request) -> CorsDecision {
        let preflight = req.method() == Method::OPTIONS
            && req.headers().contains_key(header::ACCESS_CONTROL_REQUEST_METHOD);
        if preflight {
            self.evaluate_preflight(req)
        } else {
            self.evaluate_actual(req)
        }
    }

    /// Runs the policy around `next`: answers preflight requests directly
    /// (unless configured to pass them through) and decorates every other
    /// response.
    pub async fn handle<F, Fut>(&self, req: Request, next: F) -> Response
    where
        F: FnOnce(Request) -> Fut,
        Fut: Future<Output = Response>,
    {
        let decision = self.evaluate(&req);

        let mut res = if decision.preflight && !self.passthrough {
            Response::builder().status(self.success_status).no_body()
        } else {
            next(req).await
        };

        for (name, value) in &decision.headers {
            res.headers_mut().append(name, value.clone());
        }
        res
    }

    fn evaluate_preflight(&self, req: &Request) -> CorsDecision {
        let mut headers = HeaderMap::new();
        headers.insert(header::VARY, HeaderValue::from_static(PREFLIGHT_VARY));
        let rejected = |headers, reason: &str| {
            debug!(path = req.path(), reason, "CORS preflight rejected");
            CorsDecision { preflight: true, allowed: false, headers }
        };

        let Some(origin) = req.headers().get(header::ORIGIN) else {
            return rejected(headers, "no origin");
        };
        if !origin.to_str().is_ok_and(|o| self.origins.allows(o)) {
            return rejected(headers, "origin not allowed");
        }

        let requested_method = req
            .headers()
            .get(header::ACCESS_CONTROL_REQUEST_METHOD)
            .and_then(|m| m.to_str().ok())
            .map(str::to_ascii_uppercase)
            .unwrap_or_default();
        if !self.allows_method(&requested_method) {
            return rejected(headers, "method not allowed");
        }

        let requested_headers = req.headers().get(header::ACCESS_CONTROL_REQUEST_HEADERS);
        if let Some(requested) = requested_headers {
            if !requested.to_str().is_ok_and(|h| self.headers.allows(h)) {
                return rejected(headers, "headers not allowed");
            }
        }

        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin(origin));
        if let Ok(method) = HeaderValue::try_from(requested_method) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, method);
        }
        if let Some(requested) = requested_headers.filter(|h| !h.is_empty()) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, requested.clone());
        }
        if self.credentials {
            headers.insert(header::ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
        }
        if let Some(max_age) = &self.max_age {
            headers.insert(header::ACCESS_CONTROL_MAX_AGE, max_age.clone());
        }

        CorsDecision { preflight: true, allowed: true, headers }
    }

    fn evaluate_actual(&self, req: &Request) -> CorsDecision {
        let mut headers = HeaderMap::new();
        headers.insert(header::VARY, HeaderValue::from_static("Origin"));
        let mut decision = CorsDecision { preflight: false, allowed: false, headers };

        let Some(origin) = req.headers().get(header::ORIGIN) else {
            return decision;
        };
        if !origin.to_str().is_ok_and(|o| self.origins.allows(o)) {
            debug!(path = req.path(), "CORS origin not allowed");
            return decision;
        }
        if !self.allows_method(req.method().as_str()) {
            debug!(path = req.path(), method = %req.method(), "CORS method not allowed");
            return decision;
        }

        decision.headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin(origin));
        if let Some(exposed) = &self.exposed {
            decision.headers.insert(header::ACCESS_CONTROL_EXPOSE_HEADERS, exposed.clone());
        }
        if self.credentials {
            decision.headers.insert(header::ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
        }
        decision.allowed = true;
        decision
    }

    fn allows_method(&self, method: &str) -> bool {
        method == Method::OPTIONS.as_str() || self.methods.iter().any(|m| m.as_str() == method)
    }

    fn allow_origin(&self, origin: &HeaderValue) -> HeaderValue {
        if matches!(self.origins, Origins::Any) && !self.credentials {
            HeaderValue::from_static("*")
        } else {
            origin.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn request(method: Method, headers: &[(&str, &str)]) -> Request {
        let mut builder = http::Request::builder().method(method).uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Bytes::new()).unwrap().into()
    }

    #[test]
    fn wildcard_origin_patterns() {
        let cors = Cors::new(CorsOptions::new().allowed_origins(["https://*.example.com"]));

        assert!(cors.origins.allows("https://api.example.com"));
        assert!(cors.origins.allows("HTTPS://API.EXAMPLE.COM"));
        assert!(!cors.origins.allows("https://example.org"));
    }

    #[test]
    fn requested_headers_are_matched_case_insensitively() {
        let cors = Cors::new(CorsOptions::new().allowed_headers(["X-Token"]));

        assert!(cors.headers.allows("x-token, Origin"));
        assert!(!cors.headers.allows("x-token, x-other"));
    }

    #[test]
    fn credentials_echo_the_origin() {
        let cors = Cors::new(CorsOptions::allow_all().allow_credentials(true));
        let decision = cors.evaluate(&request(Method::GET, &[("origin", "https://a.dev")]));

        assert!(decision.allowed);
        assert_eq!(decision.headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "https://a.dev");
        assert_eq!(decision.headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    }

    #[test]
    fn actual_request_without_origin_only_varies() {
        let decision = Cors::allow_all().evaluate(&request(Method::GET, &[]));

        assert!(!decision.preflight);
        assert!(!decision.allowed);
        assert_eq!(decision.headers.len(), 1);
        assert_eq!(decision.headers[header::VARY], "Origin");
    }

    #[test]
    fn preflight_max_age() {
        let cors = Cors::new(CorsOptions::allow_all().max_age(Duration::from_secs(600)));
        let decision = cors.evaluate(&request(Method::OPTIONS, &[
            ("origin", "https://a.dev"),
            ("access-control-request-method", "delete"),
        ]));

        assert!(decision.allowed);
        assert_eq!(decision.headers[header::ACCESS_CONTROL_ALLOW_METHODS], "DELETE");
        assert_eq!(decision.headers[header::ACCESS_CONTROL_MAX_AGE], "600");
    }
}
