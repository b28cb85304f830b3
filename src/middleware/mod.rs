//! Middleware layer.
//!
//! A [`Middleware`] turns one handler into another: it receives the rest of
//! the chain as [`Next`] and returns a handler that may inspect or rewrite the
//! request, call `next`, decorate the response, or answer on its own without
//! calling `next` at all.
//!
//! ```rust
//! use routekit::middleware::{self, Next};
//! use routekit::Request;
//!
//! let tag = middleware::from_fn(|req: Request, next: Next| async move {
//!     let mut res = next.run(req).await;
//!     res.headers_mut().append("x-served-by", "routekit".parse().unwrap());
//!     res
//! });
//! ```
//!
//! Chains are composed once, at registration time. Root (global and group)
//! middleware always runs before route-level middleware, and within each list
//! the first one declared sees the request first.
//!
//! Built-in middleware:
//! - [`validate_path`], [`validate_query`], [`validate_form`],
//!   [`validate_json`]: bind and validate a typed payload
//! - [`Jwt::authenticate`] and [`authorize`]: bearer-token auth
//! - [`logger`] / [`logger_with_skips`]: one tracing event per request
//! - [`recover`]: turns panics into a generic 400

use std::future::Future;
use std::sync::Arc;

use crate::handler::{Handler, SharedEndpoint};
use crate::request::Request;
use crate::response::IntoResponse;

mod authorize;
mod jwt;
mod logger;
mod recover;
mod validate;

pub use crate::handler::BoxFuture;
pub use authorize::authorize;
pub use jwt::{Jwt, JwtError};
pub use logger::{logger, logger_with_skips};
pub use recover::recover;
pub use validate::{Validator, validate_form, validate_json, validate_path, validate_query};

/// The remainder of a middleware chain, ending in the terminal handler.
#[derive(Clone)]
pub struct Next(SharedEndpoint);

impl Next {
    pub fn new(handler: impl Handler) -> Self {
        Self(handler.into_endpoint())
    }

    /// Runs the rest of the chain.
    pub fn run(&self, req: Request) -> BoxFuture {
        self.0.serve(req)
    }
}

/// A handler transformation: `Next -> Next`.
///
/// Cheap to clone; the same middleware can be installed on any number of
/// routes.
#[derive(Clone)]
pub struct Middleware(Arc<dyn Fn(Next) -> Next + Send + Sync>);

impl Middleware {
    pub fn new<F>(wrap: F) -> Self
    where
        F: Fn(Next) -> Next + Send + Sync + 'static,
    {
        Self(Arc::new(wrap))
    }

    /// Wraps `next`, returning the new outer handler.
    pub fn apply(&self, next: Next) -> Next {
        (self.0)(next)
    }
}

impl std::fmt::Debug for Middleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Middleware")
    }
}

/// Builds a middleware from an async function of the request and the rest
/// of the chain.
pub fn from_fn<F, Fut, R>(f: F) -> Middleware
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    let f = Arc::new(f);
    Middleware::new(move |next: Next| {
        let f = Arc::clone(&f);
        Next::new(move |req: Request| (*f)(req, next.clone()))
    })
}

/// Composes `terminal` with `root` then `local` middleware so that the first
/// root middleware is outermost and the terminal handler innermost.
pub(crate) fn compose(root: &[Middleware], local: &[Middleware], terminal: Next) -> Next {
    root.iter()
        .chain(local)
        .rev()
        .fold(terminal, |next, mw| mw.apply(next))
}
