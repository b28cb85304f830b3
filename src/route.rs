//! Per-route builder: local middleware and method registration.

use crate::handler::Handler;
use crate::method::Method;
use crate::middleware::{Middleware, Next, compose};
use crate::router::RouteTable;

/// Declares handlers for one route, one method at a time.
///
/// Middleware added with [`middleware`](Self::middleware) applies only to the
/// next method registered. Every method call returns a fresh builder for the
/// same route with the same root middleware and an empty local list:
///
/// ```rust
/// # use routekit::{Mux, Request, Response};
/// # use routekit::middleware::{self, Next};
/// # async fn list(_: Request) -> Response { Response::text("") }
/// # async fn create(_: Request) -> Response { Response::text("") }
/// # let audit = middleware::from_fn(|req: Request, next: Next| async move { next.run(req).await });
/// let mut mux = Mux::new();
/// mux.route("/users")
///     .get(list)                  // no local middleware
///     .middleware(audit)
///     .post(create);              // audited
/// ```
pub struct RouteHandler<'m> {
    table: &'m mut RouteTable,
    route: String,
    root: Vec<Middleware>,
    local: Vec<Middleware>,
}

impl<'m> RouteHandler<'m> {
    pub(crate) fn new(table: &'m mut RouteTable, route: String, root: Vec<Middleware>) -> Self {
        Self { table, route, root, local: Vec::new() }
    }

    /// Appends a middleware for the next method registration.
    pub fn middleware(mut self, mw: Middleware) -> Self {
        self.local.push(mw);
        self
    }

    pub fn middlewares(mut self, mws: impl IntoIterator<Item = Middleware>) -> Self {
        self.local.extend(mws);
        self
    }

    pub fn get(self, handler: impl Handler) -> Self {
        self.on(Method::Get, handler)
    }

    pub fn post(self, handler: impl Handler) -> Self {
        self.on(Method::Post, handler)
    }

    pub fn put(self, handler: impl Handler) -> Self {
        self.on(Method::Put, handler)
    }

    pub fn patch(self, handler: impl Handler) -> Self {
        self.on(Method::Patch, handler)
    }

    pub fn delete(self, handler: impl Handler) -> Self {
        self.on(Method::Delete, handler)
    }

    /// Wraps `handler` in the root then local middleware and registers it
    /// under `(method, route)`, replacing any earlier registration.
    ///
    /// # Panics
    ///
    /// Panics if the route is not a valid pattern or conflicts with another
    /// pattern registered for `method`.
    pub fn on(self, method: Method, handler: impl Handler) -> Self {
        let Self { table, route, root, local } = self;
        let chain = compose(&root, &local, Next::new(handler));
        table.insert(method, &route, chain);
        Self { table, route, root, local: Vec::new() }
    }

    /// The full route pattern, including any group prefix.
    pub fn route(&self) -> &str {
        &self.route
    }
}
