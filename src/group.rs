//! Route groups: a shared path prefix and middleware list.

use crate::middleware::Middleware;
use crate::route::RouteHandler;
use crate::router::RouteTable;

/// A set of routes sharing a prefix and middleware.
///
/// Group middleware is cumulative: each [`middleware`](Self::middleware) call
/// applies to every route declared after it. Routes already declared keep the
/// list they were created with.
///
/// ```rust
/// # use routekit::{Mux, Request, Response};
/// # use routekit::middleware::{self, Next};
/// # async fn list(_: Request) -> Response { Response::text("") }
/// # async fn stats(_: Request) -> Response { Response::text("") }
/// # let auth = middleware::from_fn(|req: Request, next: Next| async move { next.run(req).await });
/// let mut mux = Mux::new();
/// mux.group("/api/v1")
///     .route("/users", |r| {
///         r.get(list);
///     })
///     .middleware(auth)
///     .route("/stats", |r| {
///         r.get(stats);                // behind `auth`
///     });
/// ```
pub struct Group<'m> {
    table: &'m mut RouteTable,
    prefix: String,
    middleware: Vec<Middleware>,
}

impl<'m> Group<'m> {
    pub(crate) fn new(table: &'m mut RouteTable, prefix: String, middleware: Vec<Middleware>) -> Self {
        Self { table, prefix, middleware }
    }

    pub fn middleware(mut self, mw: Middleware) -> Self {
        self.middleware.push(mw);
        self
    }

    pub fn middlewares(mut self, mws: impl IntoIterator<Item = Middleware>) -> Self {
        self.middleware.extend(mws);
        self
    }

    /// Hands `declare` a builder for `prefix + path` rooted at the group's
    /// current middleware.
    pub fn route(self, path: &str, declare: impl FnOnce(RouteHandler<'_>)) -> Self {
        let route = format!("{}{path}", self.prefix);
        declare(RouteHandler::new(&mut *self.table, route, self.middleware.clone()));
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}
