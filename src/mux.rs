//! The top-level router.

use http::StatusCode;

use crate::cors::{Cors, CorsOptions};
use crate::group::Group;
use crate::method::Method;
use crate::middleware::Middleware;
use crate::request::Request;
use crate::response::Response;
use crate::route::RouteHandler;
use crate::router::{Lookup, RouteTable};

/// Global middleware, an optional CORS policy and a route table of its own.
///
/// Build it once at startup, then hand it to [`Server::serve`](crate::Server::serve)
/// or drive it directly with [`dispatch`](Self::dispatch). Two `Mux` values
/// never share routes.
///
/// ```rust
/// use routekit::{Mux, Request, Response};
///
/// async fn get_user(req: Request) -> Response {
///     Response::data(&req.param("id"))
/// }
///
/// let mut mux = Mux::new();
/// mux.route("/users/{id}").get(get_user);
/// ```
#[derive(Default)]
pub struct Mux {
    table: RouteTable,
    middleware: Vec<Middleware>,
    cors: Option<Cors>,
}

impl Mux {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a global middleware. It applies to routes and groups created
    /// after this call.
    pub fn middleware(&mut self, mw: Middleware) -> &mut Self {
        self.middleware.push(mw);
        self
    }

    pub fn middlewares(&mut self, mws: impl IntoIterator<Item = Middleware>) -> &mut Self {
        self.middleware.extend(mws);
        self
    }

    /// Starts declaring handlers for `path`, rooted at the current global
    /// middleware.
    pub fn route(&mut self, path: &str) -> RouteHandler<'_> {
        RouteHandler::new(&mut self.table, path.to_owned(), self.middleware.clone())
    }

    /// Starts a group of routes under `prefix`, seeded with the current
    /// global middleware.
    pub fn group(&mut self, prefix: &str) -> Group<'_> {
        Group::new(&mut self.table, prefix.to_owned(), self.middleware.clone())
    }

    /// Evaluates every request against the allow-all CORS policy.
    pub fn enable_cors(&mut self) -> &mut Self {
        self.cors = Some(Cors::allow_all());
        self
    }

    pub fn enable_cors_with(&mut self, options: CorsOptions) -> &mut Self {
        self.cors = Some(Cors::new(options));
        self
    }

    /// Registered `(method, pattern)` pairs, sorted.
    pub fn routes(&self) -> Vec<(Method, String)> {
        self.table.routes()
    }

    /// Routes one request and produces one response.
    ///
    /// Unmatched paths get `404 page not found`; a path registered only under
    /// other methods gets `405 Method Not Allowed` with an `allow` header.
    pub async fn dispatch(&self, req: Request) -> Response {
        match &self.cors {
            Some(cors) => cors.handle(req, |req| self.route_request(req)).await,
            None => self.route_request(req).await,
        }
    }

    async fn route_request(&self, mut req: Request) -> Response {
        match self.table.lookup(req.method(), req.path()) {
            Lookup::Found { handler, pattern, params, malformed } => {
                req.set_route(pattern, params, malformed);
                handler.run(req).await
            }
            Lookup::MethodNotAllowed(allowed) => {
                let allow = allowed.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", ");
                Response::builder()
                    .status(StatusCode::METHOD_NOT_ALLOWED)
                    .header("allow", &allow)
                    .text("Method Not Allowed\n")
            }
            Lookup::NotFound => Response::builder()
                .status(StatusCode::NOT_FOUND)
                .text("404 page not found\n"),
        }
    }
}
