//! # routekit
//!
//! Route composition and request validation on top of hyper.
//!
//! - [`Mux`], [`Group`] and [`RouteHandler`] register handlers on a
//!   [`matchit`] radix tree. Middleware runs outer to inner: global
//!   middleware first, then group middleware, then route middleware, each in
//!   declaration order.
//! - [`middleware::Validator`] binds path, query, form or JSON input into a
//!   typed payload, validates it with [`validator`] and answers failures with
//!   a nested error tree.
//! - Every JSON answer uses the same envelope:
//!   `{"status": bool, "message": string, "data": any}`.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use routekit::middleware::{logger, recover, validate_json};
//! use routekit::{Mux, Payload, Request, Response, Server, required};
//! use serde::Deserialize;
//! use validator::Validate;
//!
//! #[derive(Default, Deserialize, Validate)]
//! #[serde(default)]
//! struct Person {
//!     #[validate(range(exclusive_min = 0.0))]
//!     age: f64,
//!     #[validate(custom(function = "required"))]
//!     name: String,
//! }
//!
//! impl Payload for Person {}
//!
//! async fn create(req: Request) -> Response {
//!     let person = req.json_payload::<Person>();
//!     Response::data(&person.map(|p| &p.name))
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), routekit::Error> {
//!     let mut mux = Mux::new();
//!     mux.middleware(recover()).middleware(logger()).enable_cors();
//!
//!     mux.group("/api")
//!         .route("/people", |r| {
//!             r.middleware(validate_json::<Person>()).post(create);
//!         });
//!
//!     Server::bind("0.0.0.0:3000")?.serve(mux).await
//! }
//! ```

mod bind;
mod context;
mod cors;
mod error;
mod error_tree;
mod group;
mod handler;
mod method;
mod mux;
mod request;
mod response;
mod route;
mod router;
mod server;
mod translate;

pub mod middleware;
pub mod pagination;

pub use bind::{Payload, Shape, bind_form, bind_json, bind_path, bind_query};
pub use context::{Context, PayloadKind};
pub use cors::{Cors, CorsDecision, CorsOptions};
pub use error::{Error, FieldFailure, PayloadError};
pub use error_tree::{ErrorNode, ErrorTree};
pub use group::Group;
pub use handler::Handler;
pub use method::Method;
pub use mux::Mux;
pub use request::Request;
pub use response::{ERROR_MESSAGE, IntoResponse, Response, ResponseBuilder};
pub use route::RouteHandler;
pub use server::Server;
pub use translate::{Translations, required};
