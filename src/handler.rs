//! Handlers and their erased form.
//!
//! A route table stores chains built from many different closure and
//! `async fn` types, and every middleware must be able to wrap any of them.
//! Each handler is therefore boxed once, at registration, into a shared
//! [`Endpoint`] trait object:
//!
//! ```text
//! async fn show(req: Request) -> Response        registered by the user
//!   └─ Handler::into_endpoint                      Arc<Call<show>>
//!        └─ Middleware::apply, innermost first    Next(Arc<dyn Endpoint>)
//!             └─ RouteTable slot                  cloned per request
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// The future every erased handler returns.
pub type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Object-safe calling convention shared by handlers and middleware output.
#[doc(hidden)]
pub trait Endpoint: Send + Sync + 'static {
    fn serve(&self, req: Request) -> BoxFuture;
}

#[doc(hidden)]
pub type SharedEndpoint = Arc<dyn Endpoint>;

/// Anything that can terminate a route: an `async fn` or closure taking a
/// [`Request`] and returning an [`IntoResponse`] value.
///
/// ```rust
/// use routekit::{Request, Response};
///
/// async fn named(_req: Request) -> Response {
///     Response::data("ok")
/// }
///
/// let inline = |req: Request| async move { req.path().to_owned() };
/// # let _ = (named, inline);
/// ```
///
/// Sealed; the blanket impl covers every function of that shape.
pub trait Handler: sealed::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_endpoint(self) -> SharedEndpoint;
}

mod sealed {
    pub trait Sealed {}
}

impl<F, Fut, R> sealed::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_endpoint(self) -> SharedEndpoint {
        Arc::new(Call(self))
    }
}

struct Call<F>(F);

impl<F, Fut, R> Endpoint for Call<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn serve(&self, req: Request) -> BoxFuture {
        let pending = (self.0)(req);
        Box::pin(async move { pending.await.into_response() })
    }
}
