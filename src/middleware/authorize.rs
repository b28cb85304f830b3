//! Predicate-based authorization.

use crate::middleware::{Middleware, Next, from_fn};
use crate::request::Request;
use crate::response::Response;

/// Lets a request through only when `allow` returns `true`; otherwise
/// answers `401 Unauthorized`.
///
/// Install it after [`Jwt::authenticate`](crate::middleware::Jwt::authenticate)
/// to decide on the decoded claims:
///
/// ```rust
/// use routekit::middleware::authorize;
/// # #[derive(serde::Deserialize)]
/// # struct Claims { role: String }
///
/// let admins_only = authorize(|req| {
///     req.claims::<Claims>().is_some_and(|c| c.role == "admin")
/// });
/// ```
pub fn authorize<F>(allow: F) -> Middleware
where
    F: Fn(&Request) -> bool + Send + Sync + 'static,
{
    from_fn(move |req: Request, next: Next| {
        let allowed = allow(&req);
        async move {
            if allowed {
                next.run(req).await
            } else {
                tracing::debug!(path = req.path(), "request not authorized");
                Response::unauthorized()
            }
        }
    })
}
