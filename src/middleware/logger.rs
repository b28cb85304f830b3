//! Request logging.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::middleware::{Middleware, Next, from_fn};
use crate::request::Request;

/// Emits one `info` event per request with path, method, status, query,
/// peer address, user agent, response length, latency and route pattern.
pub fn logger() -> Middleware {
    logger_with_skips(std::iter::empty::<&str>())
}

/// Like [`logger`], but requests whose matched route pattern is in `skips`
/// (e.g. `/healthz`) are not logged.
pub fn logger_with_skips<I, S>(skips: I) -> Middleware
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let skips: Arc<HashSet<String>> = Arc::new(skips.into_iter().map(Into::into).collect());

    from_fn(move |req: Request, next: Next| {
        let skipped = req.pattern().is_some_and(|p| skips.contains(p));
        async move {
            if skipped {
                return next.run(req).await;
            }

            let path = req.path().to_owned();
            let method = req.method().clone();
            let query = req.query().unwrap_or_default().to_owned();
            let user_agent = req.header("user-agent").unwrap_or_default().to_owned();
            let pattern = req.pattern().unwrap_or_default().to_owned();
            let ip = req.remote_addr().map(|a| a.ip().to_string()).unwrap_or_default();

            let started = Instant::now();
            let res = next.run(req).await;

            info!(
                path,
                %method,
                status = res.status_code().as_u16(),
                query,
                ip,
                user_agent,
                length = res.body().len(),
                latency = ?started.elapsed(),
                pattern,
                "request completed",
            );
            res
        }
    })
}
