//! Panic recovery.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use tracing::error;

use crate::middleware::{Middleware, Next};
use crate::request::Request;
use crate::response::{ERROR_MESSAGE, Response};

/// Catches panics raised further down the chain, logs them and answers
/// `400 Bad Request` with the generic message.
///
/// Install it as the first global middleware so it covers everything else.
pub fn recover() -> Middleware {
    Middleware::new(|next: Next| {
        Next::new(move |req: Request| {
            let path = req.path().to_owned();
            let method = req.method().clone();
            let next = next.clone();
            async move {
                let chain = async move { next.run(req).await };
                match AssertUnwindSafe(chain).catch_unwind().await {
                    Ok(res) => res,
                    Err(panic) => {
                        error!(%method, path, panic = panic_message(panic.as_ref()), "recovered from panic");
                        Response::bad_request(ERROR_MESSAGE)
                    }
                }
            }
        })
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
