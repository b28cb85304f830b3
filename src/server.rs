//! HTTP server and graceful shutdown.
//!
//! On SIGTERM or Ctrl-C the server stops accepting connections, lets every
//! in-flight connection run to completion and then returns from
//! [`Server::serve`].

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::error::Error;
use crate::mux::Mux;
use crate::request::Request;
use crate::response::{ERROR_MESSAGE, Response};

/// Serves a [`Mux`] over HTTP/1.1 and HTTP/2.
#[derive(Debug)]
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to listen on `addr` once
    /// [`serve`](Server::serve) is called.
    ///
    /// ```rust,no_run
    /// use routekit::{Mux, Server};
    ///
    /// # async fn run() -> Result<(), routekit::Error> {
    /// Server::bind("0.0.0.0:3000")?.serve(Mux::new()).await
    /// # }
    /// ```
    pub fn bind(addr: &str) -> Result<Self, Error> {
        Ok(Self { addr: addr.parse()? })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Accepts connections and dispatches every request through `mux`.
    ///
    /// Returns after a shutdown signal once all in-flight connections are
    /// done.
    pub async fn serve(self, mux: Mux) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;
        let mux = Arc::new(mux);

        info!(addr = %self.addr, routes = mux.routes().len(), "routekit listening");

        let mut tasks = tokio::task::JoinSet::new();

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Check shutdown first so queued connections are not accepted
                // after a signal.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!(error = %e, "accept failed");
                            continue;
                        }
                    };

                    let mux = Arc::clone(&mux);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        let svc = service_fn(move |req| {
                            let mux = Arc::clone(&mux);
                            async move { handle(&mux, req, remote_addr).await }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            warn!(peer = %remote_addr, error = %e, "connection error");
                        }
                    });
                }

                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("routekit stopped");
        Ok(())
    }
}

/// Buffers the body and hands the request to the mux.
async fn handle(
    mux: &Mux,
    req: hyper::Request<Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(peer = %remote_addr, path = parts.uri.path(), error = %e, "failed to read request body");
            return Ok(Response::bad_request(ERROR_MESSAGE).into_inner());
        }
    };

    let req = Request::from(http::Request::from_parts(parts, body)).with_remote_addr(remote_addr);
    Ok(mux.dispatch(req).await.into_inner())
}

/// Resolves on SIGTERM (Unix) or Ctrl-C. A handler that cannot be installed
/// is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = sigterm => {}
    }
}
