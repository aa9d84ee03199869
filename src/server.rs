//! HTTP server and graceful shutdown.
//!
//! On SIGTERM (or Ctrl-C) the server:
//! 1. Immediately stops `listener.accept()` — no new connections are made.
//! 2. Lets every in-flight connection task run to completion.
//! 3. Returns from [`Server::serve`], which lets `main` exit cleanly with 0.
//!
//! If a client drops its connection mid-request, hyper drops the service
//! future: remaining pipeline stages are skipped and log calls the handler
//! had not yet issued never happen. Records already issued stand.

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use http_body_util::BodyExt;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::error::Error;
use crate::logging::SharedLogger;
use crate::method::Method;
use crate::middleware::Pipeline;
use crate::request::Request;
use crate::response::Response;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// # Panics
    ///
    /// Panics if `addr` is not a valid `host:port` string. Config validation
    /// catches this before the server is ever constructed.
    pub fn bind(addr: &str) -> Self {
        let addr: SocketAddr = addr.parse().expect("invalid socket address");
        Self { addr }
    }

    /// Starts accepting connections and running them through `pipeline`.
    ///
    /// Returns only after a full graceful shutdown (SIGTERM or Ctrl-C,
    /// followed by all in-flight requests completing).
    pub async fn serve(self, pipeline: Pipeline, logger: SharedLogger) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;

        // One pipeline, shared read-only by every connection task.
        let pipeline = Arc::new(pipeline);

        info!(addr = %self.addr, "weathervane listening");
        logger.information(&format!("listening on {}", self.addr));

        // JoinSet tracks every spawned connection task so graceful shutdown
        // can wait for all of them.
        let mut tasks = tokio::task::JoinSet::new();

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Check shutdown first so a SIGTERM stops accepting new
                // connections even when more are queued.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let pipeline = Arc::clone(&pipeline);
                    let logger = Arc::clone(&logger);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection, not once
                        // per connection.
                        let svc = service_fn(move |req| {
                            let pipeline = Arc::clone(&pipeline);
                            let logger = Arc::clone(&logger);
                            async move { handle(pipeline, logger, req, remote_addr).await }
                        });

                        // auto::Builder negotiates HTTP/1.1 or HTTP/2.
                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the JoinSet does not grow
                // without bound.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        // Drain: every in-flight connection finishes before we return.
        while tasks.join_next().await.is_some() {}

        info!("weathervane stopped");
        Ok(())
    }
}

// ── Request handling ──────────────────────────────────────────────────────────

/// Builds the crate [`Request`] from the wire request and runs it through
/// the pipeline.
///
/// The error type is [`Infallible`](std::convert::Infallible) — every
/// failure becomes a response here, hyper never sees an error.
async fn handle(
    pipeline: Arc<Pipeline>,
    logger: SharedLogger,
    req: hyper::Request<hyper::body::Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<http_body_util::Full<bytes::Bytes>>, std::convert::Infallible> {
    // Unknown methods never reach routing.
    let Ok(method) = Method::from_str(req.method().as_str()) else {
        return Ok(Response::status(http::StatusCode::METHOD_NOT_ALLOWED).into_inner());
    };

    let path = req.uri().path().to_owned();
    let query = req.uri().query().map(str::to_owned);
    let host = request_host(&req);

    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => {
            return Ok(Response::status(http::StatusCode::BAD_REQUEST).into_inner());
        }
    };

    // The listener speaks plain TCP; the transport scheme starts as `http`
    // and only a trusted forwarded header can claim otherwise.
    let mut builder = Request::builder(method, path)
        .headers_from(parts.headers)
        .body(body)
        .peer(remote_addr.ip())
        .host(host)
        .logger(logger);
    if let Some(query) = query {
        builder = builder.query(query);
    }

    Ok(pipeline.handle(builder.build()).await.into_inner())
}

/// The host the client addressed, for redirect targets.
///
/// HTTP/1.1 carries it in the `Host` header; HTTP/2 carries it as the
/// `:authority` pseudo-header, surfaced through `uri().authority()`, and
/// sends no `Host` at all.
fn request_host<B>(req: &http::Request<B>) -> String {
    req.headers()
        .get(http::header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .or_else(|| req.uri().authority().map(|a| a.to_string()))
        .unwrap_or_else(|| "localhost".to_owned())
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both **SIGTERM** and **SIGINT** (Ctrl-C). On
/// other platforms only Ctrl-C is available.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let sigterm = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
