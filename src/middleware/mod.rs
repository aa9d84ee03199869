//! Middleware pipeline.
//!
//! Every inbound request flows through the same fixed, ordered chain of
//! stages before a handler runs:
//!
//! 1. diagnostics gate — development surfaces full fault detail, any other
//!    environment hardens instead (generic fault body + HSTS header)
//! 2. transport redirect — insecure requests are redirected to `https`
//! 3. static assets — existing files under the configured root are served
//!    directly (short-circuit)
//! 4. forwarded headers — trusted proxy headers rewrite the request origin
//! 5. authorization gate — the configured policy admits or rejects
//! 6. dispatch — method + path resolve to exactly one handler, or 404
//!
//! The chain is composed once at startup and immutable afterwards: stages
//! never reorder or change based on request content, and every concurrent
//! request observes the same sequence. A stage either passes the (possibly
//! rewritten) request onward or short-circuits with a terminal response —
//! no exceptions for control flow.
//!
//! The diagnostics gate is the chain's outer frame rather than a list entry:
//! it wraps stages 2-6 so a fault anywhere below it is converted to a
//! response at the pipeline boundary and never reaches hyper as an unhandled
//! error.

mod stages;

use std::future::Future;
use std::pin::Pin;

use futures_util::FutureExt;
use http::header::{HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, STRICT_TRANSPORT_SECURITY};
use http::StatusCode;
use tracing::debug;

use crate::config::Config;
use crate::logging::SharedLogger;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;

pub(crate) use stages::{AuthGate, ForwardedHeaders, StaticAssets, TransportRedirect};

/// One year, the conventional HSTS window.
const HSTS_MAX_AGE: &str = "max-age=31536000";

// ── Stage contract ────────────────────────────────────────────────────────────

/// What a stage decided to do with the request.
pub enum StageFlow {
    /// Delegate to the rest of the chain with the (possibly rewritten) request.
    Continue(Request),
    /// Terminate the chain with a final response.
    ShortCircuit(Response),
}

pub(crate) type StageFuture = Pin<Box<dyn Future<Output = StageFlow> + Send>>;

/// One ordered unit of cross-cutting request processing.
///
/// Stages are constructed once at startup, hold only read-only configuration,
/// and are shared across all concurrent requests.
pub(crate) trait Stage: Send + Sync + 'static {
    fn name(&self) -> &'static str;
    fn apply(&self, req: Request) -> StageFuture;
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

/// The composed request pipeline. Built once, shared by every connection.
pub struct Pipeline {
    development: bool,
    allowed_origin: Option<HeaderValue>,
    stages: Vec<Box<dyn Stage>>,
    router: Router,
    logger: SharedLogger,
}

impl Pipeline {
    /// Composes the fixed stage chain from the startup configuration.
    pub fn new(config: &Config, router: Router, logger: SharedLogger) -> Self {
        let stages: Vec<Box<dyn Stage>> = vec![
            Box::new(TransportRedirect::new(config.tls_redirect)),
            Box::new(StaticAssets::new(config.static_root.clone())),
            Box::new(ForwardedHeaders::new(config.forwarded.trust)),
            Box::new(AuthGate::new(config.auth.clone())),
        ];

        let allowed_origin = config
            .cors
            .allowed_origin
            .as_deref()
            .and_then(|origin| HeaderValue::from_str(origin).ok());

        Self {
            development: config.is_development(),
            allowed_origin,
            stages,
            router,
            logger,
        }
    }

    /// Stage names in execution order. The order is a process-lifetime
    /// invariant; this exists so it can be asserted, not changed.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Runs one request through the whole chain and always yields a
    /// well-formed response. Faults below the diagnostics gate become a 500:
    /// with full detail in development, generic otherwise (the detail then
    /// goes only to the logging facade).
    pub async fn handle(&self, req: Request) -> Response {
        let context = format!("{} {}", req.method(), req.path());
        let initially_secure = req.origin().scheme().is_secure();

        let outcome = std::panic::AssertUnwindSafe(self.run(req)).catch_unwind().await;

        let (mut response, secure) = match outcome {
            Ok(outcome) => outcome,
            Err(panic) => {
                let detail = panic_detail(&*panic);
                let response = if self.development {
                    Response::builder()
                        .status(StatusCode::INTERNAL_SERVER_ERROR)
                        .text(format!("unhandled fault in {context}: {detail}"))
                } else {
                    self.logger.error(&format!("unhandled fault in {context}: {detail}"));
                    Response::builder()
                        .status(StatusCode::INTERNAL_SERVER_ERROR)
                        .text("an unexpected fault occurred")
                };
                (response, initially_secure)
            }
        };

        // RFC 6797 §8.1: clients ignore HSTS received over insecure
        // transport, so only secure responses carry it.
        if !self.development && secure {
            response.set_header(STRICT_TRANSPORT_SECURITY, HeaderValue::from_static(HSTS_MAX_AGE));
        }
        if let Some(origin) = &self.allowed_origin {
            response.set_header(ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
        }

        response
    }

    /// Runs the stage chain. Returns the response together with whether the
    /// request's scheme was secure when the chain settled — the scheme can
    /// change mid-chain (forwarded-header rewrite), and the request itself
    /// is gone by the time the response surfaces.
    async fn run(&self, mut req: Request) -> (Response, bool) {
        let mut secure = req.origin().scheme().is_secure();
        for stage in &self.stages {
            match stage.apply(req).await {
                StageFlow::Continue(next) => {
                    req = next;
                    secure = req.origin().scheme().is_secure();
                }
                StageFlow::ShortCircuit(response) => {
                    debug!(stage = stage.name(), "pipeline short-circuit");
                    return (response, secure);
                }
            }
        }
        (self.dispatch(req).await, secure)
    }

    async fn dispatch(&self, mut req: Request) -> Response {
        match self.router.lookup(req.method(), req.path()) {
            Some((handler, params)) => {
                req.set_params(params);
                handler.call(req).await
            }
            None => Response::status(StatusCode::NOT_FOUND),
        }
    }
}

fn panic_detail(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
