//! # weathervane
//!
//! A minimal HTTP service exposing one synthetic data endpoint, wired
//! through a fixed request pipeline and a structured-logging facade.
//!
//! ## The shape
//!
//! Two pieces compose linearly per request:
//!
//! - **[`Logger`]** — the capability handlers log through: four
//!   severity-leveled operations, no knowledge of the backend. The backend
//!   (destination, minimum severity) is picked from configuration at startup
//!   and can change without touching a single caller.
//! - **[`Pipeline`]** — the ordered stage chain every request passes through
//!   exactly once before dispatch: diagnostics gate, transport redirect,
//!   static assets, forwarded-header trust, authorization gate, routing.
//!   Composed once at startup, immutable for the process lifetime.
//!
//! [`Config`] is loaded once, validated, and shared read-only; a malformed
//! config file is the only fault allowed to kill the process.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use weathervane::{logging, Config, Method, Pipeline, Router, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), weathervane::Error> {
//!     let config = Config::load(Path::new("weathervane.toml"))?;
//!     logging::init(&config.logging)?;
//!
//!     let router = Router::new()
//!         .on(Method::Get, "/weatherforecast", weathervane::weather::forecast);
//!
//!     let logger: weathervane::SharedLogger = Arc::new(weathervane::TracingLogger);
//!     let pipeline = Pipeline::new(&config, router, Arc::clone(&logger));
//!
//!     Server::bind(&config.listen).serve(pipeline, logger).await
//! }
//! ```

mod config;
mod error;
mod handler;
mod method;
mod request;
mod response;
mod router;
mod server;

pub mod health;
pub mod logging;
pub mod middleware;
pub mod weather;

pub use config::{AuthPolicy, Config, CorsConfig, ForwardedConfig, LogSink, LoggingConfig, TrustPolicy};
pub use error::Error;
pub use handler::Handler;
pub use logging::{Logger, Severity, SharedLogger, TracingLogger};
pub use method::Method;
pub use middleware::{Pipeline, StageFlow};
pub use request::{Origin, Request, RequestBuilder, Scheme};
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
