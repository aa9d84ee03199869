//! Service entrypoint: config, logging, router, pipeline, serve.
//!
//! Exit codes: 0 after a graceful shutdown; 1 when startup configuration is
//! malformed (the listener never binds in that case).

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use weathervane::{
    health, logging, weather, Config, Method, Pipeline, Router, Server, SharedLogger,
    TracingLogger,
};

fn config_path() -> PathBuf {
    std::env::var_os("WEATHERVANE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("weathervane.toml"))
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::load(&config_path()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("weathervane: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init(&config.logging) {
        eprintln!("weathervane: {e}");
        return ExitCode::FAILURE;
    }

    let router = Router::new()
        .on(Method::Get, "/weatherforecast", weather::forecast)
        .on(Method::Get, "/healthz", health::liveness)
        .on(Method::Get, "/readyz", health::readiness);

    let logger: SharedLogger = Arc::new(TracingLogger);
    let pipeline = Pipeline::new(&config, router, Arc::clone(&logger));

    match Server::bind(&config.listen).serve(pipeline, logger).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("weathervane: {e}");
            ExitCode::FAILURE
        }
    }
}
