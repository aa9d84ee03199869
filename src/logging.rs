//! Logging facade.
//!
//! Handlers log through the [`Logger`] trait, never through a concrete
//! backend. The trait is the whole contract: four severity-leveled
//! operations, no return value, no failure mode. Swapping the backend
//! (destination, format, minimum severity) is a configuration change that no
//! caller ever sees.
//!
//! The shipped adapter is [`TracingLogger`], which forwards each record to
//! the global `tracing` subscriber installed by [`init`]. The subscriber
//! serializes concurrent writes internally; the facade adds no lock of its
//! own. Calls issued in sequence by one handler reach the backend in issue
//! order — `tracing` dispatches synchronously on the calling task.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::{LogSink, LoggingConfig};
use crate::error::Error;

/// The closed set of record severities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Debug,
    Information,
    Warning,
    Error,
}

impl Severity {
    fn as_level_filter(self) -> LevelFilter {
        match self {
            Self::Debug => LevelFilter::DEBUG,
            Self::Information => LevelFilter::INFO,
            Self::Warning => LevelFilter::WARN,
            Self::Error => LevelFilter::ERROR,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Debug => "debug",
            Self::Information => "information",
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// The capability handlers receive: record one event at a severity.
///
/// Implementations must never propagate a sink failure to the caller —
/// logging is not allowed to abort business logic. An unreachable sink is at
/// most self-reported on the process stderr.
///
/// Empty messages are valid zero-length records, not errors.
pub trait Logger: Send + Sync + 'static {
    fn debug(&self, message: &str);
    fn information(&self, message: &str);
    fn warning(&self, message: &str);
    fn error(&self, message: &str);
}

/// Shared handle to the process-wide logger, cloned into every request.
pub type SharedLogger = Arc<dyn Logger>;

/// [`Logger`] adapter over the global `tracing` dispatcher.
///
/// `tracing` events cannot fail at the call site; a subscriber that errors
/// internally handles it without unwinding into the caller, which is exactly
/// the facade contract.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, message: &str) {
        tracing::debug!("{message}");
    }

    fn information(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn warning(&self, message: &str) {
        tracing::warn!("{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!("{message}");
    }
}

/// Installs the global `tracing` subscriber from the configured sink
/// settings.
///
/// `RUST_LOG` overrides the configured minimum severity when set, the usual
/// operator escape hatch. Fails only at startup (subscriber already
/// installed), which is treated like any other fatal configuration error.
pub fn init(config: &LoggingConfig) -> Result<(), Error> {
    let filter = EnvFilter::builder()
        .with_default_directive(config.min_level.as_level_filter().into())
        .from_env_lossy();

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = match config.sink {
        LogSink::Stdout => builder.try_init(),
        LogSink::Stderr => builder.with_writer(std::io::stderr).try_init(),
    };

    result.map_err(|e| Error::Config(format!("logging: {e}")))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct CaptureLogger {
        records: Mutex<Vec<(Severity, String)>>,
    }

    impl Logger for CaptureLogger {
        fn debug(&self, message: &str) {
            self.records.lock().unwrap().push((Severity::Debug, message.to_owned()));
        }
        fn information(&self, message: &str) {
            self.records.lock().unwrap().push((Severity::Information, message.to_owned()));
        }
        fn warning(&self, message: &str) {
            self.records.lock().unwrap().push((Severity::Warning, message.to_owned()));
        }
        fn error(&self, message: &str) {
            self.records.lock().unwrap().push((Severity::Error, message.to_owned()));
        }
    }

    #[test]
    fn records_arrive_in_issue_order() {
        let logger = CaptureLogger::default();
        logger.debug("one");
        logger.information("two");
        logger.warning("three");
        logger.error("four");

        let records = logger.records.lock().unwrap();
        let severities: Vec<Severity> = records.iter().map(|(s, _)| *s).collect();
        assert_eq!(
            severities,
            [Severity::Debug, Severity::Information, Severity::Warning, Severity::Error]
        );
    }

    #[test]
    fn empty_message_is_a_valid_record() {
        let logger = CaptureLogger::default();
        logger.information("");
        assert_eq!(logger.records.lock().unwrap().len(), 1);
    }

    #[test]
    fn severity_parses_from_config_names() {
        for (name, expected) in [
            ("debug", Severity::Debug),
            ("information", Severity::Information),
            ("warning", Severity::Warning),
            ("error", Severity::Error),
        ] {
            let parsed: Severity = serde_json::from_str(&format!("\"{name}\"")).unwrap();
            assert_eq!(parsed, expected);
        }
    }
}
