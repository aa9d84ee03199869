//! Built-in health-check handlers.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? |
//! | **Readiness** | `/readyz` | Can it serve traffic? |

use crate::{Request, Response};

/// Liveness probe handler. If the process can respond to HTTP at all, it is
/// alive — this handler intentionally has no dependencies.
pub async fn liveness(_req: Request) -> Response {
    Response::text("ok")
}

/// Readiness probe handler. This service holds no warm-up state, so ready is
/// unconditional.
pub async fn readiness(_req: Request) -> Response {
    Response::text("ready")
}
