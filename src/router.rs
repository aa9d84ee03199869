//! Radix-tree request router.
//!
//! One tree per HTTP method, O(path-length) lookup. Routes are registered at
//! startup and the table is immutable afterwards — dispatch never mutates it.

use std::collections::HashMap;
use std::sync::Arc;

use matchit::Router as MatchitRouter;

use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;

/// The application router.
///
/// Build it once at startup; the pipeline's dispatch stage owns it for the
/// process lifetime. Each [`Router::on`] call returns `self` so
/// registrations chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// Path parameters use `{name}` syntax — `req.param("name")` retrieves them:
    ///
    /// ```rust,no_run
    /// # use weathervane::{Method, Request, Response, Router};
    /// # async fn forecast(_: Request) -> Response { Response::text("") }
    /// # async fn liveness(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::Get, "/weatherforecast", forecast)
    ///     .on(Method::Get, "/healthz",         liveness);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics on a malformed or conflicting route pattern. Routes are
    /// registered once at startup, so this fails the process before it
    /// accepts traffic.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub(crate) fn lookup(
        &self,
        method: Method,
        path: &str,
    ) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(&method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched
            .params
            .iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
