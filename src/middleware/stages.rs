//! The concrete pipeline stages.
//!
//! Each stage holds only the slice of startup configuration it needs, cloned
//! once when the pipeline is composed. Nothing here writes shared state
//! during request processing.

use std::net::IpAddr;
use std::path::{Component, Path, PathBuf};

use http::StatusCode;

use crate::config::{AuthPolicy, TrustPolicy};
use crate::request::{Request, Scheme};
use crate::response::{ContentType, Response};

use super::{Stage, StageFlow, StageFuture};

// ── Transport redirect ────────────────────────────────────────────────────────

/// Redirects insecure-transport requests to their `https` equivalent.
///
/// Runs for every request in every environment. The check happens before the
/// forwarded-header rewrite, so it sees the literal listener scheme — a
/// deployment that terminates TLS upstream disables the redirect with
/// `tls_redirect = false` instead of relying on proxy headers.
pub(crate) struct TransportRedirect {
    enabled: bool,
}

impl TransportRedirect {
    pub(crate) fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl Stage for TransportRedirect {
    fn name(&self) -> &'static str {
        "transport_redirect"
    }

    fn apply(&self, req: Request) -> StageFuture {
        let flow = if self.enabled && !req.origin().scheme().is_secure() {
            // The secure equivalent is the full request target, query included.
            let target = match req.query() {
                Some(query) => {
                    format!("https://{}{}?{query}", req.origin().host(), req.path())
                }
                None => format!("https://{}{}", req.origin().host(), req.path()),
            };
            StageFlow::ShortCircuit(Response::redirect(&target))
        } else {
            StageFlow::Continue(req)
        };
        Box::pin(async move { flow })
    }
}

// ── Static assets ─────────────────────────────────────────────────────────────

/// Serves pre-existing files under the configured root and short-circuits;
/// anything else passes onward. Disabled when no root is configured.
pub(crate) struct StaticAssets {
    root: Option<PathBuf>,
}

impl StaticAssets {
    pub(crate) fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }
}

/// Maps a request path to a file path under `root`. Rejects anything that
/// could escape the root (parent components, absolute segments).
fn resolve_asset(root: &Path, request_path: &str) -> Option<PathBuf> {
    let relative = request_path.trim_start_matches('/');
    if relative.is_empty() {
        return None;
    }
    let relative = Path::new(relative);
    if !relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(root.join(relative))
}

impl Stage for StaticAssets {
    fn name(&self) -> &'static str {
        "static_assets"
    }

    fn apply(&self, req: Request) -> StageFuture {
        let root = self.root.clone();
        Box::pin(async move {
            let Some(root) = root else {
                return StageFlow::Continue(req);
            };
            if req.method() != crate::method::Method::Get {
                return StageFlow::Continue(req);
            }
            let Some(path) = resolve_asset(&root, req.path()) else {
                return StageFlow::Continue(req);
            };
            match tokio::fs::read(&path).await {
                Ok(body) => {
                    let content_type = path
                        .extension()
                        .and_then(|e| e.to_str())
                        .map(ContentType::from_extension)
                        .unwrap_or(ContentType::OctetStream);
                    StageFlow::ShortCircuit(
                        Response::builder().bytes(content_type, body),
                    )
                }
                // Absent, a directory, or unreadable: not an asset, keep going.
                Err(_) => StageFlow::Continue(req),
            }
        })
    }
}

// ── Forwarded headers ─────────────────────────────────────────────────────────

/// Rewrites the request's apparent origin from `x-forwarded-*` headers when
/// the configured trust policy accepts them.
///
/// With `trust = "all"` (the shipped default) every forwarded value is
/// believed. That is only safe behind a controlled proxy; see
/// [`ForwardedConfig`](crate::config::ForwardedConfig).
pub(crate) struct ForwardedHeaders {
    trust: TrustPolicy,
}

impl ForwardedHeaders {
    pub(crate) fn new(trust: TrustPolicy) -> Self {
        Self { trust }
    }
}

/// First entry of a comma-separated `x-forwarded-for` list — the original
/// client; later entries are intermediate proxies.
fn forwarded_client(value: &str) -> Option<IpAddr> {
    value.split(',').next()?.trim().parse().ok()
}

fn forwarded_scheme(value: &str) -> Option<Scheme> {
    match value.trim() {
        "http" => Some(Scheme::Http),
        "https" => Some(Scheme::Https),
        _ => None,
    }
}

impl Stage for ForwardedHeaders {
    fn name(&self) -> &'static str {
        "forwarded_headers"
    }

    fn apply(&self, mut req: Request) -> StageFuture {
        if self.trust == TrustPolicy::All {
            let client = req.header("x-forwarded-for").and_then(forwarded_client);
            let scheme = req.header("x-forwarded-proto").and_then(forwarded_scheme);
            let host = req.header("x-forwarded-host").map(str::to_owned);

            let origin = req.origin_mut();
            if let Some(client) = client {
                origin.set_client(client);
            }
            if let Some(scheme) = scheme {
                origin.set_scheme(scheme);
            }
            if let Some(host) = host {
                origin.set_host(host);
            }
        }
        Box::pin(async move { StageFlow::Continue(req) })
    }
}

// ── Authorization gate ────────────────────────────────────────────────────────

/// Admits or rejects the request per the configured policy. A rejection
/// short-circuits with 401 before any handler (or its log calls) runs.
pub(crate) struct AuthGate {
    policy: AuthPolicy,
}

impl AuthGate {
    pub(crate) fn new(policy: AuthPolicy) -> Self {
        Self { policy }
    }

    fn admits(&self, req: &Request) -> bool {
        match &self.policy {
            AuthPolicy::AllowAll => true,
            AuthPolicy::ApiKey { header, key } => req.header(header) == Some(key),
        }
    }
}

impl Stage for AuthGate {
    fn name(&self) -> &'static str {
        "authorization"
    }

    fn apply(&self, req: Request) -> StageFuture {
        let flow = if self.admits(&req) {
            StageFlow::Continue(req)
        } else {
            StageFlow::ShortCircuit(Response::status(StatusCode::UNAUTHORIZED))
        };
        Box::pin(async move { flow })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::Method;

    #[test]
    fn asset_paths_cannot_escape_the_root() {
        let root = Path::new("/srv/assets");
        assert_eq!(
            resolve_asset(root, "/css/site.css"),
            Some(PathBuf::from("/srv/assets/css/site.css"))
        );
        assert_eq!(resolve_asset(root, "/../etc/passwd"), None);
        assert_eq!(resolve_asset(root, "/a/../../etc/passwd"), None);
        assert_eq!(resolve_asset(root, "/"), None);
    }

    #[test]
    fn forwarded_client_takes_first_hop() {
        assert_eq!(
            forwarded_client("203.0.113.9, 10.0.0.1"),
            Some("203.0.113.9".parse().unwrap())
        );
        assert_eq!(forwarded_client("not-an-ip"), None);
    }

    #[test]
    fn forwarded_scheme_ignores_garbage() {
        assert_eq!(forwarded_scheme("https"), Some(Scheme::Https));
        assert_eq!(forwarded_scheme(" http "), Some(Scheme::Http));
        assert_eq!(forwarded_scheme("gopher"), None);
    }

    #[tokio::test]
    async fn untrusted_forwarded_headers_are_ignored() {
        let stage = ForwardedHeaders::new(TrustPolicy::None);
        let req = Request::builder(Method::Get, "/")
            .header("x-forwarded-proto", "https")
            .header("x-forwarded-host", "evil.example")
            .build();
        match stage.apply(req).await {
            StageFlow::Continue(req) => {
                assert_eq!(req.origin().scheme(), Scheme::Http);
                assert_eq!(req.origin().host(), "localhost");
            }
            StageFlow::ShortCircuit(_) => panic!("stage must not short-circuit"),
        }
    }

    #[tokio::test]
    async fn auth_gate_rejects_missing_key() {
        let stage = AuthGate::new(AuthPolicy::ApiKey {
            header: "x-api-key".to_owned(),
            key: "s3cret".to_owned(),
        });
        let req = Request::builder(Method::Get, "/weatherforecast").build();
        match stage.apply(req).await {
            StageFlow::ShortCircuit(res) => {
                assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED)
            }
            StageFlow::Continue(_) => panic!("gate must reject"),
        }
    }
}
