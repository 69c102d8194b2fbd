//! Prometheus metrics.
//!
//! HTTP traffic is recorded by [`metrics_middleware`]; domain events by the
//! `track_*` helpers. Everything is a no-op when `OBSERVABILITY_ENABLED` is
//! `false` or `0`.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use tracing::warn;

const HTTP_REQUESTS: &str = "http_requests_total";
const HTTP_DURATION: &str = "http_request_duration_seconds";
const HTTP_ACTIVE: &str = "http_requests_active";

const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0,
];

const UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

static OBSERVABILITY_ENABLED: OnceLock<bool> = OnceLock::new();

pub fn is_observability_enabled() -> bool {
    *OBSERVABILITY_ENABLED.get_or_init(|| {
        std::env::var("OBSERVABILITY_ENABLED")
            .map(|v| !(v.eq_ignore_ascii_case("false") || v == "0"))
            .unwrap_or(true)
    })
}

fn record(f: impl FnOnce()) {
    if is_observability_enabled() {
        f();
    }
}

/// Installs the Prometheus recorder and spawns its upkeep task.
///
/// Returns `None` when observability is disabled or a recorder is already
/// installed; the server keeps running without `/metrics` output.
pub fn init_metrics() -> Option<PrometheusHandle> {
    if !is_observability_enabled() {
        return None;
    }

    let handle = match PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(HTTP_DURATION.to_string()), LATENCY_BUCKETS)
        .and_then(|builder| builder.install_recorder())
    {
        Ok(handle) => handle,
        Err(e) => {
            warn!(error = %e, "Failed to install Prometheus recorder, metrics disabled");
            return None;
        }
    };

    let upkeep = handle.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(UPKEEP_INTERVAL);
        loop {
            interval.tick().await;
            upkeep.run_upkeep();
        }
    });

    Some(handle)
}

/// Counts requests by method, matched route and status, and records latency.
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    if !is_observability_enabled() {
        return next.run(req).await;
    }

    let start = Instant::now();
    let method = req.method().to_string();
    // Route templates keep label cardinality bounded
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());

    gauge!(HTTP_ACTIVE).increment(1.0);
    let response = next.run(req).await;
    gauge!(HTTP_ACTIVE).decrement(1.0);

    let status = response.status().as_u16().to_string();
    histogram!(HTTP_DURATION, "method" => method.clone(), "path" => route.clone())
        .record(start.elapsed().as_secs_f64());
    counter!(HTTP_REQUESTS, "method" => method, "path" => route, "status" => status).increment(1);

    response
}

pub fn track_user_registered(role: &str) {
    record(|| counter!("users_registered_total", "role" => role.to_owned()).increment(1));
}

pub fn track_user_login_success(role: &str) {
    record(|| {
        counter!("user_logins_total", "role" => role.to_owned(), "status" => "success")
            .increment(1)
    });
}

pub fn track_user_login_failure(reason: &str) {
    record(|| {
        counter!("user_logins_total", "role" => "unknown", "status" => "failure", "reason" => reason.to_owned())
            .increment(1)
    });
}

/// `kind` is one of access, refresh, password_reset, email_verification
pub fn track_token_issued(kind: &str) {
    record(|| counter!("tokens_issued_total", "kind" => kind.to_owned()).increment(1));
}

pub fn track_token_revoked() {
    record(|| counter!("tokens_revoked_total").increment(1));
}

pub fn track_authentication(outcome: &str) {
    record(|| counter!("authentications_total", "outcome" => outcome.to_owned()).increment(1));
}

pub fn track_authorization_check(check: &str, allowed: bool) {
    let status = if allowed { "allowed" } else { "denied" };
    record(|| {
        counter!("authorization_checks_total", "check" => check.to_owned(), "status" => status)
            .increment(1)
    });
}

pub fn track_location_update() {
    record(|| counter!("bus_location_updates_total").increment(1));
}

pub fn track_trip_transition(to: &str) {
    record(|| counter!("trip_transitions_total", "to" => to.to_owned()).increment(1));
}
