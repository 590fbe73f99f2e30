//! In-process request metrics.
//!
//! [`track_requests`] records method, route, status and latency for every
//! response; `/metrics` and `/metrics/summary` expose snapshots. Counters
//! live in memory and reset on restart.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use serde::Serialize;

/// Latency samples kept per endpoint; older samples are dropped first.
pub const MAX_DURATION_SAMPLES: usize = 1000;

/// p95 is reported only above this many samples (the mean otherwise).
const P95_MIN_SAMPLES: usize = 20;

/// p99 is reported only above this many samples (the mean otherwise).
const P99_MIN_SAMPLES: usize = 100;

#[derive(Debug, Default)]
struct EndpointStats {
    count: u64,
    errors: u64,
    durations_ms: VecDeque<f64>,
}

#[derive(Debug, Default)]
struct Counters {
    endpoints: HashMap<String, EndpointStats>,
    status_codes: BTreeMap<u16, u64>,
}

/// Shared request metrics collector.
#[derive(Debug, Clone, Default)]
pub struct RequestMetrics {
    inner: Arc<Mutex<Counters>>,
}

/// Per-endpoint figures in a [`MetricsSnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointMetrics {
    pub count: u64,
    pub errors: u64,
    pub avg_duration_ms: f64,
    pub p95_duration_ms: f64,
    pub p99_duration_ms: f64,
}

/// Response body of `GET /metrics`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub total_errors: u64,
    /// Keyed by `"<METHOD> <route>"`.
    pub endpoints: BTreeMap<String, EndpointMetrics>,
    pub status_codes: BTreeMap<u16, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlowestEndpoint {
    pub endpoint: String,
    pub avg_duration_ms: f64,
}

/// Response body of `GET /metrics/summary`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub total_requests: u64,
    pub total_errors: u64,
    pub error_rate_percent: f64,
    pub slowest_endpoint: Option<SlowestEndpoint>,
    pub status_codes: BTreeMap<u16, u64>,
}

impl RequestMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one response. Statuses of 400 and above count as errors.
    pub fn record(&self, endpoint: String, status: u16, duration_ms: f64) {
        let mut counters = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        let stats = counters.endpoints.entry(endpoint).or_default();
        stats.count += 1;
        if status >= 400 {
            stats.errors += 1;
        }
        if stats.durations_ms.len() == MAX_DURATION_SAMPLES {
            stats.durations_ms.pop_front();
        }
        stats.durations_ms.push_back(duration_ms);

        *counters.status_codes.entry(status).or_default() += 1;
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let counters = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        let endpoints: BTreeMap<String, EndpointMetrics> = counters
            .endpoints
            .iter()
            .map(|(endpoint, stats)| (endpoint.clone(), endpoint_metrics(stats)))
            .collect();

        MetricsSnapshot {
            total_requests: endpoints.values().map(|e| e.count).sum(),
            total_errors: endpoints.values().map(|e| e.errors).sum(),
            endpoints,
            status_codes: counters.status_codes.clone(),
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        let snapshot = self.snapshot();

        let error_rate_percent = if snapshot.total_requests > 0 {
            round2(snapshot.total_errors as f64 / snapshot.total_requests as f64 * 100.0)
        } else {
            0.0
        };

        // First endpoint wins ties; an all-zero latency set reports none.
        let slowest_endpoint = snapshot
            .endpoints
            .iter()
            .fold(None::<(&String, f64)>, |slowest, (endpoint, metrics)| {
                match slowest {
                    Some((_, avg)) if metrics.avg_duration_ms <= avg => slowest,
                    _ if metrics.avg_duration_ms > 0.0 => Some((endpoint, metrics.avg_duration_ms)),
                    _ => slowest,
                }
            })
            .map(|(endpoint, avg_duration_ms)| SlowestEndpoint {
                endpoint: endpoint.clone(),
                avg_duration_ms,
            });

        MetricsSummary {
            total_requests: snapshot.total_requests,
            total_errors: snapshot.total_errors,
            error_rate_percent,
            slowest_endpoint,
            status_codes: snapshot.status_codes,
        }
    }
}

fn endpoint_metrics(stats: &EndpointStats) -> EndpointMetrics {
    let samples = stats.durations_ms.len();
    if samples == 0 {
        return EndpointMetrics {
            count: stats.count,
            errors: stats.errors,
            avg_duration_ms: 0.0,
            p95_duration_ms: 0.0,
            p99_duration_ms: 0.0,
        };
    }

    let avg = stats.durations_ms.iter().sum::<f64>() / samples as f64;
    let mut sorted: Vec<f64> = stats.durations_ms.iter().copied().collect();
    sorted.sort_by(f64::total_cmp);

    let percentile = |fraction: f64, min_samples: usize| {
        if samples > min_samples {
            sorted[(samples as f64 * fraction) as usize]
        } else {
            avg
        }
    };

    EndpointMetrics {
        count: stats.count,
        errors: stats.errors,
        avg_duration_ms: round2(avg),
        p95_duration_ms: round2(percentile(0.95, P95_MIN_SAMPLES)),
        p99_duration_ms: round2(percentile(0.99, P99_MIN_SAMPLES)),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Middleware
// ---------------------------------------------------------------------------

/// Record every response in `metrics`.
///
/// Endpoints are keyed by the matched route template when there is one, so
/// path parameters do not fan out into separate entries.
pub async fn track_requests(
    State(metrics): State<RequestMetrics>,
    request: Request,
    next: Next,
) -> Response {
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let endpoint = format!("{} {}", request.method(), path);

    let started = Instant::now();
    let response = next.run(request).await;
    let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

    metrics.record(endpoint, response.status().as_u16(), duration_ms);
    response
}
