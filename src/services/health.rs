//! Service health monitoring
//!
//! A background sampler measures event-loop delay: it sleeps for a fixed
//! interval and records how far past the deadline it actually woke up.
//! Overshoot beyond the configured threshold marks the process as under
//! pressure, and the health endpoint starts answering 503 so load
//! balancers back off until the executor catches up.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use actix_web::{HttpResponse, Responder, web};
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{trace, warn};

use crate::config::HealthConfig;

// Application start time, shared with the health endpoint
#[derive(Clone, Debug)]
pub struct AppStartTime {
    pub start_datetime: chrono::DateTime<chrono::Utc>,
}

/// Shared health state, written by the sampler and read by the endpoint.
#[derive(Debug, Default)]
pub struct HealthState {
    under_pressure: AtomicBool,
    last_delay_ms: AtomicU64,
    max_delay_ms: AtomicU64,
    samples: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_under_pressure(&self) -> bool {
        self.under_pressure.load(Ordering::Relaxed)
    }

    pub fn mark_pressure(&self, pressured: bool) {
        self.under_pressure.store(pressured, Ordering::Relaxed);
    }

    pub fn last_delay_ms(&self) -> u64 {
        self.last_delay_ms.load(Ordering::Relaxed)
    }

    fn record_sample(&self, delay: Duration, threshold: Duration) {
        let delay_ms = delay.as_millis() as u64;
        self.last_delay_ms.store(delay_ms, Ordering::Relaxed);
        self.max_delay_ms.fetch_max(delay_ms, Ordering::Relaxed);
        self.samples.fetch_add(1, Ordering::Relaxed);
        self.mark_pressure(delay > threshold);
    }
}

/// Background event-loop delay sampler.
pub struct HealthMonitor {
    state: Arc<HealthState>,
    interval: Duration,
    max_delay: Duration,
}

impl HealthMonitor {
    pub fn new(config: &HealthConfig) -> Self {
        Self {
            state: Arc::new(HealthState::new()),
            interval: Duration::from_millis(config.check_interval_ms),
            max_delay: Duration::from_millis(config.max_event_loop_delay_ms),
        }
    }

    pub fn state(&self) -> Arc<HealthState> {
        self.state.clone()
    }

    /// Start sampling. The task runs until the process exits; the handle
    /// is returned so callers can abort it in tests.
    pub fn spawn(&self) -> JoinHandle<()> {
        let state = self.state.clone();
        let interval = self.interval;
        let max_delay = self.max_delay;
        tokio::spawn(async move {
            loop {
                let before = Instant::now();
                tokio::time::sleep(interval).await;
                let overshoot = before.elapsed().saturating_sub(interval);
                state.record_sample(overshoot, max_delay);
                if overshoot > max_delay {
                    warn!(
                        delay_ms = overshoot.as_millis() as u64,
                        threshold_ms = max_delay.as_millis() as u64,
                        "Event loop delay above threshold, reporting under-pressure"
                    );
                }
            }
        })
    }
}

pub struct HealthService;

impl HealthService {
    /// Health endpoint: 200 when healthy, 503 when under pressure.
    pub async fn health_check(
        state: web::Data<Arc<HealthState>>,
        app_start_time: web::Data<AppStartTime>,
    ) -> impl Responder {
        trace!("Received health check request");

        let now = chrono::Utc::now();
        let uptime_seconds = (now - app_start_time.start_datetime).num_seconds().max(0) as u64;
        let under_pressure = state.is_under_pressure();

        let body = json!({
            "status": if under_pressure { "under-pressure" } else { "ok" },
            "timestamp": now.to_rfc3339(),
            "uptime": uptime_seconds,
            "event_loop_delay_ms": state.last_delay_ms(),
        });

        let status = if under_pressure {
            actix_web::http::StatusCode::SERVICE_UNAVAILABLE
        } else {
            actix_web::http::StatusCode::OK
        };

        HttpResponse::build(status)
            .append_header(("Content-Type", "application/json; charset=utf-8"))
            .json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pressure_flag_follows_threshold() {
        let state = HealthState::new();
        let threshold = Duration::from_millis(100);

        state.record_sample(Duration::from_millis(20), threshold);
        assert!(!state.is_under_pressure());
        assert_eq!(state.last_delay_ms(), 20);

        state.record_sample(Duration::from_millis(250), threshold);
        assert!(state.is_under_pressure());

        // Recovers once delays drop back under the threshold.
        state.record_sample(Duration::from_millis(5), threshold);
        assert!(!state.is_under_pressure());
    }

    #[tokio::test]
    async fn sampler_records_samples() {
        let monitor = HealthMonitor::new(&HealthConfig {
            enabled: true,
            route: "/_health".to_string(),
            max_event_loop_delay_ms: 1_000,
            check_interval_ms: 10,
        });
        let state = monitor.state();
        let handle = monitor.spawn();

        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        assert!(state.samples.load(Ordering::Relaxed) > 0);
        assert!(!state.is_under_pressure());
    }
}
