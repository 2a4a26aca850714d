use crate::error::{ErrorClass, GatewayError, Result};
use crate::gateway::Surface;
use crate::rate_limit::Channel;
use crate::retry::RetryReason;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Metrics service for collecting and exposing Prometheus metrics
#[derive(Clone)]
pub struct MetricsService {
    handle: Arc<PrometheusHandle>,
}

impl MetricsService {
    /// Install the process-wide Prometheus recorder
    pub fn new() -> Result<Self> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            GatewayError::Internal(format!("Failed to install metrics recorder: {}", e))
        })?;

        Self::register_metrics();

        info!("Metrics service initialized successfully");

        Ok(Self {
            handle: Arc::new(handle),
        })
    }

    fn register_metrics() {
        describe_counter!(
            "gateway_api_calls_total",
            "Logical API calls admitted by a gateway"
        );
        describe_counter!(
            "gateway_api_retries_total",
            "Dispatches repeated after a transient failure"
        );
        describe_counter!(
            "gateway_api_failures_total",
            "API calls that returned an error to the caller"
        );
        describe_histogram!(
            "gateway_rate_limit_wait_seconds",
            "Time spent waiting for a rate limit permit"
        );

        debug!("All metrics registered with descriptions");
    }

    /// Render metrics in Prometheus format
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Record a call admitted through a gateway
pub fn record_api_call(surface: Surface, operation: &'static str, channel: Channel) {
    let labels = [
        ("surface", surface.as_str()),
        ("operation", operation),
        ("channel", channel.as_str()),
    ];
    counter!("gateway_api_calls_total", &labels).increment(1);
}

/// Record a call that ended in an error
pub fn record_api_failure(surface: Surface, class: ErrorClass) {
    let labels = [("surface", surface.as_str()), ("class", class.as_str())];
    counter!("gateway_api_failures_total", &labels).increment(1);
}

/// Record one retry
pub fn record_retry(reason: RetryReason) {
    let labels = [("reason", reason.as_str())];
    counter!("gateway_api_retries_total", &labels).increment(1);
}

/// Record how long an acquisition had to wait
pub fn record_rate_limit_wait(channel: Channel, waited: Duration) {
    let labels = [("channel", channel.as_str())];
    histogram!("gateway_rate_limit_wait_seconds", &labels).record(waited.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_metrics_service_creation() {
        // The recorder is process-wide; another test may have installed it
        match MetricsService::new() {
            Ok(service) => {
                record_api_call(Surface::Sheets, "get_values", Channel::Read);
                let rendered = service.render();
                assert!(rendered.contains("gateway_api_calls_total"), "{}", rendered);

                // clones render from the same recorder
                record_retry(RetryReason::RateLimited);
                let snapshot = service.clone().render();
                assert!(snapshot.contains("gateway_api_retries_total"), "{}", snapshot);
            }
            Err(e) => {
                assert!(e.to_string().contains("recorder"));
            }
        }
    }

    #[test]
    fn test_record_functions_dont_panic() {
        record_api_call(Surface::Drive, "list_files", Channel::Read);
        record_api_failure(Surface::Slides, ErrorClass::Fatal);
        record_retry(RetryReason::ServerError(503));
        record_rate_limit_wait(Channel::Write, Duration::from_millis(250));
    }
}
