//! `[observability]` settings: OTLP span export and the Prometheus scrape route

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub tracing: TracingConfig,
    pub metrics: MetricsConfig,
}

/// Span export over OTLP/gRPC. Console logging is configured separately
/// under `[logging]` and is always on.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    pub enabled: bool,
    pub otlp_endpoint: String,
    /// Reported as the `service.name` resource attribute
    pub service_name: String,
    /// Fraction of root spans kept; values outside 0..=1 saturate
    pub sampling_ratio: f64,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            otlp_endpoint: "http://localhost:4317".to_string(),
            service_name: env!("CARGO_PKG_NAME").to_string(),
            sampling_ratio: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/metrics".to_string(),
        }
    }
}

impl MetricsConfig {
    /// Scrape route as mounted on the router. A missing leading slash is
    /// added, since axum rejects relative routes at startup.
    pub fn route(&self) -> String {
        let trimmed = self.path.trim().trim_start_matches('/');
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_name_this_service() {
        let config = ObservabilityConfig::default();

        assert!(!config.tracing.enabled);
        assert_eq!(config.tracing.service_name, "todo-service");
        assert!(config.metrics.enabled);
        assert_eq!(config.metrics.route(), "/metrics");
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config: ObservabilityConfig = serde_json::from_str(
            r#"{"tracing": {"enabled": true, "sampling_ratio": 0.25}, "metrics": {"enabled": false}}"#,
        )
        .unwrap();

        assert!(config.tracing.enabled);
        assert_eq!(config.tracing.sampling_ratio, 0.25);
        assert_eq!(config.tracing.otlp_endpoint, "http://localhost:4317");
        assert!(!config.metrics.enabled);
        assert_eq!(config.metrics.route(), "/metrics");
    }

    #[test]
    fn test_metrics_route_is_absolute() {
        let config: MetricsConfig = serde_json::from_str(r#"{"path": "internal/metrics"}"#).unwrap();
        assert_eq!(config.route(), "/internal/metrics");

        let config: MetricsConfig = serde_json::from_str(r#"{"path": "//prom"}"#).unwrap();
        assert_eq!(config.route(), "/prom");
    }
}
