//! Web 服务指标

use clinic_core::{ClinicError, Result};
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry};
use std::time::Duration;

/// Prometheus 指标收集器
#[derive(Debug, Clone)]
pub struct WebMetrics {
    registry: Registry,
    /// 按操作统计的请求数
    requests_total: IntCounterVec,
    /// 按错误种类统计的失败数
    errors_total: IntCounterVec,
    /// 实体搜索耗时
    search_duration: Histogram,
}

impl WebMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("clinic_requests_total", "Total number of API requests"),
            &["operation"],
        )
        .map_err(metrics_error)?;
        let errors_total = IntCounterVec::new(
            Opts::new("clinic_errors_total", "Total number of failed API requests"),
            &["kind"],
        )
        .map_err(metrics_error)?;
        let search_duration = Histogram::with_opts(
            HistogramOpts::new(
                "clinic_entity_search_duration_seconds",
                "Entity search latency in seconds",
            )
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        )
        .map_err(metrics_error)?;

        registry
            .register(Box::new(requests_total.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(errors_total.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(search_duration.clone()))
            .map_err(metrics_error)?;

        Ok(Self {
            registry,
            requests_total,
            errors_total,
            search_duration,
        })
    }

    pub fn record_request(&self, operation: &str) {
        self.requests_total.with_label_values(&[operation]).inc();
    }

    pub fn record_error(&self, err: &ClinicError) {
        self.errors_total.with_label_values(&[err.kind()]).inc();
    }

    pub fn observe_search(&self, elapsed: Duration) {
        self.search_duration.observe(elapsed.as_secs_f64());
    }

    pub fn requests(&self, operation: &str) -> u64 {
        self.requests_total.with_label_values(&[operation]).get()
    }

    /// 导出 Prometheus 文本格式
    pub fn render(&self) -> Result<String> {
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(metrics_error)?;

        String::from_utf8(buffer).map_err(|e| ClinicError::Internal(e.to_string()))
    }
}

fn metrics_error(err: prometheus::Error) -> ClinicError {
    ClinicError::Internal(format!("metrics: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_recorded_values() {
        let metrics = WebMetrics::new().unwrap();
        metrics.record_request("search");
        metrics.record_request("search");
        metrics.record_error(&ClinicError::NotFound("1".into()));
        metrics.observe_search(Duration::from_millis(12));

        assert_eq!(metrics.requests("search"), 2);
        let text = metrics.render().unwrap();
        assert!(text.contains("clinic_requests_total{operation=\"search\"} 2"));
        assert!(text.contains("clinic_errors_total{kind=\"not_found\"} 1"));
        assert!(text.contains("clinic_entity_search_duration_seconds_count 1"));
    }
}
