use hana_models::HanaError;
use prometheus::{Counter, Encoder, Histogram, HistogramOpts, Registry, TextEncoder};
use tracing::{debug, instrument};

fn internal(e: prometheus::Error) -> HanaError {
    HanaError::Internal { reason: e.to_string() }
}

pub struct MetricsService {
    registry: Registry,
    logins_total: Counter,
    login_failures_total: Counter,
    users_created_total: Counter,
    users_deleted_total: Counter,
    uploads_total: Counter,
    downloads_total: Counter,
    upload_bytes: Histogram,
}

impl MetricsService {
    pub fn new() -> Result<Self, HanaError> {
        let registry = Registry::new();

        let logins_total = Counter::new("hana_logins_total", "Total number of successful logins")
            .map_err(internal)?;

        let login_failures_total = Counter::new(
            "hana_login_failures_total",
            "Total number of rejected login attempts",
        )
        .map_err(internal)?;

        let users_created_total =
            Counter::new("hana_users_created_total", "Total number of users created")
                .map_err(internal)?;

        let users_deleted_total =
            Counter::new("hana_users_deleted_total", "Total number of users deleted")
                .map_err(internal)?;

        let uploads_total = Counter::new("hana_uploads_total", "Total number of CSV uploads stored")
            .map_err(internal)?;

        let downloads_total =
            Counter::new("hana_downloads_total", "Total number of latest-CSV downloads served")
                .map_err(internal)?;

        let upload_bytes = Histogram::with_opts(
            HistogramOpts::new("hana_upload_bytes", "Size of stored CSV uploads in bytes")
                .buckets(prometheus::exponential_buckets(1024.0, 4.0, 8).map_err(internal)?),
        )
        .map_err(internal)?;

        registry.register(Box::new(logins_total.clone())).map_err(internal)?;
        registry.register(Box::new(login_failures_total.clone())).map_err(internal)?;
        registry.register(Box::new(users_created_total.clone())).map_err(internal)?;
        registry.register(Box::new(users_deleted_total.clone())).map_err(internal)?;
        registry.register(Box::new(uploads_total.clone())).map_err(internal)?;
        registry.register(Box::new(downloads_total.clone())).map_err(internal)?;
        registry.register(Box::new(upload_bytes.clone())).map_err(internal)?;

        Ok(Self {
            registry,
            logins_total,
            login_failures_total,
            users_created_total,
            users_deleted_total,
            uploads_total,
            downloads_total,
            upload_bytes,
        })
    }

    pub fn record_login(&self, user: &str) {
        self.logins_total.inc();
        debug!("Recorded login for user: {}", user);
    }

    pub fn record_login_failure(&self, user: &str) {
        self.login_failures_total.inc();
        debug!("Recorded failed login for user: {}", user);
    }

    pub fn record_user_created(&self, user: &str) {
        self.users_created_total.inc();
        debug!("Recorded user creation: {}", user);
    }

    pub fn record_user_deleted(&self, user: &str) {
        self.users_deleted_total.inc();
        debug!("Recorded user deletion: {}", user);
    }

    pub fn record_upload(&self, tool: &str, size: u64) {
        self.uploads_total.inc();
        self.upload_bytes.observe(size as f64);
        debug!("Recorded upload for tool: {} - {} bytes", tool, size);
    }

    pub fn record_download(&self, tool: &str) {
        self.downloads_total.inc();
        debug!("Recorded download for tool: {}", tool);
    }

    #[instrument(skip(self))]
    pub fn get_prometheus_metrics(&self) -> Result<String, HanaError> {
        let metric_families = self.registry.gather();
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();

        encoder.encode(&metric_families, &mut buffer).map_err(internal)?;

        String::from_utf8(buffer).map_err(|e| HanaError::Internal { reason: e.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_exposition() {
        let metrics = MetricsService::new().unwrap();
        metrics.record_login("ana");
        metrics.record_login("ana");
        metrics.record_login_failure("bob");
        metrics.record_upload("safeway", 2048);

        let text = metrics.get_prometheus_metrics().unwrap();
        assert!(text.contains("hana_logins_total 2"));
        assert!(text.contains("hana_login_failures_total 1"));
        assert!(text.contains("hana_uploads_total 1"));
        assert!(text.contains("hana_upload_bytes_count 1"));
        assert!(text.contains("hana_downloads_total 0"));
    }

    #[test]
    fn services_have_independent_registries() {
        let a = MetricsService::new().unwrap();
        let b = MetricsService::new().unwrap();
        a.record_download("safeway");
        assert!(b.get_prometheus_metrics().unwrap().contains("hana_downloads_total 0"));
    }
}
