//! Request and download counters

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

const MAX_RESPONSE_TIMES: usize = 1000;

#[derive(Clone)]
pub struct MetricsCollector {
    pub total_requests: Arc<AtomicU64>,
    pub successful_requests: Arc<AtomicU64>,
    pub failed_requests: Arc<AtomicU64>,
    pub downloads_served: Arc<AtomicU64>,
    pub bytes_served: Arc<AtomicU64>,
    pub rejected_names: Arc<AtomicU64>,
    pub missing_exports: Arc<AtomicU64>,
    pub requests_by_endpoint: Arc<RwLock<HashMap<String, u64>>>,
    pub response_times: Arc<RwLock<VecDeque<u128>>>,
    pub start_time: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub downloads_served: u64,
    pub bytes_served: u64,
    pub rejected_names: u64,
    pub missing_exports: u64,
    pub requests_by_endpoint: Vec<EndpointMetric>,
    pub average_response_time_ms: f64,
    pub uptime_seconds: i64,
    pub error_rate: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EndpointMetric {
    pub endpoint: String,
    pub count: u64,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            total_requests: Arc::new(AtomicU64::new(0)),
            successful_requests: Arc::new(AtomicU64::new(0)),
            failed_requests: Arc::new(AtomicU64::new(0)),
            downloads_served: Arc::new(AtomicU64::new(0)),
            bytes_served: Arc::new(AtomicU64::new(0)),
            rejected_names: Arc::new(AtomicU64::new(0)),
            missing_exports: Arc::new(AtomicU64::new(0)),
            requests_by_endpoint: Arc::new(RwLock::new(HashMap::new())),
            response_times: Arc::new(RwLock::new(VecDeque::with_capacity(MAX_RESPONSE_TIMES))),
            start_time: Utc::now(),
        }
    }

    pub fn record_request(&self, endpoint: &str) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        let mut endpoints = self.requests_by_endpoint.write();
        *endpoints.entry(endpoint.to_string()).or_insert(0) += 1;
    }

    pub fn record_response(&self, duration_ms: u128, status: u16) {
        if status < 400 {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }

        let mut times = self.response_times.write();
        if times.len() == MAX_RESPONSE_TIMES {
            times.pop_front();
        }
        times.push_back(duration_ms);
    }

    /// Counts a download whose headers were sent; `size` is the announced length.
    pub fn record_download(&self, size: u64) {
        self.downloads_served.fetch_add(1, Ordering::Relaxed);
        self.bytes_served.fetch_add(size, Ordering::Relaxed);
    }

    pub fn record_rejected_name(&self) {
        self.rejected_names.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_missing_export(&self) {
        self.missing_exports.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_snapshot(&self) -> MetricsSnapshot {
        let total = self.total_requests.load(Ordering::Relaxed);
        let failed = self.failed_requests.load(Ordering::Relaxed);

        let uptime_seconds = Utc::now()
            .signed_duration_since(self.start_time)
            .num_seconds()
            .max(1);

        let mut requests_by_endpoint: Vec<EndpointMetric> = self
            .requests_by_endpoint
            .read()
            .iter()
            .map(|(endpoint, count)| EndpointMetric {
                endpoint: endpoint.clone(),
                count: *count,
            })
            .collect();
        requests_by_endpoint.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.endpoint.cmp(&b.endpoint))
        });

        let times = self.response_times.read();
        let average_response_time_ms = if times.is_empty() {
            0.0
        } else {
            times.iter().map(|t| *t as f64).sum::<f64>() / times.len() as f64
        };

        MetricsSnapshot {
            total_requests: total,
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: failed,
            downloads_served: self.downloads_served.load(Ordering::Relaxed),
            bytes_served: self.bytes_served.load(Ordering::Relaxed),
            rejected_names: self.rejected_names.load(Ordering::Relaxed),
            missing_exports: self.missing_exports.load(Ordering::Relaxed),
            requests_by_endpoint,
            average_response_time_ms,
            uptime_seconds,
            error_rate: if total > 0 {
                (failed as f64 / total as f64) * 100.0
            } else {
                0.0
            },
        }
    }
}
