//! Metrics collection and export for resource pools

use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::Serialize;

/// Metrics snapshot for one pool
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{PoolOptions, PoolRegistry, Resource, ResourceKey};
///
/// struct Coin(bool);
/// impl Resource for Coin {
///     fn set_live(&mut self, live: bool) { self.0 = live; }
///     fn is_live(&self) -> bool { self.0 }
/// }
///
/// let mut registry = PoolRegistry::init(|_: &ResourceKey| Coin(false));
/// registry.create_pool("coin", PoolOptions::fixed(3)).unwrap();
///
/// let _coin = registry.get("coin").unwrap();
/// let metrics = registry.metrics("coin").unwrap();
/// assert_eq!(metrics.total_retrieved, 1);
/// assert_eq!(metrics.active_objects, 1);
/// assert_eq!(metrics.available_objects, 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct PoolMetrics {
    /// Total activations handed out
    pub total_retrieved: u64,

    /// Total activations that ended
    pub total_returned: u64,

    /// Instances ever constructed for the pool
    pub total_constructed: u64,

    /// Activations ended early to make room in a recycling pool
    pub evictions: u64,

    /// Requests refused because a fixed pool was empty
    pub exhausted_events: u64,

    pub active_objects: usize,

    pub available_objects: usize,

    /// `max` for bounded pools, otherwise the current instance count
    pub max_capacity: usize,

    /// Active share of capacity (0.0 to 1.0)
    pub utilization: f64,
}

impl PoolMetrics {
    /// Export metrics as a HashMap
    pub fn export(&self) -> HashMap<String, String> {
        let mut metrics = HashMap::new();
        metrics.insert("total_retrieved".to_string(), self.total_retrieved.to_string());
        metrics.insert("total_returned".to_string(), self.total_returned.to_string());
        metrics.insert("total_constructed".to_string(), self.total_constructed.to_string());
        metrics.insert("evictions".to_string(), self.evictions.to_string());
        metrics.insert("exhausted_events".to_string(), self.exhausted_events.to_string());
        metrics.insert("active_objects".to_string(), self.active_objects.to_string());
        metrics.insert("available_objects".to_string(), self.available_objects.to_string());
        metrics.insert("max_capacity".to_string(), self.max_capacity.to_string());
        metrics.insert("utilization".to_string(), format!("{:.2}", self.utilization));
        metrics
    }
}

/// Metrics exporter for Prometheus format
#[cfg(feature = "metrics")]
pub struct MetricsExporter;

#[cfg(feature = "metrics")]
impl MetricsExporter {
    /// Export a set of per-pool snapshots in Prometheus exposition format.
    ///
    /// Every series carries a `pool` label; `tags` become constant labels.
    pub fn export_prometheus(
        pools: &[(String, PoolMetrics)],
        tags: Option<&HashMap<String, String>>,
    ) -> crate::errors::PoolResult<String> {
        use prometheus::{Encoder, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};

        let const_labels = tags.cloned().unwrap_or_default();
        let opts = |name: &str, help: &str| Opts::new(name, help).const_labels(const_labels.clone());
        let registry = Registry::new();

        let active = IntGaugeVec::new(opts("resourcepool_objects_active", "Current active objects"), &["pool"])?;
        let available = IntGaugeVec::new(
            opts("resourcepool_objects_available", "Current available objects"),
            &["pool"],
        )?;
        let retrieved = IntCounterVec::new(
            opts("resourcepool_objects_retrieved_total", "Total activations handed out"),
            &["pool"],
        )?;
        let returned = IntCounterVec::new(
            opts("resourcepool_objects_returned_total", "Total activations ended"),
            &["pool"],
        )?;
        let constructed = IntCounterVec::new(
            opts("resourcepool_objects_constructed_total", "Total instances constructed"),
            &["pool"],
        )?;
        let evictions = IntCounterVec::new(
            opts("resourcepool_evictions_total", "Activations evicted by recycling"),
            &["pool"],
        )?;
        let exhausted = IntCounterVec::new(
            opts("resourcepool_events_exhausted_total", "Requests refused by an empty fixed pool"),
            &["pool"],
        )?;

        registry.register(Box::new(active.clone()))?;
        registry.register(Box::new(available.clone()))?;
        registry.register(Box::new(retrieved.clone()))?;
        registry.register(Box::new(returned.clone()))?;
        registry.register(Box::new(constructed.clone()))?;
        registry.register(Box::new(evictions.clone()))?;
        registry.register(Box::new(exhausted.clone()))?;

        for (pool, metrics) in pools {
            let labels = [pool.as_str()];
            active.with_label_values(&labels).set(metrics.active_objects as i64);
            available.with_label_values(&labels).set(metrics.available_objects as i64);
            retrieved.with_label_values(&labels).inc_by(metrics.total_retrieved);
            returned.with_label_values(&labels).inc_by(metrics.total_returned);
            constructed.with_label_values(&labels).inc_by(metrics.total_constructed);
            evictions.with_label_values(&labels).inc_by(metrics.evictions);
            exhausted.with_label_values(&labels).inc_by(metrics.exhausted_events);
        }

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| crate::errors::PoolError::Metrics(e.to_string()))
    }
}

#[cfg(feature = "metrics")]
impl From<prometheus::Error> for crate::errors::PoolError {
    fn from(err: prometheus::Error) -> Self {
        crate::errors::PoolError::Metrics(err.to_string())
    }
}

/// Internal metrics tracker
#[derive(Debug, Default)]
pub(crate) struct MetricsTracker {
    pub total_retrieved: u64,
    pub total_returned: u64,
    pub total_constructed: u64,
    pub evictions: u64,
    pub exhausted_events: u64,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_metrics(&self, active: usize, available: usize, capacity: usize) -> PoolMetrics {
        let utilization = if capacity > 0 {
            active as f64 / capacity as f64
        } else {
            0.0
        };

        PoolMetrics {
            total_retrieved: self.total_retrieved,
            total_returned: self.total_returned,
            total_constructed: self.total_constructed,
            evictions: self.evictions,
            exhausted_events: self.exhausted_events,
            active_objects: active,
            available_objects: available,
            max_capacity: capacity,
            utilization,
        }
    }
}
