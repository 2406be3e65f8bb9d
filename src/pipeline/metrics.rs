// src/pipeline/metrics.rs
//
// Run-level counters. Cheap to clone; clones share the same counters, so a
// handle can be read from another thread while the pipeline runs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    pub frames_sampled: Arc<AtomicU64>,
    pub observations: Arc<AtomicU64>,
    pub observations_skipped: Arc<AtomicU64>,
    pub malformed_records: Arc<AtomicU64>,
    pub enters: Arc<AtomicU64>,
    pub exits: Arc<AtomicU64>,
    pub tracks_evicted: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            frames_sampled: Arc::new(AtomicU64::new(0)),
            observations: Arc::new(AtomicU64::new(0)),
            observations_skipped: Arc::new(AtomicU64::new(0)),
            malformed_records: Arc::new(AtomicU64::new(0)),
            enters: Arc::new(AtomicU64::new(0)),
            exits: Arc::new(AtomicU64::new(0)),
            tracks_evicted: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    pub fn inc(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn fps(&self) -> f64 {
        let frames = self.frames_sampled.load(Ordering::Relaxed);
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.01 {
            frames as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            frames_sampled: self.frames_sampled.load(Ordering::Relaxed),
            observations: self.observations.load(Ordering::Relaxed),
            observations_skipped: self.observations_skipped.load(Ordering::Relaxed),
            malformed_records: self.malformed_records.load(Ordering::Relaxed),
            enters: self.enters.load(Ordering::Relaxed),
            exits: self.exits.load(Ordering::Relaxed),
            tracks_evicted: self.tracks_evicted.load(Ordering::Relaxed),
            fps: self.fps(),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSummary {
    pub frames_sampled: u64,
    pub observations: u64,
    pub observations_skipped: u64,
    pub malformed_records: u64,
    pub enters: u64,
    pub exits: u64,
    pub tracks_evicted: u64,
    pub fps: f64,
    pub elapsed_secs: f64,
}
