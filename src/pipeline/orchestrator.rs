// src/pipeline/orchestrator.rs
//
// Synchronous driving loop:
//
//   DetectionSource → GateCrossingDetector → { EventLog, CounterAggregate }
//                   → EventBus → observers
//
// Every observation is fully handled (logged, counted) before the next one
// is looked at. Observers are notified once per frame, in publication order,
// and earlier if the bus fills up mid-frame.

use crate::counters::{CountSnapshot, CounterAggregate};
use crate::detection_source::{DetectionSource, FrameDetections};
use crate::error::GateError;
use crate::event_log::EventLog;
use crate::gate_crossing::GateCrossingDetector;
use crate::pipeline::event_bus::{EventBus, EventObserver, PipelineEvent};
use crate::pipeline::metrics::{MetricsSummary, PipelineMetrics};
use crate::types::{
    Action, Config, CrossingEvent, GateConfig, Observation, SamplingConfig, TrackingConfig,
};
use serde::Serialize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

const MAX_PENDING_EVENTS: usize = 1024;

/// Cooperative cancellation flag, checked between observations.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub counts: CountSnapshot,
    pub metrics: MetricsSummary,
    pub log_rows: u64,
    pub cancelled: bool,
}

struct FrameOutcome {
    events: Vec<CrossingEvent>,
    interrupted: bool,
}

pub struct GatePipeline {
    detector: GateCrossingDetector,
    counters: CounterAggregate,
    log: EventLog,
    bus: EventBus,
    observers: Vec<Box<dyn EventObserver + Send>>,
    metrics: PipelineMetrics,
    sampling: SamplingConfig,
    tracking: TrackingConfig,
}

impl GatePipeline {
    /// Builds the pipeline and opens the event log.
    pub fn new(config: &Config) -> Result<Self, GateError> {
        let gate = GateConfig::new(
            config.gate.line_x,
            config.gate.gate_y_min,
            config.gate.gate_y_max,
        )?;
        let log = EventLog::open(&config.event_log.path)?;

        Ok(Self::from_parts(
            GateCrossingDetector::new(gate),
            log,
            config.sampling,
            config.tracking,
        ))
    }

    pub fn from_parts(
        detector: GateCrossingDetector,
        log: EventLog,
        sampling: SamplingConfig,
        tracking: TrackingConfig,
    ) -> Self {
        Self {
            detector,
            counters: CounterAggregate::new(),
            log,
            bus: EventBus::new(MAX_PENDING_EVENTS),
            observers: Vec::new(),
            metrics: PipelineMetrics::new(),
            sampling,
            tracking,
        }
    }

    pub fn add_observer(&mut self, observer: impl EventObserver + Send + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn counts(&self) -> CountSnapshot {
        self.counters.snapshot()
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    pub fn detector(&self) -> &GateCrossingDetector {
        &self.detector
    }

    pub fn log_path(&self) -> &Path {
        self.log.path()
    }

    /// Handle one observation. A crossing is durable in the log and counted
    /// before this returns. Invalid observations come back as a recoverable
    /// error and leave track state untouched.
    pub fn process_observation(
        &mut self,
        obs: &Observation,
    ) -> Result<Option<CrossingEvent>, GateError> {
        self.metrics.inc(&self.metrics.observations);
        obs.validate()?;

        let Some(event) = self.detector.observe(obs) else {
            return Ok(None);
        };

        self.log.append(&event)?;
        self.counters.apply(&event);
        match event.action {
            Action::Enter => self.metrics.inc(&self.metrics.enters),
            Action::Exit => self.metrics.inc(&self.metrics.exits),
        }

        self.publish(PipelineEvent::Crossing {
            event: event.clone(),
            counts: self.counters.snapshot(),
        });

        Ok(Some(event))
    }

    /// Handle every observation of one sampled frame, in delivery order.
    pub fn process_frame(
        &mut self,
        frame: &FrameDetections,
    ) -> Result<Vec<CrossingEvent>, GateError> {
        self.feed(frame, None).map(|outcome| outcome.events)
    }

    /// Pull frames until the source runs dry, a fatal error occurs, or `stop`
    /// is triggered.
    pub fn run<S: DetectionSource>(
        &mut self,
        source: &mut S,
        stop: &StopSignal,
    ) -> Result<RunSummary, GateError> {
        let mut cancelled = false;

        loop {
            if stop.is_triggered() {
                cancelled = true;
                break;
            }

            let frame = match source.next_frame() {
                None => break,
                Some(Ok(frame)) => frame,
                Some(Err(e)) if e.is_recoverable() => {
                    warn!("Skipping record: {}", e);
                    self.metrics.inc(&self.metrics.malformed_records);
                    continue;
                }
                Some(Err(e)) => return Err(e),
            };

            if self.feed(&frame, Some(stop))?.interrupted {
                cancelled = true;
                break;
            }
        }

        if cancelled {
            info!("⏹️  Stop requested, pipeline halted");
        }

        Ok(self.summary(cancelled))
    }

    pub fn summary(&self, cancelled: bool) -> RunSummary {
        RunSummary {
            counts: self.counters.snapshot(),
            metrics: self.metrics.summary(),
            log_rows: self.log.rows_written(),
            cancelled,
        }
    }

    fn feed(
        &mut self,
        frame: &FrameDetections,
        stop: Option<&StopSignal>,
    ) -> Result<FrameOutcome, GateError> {
        let result = self.feed_observations(frame, stop);
        self.dispatch();
        result
    }

    fn feed_observations(
        &mut self,
        frame: &FrameDetections,
        stop: Option<&StopSignal>,
    ) -> Result<FrameOutcome, GateError> {
        self.metrics.inc(&self.metrics.frames_sampled);
        let mut outcome = FrameOutcome {
            events: Vec::new(),
            interrupted: false,
        };

        for obs in frame.observations() {
            if stop.map_or(false, StopSignal::is_triggered) {
                outcome.interrupted = true;
                return Ok(outcome);
            }

            match self.process_observation(&obs) {
                Ok(Some(event)) => outcome.events.push(event),
                Ok(None) => {}
                Err(e) if e.is_recoverable() => {
                    self.metrics.inc(&self.metrics.observations_skipped);
                    self.publish(PipelineEvent::ObservationSkipped {
                        frame_index: frame.frame_index,
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        if let Some(max_idle) = self.tracking.max_idle_frames {
            let max_idle_frames = max_idle.saturating_mul(self.sampling.frame_skip);
            let evicted = self.detector.evict_idle(frame.frame_index, max_idle_frames);
            if evicted > 0 {
                self.metrics
                    .add(&self.metrics.tracks_evicted, evicted as u64);
                self.publish(PipelineEvent::TracksEvicted {
                    frame_index: frame.frame_index,
                    count: evicted,
                });
            }
        }

        Ok(outcome)
    }

    fn publish(&mut self, event: PipelineEvent) {
        // Never let the bus drop a pending event.
        if self.bus.is_full() {
            self.dispatch();
        }
        self.bus.publish(event);
    }

    fn dispatch(&mut self) {
        for event in self.bus.drain() {
            for observer in self.observers.iter_mut() {
                observer.on_event(&event);
            }
        }
    }
}
