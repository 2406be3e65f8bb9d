// src/lib.rs

pub mod config;
pub mod counters;
pub mod detection_source;
pub mod error;
pub mod event_log;
pub mod gate_crossing;
pub mod pipeline;
pub mod types;

pub use counters::{CountSnapshot, CounterAggregate};
pub use detection_source::{DetectionSource, FrameDetections, JsonLinesSource};
pub use error::GateError;
pub use event_log::EventLog;
pub use gate_crossing::GateCrossingDetector;
pub use pipeline::{GatePipeline, StopSignal};
pub use types::{Action, Config, CrossingEvent, GateConfig, Observation, Side, TrackId};
