use crate::error::GateError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub gate: GateConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    pub source: SourceConfig,
    pub event_log: EventLogConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Gate geometry. Fixed for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Horizontal position of the vertical gate line (px, original frame)
    pub line_x: f32,
    /// Top of the span in which a side change counts (inclusive)
    pub gate_y_min: f32,
    /// Bottom of the span in which a side change counts (inclusive)
    pub gate_y_max: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Only every N-th decoded frame produces observations.
    pub frame_skip: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self { frame_skip: 1 }
    }
}

impl SamplingConfig {
    #[inline]
    pub fn is_sampled(&self, frame_index: u64) -> bool {
        frame_index % self.frame_skip == 0
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Drop a track's side state after this many sampled frames without an
    /// observation. `None` keeps every track for the life of the process.
    #[serde(default)]
    pub max_idle_frames: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// JSON-lines dump of per-frame tracker output
    pub path: PathBuf,
    /// (width, height) the tracker ran at. When set, boxes are rescaled to `frame_size`.
    #[serde(default)]
    pub inference_size: Option<(u32, u32)>,
    /// (width, height) of the original frame
    #[serde(default)]
    pub frame_size: Option<(u32, u32)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ============================================================================
// CORE TYPES
// ============================================================================

/// Identity assigned by the external tracker. Either an integer or a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrackId {
    Num(i64),
    Name(String),
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(id) => write!(f, "{}", id),
            Self::Name(name) => f.write_str(name),
        }
    }
}

impl From<i64> for TrackId {
    fn from(id: i64) -> Self {
        Self::Num(id)
    }
}

impl From<i32> for TrackId {
    fn from(id: i32) -> Self {
        Self::Num(id.into())
    }
}

impl From<&str> for TrackId {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

/// Half-plane of the gate line a position falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// A position exactly on the line is `Right`.
    #[inline]
    pub fn of(center_x: f32, line_x: f32) -> Self {
        if center_x < line_x {
            Self::Left
        } else {
            Self::Right
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Left → Right
    Enter,
    /// Right → Left
    Exit,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enter => "ENTER",
            Self::Exit => "EXIT",
        }
    }

    /// The action for a side change, if there was one.
    pub fn from_transition(previous: Side, current: Side) -> Option<Self> {
        match (previous, current) {
            (Side::Left, Side::Right) => Some(Self::Enter),
            (Side::Right, Side::Left) => Some(Self::Exit),
            _ => None,
        }
    }
}

/// One sample of one track, in original-frame coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub track_id: TrackId,
    pub center_x: f32,
    pub center_y: f32,
    /// 1-based index of the decoded frame
    pub frame_index: u64,
    /// Playback position in seconds
    pub timestamp_secs: f64,
}

impl Observation {
    pub fn new(
        track_id: impl Into<TrackId>,
        center_x: f32,
        center_y: f32,
        frame_index: u64,
        timestamp_secs: f64,
    ) -> Self {
        Self {
            track_id: track_id.into(),
            center_x,
            center_y,
            frame_index,
            timestamp_secs,
        }
    }

    /// Rejects samples the detector cannot classify.
    pub fn validate(&self) -> Result<(), GateError> {
        let reason = if !self.center_x.is_finite() || !self.center_y.is_finite() {
            format!(
                "non-finite center ({}, {})",
                self.center_x, self.center_y
            )
        } else if !self.timestamp_secs.is_finite() || self.timestamp_secs < 0.0 {
            format!("bad timestamp {}", self.timestamp_secs)
        } else {
            return Ok(());
        };

        Err(GateError::InvalidObservation {
            track_id: self.track_id.clone(),
            reason,
        })
    }
}

/// A counted crossing of the gate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossingEvent {
    pub track_id: TrackId,
    pub action: Action,
    pub frame_index: u64,
    pub timestamp_secs: f64,
}
