use crate::types::TrackId;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GateError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("event log write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid observation for track {track_id}: {reason}")]
    InvalidObservation { track_id: TrackId, reason: String },

    #[error("malformed detection record at line {line}: {source}")]
    MalformedRecord {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("gate span is inverted: gate_y_min {y_min} > gate_y_max {y_max}")]
    InvalidGate { y_min: f32, y_max: f32 },
}

impl GateError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Recoverable errors skip one observation or record; the rest stop the pipeline.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidObservation { .. } | Self::MalformedRecord { .. }
        )
    }
}
