// src/gate_crossing.rs
//
// Directional gate crossing detection.
//
// The gate is a vertical line at `line_x`. Every track keeps the side of the
// line it was last seen on. A crossing is counted when a track's side differs
// from its previous sample AND the new sample lies inside the gate's vertical
// span [gate_y_min, gate_y_max]:
//
//   Left  → Right   ENTER
//   Right → Left    EXIT
//
// Rules:
//   - The first sample of a track only records its side. It never counts.
//   - The stored side is updated on every sample, counted or not. A side
//     change outside the vertical span is swallowed, so walking back through
//     the span afterwards does not count either.
//   - Only consecutive *observed* samples are compared. Any back-and-forth
//     between two samples of a sparsely sampled stream is invisible.
//   - center_x == line_x is Right.

use std::collections::HashMap;
use tracing::debug;

use crate::types::{Action, CrossingEvent, GateConfig, Observation, Side, TrackId};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackState {
    pub last_side: Side,
    /// Frame index of the most recent sample
    pub last_seen_frame: u64,
}

pub struct GateCrossingDetector {
    gate: GateConfig,
    tracks: HashMap<TrackId, TrackState>,
}

impl GateCrossingDetector {
    pub fn new(gate: GateConfig) -> Self {
        Self {
            gate,
            tracks: HashMap::new(),
        }
    }

    pub fn gate(&self) -> &GateConfig {
        &self.gate
    }

    /// Feed one sample. Returns the crossing it completes, if any.
    pub fn observe(&mut self, obs: &Observation) -> Option<CrossingEvent> {
        let current = Side::of(obs.center_x, self.gate.line_x);

        let previous = match self.tracks.get_mut(&obs.track_id) {
            Some(state) => {
                let previous = state.last_side;
                state.last_side = current;
                state.last_seen_frame = obs.frame_index;
                previous
            }
            None => {
                self.tracks.insert(
                    obs.track_id.clone(),
                    TrackState {
                        last_side: current,
                        last_seen_frame: obs.frame_index,
                    },
                );
                return None;
            }
        };

        let action = Action::from_transition(previous, current)?;

        if !self.gate.contains_y(obs.center_y) {
            debug!(
                "Track {} changed side {:?} → {:?} outside gate span (y={:.1}), not counted",
                obs.track_id, previous, current, obs.center_y
            );
            return None;
        }

        Some(CrossingEvent {
            track_id: obs.track_id.clone(),
            action,
            frame_index: obs.frame_index,
            timestamp_secs: obs.timestamp_secs,
        })
    }

    pub fn side_of(&self, track_id: &TrackId) -> Option<Side> {
        self.tracks.get(track_id).map(|s| s.last_side)
    }

    pub fn track_state(&self, track_id: &TrackId) -> Option<&TrackState> {
        self.tracks.get(track_id)
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Forget tracks not seen for more than `max_idle_frames` frame indices.
    /// Returns how many were dropped.
    pub fn evict_idle(&mut self, current_frame: u64, max_idle_frames: u64) -> usize {
        let before = self.tracks.len();
        self.tracks
            .retain(|_, s| current_frame.saturating_sub(s.last_seen_frame) <= max_idle_frames);
        let evicted = before - self.tracks.len();

        if evicted > 0 {
            debug!(
                "Evicted {} idle track(s) at frame {} ({} remain)",
                evicted,
                current_frame,
                self.tracks.len()
            );
        }

        evicted
    }
}

// ============================================================================
// TESTS
// ============================================================================
