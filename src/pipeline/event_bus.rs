// src/pipeline/event_bus.rs
//
// Decoupled notifications. The detector only decides; whatever wants to
// hear about crossings subscribes an observer instead of the detector
// printing or reaching into other state.

use crate::counters::CountSnapshot;
use crate::types::{Action, CrossingEvent};
use std::collections::VecDeque;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub enum PipelineEvent {
    Crossing {
        event: CrossingEvent,
        /// Counts after this crossing was applied
        counts: CountSnapshot,
    },

    ObservationSkipped {
        frame_index: u64,
        reason: String,
    },

    TracksEvicted {
        frame_index: u64,
        count: usize,
    },
}

pub trait EventObserver {
    fn on_event(&mut self, event: &PipelineEvent);
}

pub struct EventBus {
    events: VecDeque<PipelineEvent>,
    max_pending: usize,
}

impl EventBus {
    pub fn new(max_pending: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_pending),
            max_pending,
        }
    }

    pub fn publish(&mut self, event: PipelineEvent) {
        if self.events.len() >= self.max_pending {
            warn!(
                "Event bus full ({} events), dropping oldest",
                self.max_pending
            );
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn drain(&mut self) -> Vec<PipelineEvent> {
        self.events.drain(..).collect()
    }

    pub fn pending_count(&self) -> usize {
        self.events.len()
    }

    /// The next publish would drop the oldest pending event.
    pub fn is_full(&self) -> bool {
        self.events.len() >= self.max_pending
    }
}

/// Logs every pipeline event through `tracing`.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl EventObserver for TracingObserver {
    fn on_event(&mut self, event: &PipelineEvent) {
        match event {
            PipelineEvent::Crossing { event, counts } => {
                let verb = match event.action {
                    Action::Enter => "ENTERED",
                    Action::Exit => "EXITED",
                };
                info!(
                    "🚶 Person {} {} (frame {}, {:.2}s) | in={} out={}",
                    event.track_id,
                    verb,
                    event.frame_index,
                    event.timestamp_secs,
                    counts.enter_count,
                    counts.exit_count
                );
            }
            PipelineEvent::ObservationSkipped {
                frame_index,
                reason,
            } => {
                warn!("⚠️  Skipped observation at frame {}: {}", frame_index, reason);
            }
            PipelineEvent::TracksEvicted { frame_index, count } => {
                info!("🧹 Dropped {} idle track(s) at frame {}", count, frame_index);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skipped(frame_index: u64) -> PipelineEvent {
        PipelineEvent::ObservationSkipped {
            frame_index,
            reason: "test".to_string(),
        }
    }

    #[test]
    fn test_drain_preserves_order() {
        let mut bus = EventBus::new(8);
        bus.publish(skipped(1));
        bus.publish(skipped(2));
        assert_eq!(bus.pending_count(), 2);

        let frames: Vec<u64> = bus
            .drain()
            .into_iter()
            .map(|e| match e {
                PipelineEvent::ObservationSkipped { frame_index, .. } => frame_index,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(frames, vec![1, 2]);
        assert_eq!(bus.pending_count(), 0);
    }

    #[test]
    fn test_full_bus_drops_oldest() {
        let mut bus = EventBus::new(2);
        for f in 1..=3 {
            bus.publish(skipped(f));
        }
        let drained = bus.drain();
        assert_eq!(drained.len(), 2);
        assert!(matches!(
            drained[0],
            PipelineEvent::ObservationSkipped { frame_index: 2, .. }
        ));
    }
}
