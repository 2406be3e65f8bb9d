// src/counters.rs

use crate::types::{Action, CrossingEvent};
use serde::Serialize;

/// Cumulative enter/exit tally. Counts only ever go up.
#[derive(Debug, Default, Clone)]
pub struct CounterAggregate {
    enter_count: u64,
    exit_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CountSnapshot {
    pub enter_count: u64,
    pub exit_count: u64,
}

impl CountSnapshot {
    /// Entries minus exits. Negative when more left than came in.
    pub fn net(&self) -> i64 {
        self.enter_count as i64 - self.exit_count as i64
    }
}

impl CounterAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: &CrossingEvent) {
        match event.action {
            Action::Enter => self.enter_count += 1,
            Action::Exit => self.exit_count += 1,
        }
    }

    pub fn snapshot(&self) -> CountSnapshot {
        CountSnapshot {
            enter_count: self.enter_count,
            exit_count: self.exit_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TrackId;

    fn event(action: Action) -> CrossingEvent {
        CrossingEvent {
            track_id: TrackId::Num(1),
            action,
            frame_index: 8,
            timestamp_secs: 0.27,
        }
    }

    #[test]
    fn test_counts_start_at_zero() {
        let counters = CounterAggregate::new();
        assert_eq!(counters.snapshot(), CountSnapshot::default());
    }

    #[test]
    fn test_apply_increments_matching_counter() {
        let mut counters = CounterAggregate::new();
        counters.apply(&event(Action::Enter));
        counters.apply(&event(Action::Enter));
        counters.apply(&event(Action::Exit));

        let snap = counters.snapshot();
        assert_eq!(snap.enter_count, 2);
        assert_eq!(snap.exit_count, 1);
        assert_eq!(snap.net(), 1);
    }

    #[test]
    fn test_net_can_go_negative() {
        let mut counters = CounterAggregate::new();
        counters.apply(&event(Action::Exit));
        assert_eq!(counters.snapshot().net(), -1);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let mut counters = CounterAggregate::new();
        let before = counters.snapshot();
        counters.apply(&event(Action::Enter));
        assert_eq!(before.enter_count, 0);
        assert_eq!(counters.snapshot().enter_count, 1);
    }
}
