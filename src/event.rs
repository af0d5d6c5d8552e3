// SPDX-FileCopyrightText: © 2025 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

/// Class of a call holding a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    New,
    Handoff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    /// The warm-up period expires.
    WarmupPeriodEnd,
    /// The simulation ends.
    ExperimentEnd,
    /// Print progress.
    Progress(u16),
    /// A new call originates in the cell.
    NewArrival,
    /// A call in progress requests a handoff into the cell.
    HandoffArrival,
    /// A call releases its channel.
    Departure(CallKind),
    /// The dwell time of the queued handoff request with given ID expires.
    Timeout(u64),
    /// The queued regular handoff request with given ID becomes urgent.
    Promotion(u64),
}

impl EventType {
    /// Return true for the events of the cell, i.e., all but the simulation
    /// bookkeeping.
    pub fn is_cell_event(&self) -> bool {
        !matches!(
            self,
            EventType::WarmupPeriodEnd | EventType::ExperimentEnd | EventType::Progress(_)
        )
    }
}

/// For all the events there is the time when it is scheduled to occur and
/// a sequence number assigned by the event queue, which breaks ties so
/// that events with the same time are handled in insertion order.
#[derive(Debug, PartialEq, Eq)]
pub struct Event {
    time: u64,
    seq: u64,
    pub event_type: EventType,
}

impl Event {
    pub fn new(time: u64, seq: u64, event_type: EventType) -> Self {
        Self {
            time,
            seq,
            event_type,
        }
    }
    pub fn time(&self) -> u64 {
        self.time
    }
}

/// Reversed so that the max-heap returns the earliest event first.
impl Ord for Event {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (other.time, other.seq).cmp(&(self.time, self.seq))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_order() {
        let early = Event::new(10, 5, EventType::NewArrival);
        let late = Event::new(20, 0, EventType::HandoffArrival);
        let early_tie = Event::new(10, 6, EventType::Timeout(0));

        // Greater means handled first.
        assert!(early > late);
        assert!(early > early_tie);
        assert!(early_tie > late);
    }

    #[test]
    fn test_event_cell_events() {
        assert!(EventType::NewArrival.is_cell_event());
        assert!(EventType::HandoffArrival.is_cell_event());
        assert!(EventType::Departure(CallKind::New).is_cell_event());
        assert!(EventType::Timeout(1).is_cell_event());
        assert!(EventType::Promotion(1).is_cell_event());
        assert!(!EventType::WarmupPeriodEnd.is_cell_event());
        assert!(!EventType::ExperimentEnd.is_cell_event());
        assert!(!EventType::Progress(50).is_cell_event());
    }
}
