// SPDX-FileCopyrightText: © 2025 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use crate::event::{Event, EventType};

/// Pending events, ordered by time then by insertion.
/// The queue owns the simulation clock, which is only advanced by `pop()`.
#[derive(Default)]
pub struct EventQueue {
    queue: std::collections::BinaryHeap<Event>,
    now: u64,
    next_seq: u64,
}

impl EventQueue {
    /// Schedule an event at the absolute time `time`, in ns.
    ///
    /// Panics if `time` is in the past.
    pub fn schedule(&mut self, time: u64, event_type: EventType) {
        assert!(
            time >= self.now,
            "event {:?} scheduled at {} before current time {}",
            event_type,
            time,
            self.now
        );
        self.queue.push(Event::new(time, self.next_seq, event_type));
        self.next_seq += 1;
    }

    /// Schedule an event `delay` ns from now.
    pub fn schedule_in(&mut self, delay: u64, event_type: EventType) {
        self.schedule(self.now.saturating_add(delay), event_type);
    }

    /// Remove the earliest event and advance the clock to its time.
    pub fn pop(&mut self) -> Option<Event> {
        let event = self.queue.pop()?;
        assert!(event.time() >= self.now);
        self.now = event.time();
        Some(event)
    }

    /// Return the earliest event, if any, without removing it.
    pub fn peek(&self) -> Option<&Event> {
        self.queue.peek()
    }

    /// Current simulation time, in ns.
    pub fn now(&self) -> u64 {
        self.now
    }
}
