// SPDX-FileCopyrightText: © 2025 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use crate::user_config::{QueuePolicy, TieBreak};

/// Class of a handoff request. Urgent requests are always served first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HandoffClass {
    Urgent = 0,
    Regular = 1,
}

impl std::fmt::Display for HandoffClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                HandoffClass::Urgent => "urgent",
                HandoffClass::Regular => "regular",
            }
        )
    }
}

/// Handoff request waiting for a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandoffRequest {
    /// Request identifier, unique within a run.
    pub id: u64,
    /// Class of the handoff call when it arrived.
    pub origin: HandoffClass,
    /// Class of the queue where the request waits.
    pub class: HandoffClass,
    /// Time when the handoff call arrived, in ns.
    pub arrival: u64,
    /// Time when the request entered the queue of its current class, in ns.
    pub enqueued: u64,
    /// Time when the mobile leaves the cell's range, in ns.
    pub deadline: u64,
}

impl HandoffRequest {
    /// Request of a call arriving at `now`, waiting until `deadline`.
    pub fn new(id: u64, class: HandoffClass, now: u64, deadline: u64) -> Self {
        Self {
            id,
            origin: class,
            class,
            arrival: now,
            enqueued: now,
            deadline,
        }
    }
}

/// Position of a request in the queue: lower keys are served first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct QueueKey {
    class: HandoffClass,
    primary: u64,
    secondary: u64,
}

/// Bounded queue of handoff requests.
///
/// With `QueuePolicy::Fcfs` the requests are served in order of arrival,
/// with `QueuePolicy::DynamicPriority` the request with the earliest
/// deadline, i.e., the shortest remaining dwell time, is served first.
/// With `QueuePolicy::TwoClass` urgent requests are served before regular
/// ones, and each class in order of entry into its queue.
/// Requests with the same key are ordered by `TieBreak`.
///
/// Each class has its own capacity. Requests can be removed from any
/// position in logarithmic time, which is needed when their dwell time
/// expires or when they change class.
#[derive(Debug)]
pub struct HandoffQueue {
    policy: QueuePolicy,
    tie_break: TieBreak,
    /// Maximum number of waiting requests, by class.
    capacity: [usize; 2],
    /// Number of waiting requests, by class.
    waiting_by_class: [usize; 2],
    /// Waiting requests sorted by service order.
    waiting: std::collections::BTreeMap<QueueKey, HandoffRequest>,
    /// Key of each waiting request, by request ID.
    index: std::collections::HashMap<u64, QueueKey>,
    /// Insertion counter.
    next_seq: u64,
}

impl HandoffQueue {
    /// Create an empty queue with the given capacity of urgent and regular
    /// requests.
    pub fn new(
        policy: QueuePolicy,
        tie_break: TieBreak,
        urgent_capacity: usize,
        regular_capacity: usize,
    ) -> Self {
        Self {
            policy,
            tie_break,
            capacity: [urgent_capacity, regular_capacity],
            waiting_by_class: [0, 0],
            waiting: std::collections::BTreeMap::new(),
            index: std::collections::HashMap::new(),
            next_seq: 0,
        }
    }

    fn key(&mut self, request: &HandoffRequest) -> QueueKey {
        let seq = self.next_seq;
        self.next_seq += 1;
        QueueKey {
            class: request.class,
            primary: match self.policy {
                QueuePolicy::Fcfs | QueuePolicy::TwoClass => request.enqueued,
                QueuePolicy::DynamicPriority => request.deadline,
            },
            secondary: match self.tie_break {
                TieBreak::ArrivalOrder => seq,
                TieBreak::ReverseArrivalOrder => u64::MAX - seq,
            },
        }
    }

    /// Add a request to the queue of its class.
    /// Return false, without changing the queue, if it is full.
    ///
    /// Panics if a request with the same ID is already waiting.
    pub fn push(&mut self, request: HandoffRequest) -> bool {
        if self.is_full(request.class) {
            return false;
        }
        let key = self.key(&request);
        let res = self.index.insert(request.id, key);
        assert!(
            res.is_none(),
            "handoff request {} is already in the queue",
            request.id
        );
        self.waiting.insert(key, request);
        self.waiting_by_class[request.class as usize] += 1;
        true
    }

    /// Remove the request at the head of the queue, if any.
    pub fn pop(&mut self) -> Option<HandoffRequest> {
        let (_key, request) = self.waiting.pop_first()?;
        let res = self.index.remove(&request.id);
        assert!(
            res.is_some(),
            "handoff request {} not indexed in the queue",
            request.id
        );
        self.waiting_by_class[request.class as usize] -= 1;
        Some(request)
    }

    /// Remove the request with given ID from any position in the queue.
    /// Return None if there is no such request, e.g., because it has been
    /// served already.
    pub fn remove(&mut self, id: u64) -> Option<HandoffRequest> {
        let key = self.index.remove(&id)?;
        let request = self
            .waiting
            .remove(&key)
            .unwrap_or_else(|| panic!("handoff request {} indexed but not waiting", id));
        self.waiting_by_class[request.class as usize] -= 1;
        Some(request)
    }

    /// Number of waiting requests of all classes.
    pub fn len(&self) -> usize {
        self.waiting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }

    /// Return true if no more requests of the given class can wait.
    pub fn is_full(&self, class: HandoffClass) -> bool {
        self.waiting_by_class[class as usize] >= self.capacity[class as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(id: u64, arrival: u64, deadline: u64) -> HandoffRequest {
        HandoffRequest::new(id, HandoffClass::Regular, arrival, deadline)
    }

    fn urgent(id: u64, arrival: u64, deadline: u64) -> HandoffRequest {
        HandoffRequest::new(id, HandoffClass::Urgent, arrival, deadline)
    }

    fn drain(queue: &mut HandoffQueue) -> Vec<u64> {
        let mut ids = vec![];
        while let Some(request) = queue.pop() {
            ids.push(request.id);
        }
        ids
    }

    #[test]
    fn test_handoff_queue_fcfs() {
        let mut queue = HandoffQueue::new(QueuePolicy::Fcfs, TieBreak::ArrivalOrder, 0, 10);
        assert!(queue.push(request(0, 10, 100)));
        assert!(queue.push(request(1, 20, 30)));
        assert!(queue.push(request(2, 30, 40)));
        assert_eq!(3, queue.len());
        assert_eq!(vec![0, 1, 2], drain(&mut queue));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_handoff_queue_dynamic_priority() {
        let mut queue =
            HandoffQueue::new(QueuePolicy::DynamicPriority, TieBreak::ArrivalOrder, 0, 10);
        assert!(queue.push(request(0, 10, 100)));
        assert!(queue.push(request(1, 20, 30)));
        assert!(queue.push(request(2, 30, 40)));
        assert!(queue.push(request(3, 40, 35)));
        assert_eq!(vec![1, 3, 2, 0], drain(&mut queue));
    }

    #[test]
    fn test_handoff_queue_tie_break() {
        for (tie_break, expected) in [
            (TieBreak::ArrivalOrder, vec![2, 0, 1]),
            (TieBreak::ReverseArrivalOrder, vec![2, 1, 0]),
        ] {
            let mut queue = HandoffQueue::new(QueuePolicy::DynamicPriority, tie_break, 0, 10);
            assert!(queue.push(request(0, 10, 50)));
            assert!(queue.push(request(1, 20, 50)));
            assert!(queue.push(request(2, 30, 40)));
            assert_eq!(expected, drain(&mut queue));
        }

        let mut queue =
            HandoffQueue::new(QueuePolicy::Fcfs, TieBreak::ReverseArrivalOrder, 0, 10);
        assert!(queue.push(request(0, 10, 50)));
        assert!(queue.push(request(1, 10, 60)));
        assert!(queue.push(request(2, 5, 70)));
        assert_eq!(vec![2, 1, 0], drain(&mut queue));
    }

    #[test]
    fn test_handoff_queue_capacity() {
        let mut queue = HandoffQueue::new(QueuePolicy::Fcfs, TieBreak::ArrivalOrder, 0, 2);
        assert!(queue.push(request(0, 0, 10)));
        assert!(queue.push(request(1, 0, 10)));
        assert!(queue.is_full(HandoffClass::Regular));
        assert!(!queue.push(request(2, 0, 10)));
        assert_eq!(2, queue.len());
        assert!(queue.remove(2).is_none());

        let mut queue = HandoffQueue::new(QueuePolicy::Fcfs, TieBreak::ArrivalOrder, 0, 0);
        assert!(queue.is_full(HandoffClass::Regular));
        assert!(queue.is_full(HandoffClass::Urgent));
        assert!(!queue.push(request(0, 0, 10)));
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_handoff_queue_remove() {
        let mut queue =
            HandoffQueue::new(QueuePolicy::DynamicPriority, TieBreak::ArrivalOrder, 0, 10);
        for id in 0..5 {
            assert!(queue.push(request(id, id * 10, 100 - id)));
        }
        assert_eq!(Some(request(2, 20, 98)), queue.remove(2));
        assert!(queue.remove(2).is_none());
        assert!(queue.remove(99).is_none());
        assert_eq!(4, queue.len());

        // Served requests cannot time out.
        let head = queue.pop().unwrap();
        assert_eq!(4, head.id);
        assert!(queue.remove(head.id).is_none());

        assert_eq!(vec![3, 1, 0], drain(&mut queue));
    }

    #[test]
    fn test_handoff_queue_two_classes() {
        let mut queue = HandoffQueue::new(QueuePolicy::TwoClass, TieBreak::ArrivalOrder, 2, 3);
        assert!(queue.push(request(0, 10, 100)));
        assert!(queue.push(urgent(1, 20, 30)));
        assert!(queue.push(request(2, 30, 40)));
        assert!(queue.push(urgent(3, 40, 45)));
        assert!(queue.is_full(HandoffClass::Urgent));
        assert!(!queue.is_full(HandoffClass::Regular));

        // Each class has its own room.
        assert!(!queue.push(urgent(4, 50, 60)));
        assert!(queue.push(request(5, 50, 60)));
        assert!(queue.is_full(HandoffClass::Regular));
        assert_eq!(5, queue.len());

        // Urgent requests first, then regular ones, by arrival.
        assert_eq!(vec![1, 3, 0, 2, 5], drain(&mut queue));
        assert!(!queue.is_full(HandoffClass::Urgent));
        assert!(!queue.is_full(HandoffClass::Regular));
    }

    #[test]
    fn test_handoff_queue_promotion() {
        let mut queue = HandoffQueue::new(QueuePolicy::TwoClass, TieBreak::ArrivalOrder, 2, 2);
        assert!(queue.push(request(0, 10, 100)));
        assert!(queue.push(urgent(1, 20, 30)));
        assert!(queue.push(request(2, 30, 40)));

        // The oldest regular request becomes urgent at time 50 and waits
        // behind the urgent requests that entered their queue before.
        let old = queue.remove(0).unwrap();
        let promoted = HandoffRequest {
            id: 3,
            class: HandoffClass::Urgent,
            enqueued: 50,
            deadline: 70,
            ..old
        };
        assert!(queue.push(promoted));
        assert!(queue.is_full(HandoffClass::Urgent));
        assert!(!queue.is_full(HandoffClass::Regular));
        assert!(queue.remove(0).is_none());

        let head = queue.pop().unwrap();
        assert_eq!(1, head.id);
        let next = queue.pop().unwrap();
        assert_eq!(3, next.id);
        assert_eq!(HandoffClass::Regular, next.origin);
        assert_eq!(10, next.arrival);
        assert_eq!(vec![2], drain(&mut queue));
    }

    #[test]
    #[should_panic(expected = "already in the queue")]
    fn test_handoff_queue_duplicate() {
        let mut queue = HandoffQueue::new(QueuePolicy::Fcfs, TieBreak::ArrivalOrder, 0, 10);
        queue.push(request(0, 0, 10));
        queue.push(request(0, 1, 10));
    }
}
