// SPDX-FileCopyrightText: © 2025 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use crate::event::{CallKind, EventType};
use crate::handoff_queue::{HandoffClass, HandoffRequest};
use crate::output::Counter;
use crate::user_config::QueuePolicy;

/// Simulation of a single cell with a handoff queue.
///
/// New calls are served if there is an idle channel, otherwise they are
/// blocked. Handoff calls that find all channels busy wait in a bounded
/// queue until a channel is released or their dwell time expires.
/// With two classes, a regular request may become urgent while waiting,
/// if there is room in the queue of urgent requests.
pub struct Simulation {
    // internal data structures
    events: crate::event_queue::EventQueue,
    pool: crate::channel_pool::ChannelPool,
    queue: crate::handoff_queue::HandoffQueue,
    variates: crate::variates::Variates,
    stats: crate::output::StatsCollector,

    // state
    next_request_id: u64,
    num_events: u64,
    finished: bool,

    // configuration
    config: crate::config::Config,
}

impl Simulation {
    pub fn new(config: crate::config::Config) -> anyhow::Result<Self> {
        config.user_config.valid()?;
        let conf = &config.user_config;

        let mut variates = crate::variates::Variates::new(conf, config.seed)?;

        // create the event queue and push initial events
        let mut events = crate::event_queue::EventQueue::default();
        events.schedule(
            crate::utils::to_nanoseconds(conf.warmup_period),
            EventType::WarmupPeriodEnd,
        );
        events.schedule(
            crate::utils::to_nanoseconds(conf.duration),
            EventType::ExperimentEnd,
        );
        for i in 1..100 {
            events.schedule(
                crate::utils::to_nanoseconds(i as f64 * conf.duration / 100.0),
                EventType::Progress(i),
            );
        }
        events.schedule(variates.new_interarrival(), EventType::NewArrival);
        events.schedule(variates.handoff_interarrival(), EventType::HandoffArrival);

        let urgent_queue_size = match conf.policy {
            QueuePolicy::TwoClass => conf.urgent.queue_size as usize,
            QueuePolicy::Fcfs | QueuePolicy::DynamicPriority => 0,
        };

        Ok(Self {
            events,
            pool: crate::channel_pool::ChannelPool::new(conf.channels),
            queue: crate::handoff_queue::HandoffQueue::new(
                conf.policy,
                conf.tie_break,
                urgent_queue_size,
                conf.queue_size as usize,
            ),
            variates,
            stats: crate::output::StatsCollector::new(conf.channels),
            next_request_id: 0,
            num_events: 0,
            finished: false,
            config,
        })
    }

    /// Run a simulation.
    pub fn run(&mut self) -> crate::output::Output {
        let real_now = std::time::Instant::now();
        self.run_until(u64::MAX);

        crate::output::Output {
            stats: self.stats.finish(self.events.now(), self.num_events),
            config_csv: self.config.to_csv(),
            execution_time: real_now.elapsed().as_secs_f64(),
        }
    }

    /// Handle all the events up to `horizon`, in ns, included.
    /// Return false if the simulation is over.
    pub fn run_until(&mut self, horizon: u64) -> bool {
        while !self.finished {
            match self.events.peek().map(|event| event.time()) {
                Some(time) if time <= horizon => {
                    self.step();
                }
                Some(_) => break,
                None => self.finished = true,
            }
        }
        !self.finished
    }

    /// Handle the next event. Return false if the simulation is over.
    pub fn step(&mut self) -> bool {
        if self.finished {
            return false;
        }
        let event = match self.events.pop() {
            Some(event) => event,
            None => {
                self.finished = true;
                return false;
            }
        };
        let now = event.time();
        if event.event_type.is_cell_event() {
            self.num_events += 1;
        }

        // handle the current event
        match event.event_type {
            EventType::WarmupPeriodEnd => {
                log::debug!("W {}", now);
                self.stats.enable(now);
            }
            EventType::ExperimentEnd => {
                log::debug!("E {}", now);
                self.finished = true;
            }
            EventType::Progress(percentage) => {
                log::info!("seed {} completed {}%", self.config.seed, percentage);
            }
            EventType::NewArrival => self.handle_new_arrival(now),
            EventType::HandoffArrival => self.handle_handoff_arrival(now),
            EventType::Departure(kind) => self.handle_departure(now, kind),
            EventType::Timeout(request_id) => self.handle_timeout(now, request_id),
            EventType::Promotion(request_id) => self.handle_promotion(now, request_id),
        }

        assert!(
            self.queue.is_empty() || self.pool.is_full(),
            "{} handoff requests waiting with {} out of {} channels busy",
            self.queue.len(),
            self.pool.occupied(),
            self.pool.capacity()
        );
        self.stats
            .state(now, self.pool.occupied(), self.queue.len());

        if let Some(max_events) = self.config.user_config.max_events {
            if self.num_events >= max_events {
                log::debug!("M {}", now);
                self.finished = true;
            }
        }

        !self.finished
    }

    fn handle_new_arrival(&mut self, now: u64) {
        if self.pool.try_seize() {
            log::debug!("N {} served ({} busy)", now, self.pool.occupied());
            self.stats.count(Counter::NewServed);
            let holding = self.variates.new_holding();
            self.events
                .schedule_in(holding, EventType::Departure(CallKind::New));
        } else {
            log::debug!("N {} blocked", now);
            self.stats.count(Counter::NewBlocked);
        }

        let interarrival = self.variates.new_interarrival();
        self.events.schedule_in(interarrival, EventType::NewArrival);
    }

    fn handle_handoff_arrival(&mut self, now: u64) {
        let class = self.variates.handoff_class();
        self.stats.count(Counter::arrival(class));

        if self.pool.try_seize() {
            log::debug!("H {} {} served ({} busy)", now, class, self.pool.occupied());
            self.stats.count(Counter::HandoffServed);
            let holding = self.variates.handoff_holding();
            self.events
                .schedule_in(holding, EventType::Departure(CallKind::Handoff));
        } else if self.queue.is_full(class) {
            log::debug!("H {} {} dropped", now, class);
            self.stats.count(Counter::HandoffDropped);
            self.stats.count(Counter::lost(class));
        } else {
            let deadline = now.saturating_add(self.variates.dwell(class));
            let request = HandoffRequest::new(self.next_request_id, class, now, deadline);
            self.next_request_id += 1;
            assert!(self.queue.push(request));
            log::debug!(
                "H {} {} queued #{} until {} ({} waiting)",
                now,
                class,
                request.id,
                request.deadline,
                self.queue.len()
            );
            self.stats.count(Counter::HandoffQueued);
            self.events
                .schedule(request.deadline, EventType::Timeout(request.id));
            if class == HandoffClass::Regular {
                if let Some(delay) = self.variates.promotion() {
                    self.events
                        .schedule_in(delay, EventType::Promotion(request.id));
                }
            }
        }

        let interarrival = self.variates.handoff_interarrival();
        self.events
            .schedule_in(interarrival, EventType::HandoffArrival);
    }

    fn handle_departure(&mut self, now: u64, kind: CallKind) {
        self.pool.release();
        log::debug!("D {} {:?} ({} busy)", now, kind, self.pool.occupied());

        if let Some(request) = self.queue.pop() {
            assert!(
                request.deadline >= now,
                "handoff request #{} expired at {} still waiting at {}",
                request.id,
                request.deadline,
                now
            );
            assert!(self.pool.try_seize());
            log::debug!(
                "H {} {} served #{} from queue",
                now,
                request.class,
                request.id
            );
            self.stats
                .count_since(Counter::HandoffServed, request.arrival);
            self.stats.queue_wait(request.arrival, now);
            let holding = self.variates.handoff_holding();
            self.events
                .schedule_in(holding, EventType::Departure(CallKind::Handoff));
        }
    }

    fn handle_timeout(&mut self, now: u64, request_id: u64) {
        if let Some(request) = self.queue.remove(request_id) {
            assert_eq!(request.deadline, now);
            log::debug!("T {} {} timed out #{}", now, request.class, request_id);
            self.stats
                .count_since(Counter::HandoffTimedOut, request.arrival);
            self.stats
                .count_since(Counter::lost(request.origin), request.arrival);
        }
    }

    /// Move a waiting regular request to the queue of urgent requests, with
    /// a new ID and the dwell time of urgent requests. The timeout of the
    /// old ID becomes a no-op.
    fn handle_promotion(&mut self, now: u64, request_id: u64) {
        if self.queue.is_full(HandoffClass::Urgent) {
            log::debug!("P {} #{} not promoted", now, request_id);
            return;
        }
        if let Some(request) = self.queue.remove(request_id) {
            assert_eq!(HandoffClass::Regular, request.class);
            let promoted = HandoffRequest {
                id: self.next_request_id,
                class: HandoffClass::Urgent,
                enqueued: now,
                deadline: now.saturating_add(self.variates.dwell(HandoffClass::Urgent)),
                ..request
            };
            self.next_request_id += 1;
            assert!(self.queue.push(promoted));
            log::debug!(
                "P {} promoted #{} as #{} until {}",
                now,
                request.id,
                promoted.id,
                promoted.deadline
            );
            self.stats
                .count_since(Counter::HandoffPromoted, request.arrival);
            self.events
                .schedule(promoted.deadline, EventType::Timeout(promoted.id));
        }
    }

    /// Current simulation time, in ns.
    pub fn now(&self) -> u64 {
        self.events.now()
    }

    /// Next event to be handled, if any.
    pub fn next_event(&self) -> Option<&EventType> {
        self.events.peek().map(|event| &event.event_type)
    }

    /// Number of busy channels.
    pub fn occupied(&self) -> u32 {
        self.pool.occupied()
    }

    /// Number of handoff requests waiting for a channel.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn config(&self) -> &crate::config::Config {
        &self.config
    }
}
