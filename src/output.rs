// SPDX-FileCopyrightText: © 2025 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use std::io::Write;

use crate::handoff_queue::HandoffClass;
use crate::utils::CsvFriend;

/// Outcomes counted during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    /// New call assigned a channel.
    NewServed,
    /// New call rejected because all channels were busy.
    NewBlocked,
    /// Handoff call assigned a channel, immediately or from the queue.
    HandoffServed,
    /// Handoff request put in the queue.
    HandoffQueued,
    /// Handoff request rejected because the queue was full.
    HandoffDropped,
    /// Handoff request removed from the queue when its dwell time expired.
    HandoffTimedOut,
    /// Queued regular handoff request that became urgent.
    HandoffPromoted,
    /// Urgent handoff call arrived.
    UrgentArrival,
    /// Urgent handoff call dropped or timed out.
    UrgentLost,
    /// Regular handoff call arrived.
    RegularArrival,
    /// Regular handoff call dropped or timed out, even if promoted.
    RegularLost,
}

const NUM_COUNTERS: usize = 11;

impl Counter {
    pub fn arrival(class: HandoffClass) -> Self {
        match class {
            HandoffClass::Urgent => Counter::UrgentArrival,
            HandoffClass::Regular => Counter::RegularArrival,
        }
    }

    pub fn lost(class: HandoffClass) -> Self {
        match class {
            HandoffClass::Urgent => Counter::UrgentLost,
            HandoffClass::Regular => Counter::RegularLost,
        }
    }
}

#[derive(Default)]
struct Avg {
    sum: kahan::KahanSum<f64>,
    num: u64,
}

impl Avg {
    pub fn add(&mut self, value: f64) {
        self.sum += value;
        self.num += 1;
    }
    pub fn avg(&self) -> f64 {
        if self.num == 0 {
            0.0
        } else {
            self.sum.sum() / self.num as f64
        }
    }
}

/// Time average of a piecewise-constant value.
struct TimeAvg {
    last_update: u64,
    last_value: f64,
    sum_values: kahan::KahanSum<f64>,
    sum_time: u64,
}

impl Default for TimeAvg {
    fn default() -> Self {
        Self {
            last_update: u64::MAX,
            last_value: 0.0,
            sum_values: kahan::KahanSum::default(),
            sum_time: 0,
        }
    }
}

impl TimeAvg {
    pub fn add(&mut self, now: u64, value: f64) {
        if self.last_update != u64::MAX {
            let delta = now - self.last_update;
            self.sum_values += delta as f64 * self.last_value;
            self.sum_time += delta;
        }
        self.last_update = now;
        self.last_value = value;
    }
    pub fn enable(&mut self, now: u64) {
        self.last_update = now;
    }
    pub fn update_value(&mut self, value: f64) {
        self.last_value = value;
    }
    pub fn finish(&mut self, now: u64) {
        self.add(now, self.last_value);
    }
    pub fn avg(&self) -> f64 {
        if self.sum_time == 0 {
            0.0
        } else {
            self.sum_values.sum() / self.sum_time as f64
        }
    }
}

/// Time spent in each of a finite number of states.
struct StateTime {
    last_update: u64,
    last_state: usize,
    durations: Vec<u64>,
}

impl StateTime {
    fn new(num_states: usize) -> Self {
        Self {
            last_update: u64::MAX,
            last_state: 0,
            durations: vec![0; num_states],
        }
    }
    pub fn add(&mut self, now: u64, state: usize) {
        assert!(state < self.durations.len(), "invalid state {}", state);
        if self.last_update != u64::MAX {
            self.durations[self.last_state] += now - self.last_update;
            self.last_update = now;
        }
        self.last_state = state;
    }
    pub fn enable(&mut self, now: u64) {
        self.last_update = now;
    }
    pub fn finish(&mut self, now: u64) {
        self.add(now, self.last_state);
    }
    pub fn fractions(&self) -> Vec<f64> {
        let tot = self.durations.iter().sum::<u64>();
        self.durations
            .iter()
            .map(|x| if tot == 0 { 0.0 } else { *x as f64 / tot as f64 })
            .collect()
    }
}

/// Collects the statistics of a simulation run.
///
/// Nothing is recorded until `enable()` is called at the end of the warm-up
/// period, though the current state is always tracked so that the time
/// averages start from the right value. The outcomes of handoff requests
/// that arrived during the warm-up period are not recorded either.
pub struct StatsCollector {
    enabled: bool,
    warmup: u64,
    channels: u32,
    counters: [u64; NUM_COUNTERS],
    queue_wait: Avg,
    busy_channels: TimeAvg,
    queue_len: TimeAvg,
    occupancy: StateTime,
}

impl StatsCollector {
    pub fn new(channels: u32) -> Self {
        Self {
            enabled: false,
            warmup: 0,
            channels,
            counters: [0; NUM_COUNTERS],
            queue_wait: Avg::default(),
            busy_channels: TimeAvg::default(),
            queue_len: TimeAvg::default(),
            occupancy: StateTime::new(channels as usize + 1),
        }
    }

    pub fn enable(&mut self, now: u64) {
        self.enabled = true;
        self.warmup = now;
        self.busy_channels.enable(now);
        self.queue_len.enable(now);
        self.occupancy.enable(now);
    }

    pub fn count(&mut self, counter: Counter) {
        if self.enabled {
            self.counters[counter as usize] += 1;
        }
    }

    /// Count the outcome of a request that arrived at `arrival`, in ns.
    pub fn count_since(&mut self, counter: Counter, arrival: u64) {
        if self.enabled && arrival >= self.warmup {
            self.counters[counter as usize] += 1;
        }
    }

    /// Record the waiting time of a handoff request that arrived at `arrival`
    /// and is served from the queue at `now`, in ns.
    pub fn queue_wait(&mut self, arrival: u64, now: u64) {
        if self.enabled && arrival >= self.warmup {
            self.queue_wait.add(crate::utils::to_seconds(now - arrival));
        }
    }

    /// Record the cell state starting from `now`.
    pub fn state(&mut self, now: u64, busy_channels: u32, queue_len: usize) {
        if self.enabled {
            self.busy_channels.add(now, busy_channels as f64);
            self.queue_len.add(now, queue_len as f64);
        } else {
            self.busy_channels.update_value(busy_channels as f64);
            self.queue_len.update_value(queue_len as f64);
        }
        self.occupancy.add(now, busy_channels as usize);
    }

    /// Close the time averages at `now` and derive the run statistics.
    pub fn finish(&mut self, now: u64, num_events: u64) -> RunStatistics {
        if self.enabled {
            self.busy_channels.finish(now);
            self.queue_len.finish(now);
            self.occupancy.finish(now);
        }

        let c = |counter: Counter| self.counters[counter as usize];
        let new_served = c(Counter::NewServed);
        let new_blocked = c(Counter::NewBlocked);
        let handoff_served = c(Counter::HandoffServed);
        let handoff_dropped = c(Counter::HandoffDropped);
        let handoff_timed_out = c(Counter::HandoffTimedOut);
        let urgent_handoffs = c(Counter::UrgentArrival);
        let urgent_lost = c(Counter::UrgentLost);
        let regular_handoffs = c(Counter::RegularArrival);
        let regular_lost = c(Counter::RegularLost);
        let mean_busy_channels = self.busy_channels.avg();

        RunStatistics {
            new_served,
            new_blocked,
            handoff_served,
            handoff_queued: c(Counter::HandoffQueued),
            handoff_dropped,
            handoff_timed_out,
            handoff_promoted: c(Counter::HandoffPromoted),
            urgent_handoffs,
            urgent_lost,
            regular_handoffs,
            regular_lost,
            new_blocking_probability: ratio(new_blocked, new_blocked + new_served),
            handoff_dropping_probability: ratio(
                handoff_dropped + handoff_timed_out,
                handoff_dropped + handoff_timed_out + handoff_served,
            ),
            urgent_dropping_probability: ratio(urgent_lost, urgent_handoffs),
            regular_dropping_probability: ratio(regular_lost, regular_handoffs),
            mean_queue_length: self.queue_len.avg(),
            mean_busy_channels,
            mean_utilization: mean_busy_channels / self.channels as f64,
            mean_queue_wait: self.queue_wait.avg(),
            occupancy: self.occupancy.fractions(),
            elapsed: if self.enabled {
                crate::utils::to_seconds(now - self.warmup)
            } else {
                0.0
            },
            num_events,
        }
    }
}

fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Statistics of a simulation run, collected after the warm-up period.
///
/// Handoff requests still waiting at the end of the run are counted as
/// arrived and queued, but neither served nor lost.
#[derive(Debug, Clone, PartialEq)]
pub struct RunStatistics {
    pub new_served: u64,
    pub new_blocked: u64,
    pub handoff_served: u64,
    pub handoff_queued: u64,
    pub handoff_dropped: u64,
    pub handoff_timed_out: u64,
    /// Regular handoff requests that became urgent while waiting.
    pub handoff_promoted: u64,
    /// Handoff calls that arrived as urgent. Always 0 with one class.
    pub urgent_handoffs: u64,
    /// Urgent handoff calls dropped or timed out.
    pub urgent_lost: u64,
    /// Handoff calls that arrived as regular. All of them with one class.
    pub regular_handoffs: u64,
    /// Regular handoff calls dropped or timed out, including those promoted.
    pub regular_lost: u64,
    /// Fraction of new calls blocked, 0 if there were none.
    pub new_blocking_probability: f64,
    /// Fraction of handoff calls dropped or timed out, among those that
    /// were either served or lost. 0 if there were none.
    pub handoff_dropping_probability: f64,
    /// Fraction of urgent handoff calls lost, 0 if there were none.
    pub urgent_dropping_probability: f64,
    /// Fraction of regular handoff calls lost, 0 if there were none.
    pub regular_dropping_probability: f64,
    /// Time-average number of queued handoff requests.
    pub mean_queue_length: f64,
    /// Time-average number of busy channels.
    pub mean_busy_channels: f64,
    /// Time-average fraction of busy channels.
    pub mean_utilization: f64,
    /// Average waiting time of the handoff requests served from the queue,
    /// in s.
    pub mean_queue_wait: f64,
    /// Fraction of time with n busy channels, for n = 0..=channels.
    pub occupancy: Vec<f64>,
    /// Duration of the measurement period, in s.
    pub elapsed: f64,
    /// Number of cell events handled in the whole run.
    pub num_events: u64,
}

impl CsvFriend for RunStatistics {
    fn header(&self) -> String {
        String::from("new_served,new_blocked,handoff_served,handoff_queued,handoff_dropped,handoff_timed_out,handoff_promoted,urgent_handoffs,urgent_lost,regular_handoffs,regular_lost,new_blocking_probability,handoff_dropping_probability,urgent_dropping_probability,regular_dropping_probability,mean_queue_length,mean_busy_channels,mean_utilization,mean_queue_wait,elapsed,num_events")
    }
    fn to_csv(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            self.new_served,
            self.new_blocked,
            self.handoff_served,
            self.handoff_queued,
            self.handoff_dropped,
            self.handoff_timed_out,
            self.handoff_promoted,
            self.urgent_handoffs,
            self.urgent_lost,
            self.regular_handoffs,
            self.regular_lost,
            self.new_blocking_probability,
            self.handoff_dropping_probability,
            self.urgent_dropping_probability,
            self.regular_dropping_probability,
            self.mean_queue_length,
            self.mean_busy_channels,
            self.mean_utilization,
            self.mean_queue_wait,
            self.elapsed,
            self.num_events
        )
    }
}

pub struct Output {
    pub stats: RunStatistics,
    pub config_csv: String,
    /// Wall-clock time to run the simulation, in s.
    pub execution_time: f64,
}

/// Save all the outputs to files:
/// - `scalar.csv`: one row per run
/// - `occupancy.csv`: one row per run and number of busy channels
pub fn save_outputs(
    outputs: Vec<Output>,
    output_path: &str,
    append: bool,
    config_csv_header: &str,
    additional_header: &str,
    additional_fields: &str,
) -> anyhow::Result<()> {
    let first = match outputs.first() {
        Some(first) => first,
        None => return Ok(()),
    };
    let header_comma = if additional_header.is_empty() {
        ""
    } else {
        ","
    };

    // Open all the files.
    let mut scalar_file = crate::utils::open_output_file(
        output_path,
        "scalar.csv",
        append,
        format!(
            "{}{}{},{},execution_time",
            additional_header,
            header_comma,
            config_csv_header,
            first.stats.header()
        )
        .as_str(),
    )?;
    let mut occupancy_file = crate::utils::open_output_file(
        output_path,
        "occupancy.csv",
        append,
        format!(
            "{}{}{},busy_channels,fraction",
            additional_header, header_comma, config_csv_header
        )
        .as_str(),
    )?;

    // Dump the data to files.
    for output in outputs {
        writeln!(
            &mut scalar_file,
            "{}{}{},{},{}",
            additional_fields,
            header_comma,
            output.config_csv,
            output.stats.to_csv(),
            output.execution_time
        )?;
        for (busy_channels, fraction) in output.stats.occupancy.iter().enumerate() {
            writeln!(
                &mut occupancy_file,
                "{}{}{},{},{}",
                additional_fields, header_comma, output.config_csv, busy_channels, fraction
            )?;
        }
    }

    Ok(())
}
