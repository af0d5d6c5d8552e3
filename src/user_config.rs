// SPDX-FileCopyrightText: © 2025 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

/// Discipline used to order the handoff requests waiting for a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum QueuePolicy {
    /// First come, first served.
    Fcfs,
    /// The request with the shortest remaining dwell time is served first.
    DynamicPriority,
    /// Urgent and regular handoff requests wait in separate queues, each
    /// served in order of arrival, and urgent requests are always served
    /// first. A regular request may become urgent while waiting.
    TwoClass,
}

impl std::fmt::Display for QueuePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                QueuePolicy::Fcfs => "fcfs",
                QueuePolicy::DynamicPriority => "dynamic",
                QueuePolicy::TwoClass => "two-class",
            }
        )
    }
}

/// How to order two queued requests with the same policy key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TieBreak {
    /// The request that entered the queue first wins.
    ArrivalOrder,
    /// The request that entered the queue last wins.
    ReverseArrivalOrder,
}

impl std::fmt::Display for TieBreak {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                TieBreak::ArrivalOrder => "arrival",
                TieBreak::ReverseArrivalOrder => "reverse",
            }
        )
    }
}

/// Distribution of the time a mobile remains in range of the cell while its
/// handoff request is pending, in s.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum DwellTime {
    Exponential { mean: f64 },
    Deterministic { value: f64 },
    Uniform { min: f64, max: f64 },
}

impl Default for DwellTime {
    fn default() -> Self {
        Self::Exponential { mean: 10.0 }
    }
}

impl std::fmt::Display for DwellTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DwellTime::Exponential { mean } => write!(f, "exp;{}", mean),
            DwellTime::Deterministic { value } => write!(f, "det;{}", value),
            DwellTime::Uniform { min, max } => write!(f, "unif;{};{}", min, max),
        }
    }
}

impl DwellTime {
    /// Mean dwell time, in s.
    pub fn mean(&self) -> f64 {
        match self {
            DwellTime::Exponential { mean } => *mean,
            DwellTime::Deterministic { value } => *value,
            DwellTime::Uniform { min, max } => (min + max) / 2.0,
        }
    }

    fn valid(&self) -> Option<String> {
        match self {
            DwellTime::Exponential { mean } if *mean <= 0.0 || !mean.is_finite() => {
                Some(format!("exponential dwell time mean ({}) <= 0", mean))
            }
            DwellTime::Deterministic { value } if *value < 0.0 || !value.is_finite() => {
                Some(format!("deterministic dwell time ({}) < 0", value))
            }
            DwellTime::Uniform { min, max } if *min < 0.0 || !max.is_finite() || min >= max => {
                Some(format!("invalid uniform dwell time range [{}, {})", min, max))
            }
            _ => None,
        }
    }
}

/// Urgent handoff requests, only used with `QueuePolicy::TwoClass`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct UrgentHandoffs {
    /// Fraction of the handoff calls that are urgent on arrival.
    pub ratio: f64,
    /// Maximum number of urgent requests waiting for a channel.
    pub queue_size: u32,
    /// Dwell time of urgent requests.
    pub dwell_time: DwellTime,
    /// Mean time after which a waiting regular request becomes urgent, in s.
    /// Regular requests are never promoted if missing.
    pub mean_promotion_time: Option<f64>,
}

impl Default for UrgentHandoffs {
    fn default() -> Self {
        Self {
            ratio: 0.5,
            queue_size: 5,
            dwell_time: DwellTime::Exponential { mean: 7.5 },
            mean_promotion_time: Some(6.0),
        }
    }
}

impl UrgentHandoffs {
    fn valid(&self, errors: &mut Vec<String>) {
        if !(0.0..=1.0).contains(&self.ratio) {
            errors.push(format!("urgent handoff ratio ({}) not in [0, 1]", self.ratio));
        }
        if let Some(err) = self.dwell_time.valid() {
            errors.push(format!("urgent {}", err));
        }
        if let Some(mean) = self.mean_promotion_time {
            if mean <= 0.0 || !mean.is_finite() {
                errors.push(format!("mean promotion time ({}) <= 0", mean));
            }
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct UserConfig {
    /// The duration of the simulation, in s.
    pub duration: f64,
    /// The warm-up period, in s.
    pub warmup_period: f64,
    /// Stop after this many events, if set.
    /// Only arrivals, departures, timeouts and promotions are counted.
    #[serde(default)]
    pub max_events: Option<u64>,
    /// Number of channels in the cell.
    pub channels: u32,
    /// Maximum number of handoff requests waiting for a channel.
    /// With `QueuePolicy::TwoClass` only regular requests are counted.
    pub queue_size: u32,
    /// Arrival rate of new calls, in calls/s.
    pub new_call_rate: f64,
    /// Arrival rate of handoff calls, in calls/s.
    pub handoff_rate: f64,
    /// Mean channel holding time of new calls, in s.
    pub mean_holding_time: f64,
    /// Mean channel holding time of handoff calls, in s.
    /// If missing, the same as new calls.
    #[serde(default)]
    pub mean_handoff_holding_time: Option<f64>,
    /// Dwell time of queued handoff requests, regular ones with
    /// `QueuePolicy::TwoClass`.
    #[serde(default)]
    pub dwell_time: DwellTime,
    /// Handoff queueing discipline.
    pub policy: QueuePolicy,
    /// Ordering among queued requests with the same policy key.
    pub tie_break: TieBreak,
    /// Urgent handoff requests.
    #[serde(default)]
    pub urgent: UrgentHandoffs,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            duration: 3600.0,
            warmup_period: 60.0,
            max_events: None,
            channels: 30,
            queue_size: 5,
            new_call_rate: 0.25,
            handoff_rate: 0.25,
            mean_holding_time: 60.0,
            mean_handoff_holding_time: Some(30.0),
            dwell_time: DwellTime::default(),
            policy: QueuePolicy::DynamicPriority,
            tie_break: TieBreak::ArrivalOrder,
            urgent: UrgentHandoffs::default(),
        }
    }
}

impl UserConfig {
    pub fn header() -> String {
        String::from("duration,warmup_period,max_events,channels,queue_size,new_call_rate,handoff_rate,mean_holding_time,mean_handoff_holding_time,dwell_time,policy,tie_break,urgent_ratio,urgent_queue_size,urgent_dwell_time,mean_promotion_time")
    }
    pub fn to_csv(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            self.duration,
            self.warmup_period,
            self.max_events.map(|x| x.to_string()).unwrap_or_default(),
            self.channels,
            self.queue_size,
            self.new_call_rate,
            self.handoff_rate,
            self.mean_holding_time,
            self.handoff_holding_time(),
            self.dwell_time,
            self.policy,
            self.tie_break,
            self.urgent.ratio,
            self.urgent.queue_size,
            self.urgent.dwell_time,
            self.urgent
                .mean_promotion_time
                .map(|x| x.to_string())
                .unwrap_or_default()
        )
    }

    /// Mean channel holding time of handoff calls, in s.
    pub fn handoff_holding_time(&self) -> f64 {
        self.mean_handoff_holding_time
            .unwrap_or(self.mean_holding_time)
    }

    /// Total offered load, in Erlangs.
    pub fn offered_load(&self) -> f64 {
        self.new_call_rate * self.mean_holding_time
            + self.handoff_rate * self.handoff_holding_time()
    }

    /// Check that the configuration can be simulated.
    pub fn valid(&self) -> anyhow::Result<()> {
        let mut errors = vec![];
        if self.duration <= 0.0 || !self.duration.is_finite() {
            errors.push(format!("duration ({}) <= 0", self.duration));
        }
        if self.warmup_period < 0.0 || self.warmup_period >= self.duration {
            errors.push(format!(
                "warm-up period ({}) not in [0, {})",
                self.warmup_period, self.duration
            ));
        }
        if self.max_events == Some(0) {
            errors.push(String::from("vanishing maximum number of events"));
        }
        if self.channels == 0 {
            errors.push(String::from("vanishing number of channels"));
        }
        let positive = [
            (self.new_call_rate, "new call rate"),
            (self.handoff_rate, "handoff rate"),
            (self.mean_holding_time, "mean holding time"),
            (self.handoff_holding_time(), "mean handoff holding time"),
        ];
        for (value, name) in positive {
            if value <= 0.0 || !value.is_finite() {
                errors.push(format!("{} ({}) <= 0", name, value));
            }
        }
        if let Some(err) = self.dwell_time.valid() {
            errors.push(err);
        }
        if self.policy == QueuePolicy::TwoClass {
            self.urgent.valid(&mut errors);
        }

        if !errors.is_empty() {
            anyhow::bail!("invalid user configuration: {}", errors.join(","))
        }
        Ok(())
    }
}
