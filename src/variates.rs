// SPDX-FileCopyrightText: © 2025 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use rand::SeedableRng;
use rand_distr::Distribution;

use crate::handoff_queue::HandoffClass;
use crate::user_config::{DwellTime, QueuePolicy, UserConfig};

/// R.v. for the dwell time of queued handoff requests.
#[derive(Debug)]
enum DwellDistribution {
    Exponential(rand_distr::Exp<f64>),
    Deterministic(f64),
    Uniform(rand_distr::Uniform<f64>),
}

impl DwellDistribution {
    fn new(dwell_time: &DwellTime) -> anyhow::Result<Self> {
        Ok(match dwell_time {
            DwellTime::Exponential { mean } => {
                DwellDistribution::Exponential(exp(1.0 / mean, "dwell time")?)
            }
            DwellTime::Deterministic { value } => DwellDistribution::Deterministic(*value),
            DwellTime::Uniform { min, max } => {
                anyhow::ensure!(min < max, "invalid uniform dwell time range");
                DwellDistribution::Uniform(rand_distr::Uniform::new(min, max))
            }
        })
    }

    fn sample(&self, rng: &mut rand::rngs::StdRng) -> u64 {
        crate::utils::to_nanoseconds(match self {
            DwellDistribution::Exponential(rv) => rv.sample(rng),
            DwellDistribution::Deterministic(value) => *value,
            DwellDistribution::Uniform(rv) => rv.sample(rng),
        })
    }
}

/// R.v.s of urgent handoff requests.
#[derive(Debug)]
struct UrgentVariates {
    /// R.v. to decide whether a handoff call is urgent.
    rv_urgent: rand_distr::Bernoulli,
    /// R.v. for the dwell time of urgent requests.
    rv_dwell: DwellDistribution,
    /// R.v. for the time before a regular request becomes urgent.
    rv_promotion: Option<rand_distr::Exp<f64>>,
}

fn exp(rate: f64, name: &str) -> anyhow::Result<rand_distr::Exp<f64>> {
    anyhow::ensure!(
        rate > 0.0 && rate.is_finite(),
        "invalid {} rate {}",
        name,
        rate
    );
    rand_distr::Exp::new(rate)
        .map_err(|err| anyhow::anyhow!("invalid {} rate {}: {}", name, rate, err))
}

/// All the random variables of one simulation run, drawn from a single
/// pseudo-random number generator so that a run is fully determined by its
/// seed. Samples are returned in ns.
#[derive(Debug)]
pub struct Variates {
    /// R.v. for the interarrival time of new calls.
    rv_new_arrival: rand_distr::Exp<f64>,
    /// R.v. for the interarrival time of handoff calls.
    rv_handoff_arrival: rand_distr::Exp<f64>,
    /// R.v. for the holding time of new calls.
    rv_new_holding: rand_distr::Exp<f64>,
    /// R.v. for the holding time of handoff calls.
    rv_handoff_holding: rand_distr::Exp<f64>,
    /// R.v. for the dwell time of regular requests.
    rv_dwell: DwellDistribution,
    /// R.v.s of urgent requests, only with two classes.
    urgent: Option<UrgentVariates>,
    /// Pseudo-random number generator.
    rng: rand::rngs::StdRng,
}

impl Variates {
    /// Create the random variables of a valid user configuration.
    pub fn new(user_config: &UserConfig, seed: u64) -> anyhow::Result<Self> {
        let conf = &user_config.urgent;
        let urgent = match user_config.policy {
            QueuePolicy::TwoClass => Some(UrgentVariates {
                rv_urgent: rand_distr::Bernoulli::new(conf.ratio).map_err(|err| {
                    anyhow::anyhow!("invalid urgent handoff ratio {}: {}", conf.ratio, err)
                })?,
                rv_dwell: DwellDistribution::new(&conf.dwell_time)?,
                rv_promotion: match conf.mean_promotion_time {
                    Some(mean) => Some(exp(1.0 / mean, "promotion")?),
                    None => None,
                },
            }),
            QueuePolicy::Fcfs | QueuePolicy::DynamicPriority => None,
        };
        Ok(Self {
            rv_new_arrival: exp(user_config.new_call_rate, "new call arrival")?,
            rv_handoff_arrival: exp(user_config.handoff_rate, "handoff arrival")?,
            rv_new_holding: exp(1.0 / user_config.mean_holding_time, "new call holding")?,
            rv_handoff_holding: exp(
                1.0 / user_config.handoff_holding_time(),
                "handoff call holding",
            )?,
            rv_dwell: DwellDistribution::new(&user_config.dwell_time)?,
            urgent,
            rng: rand::rngs::StdRng::seed_from_u64(seed),
        })
    }

    fn sample(rv: &rand_distr::Exp<f64>, rng: &mut rand::rngs::StdRng) -> u64 {
        crate::utils::to_nanoseconds(rv.sample(rng))
    }

    pub fn new_interarrival(&mut self) -> u64 {
        Self::sample(&self.rv_new_arrival, &mut self.rng)
    }

    pub fn handoff_interarrival(&mut self) -> u64 {
        Self::sample(&self.rv_handoff_arrival, &mut self.rng)
    }

    pub fn new_holding(&mut self) -> u64 {
        Self::sample(&self.rv_new_holding, &mut self.rng)
    }

    pub fn handoff_holding(&mut self) -> u64 {
        Self::sample(&self.rv_handoff_holding, &mut self.rng)
    }

    /// Class of an arriving handoff call, always regular with one class.
    pub fn handoff_class(&mut self) -> HandoffClass {
        match &self.urgent {
            Some(urgent) if urgent.rv_urgent.sample(&mut self.rng) => HandoffClass::Urgent,
            _ => HandoffClass::Regular,
        }
    }

    pub fn dwell(&mut self, class: HandoffClass) -> u64 {
        match (&self.urgent, class) {
            (Some(urgent), HandoffClass::Urgent) => urgent.rv_dwell.sample(&mut self.rng),
            _ => self.rv_dwell.sample(&mut self.rng),
        }
    }

    /// Time before a regular request becomes urgent, if ever.
    pub fn promotion(&mut self) -> Option<u64> {
        let rv = self.urgent.as_ref()?.rv_promotion.as_ref()?;
        Some(Self::sample(rv, &mut self.rng))
    }
}

#[cfg(test)]
mod tests {
    use super::Variates;
    use crate::handoff_queue::HandoffClass;
    use crate::user_config::{DwellTime, QueuePolicy, UrgentHandoffs, UserConfig};
    use crate::utils::to_seconds;

    fn user_config() -> UserConfig {
        UserConfig {
            new_call_rate: 2.0,
            handoff_rate: 0.5,
            mean_holding_time: 3.0,
            mean_handoff_holding_time: Some(1.5),
            dwell_time: DwellTime::Exponential { mean: 8.0 },
            ..Default::default()
        }
    }

    #[test]
    fn test_variates_reproducible() -> anyhow::Result<()> {
        let mut rv1 = Variates::new(&user_config(), 42)?;
        let mut rv2 = Variates::new(&user_config(), 42)?;
        let mut rv3 = Variates::new(&user_config(), 43)?;
        let mut different = false;
        for _ in 0..100 {
            let a = rv1.new_interarrival();
            assert_eq!(a, rv2.new_interarrival());
            assert_eq!(rv1.dwell(HandoffClass::Regular), rv2.dwell(HandoffClass::Regular));
            different |= a != rv3.new_interarrival();
            rv3.dwell(HandoffClass::Regular);
        }
        assert!(different);
        Ok(())
    }

    #[test]
    fn test_variates_means() -> anyhow::Result<()> {
        let mut rv = Variates::new(&user_config(), 0)?;
        let n = 100_000;
        let mut sums = [0.0; 5];
        for _ in 0..n {
            sums[0] += to_seconds(rv.new_interarrival());
            sums[1] += to_seconds(rv.handoff_interarrival());
            sums[2] += to_seconds(rv.new_holding());
            sums[3] += to_seconds(rv.handoff_holding());
            sums[4] += to_seconds(rv.dwell(HandoffClass::Regular));
        }
        let expected = [0.5, 2.0, 3.0, 1.5, 8.0];
        for (sum, expected) in sums.iter().zip(expected.iter()) {
            let mean = sum / n as f64;
            assert!(
                (mean - expected).abs() < 0.02 * expected,
                "mean {} expected {}",
                mean,
                expected
            );
        }
        Ok(())
    }

    #[test]
    fn test_variates_dwell_distributions() -> anyhow::Result<()> {
        let mut rv = Variates::new(
            &UserConfig {
                dwell_time: DwellTime::Deterministic { value: 2.5 },
                ..user_config()
            },
            0,
        )?;
        for _ in 0..10 {
            assert_eq!(2_500_000_000, rv.dwell(HandoffClass::Regular));
        }

        let mut rv = Variates::new(
            &UserConfig {
                dwell_time: DwellTime::Uniform { min: 1.0, max: 2.0 },
                ..user_config()
            },
            0,
        )?;
        for _ in 0..1000 {
            let dwell = rv.dwell(HandoffClass::Regular);
            assert!((1_000_000_000..=2_000_000_000).contains(&dwell));
        }
        Ok(())
    }

    #[test]
    fn test_variates_single_class() -> anyhow::Result<()> {
        let mut rv = Variates::new(&user_config(), 0)?;
        for _ in 0..100 {
            assert_eq!(HandoffClass::Regular, rv.handoff_class());
            assert!(rv.promotion().is_none());
        }
        Ok(())
    }

    #[test]
    fn test_variates_two_classes() -> anyhow::Result<()> {
        let mut rv = Variates::new(
            &UserConfig {
                policy: QueuePolicy::TwoClass,
                urgent: UrgentHandoffs {
                    ratio: 0.25,
                    queue_size: 5,
                    dwell_time: DwellTime::Deterministic { value: 1.0 },
                    mean_promotion_time: Some(4.0),
                },
                ..user_config()
            },
            0,
        )?;
        let n = 100_000;
        let mut num_urgent = 0;
        let mut promotion_sum = 0.0;
        for _ in 0..n {
            if rv.handoff_class() == HandoffClass::Urgent {
                num_urgent += 1;
            }
            promotion_sum += to_seconds(rv.promotion().unwrap());
        }
        let urgent_ratio = num_urgent as f64 / n as f64;
        assert!((urgent_ratio - 0.25).abs() < 0.01, "{}", urgent_ratio);
        let promotion_mean = promotion_sum / n as f64;
        assert!((promotion_mean - 4.0).abs() < 0.08, "{}", promotion_mean);
        assert_eq!(1_000_000_000, rv.dwell(HandoffClass::Urgent));
        assert_ne!(1_000_000_000, rv.dwell(HandoffClass::Regular));

        let mut rv = Variates::new(
            &UserConfig {
                policy: QueuePolicy::TwoClass,
                urgent: UrgentHandoffs {
                    mean_promotion_time: None,
                    ..Default::default()
                },
                ..user_config()
            },
            0,
        )?;
        assert!(rv.promotion().is_none());
        Ok(())
    }

    #[test]
    fn test_variates_invalid() {
        assert!(Variates::new(
            &UserConfig {
                new_call_rate: 0.0,
                ..user_config()
            },
            0
        )
        .is_err());
        assert!(Variates::new(
            &UserConfig {
                dwell_time: DwellTime::Uniform { min: 2.0, max: 2.0 },
                ..user_config()
            },
            0
        )
        .is_err());
    }
}
