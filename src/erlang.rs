// SPDX-FileCopyrightText: © 2025 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

//! Closed-form results of the M/M/c/c loss system, used as a baseline for
//! the simulated cell without handoff queue.

/// Blocking probability of an M/M/c/c system with `channels` servers and
/// offered load `load`, in Erlangs (Erlang-B formula).
///
/// Computed with the recursion B(0) = 1, B(k) = A B(k-1) / (k + A B(k-1)),
/// which does not overflow for large loads.
pub fn erlang_b(channels: u32, load: f64) -> f64 {
    assert!(load >= 0.0, "negative offered load {}", load);
    let mut b = 1.0;
    for k in 1..=channels {
        b = load * b / (k as f64 + load * b);
    }
    b
}

/// Steady-state probability of having n busy channels, for n = 0..=channels,
/// in an M/M/c/c system (truncated Poisson distribution).
pub fn occupancy_distribution(channels: u32, load: f64) -> Vec<f64> {
    assert!(load >= 0.0, "negative offered load {}", load);

    if load == 0.0 {
        let mut ret = vec![0.0; channels as usize + 1];
        ret[0] = 1.0;
        return ret;
    }

    // Unnormalized terms A^n / n!, scaled by the largest one to avoid overflow.
    let mut log_terms = vec![0.0; channels as usize + 1];
    for n in 1..=channels as usize {
        log_terms[n] = log_terms[n - 1] + load.ln() - (n as f64).ln();
    }
    let max = log_terms.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let terms: Vec<f64> = log_terms.iter().map(|x| (x - max).exp()).collect();
    let sum = terms.iter().sum::<f64>();
    terms.iter().map(|x| x / sum).collect()
}

/// Mean number of busy channels in an M/M/c/c system, i.e., the carried load.
pub fn carried_load(channels: u32, load: f64) -> f64 {
    load * (1.0 - erlang_b(channels, load))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_erlang_b_known_values() {
        assert_float_eq::assert_float_absolute_eq!(1.0, erlang_b(0, 5.0), 1e-12);
        assert_float_eq::assert_float_absolute_eq!(0.5, erlang_b(1, 1.0), 1e-12);
        assert_float_eq::assert_float_absolute_eq!(0.2, erlang_b(2, 1.0), 1e-12);
        assert_float_eq::assert_float_absolute_eq!(2.0 / 3.0, erlang_b(1, 2.0), 1e-12);
        assert_float_eq::assert_float_absolute_eq!(0.0, erlang_b(3, 0.0), 1e-12);

        // Reference values from Erlang-B tables.
        assert_float_eq::assert_float_absolute_eq!(0.0431, erlang_b(10, 6.0), 1e-4);
        assert_float_eq::assert_float_absolute_eq!(0.2146, erlang_b(10, 10.0), 1e-4);
    }

    #[test]
    fn test_erlang_b_saturation() {
        // In overload B ~ 1 - c / A.
        let b = erlang_b(10, 120.0);
        assert!(b > 0.9 && b < 1.0, "{}", b);
        assert!((b - (1.0 - 10.0 / 120.0)).abs() < 0.01, "{}", b);
    }

    #[test]
    fn test_erlang_b_monotone() {
        let mut last = 1.0;
        for channels in 1..50 {
            let b = erlang_b(channels, 20.0);
            assert!(b < last);
            last = b;
        }
    }

    #[test]
    fn test_occupancy_distribution() {
        for (channels, load) in [(1, 1.0), (10, 6.0), (10, 120.0), (200, 150.0), (5, 0.0)] {
            let p = occupancy_distribution(channels, load);
            assert_eq!(channels as usize + 1, p.len());
            assert_float_eq::assert_float_absolute_eq!(1.0, p.iter().sum::<f64>(), 1e-9);

            // The probability that all channels are busy is the Erlang-B.
            assert_float_eq::assert_float_absolute_eq!(
                erlang_b(channels, load),
                p[channels as usize],
                1e-9
            );

            // Carried load is the mean of the distribution.
            let mean = p
                .iter()
                .enumerate()
                .map(|(n, p)| n as f64 * p)
                .sum::<f64>();
            assert_float_eq::assert_float_absolute_eq!(carried_load(channels, load), mean, 1e-9);
        }
    }
}
