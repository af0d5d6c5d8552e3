// SPDX-FileCopyrightText: © 2025 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use crate::user_config::UserConfig;

/// Configuration of a single scenario run.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Config {
    /// The seed to initialize the pseudo-random number generator.
    pub seed: u64,
    /// The scenario chosen by the user.
    pub user_config: UserConfig,
}

impl Config {
    pub fn new(seed: u64, user_config: UserConfig) -> Self {
        Self { seed, user_config }
    }
    pub fn header() -> String {
        format!("seed,{}", UserConfig::header())
    }
    pub fn to_csv(&self) -> String {
        format!("{},{}", self.seed, self.user_config.to_csv())
    }
}

#[cfg(test)]
mod tests {
    use super::Config;

    #[test]
    fn test_config_csv() {
        let config = Config::new(42, Default::default());
        assert_eq!(
            Config::header().matches(',').count(),
            config.to_csv().matches(',').count()
        );
        assert!(config.to_csv().starts_with("42,"));
    }
}
