// SPDX-FileCopyrightText: © 2025 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

/// Identical channels of a cell. Only the number of busy channels matters.
#[derive(Debug)]
pub struct ChannelPool {
    /// Total number of channels.
    capacity: u32,
    /// Number of channels currently assigned to a call.
    occupied: u32,
}

impl ChannelPool {
    /// Create a pool with all the channels idle.
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            occupied: 0,
        }
    }

    /// Assign an idle channel, if any. Return true if successful.
    pub fn try_seize(&mut self) -> bool {
        if self.occupied < self.capacity {
            self.occupied += 1;
            true
        } else {
            false
        }
    }

    /// Return a channel to the pool.
    ///
    /// Panics if no channel is busy.
    pub fn release(&mut self) {
        assert!(
            self.occupied > 0,
            "release of a channel with all {} channels idle",
            self.capacity
        );
        self.occupied -= 1;
    }

    pub fn occupied(&self) -> u32 {
        self.occupied
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.occupied == self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::ChannelPool;

    #[test]
    fn test_channel_pool_seize_release() {
        let mut pool = ChannelPool::new(2);
        assert_eq!(2, pool.capacity());
        assert_eq!(0, pool.occupied());

        assert!(pool.try_seize());
        assert!(!pool.is_full());
        assert!(pool.try_seize());
        assert!(pool.is_full());

        assert!(!pool.try_seize());
        assert_eq!(2, pool.occupied());

        pool.release();
        assert_eq!(1, pool.occupied());
        assert!(pool.try_seize());
        pool.release();
        pool.release();
        assert_eq!(0, pool.occupied());
    }

    #[test]
    fn test_channel_pool_empty() {
        let mut pool = ChannelPool::new(0);
        assert!(pool.is_full());
        assert!(!pool.try_seize());
    }

    #[test]
    #[should_panic(expected = "all 3 channels idle")]
    fn test_channel_pool_release_idle() {
        let mut pool = ChannelPool::new(3);
        pool.release();
    }
}
