//! Safe-mode circuit breaker for repeated internal faults.

use thiserror::Error;

use crate::config::SafeModeCfg;

/// An internal inconsistency detected while computing a tick.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TickFault {
    #[error("non-finite value in {0}")]
    NonFinite(&'static str),
    #[error("display window references unknown milestone {0}")]
    BadWindowIndex(u8),
}

/// Counts consecutive faults; at the threshold it latches for a fixed number
/// of ticks, then lets computation retry.
#[derive(Debug, Clone)]
pub struct SafeModeBreaker {
    threshold: u8,
    recovery_ticks: u16,
    consecutive: u8,
    remaining: u16,
}

impl SafeModeBreaker {
    pub fn new(cfg: &SafeModeCfg) -> Self {
        Self {
            threshold: cfg.fault_threshold.max(1),
            recovery_ticks: cfg.recovery_ticks,
            consecutive: 0,
            remaining: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.remaining > 0
    }

    pub fn consecutive_faults(&self) -> u8 {
        self.consecutive
    }

    /// Call at the start of a tick. Returns true when the tick must be
    /// skipped.
    pub fn skip_tick(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        if self.remaining == 0 {
            tracing::info!("leaving safe mode; retrying computation");
        }
        true
    }

    /// Record a fault. Returns true when this fault tripped the breaker.
    pub fn record_fault(&mut self, fault: TickFault) -> bool {
        self.consecutive = self.consecutive.saturating_add(1);
        tracing::warn!(error = %fault, consecutive = self.consecutive, "tick fault");
        if self.consecutive >= self.threshold {
            self.consecutive = 0;
            self.remaining = self.recovery_ticks;
            tracing::warn!(ticks = self.recovery_ticks, "entering safe mode");
            return self.recovery_ticks > 0;
        }
        false
    }

    pub fn record_success(&mut self) {
        self.consecutive = 0;
    }

    pub fn reset(&mut self) {
        self.consecutive = 0;
        self.remaining = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trips_after_threshold_and_recovers() {
        let mut b = SafeModeBreaker::new(&SafeModeCfg::default());
        let f = TickFault::NonFinite("pace");
        assert!(!b.record_fault(f));
        assert!(!b.record_fault(f));
        assert!(b.record_fault(f));
        assert!(b.is_open());
        for _ in 0..10 {
            assert!(b.skip_tick());
        }
        assert!(!b.is_open());
        assert!(!b.skip_tick());
    }

    #[test]
    fn success_resets_streak() {
        let mut b = SafeModeBreaker::new(&SafeModeCfg::default());
        let f = TickFault::BadWindowIndex(42);
        b.record_fault(f);
        b.record_fault(f);
        b.record_success();
        assert!(!b.record_fault(f));
        assert_eq!(b.consecutive_faults(), 1);
    }
}
