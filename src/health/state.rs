//! Service health state machine.
//!
//! # States
//! - Starting: launched, no successful probe yet
//! - Healthy: last probe succeeded
//! - Unhealthy: `retries` consecutive probes failed after the start period
//!
//! # State Transitions
//! ```text
//! Starting → Healthy:   first successful probe
//! Healthy → Unhealthy:  consecutive failures >= retries AND elapsed > start period
//! Unhealthy → Healthy:  any successful probe
//! ```
//!
//! Failures inside the start period still count, they just never produce
//! `Unhealthy`. The state is owned by a single probe loop and needs no locking.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::health::probe::ProbeConfig;

/// Reported health of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Starting,
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    /// Gauge value exported for this status.
    pub fn as_gauge(self) -> f64 {
        match self {
            HealthStatus::Starting => 0.0,
            HealthStatus::Healthy => 1.0,
            HealthStatus::Unhealthy => 2.0,
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HealthStatus::Starting => "starting",
            HealthStatus::Healthy => "healthy",
            HealthStatus::Unhealthy => "unhealthy",
        };
        f.write_str(name)
    }
}

/// Status change caused by one probe outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: HealthStatus,
    pub to: HealthStatus,
}

impl Transition {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Consecutive-failure counter plus the last reported status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthState {
    consecutive_failures: u32,
    last_status: HealthStatus,
}

impl HealthState {
    pub fn new() -> Self {
        Self {
            consecutive_failures: 0,
            last_status: HealthStatus::Starting,
        }
    }

    pub fn status(&self) -> HealthStatus {
        self.last_status
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Record a successful probe.
    pub fn record_success(&mut self) -> Transition {
        let from = self.last_status;
        self.consecutive_failures = 0;
        self.last_status = HealthStatus::Healthy;
        Transition {
            from,
            to: self.last_status,
        }
    }

    /// Record a failed probe, `elapsed` after launch.
    pub fn record_failure(&mut self, config: &ProbeConfig, elapsed: Duration) -> Transition {
        let from = self.last_status;
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);

        if self.consecutive_failures >= config.retries && elapsed > config.start_period {
            self.last_status = HealthStatus::Unhealthy;
        }

        Transition {
            from,
            to: self.last_status,
        }
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn config(retries: u32, start_period_secs: u64) -> ProbeConfig {
        ProbeConfig {
            retries,
            start_period: Duration::from_secs(start_period_secs),
            ..ProbeConfig::default()
        }
    }

    fn at(secs: u64) -> Duration {
        Duration::from_secs(secs)
    }

    #[test]
    fn starts_in_starting() {
        let state = HealthState::new();
        assert_eq!(state.status(), HealthStatus::Starting);
        assert_eq!(state.consecutive_failures(), 0);
    }

    #[test]
    fn unhealthy_exactly_at_retries() {
        let cfg = config(3, 0);
        let mut state = HealthState::new();

        assert_eq!(state.record_failure(&cfg, at(1)).to, HealthStatus::Starting);
        assert_eq!(state.record_failure(&cfg, at(2)).to, HealthStatus::Starting);
        let transition = state.record_failure(&cfg, at(3));
        assert_eq!(transition.to, HealthStatus::Unhealthy);
        assert!(transition.changed());
        assert_eq!(state.consecutive_failures(), 3);
    }

    #[test]
    fn success_before_threshold_resets() {
        let cfg = config(3, 0);
        let mut state = HealthState::new();

        state.record_failure(&cfg, at(1));
        state.record_failure(&cfg, at(2));
        let transition = state.record_success();

        assert_eq!(transition.to, HealthStatus::Healthy);
        assert_eq!(state.consecutive_failures(), 0);
    }

    #[test]
    fn start_period_absorbs_failures() {
        let cfg = config(3, 30);
        let mut state = HealthState::new();

        for secs in 1..=20 {
            state.record_failure(&cfg, at(secs));
            assert_ne!(state.status(), HealthStatus::Unhealthy);
        }
        assert_eq!(state.consecutive_failures(), 20);

        // Exactly at the boundary still counts as inside the grace window.
        state.record_failure(&cfg, at(30));
        assert_eq!(state.status(), HealthStatus::Starting);

        state.record_failure(&cfg, at(31));
        assert_eq!(state.status(), HealthStatus::Unhealthy);
    }

    #[test]
    fn healthy_survives_failures_below_threshold() {
        let cfg = config(3, 0);
        let mut state = HealthState::new();

        state.record_success();
        state.record_failure(&cfg, at(5));
        state.record_failure(&cfg, at(6));
        assert_eq!(state.status(), HealthStatus::Healthy);
        assert_eq!(state.consecutive_failures(), 2);
    }

    #[test]
    fn single_success_recovers_from_unhealthy() {
        let cfg = config(1, 0);
        let mut state = HealthState::new();

        state.record_failure(&cfg, at(1));
        assert_eq!(state.status(), HealthStatus::Unhealthy);

        let transition = state.record_success();
        assert_eq!(
            transition,
            Transition {
                from: HealthStatus::Unhealthy,
                to: HealthStatus::Healthy
            }
        );
        assert_eq!(state.consecutive_failures(), 0);
    }

    #[test]
    fn repeated_success_is_idempotent() {
        let mut state = HealthState::new();
        state.record_success();
        let snapshot = state.clone();

        for _ in 0..5 {
            assert!(!state.record_success().changed());
        }
        assert_eq!(state, snapshot);
    }

    proptest! {
        #[test]
        fn success_always_clears_failures(outcomes in prop::collection::vec(any::<bool>(), 0..64)) {
            let cfg = config(3, 0);
            let mut state = HealthState::new();
            for (i, ok) in outcomes.iter().enumerate() {
                if *ok {
                    state.record_success();
                } else {
                    state.record_failure(&cfg, at(i as u64 + 1));
                }
            }
            state.record_success();
            prop_assert_eq!(state.consecutive_failures(), 0);
            prop_assert_eq!(state.status(), HealthStatus::Healthy);
        }

        #[test]
        fn never_unhealthy_within_start_period(
            outcomes in prop::collection::vec(any::<bool>(), 0..64),
            retries in 1u32..5,
        ) {
            let start_period = 100u64;
            let cfg = config(retries, start_period);
            let mut state = HealthState::new();
            for (i, ok) in outcomes.iter().enumerate() {
                let elapsed = at((i as u64 + 1).min(start_period));
                if *ok {
                    state.record_success();
                } else {
                    state.record_failure(&cfg, elapsed);
                }
                prop_assert_ne!(state.status(), HealthStatus::Unhealthy);
            }
        }

        #[test]
        fn unhealthy_iff_last_retries_failed(
            outcomes in prop::collection::vec(any::<bool>(), 1..64),
            retries in 1u32..5,
        ) {
            let cfg = config(retries, 0);
            let mut state = HealthState::new();
            for (i, ok) in outcomes.iter().enumerate() {
                if *ok {
                    state.record_success();
                } else {
                    state.record_failure(&cfg, at(i as u64 + 1));
                }

                let seen = &outcomes[..=i];
                let tail_failed = seen.len() >= retries as usize
                    && seen[seen.len() - retries as usize..].iter().all(|ok| !ok);
                prop_assert_eq!(state.status() == HealthStatus::Unhealthy, tail_failed);
            }
        }
    }
}
