//! Bounded display window with a timed celebration hold.
//!
//! Normally the window holds the next `DISPLAY_SLOTS` pending milestones in
//! ascending order. When the milestone in slot 0 completes it stays pinned
//! there for the hold duration, after which the window is rebuilt. The very
//! last milestone is never celebrated; once it completes the window shows it
//! permanently.

use crate::config::{DISPLAY_SLOTS, DisplayCfg};
use crate::milestones::{Completed, MilestoneTracker};

pub type Window = [Option<u8>; DISPLAY_SLOTS];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Celebration {
    pub milestone_idx: u8,
    pub start_ms: u64,
}

#[derive(Debug, Clone)]
pub struct DisplayRotationController {
    window: Window,
    celebration: Option<Celebration>,
    hold_ms: u64,
    max_ms: u64,
}

impl DisplayRotationController {
    pub fn new(cfg: &DisplayCfg, tracker: &MilestoneTracker) -> Self {
        let mut c = Self {
            window: [None; DISPLAY_SLOTS],
            celebration: None,
            hold_ms: u64::from(cfg.celebration_ms),
            max_ms: u64::from(cfg.max_celebration_ms),
        };
        c.rebuild(tracker);
        c
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn celebration(&self) -> Option<Celebration> {
        self.celebration
    }

    pub fn is_celebrating(&self) -> bool {
        self.celebration.is_some()
    }

    /// Refill the window from pending milestones, or pin the last milestone
    /// when nothing is pending.
    pub fn rebuild(&mut self, tracker: &MilestoneTracker) {
        self.window = [None; DISPLAY_SLOTS];
        if tracker.all_complete() {
            if !tracker.is_empty() {
                self.window[0] = Some(tracker.last_index());
            }
            return;
        }
        for (slot, m) in self.window.iter_mut().zip(tracker.pending()) {
            *slot = Some(m.index);
        }
    }

    /// Drop everything and rebuild from the tracker's current state.
    pub fn reset(&mut self, tracker: &MilestoneTracker) {
        self.celebration = None;
        self.rebuild(tracker);
    }

    /// End the celebration when its hold has elapsed, or immediately when the
    /// clock is inconsistent with its start time. Returns true if the window
    /// was rebuilt.
    pub fn expire(&mut self, now_ms: u64, tracker: &MilestoneTracker) -> bool {
        let Some(c) = self.celebration else {
            return false;
        };
        if now_ms < c.start_ms || now_ms - c.start_ms > self.max_ms {
            tracing::warn!(
                milestone = c.milestone_idx,
                start_ms = c.start_ms,
                now_ms,
                "celebration clock anomaly; force-clearing"
            );
        } else if now_ms - c.start_ms < self.hold_ms {
            return false;
        }
        self.celebration = None;
        self.rebuild(tracker);
        true
    }

    /// React to milestones completed on this tick. Only a slot-0 completion
    /// rotates the window.
    pub fn on_completion(&mut self, done: &Completed, tracker: &MilestoneTracker, now_ms: u64) {
        let Some(head) = self.window[0] else {
            return;
        };
        if !done.contains(head) {
            return;
        }
        if head == tracker.last_index() {
            self.celebration = None;
            self.window = [None; DISPLAY_SLOTS];
            self.window[0] = Some(head);
            return;
        }
        tracing::info!(milestone = head, "celebration start");
        self.celebration = Some(Celebration {
            milestone_idx: head,
            start_ms: now_ms,
        });
        self.window = [None; DISPLAY_SLOTS];
        self.window[0] = Some(head);
        for (slot, m) in self.window[1..].iter_mut().zip(tracker.pending()) {
            *slot = Some(m.index);
        }
    }

    #[cfg(test)]
    pub(crate) fn force_slot(&mut self, slot: usize, idx: u8) {
        self.window[slot] = Some(idx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackingCfg;

    fn setup() -> (MilestoneTracker, DisplayRotationController) {
        let t = MilestoneTracker::new(&TrackingCfg::default()).unwrap();
        let d = DisplayRotationController::new(&DisplayCfg::default(), &t);
        (t, d)
    }

    fn complete(t: &mut MilestoneTracker, d: &mut DisplayRotationController, cm: u32, now: u64) {
        let done = t.check(d.window(), cm, now as u32);
        d.on_completion(&done, t, now);
    }

    #[test]
    fn initial_window_is_first_three() {
        let (_, d) = setup();
        assert_eq!(d.window(), &[Some(0), Some(1), Some(2)]);
    }

    #[test]
    fn slot_zero_completion_pins_and_rotates_after_hold() {
        let (mut t, mut d) = setup();
        complete(&mut t, &mut d, 500_000, 1_000);
        assert_eq!(d.window(), &[Some(0), Some(1), Some(2)]);
        assert_eq!(
            d.celebration(),
            Some(Celebration {
                milestone_idx: 0,
                start_ms: 1_000
            })
        );
        assert!(!d.expire(15_999, &t));
        assert!(d.expire(16_000, &t));
        assert_eq!(d.window(), &[Some(1), Some(2), Some(3)]);
        assert!(!d.is_celebrating());
    }

    #[test]
    fn clock_going_backwards_force_clears() {
        let (mut t, mut d) = setup();
        complete(&mut t, &mut d, 500_000, 50_000);
        assert!(d.expire(10_000, &t));
        assert_eq!(d.window()[0], Some(1));
    }

    #[test]
    fn stale_celebration_force_clears() {
        let (mut t, mut d) = setup();
        complete(&mut t, &mut d, 500_000, 0);
        assert!(d.expire(60_001, &t));
        assert!(!d.is_celebrating());
    }

    #[test]
    fn last_milestone_is_not_celebrated() {
        let (mut t, mut d) = setup();
        let mut times = vec![Some(1); t.len()];
        *times.last_mut().unwrap() = None;
        t.restore(&times);
        d.rebuild(&t);
        assert_eq!(d.window(), &[Some(8), None, None]);
        complete(&mut t, &mut d, 10_000_000, 40_000_000);
        assert!(!d.is_celebrating());
        assert_eq!(d.window(), &[Some(8), None, None]);
        assert!(t.all_complete());
        d.rebuild(&t);
        assert_eq!(d.window(), &[Some(8), None, None]);
    }
}
