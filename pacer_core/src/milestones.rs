//! Milestone table and one-way completion tracking.

use std::sync::Arc;

use crate::config::{MAX_MILESTONES, MilestoneDef, TrackingCfg};
use crate::error::{BuildError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Milestone {
    pub index: u8,
    pub target_cm: u32,
    pub label: Arc<str>,
    pub finish_time_ms: Option<u32>,
}

impl Milestone {
    pub fn is_complete(&self) -> bool {
        self.finish_time_ms.is_some()
    }
}

/// Fixed, ascending set of milestones plus the dirty flag that drives
/// persistence.
#[derive(Debug, Clone)]
pub struct MilestoneTracker {
    milestones: Vec<Milestone>,
    tolerance_cm: u32,
    dirty: bool,
}

impl MilestoneTracker {
    pub fn new(cfg: &TrackingCfg) -> Result<Self> {
        check_table(&cfg.milestones)?;
        let milestones = cfg
            .milestones
            .iter()
            .enumerate()
            .map(|(i, m)| Milestone {
                index: i as u8,
                target_cm: m.target_cm,
                label: Arc::clone(&m.label),
                finish_time_ms: None,
            })
            .collect();
        Ok(Self {
            milestones,
            tolerance_cm: cfg.tolerance_cm,
            dirty: false,
        })
    }

    pub fn milestones(&self) -> &[Milestone] {
        &self.milestones
    }

    pub fn get(&self, idx: u8) -> Option<&Milestone> {
        self.milestones.get(usize::from(idx))
    }

    pub fn len(&self) -> usize {
        self.milestones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.milestones.is_empty()
    }

    pub fn last_index(&self) -> u8 {
        self.milestones.len().saturating_sub(1) as u8
    }

    pub fn all_complete(&self) -> bool {
        self.milestones.iter().all(Milestone::is_complete)
    }

    /// Lowest-index pending milestone.
    pub fn first_pending(&self) -> Option<&Milestone> {
        self.milestones.iter().find(|m| !m.is_complete())
    }

    /// Pending milestones in ascending order.
    pub fn pending(&self) -> impl Iterator<Item = &Milestone> {
        self.milestones.iter().filter(|m| !m.is_complete())
    }

    /// Target of the milestone before `idx`, or 0 for the first.
    pub fn segment_start_cm(&self, idx: u8) -> u32 {
        usize::from(idx)
            .checked_sub(1)
            .and_then(|p| self.milestones.get(p))
            .map_or(0, |m| m.target_cm)
    }

    /// Mark every milestone in `window` whose target (less tolerance) has
    /// been reached. Returns the indices completed on this call, in window
    /// order. Already-complete milestones are never touched again.
    ///
    /// A finish time never precedes the one recorded before it, even if the
    /// elapsed-time source stepped backwards.
    pub fn check(&mut self, window: &[Option<u8>], current_cm: u32, now_ms: u32) -> Completed {
        let mut done = Completed::default();
        for idx in window.iter().flatten() {
            let i = usize::from(*idx);
            let floor = self.milestones[..i.min(self.milestones.len())]
                .iter()
                .filter_map(|m| m.finish_time_ms)
                .max()
                .unwrap_or(0);
            let Some(m) = self.milestones.get_mut(i) else {
                continue;
            };
            if m.finish_time_ms.is_some() {
                continue;
            }
            if current_cm >= m.target_cm.saturating_sub(self.tolerance_cm) {
                let now_ms = now_ms.max(floor);
                m.finish_time_ms = Some(now_ms);
                self.dirty = true;
                tracing::info!(
                    milestone = %m.label,
                    finish_ms = now_ms,
                    distance_cm = current_cm,
                    "milestone complete"
                );
                done.push(*idx);
            }
        }
        done
    }

    /// Finish times in table order, as persisted.
    pub fn finish_times(&self) -> impl ExactSizeIterator<Item = Option<u32>> + '_ {
        self.milestones.iter().map(|m| m.finish_time_ms)
    }

    /// Replace finish times wholesale (startup restore). Length must match.
    pub fn restore(&mut self, times: &[Option<u32>]) -> bool {
        if times.len() != self.milestones.len() {
            return false;
        }
        for (m, t) in self.milestones.iter_mut().zip(times) {
            m.finish_time_ms = *t;
        }
        self.dirty = false;
        true
    }

    pub fn clear(&mut self) {
        for m in &mut self.milestones {
            m.finish_time_ms = None;
        }
        self.dirty = false;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

/// Indices completed on one `check` call. At most one per display slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Completed {
    idx: [u8; crate::config::DISPLAY_SLOTS],
    len: u8,
}

impl Completed {
    fn push(&mut self, i: u8) {
        if let Some(slot) = self.idx.get_mut(usize::from(self.len)) {
            *slot = i;
            self.len += 1;
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.idx[..usize::from(self.len)]
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, i: u8) -> bool {
        self.as_slice().contains(&i)
    }
}

fn check_table(defs: &[MilestoneDef]) -> Result<()> {
    if defs.is_empty() {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "at least one milestone is required",
        )));
    }
    if defs.len() > MAX_MILESTONES {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "too many milestones",
        )));
    }
    if defs.iter().any(|m| m.target_cm == 0) {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "milestone distance must be > 0",
        )));
    }
    if defs.windows(2).any(|w| w[0].target_cm >= w[1].target_cm) {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "milestone distances must be strictly increasing",
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> MilestoneTracker {
        MilestoneTracker::new(&TrackingCfg::default()).unwrap()
    }

    #[test]
    fn completes_within_tolerance_only() {
        let mut t = tracker();
        let w = [Some(0), Some(1), Some(2)];
        assert!(t.check(&w, 499_499, 1_799_000).is_empty());
        let done = t.check(&w, 499_500, 1_800_000);
        assert_eq!(done.as_slice(), &[0]);
        assert_eq!(t.get(0).unwrap().finish_time_ms, Some(1_800_000));
        assert!(t.is_dirty());
    }

    #[test]
    fn recheck_is_idempotent() {
        let mut t = tracker();
        let w = [Some(0), Some(1), Some(2)];
        t.check(&w, 500_000, 1_800_000);
        t.mark_clean();
        let again = t.check(&w, 500_000, 1_800_000);
        assert!(again.is_empty());
        assert!(!t.is_dirty());
        assert_eq!(t.get(0).unwrap().finish_time_ms, Some(1_800_000));
    }

    #[test]
    fn only_window_members_are_checked() {
        let mut t = tracker();
        // 10K is reached but only 5K is visible.
        let done = t.check(&[Some(0), None, None], 1_000_000, 3_600_000);
        assert_eq!(done.as_slice(), &[0]);
        assert!(!t.get(2).unwrap().is_complete());
    }

    #[test]
    fn finish_times_never_go_backwards() {
        let mut t = tracker();
        t.check(&[Some(0), Some(1), Some(2)], 500_000, 1_800_000);
        t.check(&[Some(1), Some(2), Some(3)], 804_672, 1_000);
        assert_eq!(t.get(1).unwrap().finish_time_ms, Some(1_800_000));
    }

    #[test]
    fn segment_start_uses_previous_target() {
        let t = tracker();
        assert_eq!(t.segment_start_cm(0), 0);
        assert_eq!(t.segment_start_cm(2), 804_672);
    }

    #[test]
    fn rejects_unsorted_table() {
        let cfg = TrackingCfg {
            tolerance_cm: 500,
            milestones: vec![
                MilestoneDef::new("10K", 1_000_000),
                MilestoneDef::new("5K", 500_000),
            ],
        };
        let err = MilestoneTracker::new(&cfg).unwrap_err();
        assert!(err.downcast_ref::<BuildError>().is_some());
    }

    #[test]
    fn restore_requires_matching_length() {
        let mut t = tracker();
        assert!(!t.restore(&[Some(1)]));
        let mut times = vec![None; t.len()];
        times[0] = Some(1_500_000);
        assert!(t.restore(&times));
        assert_eq!(t.first_pending().unwrap().index, 1);
        assert!(!t.is_dirty());
    }
}
