use crate::RoomLabel;

/// Lengths of the current consecutive runs of messy and not-messy results.
///
/// After the first update exactly one of the two counters is nonzero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreakState {
    pub messy_count: u32,
    pub not_messy_count: u32,
}

impl StreakState {
    pub fn new(messy_count: u32, not_messy_count: u32) -> Self {
        Self {
            messy_count,
            not_messy_count,
        }
    }
}

#[derive(Debug, Default)]
pub struct StreakTracker {
    state: StreakState,
}

impl StreakTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> StreakState {
        self.state
    }

    pub fn update(&mut self, label: RoomLabel) -> StreakState {
        if label.is_messy() {
            self.state.messy_count = self.state.messy_count.saturating_add(1);
            self.state.not_messy_count = 0;
        } else {
            self.state.not_messy_count = self.state.not_messy_count.saturating_add(1);
            self.state.messy_count = 0;
        }
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn messy_run_resets_other_counter() {
        let mut tracker = StreakTracker::new();
        tracker.update(RoomLabel::Clean);
        tracker.update(RoomLabel::SoSo);
        assert_eq!(tracker.state(), StreakState::new(0, 2));
        assert_eq!(tracker.update(RoomLabel::Messy), StreakState::new(1, 0));
        assert_eq!(tracker.update(RoomLabel::Messy), StreakState::new(2, 0));
        assert_eq!(tracker.update(RoomLabel::Clean), StreakState::new(0, 1));
    }

    #[test]
    fn so_so_counts_as_not_messy() {
        let mut tracker = StreakTracker::new();
        for _ in 0..4 {
            tracker.update(RoomLabel::SoSo);
        }
        assert_eq!(tracker.state(), StreakState::new(0, 4));
    }

    #[test]
    fn counters_are_mutually_exclusive() {
        let mut rng = rand::thread_rng();
        let mut tracker = StreakTracker::new();
        for _ in 0..2000 {
            let label = RoomLabel::ALL[rng.gen_range(0..3)];
            let state = tracker.update(label);
            assert!(state.messy_count == 0 || state.not_messy_count == 0);
            assert!(state.messy_count + state.not_messy_count >= 1);
        }
    }

    #[test]
    fn counters_saturate() {
        let mut tracker = StreakTracker {
            state: StreakState::new(u32::MAX, 0),
        };
        assert_eq!(tracker.update(RoomLabel::Messy).messy_count, u32::MAX);
    }
}
