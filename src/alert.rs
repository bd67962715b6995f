//! Debounced alert state.
//!
//! ```text
//!           messy_count > 10 (alert mode on)
//!  Normal ─────────────────────────────────► Alert
//!    ▲                                         │
//!    └─────────────────────────────────────────┘
//!               not_messy_count > 10
//! ```
//!
//! [`AlertStateMachine::evaluate`] reports a [`Transition`] only on the cycle
//! the state flips, so callers bind side effects to edges.

use crate::streak::StreakState;

/// A streak must exceed this length before the alert state may flip.
pub const DEBOUNCE_THRESHOLD: u32 = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AlertState {
    #[default]
    Normal,
    Alert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Normal → Alert
    Raised,
    /// Alert → Normal
    Cleared,
}

#[derive(Debug)]
pub struct AlertStateMachine {
    state: AlertState,
    alert_mode: bool,
    threshold: u32,
}

impl AlertStateMachine {
    pub fn new(alert_mode: bool) -> Self {
        Self {
            state: AlertState::Normal,
            alert_mode,
            threshold: DEBOUNCE_THRESHOLD,
        }
    }

    pub fn state(&self) -> AlertState {
        self.state
    }

    pub fn alert_mode(&self) -> bool {
        self.alert_mode
    }

    pub fn is_alerting(&self) -> bool {
        self.state == AlertState::Alert
    }

    pub fn evaluate(&mut self, streak: StreakState) -> Option<Transition> {
        match self.state {
            AlertState::Normal if self.alert_mode && streak.messy_count > self.threshold => {
                self.state = AlertState::Alert;
                Some(Transition::Raised)
            }
            AlertState::Alert if streak.not_messy_count > self.threshold => {
                self.state = AlertState::Normal;
                Some(Transition::Cleared)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streak::StreakTracker;
    use crate::RoomLabel;

    fn drive(machine: &mut AlertStateMachine, labels: &[RoomLabel]) -> Vec<(usize, Transition)> {
        let mut tracker = StreakTracker::new();
        labels
            .iter()
            .enumerate()
            .filter_map(|(i, &label)| machine.evaluate(tracker.update(label)).map(|t| (i, t)))
            .collect()
    }

    #[test]
    fn raises_on_eleventh_messy_and_clears_on_eleventh_clean() {
        let mut labels = vec![RoomLabel::Messy; 11];
        labels.extend(vec![RoomLabel::Clean; 11]);
        let mut machine = AlertStateMachine::new(true);

        let edges = drive(&mut machine, &labels);

        assert_eq!(edges, vec![(10, Transition::Raised), (21, Transition::Cleared)]);
        assert_eq!(machine.state(), AlertState::Normal);
    }

    #[test]
    fn ten_messy_results_do_not_raise() {
        let mut machine = AlertStateMachine::new(true);
        assert!(drive(&mut machine, &[RoomLabel::Messy; 10]).is_empty());
        assert_eq!(machine.state(), AlertState::Normal);
    }

    #[test]
    fn staying_messy_does_not_raise_again() {
        let mut machine = AlertStateMachine::new(true);
        let edges = drive(&mut machine, &[RoomLabel::Messy; 40]);
        assert_eq!(edges, vec![(10, Transition::Raised)]);
        assert!(machine.is_alerting());
    }

    #[test]
    fn alternating_labels_never_transition() {
        let labels: Vec<RoomLabel> = (0..200)
            .map(|i| if i % 2 == 0 { RoomLabel::Messy } else { RoomLabel::Clean })
            .collect();
        let mut machine = AlertStateMachine::new(true);
        assert!(drive(&mut machine, &labels).is_empty());
    }

    #[test]
    fn a_single_messy_frame_interrupts_the_clear_streak() {
        let mut labels = vec![RoomLabel::Messy; 11];
        labels.extend(vec![RoomLabel::SoSo; 10]);
        labels.push(RoomLabel::Messy);
        labels.extend(vec![RoomLabel::Clean; 10]);
        let mut machine = AlertStateMachine::new(true);
        assert_eq!(drive(&mut machine, &labels), vec![(10, Transition::Raised)]);
        assert!(machine.is_alerting());
    }

    #[test]
    fn alert_mode_off_never_raises() {
        let mut machine = AlertStateMachine::new(false);
        assert!(drive(&mut machine, &[RoomLabel::Messy; 50]).is_empty());
        assert_eq!(machine.state(), AlertState::Normal);
    }
}
