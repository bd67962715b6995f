pub mod alert;
pub mod classifier_client;
pub mod config;
pub mod error;
pub mod frame_capture;
pub mod monitor;
pub mod notifier;
pub mod presenter;
pub mod retry;
pub mod sound;
pub mod streak;

pub use alert::{AlertState, AlertStateMachine, Transition};
pub use classifier_client::{ClassificationResult, Classify, RoomClassifier};
pub use config::Settings;
pub use error::{ClassificationError, MonitorError, NotifyError};
pub use frame_capture::{Camera, FrameSource};
pub use monitor::{Monitor, RunMode};
pub use notifier::{Notify, SlackNotifier};
pub use presenter::{NullPresenter, Presenter, TerminalPresenter};
pub use sound::{CpalPlayer, SoundPlayer};
pub use streak::{StreakState, StreakTracker};

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum RoomLabel {
    #[serde(rename = "clean")]
    Clean,
    #[serde(rename = "so-so")]
    SoSo,
    #[serde(rename = "messy")]
    Messy,
}

impl RoomLabel {
    pub const ALL: [RoomLabel; 3] = [RoomLabel::Messy, RoomLabel::SoSo, RoomLabel::Clean];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoomLabel::Clean => "clean",
            RoomLabel::SoSo => "so-so",
            RoomLabel::Messy => "messy",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            RoomLabel::Clean => "✨",
            RoomLabel::SoSo => "🤔",
            RoomLabel::Messy => "😱",
        }
    }

    pub fn is_messy(&self) -> bool {
        matches!(self, RoomLabel::Messy)
    }
}

impl std::fmt::Display for RoomLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type Result<T> = anyhow::Result<T>;
