use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::alert::{AlertState, AlertStateMachine, Transition};
use crate::classifier_client::Classify;
use crate::config::Settings;
use crate::error::MonitorError;
use crate::frame_capture::{encode_jpeg, write_snapshot, FrameArchive, FrameSource};
use crate::notifier::Notify;
use crate::presenter::{FrameView, Presenter};
use crate::sound::{self, SoundPlayer};
use crate::streak::{StreakState, StreakTracker};
use crate::{Result, RoomLabel};

pub const RAISED_MESSAGE: &str = "汚部屋警報が発生しました";
pub const CLEARED_MESSAGE: &str = "汚部屋警報は解除されました";

/// Command-line switches for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunMode {
    pub alert: bool,
    pub sound: bool,
    pub save_image: bool,
}

/// What happened during one capture cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleReport {
    pub label: RoomLabel,
    pub messy_probability: f64,
    pub streak: StreakState,
    pub alert_state: AlertState,
    pub transition: Option<Transition>,
}

pub struct Monitor<S, C, N, P> {
    source: S,
    classifier: C,
    notifier: N,
    presenter: P,
    sound: Option<Box<dyn SoundPlayer>>,
    archive: Option<FrameArchive>,
    tracker: StreakTracker,
    alarm: AlertStateMachine,
    snapshot_path: PathBuf,
    alert_image: Option<PathBuf>,
    poll_interval: Duration,
}

impl<S, C, N, P> Monitor<S, C, N, P>
where
    S: FrameSource,
    C: Classify,
    N: Notify,
    P: Presenter,
{
    pub fn new(source: S, classifier: C, notifier: N, presenter: P, settings: &Settings, mode: RunMode) -> Self {
        Self {
            source,
            classifier,
            notifier,
            presenter,
            sound: None,
            archive: None,
            tracker: StreakTracker::new(),
            alarm: AlertStateMachine::new(mode.alert),
            snapshot_path: settings.snapshot_path.clone(),
            alert_image: settings.alert_image.clone(),
            poll_interval: Duration::from_millis(settings.poll_interval_ms),
        }
    }

    pub fn with_sound(mut self, player: Box<dyn SoundPlayer>) -> Self {
        self.sound = Some(player);
        self
    }

    pub fn with_archive(mut self, archive: FrameArchive) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn streak(&self) -> StreakState {
        self.tracker.state()
    }

    pub fn alert_state(&self) -> AlertState {
        self.alarm.state()
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    /// Runs cycles until Ctrl-C or a fatal error.
    pub async fn run(&mut self) -> Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        if let Some(player) = self.sound.as_mut() {
            if let Err(e) = player.play_effect(sound::START_SOUND) {
                warn!("Failed to play start sound: {:#}", e);
            }
        }

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                report = self.step() => { report?; }
            }

            if !self.poll_interval.is_zero() {
                tokio::select! {
                    biased;
                    _ = &mut shutdown => break,
                    _ = tokio::time::sleep(self.poll_interval) => {}
                }
            }
        }

        info!("Shutting down monitor");
        Ok(())
    }

    /// One capture → classify → streak → alert → render cycle.
    pub async fn step(&mut self) -> Result<CycleReport> {
        let frame = self.source.capture()?;
        let jpeg = encode_jpeg(&frame)?;
        write_snapshot(&self.snapshot_path, &jpeg)?;

        let result = self
            .classifier
            .classify(&jpeg)
            .await
            .map_err(MonitorError::from)?;
        debug!("{:?}", result);
        info!("{} {}", result.label.emoji(), result.label);

        if let Some(archive) = &self.archive {
            let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S_%3f").to_string();
            archive.save(&jpeg, result.label, &stamp)?;
        }

        let streak = self.tracker.update(result.label);
        if result.label.is_messy() {
            debug!("messy_count = {}", streak.messy_count);
        } else {
            debug!("not_messy_count = {}", streak.not_messy_count);
        }

        let transition = self.alarm.evaluate(streak);
        if let Some(transition) = transition {
            self.on_transition(transition).await;
        }

        let view = FrameView {
            frame: &frame,
            result: &result,
            streak,
            alerting: self.alarm.is_alerting() && self.alarm.alert_mode(),
        };
        if let Err(e) = self.presenter.render(&view) {
            warn!("Failed to render frame: {:#}", e);
        }

        Ok(CycleReport {
            label: result.label,
            messy_probability: result.messy_probability(),
            streak,
            alert_state: self.alarm.state(),
            transition,
        })
    }

    async fn on_transition(&mut self, transition: Transition) {
        let message = match transition {
            Transition::Raised => RAISED_MESSAGE,
            Transition::Cleared => CLEARED_MESSAGE,
        };
        info!("{}", message);

        if let Err(e) = self.notifier.notify(message, true).await {
            warn!("Failed to notify slack: {}", e);
        }
        if let Err(e) = self.presenter.banner(transition) {
            warn!("Failed to show banner: {:#}", e);
        }

        if let Some(player) = self.sound.as_mut() {
            let played = match transition {
                Transition::Raised => player
                    .play_effect(sound::ALARM_EFFECT)
                    .and_then(|_| player.play_bgm(sound::ALARM_BGM)),
                Transition::Cleared => {
                    player.stop_bgm();
                    player.play_effect(sound::CLEAR_EFFECT)
                }
            };
            if let Err(e) = played {
                warn!("Failed to play sound: {:#}", e);
            }
        }

        if transition == Transition::Raised {
            let image = self.upload_image().to_path_buf();
            if let Err(e) = self.notifier.upload(&image).await {
                warn!("Failed to upload {}: {}", image.display(), e);
            }
        }
    }

    fn upload_image(&self) -> &Path {
        match &self.alert_image {
            Some(path) if path.is_file() => path,
            _ => &self.snapshot_path,
        }
    }
}
