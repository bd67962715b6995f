use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use crossterm::style::{Color, Stylize};
use image::RgbImage;

use crate::alert::Transition;
use crate::classifier_client::ClassificationResult;
use crate::frame_capture::{encode_jpeg, write_snapshot};
use crate::streak::StreakState;
use crate::{Result, RoomLabel};

pub const ALARM_BANNER: &str = "!!! Obeya Alarm!!!";

/// Everything shown for one cycle.
pub struct FrameView<'a> {
    pub frame: &'a RgbImage,
    pub result: &'a ClassificationResult,
    pub streak: StreakState,
    /// In the alert state with alert mode on.
    pub alerting: bool,
}

pub trait Presenter {
    fn render(&mut self, view: &FrameView<'_>) -> Result<()>;
    fn banner(&mut self, transition: Transition) -> Result<()>;
}

/// Non-display runs.
#[derive(Debug, Default)]
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn render(&mut self, _view: &FrameView<'_>) -> Result<()> {
        Ok(())
    }

    fn banner(&mut self, _transition: Transition) -> Result<()> {
        Ok(())
    }
}

fn label_color(label: RoomLabel) -> Color {
    match label {
        RoomLabel::Messy => Color::Magenta,
        RoomLabel::SoSo => Color::Yellow,
        RoomLabel::Clean => Color::Green,
    }
}

pub fn streak_bar(count: u32) -> String {
    format!("{}: {}", count, "*".repeat(count as usize))
}

pub fn status_lines(view: &FrameView<'_>) -> Vec<String> {
    let label = view.result.label;
    let mut lines = vec![format!(
        "{}  messy {:.2}",
        format!("{} {}", label.emoji(), label).with(label_color(label)),
        view.result.messy_probability()
    )];
    if view.alerting {
        lines.push(ALARM_BANNER.red().to_string());
        lines.push(streak_bar(view.streak.not_messy_count).green().to_string());
    } else {
        lines.push(streak_bar(view.streak.messy_count).red().to_string());
    }
    lines
}

pub fn banner_lines(transition: Transition) -> Vec<String> {
    let (emoji, message, color) = match transition {
        Transition::Raised => ("😱", "汚部屋警報発生", Color::Magenta),
        Transition::Cleared => ("😄", "汚部屋警報は解除されました", Color::Green),
    };
    let row = vec![emoji; 15].join("   ");
    vec![
        row.clone(),
        row.clone(),
        message.with(color).to_string(),
        row.clone(),
        row,
    ]
}

/// Draws status to a terminal and mirrors each frame to the preview file, if one is set.
pub struct TerminalPresenter<W: Write> {
    out: W,
    preview_path: Option<PathBuf>,
}

impl TerminalPresenter<std::io::Stdout> {
    pub fn stdout(preview_path: Option<PathBuf>) -> Self {
        Self::new(std::io::stdout(), preview_path)
    }
}

impl<W: Write> TerminalPresenter<W> {
    pub fn new(out: W, preview_path: Option<PathBuf>) -> Self {
        Self { out, preview_path }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_lines(&mut self, lines: &[String]) -> Result<()> {
        for line in lines {
            writeln!(self.out, "{}", line).context("failed to write to display")?;
        }
        self.out.flush().context("failed to flush display")
    }
}

impl<W: Write> Presenter for TerminalPresenter<W> {
    fn render(&mut self, view: &FrameView<'_>) -> Result<()> {
        if let Some(path) = &self.preview_path {
            write_snapshot(path, &encode_jpeg(view.frame)?)?;
        }
        self.write_lines(&status_lines(view))
    }

    fn banner(&mut self, transition: Transition) -> Result<()> {
        self.write_lines(&banner_lines(transition))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn result(label: RoomLabel, messy: f64) -> ClassificationResult {
        ClassificationResult {
            label,
            probabilities: HashMap::from([(RoomLabel::Messy, messy)]),
        }
    }

    #[test]
    fn bar_length_matches_count() {
        assert_eq!(streak_bar(0), "0: ");
        assert_eq!(streak_bar(3), "3: ***");
    }

    #[test]
    fn normal_view_shows_messy_streak() {
        let frame = RgbImage::new(2, 2);
        let result = result(RoomLabel::Messy, 0.876);
        let view = FrameView {
            frame: &frame,
            result: &result,
            streak: StreakState::new(4, 0),
            alerting: false,
        };
        let lines = status_lines(&view);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("messy 0.88"));
        assert!(lines[1].contains("4: ****"));
    }

    #[test]
    fn alert_view_shows_recovery_streak() {
        let frame = RgbImage::new(2, 2);
        let result = result(RoomLabel::Clean, 0.1);
        let view = FrameView {
            frame: &frame,
            result: &result,
            streak: StreakState::new(0, 2),
            alerting: true,
        };
        let lines = status_lines(&view);
        assert!(lines[1].contains(ALARM_BANNER));
        assert!(lines[2].contains("2: **"));
    }

    #[test]
    fn terminal_presenter_writes_banner_and_preview() {
        let dir = tempfile::tempdir().unwrap();
        let preview = dir.path().join("preview.jpg");
        let mut presenter = TerminalPresenter::new(Vec::new(), Some(preview.clone()));

        let frame = RgbImage::new(8, 8);
        let result = result(RoomLabel::SoSo, 0.3);
        presenter
            .render(&FrameView {
                frame: &frame,
                result: &result,
                streak: StreakState::new(0, 1),
                alerting: false,
            })
            .unwrap();
        presenter.banner(Transition::Raised).unwrap();

        let text = String::from_utf8(presenter.into_inner()).unwrap();
        assert!(text.contains("so-so"));
        assert!(text.contains("汚部屋警報発生"));
        assert!(preview.is_file());
    }

    #[test]
    fn default_settings_show_every_frame() {
        let dir = tempfile::tempdir().unwrap();
        let preview = crate::Settings::default()
            .preview_path
            .map(|p| dir.path().join(p))
            .expect("frames are previewed by default");
        let mut presenter = TerminalPresenter::new(Vec::new(), Some(preview.clone()));

        let frame = RgbImage::from_pixel(6, 4, image::Rgb([200, 10, 10]));
        let result = result(RoomLabel::Messy, 0.9);
        presenter
            .render(&FrameView {
                frame: &frame,
                result: &result,
                streak: StreakState::new(1, 0),
                alerting: false,
            })
            .unwrap();

        let shown = image::open(&preview).unwrap();
        assert_eq!((shown.width(), shown.height()), (6, 4));
    }
}
