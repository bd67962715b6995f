//! Run configuration: a JSON file with secrets optionally supplied through the environment.

use std::path::{Path, PathBuf};

use anyhow::Context;
use log::info;
use serde::Deserialize;

use crate::error::MonitorError;
use crate::retry::RetryPolicy;
use crate::Result;

pub const DEFAULT_CONFIG_PATH: &str = "oheya.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub classifier_url: String,
    pub slack_webhook_url: Option<String>,
    pub slack_user_id: Option<String>,
    pub slack_token: Option<String>,
    pub slack_channel_id: Option<String>,
    pub slack_upload_url: String,
    /// Raw frame size of the camera we expect to be watching the room.
    pub camera_raw_size: FrameSize,
    /// Number of device indices probed when looking for that camera.
    pub camera_count: u32,
    pub snapshot_path: PathBuf,
    pub capture_root: PathBuf,
    pub sound_dir: PathBuf,
    pub alert_image: Option<PathBuf>,
    /// Where each frame is written for viewing; `null` turns the preview off.
    pub preview_path: Option<PathBuf>,
    pub poll_interval_ms: u64,
    pub http_timeout_secs: u64,
    pub retry: RetryPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            classifier_url: "http://localhost:5000/predict".to_string(),
            slack_webhook_url: None,
            slack_user_id: None,
            slack_token: None,
            slack_channel_id: None,
            slack_upload_url: "https://slack.com/api/files.upload".to_string(),
            camera_raw_size: FrameSize {
                width: 1280,
                height: 720,
            },
            camera_count: 2,
            snapshot_path: PathBuf::from("now.jpg"),
            capture_root: PathBuf::from("captured"),
            sound_dir: PathBuf::from("material/sound"),
            alert_image: Some(PathBuf::from("material/images/obeya_keihou.png")),
            preview_path: Some(PathBuf::from("preview.jpg")),
            poll_interval_ms: 0,
            http_timeout_secs: 10,
            retry: RetryPolicy::default(),
        }
    }
}

impl Settings {
    /// Loads settings from `path`, falling back to defaults when the file does not exist,
    /// then applies environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let mut settings = match std::fs::read_to_string(path) {
            Ok(content) => {
                let settings: Settings = serde_json::from_str(&content)
                    .with_context(|| format!("failed to parse config {}", path.display()))?;
                info!("Loaded config from {}", path.display());
                settings
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No config file at {}, using defaults", path.display());
                Settings::default()
            }
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read config {}", path.display()))
            }
        };
        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Environment values win over the file. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        if let Some(v) = get("SLACK_WEB_HOOK_URL") {
            self.slack_webhook_url = Some(v);
        }
        if let Some(v) = get("SLACK_USER_ID") {
            self.slack_user_id = Some(v);
        }
        if let Some(v) = get("SLACK_TOKEN") {
            self.slack_token = Some(v);
        }
        if let Some(v) = get("SLACK_CHANNEL_ID") {
            self.slack_channel_id = Some(v);
        }
    }

    pub fn validate(&self, alert_mode: bool, sound: bool) -> std::result::Result<(), MonitorError> {
        if self.camera_count == 0 {
            return Err(MonitorError::Config("camera_count must be at least 1".into()));
        }
        if alert_mode && self.slack_webhook_url.is_none() {
            return Err(MonitorError::Config(
                "alert mode needs a Slack webhook URL (slack_webhook_url or SLACK_WEB_HOOK_URL)".into(),
            ));
        }
        if sound && !self.sound_dir.is_dir() {
            return Err(MonitorError::MissingSoundAssets(self.sound_dir.clone()));
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.http_timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(settings.camera_count, 2);
        assert_eq!(settings.classifier_url, "http://localhost:5000/predict");
    }

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"camera_raw_size": {{"width": 640, "height": 480}}, "camera_count": 4,
                "retry": {{"attempts": 5}}}}"#
        )
        .unwrap();
        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.camera_raw_size, FrameSize { width: 640, height: 480 });
        assert_eq!(settings.camera_count, 4);
        assert_eq!(settings.retry.attempts, 5);
        assert_eq!(settings.retry.base_delay_ms, 500);
    }

    #[test]
    fn frames_are_previewed_by_default() {
        let settings = Settings::default();
        assert_eq!(settings.preview_path.as_deref(), Some(Path::new("preview.jpg")));
    }

    #[test]
    fn broken_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(Settings::load(file.path()).is_err());
    }

    #[test]
    fn environment_wins_over_file() {
        let env: HashMap<&str, &str> = [
            ("SLACK_WEB_HOOK_URL", "https://hooks.example/abc"),
            ("SLACK_TOKEN", ""),
        ]
        .into_iter()
        .collect();
        let mut settings = Settings {
            slack_token: Some("from-file".into()),
            ..Settings::default()
        };
        settings.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(settings.slack_webhook_url.as_deref(), Some("https://hooks.example/abc"));
        assert_eq!(settings.slack_token.as_deref(), Some("from-file"));
    }

    #[test]
    fn alert_mode_requires_webhook() {
        let settings = Settings::default();
        assert!(matches!(
            settings.validate(true, false),
            Err(MonitorError::Config(_))
        ));
        assert!(settings.validate(false, false).is_ok());
    }

    #[test]
    fn sound_requires_existing_folder() {
        let settings = Settings {
            sound_dir: PathBuf::from("/definitely/not/here"),
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(false, true),
            Err(MonitorError::MissingSoundAssets(_))
        ));
    }
}
