use std::path::PathBuf;

use thiserror::Error;

/// Fatal conditions that end a monitoring run.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("failed to capture: no camera among {probed} device(s) produced {width}x{height} frames")]
    CameraNotFound { probed: u32, width: u32, height: u32 },

    #[error("camera error: {0}")]
    Camera(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("sound folder not found: {}. The sound files are not redistributable; place your own files there", .0.display())]
    MissingSoundAssets(PathBuf),

    #[error(transparent)]
    Classification(#[from] ClassificationError),
}

#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("classifier request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("classifier returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed classifier response: {0}")]
    Malformed(String),

    #[error("classifier reported an unsuccessful prediction")]
    Unsuccessful,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("chat request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("chat endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("chat API rejected the request: {0}")]
    Rejected(String),

    #[error("failed to read {}: {source}", path.display())]
    Attachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("chat notifications are not configured")]
    NotConfigured,
}

/// Whether retrying the same request may succeed.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

fn transient_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

fn transient_transport(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

impl Transient for ClassificationError {
    fn is_transient(&self) -> bool {
        match self {
            ClassificationError::Transport(e) => transient_transport(e),
            ClassificationError::Status { status, .. } => transient_status(*status),
            ClassificationError::Malformed(_) | ClassificationError::Unsuccessful => false,
        }
    }
}

impl Transient for NotifyError {
    fn is_transient(&self) -> bool {
        match self {
            NotifyError::Transport(e) => transient_transport(e),
            NotifyError::Status { status, .. } => transient_status(*status),
            _ => false,
        }
    }
}
