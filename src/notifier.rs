//! Slack notifications: incoming-webhook messages and `files.upload`.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use log::info;
use reqwest::multipart;
use serde::{Deserialize, Serialize};

use crate::error::NotifyError;
use crate::retry::RetryPolicy;

pub const ALARM_USERNAME: &str = "!!!! 汚部屋 警報 !!!!";

#[async_trait]
pub trait Notify {
    async fn notify(&self, text: &str, mention: bool) -> Result<(), NotifyError>;
    async fn upload(&self, path: &Path) -> Result<(), NotifyError>;
}

#[derive(Debug, Serialize)]
struct WebhookMessage<'a> {
    text: String,
    username: &'a str,
    link_names: u8,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SlackCredentials {
    pub webhook_url: Option<String>,
    pub user_id: Option<String>,
    pub token: Option<String>,
    pub channel_id: Option<String>,
}

pub struct SlackNotifier {
    client: reqwest::Client,
    credentials: SlackCredentials,
    upload_url: String,
    retry: RetryPolicy,
}

impl SlackNotifier {
    pub fn new(
        credentials: SlackCredentials,
        upload_url: impl Into<String>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> crate::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            credentials,
            upload_url: upload_url.into(),
            retry,
        })
    }

    fn message_text(&self, text: &str, mention: bool) -> String {
        match (&self.credentials.user_id, mention) {
            (Some(user_id), true) => format!("<{}>{}", user_id, text),
            _ => text.to_string(),
        }
    }

    async fn post_message(&self, url: &str, text: &str, mention: bool) -> Result<(), NotifyError> {
        let message = WebhookMessage {
            text: self.message_text(text, mention),
            username: ALARM_USERNAME,
            link_names: 1,
        };
        let response = self.client.post(url).json(&message).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    async fn post_file(&self, token: &str, channel: &str, path: &Path) -> Result<(), NotifyError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| NotifyError::Attachment {
                path: path.to_path_buf(),
                source,
            })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "snapshot".to_string());
        let form = multipart::Form::new().part("file", multipart::Part::bytes(bytes).file_name(file_name));

        let response = self
            .client
            .post(&self.upload_url)
            .query(&[("token", token), ("channels", channel)])
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let reply: UploadResponse =
            serde_json::from_str(&body).map_err(|e| NotifyError::Rejected(e.to_string()))?;
        if !reply.ok {
            return Err(NotifyError::Rejected(
                reply.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Notify for SlackNotifier {
    async fn notify(&self, text: &str, mention: bool) -> Result<(), NotifyError> {
        let url = self
            .credentials
            .webhook_url
            .as_deref()
            .ok_or(NotifyError::NotConfigured)?;
        self.retry
            .run("slack notification", || self.post_message(url, text, mention))
            .await?;
        info!("Completed to notify to slack.");
        Ok(())
    }

    async fn upload(&self, path: &Path) -> Result<(), NotifyError> {
        let (token, channel) = match (&self.credentials.token, &self.credentials.channel_id) {
            (Some(token), Some(channel)) => (token.as_str(), channel.as_str()),
            _ => return Err(NotifyError::NotConfigured),
        };
        self.retry
            .run("slack upload", || self.post_file(token, channel, path))
            .await?;
        info!("Uploaded {} to slack.", path.display());
        Ok(())
    }
}
