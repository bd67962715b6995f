use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::multipart;
use serde::Deserialize;

use crate::error::ClassificationError;
use crate::retry::RetryPolicy;
use crate::RoomLabel;

/// One classifier verdict for a single frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub label: RoomLabel,
    pub probabilities: HashMap<RoomLabel, f64>,
}

impl ClassificationResult {
    pub fn probability(&self, label: RoomLabel) -> Option<f64> {
        self.probabilities.get(&label).copied()
    }

    pub fn messy_probability(&self) -> f64 {
        self.probability(RoomLabel::Messy).unwrap_or(0.0)
    }
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    prediction: RoomLabel,
    predictions: Vec<LabelProbability>,
    #[serde(default)]
    success: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct LabelProbability {
    label: RoomLabel,
    probability: f64,
}

/// Strictly decodes a `/predict` response body.
pub fn parse_response(body: &str) -> Result<ClassificationResult, ClassificationError> {
    let response: PredictResponse = serde_json::from_str(body)
        .map_err(|e| ClassificationError::Malformed(e.to_string()))?;

    if response.success == Some(false) {
        return Err(ClassificationError::Unsuccessful);
    }

    let mut probabilities = HashMap::with_capacity(response.predictions.len());
    for LabelProbability { label: entry_label, probability } in response.predictions {
        if !(0.0..=1.0).contains(&probability) {
            return Err(ClassificationError::Malformed(format!(
                "probability {} for {} is outside [0, 1]",
                probability, entry_label
            )));
        }
        if probabilities.insert(entry_label, probability).is_some() {
            return Err(ClassificationError::Malformed(format!(
                "duplicate probability for {}",
                entry_label
            )));
        }
    }

    if !probabilities.contains_key(&RoomLabel::Messy) {
        return Err(ClassificationError::Malformed(
            "no probability reported for messy".to_string(),
        ));
    }

    Ok(ClassificationResult {
        label: response.prediction,
        probabilities,
    })
}

#[async_trait]
pub trait Classify {
    async fn classify(&self, jpeg: &[u8]) -> Result<ClassificationResult, ClassificationError>;
}

/// Client for the remote room-state classifier.
pub struct RoomClassifier {
    client: reqwest::Client,
    endpoint: String,
    retry: RetryPolicy,
}

impl RoomClassifier {
    pub fn new(endpoint: impl Into<String>, timeout: Duration, retry: RetryPolicy) -> crate::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            retry,
        })
    }

    async fn classify_once(&self, jpeg: &[u8]) -> Result<ClassificationResult, ClassificationError> {
        let part = multipart::Part::bytes(jpeg.to_vec())
            .file_name("now.jpg")
            .mime_str("image/jpeg")?;
        let form = multipart::Form::new().part("image", part);

        let response = self.client.post(&self.endpoint).multipart(form).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClassificationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!("classifier response: {}", body.trim());
        parse_response(&body)
    }
}

#[async_trait]
impl Classify for RoomClassifier {
    async fn classify(&self, jpeg: &[u8]) -> Result<ClassificationResult, ClassificationError> {
        self.retry
            .run("classification", || self.classify_once(jpeg))
            .await
    }
}
