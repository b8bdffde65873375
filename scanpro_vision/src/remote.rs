//! Client for the classification service (`POST` multipart `file`).

use std::path::Path;
use std::time::Duration;

use reqwest::blocking::{Client, multipart};
use scanpro_core::{ClassificationResult, ClassifyError, Classifier, ServiceResponse};

#[derive(Debug, Clone)]
pub struct HttpClassifier {
    endpoint: String,
    client: Client,
}

impl HttpClassifier {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ClassifyError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClassifyError::Transport(format!("http client: {e}")))?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Classifier for HttpClassifier {
    fn classify(&self, image: &Path) -> Result<ClassificationResult, ClassifyError> {
        let bytes = std::fs::read(image)
            .map_err(|e| ClassifyError::ImageDecode(format!("{}: {e}", image.display())))?;
        let file_name = image
            .file_name()
            .map_or_else(|| "heatmap.png".to_owned(), |n| n.to_string_lossy().into_owned());
        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("image/png")
            .map_err(|e| ClassifyError::Transport(format!("multipart: {e}")))?;
        let form = multipart::Form::new().part("file", part);

        let resp = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .map_err(|e| ClassifyError::Transport(format!("POST {}: {e}", self.endpoint)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(ClassifyError::Transport(format!(
                "classification service error (HTTP {status}): {body}"
            )));
        }

        let parsed: ServiceResponse = resp
            .json()
            .map_err(|e| ClassifyError::Transport(format!("bad service response: {e}")))?;
        tracing::debug!(
            endpoint = %self.endpoint,
            object = %parsed.heuristic.object,
            threat = parsed.heuristic.threat_score,
            "remote classification"
        );
        Ok(parsed.heuristic)
    }
}
