//! Runware image inference provider.
//!
//! Each request is a single `imageInference` task POSTed as a JSON array.
//! The backend answers with either a `data` array carrying the image URL and
//! the billed cost, or an `errors` array.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use toolwiz_core::config::ImageConfig;
use toolwiz_core::error::GenError;
use toolwiz_core::provider::ImageGeneration;
use toolwiz_core::session::Credential;
use toolwiz_core::types::*;

pub const DEFAULT_RUNWARE_URL: &str = "https://api.runware.ai/v1";
pub const DEFAULT_RUNWARE_MODEL: &str = "runware:100@1";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InferenceTask<'a> {
    task_type: &'static str,
    #[serde(rename = "taskUUID")]
    task_uuid: String,
    positive_prompt: &'a str,
    width: u32,
    height: u32,
    model: &'a str,
    number_results: u32,
    output_type: &'static str,
    output_format: &'static str,
    #[serde(rename = "CFGScale")]
    cfg_scale: f32,
    steps: u32,
    strength: f32,
    include_cost: bool,
}

impl<'a> InferenceTask<'a> {
    fn new(payload: &'a ImagePayload, model: &'a str) -> Self {
        Self {
            task_type: "imageInference",
            task_uuid: uuid::Uuid::new_v4().to_string(),
            positive_prompt: &payload.prompt,
            width: payload.size.width,
            height: payload.size.height,
            model,
            number_results: 1,
            output_type: "URL",
            output_format: "JPG",
            cfg_scale: payload.sampling.guidance_scale,
            steps: payload.sampling.steps,
            strength: payload.sampling.strength,
            include_cost: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct InferenceResponse {
    #[serde(default)]
    data: Vec<InferenceData>,
    #[serde(default)]
    errors: Vec<InferenceError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InferenceData {
    #[serde(rename = "imageUUID")]
    image_uuid: Option<String>,
    #[serde(rename = "imageURL")]
    image_url: Option<String>,
    image_base64_data: Option<String>,
    cost: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct InferenceError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: String,
}

impl InferenceError {
    fn is_auth(&self) -> bool {
        self.code
            .as_deref()
            .map(|c| c.to_ascii_lowercase().contains("apikey"))
            .unwrap_or(false)
    }
}

/// Image provider for the Runware inference API
#[derive(Clone)]
pub struct RunwareImageProvider {
    client: reqwest::Client,
    api_url: String,
    model: String,
    sampling: ImageSampling,
    info: Arc<ProviderInfo>,
}

impl std::fmt::Debug for RunwareImageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunwareImageProvider")
            .field("info", &self.info)
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl RunwareImageProvider {
    /// Create a builder for configuration options
    pub fn builder() -> RunwareBuilder {
        RunwareBuilder::default()
    }

    /// Build a provider from the `[image]` configuration section
    pub fn from_config(config: &ImageConfig) -> Result<Self, GenError> {
        Self::builder()
            .api_url(&config.url)
            .model(&config.model)
            .sampling(config.sampling)
            .build()
    }
}

#[async_trait]
impl ImageGeneration for RunwareImageProvider {
    fn info(&self) -> Arc<ProviderInfo> {
        self.info.clone()
    }

    fn default_sampling(&self) -> ImageSampling {
        self.sampling
    }

    async fn generate_image(
        &self,
        payload: ImagePayload,
        credential: &Credential,
    ) -> Result<RawImage, GenError> {
        let task = InferenceTask::new(&payload, &self.model);
        tracing::debug!(
            "Submitting Runware task {} ({}, {} steps)",
            task.task_uuid,
            payload.size,
            task.steps
        );

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(credential.value())
            .json(&[task])
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        let raw = parse_response(status, &body, &self.model)?;
        if let Some(cost) = raw.cost {
            tracing::debug!("Runware charged {} for image {:?}", cost, raw.image_id);
        }
        Ok(raw)
    }
}

/// Interpret a Runware HTTP response
fn parse_response(status: u16, body: &str, model: &str) -> Result<RawImage, GenError> {
    let parsed: Option<InferenceResponse> = serde_json::from_str(body).ok();
    let first_error = parsed.as_ref().and_then(|r| r.errors.first());

    if matches!(status, 401 | 403) || first_error.map(InferenceError::is_auth).unwrap_or(false) {
        let message = first_error
            .map(|e| e.message.clone())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("Runware rejected the API key (HTTP {})", status));
        return Err(GenError::invalid_credential(message));
    }

    if let Some(error) = first_error {
        return Err(GenError::rejected(format!(
            "Runware error {}: {}",
            error.code.as_deref().unwrap_or("unknown"),
            error.message
        )));
    }

    if !(200..300).contains(&status) {
        return Err(GenError::rejected(format!("Runware returned HTTP {}", status)));
    }

    let response = parsed.ok_or_else(|| GenError::rejected("Malformed Runware response"))?;
    let data = response
        .data
        .into_iter()
        .next()
        .ok_or_else(|| GenError::rejected("Runware response contains no images"))?;

    Ok(RawImage {
        image_id: data.image_uuid,
        url: data.image_url,
        base64: data.image_base64_data,
        mime: None,
        cost: data.cost,
        model: model.to_string(),
    })
}

/// Builder for the Runware provider
#[derive(Default)]
pub struct RunwareBuilder {
    api_url: Option<String>,
    model: Option<String>,
    sampling: Option<ImageSampling>,
    timeout: Option<Duration>,
}

impl RunwareBuilder {
    pub fn api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = Some(api_url.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Default sampling used when a request carries none
    pub fn sampling(mut self, sampling: ImageSampling) -> Self {
        self.sampling = Some(sampling);
        self
    }

    /// HTTP-level timeout; a timed-out request fails with `Transport`
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the provider
    pub fn build(self) -> Result<RunwareImageProvider, GenError> {
        let mut client = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            client = client.timeout(timeout);
        }
        let client = client
            .build()
            .map_err(|e| GenError::configuration(format!("Failed to build HTTP client: {}", e)))?;

        let model = self
            .model
            .unwrap_or_else(|| DEFAULT_RUNWARE_MODEL.to_string());

        Ok(RunwareImageProvider {
            client,
            api_url: self
                .api_url
                .unwrap_or_else(|| DEFAULT_RUNWARE_URL.to_string()),
            model: model.clone(),
            sampling: self.sampling.unwrap_or_default(),
            info: Arc::new(ProviderInfo {
                id: "runware".to_string(),
                name: "Runware".to_string(),
                model,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolwiz_core::error::ErrorKind;
    use toolwiz_core::prompt;

    #[test]
    fn test_task_serialization() {
        let payload = prompt::build_image(
            "a lighthouse",
            Some(ImageStyle::OilPainting),
            Some(ImageSize::LARGE),
            ImageSampling::default(),
        );
        let task = InferenceTask::new(&payload, DEFAULT_RUNWARE_MODEL);
        let json = serde_json::to_value([task]).unwrap();
        let task = &json[0];

        assert_eq!(task["taskType"], "imageInference");
        assert_eq!(task["positivePrompt"], payload.prompt.as_str());
        assert_eq!(task["width"], 1024);
        assert_eq!(task["height"], 1024);
        assert_eq!(task["model"], DEFAULT_RUNWARE_MODEL);
        assert_eq!(task["numberResults"], 1);
        assert_eq!(task["outputType"], "URL");
        assert_eq!(task["CFGScale"], 7.5);
        assert_eq!(task["steps"], 28);
        assert_eq!(task["includeCost"], true);
        assert!(task["taskUUID"].as_str().unwrap().len() >= 32);
    }

    #[test]
    fn test_parse_success_keeps_cost() {
        let body = r#"{"data":[{"taskType":"imageInference","imageUUID":"u-1","imageURL":"https://im.runware.ai/u-1.jpg","cost":0.0019}]}"#;
        let raw = parse_response(200, body, "m").unwrap();
        assert_eq!(raw.image_id.as_deref(), Some("u-1"));
        assert_eq!(raw.url.as_deref(), Some("https://im.runware.ai/u-1.jpg"));
        assert_eq!(raw.cost, Some(0.0019));
    }

    #[test]
    fn test_parse_auth_failures() {
        let err = parse_response(401, "unauthorized", "m").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidCredential);

        let body = r#"{"errors":[{"code":"invalidApiKey","message":"Invalid API key"}]}"#;
        let err = parse_response(400, body, "m").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidCredential);
        assert!(err.to_string().contains("Invalid API key"));
    }

    #[test]
    fn test_parse_rejections() {
        let body = r#"{"errors":[{"code":"invalidPositivePrompt","message":"Prompt too short"}]}"#;
        assert_eq!(
            parse_response(400, body, "m").unwrap_err().kind(),
            ErrorKind::ProviderRejected
        );
        assert_eq!(
            parse_response(502, "<html>bad gateway</html>", "m")
                .unwrap_err()
                .kind(),
            ErrorKind::ProviderRejected
        );
        assert_eq!(
            parse_response(200, r#"{"data":[]}"#, "m").unwrap_err().kind(),
            ErrorKind::ProviderRejected
        );
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport() {
        let provider = RunwareImageProvider::builder()
            .api_url("http://127.0.0.1:9/v1")
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();
        let payload = prompt::build_image("a fox", None, None, ImageSampling::default());
        let credential = Credential::new("runware", "key");

        let err = provider
            .generate_image(payload, &credential)
            .await
            .unwrap_err();
        assert!(matches!(err, GenError::Network(_)));
        assert_eq!(err.kind(), ErrorKind::Transport);
    }
}
