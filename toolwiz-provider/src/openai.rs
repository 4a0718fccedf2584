//! OpenAI-compatible text runtime using the async-openai crate.
//!
//! The runtime talks to a completion server (a local inference server that
//! speaks the OpenAI protocol). Two endpoints may be configured: an
//! accelerated one that is tried first on bootstrap and a baseline one used
//! as the fallback. Whichever endpoint loads successfully serves every later
//! request.

use arc_swap::ArcSwapOption;
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{CompletionFinishReason, CreateCompletionRequest, CreateCompletionRequestArgs};
use async_openai::Client;
use async_trait::async_trait;
use std::sync::Arc;
use toolwiz_core::config::TextConfig;
use toolwiz_core::error::GenError;
use toolwiz_core::provider::{Device, TextGeneration};
use toolwiz_core::types::*;

/// Text runtime backed by an OpenAI-compatible completion endpoint
pub struct OpenAiTextRuntime {
    baseline: Client<OpenAIConfig>,
    accelerated: Option<Client<OpenAIConfig>>,
    active: ArcSwapOption<Client<OpenAIConfig>>,
    model: String,
    sampling: TextSampling,
    info: Arc<ProviderInfo>,
}

impl std::fmt::Debug for OpenAiTextRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiTextRuntime")
            .field("info", &self.info)
            .field("has_accelerated", &self.accelerated.is_some())
            .field("ready", &self.is_ready())
            .finish()
    }
}

impl OpenAiTextRuntime {
    /// Create a builder for configuration options
    pub fn builder() -> OpenAiTextBuilder {
        OpenAiTextBuilder::default()
    }

    /// Build a runtime from the `[text]` configuration section
    pub fn from_config(config: &TextConfig) -> Result<Self, GenError> {
        let mut builder = Self::builder()
            .api_base(&config.base_url)
            .model(&config.model)
            .sampling(config.sampling);
        if let Some(url) = &config.accelerated_url {
            builder = builder.accelerated_base(url);
        }
        if let Some(key) = &config.api_key {
            builder = builder.api_key(key);
        }
        builder.build()
    }

    fn endpoint(&self, device: Device) -> Result<&Client<OpenAIConfig>, GenError> {
        match device {
            Device::Accelerated => self
                .accelerated
                .as_ref()
                .ok_or_else(|| GenError::not_initialized("No accelerated endpoint configured")),
            Device::Baseline => Ok(&self.baseline),
        }
    }

    /// Build CreateCompletionRequest from a rendered payload
    fn build_request(&self, payload: &TextPayload) -> Result<CreateCompletionRequest, GenError> {
        let sampling = payload.sampling;
        let mut builder = CreateCompletionRequestArgs::default();
        builder
            .model(&self.model)
            .prompt(payload.prompt.clone())
            .max_tokens(sampling.max_new_tokens)
            .temperature(sampling.temperature)
            .top_p(sampling.top_p)
            .frequency_penalty(frequency_penalty(sampling.repetition_penalty))
            .n(1u8);

        builder
            .build()
            .map_err(|e| GenError::configuration(format!("Failed to build request: {}", e)))
    }
}

/// Map a multiplicative repetition penalty (1.0 = off) onto the additive
/// OpenAI frequency penalty (0.0 = off).
fn frequency_penalty(repetition_penalty: f32) -> f32 {
    (repetition_penalty - 1.0).clamp(0.0, 2.0)
}

/// Classify an async-openai error
fn map_openai_error(err: OpenAIError) -> GenError {
    match err {
        OpenAIError::Reqwest(e) => GenError::transport(format!("OpenAI request failed: {}", e)),
        OpenAIError::ApiError(api) => {
            let message = api.message.to_lowercase();
            let is_auth = api.r#type.as_deref() == Some("authentication_error")
                || message.contains("api key")
                || message.contains("unauthorized");
            if is_auth {
                GenError::invalid_credential(api.message)
            } else {
                GenError::rejected(format!("OpenAI API error: {}", api.message))
            }
        }
        OpenAIError::JSONDeserialize(e, _) => {
            GenError::rejected(format!("Malformed OpenAI response: {}", e))
        }
        other => GenError::rejected(format!("OpenAI error: {}", other)),
    }
}

#[async_trait]
impl TextGeneration for OpenAiTextRuntime {
    fn info(&self) -> Arc<ProviderInfo> {
        self.info.clone()
    }

    fn default_sampling(&self) -> TextSampling {
        self.sampling
    }

    fn is_ready(&self) -> bool {
        self.active.load().is_some()
    }

    async fn load(&self, device: Device) -> Result<(), GenError> {
        let client = self.endpoint(device)?;
        tracing::debug!("Probing {} endpoint for model {}", device, self.model);

        client
            .models()
            .retrieve(&self.model)
            .await
            .map_err(|e| match map_openai_error(e) {
                GenError::InvalidCredential(msg) => GenError::InvalidCredential(msg),
                other => GenError::not_initialized(format!("{} endpoint unavailable: {}", device, other)),
            })?;

        self.active.store(Some(Arc::new(client.clone())));
        tracing::info!("Text model {} loaded on {} endpoint", self.model, device);
        Ok(())
    }

    async fn generate_text(&self, payload: TextPayload) -> Result<RawText, GenError> {
        let client = self
            .active
            .load_full()
            .ok_or_else(|| GenError::not_initialized("Text model is not loaded"))?;

        let request = self.build_request(&payload)?;
        let response = client
            .completions()
            .create(request)
            .await
            .map_err(map_openai_error)?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GenError::rejected("Completion response has no choices"))?;

        Ok(RawText {
            text: choice.text,
            truncated: matches!(choice.finish_reason, Some(CompletionFinishReason::Length)),
            model: response.model,
        })
    }
}

/// Builder for the text runtime
#[derive(Default)]
pub struct OpenAiTextBuilder {
    api_key: Option<String>,
    api_base: Option<String>,
    accelerated_base: Option<String>,
    model: Option<String>,
    sampling: Option<TextSampling>,
}

impl OpenAiTextBuilder {
    /// Set API key (local servers usually accept any value)
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the baseline endpoint
    pub fn api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }

    /// Set the accelerated endpoint, tried before the baseline on bootstrap
    pub fn accelerated_base(mut self, api_base: impl Into<String>) -> Self {
        self.accelerated_base = Some(api_base.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Default sampling used when a request carries none
    pub fn sampling(mut self, sampling: TextSampling) -> Self {
        self.sampling = Some(sampling);
        self
    }

    /// Build the runtime
    pub fn build(self) -> Result<OpenAiTextRuntime, GenError> {
        self.build_with_id("openai-text", "OpenAI-compatible text runtime")
    }

    /// Build a runtime with a custom provider ID and name
    pub fn build_with_id(
        self,
        provider_id: impl Into<String>,
        provider_name: impl Into<String>,
    ) -> Result<OpenAiTextRuntime, GenError> {
        let api_base = self
            .api_base
            .ok_or_else(|| GenError::configuration("Text endpoint is required"))?;
        let model = self
            .model
            .ok_or_else(|| GenError::configuration("Text model is required"))?;
        let api_key = self.api_key.unwrap_or_default();

        let client_for = |base: String| {
            Client::with_config(
                OpenAIConfig::new()
                    .with_api_key(api_key.clone())
                    .with_api_base(base),
            )
        };

        Ok(OpenAiTextRuntime {
            baseline: client_for(api_base),
            accelerated: self.accelerated_base.map(client_for),
            active: ArcSwapOption::empty(),
            model: model.clone(),
            sampling: self.sampling.unwrap_or_default(),
            info: Arc::new(ProviderInfo {
                id: provider_id.into(),
                name: provider_name.into(),
                model,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_openai::error::ApiError;
    use toolwiz_core::error::ErrorKind;
    use toolwiz_core::prompt;

    fn runtime() -> OpenAiTextRuntime {
        OpenAiTextRuntime::builder()
            .api_base("http://127.0.0.1:9/v1")
            .model("gpt2")
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_requires_endpoint_and_model() {
        let err = OpenAiTextRuntime::builder().model("gpt2").build().unwrap_err();
        assert!(matches!(err, GenError::Configuration(_)));

        let err = OpenAiTextRuntime::builder()
            .api_base("http://localhost:8080/v1")
            .build()
            .unwrap_err();
        assert!(matches!(err, GenError::Configuration(_)));
    }

    #[test]
    fn test_from_config_uses_config_sampling() {
        let mut config = TextConfig::default();
        config.sampling.temperature = 1.3;
        let runtime = OpenAiTextRuntime::from_config(&config).unwrap();
        assert_eq!(runtime.default_sampling().temperature, 1.3);
        assert_eq!(runtime.info().model, "gpt2");
        assert!(!runtime.is_ready());
    }

    #[test]
    fn test_request_maps_sampling() {
        let runtime = runtime();
        let payload = prompt::build_text("tea", Some(TextKind::Blog), TextSampling::default());
        let request = runtime.build_request(&payload).unwrap();

        assert_eq!(request.model, "gpt2");
        assert_eq!(request.max_tokens, Some(200));
        assert_eq!(request.temperature, Some(0.7));
        assert_eq!(request.top_p, Some(0.9));
        let penalty = request.frequency_penalty.unwrap();
        assert!((penalty - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_frequency_penalty_range() {
        assert_eq!(frequency_penalty(1.0), 0.0);
        assert_eq!(frequency_penalty(0.5), 0.0);
        assert!((frequency_penalty(2.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_error_classification() {
        let auth = OpenAIError::ApiError(ApiError {
            message: "Incorrect API key provided".to_string(),
            r#type: Some("invalid_request_error".to_string()),
            param: None,
            code: None,
        });
        assert_eq!(map_openai_error(auth).kind(), ErrorKind::InvalidCredential);

        let rejected = OpenAIError::ApiError(ApiError {
            message: "prompt too long".to_string(),
            r#type: Some("invalid_request_error".to_string()),
            param: None,
            code: None,
        });
        assert_eq!(map_openai_error(rejected).kind(), ErrorKind::ProviderRejected);

        let invalid = OpenAIError::InvalidArgument("bad".to_string());
        assert_eq!(map_openai_error(invalid).kind(), ErrorKind::ProviderRejected);
    }

    #[tokio::test]
    async fn test_generate_before_load_fails_fast() {
        let runtime = runtime();
        let payload = prompt::build_text("tea", None, TextSampling::default());
        let err = runtime.generate_text(payload).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotInitialized);
    }

    #[tokio::test]
    async fn test_accelerated_load_without_endpoint() {
        let err = runtime().load(Device::Accelerated).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotInitialized);
    }
}
