//! Logging layer for adapter operations.

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use toolwiz_core::error::GenError;
use toolwiz_core::layer::Layer;
use toolwiz_core::provider::{Device, ImageGeneration, TextGeneration};
use toolwiz_core::session::Credential;
use toolwiz_core::types::*;

/// Logging layer that logs adapter operations.
#[derive(Debug, Clone)]
pub struct LoggingLayer {
    prefix: String,
}

impl LoggingLayer {
    /// Create a new logging layer
    pub fn new() -> Self {
        Self {
            prefix: "[toolwiz]".to_string(),
        }
    }

    /// Create a logging layer with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for LoggingLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Layer<P> for LoggingLayer {
    type Layered = LoggingProvider<P>;

    fn layer(&self, inner: P) -> Self::Layered {
        LoggingProvider {
            inner,
            prefix: self.prefix.clone(),
        }
    }
}

/// Adapter wrapped with logging
#[derive(Debug)]
pub struct LoggingProvider<P> {
    inner: P,
    prefix: String,
}

impl<P> LoggingProvider<P> {
    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait]
impl<P: TextGeneration> TextGeneration for LoggingProvider<P> {
    fn info(&self) -> Arc<ProviderInfo> {
        self.inner.info()
    }

    fn default_sampling(&self) -> TextSampling {
        self.inner.default_sampling()
    }

    fn is_ready(&self) -> bool {
        self.inner.is_ready()
    }

    async fn load(&self, device: Device) -> Result<(), GenError> {
        tracing::debug!("{} load request: device={}", self.prefix, device);

        let start = std::time::Instant::now();
        let result = self.inner.load(device).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(()) => tracing::debug!(
                "{} load success: device={}, elapsed={:?}",
                self.prefix,
                device,
                elapsed
            ),
            Err(e) => tracing::warn!(
                "{} load error: device={}, {}, elapsed={:?}",
                self.prefix,
                device,
                e,
                elapsed
            ),
        }

        result
    }

    async fn generate_text(&self, payload: TextPayload) -> Result<RawText, GenError> {
        tracing::debug!(
            "{} generate_text request: kind={:?}, prompt_chars={}, max_new_tokens={}",
            self.prefix,
            payload.kind,
            payload.prompt.chars().count(),
            payload.sampling.max_new_tokens
        );

        let start = std::time::Instant::now();
        let result = self.inner.generate_text(payload).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(raw) => {
                tracing::debug!(
                    "{} generate_text success: model={}, chars={}, truncated={}, elapsed={:?}",
                    self.prefix,
                    raw.model,
                    raw.text.chars().count(),
                    raw.truncated,
                    elapsed
                );
            }
            Err(e) => {
                tracing::error!(
                    "{} generate_text error: {:?}, elapsed={:?}",
                    self.prefix,
                    e,
                    elapsed
                );
            }
        }

        result
    }
}

#[async_trait]
impl<P: ImageGeneration> ImageGeneration for LoggingProvider<P> {
    fn info(&self) -> Arc<ProviderInfo> {
        self.inner.info()
    }

    fn size_presets(&self) -> Vec<ImageSize> {
        self.inner.size_presets()
    }

    fn default_sampling(&self) -> ImageSampling {
        self.inner.default_sampling()
    }

    async fn generate_image(
        &self,
        payload: ImagePayload,
        credential: &Credential,
    ) -> Result<RawImage, GenError> {
        tracing::debug!(
            "{} generate_image request: style={}, size={}, steps={}",
            self.prefix,
            payload.style,
            payload.size,
            payload.sampling.steps
        );

        let start = std::time::Instant::now();
        let result = self.inner.generate_image(payload, credential).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(raw) => {
                tracing::debug!(
                    "{} generate_image success: id={:?}, cost={:?}, elapsed={:?}",
                    self.prefix,
                    raw.image_id,
                    raw.cost,
                    elapsed
                );
            }
            Err(e) => {
                tracing::error!(
                    "{} generate_image error: {:?}, elapsed={:?}",
                    self.prefix,
                    e,
                    elapsed
                );
            }
        }

        result
    }
}
