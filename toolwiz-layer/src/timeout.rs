//! Timeout layer bounding each adapter invocation.
//!
//! An elapsed deadline is reported as a transport failure. The call is not
//! retried.

use async_trait::async_trait;
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use toolwiz_core::error::GenError;
use toolwiz_core::layer::Layer;
use toolwiz_core::provider::{Device, ImageGeneration, TextGeneration};
use toolwiz_core::session::Credential;
use toolwiz_core::types::*;

/// Timeout layer configuration
#[derive(Debug, Clone)]
pub struct TimeoutLayer {
    generate: Duration,
    load: Option<Duration>,
}

impl TimeoutLayer {
    /// Bound generation calls by `generate`; model loads are unbounded
    pub fn new(generate: Duration) -> Self {
        Self {
            generate,
            load: None,
        }
    }

    /// Also bound model loads
    pub fn with_load_timeout(mut self, load: Duration) -> Self {
        self.load = Some(load);
        self
    }
}

impl Default for TimeoutLayer {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

impl<P> Layer<P> for TimeoutLayer {
    type Layered = TimeoutProvider<P>;

    fn layer(&self, inner: P) -> Self::Layered {
        TimeoutProvider {
            inner,
            config: self.clone(),
        }
    }
}

/// Adapter wrapped with a deadline
#[derive(Debug)]
pub struct TimeoutProvider<P> {
    inner: P,
    config: TimeoutLayer,
}

async fn bounded<T, Fut>(limit: Duration, operation: &str, fut: Fut) -> Result<T, GenError>
where
    Fut: Future<Output = Result<T, GenError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!("{} timed out after {:?}", operation, limit);
            Err(GenError::transport(format!(
                "{} timed out after {:?}",
                operation, limit
            )))
        }
    }
}

#[async_trait]
impl<P: TextGeneration> TextGeneration for TimeoutProvider<P> {
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
        match self.config.load {
            Some(limit) => bounded(limit, "load", self.inner.load(device)).await,
            None => self.inner.load(device).await,
        }
    }

    async fn generate_text(&self, payload: TextPayload) -> Result<RawText, GenError> {
        bounded(
            self.config.generate,
            "generate_text",
            self.inner.generate_text(payload),
        )
        .await
    }
}

#[async_trait]
impl<P: ImageGeneration> ImageGeneration for TimeoutProvider<P> {
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
        bounded(
            self.config.generate,
            "generate_image",
            self.inner.generate_image(payload, credential),
        )
        .await
    }
}
