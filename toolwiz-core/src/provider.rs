//! Provider adapter traits, one per backend capability.

use crate::error::GenError;
use crate::session::Credential;
use crate::types::*;
use async_trait::async_trait;
use std::fmt::{self, Debug};
use std::sync::Arc;

/// Code path used to load a local model runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Device {
    /// Preferred hardware-accelerated path
    Accelerated,
    /// Baseline path that works everywhere
    Baseline,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Accelerated => f.write_str("accelerated"),
            Device::Baseline => f.write_str("baseline"),
        }
    }
}

/// Text generation capability.
///
/// Backends that need a bootstrap step (a local model runtime) override
/// [`load`](TextGeneration::load) and [`is_ready`](TextGeneration::is_ready);
/// remote backends can keep the defaults.
#[async_trait]
pub trait TextGeneration: Send + Sync + Debug + 'static {
    /// Get provider information
    fn info(&self) -> Arc<ProviderInfo>;

    /// Sampling parameters used when the caller does not override them
    fn default_sampling(&self) -> TextSampling {
        TextSampling::default()
    }

    /// Whether the backend can serve [`generate_text`](TextGeneration::generate_text)
    fn is_ready(&self) -> bool {
        true
    }

    /// Load the backend on the given code path.
    async fn load(&self, _device: Device) -> Result<(), GenError> {
        Ok(())
    }

    /// Generate text for a rendered payload.
    ///
    /// Must fail with [`GenError::NotInitialized`] when called before the
    /// backend is ready.
    async fn generate_text(&self, payload: TextPayload) -> Result<RawText, GenError>;
}

/// Image generation capability
#[async_trait]
pub trait ImageGeneration: Send + Sync + Debug + 'static {
    /// Get provider information
    fn info(&self) -> Arc<ProviderInfo>;

    /// Resolution presets the backend accepts
    fn size_presets(&self) -> Vec<ImageSize> {
        ImageSize::PRESETS.to_vec()
    }

    /// Sampling parameters used when the caller does not override them
    fn default_sampling(&self) -> ImageSampling {
        ImageSampling::default()
    }

    /// Generate one image for a rendered payload.
    ///
    /// The returned `cost` is passed through from the backend unmodified.
    async fn generate_image(
        &self,
        payload: ImagePayload,
        credential: &Credential,
    ) -> Result<RawImage, GenError>;
}

#[async_trait]
impl<T: TextGeneration + ?Sized> TextGeneration for Arc<T> {
    fn info(&self) -> Arc<ProviderInfo> {
        (**self).info()
    }

    fn default_sampling(&self) -> TextSampling {
        (**self).default_sampling()
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    async fn load(&self, device: Device) -> Result<(), GenError> {
        (**self).load(device).await
    }

    async fn generate_text(&self, payload: TextPayload) -> Result<RawText, GenError> {
        (**self).generate_text(payload).await
    }
}

#[async_trait]
impl<T: ImageGeneration + ?Sized> ImageGeneration for Arc<T> {
    fn info(&self) -> Arc<ProviderInfo> {
        (**self).info()
    }

    fn size_presets(&self) -> Vec<ImageSize> {
        (**self).size_presets()
    }

    fn default_sampling(&self) -> ImageSampling {
        (**self).default_sampling()
    }

    async fn generate_image(
        &self,
        payload: ImagePayload,
        credential: &Credential,
    ) -> Result<RawImage, GenError> {
        (**self).generate_image(payload, credential).await
    }
}
