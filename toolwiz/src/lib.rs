//! # Toolwiz
//!
//! Orchestration for text and image generation requests.
//!
//! Toolwiz accepts a prompt plus content options, renders it into a
//! backend-specific payload, gates the call on the provider's session state
//! and normalizes the response into a single [`GenerationResult`].
//!
//! ## Features
//!
//! - **One entry point**: every request ends in exactly one `Success` or `Failure`
//! - **Explicit sessions**: credentials and runtime bootstrap live in owned [`SessionManager`]s
//! - **Degraded mode**: a text runtime that cannot load yields labeled placeholder output
//! - **Composable layers**: wrap adapters with logging and timeouts
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! toolwiz = { version = "0.1", features = ["openai", "layers"] }
//! ```
//!
//! ```ignore
//! use toolwiz::prelude::*;
//!
//! # async fn example() -> Result<()> {
//! let config = ToolwizConfig::load(None)?;
//! let orchestrator = toolwiz::from_config(&config)?;
//!
//! orchestrator.configure_image("runware-api-key").await?;
//! let result = orchestrator
//!     .submit_generation(
//!         ImageRequest::new("a sunset over the ocean")
//!             .with_style(ImageStyle::Watercolor)
//!             .into(),
//!     )
//!     .await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `default`: Includes `openai` and `layers`
//! - `openai`: OpenAI-compatible text runtime and Runware image provider
//! - `providers`: All available providers
//! - `layers`: Built-in layers (logging, timeouts)
//! - `full`: All features enabled

// Re-export core types and traits
pub use toolwiz_core::*;

// Re-export providers under `provider` module
#[cfg(feature = "toolwiz-provider")]
pub mod provider {
    //! Concrete adapters.
    pub use toolwiz_provider::*;
}

// Re-export layers under `layers` module
#[cfg(feature = "toolwiz-layer")]
pub mod layers {
    //! Built-in adapter layers.
    pub use toolwiz_layer::*;
}

/// Wire an orchestrator from configuration.
///
/// Both adapters are wrapped in the timeout and logging layers. The image
/// session persists its credential in the configured credential file; the
/// text session is process-local.
#[cfg(all(feature = "toolwiz-provider", feature = "toolwiz-layer"))]
pub fn from_config(config: &ToolwizConfig) -> Result<Orchestrator> {
    use std::sync::Arc;
    use toolwiz_layer::{LoggingLayer, TimeoutLayer};
    use toolwiz_provider::{OpenAiTextRuntime, RunwareImageProvider};

    let timeout = TimeoutLayer::new(config.timeout());

    let text = TextPipeline::builder(OpenAiTextRuntime::from_config(&config.text)?)
        .layer(timeout.clone())
        .layer(LoggingLayer::with_prefix("[toolwiz:text]"))
        .finish();

    let image_provider = RunwareImageProvider::from_config(&config.image)?;
    let store: Arc<dyn CredentialStore> = Arc::new(config.credential_store()?);
    let session = Arc::new(SessionManager::new(image_provider.info().id.clone(), store));
    let image = ImagePipeline::builder(image_provider)
        .session(session)
        .layer(timeout)
        .layer(LoggingLayer::with_prefix("[toolwiz:image]"))
        .finish();

    tracing::debug!(
        "Wired orchestrator: text={}, image={}",
        config.text.base_url,
        config.image.url
    );

    Ok(Orchestrator::builder().text(text).image(image).finish())
}

/// Prelude module for convenient imports
pub mod prelude {
    //! Prelude module containing the most commonly used types and traits.
    //!
    //! ```
    //! use toolwiz::prelude::*;
    //! ```

    pub use crate::{
        CancellationToken, ErrorKind, GenError, GenerationRequest, GenerationResult,
        ImageGeneration, ImagePipeline, ImageRequest, ImageSize, ImageStyle, Layer, Orchestrator,
        Payload, ProviderState, Result, SessionManager, TextGeneration, TextKind, TextPipeline,
        TextRequest, ToolwizConfig,
    };

    #[cfg(feature = "toolwiz-provider")]
    pub use crate::provider::*;

    #[cfg(feature = "toolwiz-layer")]
    pub use crate::layers::*;
}
