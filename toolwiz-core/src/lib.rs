//! # Toolwiz Core
//!
//! Core abstractions and orchestration for text and image generation.
//!
//! This crate provides the adapter traits, the per-provider session
//! lifecycle, prompt rendering, response normalization and the
//! [`Orchestrator`] that ties them together.

pub mod config;
pub mod error;
pub mod layer;
pub mod normalize;
pub mod prompt;
pub mod provider;
pub mod runtime;
pub mod session;
pub mod storage;
pub mod types;

// Re-exports
pub use config::{ImageConfig, TextConfig, ToolwizConfig};
pub use error::{ErrorKind, GenError};
pub use layer::Layer;
pub use provider::{Device, ImageGeneration, TextGeneration};
pub use runtime::{
    ImagePipeline, ImagePipelineBuilder, Orchestrator, OrchestratorBuilder, OrchestratorPhase,
    TextPipeline, TextPipelineBuilder,
};
pub use session::{Credential, SessionManager};
pub use storage::{CredentialStore, FileStore, MemoryStore};
pub use tokio_util::sync::CancellationToken;
pub use types::*;

/// Result type alias for generation operations
pub type Result<T> = std::result::Result<T, GenError>;
