//! # Toolwiz Providers
//!
//! Concrete adapters for the text and image capabilities.

pub mod openai;
pub mod runware;

// Re-exports
pub use openai::{OpenAiTextBuilder, OpenAiTextRuntime};
pub use runware::{RunwareBuilder, RunwareImageProvider};

use toolwiz_core::error::GenError;

/// Create a text runtime for a local OpenAI-compatible server
///
/// # Example
///
/// ```ignore
/// use toolwiz_provider::local_text;
///
/// let runtime = local_text("http://localhost:8080/v1", "gpt2")?;
/// ```
pub fn local_text(
    api_base: impl Into<String>,
    model: impl Into<String>,
) -> Result<OpenAiTextRuntime, GenError> {
    OpenAiTextRuntime::builder()
        .api_base(api_base)
        .model(model)
        .build_with_id("local-text", "Local text runtime")
}
