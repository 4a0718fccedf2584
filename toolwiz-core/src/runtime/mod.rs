//! Request orchestration.
//!
//! The orchestrator sits between the caller-facing entry point
//! (`submit_generation`) and the provider adapters. For every request it:
//! - Validates the prompt
//! - Checks the session state (bootstrapping the text runtime on first use)
//! - Substitutes placeholder output when the text runtime is degraded
//! - Renders the payload and invokes the adapter
//! - Normalizes the raw response into a terminal [`GenerationResult`](crate::types::GenerationResult)

pub mod executor;
pub mod fallback;

pub use executor::{
    ImagePipeline, ImagePipelineBuilder, Orchestrator, OrchestratorBuilder, OrchestratorPhase,
    TextPipeline, TextPipelineBuilder,
};
