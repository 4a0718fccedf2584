//! Orchestrator implementation.
//!
//! This module implements the [`Orchestrator`], the sole entry point for
//! generation requests. It owns one optional pipeline per capability, each
//! pairing an adapter with the [`SessionManager`] that gates it.

use crate::error::{ErrorKind, GenError};
use crate::layer::Layer;
use crate::normalize;
use crate::prompt;
use crate::provider::{ImageGeneration, TextGeneration};
use crate::runtime::fallback::placeholder_text;
use crate::session::SessionManager;
use crate::types::*;
use std::future::Future;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Type-erased text adapter that can be shared across threads
type BoxedText = Arc<dyn TextGeneration>;

/// Type-erased image adapter that can be shared across threads
type BoxedImage = Arc<dyn ImageGeneration>;

/// Per-request lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OrchestratorPhase {
    Idle = 0,
    Validating = 1,
    Invoking = 2,
    Normalizing = 3,
}

impl OrchestratorPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => OrchestratorPhase::Validating,
            2 => OrchestratorPhase::Invoking,
            3 => OrchestratorPhase::Normalizing,
            _ => OrchestratorPhase::Idle,
        }
    }
}

/// Leaves the in-flight count when dropped, including when the request
/// future itself is dropped. The last request out returns the orchestrator
/// to `Idle`.
struct PhaseGuard<'a> {
    phase: &'a AtomicU8,
    active: &'a AtomicUsize,
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        if self.active.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.phase
                .store(OrchestratorPhase::Idle as u8, Ordering::Release);
        }
    }
}

/// Text adapter plus the session that tracks its runtime bootstrap
#[derive(Debug)]
pub struct TextPipeline {
    provider: BoxedText,
    session: Arc<SessionManager>,
}

impl TextPipeline {
    /// Create a new builder
    pub fn builder<P: TextGeneration>(provider: P) -> TextPipelineBuilder<P> {
        TextPipelineBuilder {
            provider,
            session: None,
        }
    }

    pub fn provider(&self) -> &BoxedText {
        &self.provider
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }
}

/// Builder for composing a text adapter with layers.
///
/// Each call to [`layer`](TextPipelineBuilder::layer) wraps the previous
/// adapter in a new concrete type; type erasure happens once in `finish`.
pub struct TextPipelineBuilder<P> {
    provider: P,
    session: Option<Arc<SessionManager>>,
}

impl<P> TextPipelineBuilder<P> {
    /// Add a layer to wrap the adapter
    pub fn layer<L>(self, layer: L) -> TextPipelineBuilder<L::Layered>
    where
        L: Layer<P>,
    {
        TextPipelineBuilder {
            provider: layer.layer(self.provider),
            session: self.session,
        }
    }

    /// Use an existing session instead of a fresh in-memory one
    pub fn session(mut self, session: Arc<SessionManager>) -> Self {
        self.session = Some(session);
        self
    }
}

impl<P: TextGeneration> TextPipelineBuilder<P> {
    /// Finish building the pipeline
    pub fn finish(self) -> TextPipeline {
        let provider = self.provider;
        let session = self
            .session
            .unwrap_or_else(|| Arc::new(SessionManager::in_memory(provider.info().id.clone())));
        TextPipeline {
            provider: Arc::new(provider),
            session,
        }
    }
}

/// Image adapter plus the session that holds its credential
#[derive(Debug)]
pub struct ImagePipeline {
    provider: BoxedImage,
    session: Arc<SessionManager>,
}

impl ImagePipeline {
    /// Create a new builder
    pub fn builder<P: ImageGeneration>(provider: P) -> ImagePipelineBuilder<P> {
        ImagePipelineBuilder {
            provider,
            session: None,
        }
    }

    pub fn provider(&self) -> &BoxedImage {
        &self.provider
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }
}

/// Builder for composing an image adapter with layers.
pub struct ImagePipelineBuilder<P> {
    provider: P,
    session: Option<Arc<SessionManager>>,
}

impl<P> ImagePipelineBuilder<P> {
    /// Add a layer to wrap the adapter
    pub fn layer<L>(self, layer: L) -> ImagePipelineBuilder<L::Layered>
    where
        L: Layer<P>,
    {
        ImagePipelineBuilder {
            provider: layer.layer(self.provider),
            session: self.session,
        }
    }

    /// Use an existing session, typically one backed by a durable store
    pub fn session(mut self, session: Arc<SessionManager>) -> Self {
        self.session = Some(session);
        self
    }
}

impl<P: ImageGeneration> ImagePipelineBuilder<P> {
    /// Finish building the pipeline
    pub fn finish(self) -> ImagePipeline {
        let provider = self.provider;
        let session = self
            .session
            .unwrap_or_else(|| Arc::new(SessionManager::in_memory(provider.info().id.clone())));
        ImagePipeline {
            provider: Arc::new(provider),
            session,
        }
    }
}

/// Builder for an [`Orchestrator`]
#[derive(Debug, Default)]
pub struct OrchestratorBuilder {
    text: Option<TextPipeline>,
    image: Option<ImagePipeline>,
}

impl OrchestratorBuilder {
    /// Set the text pipeline
    pub fn text(mut self, pipeline: TextPipeline) -> Self {
        self.text = Some(pipeline);
        self
    }

    /// Set the image pipeline
    pub fn image(mut self, pipeline: ImagePipeline) -> Self {
        self.image = Some(pipeline);
        self
    }

    /// Finish building the orchestrator
    pub fn finish(self) -> Orchestrator {
        Orchestrator {
            text: self.text,
            image: self.image,
            phase: AtomicU8::new(OrchestratorPhase::Idle as u8),
            active: AtomicUsize::new(0),
        }
    }
}

/// Generation orchestrator.
///
/// Every request ends in exactly one [`GenerationResult`]; errors never
/// escape as `Err`. Nothing is retried: a failed request leaves the
/// orchestrator idle and the caller decides whether to submit again.
/// Concurrent submissions are neither queued nor deduplicated.
#[derive(Debug)]
pub struct Orchestrator {
    text: Option<TextPipeline>,
    image: Option<ImagePipeline>,
    phase: AtomicU8,
    active: AtomicUsize,
}

impl Orchestrator {
    /// Create a new builder
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    pub fn text_pipeline(&self) -> Option<&TextPipeline> {
        self.text.as_ref()
    }

    pub fn image_pipeline(&self) -> Option<&ImagePipeline> {
        self.image.as_ref()
    }

    /// Current lifecycle phase.
    ///
    /// While requests overlap this is the most recent transition of any of
    /// them; it reads `Idle` only once none is in flight.
    pub fn phase(&self) -> OrchestratorPhase {
        OrchestratorPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// Bootstrap the text runtime ahead of the first request
    pub async fn bootstrap_text(&self) -> Result<ProviderState, GenError> {
        let pipeline = self.text_or_err()?;
        pipeline.session.bootstrap(&*pipeline.provider).await
    }

    /// Configure the image credential
    pub async fn configure_image(
        &self,
        credential: impl Into<String>,
    ) -> Result<ProviderState, GenError> {
        self.image_or_err()?.session.configure(credential).await
    }

    /// Restore the image credential from durable storage
    pub async fn restore_image(&self) -> ProviderState {
        match &self.image {
            Some(pipeline) => pipeline.session.restore_from_storage().await,
            None => ProviderState::Uninitialized,
        }
    }

    /// Submit a generation request
    pub async fn submit_generation(&self, request: GenerationRequest) -> GenerationResult {
        self.submit_with_cancel(request, CancellationToken::new())
            .await
    }

    /// Submit a generation request that the host can abort.
    ///
    /// Cancelling `cancel` while the adapter call is pending yields an
    /// [`ErrorKind::Cancelled`] failure and leaves the provider state
    /// untouched. A text runtime bootstrap triggered by this request is not
    /// interrupted.
    pub async fn submit_with_cancel(
        &self,
        request: GenerationRequest,
        cancel: CancellationToken,
    ) -> GenerationResult {
        let request_id = uuid::Uuid::new_v4().to_string();
        let _idle = self.enter_phase(OrchestratorPhase::Validating);

        let outcome = match request {
            GenerationRequest::Text(req) => self.run_text(&request_id, req, &cancel).await,
            GenerationRequest::Image(req) => self.run_image(&request_id, req, &cancel).await,
        };

        match outcome {
            Ok(result) => {
                tracing::debug!(
                    "Generation {} finished: degraded={}",
                    request_id,
                    result.is_degraded()
                );
                result
            }
            Err(e) => {
                tracing::warn!("Generation {} failed ({}): {}", request_id, e.kind(), e);
                GenerationResult::failure(request_id, &e)
            }
        }
    }

    async fn run_text(
        &self,
        request_id: &str,
        req: TextRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult, GenError> {
        validate_prompt(&req.prompt)?;
        let pipeline = self.text_or_err()?;
        let session = &pipeline.session;

        if session.current_state() == ProviderState::Uninitialized {
            session
                .bootstrap(&*pipeline.provider)
                .await
                .map_err(|e| GenError::not_initialized(e.to_string()))?;
        }

        match session.current_state() {
            ProviderState::Ready => {}
            ProviderState::Degraded => {
                tracing::warn!(
                    "Text provider {} is degraded, returning placeholder for {}",
                    session.provider(),
                    request_id
                );
                return Ok(GenerationResult::Success {
                    request_id: request_id.to_string(),
                    payload: Payload::Text(placeholder_text(&req.prompt, req.kind)),
                    cost: None,
                    degraded: true,
                });
            }
            state => {
                return Err(GenError::not_initialized(format!(
                    "Text provider {} is {}",
                    session.provider(),
                    state
                )));
            }
        }

        let requested = req
            .sampling
            .unwrap_or_else(|| pipeline.provider.default_sampling());
        let sampling = requested.clamped();
        if sampling != requested {
            tracing::warn!(
                "Clamped text sampling parameters for {}: {:?} -> {:?}",
                request_id,
                requested,
                sampling
            );
        }
        let payload = prompt::build_text(&req.prompt, req.kind, sampling);

        self.set_phase(OrchestratorPhase::Invoking);
        let raw = invoke(cancel, pipeline.provider.generate_text(payload)).await?;

        self.set_phase(OrchestratorPhase::Normalizing);
        let blob = normalize::normalize_text(raw, req.kind)?;

        Ok(GenerationResult::Success {
            request_id: request_id.to_string(),
            payload: Payload::Text(blob),
            cost: None,
            degraded: false,
        })
    }

    async fn run_image(
        &self,
        request_id: &str,
        req: ImageRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult, GenError> {
        validate_prompt(&req.prompt)?;
        let pipeline = self.image_or_err()?;
        let session = &pipeline.session;

        let credential = match (session.current_state(), session.credential()) {
            (ProviderState::Ready, Some(credential)) => credential,
            (state, _) => {
                return Err(GenError::not_configured(format!(
                    "Image provider {} has no usable credential ({})",
                    session.provider(),
                    state
                )));
            }
        };

        let requested = req
            .sampling
            .unwrap_or_else(|| pipeline.provider.default_sampling());
        let sampling = requested.clamped();
        if sampling != requested {
            tracing::warn!(
                "Clamped image sampling parameters for {}: {:?} -> {:?}",
                request_id,
                requested,
                sampling
            );
        }

        let size = req.size.unwrap_or_default();
        if !pipeline.provider.size_presets().contains(&size) {
            tracing::debug!("Requested non-preset image size {} for {}", size, request_id);
        }
        let payload = prompt::build_image(&req.prompt, req.style, Some(size), sampling);

        self.set_phase(OrchestratorPhase::Invoking);
        let raw = invoke(
            cancel,
            pipeline.provider.generate_image(payload.clone(), &credential),
        )
        .await
        .map_err(|e| {
            if e.kind() == ErrorKind::InvalidCredential {
                session.invalidate(&credential);
            }
            e
        })?;

        self.set_phase(OrchestratorPhase::Normalizing);
        let cost = raw.cost;
        let output = normalize::normalize_image(raw, &payload).map_err(|e| {
            if let Some(cost) = cost {
                tracing::warn!(
                    "Discarding billed image result for {} (cost {}): {}",
                    request_id,
                    cost,
                    e
                );
            }
            e
        })?;

        Ok(GenerationResult::Success {
            request_id: request_id.to_string(),
            payload: Payload::Image(output),
            cost,
            degraded: false,
        })
    }

    fn text_or_err(&self) -> Result<&TextPipeline, GenError> {
        self.text
            .as_ref()
            .ok_or_else(|| GenError::not_configured("No text pipeline configured"))
    }

    fn image_or_err(&self) -> Result<&ImagePipeline, GenError> {
        self.image
            .as_ref()
            .ok_or_else(|| GenError::not_configured("No image pipeline configured"))
    }

    fn enter_phase(&self, phase: OrchestratorPhase) -> PhaseGuard<'_> {
        self.active.fetch_add(1, Ordering::AcqRel);
        self.set_phase(phase);
        PhaseGuard {
            phase: &self.phase,
            active: &self.active,
        }
    }

    fn set_phase(&self, phase: OrchestratorPhase) {
        self.phase.store(phase as u8, Ordering::Release);
    }
}

/// Race an adapter call against the host's cancellation token
async fn invoke<T>(
    cancel: &CancellationToken,
    call: impl Future<Output = Result<T, GenError>>,
) -> Result<T, GenError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(GenError::Cancelled),
        result = call => result,
    }
}

fn validate_prompt(prompt: &str) -> Result<(), GenError> {
    if prompt.trim().is_empty() {
        return Err(GenError::EmptyPrompt);
    }
    Ok(())
}
