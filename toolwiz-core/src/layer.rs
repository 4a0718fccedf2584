//! Layer trait for wrapping provider adapters.
//!
//! A layer wraps an inner adapter and returns a new adapter with added
//! behavior (logging, timeouts). Layered adapters implement
//! [`TextGeneration`](crate::provider::TextGeneration) and/or
//! [`ImageGeneration`](crate::provider::ImageGeneration) whenever the wrapped
//! adapter does, so one layer serves both pipelines.

/// Layer trait for wrapping adapters.
pub trait Layer<P> {
    /// The type of the layered adapter
    type Layered;

    /// Wrap the inner adapter with this layer
    fn layer(&self, inner: P) -> Self::Layered;
}
