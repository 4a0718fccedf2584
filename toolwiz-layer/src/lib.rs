//! # Toolwiz Layers
//!
//! Built-in adapter layers.
//!
//! Currently implemented layers:
//! - `LoggingLayer`: Logs all adapter operations with timing information
//! - `TimeoutLayer`: Bounds each invocation, reporting an elapsed deadline as a transport failure
//!
//! Both layers wrap text and image adapters alike.
//!
//! ## Usage
//!
//! ```ignore
//! use std::time::Duration;
//! use toolwiz_core::ImagePipeline;
//! use toolwiz_layer::{LoggingLayer, TimeoutLayer};
//!
//! let pipeline = ImagePipeline::builder(provider)
//!     .layer(TimeoutLayer::new(Duration::from_secs(60)))
//!     .layer(LoggingLayer::new())
//!     .finish();
//! ```

pub mod logging;
pub mod timeout;

// Re-exports
pub use logging::{LoggingLayer, LoggingProvider};
pub use timeout::{TimeoutLayer, TimeoutProvider};
