//! Placeholder output for degraded mode.

use crate::types::{TextBlob, TextKind};

/// Model name reported on placeholder output
pub const PLACEHOLDER_MODEL: &str = "degraded-placeholder";

/// Label that opens every placeholder text
pub const PLACEHOLDER_LABEL: &str = "[Degraded mode]";

/// Build the clearly-labeled placeholder returned instead of model output
pub fn placeholder_text(prompt: &str, kind: Option<TextKind>) -> TextBlob {
    let kind_name = kind.map(|k| k.as_str()).unwrap_or("text");
    let text = format!(
        "{label} The text model could not be initialized, so this is placeholder content \
         rather than a generated {kind}.\n\n\
         Your prompt: \"{prompt}\"\n\n\
         Once the model is available, the {kind} will be generated from this prompt and \
         tailored to the selected content type.",
        label = PLACEHOLDER_LABEL,
        kind = kind_name,
        prompt = prompt.trim(),
    );

    TextBlob {
        text,
        kind,
        truncated: false,
        model: PLACEHOLDER_MODEL.to_string(),
    }
}
