//! Post-processing of raw provider responses.

use crate::error::GenError;
use crate::types::*;

/// Trailing fragments shorter than this (in characters) are treated as a
/// truncated sentence and dropped.
pub const MIN_TRAILING_FRAGMENT: usize = 10;

const SALUTATION: &str = "Dear [Recipient],";
const CLOSING: &str = "Best regards,\n[Your Name]";
const SALUTATION_TOKENS: [&str; 2] = ["dear", "hello"];
const CLOSING_TOKENS: [&str; 2] = ["sincerely", "best regards"];

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

/// Drop a short dangling fragment after the last sentence terminator.
///
/// Text without any terminator is returned trimmed but otherwise unchanged.
pub fn drop_trailing_fragment(text: &str) -> String {
    let text = text.trim();
    let Some((idx, c)) = text.char_indices().rev().find(|&(_, c)| is_terminator(c)) else {
        return text.to_string();
    };

    let end = idx + c.len_utf8();
    let fragment = text[end..].trim();
    if fragment.is_empty() || fragment.chars().count() >= MIN_TRAILING_FRAGMENT {
        return text.to_string();
    }
    text[..end].trim_end().to_string()
}

/// Add a salutation and a closing block unless already present
pub fn format_email(text: &str) -> String {
    let mut out = text.to_string();
    let lower = text.to_lowercase();
    if !SALUTATION_TOKENS.iter().any(|t| lower.contains(t)) {
        out = format!("{}\n\n{}", SALUTATION, out);
    }
    if !CLOSING_TOKENS.iter().any(|t| lower.contains(t)) {
        out = format!("{}\n\n{}", out, CLOSING);
    }
    out
}

/// Collapse text into paragraphs separated by one blank line
pub fn format_paragraphs(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Clean raw generated text for the given content kind.
///
/// Applying `clean` to its own output returns the same text.
pub fn clean(text: &str, kind: Option<TextKind>) -> String {
    match kind {
        Some(TextKind::Email) => format_email(&drop_trailing_fragment(text)),
        // Fragment length is measured on the line-trimmed text
        Some(TextKind::Blog) | Some(TextKind::Article) => {
            drop_trailing_fragment(&format_paragraphs(text))
        }
        _ => drop_trailing_fragment(text),
    }
}

/// Normalize a raw text response
pub fn normalize_text(raw: RawText, kind: Option<TextKind>) -> Result<TextBlob, GenError> {
    if raw.text.trim().is_empty() {
        return Err(GenError::rejected("Backend returned empty text"));
    }
    Ok(TextBlob {
        text: clean(&raw.text, kind),
        kind,
        truncated: raw.truncated,
        model: raw.model,
    })
}

/// Resolve the backend's image reference.
///
/// Pixel data is never inspected or transformed.
pub fn normalize_image(raw: RawImage, payload: &ImagePayload) -> Result<ImageOutput, GenError> {
    let image = resolve_image_ref(&raw)?;
    Ok(ImageOutput {
        image,
        prompt: payload.prompt.clone(),
        style: payload.style,
        size: payload.size,
        image_id: raw.image_id,
        model: raw.model,
    })
}

fn resolve_image_ref(raw: &RawImage) -> Result<ImageRef, GenError> {
    if let Some(url) = raw.url.as_deref().filter(|u| !u.is_empty()) {
        // data:image/png;base64,<payload>
        if let Some(rest) = url.strip_prefix("data:") {
            if let Some((meta, data)) = rest.split_once(',') {
                if let Some(mime) = meta.strip_suffix(";base64") {
                    return Ok(ImageRef::Inline {
                        mime: mime.to_string(),
                        base64: data.to_string(),
                    });
                }
            }
        }
        return Ok(ImageRef::Url {
            url: url.to_string(),
        });
    }

    if let Some(data) = raw.base64.as_deref().filter(|d| !d.is_empty()) {
        return Ok(ImageRef::Inline {
            mime: raw.mime.clone().unwrap_or_else(|| "image/jpeg".to_string()),
            base64: data.to_string(),
        });
    }

    Err(GenError::rejected("Backend returned no image reference"))
}
