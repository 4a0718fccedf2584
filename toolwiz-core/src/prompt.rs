//! Prompt rendering.
//!
//! Turns a user prompt plus a content kind or style into the exact payload an
//! adapter sends. Rendering is pure and deterministic.

use crate::types::*;

/// Prefix used when no content kind is selected
pub const GENERIC_PREFIX: &str = "Write about:";

/// Suffix appended after the style name in image prompts
pub const IMAGE_QUALITY_SUFFIX: &str = "high quality, detailed";

/// Instruction prefix for a text content kind
pub fn instruction_prefix(kind: Option<TextKind>) -> &'static str {
    match kind {
        Some(TextKind::Article) => "Write a comprehensive article about:",
        Some(TextKind::Blog) => "Write an engaging blog post about:",
        Some(TextKind::Email) => "Write a professional email about:",
        Some(TextKind::Essay) => "Write a detailed essay about:",
        Some(TextKind::Story) => "Write a creative story about:",
        Some(TextKind::Summary) => "Write a concise summary about:",
        Some(TextKind::ProductDescription) => "Write a compelling product description for:",
        Some(TextKind::SocialMedia) => "Write an engaging social media post about:",
        None => GENERIC_PREFIX,
    }
}

/// Render a text payload: `"<prefix> <prompt>\n\n"`
pub fn build_text(prompt: &str, kind: Option<TextKind>, sampling: TextSampling) -> TextPayload {
    TextPayload {
        prompt: format!("{} {}\n\n", instruction_prefix(kind), prompt.trim()),
        kind,
        sampling,
    }
}

/// Render an image payload: `"<prompt>, <style> style, high quality, detailed"`
pub fn build_image(
    prompt: &str,
    style: Option<ImageStyle>,
    size: Option<ImageSize>,
    sampling: ImageSampling,
) -> ImagePayload {
    let style = style.unwrap_or_default();
    ImagePayload {
        prompt: format!(
            "{}, {} style, {}",
            prompt.trim(),
            style.as_str(),
            IMAGE_QUALITY_SUFFIX
        ),
        style,
        size: size.unwrap_or_default(),
        sampling,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_prefix() {
        let payload = build_text(
            "renewable energy",
            Some(TextKind::Email),
            TextSampling::default(),
        );
        assert!(payload
            .prompt
            .starts_with("Write a professional email about: renewable energy"));
        assert!(payload.prompt.ends_with("\n\n"));
    }

    #[test]
    fn test_missing_kind_uses_generic_prefix() {
        let payload = build_text("cats", None, TextSampling::default());
        assert_eq!(payload.prompt, "Write about: cats\n\n");
    }

    #[test]
    fn test_every_kind_has_specific_prefix() {
        for kind in TextKind::ALL {
            assert_ne!(instruction_prefix(Some(kind)), GENERIC_PREFIX);
        }
    }

    #[test]
    fn test_build_is_deterministic() {
        for kind in TextKind::ALL {
            let a = build_text("the moon", Some(kind), TextSampling::default());
            let b = build_text("the moon", Some(kind), TextSampling::default());
            assert_eq!(a, b);
        }
        for style in ImageStyle::ALL {
            let a = build_image("a fox", Some(style), None, ImageSampling::default());
            let b = build_image("a fox", Some(style), None, ImageSampling::default());
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_image_suffix_and_defaults() {
        let payload = build_image(
            "a sunset over the ocean",
            Some(ImageStyle::Watercolor),
            Some(ImageSize::LARGE),
            ImageSampling::default(),
        );
        assert_eq!(
            payload.prompt,
            "a sunset over the ocean, watercolor style, high quality, detailed"
        );
        assert_eq!(payload.size, ImageSize::LARGE);

        let defaults = build_image("a cat", None, None, ImageSampling::default());
        assert_eq!(defaults.style, ImageStyle::Realistic);
        assert_eq!(defaults.size, ImageSize::MEDIUM);
        assert!(defaults.prompt.contains("realistic style"));
    }
}
