//! Core types for generation requests and results.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ErrorKind, GenError};

/// Text content kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextKind {
    Article,
    Blog,
    Email,
    Essay,
    Story,
    Summary,
    ProductDescription,
    SocialMedia,
}

impl TextKind {
    pub const ALL: [TextKind; 8] = [
        TextKind::Article,
        TextKind::Blog,
        TextKind::Email,
        TextKind::Essay,
        TextKind::Story,
        TextKind::Summary,
        TextKind::ProductDescription,
        TextKind::SocialMedia,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TextKind::Article => "article",
            TextKind::Blog => "blog",
            TextKind::Email => "email",
            TextKind::Essay => "essay",
            TextKind::Story => "story",
            TextKind::Summary => "summary",
            TextKind::ProductDescription => "product-description",
            TextKind::SocialMedia => "social-media",
        }
    }
}

impl fmt::Display for TextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TextKind {
    type Err = GenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TextKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| GenError::configuration(format!("Unknown text kind: {}", s)))
    }
}

/// Image style
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageStyle {
    #[default]
    Realistic,
    Artistic,
    Cartoon,
    Anime,
    OilPainting,
    Watercolor,
    DigitalArt,
    Fantasy,
}

impl ImageStyle {
    pub const ALL: [ImageStyle; 8] = [
        ImageStyle::Realistic,
        ImageStyle::Artistic,
        ImageStyle::Cartoon,
        ImageStyle::Anime,
        ImageStyle::OilPainting,
        ImageStyle::Watercolor,
        ImageStyle::DigitalArt,
        ImageStyle::Fantasy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageStyle::Realistic => "realistic",
            ImageStyle::Artistic => "artistic",
            ImageStyle::Cartoon => "cartoon",
            ImageStyle::Anime => "anime",
            ImageStyle::OilPainting => "oil-painting",
            ImageStyle::Watercolor => "watercolor",
            ImageStyle::DigitalArt => "digital-art",
            ImageStyle::Fantasy => "fantasy",
        }
    }
}

impl fmt::Display for ImageStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageStyle {
    type Err = GenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ImageStyle::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| GenError::configuration(format!("Unknown image style: {}", s)))
    }
}

/// Output image dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub const SMALL: ImageSize = ImageSize::new(256, 256);
    pub const MEDIUM: ImageSize = ImageSize::new(512, 512);
    pub const LARGE: ImageSize = ImageSize::new(1024, 1024);
    pub const HD: ImageSize = ImageSize::new(1920, 1080);

    /// Resolution presets offered to callers
    pub const PRESETS: [ImageSize; 4] = [Self::SMALL, Self::MEDIUM, Self::LARGE, Self::HD];

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for ImageSize {
    fn default() -> Self {
        Self::MEDIUM
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for ImageSize {
    type Err = GenError;

    /// Parse `"WIDTHxHEIGHT"`, e.g. `"1024x1024"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || GenError::configuration(format!("Invalid image size: {}", s));
        let (w, h) = s.split_once(['x', 'X']).ok_or_else(invalid)?;
        let width: u32 = w.trim().parse().map_err(|_| invalid())?;
        let height: u32 = h.trim().parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Self { width, height })
    }
}

/// Sampling parameters for text generation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextSampling {
    /// Maximum number of new tokens (1 - 4096)
    pub max_new_tokens: u32,
    /// Temperature (0.0 - 2.0)
    pub temperature: f32,
    /// Top-p sampling (0.0 - 1.0)
    pub top_p: f32,
    /// Repetition penalty (1.0 - 2.0)
    pub repetition_penalty: f32,
}

impl Default for TextSampling {
    fn default() -> Self {
        Self {
            max_new_tokens: 200,
            temperature: 0.7,
            top_p: 0.9,
            repetition_penalty: 1.1,
        }
    }
}

impl TextSampling {
    /// Clamp every value into the accepted range.
    ///
    /// Non-finite values fall back to the default for that field.
    pub fn clamped(&self) -> Self {
        let d = Self::default();
        Self {
            max_new_tokens: self.max_new_tokens.clamp(1, 4096),
            temperature: clamp_f32(self.temperature, 0.0, 2.0, d.temperature),
            top_p: clamp_f32(self.top_p, 0.0, 1.0, d.top_p),
            repetition_penalty: clamp_f32(self.repetition_penalty, 1.0, 2.0, d.repetition_penalty),
        }
    }
}

/// Sampling parameters for image generation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSampling {
    /// Classifier-free guidance scale (1.0 - 20.0)
    pub guidance_scale: f32,
    /// Strength (0.0 - 1.0)
    pub strength: f32,
    /// Inference steps (1 - 100)
    pub steps: u32,
}

impl Default for ImageSampling {
    fn default() -> Self {
        Self {
            guidance_scale: 7.5,
            strength: 0.8,
            steps: 28,
        }
    }
}

impl ImageSampling {
    /// Clamp every value into the accepted range.
    pub fn clamped(&self) -> Self {
        let d = Self::default();
        Self {
            guidance_scale: clamp_f32(self.guidance_scale, 1.0, 20.0, d.guidance_scale),
            strength: clamp_f32(self.strength, 0.0, 1.0, d.strength),
            steps: self.steps.clamp(1, 100),
        }
    }
}

fn clamp_f32(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

/// Parse an optional kind/style selector, mapping unknown values to `None`
fn lenient_selector<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| match value.parse::<T>() {
        Ok(selector) => Some(selector),
        Err(_) => {
            tracing::debug!("Unknown selector {:?}, using the default", value);
            None
        }
    }))
}

/// Text generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRequest {
    pub prompt: String,
    /// `None` renders the generic prompt prefix and skips kind formatting.
    /// Unrecognized kinds deserialize as `None`.
    #[serde(
        default,
        deserialize_with = "lenient_selector",
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<TextKind>,
    /// `None` uses the adapter's declared defaults
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampling: Option<TextSampling>,
}

impl TextRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            kind: None,
            sampling: None,
        }
    }

    /// Set content kind
    pub fn with_kind(mut self, kind: TextKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Set sampling parameters
    pub fn with_sampling(mut self, sampling: TextSampling) -> Self {
        self.sampling = Some(sampling);
        self
    }

    /// Set max new tokens
    pub fn with_max_new_tokens(mut self, max_new_tokens: u32) -> Self {
        self.sampling.get_or_insert_with(TextSampling::default).max_new_tokens = max_new_tokens;
        self
    }

    /// Set temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.sampling.get_or_insert_with(TextSampling::default).temperature = temperature;
        self
    }
}

/// Image generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRequest {
    pub prompt: String,
    /// Defaults to [`ImageStyle::Realistic`]; unrecognized styles deserialize as `None`
    #[serde(
        default,
        deserialize_with = "lenient_selector",
        skip_serializing_if = "Option::is_none"
    )]
    pub style: Option<ImageStyle>,
    /// Defaults to [`ImageSize::MEDIUM`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<ImageSize>,
    /// `None` uses the adapter's declared defaults
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampling: Option<ImageSampling>,
}

impl ImageRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            style: None,
            size: None,
            sampling: None,
        }
    }

    /// Set style
    pub fn with_style(mut self, style: ImageStyle) -> Self {
        self.style = Some(style);
        self
    }

    /// Set output size
    pub fn with_size(mut self, size: ImageSize) -> Self {
        self.size = Some(size);
        self
    }

    /// Set sampling parameters
    pub fn with_sampling(mut self, sampling: ImageSampling) -> Self {
        self.sampling = Some(sampling);
        self
    }
}

/// Input to the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "pipeline", rename_all = "snake_case")]
pub enum GenerationRequest {
    Text(TextRequest),
    Image(ImageRequest),
}

impl From<TextRequest> for GenerationRequest {
    fn from(req: TextRequest) -> Self {
        Self::Text(req)
    }
}

impl From<ImageRequest> for GenerationRequest {
    fn from(req: ImageRequest) -> Self {
        Self::Image(req)
    }
}

/// Rendered text payload handed to a text adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextPayload {
    /// Instruction prefix plus the user's prompt
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<TextKind>,
    pub sampling: TextSampling,
}

/// Rendered image payload handed to an image adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagePayload {
    /// User prompt with the style suffix appended
    pub prompt: String,
    pub style: ImageStyle,
    pub size: ImageSize,
    pub sampling: ImageSampling,
}

/// Raw text returned by a text adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawText {
    pub text: String,
    /// Generation stopped on the token limit
    pub truncated: bool,
    pub model: String,
}

/// Raw image returned by an image adapter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawImage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
    /// Monetary cost as reported by the backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    pub model: String,
}

/// Reference to a generated image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImageRef {
    Url { url: String },
    Inline { mime: String, base64: String },
}

/// Normalized text output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlob {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<TextKind>,
    pub truncated: bool,
    pub model: String,
}

/// Normalized image output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageOutput {
    pub image: ImageRef,
    /// The rendered prompt sent to the backend
    pub prompt: String,
    pub style: ImageStyle,
    pub size: ImageSize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
    pub model: String,
}

/// Successful output payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    Text(TextBlob),
    Image(ImageOutput),
}

/// Terminal outcome of one generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GenerationResult {
    Success {
        request_id: String,
        payload: Payload,
        #[serde(skip_serializing_if = "Option::is_none")]
        cost: Option<f64>,
        /// Placeholder output produced without a backend call
        degraded: bool,
    },
    Failure {
        request_id: String,
        kind: ErrorKind,
        message: String,
    },
}

impl GenerationResult {
    /// Build a failure result from an error
    pub fn failure(request_id: impl Into<String>, error: &GenError) -> Self {
        Self::Failure {
            request_id: request_id.into(),
            kind: error.kind(),
            message: error.to_string(),
        }
    }

    pub fn request_id(&self) -> &str {
        match self {
            GenerationResult::Success { request_id, .. } => request_id,
            GenerationResult::Failure { request_id, .. } => request_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, GenerationResult::Success { .. })
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, GenerationResult::Success { degraded: true, .. })
    }

    /// Failure kind, if this is a failure
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            GenerationResult::Failure { kind, .. } => Some(*kind),
            GenerationResult::Success { .. } => None,
        }
    }

    pub fn payload(&self) -> Option<&Payload> {
        match self {
            GenerationResult::Success { payload, .. } => Some(payload),
            GenerationResult::Failure { .. } => None,
        }
    }

    /// Generated text, if this is a successful text result
    pub fn text(&self) -> Option<&str> {
        match self.payload() {
            Some(Payload::Text(blob)) => Some(&blob.text),
            _ => None,
        }
    }

    /// Generated image, if this is a successful image result
    pub fn image(&self) -> Option<&ImageOutput> {
        match self.payload() {
            Some(Payload::Image(output)) => Some(output),
            _ => None,
        }
    }
}

/// Provider availability lifecycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderState {
    #[default]
    Uninitialized,
    Initializing,
    Ready,
    /// Bootstrap failed on every path; sticky for the session
    Degraded,
}

impl fmt::Display for ProviderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProviderState::Uninitialized => "uninitialized",
            ProviderState::Initializing => "initializing",
            ProviderState::Ready => "ready",
            ProviderState::Degraded => "degraded",
        };
        f.write_str(s)
    }
}

/// Provider information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInfo {
    pub id: String,
    pub name: String,
    /// Model identifier sent to the backend
    pub model: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in TextKind::ALL {
            assert_eq!(kind.as_str().parse::<TextKind>().unwrap(), kind);
        }
        for style in ImageStyle::ALL {
            assert_eq!(style.as_str().parse::<ImageStyle>().unwrap(), style);
        }
        assert!("poem".parse::<TextKind>().is_err());
    }

    #[test]
    fn test_kind_serde_matches_as_str() {
        let json = serde_json::to_string(&TextKind::ProductDescription).unwrap();
        assert_eq!(json, "\"product-description\"");
        let style: ImageStyle = serde_json::from_str("\"oil-painting\"").unwrap();
        assert_eq!(style, ImageStyle::OilPainting);
    }

    #[test]
    fn test_image_size_parse() {
        assert_eq!("1920x1080".parse::<ImageSize>().unwrap(), ImageSize::HD);
        assert_eq!(ImageSize::default().to_string(), "512x512");
        assert!("512".parse::<ImageSize>().is_err());
        assert!("0x512".parse::<ImageSize>().is_err());
    }

    #[test]
    fn test_sampling_clamped() {
        let sampling = TextSampling {
            max_new_tokens: 0,
            temperature: 5.0,
            top_p: f32::NAN,
            repetition_penalty: 0.5,
        }
        .clamped();
        assert_eq!(sampling.max_new_tokens, 1);
        assert_eq!(sampling.temperature, 2.0);
        assert_eq!(sampling.top_p, 0.9);
        assert_eq!(sampling.repetition_penalty, 1.0);

        let defaults = ImageSampling::default();
        assert_eq!(defaults.clamped(), defaults);
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let req: GenerationRequest =
            serde_json::from_str(r#"{"pipeline":"text","prompt":"hi","kind":"email"}"#).unwrap();
        match req {
            GenerationRequest::Text(text) => {
                assert_eq!(text.kind, Some(TextKind::Email));
                assert_eq!(text.sampling, None);
            }
            GenerationRequest::Image(_) => panic!("expected text request"),
        }
    }

    #[test]
    fn test_unknown_selectors_fall_back() {
        let req: GenerationRequest =
            serde_json::from_str(r#"{"pipeline":"text","prompt":"hi","kind":"poem"}"#).unwrap();
        let GenerationRequest::Text(text) = req else {
            panic!("expected text request");
        };
        assert_eq!(text.kind, None);
        let payload = crate::prompt::build_text(&text.prompt, text.kind, TextSampling::default());
        assert_eq!(payload.prompt, "Write about: hi\n\n");

        let req: GenerationRequest = serde_json::from_str(
            r#"{"pipeline":"image","prompt":"a fox","style":"pointillism","size":{"width":256,"height":256}}"#,
        )
        .unwrap();
        let GenerationRequest::Image(image) = req else {
            panic!("expected image request");
        };
        assert_eq!(image.style, None);
        assert_eq!(image.size, Some(ImageSize::SMALL));

        let explicit_null: TextRequest =
            serde_json::from_str(r#"{"prompt":"hi","kind":null}"#).unwrap();
        assert_eq!(explicit_null.kind, None);
    }
}
