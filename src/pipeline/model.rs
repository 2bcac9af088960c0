//! Model invocation: turn a batch's prompt parts into one vision chat call.
//!
//! This module is intentionally thin — all prompt engineering lives in
//! [`crate::prompts`] and all reply handling in [`crate::pipeline::parse`],
//! so the invocation mechanics can change without touching either.
//!
//! ## Failure policy
//!
//! There is no retry and no backoff: a model invocation failure is fatal and
//! kills the whole run. That is a deliberate simplicity/cost trade-off — a
//! hardened deployment would wrap [`ExtractionModel`] in a retrying
//! decorator, and this seam is exactly where it would go.
//!
//! ## Determinism
//!
//! Temperature is pinned to 0.0: extraction must be faithful to what is on
//! the page, and re-running the same batch should produce the same grouping.

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::prompts::PromptPart;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::sync::Arc;
use tracing::debug;

/// Deterministic sampling for extraction.
const EXTRACTION_TEMPERATURE: f32 = 0.0;

/// Multimodal model collaborator: one call per batch, free-form text reply.
#[async_trait]
pub trait ExtractionModel: Send + Sync {
    /// Invoke the model with the batch's ordered content parts.
    ///
    /// `pages` is a human-readable label for the batch (e.g. "4-6"), used
    /// only in error reporting.
    async fn extract(&self, pages: &str, parts: &[PromptPart]) -> Result<String, ExtractError>;
}

/// [`ExtractionModel`] backed by an edgequake-llm vision provider.
///
/// The provider API takes a single user turn with a text body and an ordered
/// image list, so the part sequence is flattened: text parts (instructions
/// and page markers) are joined in order into the message body, and images
/// are attached base64-encoded in the same order. The markers still name
/// each page, so the model can line up attachment N with page N.
pub struct VisionModel {
    provider: Arc<dyn LLMProvider>,
    max_tokens: usize,
}

impl VisionModel {
    pub fn new(provider: Arc<dyn LLMProvider>, max_tokens: usize) -> Self {
        Self {
            provider,
            max_tokens,
        }
    }

    /// Build a `VisionModel` from the configuration's provider chain.
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ExtractError> {
        let provider = resolve_provider(config)?;
        Ok(Self::new(provider, config.max_tokens))
    }
}

#[async_trait]
impl ExtractionModel for VisionModel {
    async fn extract(&self, pages: &str, parts: &[PromptPart]) -> Result<String, ExtractError> {
        let (text, images) = flatten_parts(parts);
        debug!(
            pages,
            images = images.len(),
            text_chars = text.len(),
            "invoking extraction model"
        );

        let messages = vec![ChatMessage::user_with_images(&text, images)];
        let options = CompletionOptions {
            temperature: Some(EXTRACTION_TEMPERATURE),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| ExtractError::ModelInvocation {
                pages: pages.to_string(),
                detail: format!("{e}"),
            })?;

        debug!(
            pages,
            input_tokens = response.prompt_tokens,
            output_tokens = response.completion_tokens,
            "model reply received"
        );

        Ok(response.content)
    }
}

/// Flatten the ordered part sequence into (message text, attached images).
fn flatten_parts(parts: &[PromptPart]) -> (String, Vec<ImageData>) {
    let mut text_parts: Vec<&str> = Vec::new();
    let mut images = Vec::new();

    for part in parts {
        match part {
            PromptPart::Text(t) => text_parts.push(t),
            PromptPart::Image(img) => {
                let b64 = STANDARD.encode(&img.bytes);
                images.push(ImageData::new(b64, img.media_type).with_detail("high"));
            }
        }
    }

    (text_parts.join("\n\n"), images)
}

/// Resolve the model provider, from most-specific to least-specific:
///
/// 1. **Pre-built provider** (`config.provider`) — used as-is; the hook for
///    tests and callers with custom middleware.
/// 2. **Named provider + model** (`config.provider_name`) — the factory
///    reads the matching API key from the environment.
/// 3. **Auto-detection** — the factory scans known API key variables and
///    picks the first available provider.
fn resolve_provider(config: &ExtractionConfig) -> Result<Arc<dyn LLMProvider>, ExtractError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or("gpt-4.1-nano");
        return ProviderFactory::create_llm_provider(name, model).map_err(|e| {
            ExtractError::ProviderNotConfigured {
                provider: name.clone(),
                hint: format!("{e}"),
            }
        });
    }

    let (provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ExtractError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No model provider could be auto-detected from the environment.\n\
                 Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                 Error: {e}"
            ),
        })?;

    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::render::PageImage;

    fn image(page: u32, bytes: Vec<u8>) -> PageImage {
        PageImage {
            page,
            bytes,
            media_type: "image/jpeg",
        }
    }

    #[test]
    fn flatten_preserves_text_and_image_order() {
        let parts = vec![
            PromptPart::Text("INSTRUCTIONS".into()),
            PromptPart::Text("--- Image for Page 4 ---".into()),
            PromptPart::Image(image(4, vec![1, 2, 3])),
            PromptPart::Text("--- Image for Page 5 ---".into()),
            PromptPart::Image(image(5, vec![9, 8])),
        ];

        let (text, images) = flatten_parts(&parts);
        assert!(text.starts_with("INSTRUCTIONS"));
        let p4 = text.find("Page 4").unwrap();
        let p5 = text.find("Page 5").unwrap();
        assert!(p4 < p5);

        assert_eq!(images.len(), 2);
        assert_eq!(images[0].data, STANDARD.encode([1u8, 2, 3]));
        assert_eq!(images[1].data, STANDARD.encode([9u8, 8]));
        assert_eq!(images[0].mime_type, "image/jpeg");
    }

    #[test]
    fn flatten_with_no_images() {
        let parts = vec![PromptPart::Text("only text".into())];
        let (text, images) = flatten_parts(&parts);
        assert_eq!(text, "only text");
        assert!(images.is_empty());
    }
}
