//! Region refinement: re-read one cropped region with a vision model.
//!
//! The refiner is handed the full page raster and one region; it crops the
//! region's bounding box, sends the crop with a fixed instruction and returns
//! the cleaned reply. It never decides what ends up on the page: a failure is
//! just an `Err` that [`crate::pipeline::reconcile`] turns into a fallback to
//! the detector's baseline text.
//!
//! Each region gets exactly one attempt, bounded by
//! [`ConversionConfig::refine_timeout_secs`]. A slow or failing model costs
//! one region its refinement, never the page.

use crate::config::ConversionConfig;
use crate::error::RefinementError;
use crate::model::{Page, Region};
use crate::pipeline::encode::{crop_region, encode_crop};
use crate::pipeline::postprocess::clean_transcription;
use crate::prompts::{DEFAULT_REFINE_PROMPT, STRICT_SYSTEM_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Produces an improved transcription for one region.
#[async_trait]
pub trait RegionRefiner: Send + Sync {
    /// Transcribe `region` of `page`. Any `Err` means "keep the baseline".
    async fn refine(&self, page: &Page, region: &Region) -> Result<String, RefinementError>;
}

/// Refiner backed by an `edgequake-llm` vision provider.
pub struct VlmRefiner {
    provider: Arc<dyn LLMProvider>,
    prompt: String,
    system_prompt: Option<String>,
    options: CompletionOptions,
    timeout: Duration,
}

impl std::fmt::Debug for VlmRefiner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VlmRefiner")
            .field("prompt", &self.prompt)
            .field("strict", &self.system_prompt.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl VlmRefiner {
    /// Build a refiner from the run configuration.
    pub fn new(provider: Arc<dyn LLMProvider>, config: &ConversionConfig) -> Self {
        Self {
            provider,
            prompt: config
                .refine_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_REFINE_PROMPT.to_string()),
            system_prompt: config
                .strict_transcription
                .then(|| STRICT_SYSTEM_PROMPT.to_string()),
            options: build_options(config),
            timeout: Duration::from_secs(config.refine_timeout_secs),
        }
    }

    fn messages(&self, image: ImageData) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.system_prompt {
            messages.push(ChatMessage::system(system.as_str()));
        }
        messages.push(ChatMessage::user_with_images(self.prompt.as_str(), vec![image]));
        messages
    }
}

#[async_trait]
impl RegionRefiner for VlmRefiner {
    async fn refine(&self, page: &Page, region: &Region) -> Result<String, RefinementError> {
        let start = Instant::now();
        let crop = crop_region(page, region)?;
        let image = encode_crop(&crop)?;
        let messages = self.messages(image);

        let response = tokio::time::timeout(self.timeout, self.provider.chat(&messages, Some(&self.options)))
            .await
            .map_err(|_| {
                warn!("Page {}: refinement timed out after {:?}", page.page_num, self.timeout);
                RefinementError::Timeout {
                    secs: self.timeout.as_secs(),
                }
            })?
            .map_err(|e| RefinementError::Provider(e.to_string()))?;

        debug!(
            "Page {}: refined {}x{} crop, {} input / {} output tokens, {:?}",
            page.page_num,
            crop.width(),
            crop.height(),
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        finish_reply(&response.content)
    }
}

/// Refiner used when refinement is switched off: every region keeps its
/// baseline text.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaselineRefiner;

#[async_trait]
impl RegionRefiner for BaselineRefiner {
    async fn refine(&self, _page: &Page, _region: &Region) -> Result<String, RefinementError> {
        Err(RefinementError::Disabled)
    }
}

/// Clean a raw model reply; a reply with no text left is a failure.
pub fn finish_reply(raw: &str) -> Result<String, RefinementError> {
    let text = clean_transcription(raw);
    if text.is_empty() {
        Err(RefinementError::EmptyResponse)
    } else {
        Ok(text)
    }
}

fn build_options(config: &ConversionConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}
