//! Resolution of the pipeline's external collaborators: the vision provider
//! behind the refiner, the refiner itself and the region detector.

use crate::config::ConversionConfig;
use crate::error::Scan2PdfError;
use crate::pipeline::detect::{RegionDetector, TesseractDetector};
use crate::pipeline::refine::{BaselineRefiner, RegionRefiner, VlmRefiner};
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::sync::Arc;
use tracing::info;

/// Model used with a local Ollama server when none is named.
pub const DEFAULT_OLLAMA_MODEL: &str = "blaifa/Nanonets-OCR-s";

/// Model used with every hosted provider when none is named.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Default model for a provider name.
pub fn default_model_for(provider_name: &str) -> &'static str {
    if provider_name.eq_ignore_ascii_case("ollama") {
        DEFAULT_OLLAMA_MODEL
    } else {
        DEFAULT_MODEL
    }
}

/// The detector configured for this run, or tesseract.
pub fn resolve_detector(config: &ConversionConfig) -> Arc<dyn RegionDetector> {
    match &config.detector {
        Some(detector) => Arc::clone(detector),
        None => Arc::new(TesseractDetector::new(config.tesseract.clone(), config.dpi)),
    }
}

/// The refiner for this run.
///
/// An explicit refiner wins; with refinement switched off every region keeps
/// its baseline; otherwise a [`VlmRefiner`] over the resolved provider.
pub fn resolve_refiner(config: &ConversionConfig) -> Result<Arc<dyn RegionRefiner>, Scan2PdfError> {
    if let Some(refiner) = &config.refiner {
        return Ok(Arc::clone(refiner));
    }
    if !config.refine {
        info!("Refinement disabled; keeping detector text for every region");
        return Ok(Arc::new(BaselineRefiner));
    }
    let provider = resolve_provider(config)?;
    Ok(Arc::new(VlmRefiner::new(provider, config)))
}

fn create_vision_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, Scan2PdfError> {
    info!("Using provider '{}' with model '{}'", provider_name, model);
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        Scan2PdfError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider** (`config.provider_name`) with `config.model` or
///    [`default_model_for`] the provider; the API key comes from the
///    provider's usual environment variable.
/// 3. **Environment**: `EDGEQUAKE_LLM_PROVIDER` (plus `EDGEQUAKE_MODEL`
///    when set).
/// 4. **`OPENAI_API_KEY`** present: OpenAI.
/// 5. **Full auto-detection** via [`ProviderFactory::from_env`].
pub fn resolve_provider(config: &ConversionConfig) -> Result<Arc<dyn LLMProvider>, Scan2PdfError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or_else(|| default_model_for(name));
        return create_vision_provider(name, model);
    }

    if let Some(prov) = non_empty_env("EDGEQUAKE_LLM_PROVIDER") {
        let model = config
            .model
            .clone()
            .or_else(|| non_empty_env("EDGEQUAKE_MODEL"))
            .unwrap_or_else(|| default_model_for(&prov).to_string());
        return create_vision_provider(&prov, &model);
    }

    if non_empty_env("OPENAI_API_KEY").is_some() {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_vision_provider("openai", model);
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| Scan2PdfError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, run Ollama, \
                or pass --no-refine to keep the detector's text.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RefinementError;
    use crate::model::{Page, Region};
    use image::RgbImage;

    #[test]
    fn ollama_gets_the_ocr_model() {
        assert_eq!(default_model_for("ollama"), "blaifa/Nanonets-OCR-s");
        assert_eq!(default_model_for("Ollama"), "blaifa/Nanonets-OCR-s");
        assert_eq!(default_model_for("openai"), "gpt-4.1-nano");
        assert_eq!(default_model_for("anthropic"), "gpt-4.1-nano");
    }

    #[tokio::test]
    async fn disabled_refinement_needs_no_provider() {
        let config = ConversionConfig::builder().refine(false).build().unwrap();
        let refiner = resolve_refiner(&config).unwrap();
        let page = Page::new(1, RgbImage::new(10, 10));
        let region = Region::rect(0.0, 0.0, 5.0, 5.0, "x", 0.5);
        assert_eq!(
            refiner.refine(&page, &region).await,
            Err(RefinementError::Disabled)
        );
    }

    #[test]
    fn default_detector_is_tesseract() {
        let detector = resolve_detector(&ConversionConfig::default());
        assert_eq!(detector.name(), "tesseract");
    }
}
