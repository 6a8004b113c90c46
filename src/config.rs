//! Configuration types for scan-to-annotated-PDF conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. The config is a plain value: the
//! pipeline reads nothing from ambient state except the provider
//! auto-detection environment variables documented in [`crate::provider`].
//!
//! # Design choice: builder over constructor
//! A twenty-field constructor is unreadable and breaks on every new field.
//! The builder lets callers set only what they care about and rely on
//! documented defaults for the rest.

use crate::error::Scan2PdfError;
use crate::pipeline::detect::RegionDetector;
use crate::pipeline::layout::{OverlayColor, OverlayStyle};
use crate::pipeline::refine::RegionRefiner;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for one conversion run.
///
/// # Example
/// ```rust
/// use edgequake_scan2pdf::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .concurrency(8)
///     .provider_name("ollama")
///     .model("blaifa/Nanonets-OCR-s")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Rasterisation density for PDF inputs. Range: 72–600. Default: 300.
    ///
    /// Image inputs are used at their native resolution. Overlays are laid
    /// out in raster pixels, so this also sets the output page size
    /// (one pixel = one PDF point).
    pub dpi: u32,

    /// Maximum refinement calls in flight for one page. Default: 4.
    ///
    /// Regions are independent, so they can be refined concurrently. Set to 1
    /// if the model endpoint cannot serve parallel requests.
    pub concurrency: usize,

    /// Number of input files processed at the same time. Default: 1.
    pub file_concurrency: usize,

    /// Refine detected regions with the vision model. Default: true.
    ///
    /// When false every region keeps its detector transcription and no
    /// provider or API key is needed.
    pub refine: bool,

    /// Vision model identifier, e.g. "gpt-4.1-nano", "blaifa/Nanonets-OCR-s".
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Custom region detector. Default: [`crate::pipeline::detect::TesseractDetector`].
    pub detector: Option<Arc<dyn RegionDetector>>,

    /// Custom region refiner. Takes precedence over every provider setting.
    pub refiner: Option<Arc<dyn RegionRefiner>>,

    /// Instruction sent with each crop. Default: [`crate::prompts::DEFAULT_REFINE_PROMPT`].
    pub refine_prompt: Option<String>,

    /// Prepend [`crate::prompts::STRICT_SYSTEM_PROMPT`] to every request. Default: false.
    pub strict_transcription: bool,

    /// Sampling temperature. Default: 0.0.
    pub temperature: f32,

    /// Maximum tokens per region reply. Default: 512.
    ///
    /// A region is one line of text; a reply far longer than that is a model
    /// rambling, not a transcription.
    pub max_tokens: usize,

    /// Timeout for one refinement call in seconds. Default: 30.
    ///
    /// Expiry counts as a failed refinement and the region falls back to its
    /// baseline text. There is no retry.
    pub refine_timeout_secs: u64,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Settings for the bundled tesseract detector.
    pub tesseract: TesseractConfig,

    /// Overlay font-size policy and colour.
    pub style: OverlayStyle,

    /// Progress events. Default: none.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            dpi: 300,
            concurrency: 4,
            file_concurrency: 1,
            refine: true,
            model: None,
            provider_name: None,
            provider: None,
            detector: None,
            refiner: None,
            refine_prompt: None,
            strict_transcription: false,
            temperature: 0.0,
            max_tokens: 512,
            refine_timeout_secs: 30,
            password: None,
            download_timeout_secs: 120,
            tesseract: TesseractConfig::default(),
            style: OverlayStyle::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("dpi", &self.dpi)
            .field("concurrency", &self.concurrency)
            .field("file_concurrency", &self.file_concurrency)
            .field("refine", &self.refine)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("detector", &self.detector.as_ref().map(|d| d.name().to_string()))
            .field("refiner", &self.refiner.as_ref().map(|_| "<dyn RegionRefiner>"))
            .field("strict_transcription", &self.strict_transcription)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("refine_timeout_secs", &self.refine_timeout_secs)
            .field("tesseract", &self.tesseract)
            .field("style", &self.style)
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl fmt::Debug for ConversionConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConversionConfigBuilder").field(&self.config).finish()
    }
}

impl ConversionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn file_concurrency(mut self, n: usize) -> Self {
        self.config.file_concurrency = n.max(1);
        self
    }

    pub fn refine(mut self, v: bool) -> Self {
        self.config.refine = v;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn detector(mut self, detector: Arc<dyn RegionDetector>) -> Self {
        self.config.detector = Some(detector);
        self
    }

    pub fn refiner(mut self, refiner: Arc<dyn RegionRefiner>) -> Self {
        self.config.refiner = Some(refiner);
        self
    }

    pub fn refine_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.refine_prompt = Some(prompt.into());
        self
    }

    pub fn strict_transcription(mut self, v: bool) -> Self {
        self.config.strict_transcription = v;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn refine_timeout_secs(mut self, secs: u64) -> Self {
        self.config.refine_timeout_secs = secs;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn tesseract(mut self, tesseract: TesseractConfig) -> Self {
        self.config.tesseract = tesseract;
        self
    }

    pub fn style(mut self, style: OverlayStyle) -> Self {
        self.config.style = style;
        self
    }

    pub fn overlay_color(mut self, color: OverlayColor) -> Self {
        self.config.style.color = color;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Scan2PdfError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(Scan2PdfError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if c.concurrency == 0 || c.file_concurrency == 0 {
            return Err(Scan2PdfError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.refine_timeout_secs == 0 {
            return Err(Scan2PdfError::InvalidConfig(
                "Refinement timeout must be ≥ 1 second".into(),
            ));
        }
        let s = &c.style;
        if !(s.max_font_size > 0.0) || !(s.font_scale > 0.0) || s.margin < 0.0 {
            return Err(Scan2PdfError::InvalidConfig(format!(
                "Overlay style out of range: {:?}",
                s
            )));
        }
        Ok(self.config)
    }
}

/// Settings for [`crate::pipeline::detect::TesseractDetector`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TesseractConfig {
    /// Executable to run. Default: `tesseract` on `PATH`.
    pub binary: PathBuf,
    /// `-l` language list, e.g. "eng" or "eng+deu". Default: "eng".
    pub languages: String,
    /// Page segmentation mode (`--psm`). Default: 3 (fully automatic).
    pub psm: u32,
    /// Words below this confidence (0–100) are ignored. Default: 0.
    pub min_word_confidence: f32,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            languages: "eng".to_string(),
            psm: 3,
            min_word_confidence: 0.0,
        }
    }
}
