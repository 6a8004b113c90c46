//! Instructions sent to the region-recognition model.
//!
//! The refiner sees one cropped text line at a time, so the instruction is
//! deliberately short. Callers can override it via
//! [`crate::config::ConversionConfig::refine_prompt`]; the constants here are
//! used only when no override is provided.

/// Default instruction sent alongside every cropped region.
pub const DEFAULT_REFINE_PROMPT: &str = "Extract text from image";

/// Optional system message that keeps chatty models to a bare transcription.
///
/// Sent only when [`crate::config::ConversionConfig::strict_transcription`]
/// is enabled. Small OCR-tuned models (e.g. Nanonets-OCR) tend to answer
/// worse with a system message, so it is off by default.
pub const STRICT_SYSTEM_PROMPT: &str = r#"You transcribe text from small cropped images of a scanned document.
Output ONLY the text visible in the image, exactly as written.
Do not add explanations, quotes, labels or formatting.
If the image contains no legible text, output nothing."#;
