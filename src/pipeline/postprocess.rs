//! Post-processing: normalise a recognition model's reply into a bare
//! transcription.
//!
//! Vision models asked to "extract text" from a crop often wrap the answer:
//! a ```` ``` ```` fence, a "Here is the extracted text:" preamble, quotes
//! around a single line, Windows line endings, or zero-width characters
//! copied from their tokenizer. None of that belongs in the overlay.
//!
//! Rules run in this order: fences are stripped before the preamble so the
//! preamble regex sees clean input, and quotes are unwrapped last because a
//! preamble often precedes the quoted text.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all normalisation rules to a raw model reply.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF → LF)
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 3. Strip an outer code fence
/// 4. Drop a leading "Here is the text:"-style preamble line
/// 5. Unwrap matching outer quotes
/// 6. Trim every line and collapse runs of blank lines
/// 7. Trim the whole string
///
/// An empty return value means the reply carried no usable text.
pub fn clean_transcription(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = strip_code_fences(&s);
    let s = strip_preamble(&s);
    let s = unwrap_quotes(&s);
    let s = tidy_lines(&s);
    s.trim().to_string()
}

// ── Rule 1: Normalise line endings ──────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 3: Strip outer code fences ─────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[a-zA-Z]*\n(.*?)\n?```\s*$").unwrap());

fn strip_code_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 4: Drop chat preambles ─────────────────────────────────────────────
//
// Matches a first line such as "Here is the extracted text:",
// "The text in the image is:" or "Extracted text:" and removes it when
// something follows on later lines or after the colon. A bare "Text:" has
// no cue and is kept: it is as likely to be a printed label.

static RE_PREAMBLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)^\s*(?:sure[,!.]?\s*)?
        (?:
            (?:here\s+is|here's)\s+(?:the\s+)?(?:(?:extracted|recogni[sz]ed|transcribed)\s+)?text
          | (?:the\s+)?(?:extracted|recogni[sz]ed|transcribed)\s+text
          | (?:the\s+)?text\s+(?:in|from|of)\s+(?:the|this)\s+image
        )
        (?:\s+(?:in|from|of)\s+(?:the|this)\s+image)?
        (?:\s+(?:is|reads))?\s*:\s*",
    )
    .unwrap()
});

fn strip_preamble(input: &str) -> String {
    let trimmed = input.trim_start();
    match RE_PREAMBLE.find(trimmed) {
        Some(m) if m.end() < trimmed.len() => trimmed[m.end()..].to_string(),
        _ => input.to_string(),
    }
}

// ── Rule 5: Unwrap matching outer quotes ────────────────────────────────────

fn unwrap_quotes(input: &str) -> String {
    let t = input.trim();
    let pairs = [('"', '"'), ('\'', '\''), ('`', '`'), ('\u{201C}', '\u{201D}')];
    for (open, close) in pairs {
        if t.chars().count() >= 2 && t.starts_with(open) && t.ends_with(close) {
            let inner = &t[open.len_utf8()..t.len() - close.len_utf8()];
            if !inner.contains(open) && !inner.contains(close) {
                return inner.to_string();
            }
        }
    }
    input.to_string()
}

// ── Rule 6: Trim lines and collapse blank runs ──────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn tidy_lines(input: &str) -> String {
    let joined = input
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n");
    RE_BLANK_LINES.replace_all(&joined, "\n\n").to_string()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_reply_passes_through() {
        assert_eq!(clean_transcription("Hello"), "Hello");
        assert_eq!(clean_transcription("  Hello world \n"), "Hello world");
    }

    #[test]
    fn strips_fences() {
        assert_eq!(clean_transcription("```\nInvoice 42\n```"), "Invoice 42");
        assert_eq!(clean_transcription("```text\nInvoice 42\n```"), "Invoice 42");
    }

    #[test]
    fn strips_preambles() {
        assert_eq!(
            clean_transcription("Here is the extracted text:\nTotal due"),
            "Total due"
        );
        assert_eq!(
            clean_transcription("The text in the image is: \"Total due\""),
            "Total due"
        );
        assert_eq!(clean_transcription("Extracted text: 12.50 EUR"), "12.50 EUR");
    }

    #[test]
    fn keeps_text_that_merely_mentions_text() {
        assert_eq!(clean_transcription("Text messaging"), "Text messaging");
    }

    #[test]
    fn printed_label_is_not_a_preamble() {
        assert_eq!(clean_transcription("Text: Hello"), "Text: Hello");
        assert_eq!(clean_transcription("The text: Hello"), "The text: Hello");
    }

    #[test]
    fn bare_preamble_is_kept() {
        // Nothing after the colon: the reply is returned unchanged, not blanked.
        assert_eq!(clean_transcription("Text:"), "Text:");
    }

    #[test]
    fn unwraps_quotes() {
        assert_eq!(clean_transcription("\"Hello\""), "Hello");
        assert_eq!(clean_transcription("\u{201C}Hello\u{201D}"), "Hello");
        assert_eq!(clean_transcription("\"a\" and \"b\""), "\"a\" and \"b\"");
    }

    #[test]
    fn normalises_whitespace_and_invisibles() {
        assert_eq!(
            clean_transcription("line one\r\n\r\n\r\n\r\nline\u{200B} two  "),
            "line one\n\nline two"
        );
    }

    #[test]
    fn empty_reply() {
        assert_eq!(clean_transcription("   \n\u{FEFF}"), "");
        assert_eq!(clean_transcription("```\n```"), "");
    }
}
