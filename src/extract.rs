//! Pulls the recognized text out of the upstream's HTML/JS response.
//!
//! The upstream does not return structured data: the result page carries a
//! script that fills a textarea, e.g. `$("#ocrTextBox").val("...").show()`.
//! Any change to that markup breaks extraction, so handlers only see the
//! [`ResultExtractor`] trait and the scraping rule stays in one place.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("OCR result not found in upstream response")]
pub struct ExtractionError;

pub trait ResultExtractor: Send + Sync {
    fn extract(&self, body: &str) -> Result<String, ExtractionError>;
}

static OCR_TEXT_BOX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r##"(?:\$|jQuery)\("#ocrTextBox"\)\.val\("((?s:.*?))"\)\.show\(\)"##).unwrap()
});

/// Matches the `#ocrTextBox` value assignment in the i2OCR result script.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptAssignmentExtractor;

impl ResultExtractor for ScriptAssignmentExtractor {
    fn extract(&self, body: &str) -> Result<String, ExtractionError> {
        let captured = OCR_TEXT_BOX_RE
            .captures(body)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .ok_or(ExtractionError)?;

        // an empty text box means nothing was recognized
        if captured.is_empty() {
            return Err(ExtractionError);
        }

        Ok(unescape(captured))
    }
}

fn unescape(raw: &str) -> String {
    raw.replace("\\n", "\n").replace("\\\"", "\"")
}
