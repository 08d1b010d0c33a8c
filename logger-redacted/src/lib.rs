//! Redaction of patient identifiers in log output
//!
//! Consultation handling logs a lot of context: who uploaded audio, which
//! patient a recording was linked to, what the transcription provider said
//! when it failed. Provider error bodies can echo request content, and the
//! identifiers this service handles (JKN/BPJS numbers, emails, phone numbers)
//! must not reach log storage in clear text.
//!
//! Redacted values are replaced with a short SHA-256 fingerprint so two log
//! lines about the same patient can still be correlated:
//!
//! ```rust
//! use logger_redacted::{redact, fingerprint};
//!
//! let line = redact("lookup failed for 0001234567890");
//! assert!(line.starts_with("lookup failed for JKN["));
//! assert_eq!(fingerprint("0001234567890"), fingerprint("0001234567890"));
//! ```

pub mod macros;
pub mod redactor;

pub use redactor::*;

use lazy_static::lazy_static;

lazy_static! {
    static ref DEFAULT_REDACTOR: PiiRedactor = PiiRedactor::new(RedactionConfig::default());
}

/// Redact free text with the default configuration.
pub fn redact(text: &str) -> String {
    DEFAULT_REDACTOR.redact(text)
}

/// Tag for a national health identifier, safe to put in a log field.
pub fn jkn_tag(jkn_number: &str) -> String {
    format!("JKN[{}]", fingerprint(jkn_number))
}
