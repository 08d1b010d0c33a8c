//! Pull a JSON object out of free-form model output.
//!
//! Models asked for "only JSON" still wrap it in prose or markdown fences.
//! The whole text is tried first; after that every `{` is a candidate start
//! and its matching `}` is found by a scanner that skips braces inside
//! string literals. The first candidate that parses as an object wins.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum JsonExtraction {
    Parsed(Value),
    /// No `{` anywhere in the text
    NotFound,
    /// Candidates existed but none parsed; carries the last parse error
    Malformed(String),
}

impl JsonExtraction {
    pub fn into_value(self) -> Option<Value> {
        match self {
            JsonExtraction::Parsed(value) => Some(value),
            JsonExtraction::NotFound | JsonExtraction::Malformed(_) => None,
        }
    }
}

pub fn extract_json_object(text: &str) -> JsonExtraction {
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(text.trim()) {
        return JsonExtraction::Parsed(value);
    }

    let mut last_error: Option<String> = None;
    for (start, _) in text.match_indices('{') {
        let Some(candidate) = balanced_object(text, start) else {
            last_error.get_or_insert_with(|| "unbalanced braces".to_string());
            continue;
        };
        match serde_json::from_str::<Value>(candidate) {
            Ok(value @ Value::Object(_)) => return JsonExtraction::Parsed(value),
            Ok(_) => {}
            Err(e) => last_error = Some(e.to_string()),
        }
    }

    match last_error {
        Some(error) => JsonExtraction::Malformed(error),
        None => JsonExtraction::NotFound,
    }
}

/// The slice from the `{` at `start` through its matching `}`.
fn balanced_object(text: &str, start: usize) -> Option<&str> {
    let rest = text.get(start..)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in rest.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return rest.get(..=offset);
                }
            }
            _ => {}
        }
    }
    None
}
