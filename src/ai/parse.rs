//! Untrusted-reply boundary: model text in, typed edit candidates out.
//!
//! Models wrap JSON in code fences, emit raw newlines inside strings, and
//! sprinkle prose around the array. [`sanitize_reply`] repairs what can be
//! repaired without guessing; each array item is then deserialized on its
//! own so one bad item never discards the rest.

use crate::ai::AiError;
use crate::edit::EditCandidate;
use serde_json::Value;

/// Strip code fences and make control characters JSON-safe.
///
/// Inside string literals raw `\n`, `\r` and `\t` become escapes; other
/// control characters are dropped everywhere.
pub fn sanitize_reply(reply: &str) -> String {
    let unfenced = strip_fences(reply);
    let mut out = String::with_capacity(unfenced.len());
    let mut in_string = false;
    let mut escaped = false;

    for ch in unfenced.chars() {
        if in_string {
            if escaped {
                escaped = false;
                if !ch.is_control() {
                    out.push(ch);
                }
                continue;
            }
            match ch {
                '\\' => {
                    escaped = true;
                    out.push(ch);
                }
                '"' => {
                    in_string = false;
                    out.push(ch);
                }
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                c if c.is_control() => {}
                c => out.push(c),
            }
        } else {
            match ch {
                '"' => {
                    in_string = true;
                    out.push(ch);
                }
                '\n' | '\r' | '\t' => out.push(ch),
                c if c.is_control() => {}
                c => out.push(c),
            }
        }
    }

    out.trim().to_string()
}

fn strip_fences(reply: &str) -> String {
    reply
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse a model reply into edit candidates.
///
/// The reply must contain a JSON array. Items that are not valid candidate
/// objects are kept as [`EditCandidate::unparseable`] so the normalizer can
/// report them.
pub fn parse_edit_candidates(reply: &str) -> Result<Vec<EditCandidate>, AiError> {
    let cleaned = sanitize_reply(reply);
    if cleaned.is_empty() {
        return Ok(Vec::new());
    }

    let items = match serde_json::from_str::<Vec<Value>>(&cleaned) {
        Ok(items) => items,
        Err(first_error) => {
            // Prose around the array: retry on the outermost brackets
            let inner = match (cleaned.find('['), cleaned.rfind(']')) {
                (Some(start), Some(end)) if start < end => &cleaned[start..=end],
                _ => {
                    return Err(AiError::InvalidResponse {
                        message: first_error.to_string(),
                    })
                }
            };
            serde_json::from_str::<Vec<Value>>(inner).map_err(|e| AiError::InvalidResponse {
                message: e.to_string(),
            })?
        }
    };

    Ok(items
        .into_iter()
        .map(|item| {
            serde_json::from_value::<EditCandidate>(item)
                .unwrap_or_else(|e| EditCandidate::unparseable(e.to_string()))
        })
        .collect())
}
