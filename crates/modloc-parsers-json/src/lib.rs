//! Locale files in the wild embed `//` and `/* */` comments even though plain
//! JSON forbids them. Parsing runs in two passes: strip comments and hand the
//! rest to serde_json, then fall back to a lenient JSONC parse of the raw
//! text. When both fail the file degrades to an empty mapping instead of
//! failing the run; `ParseOutcome` keeps the two cases distinguishable.

use modloc_core::LocaleMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static LINE_COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)//.*?$").unwrap());
static BLOCK_COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());

#[derive(Debug, Clone)]
pub enum ParseOutcome {
    Parsed(LocaleMap),
    /// The file existed but could not be parsed; downstream treats it as an
    /// empty mapping and keeps going.
    Degraded { reason: String },
}

impl ParseOutcome {
    pub fn into_map(self) -> LocaleMap {
        match self {
            ParseOutcome::Parsed(map) => map,
            ParseOutcome::Degraded { .. } => LocaleMap::new(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, ParseOutcome::Degraded { .. })
    }
}

pub fn strip_comments(text: &str) -> String {
    let no_line = LINE_COMMENT_RE.replace_all(text, "");
    BLOCK_COMMENT_RE.replace_all(&no_line, "").into_owned()
}

fn map_from_value(value: serde_json::Value) -> Option<LocaleMap> {
    let obj = value.as_object()?;
    let mut map = LocaleMap::with_capacity(obj.len());
    for (k, v) in obj {
        match v {
            serde_json::Value::String(s) => {
                map.insert(k.clone(), s.clone());
            }
            serde_json::Value::Number(_) | serde_json::Value::Bool(_) => {
                map.insert(k.clone(), v.to_string());
            }
            // Nested structures are not translatable strings; drop them.
            _ => {}
        }
    }
    Some(map)
}

/// Parse the raw bytes of one locale file.
pub fn parse_locale_bytes(bytes: &[u8]) -> ParseOutcome {
    let text = match std::str::from_utf8(bytes) {
        Ok(t) => t,
        Err(e) => {
            return ParseOutcome::Degraded {
                reason: format!("not valid UTF-8: {e}"),
            }
        }
    };
    parse_locale_str(text)
}

pub fn parse_locale_str(text: &str) -> ParseOutcome {
    let stripped = strip_comments(text);
    match serde_json::from_str::<serde_json::Value>(&stripped) {
        Ok(value) => match map_from_value(value) {
            Some(map) => return ParseOutcome::Parsed(map),
            None => {
                return ParseOutcome::Degraded {
                    reason: "top-level JSON value is not an object".into(),
                }
            }
        },
        Err(first_err) => {
            tracing::debug!(%first_err, "strict parse failed, trying lenient parser");
            // Lenient pass runs over the raw text: comment stripping can
            // itself mangle strings containing `//`.
            match jsonc_parser::parse_to_serde_value(text, &Default::default()) {
                Ok(Some(value)) => {
                    if let Some(map) = map_from_value(value) {
                        return ParseOutcome::Parsed(map);
                    }
                    ParseOutcome::Degraded {
                        reason: "top-level JSON value is not an object".into(),
                    }
                }
                Ok(None) => ParseOutcome::Degraded {
                    reason: "empty document".into(),
                },
                Err(second_err) => ParseOutcome::Degraded {
                    reason: format!("strict: {first_err}; lenient: {second_err}"),
                },
            }
        }
    }
}

/// Parse a locale file from disk. An unreadable file degrades like a
/// malformed one.
pub fn parse_locale_file(path: &Path) -> ParseOutcome {
    match std::fs::read(path) {
        Ok(bytes) => parse_locale_bytes(&bytes),
        Err(e) => ParseOutcome::Degraded {
            reason: format!("cannot read {}: {e}", path.display()),
        },
    }
}
