//! JSON recovery pipeline for model output.
//!
//! Models are instructed to emit JSON but routinely emit text that is almost
//! JSON: fenced in markdown, wrapped in prose, with trailing commas, line
//! comments, Python-style quoting, or literal newlines inside string values.
//! This module holds an ordered list of candidate builders; each derives one
//! repaired candidate from the fence-stripped input and the pipeline stops at
//! the first candidate that parses strictly. This is not a general JSON5
//! parser: it targets exactly the failure modes observed in practice.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// How much of the offending text travels with the error for diagnostics.
const SNIPPET_LEN: usize = 200;

/// Every repair strategy has been exhausted.
#[derive(Debug, Error)]
#[error("no valid JSON found in model response (starts with: {snippet:?})")]
pub struct MalformedJson {
    pub snippet: String,
}

type Candidate = fn(&str) -> Option<String>;

/// Ordered candidate builders, cheapest first. Each works on the
/// fence-stripped input independently; a builder returns `None` when it does
/// not apply (nothing to extract, not a Python literal).
const STRATEGIES: &[(&str, Candidate)] = &[
    ("as_is", as_is),
    ("clean_syntax", cleaned),
    ("extract_object", extract_cleaned),
    ("extract_escape_controls", extract_escape_controls),
    ("extract_escape_newlines", extract_escape_newlines),
    ("extract_escape_both", extract_escape_both),
    ("python_literals", python_literals),
];

/// Recovers a JSON value from raw model output, or fails with a diagnostic
/// snippet once every strategy has been tried.
pub fn parse_model_json(raw: &str) -> Result<Value, MalformedJson> {
    let text = strip_markdown_fences(raw);

    for (name, build) in STRATEGIES {
        let Some(candidate) = build(&text) else {
            continue;
        };
        if let Ok(value) = serde_json::from_str::<Value>(&candidate) {
            if *name != "as_is" {
                debug!("model JSON recovered via '{name}' strategy");
            }
            return Ok(value);
        }
    }

    Err(MalformedJson {
        snippet: raw.chars().take(SNIPPET_LEN).collect(),
    })
}

// ── Candidate builders ──────────────────────────────────────────────────────

fn as_is(text: &str) -> Option<String> {
    Some(text.to_string())
}

fn cleaned(text: &str) -> Option<String> {
    Some(clean_syntax(text))
}

fn extract_cleaned(text: &str) -> Option<String> {
    extract_object_span(text).map(clean_syntax)
}

fn extract_escape_controls(text: &str) -> Option<String> {
    extract_object_span(text).map(|span| clean_syntax(&escape_control_chars(span)))
}

fn extract_escape_newlines(text: &str) -> Option<String> {
    extract_object_span(text).map(|span| clean_syntax(&escape_newlines_in_strings(span)))
}

fn extract_escape_both(text: &str) -> Option<String> {
    extract_object_span(text)
        .map(|span| clean_syntax(&escape_newlines_in_strings(&escape_control_chars(span))))
}

fn python_literals(text: &str) -> Option<String> {
    let stripped = text.trim_start();
    if stripped.starts_with("{'") || stripped.starts_with("['") {
        Some(normalize_python_literals(text))
    } else {
        None
    }
}

// ── Transforms ──────────────────────────────────────────────────────────────

/// Removes a fenced code block wrapper (```json ... ``` or ``` ... ```).
/// Applied once, before any parse attempt.
pub fn strip_markdown_fences(text: &str) -> String {
    let text = text.trim();
    if !text.starts_with("```") {
        return text.to_string();
    }
    // Drop the opening fence line (```json or bare ```)
    let body = match text.split_once('\n') {
        Some((_, rest)) => rest,
        None => &text[3..],
    };
    // Drop everything from the last closing fence on
    let body = match body.rsplit_once("```") {
        Some((before, _)) => before,
        None => body,
    };
    body.trim().to_string()
}

static LINE_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"//[^\n]*").unwrap());
static TRAILING_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*([}\]])").unwrap());
static MISSING_COMMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([}\]])\s*\n\s*(["{\[])"#).unwrap());
static BROKEN_CONTINUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""\s*\n\s*"([^:]*":)"#).unwrap());
static INFINITY_LITERAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"-?\bInfinity\b").unwrap());
static NAN_LITERAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bNaN\b").unwrap());

/// Fixes common syntax slips. The transform order matters: comments must go
/// before trailing-comma removal (a comment can hide the closing brace from
/// the comma pattern), and the number literals go last.
pub fn clean_syntax(text: &str) -> String {
    let text = LINE_COMMENT.replace_all(text, "");
    let text = TRAILING_COMMA.replace_all(&text, "${1}");
    let text = MISSING_COMMA.replace_all(&text, "${1},\n${2}");
    let text = BROKEN_CONTINUATION.replace_all(&text, "\",\n\"${1}");
    let text = INFINITY_LITERAL.replace_all(&text, "null");
    let text = NAN_LITERAL.replace_all(&text, "null");
    text.into_owned()
}

/// Slices the text to its outermost `{ ... }` span, discarding any prose the
/// model added around the JSON.
pub fn extract_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

/// Escapes literal tab and form-feed characters.
pub fn escape_control_chars(text: &str) -> String {
    text.replace('\t', "\\t").replace('\u{000C}', "\\f")
}

/// Escapes raw newlines that occur inside string literals.
///
/// This is the single most common model failure mode. It must stay a real
/// character scan tracking quote and escape state: whether a newline is
/// structurally significant depends on string nesting, which no regex over
/// the flat text can decide (adjacent escaped quotes defeat any pattern).
pub fn escape_newlines_in_strings(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escape_next = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if escape_next {
            out.push(ch);
            escape_next = false;
            continue;
        }
        match ch {
            '\\' => {
                escape_next = true;
                out.push(ch);
            }
            '"' => {
                in_string = !in_string;
                out.push(ch);
            }
            '\n' if in_string => out.push_str("\\n"),
            '\r' if in_string => {
                // Collapse \r\n to a single escaped newline
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str("\\n");
            }
            _ => out.push(ch),
        }
    }
    out
}

static PY_OPEN_QUOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([\[{,:])\s*'").unwrap());
static PY_CLOSE_QUOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"'\s*([\]}:,])").unwrap());
static PY_TRUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bTrue\b").unwrap());
static PY_FALSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bFalse\b").unwrap());
static PY_NONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bNone\b").unwrap());

/// Converts a Python-style dict literal to JSON: single quotes adjacent to
/// structural characters become double quotes, `True`/`False`/`None` become
/// their JSON spellings.
pub fn normalize_python_literals(text: &str) -> String {
    let text = PY_OPEN_QUOTE.replace_all(text, "${1} \"");
    let text = PY_CLOSE_QUOTE.replace_all(&text, "\"${1}");
    let text = PY_TRUE.replace_all(&text, "true");
    let text = PY_FALSE.replace_all(&text, "false");
    let text = PY_NONE.replace_all(&text, "null");
    text.into_owned()
}
