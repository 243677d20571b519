//! Conversion of dispatch outcomes into [`RunResult`]s.

use serde_json::Value;
use tool_primitives::{Backend, Tool};

use crate::dispatch::Outcome;
use crate::protocol::{ContentPart, ProtocolResult};
use crate::result::RunResult;

pub(crate) fn normalize(tool: Tool, backend: Backend, outcome: Outcome) -> RunResult {
    match outcome {
        Outcome::Structured(value) => RunResult::new(tool, backend, value, None),
        Outcome::Protocol(result) => {
            let structured = extract_structured(&result);
            RunResult::new(tool, backend, structured, Some(result))
        }
    }
}

/// Derives a structured value from a protocol result.
///
/// A non-null `structured_content` wins. Otherwise a lone non-empty text part
/// is parsed as JSON, falling back to the literal text. Several texts become
/// an ordered array of the non-empty ones; no text yields `Null`.
#[must_use]
pub fn extract_structured(result: &ProtocolResult) -> Value {
    if let Some(structured) = result.structured_content.as_ref().filter(|v| !v.is_null()) {
        return structured.clone();
    }

    let texts: Vec<&str> = result
        .content
        .iter()
        .filter_map(ContentPart::text_value)
        .collect();

    if let [only] = texts.as_slice() {
        if !only.is_empty() {
            return serde_json::from_str(only).unwrap_or_else(|_| Value::String((*only).to_owned()));
        }
    }

    let mut non_empty: Vec<Value> = texts
        .into_iter()
        .filter(|text| !text.is_empty())
        .map(|text| Value::String(text.to_owned()))
        .collect();

    match non_empty.len() {
        0 => Value::Null,
        1 => non_empty.remove(0),
        _ => Value::Array(non_empty),
    }
}
