//! Normalization of raw model text into validated results.
//!
//! Models reliably produce JSON-like text but not strictly valid JSON without
//! a prose wrapper. Each normalizer runs an ordered chain of fallible stages
//! and stops at the first one that yields a valid value:
//!
//! 1. parse the whole text and validate its shape;
//! 2. parse the span from the first `{` to the last `}` (no braces: empty result);
//! 3. parse the first complete object starting at any `{` that carries the
//!    expected key, so balanced braces in surrounding prose are skipped;
//! 4. for facts only, treat each remaining prose line as a fact.
//!
//! None of the stages can fail or panic; the chain ends in the empty value.

use serde_json::{Map, Value};

use crate::types::{FactExtractionResult, MemoryItem, ReconciliationEntry};

use super::invariants::enforce_id_invariant;

const CODE_FENCE: &str = "```";

/// Normalize a fact extraction response.
pub fn normalize_facts(text: &str) -> FactExtractionResult {
    parse_facts_json(text)
        .map(|result| {
            tracing::debug!(facts = result.facts.len(), "Parsed fact response as JSON");
            result
        })
        .or_else(|| match brace_span(text) {
            Some(span) => parse_facts_json(span)
                .map(|result| {
                    tracing::debug!(facts = result.facts.len(), "Extracted facts from braced span");
                    result
                })
                .or_else(|| {
                    let result = embedded_object(text, "facts", validate_facts)?;
                    tracing::debug!(facts = result.facts.len(), "Found facts object inside prose");
                    Some(result)
                })
                .or_else(|| scavenge_fact_lines(text)),
            None => {
                tracing::warn!(response = %text, "No JSON braces found in fact response");
                Some(FactExtractionResult::empty())
            }
        })
        .unwrap_or_default()
}

/// Normalize a fact extraction response to its compact JSON form.
pub fn normalize_facts_to_json(text: &str) -> String {
    normalize_facts(text).to_json()
}

/// Parse a reconciliation response without checking ids against a snapshot.
pub fn parse_reconciliation(text: &str) -> Vec<ReconciliationEntry> {
    parse_reconciliation_json(text)
        .or_else(|| {
            let span = brace_span(text)?;
            tracing::debug!("Retrying reconciliation response on braced span");
            parse_reconciliation_json(span)
        })
        .or_else(|| {
            tracing::debug!("Scanning reconciliation response for an embedded memory object");
            embedded_object(text, "memory", validate_reconciliation)
        })
        .unwrap_or_else(|| {
            tracing::warn!(response = %text, "Unusable reconciliation response, treating as no decisions");
            Vec::new()
        })
}

/// Parse a reconciliation response and drop entries that break the id
/// invariants for the given snapshot.
pub fn normalize_reconciliation(
    text: &str,
    old_memory: &[MemoryItem],
) -> Vec<ReconciliationEntry> {
    let (entries, report) = enforce_id_invariant(parse_reconciliation(text), old_memory);
    if report.dropped() > 0 {
        tracing::warn!(?report, "Dropped invalid reconciliation entries");
    }
    entries
}

/// Span from the first `{` through the last `}`.
///
/// `None` when either brace is missing. When the last `}` precedes the first
/// `{` the span is empty, which no JSON stage accepts.
fn brace_span(text: &str) -> Option<&str> {
    let first = text.find('{')?;
    let last = text.rfind('}')?;
    // Both offsets sit on ASCII bytes, so they are char boundaries.
    Some(text.get(first..=last).unwrap_or(""))
}

/// First JSON object starting at some `{` that contains `key` and passes
/// `validate`. Trailing text after the object is ignored.
fn embedded_object<T>(
    text: &str,
    key: &str,
    validate: impl Fn(Value) -> Option<T>,
) -> Option<T> {
    text.match_indices('{').find_map(|(start, _)| {
        let rest = text.get(start..)?;
        let value = serde_json::Deserializer::from_str(rest)
            .into_iter::<Value>()
            .next()?
            .ok()?;
        if value.get(key).is_none() {
            return None;
        }
        validate(value)
    })
}

fn parse_facts_json(text: &str) -> Option<FactExtractionResult> {
    let value: Value = serde_json::from_str(text).ok()?;
    validate_facts(value)
}

/// Accept `{"facts": [string, ...]}`; a missing or falsy `facts` counts as
/// empty and other keys are ignored. Blank facts are dropped.
fn validate_facts(value: Value) -> Option<FactExtractionResult> {
    let Value::Object(mut map) = value else {
        return None;
    };

    let facts = match take_list(&mut map, "facts")? {
        Some(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()?
            .into_iter()
            .filter(|fact| !fact.trim().is_empty())
            .collect(),
        None => Vec::new(),
    };

    Some(FactExtractionResult::new(facts))
}

fn parse_reconciliation_json(text: &str) -> Option<Vec<ReconciliationEntry>> {
    let value: Value = serde_json::from_str(text).ok()?;
    validate_reconciliation(value)
}

/// Accept `{"memory": [entry, ...]}`; every entry must be well formed.
fn validate_reconciliation(value: Value) -> Option<Vec<ReconciliationEntry>> {
    let Value::Object(mut map) = value else {
        return None;
    };

    match take_list(&mut map, "memory")? {
        Some(items) => serde_json::from_value(Value::Array(items))
            .map_err(|e| tracing::debug!(error = %e, "Reconciliation entries failed validation"))
            .ok(),
        None => Some(Vec::new()),
    }
}

/// Take `key` out of `map` as a list.
///
/// `Some(None)` when the key is missing or holds a falsy scalar (`null`,
/// `false`, `0`, `""`), `None` when it holds anything else that is not an
/// array.
fn take_list(map: &mut Map<String, Value>, key: &str) -> Option<Option<Vec<Value>>> {
    match map.remove(key) {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Some(None),
        Some(Value::String(s)) if s.is_empty() => Some(None),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => Some(None),
        Some(Value::Array(items)) => Some(Some(items)),
        Some(_) => None,
    }
}

/// Last resort: every prose line is a fact.
fn scavenge_fact_lines(text: &str) -> Option<FactExtractionResult> {
    let facts: Vec<String> = text
        .split('\n')
        .map(str::trim)
        .filter(|line| {
            !line.is_empty()
                && !line.starts_with('{')
                && !line.starts_with('}')
                && !line.contains(CODE_FENCE)
        })
        .map(String::from)
        .collect();

    if facts.is_empty() {
        return None;
    }

    tracing::warn!(facts = facts.len(), "Fact response was not valid JSON, salvaged lines as facts");
    Some(FactExtractionResult::new(facts))
}
