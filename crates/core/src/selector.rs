//! Selectors: caller-supplied query documents passed through to the store
//!
//! A selector is a JSON object mapping field paths to conditions. A
//! condition is either a literal (equality) or an operator object:
//!
//! ```json
//! {"a": 1, "e": {"$gt": 0, "$lte": 3}, "tag": {"$in": ["x", "y"]}}
//! ```
//!
//! All top-level entries must hold (AND semantics). `$and` / `$or` take a
//! list of nested selectors. Dotted paths address nested fields.
//!
//! `Selector::scoped_to` is the only way the engine builds the queries it
//! sends to the store: reserved fields are removed from the caller's
//! selector and a `doc_id ∈ ids` clause is injected.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::json::{get_at_path, json_cmp, json_eq};
use crate::types::{Document, DOC_ID_FIELD, RESERVED_SELECTOR_FIELDS};

/// Query document over annotation / metadata fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selector(Document);

impl Selector {
    /// Create an empty selector (matches all)
    pub fn new() -> Self {
        Selector(Document::new())
    }

    /// Build a selector from a JSON value
    ///
    /// `null` is treated as the empty selector; any other non-object is rejected.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Selector(map)),
            Value::Null => Ok(Selector::new()),
            other => Err(Error::InvalidSelector(format!(
                "selector must be an object, got {other}"
            ))),
        }
    }

    /// Add an equality condition
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Add an arbitrary condition (literal or operator object)
    pub fn with(mut self, field: impl Into<String>, condition: Value) -> Self {
        self.0.insert(field.into(), condition);
        self
    }

    /// Condition on `_id ∈ ids`
    pub fn ids_in<I, S>(field: &str, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: Vec<Value> = ids.into_iter().map(|s| Value::String(s.into())).collect();
        Selector::new().with(field, json!({ "$in": ids }))
    }

    /// Check if the selector is empty (matches all)
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the number of top-level conditions
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Borrow the underlying JSON object
    pub fn as_document(&self) -> &Document {
        &self.0
    }

    /// A copy of this selector restricted to the given parent documents
    ///
    /// Reserved fields (`doc_id`, the blob-handle field) are removed so a
    /// caller cannot widen or redirect the scope, then `doc_id: {$in: ids}`
    /// is injected. The receiver is left untouched.
    pub fn scoped_to<S: AsRef<str>>(&self, document_ids: &[S]) -> Selector {
        let mut scoped = self.0.clone();
        for field in RESERVED_SELECTOR_FIELDS {
            scoped.remove(field);
        }
        let ids: Vec<Value> = document_ids
            .iter()
            .map(|id| Value::String(id.as_ref().to_string()))
            .collect();
        scoped.insert(DOC_ID_FIELD.to_string(), json!({ "$in": ids }));
        Selector(scoped)
    }

    /// Check the selector for unknown operators without evaluating it
    pub fn validate(&self) -> Result<()> {
        self.matches(&Document::new()).map(|_| ())
    }

    /// Evaluate the selector against a document
    ///
    /// Returns an error for unknown operators or malformed operands.
    pub fn matches(&self, doc: &Document) -> Result<bool> {
        let root = Value::Object(doc.clone());
        matches_object(&self.0, &root)
    }
}

impl From<Document> for Selector {
    fn from(map: Document) -> Self {
        Selector(map)
    }
}

fn matches_object(selector: &Document, root: &Value) -> Result<bool> {
    // Evaluate every clause even after a miss so malformed selectors are
    // reported regardless of the data they run against.
    let mut all = true;
    for (key, condition) in selector {
        let ok = match key.as_str() {
            "$and" => {
                let mut ok = true;
                for sub in nested_selectors(key, condition)? {
                    ok &= matches_object(sub, root)?;
                }
                ok
            }
            "$or" => {
                let mut ok = false;
                for sub in nested_selectors(key, condition)? {
                    ok |= matches_object(sub, root)?;
                }
                ok
            }
            op if op.starts_with('$') => {
                return Err(Error::InvalidSelector(format!("unknown top-level operator {op}")))
            }
            path => matches_condition(get_at_path(root, path), condition)?,
        };
        all &= ok;
    }
    Ok(all)
}

fn nested_selectors<'a>(op: &str, condition: &'a Value) -> Result<Vec<&'a Document>> {
    let items = condition
        .as_array()
        .ok_or_else(|| Error::InvalidSelector(format!("{op} expects a list of selectors")))?;
    items
        .iter()
        .map(|item| {
            item.as_object()
                .ok_or_else(|| Error::InvalidSelector(format!("{op} entries must be objects")))
        })
        .collect()
}

fn is_operator_object(condition: &Value) -> bool {
    match condition {
        Value::Object(map) => !map.is_empty() && map.keys().all(|k| k.starts_with('$')),
        _ => false,
    }
}

fn matches_condition(actual: Option<&Value>, condition: &Value) -> Result<bool> {
    if !is_operator_object(condition) {
        return Ok(equals(actual, condition));
    }
    let mut all = true;
    if let Value::Object(ops) = condition {
        for (op, operand) in ops {
            all &= apply_operator(actual, op, operand)?;
        }
    }
    Ok(all)
}

/// Equality as a store applies it: an array field also matches if any of
/// its elements equals the expected value; a missing field matches `null`.
fn equals(actual: Option<&Value>, expected: &Value) -> bool {
    match actual {
        None => expected.is_null(),
        Some(value) => {
            let in_array = matches!(
                value,
                Value::Array(items) if items.iter().any(|v| json_eq(v, expected))
            );
            json_eq(value, expected) || in_array
        }
    }
}

fn ordered(actual: Option<&Value>, operand: &Value, accept: fn(Ordering) -> bool) -> bool {
    let Some(value) = actual else {
        return false;
    };
    let direct = json_cmp(value, operand).map_or(false, accept);
    direct
        || matches!(value, Value::Array(items)
            if items.iter().any(|v| json_cmp(v, operand).map_or(false, accept)))
}

fn operand_list<'a>(op: &str, operand: &'a Value) -> Result<&'a Vec<Value>> {
    operand
        .as_array()
        .ok_or_else(|| Error::InvalidSelector(format!("{op} expects a list")))
}

fn apply_operator(actual: Option<&Value>, op: &str, operand: &Value) -> Result<bool> {
    Ok(match op {
        "$eq" => equals(actual, operand),
        "$ne" => !equals(actual, operand),
        "$gt" => ordered(actual, operand, |o| o == Ordering::Greater),
        "$gte" => ordered(actual, operand, |o| o != Ordering::Less),
        "$lt" => ordered(actual, operand, |o| o == Ordering::Less),
        "$lte" => ordered(actual, operand, |o| o != Ordering::Greater),
        "$in" => operand_list(op, operand)?
            .iter()
            .any(|candidate| equals(actual, candidate)),
        "$nin" => !operand_list(op, operand)?
            .iter()
            .any(|candidate| equals(actual, candidate)),
        "$exists" => {
            let wanted = operand
                .as_bool()
                .ok_or_else(|| Error::InvalidSelector("$exists expects a boolean".into()))?;
            actual.is_some() == wanted
        }
        other => return Err(Error::InvalidSelector(format!("unknown operator {other}"))),
    })
}
