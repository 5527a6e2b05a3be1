//! JSON-Patch layer for page content mutations.
//!
//! Every edit to a draft schema, whether it comes from the visual editor or
//! from the chat assistant, goes through [`validate`] before it is applied.
//! The allowlist keeps patches inside the content tree so a batch can never
//! rewrite structural record fields, and the size caps bound how much a
//! single batch can change.
//!
//! Only `add`, `replace` and `remove` are supported; `move`/`copy`/`test`
//! from RFC 6902 are not accepted by the validator and not implemented.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Maximum operations in a single batch.
pub const MAX_OPS_PER_BATCH: usize = 40;

/// Maximum serialized size of a batch, in bytes (25 KiB).
pub const MAX_BATCH_BYTES: usize = 25 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOpKind {
    Add,
    Replace,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOp {
    pub op: PatchOpKind,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl PatchOp {
    pub fn add(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: PatchOpKind::Add,
            path: path.into(),
            value: Some(value),
        }
    }

    pub fn replace(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: PatchOpKind::Replace,
            path: path.into(),
            value: Some(value),
        }
    }

    pub fn remove(path: impl Into<String>) -> Self {
        Self {
            op: PatchOpKind::Remove,
            path: path.into(),
            value: None,
        }
    }
}

/// Outcome of validating a batch. Collects every violation, not just the
/// first, so the caller can surface all of them at once.
#[derive(Debug, Clone, Default)]
pub struct PatchValidation {
    pub errors: Vec<String>,
}

impl PatchValidation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("patch batch rejected: {}", .0.join("; "))]
    Rejected(Vec<String>),

    #[error("failed to apply patch: {0}")]
    Apply(String),
}

/// Path shapes a patch is allowed to touch. Grown organically alongside the
/// editor surface; treat as configuration rather than a hard security
/// boundary.
fn allowed_paths() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"^/content/.+$",
            r"^/seo/.+$",
            r"^/nav/items(/.+)?$",
            r"^/translations/.+$",
            r"^/ui/.+$",
            r"^/meta/.+$",
            r"^/layout$",
            r"^/sections(/.+)?$",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("allowlist pattern is valid"))
        .collect()
    })
}

fn path_allowed(path: &str) -> bool {
    allowed_paths().iter().any(|re| re.is_match(path))
}

/// Validate a raw patch batch before it touches any document.
///
/// Operates on untyped JSON so that malformed input (non-array batch,
/// non-object ops, missing or mistyped members) is reported as a validation
/// error rather than a deserialization failure. An empty batch is trivially
/// valid.
pub fn validate(batch: &Value) -> PatchValidation {
    let mut validation = PatchValidation::default();

    let Some(ops) = batch.as_array() else {
        validation.errors.push("patch batch must be an array".to_string());
        return validation;
    };

    if ops.len() > MAX_OPS_PER_BATCH {
        validation.errors.push(format!(
            "batch has {} operations, maximum is {}",
            ops.len(),
            MAX_OPS_PER_BATCH
        ));
    }

    let byte_size = batch.to_string().len();
    if byte_size > MAX_BATCH_BYTES {
        validation.errors.push(format!(
            "batch is {} bytes, maximum is {}",
            byte_size, MAX_BATCH_BYTES
        ));
    }

    for (i, raw) in ops.iter().enumerate() {
        let Some(op) = raw.as_object() else {
            validation
                .errors
                .push(format!("op {}: not an object", i));
            continue;
        };

        match op.get("op").and_then(Value::as_str) {
            Some("add") | Some("replace") | Some("remove") => {}
            Some(other) => validation
                .errors
                .push(format!("op {}: unsupported op \"{}\"", i, other)),
            None => validation
                .errors
                .push(format!("op {}: missing op member", i)),
        }

        match op.get("path").and_then(Value::as_str) {
            Some(path) if path_allowed(path) => {}
            Some(path) => validation
                .errors
                .push(format!("op {}: path not allowed: {}", i, path)),
            None => validation
                .errors
                .push(format!("op {}: path must be a string", i)),
        }
    }

    validation
}

/// Validate, then apply against a deep copy of `doc`.
///
/// Fails closed: any violation rejects the whole batch and `doc` is never
/// touched. On success returns the patched copy.
pub fn apply_with_validation(doc: &Value, batch: &Value) -> Result<Value, PatchError> {
    let validation = validate(batch);
    if !validation.is_valid() {
        return Err(PatchError::Rejected(validation.errors));
    }

    let ops: Vec<PatchOp> = serde_json::from_value(batch.clone())
        .map_err(|e| PatchError::Rejected(vec![format!("malformed patch batch: {}", e)]))?;

    apply(doc, &ops)
}

/// Apply a typed batch against a deep copy of `doc`. All-or-nothing: the
/// first failing op aborts and the original document stays unchanged.
pub fn apply(doc: &Value, ops: &[PatchOp]) -> Result<Value, PatchError> {
    let mut out = doc.clone();
    for op in ops {
        apply_one(&mut out, op)?;
    }
    Ok(out)
}

fn unescape_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

fn apply_one(doc: &mut Value, op: &PatchOp) -> Result<(), PatchError> {
    // Whole-document replace; diffs produced by `diff` can target the root.
    if op.path.is_empty() {
        return match op.op {
            PatchOpKind::Replace => {
                *doc = op
                    .value
                    .clone()
                    .ok_or_else(|| PatchError::Apply("replace requires a value".to_string()))?;
                Ok(())
            }
            _ => Err(PatchError::Apply(format!(
                "cannot {:?} the document root",
                op.op
            ))),
        };
    }

    if !op.path.starts_with('/') {
        return Err(PatchError::Apply(format!(
            "path must start with '/': {}",
            op.path
        )));
    }

    let tokens: Vec<String> = op.path[1..].split('/').map(unescape_token).collect();
    let (last, parents) = tokens.split_last().expect("path has at least one token");

    let mut target = &mut *doc;
    for token in parents {
        target = match target {
            Value::Object(map) => map.get_mut(token).ok_or_else(|| {
                PatchError::Apply(format!("path not found: {}", op.path))
            })?,
            Value::Array(items) => {
                let idx: usize = token.parse().map_err(|_| {
                    PatchError::Apply(format!("invalid array index in {}", op.path))
                })?;
                items.get_mut(idx).ok_or_else(|| {
                    PatchError::Apply(format!("index out of bounds in {}", op.path))
                })?
            }
            _ => {
                return Err(PatchError::Apply(format!(
                    "cannot traverse into scalar at {}",
                    op.path
                )))
            }
        };
    }

    match target {
        Value::Object(map) => apply_to_object(map, last, op),
        Value::Array(items) => apply_to_array(items, last, op),
        _ => Err(PatchError::Apply(format!(
            "cannot mutate scalar parent at {}",
            op.path
        ))),
    }
}

fn apply_to_object(map: &mut Map<String, Value>, key: &str, op: &PatchOp) -> Result<(), PatchError> {
    match op.op {
        PatchOpKind::Add => {
            let value = op
                .value
                .clone()
                .ok_or_else(|| PatchError::Apply("add requires a value".to_string()))?;
            map.insert(key.to_string(), value);
            Ok(())
        }
        PatchOpKind::Replace => {
            let value = op
                .value
                .clone()
                .ok_or_else(|| PatchError::Apply("replace requires a value".to_string()))?;
            if !map.contains_key(key) {
                return Err(PatchError::Apply(format!("path not found: {}", op.path)));
            }
            map.insert(key.to_string(), value);
            Ok(())
        }
        PatchOpKind::Remove => {
            map.remove(key)
                .map(|_| ())
                .ok_or_else(|| PatchError::Apply(format!("path not found: {}", op.path)))
        }
    }
}

fn apply_to_array(items: &mut Vec<Value>, token: &str, op: &PatchOp) -> Result<(), PatchError> {
    match op.op {
        PatchOpKind::Add => {
            let value = op
                .value
                .clone()
                .ok_or_else(|| PatchError::Apply("add requires a value".to_string()))?;
            if token == "-" {
                items.push(value);
                return Ok(());
            }
            let idx: usize = token
                .parse()
                .map_err(|_| PatchError::Apply(format!("invalid array index in {}", op.path)))?;
            if idx > items.len() {
                return Err(PatchError::Apply(format!(
                    "index out of bounds in {}",
                    op.path
                )));
            }
            items.insert(idx, value);
            Ok(())
        }
        PatchOpKind::Replace => {
            let value = op
                .value
                .clone()
                .ok_or_else(|| PatchError::Apply("replace requires a value".to_string()))?;
            let idx: usize = token
                .parse()
                .map_err(|_| PatchError::Apply(format!("invalid array index in {}", op.path)))?;
            let slot = items.get_mut(idx).ok_or_else(|| {
                PatchError::Apply(format!("index out of bounds in {}", op.path))
            })?;
            *slot = value;
            Ok(())
        }
        PatchOpKind::Remove => {
            let idx: usize = token
                .parse()
                .map_err(|_| PatchError::Apply(format!("invalid array index in {}", op.path)))?;
            if idx >= items.len() {
                return Err(PatchError::Apply(format!(
                    "index out of bounds in {}",
                    op.path
                )));
            }
            items.remove(idx);
            Ok(())
        }
    }
}

/// Structural diff from `old` to `new`, as a patch batch that [`apply`]
/// turns `old` into `new` with.
///
/// Recurses into objects; scalars and arrays that differ are replaced
/// wholesale. Used for history entries and for revert, so it favors small
/// readable batches over minimal array edit scripts.
pub fn diff(old: &Value, new: &Value) -> Vec<PatchOp> {
    let mut ops = Vec::new();
    diff_at(old, new, String::new(), &mut ops);
    ops
}

fn diff_at(old: &Value, new: &Value, path: String, ops: &mut Vec<PatchOp>) {
    if old == new {
        return;
    }
    match (old, new) {
        (Value::Object(old_map), Value::Object(new_map)) => {
            for key in old_map.keys() {
                if !new_map.contains_key(key) {
                    ops.push(PatchOp::remove(format!("{}/{}", path, escape_token(key))));
                }
            }
            for (key, new_value) in new_map {
                let child_path = format!("{}/{}", path, escape_token(key));
                match old_map.get(key) {
                    Some(old_value) => diff_at(old_value, new_value, child_path, ops),
                    None => ops.push(PatchOp::add(child_path, new_value.clone())),
                }
            }
        }
        _ => ops.push(PatchOp::replace(path, new.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_doc() -> Value {
        json!({
            "content": {
                "hero": { "title": "Hello", "subtitle": "World" },
                "body": ["a", "b"]
            },
            "seo": { "description": "old" },
            "id": "do-not-touch"
        })
    }

    #[test]
    fn test_empty_batch_is_valid() {
        let v = validate(&json!([]));
        assert!(v.is_valid());
        assert!(v.errors.is_empty());
    }

    #[test]
    fn test_valid_batch_passes() {
        let batch = json!([
            { "op": "replace", "path": "/content/hero/title", "value": "Hi" },
            { "op": "add", "path": "/seo/keywords", "value": ["cms"] },
            { "op": "remove", "path": "/nav/items/0" },
            { "op": "replace", "path": "/layout", "value": "wide" },
        ]);
        let v = validate(&batch);
        assert!(v.is_valid(), "unexpected errors: {:?}", v.errors);
    }

    #[test]
    fn test_non_array_batch_rejected() {
        let v = validate(&json!({"op": "add"}));
        assert!(!v.is_valid());
        assert_eq!(v.errors.len(), 1);
    }

    #[test]
    fn test_unsupported_op_rejected() {
        let batch = json!([
            { "op": "move", "from": "/content/a", "path": "/content/b" },
            { "op": "test", "path": "/content/a", "value": 1 },
        ]);
        let v = validate(&batch);
        assert_eq!(v.errors.len(), 2);
    }

    #[test]
    fn test_disallowed_paths_report_one_error_each() {
        let batch = json!([
            { "op": "replace", "path": "/id", "value": "evil" },
            { "op": "remove", "path": "/history" },
            { "op": "replace", "path": "/content/ok", "value": 1 },
        ]);
        let v = validate(&batch);
        assert_eq!(v.errors.len(), 2);
        assert!(v.errors[0].contains("/id"));
        assert!(v.errors[1].contains("/history"));
    }

    #[test]
    fn test_non_string_path_rejected() {
        let batch = json!([{ "op": "add", "path": 42, "value": 1 }]);
        let v = validate(&batch);
        assert_eq!(v.errors.len(), 1);
        assert!(v.errors[0].contains("path must be a string"));
    }

    #[test]
    fn test_too_many_ops_rejected() {
        let ops: Vec<Value> = (0..41)
            .map(|i| json!({ "op": "replace", "path": format!("/content/n{}", i), "value": i }))
            .collect();
        let v = validate(&Value::Array(ops));
        assert!(!v.is_valid());
        assert!(v.errors.iter().any(|e| e.contains("41 operations")));
    }

    #[test]
    fn test_oversized_batch_rejected() {
        let blob = "x".repeat(MAX_BATCH_BYTES);
        let batch = json!([{ "op": "replace", "path": "/content/big", "value": blob }]);
        let v = validate(&batch);
        assert!(v.errors.iter().any(|e| e.contains("bytes")));
    }

    #[test]
    fn test_nav_items_scoping() {
        assert!(path_allowed("/nav/items"));
        assert!(path_allowed("/nav/items/2/label"));
        assert!(!path_allowed("/nav"));
        assert!(!path_allowed("/nav/style"));
    }

    #[test]
    fn test_apply_replace_nested() {
        let doc = sample_doc();
        let out = apply(
            &doc,
            &[PatchOp::replace("/content/hero/title", json!("Hi"))],
        )
        .unwrap();
        assert_eq!(out["content"]["hero"]["title"], "Hi");
        // input untouched
        assert_eq!(doc["content"]["hero"]["title"], "Hello");
    }

    #[test]
    fn test_apply_add_and_remove_in_array() {
        let doc = sample_doc();
        let out = apply(
            &doc,
            &[
                PatchOp::add("/content/body/-", json!("c")),
                PatchOp::remove("/content/body/0"),
            ],
        )
        .unwrap();
        assert_eq!(out["content"]["body"], json!(["b", "c"]));
    }

    #[test]
    fn test_apply_replace_missing_key_fails() {
        let doc = sample_doc();
        let err = apply(&doc, &[PatchOp::replace("/content/nope", json!(1))]).unwrap_err();
        assert!(matches!(err, PatchError::Apply(_)));
    }

    #[test]
    fn test_apply_pointer_escapes() {
        let doc = json!({ "content": { "a/b": 1, "c~d": 2 } });
        let out = apply(&doc, &[PatchOp::remove("/content/a~1b")]).unwrap();
        assert_eq!(out, json!({ "content": { "c~d": 2 } }));
        let out = apply(&doc, &[PatchOp::replace("/content/c~0d", json!(3))]).unwrap();
        assert_eq!(out["content"]["c~d"], 3);
    }

    #[test]
    fn test_apply_with_validation_rejects_disallowed_path() {
        let doc = sample_doc();
        let batch = json!([{ "op": "replace", "path": "/id", "value": "evil" }]);
        let err = apply_with_validation(&doc, &batch).unwrap_err();
        match err {
            PatchError::Rejected(errors) => {
                assert_eq!(errors.len(), 1);
                assert!(errors[0].contains("/id"));
            }
            other => panic!("expected Rejected, got {:?}", other),
        }
        assert_eq!(doc, sample_doc());
    }

    #[test]
    fn test_apply_with_validation_applies_valid_batch() {
        let doc = sample_doc();
        let batch = json!([{ "op": "replace", "path": "/content/hero/title", "value": "Hi" }]);
        let out = apply_with_validation(&doc, &batch).unwrap();
        assert_eq!(out["content"]["hero"]["title"], "Hi");
        assert_eq!(doc, sample_doc());
    }

    #[test]
    fn test_diff_equal_documents_is_empty() {
        let doc = sample_doc();
        assert!(diff(&doc, &doc).is_empty());
    }

    #[test]
    fn test_diff_single_field_change() {
        let old = sample_doc();
        let mut new = old.clone();
        new["content"]["hero"]["title"] = json!("Hi");
        let ops = diff(&old, &new);
        assert_eq!(ops, vec![PatchOp::replace("/content/hero/title", json!("Hi"))]);
    }

    #[test]
    fn test_diff_roundtrips_through_apply() {
        let old = json!({ "content": { "hero": { "title": "Hello" }, "list": [1, 2] } });
        let new = json!({ "content": { "hero": { "tagline": "New" }, "list": [3] }, "seo": {} });
        let ops = diff(&old, &new);
        let rebuilt = apply(&old, &ops).unwrap();
        assert_eq!(rebuilt, new);
    }

    #[test]
    fn test_diff_escapes_keys() {
        let old = json!({ "a/b": 1 });
        let new = json!({ "a/b": 2 });
        let ops = diff(&old, &new);
        assert_eq!(ops, vec![PatchOp::replace("/a~1b", json!(2))]);
        assert_eq!(apply(&old, &ops).unwrap(), new);
    }
}
