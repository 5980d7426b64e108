//! # Deserializer — Two-Phase JSON Decode With Presence Semantics
//!
//! Rust's zero values cannot distinguish "the key was missing" from "the
//! key was present with a zero value". The strict pipeline therefore
//! decodes in two phases:
//!
//! 1. Parse the payload into a `serde_json::Value` tree, capturing textual
//!    presence per declared field as `Absent | Null | Present`.
//! 2. Walk declared fields against that tree: absent fields receive, in
//!    order, their static `default=` literal, else their registered
//!    `default_fn=` provider value, else a `REQUIRED` violation if so
//!    tagged, else stay absent (the type's own zero/`None`). String fields
//!    are normalized — trim first, then case — after assignment or default
//!    resolution. Declared kinds are pre-checked against the tree so type
//!    mismatches surface as per-field violations with exact paths.
//!
//! Only then does one typed `serde_json::from_value` conversion run, and
//! the full predicate/cross-field/self-validation pipeline always follows
//! before the instance is returned.
//!
//! Relaxed mode is a single-pass decode: no presence walk, no defaults
//! (declaring one is rejected at construction), predicates only.
//!
//! The optional unknown-field policy rejects every unrecognized key —
//! top-level and nested — as one aggregate before any structural decoding.

use chrono::DateTime;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use pedant_core::codes;
use pedant_core::error::{AggregateError, FieldError};
use pedant_core::pool::{self, Scratch};
use pedant_core::reflect::{Described, FieldKind, Reflect};

use crate::cache::{CachedField, Case, FieldCache};
use crate::validate::{Mode, Options, Validator};

/// Per-field textual presence in the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// The key did not occur.
    Absent,
    /// The key occurred with an explicit `null`.
    Null,
    /// The key occurred with a value.
    Present,
}

impl Presence {
    fn of(map: &Map<String, Value>, key: &str) -> Self {
        match map.get(key) {
            None => Presence::Absent,
            Some(Value::Null) => Presence::Null,
            Some(_) => Presence::Present,
        }
    }
}

impl<T: Described + Reflect + DeserializeOwned> Validator<T> {
    /// Decode JSON bytes into a validated `T`.
    ///
    /// # Errors
    ///
    /// One [`AggregateError`] per call: a single `INVALID_JSON` entry for
    /// malformed bytes, `UNKNOWN_FIELD` entries under the unknown-field
    /// policy, presence-phase violations (`REQUIRED`, `TYPE_MISMATCH`,
    /// `DEFAULT_PROVIDER_FAILED`), or the post-decode validation
    /// aggregate.
    pub fn from_slice(&self, bytes: &[u8]) -> Result<T, AggregateError> {
        let value: Value = serde_json::from_slice(bytes).map_err(|e| {
            AggregateError::new(vec![FieldError::new(
                "",
                codes::INVALID_JSON,
                format!("payload is not valid JSON: {e}"),
            )])
        })?;
        self.from_value(value)
    }

    /// Decode an already-parsed JSON tree into a validated `T`.
    ///
    /// # Errors
    ///
    /// See [`Validator::from_slice`].
    pub fn from_value(&self, value: Value) -> Result<T, AggregateError> {
        let prepared = prepare_value(&self.cache, &self.options, value)?;
        let instance: T = serde_json::from_value(prepared).map_err(|e| {
            AggregateError::new(vec![FieldError::new(
                "",
                codes::TYPE_MISMATCH,
                format!("payload does not decode: {e}"),
            )])
        })?;
        self.validate(&instance)?;
        Ok(instance)
    }
}

impl<T: Described + Reflect + Serialize> Validator<T> {
    /// Validate, then encode to JSON bytes. Predicate validation always
    /// runs before encoding; an instance that does not validate is never
    /// serialized.
    ///
    /// # Errors
    ///
    /// The validation aggregate, or a single `CUSTOM` entry if
    /// serialization itself fails.
    pub fn to_vec(&self, instance: &T) -> Result<Vec<u8>, AggregateError> {
        self.validate(instance)?;
        serde_json::to_vec(instance).map_err(|e| {
            AggregateError::new(vec![FieldError::new(
                "",
                codes::CUSTOM,
                format!("serialization failed: {e}"),
            )])
        })
    }
}

/// Run the pre-decode phases over the raw tree: the unknown-field walk
/// (when enabled) and, in strict mode, the presence/default/normalization
/// pass. Returns the patched tree ready for one typed conversion.
pub(crate) fn prepare_value(
    cache: &FieldCache,
    options: &Options,
    mut value: Value,
) -> Result<Value, AggregateError> {
    if options.deny_unknown_fields {
        let mut scratch = pool::global().checkout();
        reject_unknown_fields(cache, &value, &mut scratch);
        let errors = scratch.take_errors();
        if !errors.is_empty() {
            return Err(AggregateError::new(errors));
        }
    }

    if options.mode == Mode::Strict {
        let mut scratch = pool::global().checkout();
        presence_pass(cache, &mut value, &mut scratch);
        let errors = scratch.take_errors();
        if !errors.is_empty() {
            return Err(AggregateError::new(errors));
        }
    }

    Ok(value)
}

fn presence_pass(cache: &FieldCache, value: &mut Value, scratch: &mut Scratch) {
    let Value::Object(map) = value else {
        scratch.record(
            codes::TYPE_MISMATCH,
            format!("expected an object, got {}", json_kind(value)),
            Some(value.clone()),
        );
        return;
    };

    for field in cache.fields() {
        let key = field.json_name;
        let mark = scratch.enter_field(key);

        if Presence::of(map, key) == Presence::Absent {
            if let Some(default) = &field.decode.default {
                map.insert(key.to_string(), default.clone());
            } else if let Some((name, provider)) = &field.decode.provider {
                match provider() {
                    Ok(v) => {
                        map.insert(key.to_string(), v);
                    }
                    Err(reason) => {
                        scratch.record(
                            codes::DEFAULT_PROVIDER_FAILED,
                            format!("default provider `{name}` failed: {reason}"),
                            None,
                        );
                    }
                }
            } else if field.required {
                scratch.record(codes::REQUIRED, "is required", None);
            }
        }

        if field.decode.normalizes() {
            if let Some(Value::String(s)) = map.get_mut(key) {
                normalize_string(s, field);
            }
        }

        if let Some(present) = map.get_mut(key) {
            verify_and_recurse(field, &field.kind, present, scratch);
        }

        scratch.leave(mark);
    }
}

fn normalize_string(s: &mut String, field: &CachedField) {
    if field.decode.trim {
        let trimmed = s.trim().to_string();
        *s = trimmed;
    }
    match field.decode.case {
        Some(Case::Lower) => *s = s.to_lowercase(),
        Some(Case::Upper) => *s = s.to_uppercase(),
        None => {}
    }
}

fn verify_and_recurse(
    field: &CachedField,
    kind: &FieldKind,
    value: &mut Value,
    scratch: &mut Scratch,
) {
    if value.is_null() {
        // Explicit null is "present"; it satisfies requiredness but must
        // land on an optional kind.
        if !kind.is_optional() {
            scratch.record(
                codes::TYPE_MISMATCH,
                format!("expected {}, got null", kind.label()),
                None,
            );
        }
        return;
    }

    match kind.base() {
        FieldKind::Struct => match value {
            Value::Object(_) => {
                if let Some(nested) = &field.nested {
                    match nested.get() {
                        Ok(nested_cache) => presence_pass(nested_cache, value, scratch),
                        Err(e) => scratch.record(
                            codes::CUSTOM,
                            format!("nested validator unavailable: {e}"),
                            None,
                        ),
                    }
                }
            }
            other => record_mismatch(scratch, kind, other),
        },
        FieldKind::List(element_kind) => match value {
            Value::Array(items) => {
                for (i, item) in items.iter_mut().enumerate() {
                    let mark = scratch.enter_index(i);
                    verify_and_recurse(field, element_kind, item, scratch);
                    scratch.leave(mark);
                }
            }
            other => record_mismatch(scratch, kind, other),
        },
        FieldKind::Map(element_kind) => match value {
            Value::Object(entries) => {
                let keys: Vec<String> = entries.keys().cloned().collect();
                for key in keys {
                    let mark = scratch.enter_key(&key);
                    if let Some(entry) = entries.get_mut(&key) {
                        verify_and_recurse(field, element_kind, entry, scratch);
                    }
                    scratch.leave(mark);
                }
            }
            other => record_mismatch(scratch, kind, other),
        },
        scalar => {
            if !scalar_matches(scalar, value) {
                record_mismatch(scratch, kind, value);
            }
        }
    }
}

fn scalar_matches(kind: &FieldKind, value: &Value) -> bool {
    match kind {
        FieldKind::Str => value.is_string(),
        FieldKind::Int => value.as_i64().is_some(),
        FieldKind::UInt => value.as_u64().is_some(),
        FieldKind::Float => value.is_number(),
        FieldKind::Bool => value.is_boolean(),
        FieldKind::DateTime => value
            .as_str()
            .map(|s| DateTime::parse_from_rfc3339(s).is_ok())
            .unwrap_or(false),
        FieldKind::Uuid => value.as_str().map(|s| Uuid::parse_str(s).is_ok()).unwrap_or(false),
        _ => true,
    }
}

fn record_mismatch(scratch: &mut Scratch, kind: &FieldKind, value: &Value) {
    scratch.record(
        codes::TYPE_MISMATCH,
        format!("expected {}, got {}", kind.label(), json_kind(value)),
        Some(value.clone()),
    );
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn reject_unknown_fields(cache: &FieldCache, value: &Value, scratch: &mut Scratch) {
    let Value::Object(map) = value else { return };
    for (key, entry) in map {
        match cache.descriptor().field_by_json_name(key) {
            None => {
                let mark = scratch.enter_field(key);
                scratch.record(codes::UNKNOWN_FIELD, "unrecognized field", None);
                scratch.leave(mark);
            }
            Some((index, _)) => {
                let field = &cache.fields()[index];
                let Some(nested) = &field.nested else { continue };
                let Ok(nested_cache) = nested.get() else { continue };
                let mark = scratch.enter_field(key);
                match (field.kind.base(), entry) {
                    (FieldKind::Struct, Value::Object(_)) => {
                        reject_unknown_fields(nested_cache, entry, scratch);
                    }
                    (FieldKind::List(_), Value::Array(items)) => {
                        for (i, item) in items.iter().enumerate() {
                            let m = scratch.enter_index(i);
                            reject_unknown_fields(nested_cache, item, scratch);
                            scratch.leave(m);
                        }
                    }
                    (FieldKind::Map(_), Value::Object(entries)) => {
                        for (k, v) in entries {
                            let m = scratch.enter_key(k);
                            reject_unknown_fields(nested_cache, v, scratch);
                            scratch.leave(m);
                        }
                    }
                    _ => {}
                }
                scratch.leave(mark);
            }
        }
    }
}
