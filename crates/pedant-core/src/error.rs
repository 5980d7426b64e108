//! # Error Taxonomy — Configuration Failures vs Validation Violations
//!
//! Two disjoint error families, never mixed:
//!
//! - [`ConfigError`] — structural misconfiguration (bad tag grammar, unknown
//!   constraint names, dangling cross-field references). Always surfaced at
//!   validator construction, never deferred to validate time.
//! - [`FieldError`] / [`AggregateError`] — per-violation results of running a
//!   validator over a live instance. A validation pass collects every
//!   violation and returns them as one aggregate; it never stops at the
//!   first failure.
//!
//! ## Invariants
//!
//! - Every `FieldError` carries a stable machine code from [`crate::codes`]
//!   (or a custom predicate's own code) so callers can branch without
//!   parsing messages.
//! - `FieldError::path` is always an owned, materialized `String`. Paths are
//!   assembled in pooled scratch buffers during traversal; the moment an
//!   error is recorded the path is copied out, so no error can alias a
//!   buffer that returns to the pool.

use std::borrow::Cow;
use std::fmt;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Fatal validator misconfiguration, detected once at construction.
///
/// These never occur during `validate`/`decode` — a validator that
/// constructs successfully cannot later fail for configuration reasons.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A tag token had no constraint name (e.g. `=5` or a stray separator).
    #[error("malformed token {token:?} in tag {tag:?}")]
    MalformedToken {
        /// The full tag string being parsed.
        tag: String,
        /// The offending token.
        token: String,
    },

    /// `keys` appeared anywhere other than immediately after `dive`.
    #[error("`keys` must appear immediately after `dive` in tag {tag:?}")]
    KeysWithoutDive {
        /// The full tag string being parsed.
        tag: String,
    },

    /// `endkeys` appeared with no open `keys` block.
    #[error("`endkeys` without an open `keys` block in tag {tag:?}")]
    EndkeysWithoutKeys {
        /// The full tag string being parsed.
        tag: String,
    },

    /// A `keys` block was never closed by `endkeys`.
    #[error("unterminated `keys` block in tag {tag:?}")]
    UnterminatedKeys {
        /// The full tag string being parsed.
        tag: String,
    },

    /// `dive` appeared a second time within one tag.
    #[error("`dive` may appear at most once in tag {tag:?}")]
    NestedDive {
        /// The full tag string being parsed.
        tag: String,
    },

    /// `dive`, `keys`, or `unique` was attached to a scalar field.
    #[error("`{token}` on field `{field}` requires a collection or map, but the field is {kind}")]
    NotACollection {
        /// The reserved token or constraint name.
        token: String,
        /// The declared field name.
        field: String,
        /// Human-readable kind of the field.
        kind: String,
    },

    /// A constraint name matched neither the built-in catalog nor the
    /// custom-validator registry. Typos fail fast here instead of being
    /// silently dropped.
    #[error("unknown constraint `{name}` on field `{field}`")]
    UnknownConstraint {
        /// The unrecognized constraint name.
        name: String,
        /// The declared field name.
        field: String,
    },

    /// A known constraint was applied to a field kind it cannot check.
    #[error("constraint `{name}` is not applicable to {kind} field `{field}`")]
    KindMismatch {
        /// The constraint name.
        name: String,
        /// The declared field name.
        field: String,
        /// Human-readable kind of the field.
        kind: String,
    },

    /// A constraint parameter failed to parse for the field's kind.
    #[error("invalid parameter {param:?} for `{name}` on field `{field}`: {detail}")]
    BadParam {
        /// The constraint name.
        name: String,
        /// The declared field name.
        field: String,
        /// The raw parameter text.
        param: String,
        /// Why the parameter was rejected.
        detail: String,
    },

    /// A `pattern` constraint carried a regex that does not compile.
    #[error("malformed pattern {pattern:?} on field `{field}`: {detail}")]
    MalformedPattern {
        /// The declared field name.
        field: String,
        /// The raw pattern text.
        pattern: String,
        /// The regex compiler's diagnostic.
        detail: String,
    },

    /// A cross-field reference named a field that does not exist, or
    /// traversed through a non-struct segment.
    #[error("cross-field reference {reference:?} on field `{field}` does not resolve: {detail}")]
    UnknownFieldRef {
        /// The declared field name carrying the constraint.
        field: String,
        /// The dotted reference as written in the tag.
        reference: String,
        /// Which segment failed and why.
        detail: String,
    },

    /// A cross-field constraint resolved back to its own field.
    #[error("cross-field constraint on `{field}` references itself")]
    SelfReference {
        /// The declared field name.
        field: String,
    },

    /// `default=`/`default_fn=` declared while the validator is in relaxed
    /// mode, where the default could never apply.
    #[error("field `{field}` declares a default, but the validator is in relaxed mode")]
    DefaultInRelaxedMode {
        /// The declared field name.
        field: String,
    },

    /// `default_fn=` named a provider that is not registered.
    #[error("unknown default provider `{provider}` on field `{field}`")]
    UnknownDefaultProvider {
        /// The declared field name.
        field: String,
        /// The provider name as written in the tag.
        provider: String,
    },

    /// A field whose kind contains `Struct` was registered without a
    /// nested descriptor accessor.
    #[error("field `{field}` holds a nested struct but no nested descriptor was registered")]
    MissingNestedDescriptor {
        /// The declared field name.
        field: String,
    },

    /// Two union variants mapped the same discriminator value.
    #[error("duplicate union discriminator value {value:?}")]
    DuplicateDiscriminator {
        /// The duplicated discriminator value.
        value: String,
    },

    /// A union was built with an empty discriminator name or no variants.
    #[error("a union requires a discriminator field name and at least one variant")]
    EmptyUnion,

    /// The type graph contains a cycle, which an expanded (inline-only)
    /// schema document cannot represent.
    #[error("type `{type_name}` is recursive and cannot be rendered as an expanded schema")]
    RecursiveSchema {
        /// Fully-qualified name of the type where the cycle was detected.
        type_name: String,
    },
}

/// A single validation violation with structured context.
///
/// Serializes to the wire form `{path, code, message, value}` so error
/// payloads can be returned to API callers verbatim.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    /// Dotted path to the violating field, e.g. `customer.address.street`,
    /// `items[0].sku`, or `tags[region]`. Always an owned string.
    pub path: String,
    /// Stable machine code, e.g. `REQUIRED` or `INVALID_EMAIL`.
    pub code: Cow<'static, str>,
    /// Human-readable description of the violation.
    pub message: String,
    /// The offending value, when one exists (absent for `REQUIRED`).
    pub value: Option<Value>,
}

impl FieldError {
    /// Build a violation with a static machine code and no offending value.
    pub fn new(path: impl Into<String>, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            code: Cow::Borrowed(code),
            message: message.into(),
            value: None,
        }
    }

    /// Attach the offending value.
    #[must_use]
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "  (root): [{}] {}", self.code, self.message)
        } else {
            write!(f, "  {}: [{}] {}", self.path, self.code, self.message)
        }
    }
}

/// Composite error collecting every independent violation from one
/// validation pass.
///
/// Callers see either success or exactly one `AggregateError` — there is no
/// separate warning channel, and no violation is ever reported alone while
/// others are suppressed.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct AggregateError {
    errors: Vec<FieldError>,
}

impl AggregateError {
    /// Wrap a non-empty violation list.
    pub fn new(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }

    /// Returns the number of violations.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns true if there are no violations.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns a slice of all violations, in traversal order.
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Consumes self and returns the inner Vec.
    pub fn into_inner(self) -> Vec<FieldError> {
        self.errors
    }

    /// Returns the violations recorded against one exact path.
    pub fn at_path<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a FieldError> {
        self.errors.iter().filter(move |e| e.path == path)
    }

    /// Returns true if any violation carries the given machine code.
    pub fn has_code(&self, code: &str) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "validation failed with {} violation(s):", self.errors.len())?;
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes;

    #[test]
    fn test_field_error_display_includes_code_and_path() {
        let e = FieldError::new("customer.email", codes::INVALID_EMAIL, "must be a valid email");
        let rendered = e.to_string();
        assert!(rendered.contains("customer.email"));
        assert!(rendered.contains("INVALID_EMAIL"));
    }

    #[test]
    fn test_aggregate_display_lists_every_violation() {
        let agg = AggregateError::new(vec![
            FieldError::new("a", codes::REQUIRED, "is required"),
            FieldError::new("b", codes::MIN, "too small"),
        ]);
        let rendered = agg.to_string();
        assert!(rendered.contains("2 violation(s)"));
        assert!(rendered.contains("REQUIRED"));
        assert!(rendered.contains("MIN"));
    }

    #[test]
    fn test_aggregate_lookup_helpers() {
        let agg = AggregateError::new(vec![
            FieldError::new("a", codes::REQUIRED, "is required"),
            FieldError::new("a", codes::MIN, "too small"),
            FieldError::new("b", codes::MAX, "too large"),
        ]);
        assert_eq!(agg.at_path("a").count(), 2);
        assert!(agg.has_code(codes::MAX));
        assert!(!agg.has_code(codes::INVALID_URL));
    }

    #[test]
    fn test_config_error_messages_name_the_field() {
        let e = ConfigError::UnknownConstraint {
            name: "emial".into(),
            field: "contact".into(),
        };
        assert!(e.to_string().contains("emial"));
        assert!(e.to_string().contains("contact"));
    }
}
