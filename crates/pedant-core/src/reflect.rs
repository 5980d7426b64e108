//! # Field Reflection Model — Explicit One-Time Type Registration
//!
//! The engine needs to see a struct's fields generically: their declared
//! kinds, their constraint tags, and their live values. Instead of runtime
//! reflection, each participating type registers a [`TypeDescriptor`] once
//! (built inside a `OnceCell` static) and implements [`Reflect`] to expose
//! field values as borrowed [`FieldView`]s.
//!
//! ## Design
//!
//! - [`Described`] is the static side: one descriptor per type, fully
//!   qualified name included, built exactly once.
//! - [`Reflect`] is the instance side: index-based field access returning
//!   views that borrow from the instance. `Option::None` surfaces as
//!   [`FieldView::Absent`] — the optional-field skip semantics fall out of
//!   the type system rather than pointer checks.
//! - Descriptors are immutable after construction and shared by reference
//!   for the process lifetime; unlimited concurrent readers need no locks.
//!
//! ## Invariants
//!
//! - `Reflect::field(i)` must agree with `descriptor().fields()[i]` on kind
//!   and ordering for every `i`. The engine trusts this correspondence.
//! - `type_name` must be fully qualified (`module::Type`). Schema
//!   definitions tables are keyed by it, so two distinct registered types
//!   must never share one.

use std::any::Any;
use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::error::FieldError;

/// Declared kind of a field, as registered in its [`FieldSpec`].
///
/// `Optional` wraps any other kind; the engine strips it when selecting
/// constraint semantics (an `Optional(Str)` field takes string constraints).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// UTF-8 string.
    Str,
    /// Signed integer (any width, widened to `i64`).
    Int,
    /// Unsigned integer (any width, widened to `u64`).
    UInt,
    /// Floating point number.
    Float,
    /// Boolean.
    Bool,
    /// UTC timestamp.
    DateTime,
    /// UUID identifier.
    Uuid,
    /// Nested struct; the owning [`FieldSpec`] carries the descriptor.
    Struct,
    /// Ordered sequence of the inner kind.
    List(Box<FieldKind>),
    /// String-keyed map to the inner kind.
    Map(Box<FieldKind>),
    /// `Option` of the inner kind; absent values skip validation.
    Optional(Box<FieldKind>),
}

impl FieldKind {
    /// Strips any `Optional` wrapper, yielding the kind constraints apply to.
    pub fn base(&self) -> &FieldKind {
        match self {
            FieldKind::Optional(inner) => inner.base(),
            other => other,
        }
    }

    /// True if the field may legitimately be absent.
    pub fn is_optional(&self) -> bool {
        matches!(self, FieldKind::Optional(_))
    }

    /// True for kinds where `min`/`max`/`len` bound a length.
    pub fn is_lengthy(&self) -> bool {
        matches!(self.base(), FieldKind::Str | FieldKind::List(_) | FieldKind::Map(_))
    }

    /// True for kinds where `min`/`max` bound a numeric value.
    pub fn is_numeric(&self) -> bool {
        matches!(self.base(), FieldKind::Int | FieldKind::UInt | FieldKind::Float)
    }

    /// True for kinds `dive`/`unique` can iterate.
    pub fn is_collection(&self) -> bool {
        matches!(self.base(), FieldKind::List(_) | FieldKind::Map(_))
    }

    /// True if the base kind is a map.
    pub fn is_map(&self) -> bool {
        matches!(self.base(), FieldKind::Map(_))
    }

    /// Element kind of a list, or value kind of a map.
    pub fn element(&self) -> Option<&FieldKind> {
        match self.base() {
            FieldKind::List(inner) | FieldKind::Map(inner) => Some(inner),
            _ => None,
        }
    }

    /// Human-readable label used in configuration error messages.
    pub fn label(&self) -> &'static str {
        match self {
            FieldKind::Str => "a string",
            FieldKind::Int => "a signed integer",
            FieldKind::UInt => "an unsigned integer",
            FieldKind::Float => "a float",
            FieldKind::Bool => "a boolean",
            FieldKind::DateTime => "a timestamp",
            FieldKind::Uuid => "a uuid",
            FieldKind::Struct => "a nested struct",
            FieldKind::List(_) => "a list",
            FieldKind::Map(_) => "a map",
            FieldKind::Optional(inner) => inner.label(),
        }
    }
}

/// Declaration of one field: name, kind, constraint tag, and (for struct
/// positions) the nested type's descriptor accessor.
#[derive(Clone)]
pub struct FieldSpec {
    name: &'static str,
    rename: Option<&'static str>,
    kind: FieldKind,
    tag: &'static str,
    nested: Option<fn() -> &'static TypeDescriptor>,
}

impl FieldSpec {
    /// Declare a field with its Rust name and kind. Constraints and payload
    /// renames are attached with the builder methods.
    pub fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, rename: None, kind, tag: "", nested: None }
    }

    /// Attach the constraint tag string (parsed once at engine build).
    #[must_use]
    pub fn tag(mut self, tag: &'static str) -> Self {
        self.tag = tag;
        self
    }

    /// Use a different key in JSON payloads and schema documents.
    #[must_use]
    pub fn rename(mut self, rename: &'static str) -> Self {
        self.rename = Some(rename);
        self
    }

    /// Register the nested type's descriptor accessor. Required whenever
    /// `Struct` appears anywhere in this field's kind.
    #[must_use]
    pub fn nested(mut self, nested: fn() -> &'static TypeDescriptor) -> Self {
        self.nested = Some(nested);
        self
    }

    /// The Rust field name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The key used in JSON payloads: the rename if set, else the name.
    pub fn json_name(&self) -> &'static str {
        self.rename.unwrap_or(self.name)
    }

    /// The declared kind.
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// The raw constraint tag string.
    pub fn raw_tag(&self) -> &'static str {
        self.tag
    }

    /// The nested descriptor, if this field holds structs anywhere.
    pub fn nested_descriptor(&self) -> Option<&'static TypeDescriptor> {
        self.nested.map(|f| f())
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("tag", &self.tag)
            .finish()
    }
}

/// Immutable description of a registered type: fully-qualified name plus
/// ordered field declarations.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    type_name: &'static str,
    fields: Vec<FieldSpec>,
}

impl TypeDescriptor {
    /// Start a descriptor for the given fully-qualified type name.
    pub fn new(type_name: &'static str) -> Self {
        Self { type_name, fields: Vec::new() }
    }

    /// Append a field declaration. Order must match `Reflect::field` indices.
    #[must_use]
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// The fully-qualified type name, e.g. `orders::LineItem`.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Short type name: the last `::` segment.
    pub fn short_name(&self) -> &'static str {
        self.type_name.rsplit("::").next().unwrap_or(self.type_name)
    }

    /// All field declarations, in registration order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Index of the field with the given Rust name.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// The field matching a JSON payload key.
    pub fn field_by_json_name(&self, key: &str) -> Option<(usize, &FieldSpec)> {
        self.fields
            .iter()
            .enumerate()
            .find(|(_, f)| f.json_name() == key)
    }
}

/// Static side of registration: one shared descriptor per type.
///
/// Implementations build the descriptor inside a `once_cell::sync::OnceCell`
/// static so the construction cost is paid exactly once per process.
pub trait Described {
    /// The type's shared descriptor.
    fn descriptor() -> &'static TypeDescriptor;
}

/// Instance side of registration: index-based access to live field values.
pub trait Reflect: Send + Sync + 'static {
    /// Borrowed view of field `index`, in descriptor order.
    ///
    /// Out-of-range indices return [`FieldView::Absent`]; the engine never
    /// asks for them.
    fn field(&self, index: usize) -> FieldView<'_>;

    /// Upcast for variant downcasting after union dispatch.
    fn as_any(&self) -> &dyn Any;

    /// Owned upcast; implementations return `self`.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    /// Self-validation hook, invoked after every declarative constraint.
    ///
    /// Violations pushed here are merged non-fatally into the same
    /// aggregate the declarative pipeline produces. The default does
    /// nothing.
    fn validate_extra(&self, _errors: &mut Vec<FieldError>) {}
}

/// Borrowed view of one field value.
///
/// Scalar variants copy the value; `Str`, `List`, `Map`, and `Struct`
/// borrow from the instance being validated.
pub enum FieldView<'a> {
    /// `Option::None` — the field is absent and validation skips it.
    Absent,
    /// String value.
    Str(&'a str),
    /// Signed integer, widened.
    Int(i64),
    /// Unsigned integer, widened.
    UInt(u64),
    /// Floating point value.
    Float(f64),
    /// Boolean value.
    Bool(bool),
    /// UTC timestamp.
    DateTime(DateTime<Utc>),
    /// UUID value.
    Uuid(Uuid),
    /// Sequence elements, in order.
    List(Vec<FieldView<'a>>),
    /// Map entries as (key, value) pairs, in the map's iteration order.
    Map(Vec<(&'a str, FieldView<'a>)>),
    /// A nested struct, recursed into by the engine.
    Struct(&'a dyn Reflect),
}

impl<'a> FieldView<'a> {
    /// Length under `min`/`max`/`len` semantics: characters for strings,
    /// element count for lists and maps. `None` for other kinds.
    pub fn len(&self) -> Option<usize> {
        match self {
            FieldView::Str(s) => Some(s.chars().count()),
            FieldView::List(items) => Some(items.len()),
            FieldView::Map(entries) => Some(entries.len()),
            _ => None,
        }
    }

    /// True when the view is the absent marker.
    pub fn is_absent(&self) -> bool {
        matches!(self, FieldView::Absent)
    }

    /// Zero-ness test used by `required_with`/`required_without` and the
    /// `excluded_*` family: absent, empty, zero, false, or the nil UUID.
    pub fn is_zero(&self) -> bool {
        match self {
            FieldView::Absent => true,
            FieldView::Str(s) => s.is_empty(),
            FieldView::Int(n) => *n == 0,
            FieldView::UInt(n) => *n == 0,
            FieldView::Float(n) => *n == 0.0,
            FieldView::Bool(b) => !b,
            FieldView::Uuid(u) => u.is_nil(),
            FieldView::List(items) => items.is_empty(),
            FieldView::Map(entries) => entries.is_empty(),
            FieldView::DateTime(_) | FieldView::Struct(_) => false,
        }
    }

    /// Canonical string form used by conditional cross-field comparisons
    /// (`required_if=Status archived`). `None` for collections and structs.
    pub fn stringified(&self) -> Option<String> {
        match self {
            FieldView::Str(s) => Some((*s).to_string()),
            FieldView::Int(n) => Some(n.to_string()),
            FieldView::UInt(n) => Some(n.to_string()),
            FieldView::Float(n) => Some(n.to_string()),
            FieldView::Bool(b) => Some(b.to_string()),
            FieldView::DateTime(t) => Some(t.to_rfc3339()),
            FieldView::Uuid(u) => Some(u.to_string()),
            _ => None,
        }
    }

    /// The offending-value payload attached to violations. `None` for
    /// absent values and nested structs.
    pub fn as_json(&self) -> Option<Value> {
        match self {
            FieldView::Absent | FieldView::Struct(_) => None,
            FieldView::Str(s) => Some(Value::String((*s).to_string())),
            FieldView::Int(n) => Some(Value::from(*n)),
            FieldView::UInt(n) => Some(Value::from(*n)),
            FieldView::Float(n) => serde_json::Number::from_f64(*n).map(Value::Number),
            FieldView::Bool(b) => Some(Value::Bool(*b)),
            FieldView::DateTime(t) => Some(Value::String(t.to_rfc3339())),
            FieldView::Uuid(u) => Some(Value::String(u.to_string())),
            FieldView::List(items) => {
                Some(Value::Array(items.iter().filter_map(FieldView::as_json).collect()))
            }
            FieldView::Map(entries) => Some(Value::Object(
                entries
                    .iter()
                    .filter_map(|(k, v)| v.as_json().map(|v| ((*k).to_string(), v)))
                    .collect(),
            )),
        }
    }

    /// Structural equality across views of compatible kinds.
    ///
    /// Numeric variants compare by value across `Int`/`UInt`/`Float`.
    /// Nested structs are never equal through a view (no descriptor at
    /// hand to walk them); callers treat that as "not comparable".
    pub fn eq_view(&self, other: &FieldView<'_>) -> bool {
        match (self, other) {
            (FieldView::Absent, FieldView::Absent) => true,
            (FieldView::Str(a), FieldView::Str(b)) => a == b,
            (FieldView::Bool(a), FieldView::Bool(b)) => a == b,
            (FieldView::DateTime(a), FieldView::DateTime(b)) => a == b,
            (FieldView::Uuid(a), FieldView::Uuid(b)) => a == b,
            (FieldView::List(a), FieldView::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.eq_view(y))
            }
            (FieldView::Map(a), FieldView::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|((ka, va), (kb, vb))| ka == kb && va.eq_view(vb))
            }
            _ => self
                .partial_cmp_view(other)
                .map(|o| o == Ordering::Equal)
                .unwrap_or(false),
        }
    }

    /// Ordering across comparable views: numeric (cross-width), string,
    /// and timestamp. `None` when the kinds cannot be ordered.
    pub fn partial_cmp_view(&self, other: &FieldView<'_>) -> Option<Ordering> {
        match (self, other) {
            (FieldView::Str(a), FieldView::Str(b)) => Some(a.cmp(b)),
            (FieldView::DateTime(a), FieldView::DateTime(b)) => Some(a.cmp(b)),
            (FieldView::Int(a), FieldView::Int(b)) => Some(a.cmp(b)),
            (FieldView::UInt(a), FieldView::UInt(b)) => Some(a.cmp(b)),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
        }
    }

    /// Numeric widening used for cross-width comparisons and numeric bounds.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldView::Int(n) => Some(*n as f64),
            FieldView::UInt(n) => Some(*n as f64),
            FieldView::Float(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Debug for FieldView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldView::Absent => write!(f, "Absent"),
            FieldView::Str(s) => f.debug_tuple("Str").field(s).finish(),
            FieldView::Int(n) => f.debug_tuple("Int").field(n).finish(),
            FieldView::UInt(n) => f.debug_tuple("UInt").field(n).finish(),
            FieldView::Float(n) => f.debug_tuple("Float").field(n).finish(),
            FieldView::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            FieldView::DateTime(t) => f.debug_tuple("DateTime").field(t).finish(),
            FieldView::Uuid(u) => f.debug_tuple("Uuid").field(u).finish(),
            FieldView::List(items) => f.debug_tuple("List").field(items).finish(),
            FieldView::Map(entries) => f.debug_tuple("Map").field(entries).finish(),
            FieldView::Struct(_) => write!(f, "Struct(..)"),
        }
    }
}

/// Views for `Option` fields: `None` becomes `Absent`.
pub fn optional<'a, T, F>(value: &'a Option<T>, view: F) -> FieldView<'a>
where
    F: FnOnce(&'a T) -> FieldView<'a>,
{
    match value {
        Some(v) => view(v),
        None => FieldView::Absent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_base_strips_optional() {
        let k = FieldKind::Optional(Box::new(FieldKind::Optional(Box::new(FieldKind::Str))));
        assert_eq!(*k.base(), FieldKind::Str);
        assert!(k.is_optional());
        assert!(k.is_lengthy());
        assert!(!k.is_numeric());
    }

    #[test]
    fn test_kind_collection_predicates() {
        let list = FieldKind::List(Box::new(FieldKind::UInt));
        let map = FieldKind::Map(Box::new(FieldKind::Str));
        assert!(list.is_collection() && !list.is_map());
        assert!(map.is_collection() && map.is_map());
        assert_eq!(list.element(), Some(&FieldKind::UInt));
        assert_eq!(map.element(), Some(&FieldKind::Str));
        assert_eq!(FieldKind::Bool.element(), None);
    }

    #[test]
    fn test_descriptor_lookup() {
        let desc = TypeDescriptor::new("tests::Sample")
            .field(FieldSpec::new("alpha", FieldKind::Str).tag("required"))
            .field(FieldSpec::new("beta", FieldKind::Int).rename("b"));
        assert_eq!(desc.short_name(), "Sample");
        assert_eq!(desc.field_index("beta"), Some(1));
        assert_eq!(desc.field_index("gamma"), None);
        let (idx, spec) = desc.field_by_json_name("b").unwrap();
        assert_eq!(idx, 1);
        assert_eq!(spec.name(), "beta");
        assert!(desc.field_by_json_name("beta").is_none());
    }

    #[test]
    fn test_view_len_counts_chars_not_bytes() {
        assert_eq!(FieldView::Str("héllo").len(), Some(5));
    }

    #[test]
    fn test_view_zero_ness() {
        assert!(FieldView::Absent.is_zero());
        assert!(FieldView::Str("").is_zero());
        assert!(FieldView::Int(0).is_zero());
        assert!(FieldView::Uuid(Uuid::nil()).is_zero());
        assert!(!FieldView::Str("x").is_zero());
        assert!(!FieldView::Float(0.5).is_zero());
    }

    #[test]
    fn test_cross_width_numeric_comparison() {
        let a = FieldView::Int(3);
        let b = FieldView::UInt(4);
        assert_eq!(a.partial_cmp_view(&b), Some(Ordering::Less));
        assert!(FieldView::Float(3.0).eq_view(&FieldView::Int(3)));
        assert!(!FieldView::Str("3").eq_view(&FieldView::Int(3)));
    }

    #[test]
    fn test_optional_helper() {
        let some: Option<String> = Some("v".into());
        let none: Option<String> = None;
        assert!(matches!(optional(&some, |s| FieldView::Str(s)), FieldView::Str("v")));
        assert!(optional(&none, |s| FieldView::Str(s)).is_absent());
    }
}
