//! # Constraint Catalog — (Name, Parameter, Kind) → Executable Predicate
//!
//! Resolves each parsed tag entry into one of five compiled forms: an
//! executable predicate, a cross-field rule stub, a decode directive, a
//! metadata entry (schema-only), or the `required` flag. Core names are
//! polymorphic on field kind — `min=3` compiles to a length bound for
//! strings, lists, and maps and to a numeric bound otherwise — and every
//! mismatch between a name and a kind is rejected here, at construction.
//!
//! ## Predicate contract
//!
//! A compiled predicate is a pure function from a [`FieldView`] to an
//! optional violation. Absence always means "skip": presence and
//! requiredness are enforced upstream by the traversal and the
//! deserializer, never inside a predicate.
//!
//! Unknown names consult the custom-validator registry; names that match
//! nothing fail construction with [`ConfigError::UnknownConstraint`] — a
//! typo in a tag surfaces the first time the type's validator is built,
//! not as a constraint that silently never runs.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use pedant_core::codes;
use pedant_core::error::{ConfigError, FieldError};
use pedant_core::reflect::{FieldKind, FieldView};
use pedant_core::tag::TagEntry;

use crate::crossfield::Relation;
use crate::registry;

/// Where in a tag the entry appeared; directives are only legal at field
/// level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// Collection-level section, before any `dive`.
    Field,
    /// Element-level section, after `dive`.
    Element,
    /// Key-level section, between `keys` and `endkeys`.
    Key,
}

/// A compiled, kind-checked predicate bound to one tag entry.
pub struct Constraint {
    name: String,
    param: String,
    code: &'static str,
    check: Arc<dyn Fn(&FieldView<'_>) -> Option<FieldError> + Send + Sync>,
}

impl Constraint {
    /// The constraint name as written in the tag.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The raw parameter text.
    pub fn param(&self) -> &str {
        &self.param
    }

    /// The machine code this constraint reports under.
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Run the predicate. Returns a violation with an empty path (the
    /// traversal fills in the current path) or `None` on pass/skip.
    pub fn check(&self, view: &FieldView<'_>) -> Option<FieldError> {
        if view.is_absent() {
            return None;
        }
        (self.check)(view)
    }
}

impl std::fmt::Debug for Constraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Constraint")
            .field("name", &self.name)
            .field("param", &self.param)
            .field("code", &self.code)
            .finish()
    }
}

/// Decode directives consumed by the deserializer plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `default=<literal>` — static default applied to absent fields.
    Default(String),
    /// `default_fn=<name>` — registered provider applied to absent fields.
    DefaultFn(String),
    /// `trim` — strip surrounding whitespace after assignment.
    Trim,
    /// `lowercase` — lowercase after trim.
    Lowercase,
    /// `uppercase` — uppercase after trim.
    Uppercase,
}

/// Schema-only metadata entries, passed through to generated documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Metadata {
    /// `title=<text>`.
    Title(String),
    /// `description=<text>`.
    Description(String),
    /// `example=<text>`.
    Example(String),
    /// `deprecated`.
    Deprecated,
}

/// Outcome of compiling one tag entry.
#[derive(Debug)]
pub enum Compiled {
    /// Executable predicate.
    Predicate(Constraint),
    /// Cross-field rule stub; path resolution happens in the cache builder.
    CrossField(Relation, String),
    /// The `required` flag.
    Required,
    /// Decode directive.
    Directive(Directive),
    /// Schema-only metadata; the validator ignores it.
    Metadata(Metadata),
}

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
});
static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.\-]*://\S+$").expect("url pattern is valid")
});

/// Compile one tag entry against the kind it will be applied to.
///
/// `field` names the declaring field in configuration errors. `position`
/// distinguishes the tag section: decode directives are rejected outside
/// the field-level section.
///
/// # Errors
///
/// Any name/kind mismatch, malformed parameter, malformed pattern, or
/// unknown name is a [`ConfigError`].
pub fn compile_entry(
    field: &str,
    entry: &TagEntry,
    kind: &FieldKind,
    position: Position,
) -> Result<Compiled, ConfigError> {
    let name = entry.name.as_str();
    let param = entry.param.as_str();
    match name {
        "required" => Ok(Compiled::Required),

        "default" => directive(field, position, Directive::Default(param.to_string())),
        "default_fn" => directive(field, position, Directive::DefaultFn(param.to_string())),
        "trim" => directive(field, position, Directive::Trim),
        "lowercase" => directive(field, position, Directive::Lowercase),
        "uppercase" => directive(field, position, Directive::Uppercase),

        "title" => Ok(Compiled::Metadata(Metadata::Title(param.to_string()))),
        "description" => Ok(Compiled::Metadata(Metadata::Description(param.to_string()))),
        "example" => Ok(Compiled::Metadata(Metadata::Example(param.to_string()))),
        "deprecated" => Ok(Compiled::Metadata(Metadata::Deprecated)),

        "min" => compile_bound(field, entry, kind, Bound::Min),
        "max" => compile_bound(field, entry, kind, Bound::Max),
        "len" => compile_len(field, entry, kind),
        "eq" => compile_literal_cmp(field, entry, kind, Cmp::Eq),
        "ne" => compile_literal_cmp(field, entry, kind, Cmp::Ne),
        "gt" => compile_numeric_cmp(field, entry, kind, Cmp::Gt),
        "gte" => compile_numeric_cmp(field, entry, kind, Cmp::Gte),
        "lt" => compile_numeric_cmp(field, entry, kind, Cmp::Lt),
        "lte" => compile_numeric_cmp(field, entry, kind, Cmp::Lte),
        "multipleof" => compile_multipleof(field, entry, kind),
        "oneof" => compile_oneof(field, entry, kind),
        "pattern" => compile_pattern(field, entry, kind),
        "unique" => compile_unique(field, entry, kind),

        "contains" => compile_substring(field, entry, kind, Substring::Contains),
        "excludes" => compile_substring(field, entry, kind, Substring::Excludes),
        "startswith" => compile_substring(field, entry, kind, Substring::StartsWith),
        "endswith" => compile_substring(field, entry, kind, Substring::EndsWith),

        "email" => compile_format(field, entry, kind, Format::Email),
        "url" => compile_format(field, entry, kind, Format::Url),
        "uuid" => compile_format(field, entry, kind, Format::Uuid),
        "alpha" => compile_format(field, entry, kind, Format::Alpha),
        "alphanum" => compile_format(field, entry, kind, Format::Alphanum),

        "eqfield" => Ok(Compiled::CrossField(Relation::EqField, param.to_string())),
        "nefield" => Ok(Compiled::CrossField(Relation::NeField, param.to_string())),
        "gtfield" => Ok(Compiled::CrossField(Relation::GtField, param.to_string())),
        "gtefield" => Ok(Compiled::CrossField(Relation::GteField, param.to_string())),
        "ltfield" => Ok(Compiled::CrossField(Relation::LtField, param.to_string())),
        "ltefield" => Ok(Compiled::CrossField(Relation::LteField, param.to_string())),
        "required_if" => Ok(Compiled::CrossField(Relation::RequiredIf, param.to_string())),
        "required_unless" => Ok(Compiled::CrossField(Relation::RequiredUnless, param.to_string())),
        "required_with" => Ok(Compiled::CrossField(Relation::RequiredWith, param.to_string())),
        "required_without" => {
            Ok(Compiled::CrossField(Relation::RequiredWithout, param.to_string()))
        }
        "excluded_if" => Ok(Compiled::CrossField(Relation::ExcludedIf, param.to_string())),
        "excluded_unless" => Ok(Compiled::CrossField(Relation::ExcludedUnless, param.to_string())),
        "excluded_with" => Ok(Compiled::CrossField(Relation::ExcludedWith, param.to_string())),
        "excluded_without" => {
            Ok(Compiled::CrossField(Relation::ExcludedWithout, param.to_string()))
        }

        _ => compile_custom(field, entry),
    }
}

fn directive(field: &str, position: Position, d: Directive) -> Result<Compiled, ConfigError> {
    if position != Position::Field {
        return Err(ConfigError::BadParam {
            name: directive_name(&d).to_string(),
            field: field.to_string(),
            param: String::new(),
            detail: "decode directives only apply at field level".to_string(),
        });
    }
    Ok(Compiled::Directive(d))
}

fn directive_name(d: &Directive) -> &'static str {
    match d {
        Directive::Default(_) => "default",
        Directive::DefaultFn(_) => "default_fn",
        Directive::Trim => "trim",
        Directive::Lowercase => "lowercase",
        Directive::Uppercase => "uppercase",
    }
}

#[derive(Clone, Copy)]
enum Bound {
    Min,
    Max,
}

fn compile_bound(
    field: &str,
    entry: &TagEntry,
    kind: &FieldKind,
    bound: Bound,
) -> Result<Compiled, ConfigError> {
    let name = entry.name.clone();
    let code = match bound {
        Bound::Min => codes::MIN,
        Bound::Max => codes::MAX,
    };
    if kind.is_lengthy() {
        let limit: usize = parse_param(field, entry)?;
        let check = move |view: &FieldView<'_>| {
            let len = view.len()?;
            let violated = match bound {
                Bound::Min => len < limit,
                Bound::Max => len > limit,
            };
            violated.then(|| {
                let direction = match bound {
                    Bound::Min => "at least",
                    Bound::Max => "at most",
                };
                FieldError::new("", code, format!("length must be {direction} {limit}, got {len}"))
                    .with_value(view.as_json().unwrap_or(serde_json::Value::Null))
            })
        };
        Ok(Compiled::Predicate(Constraint {
            name,
            param: entry.param.clone(),
            code,
            check: Arc::new(check),
        }))
    } else if kind.is_numeric() {
        let limit: f64 = parse_param(field, entry)?;
        let check = move |view: &FieldView<'_>| {
            let n = view.as_f64()?;
            let violated = match bound {
                Bound::Min => n < limit,
                Bound::Max => n > limit,
            };
            violated.then(|| {
                let direction = match bound {
                    Bound::Min => "at least",
                    Bound::Max => "at most",
                };
                FieldError::new("", code, format!("must be {direction} {limit}, got {n}"))
                    .with_value(view.as_json().unwrap_or(serde_json::Value::Null))
            })
        };
        Ok(Compiled::Predicate(Constraint {
            name,
            param: entry.param.clone(),
            code,
            check: Arc::new(check),
        }))
    } else {
        Err(kind_mismatch(field, entry, kind))
    }
}

fn compile_len(field: &str, entry: &TagEntry, kind: &FieldKind) -> Result<Compiled, ConfigError> {
    if !kind.is_lengthy() {
        return Err(kind_mismatch(field, entry, kind));
    }
    let expected: usize = parse_param(field, entry)?;
    let check = move |view: &FieldView<'_>| {
        let len = view.len()?;
        (len != expected).then(|| {
            FieldError::new("", codes::LEN, format!("length must be exactly {expected}, got {len}"))
                .with_value(view.as_json().unwrap_or(serde_json::Value::Null))
        })
    };
    Ok(Compiled::Predicate(Constraint {
        name: entry.name.clone(),
        param: entry.param.clone(),
        code: codes::LEN,
        check: Arc::new(check),
    }))
}

#[derive(Clone, Copy)]
enum Cmp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Cmp {
    fn code(self) -> &'static str {
        match self {
            Cmp::Eq => codes::EQ,
            Cmp::Ne => codes::NE,
            Cmp::Gt => codes::GT,
            Cmp::Gte => codes::GTE,
            Cmp::Lt => codes::LT,
            Cmp::Lte => codes::LTE,
        }
    }

    fn verb(self) -> &'static str {
        match self {
            Cmp::Eq => "equal",
            Cmp::Ne => "differ from",
            Cmp::Gt => "be greater than",
            Cmp::Gte => "be at least",
            Cmp::Lt => "be less than",
            Cmp::Lte => "be at most",
        }
    }

    fn numeric_holds(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Cmp::Eq => lhs == rhs,
            Cmp::Ne => lhs != rhs,
            Cmp::Gt => lhs > rhs,
            Cmp::Gte => lhs >= rhs,
            Cmp::Lt => lhs < rhs,
            Cmp::Lte => lhs <= rhs,
        }
    }
}

fn compile_literal_cmp(
    field: &str,
    entry: &TagEntry,
    kind: &FieldKind,
    cmp: Cmp,
) -> Result<Compiled, ConfigError> {
    let code = cmp.code();
    let verb = cmp.verb();
    match kind.base() {
        FieldKind::Str => {
            let expected = entry.param.clone();
            let check = move |view: &FieldView<'_>| {
                let FieldView::Str(s) = view else { return None };
                let holds = match cmp {
                    Cmp::Eq => *s == expected,
                    _ => *s != expected,
                };
                (!holds).then(|| {
                    FieldError::new("", code, format!("must {verb} {expected:?}"))
                        .with_value(view.as_json().unwrap_or(serde_json::Value::Null))
                })
            };
            Ok(Compiled::Predicate(Constraint {
                name: entry.name.clone(),
                param: entry.param.clone(),
                code,
                check: Arc::new(check),
            }))
        }
        FieldKind::Bool => {
            let expected: bool = parse_param(field, entry)?;
            let check = move |view: &FieldView<'_>| {
                let FieldView::Bool(b) = view else { return None };
                let holds = match cmp {
                    Cmp::Eq => *b == expected,
                    _ => *b != expected,
                };
                (!holds).then(|| {
                    FieldError::new("", code, format!("must {verb} {expected}"))
                        .with_value(view.as_json().unwrap_or(serde_json::Value::Null))
                })
            };
            Ok(Compiled::Predicate(Constraint {
                name: entry.name.clone(),
                param: entry.param.clone(),
                code,
                check: Arc::new(check),
            }))
        }
        _ if kind.is_numeric() => compile_numeric_cmp(field, entry, kind, cmp),
        _ => Err(kind_mismatch(field, entry, kind)),
    }
}

fn compile_numeric_cmp(
    field: &str,
    entry: &TagEntry,
    kind: &FieldKind,
    cmp: Cmp,
) -> Result<Compiled, ConfigError> {
    if !kind.is_numeric() {
        return Err(kind_mismatch(field, entry, kind));
    }
    let expected: f64 = parse_param(field, entry)?;
    let code = cmp.code();
    let verb = cmp.verb();
    let check = move |view: &FieldView<'_>| {
        let n = view.as_f64()?;
        (!cmp.numeric_holds(n, expected)).then(|| {
            FieldError::new("", code, format!("must {verb} {expected}, got {n}"))
                .with_value(view.as_json().unwrap_or(serde_json::Value::Null))
        })
    };
    Ok(Compiled::Predicate(Constraint {
        name: entry.name.clone(),
        param: entry.param.clone(),
        code,
        check: Arc::new(check),
    }))
}

fn compile_multipleof(
    field: &str,
    entry: &TagEntry,
    kind: &FieldKind,
) -> Result<Compiled, ConfigError> {
    if !kind.is_numeric() {
        return Err(kind_mismatch(field, entry, kind));
    }
    let divisor: f64 = parse_param(field, entry)?;
    if divisor == 0.0 {
        return Err(ConfigError::BadParam {
            name: entry.name.clone(),
            field: field.to_string(),
            param: entry.param.clone(),
            detail: "divisor must be non-zero".to_string(),
        });
    }
    let check = move |view: &FieldView<'_>| {
        let n = view.as_f64()?;
        let remainder = (n / divisor).fract().abs();
        let off = remainder > f64::EPSILON && (1.0 - remainder) > f64::EPSILON;
        off.then(|| {
            FieldError::new("", codes::MULTIPLE_OF, format!("must be a multiple of {divisor}"))
                .with_value(view.as_json().unwrap_or(serde_json::Value::Null))
        })
    };
    Ok(Compiled::Predicate(Constraint {
        name: entry.name.clone(),
        param: entry.param.clone(),
        code: codes::MULTIPLE_OF,
        check: Arc::new(check),
    }))
}

fn compile_oneof(field: &str, entry: &TagEntry, kind: &FieldKind) -> Result<Compiled, ConfigError> {
    match kind.base() {
        FieldKind::Str | FieldKind::Int | FieldKind::UInt | FieldKind::Float => {}
        _ => return Err(kind_mismatch(field, entry, kind)),
    }
    if entry.param.trim().is_empty() {
        return Err(ConfigError::BadParam {
            name: entry.name.clone(),
            field: field.to_string(),
            param: entry.param.clone(),
            detail: "expected a space-separated value set".to_string(),
        });
    }
    let allowed: Vec<String> = entry.param.split_whitespace().map(str::to_string).collect();
    let rendered = allowed.join(", ");
    let check = move |view: &FieldView<'_>| {
        let actual = view.stringified()?;
        (!allowed.iter().any(|a| *a == actual)).then(|| {
            FieldError::new("", codes::ONEOF, format!("must be one of: {rendered}"))
                .with_value(view.as_json().unwrap_or(serde_json::Value::Null))
        })
    };
    Ok(Compiled::Predicate(Constraint {
        name: entry.name.clone(),
        param: entry.param.clone(),
        code: codes::ONEOF,
        check: Arc::new(check),
    }))
}

fn compile_pattern(
    field: &str,
    entry: &TagEntry,
    kind: &FieldKind,
) -> Result<Compiled, ConfigError> {
    if *kind.base() != FieldKind::Str {
        return Err(kind_mismatch(field, entry, kind));
    }
    let re = Regex::new(&entry.param).map_err(|e| ConfigError::MalformedPattern {
        field: field.to_string(),
        pattern: entry.param.clone(),
        detail: e.to_string(),
    })?;
    let check = move |view: &FieldView<'_>| {
        let FieldView::Str(s) = view else { return None };
        (!re.is_match(s)).then(|| {
            FieldError::new("", codes::PATTERN, format!("must match pattern {:?}", re.as_str()))
                .with_value(view.as_json().unwrap_or(serde_json::Value::Null))
        })
    };
    Ok(Compiled::Predicate(Constraint {
        name: entry.name.clone(),
        param: entry.param.clone(),
        code: codes::PATTERN,
        check: Arc::new(check),
    }))
}

fn compile_unique(field: &str, entry: &TagEntry, kind: &FieldKind) -> Result<Compiled, ConfigError> {
    if !kind.is_collection() {
        return Err(ConfigError::NotACollection {
            token: entry.name.clone(),
            field: field.to_string(),
            kind: kind.label().to_string(),
        });
    }
    let check = move |view: &FieldView<'_>| {
        let rendered: Vec<String> = match view {
            FieldView::List(items) => {
                items.iter().map(|i| i.as_json().unwrap_or(serde_json::Value::Null).to_string()).collect()
            }
            FieldView::Map(entries) => entries
                .iter()
                .map(|(_, v)| v.as_json().unwrap_or(serde_json::Value::Null).to_string())
                .collect(),
            _ => return None,
        };
        let mut seen = std::collections::HashSet::new();
        let duplicated = rendered.iter().any(|r| !seen.insert(r));
        duplicated.then(|| {
            FieldError::new("", codes::UNIQUE, "elements must be unique")
                .with_value(view.as_json().unwrap_or(serde_json::Value::Null))
        })
    };
    Ok(Compiled::Predicate(Constraint {
        name: entry.name.clone(),
        param: entry.param.clone(),
        code: codes::UNIQUE,
        check: Arc::new(check),
    }))
}

#[derive(Clone, Copy)]
enum Substring {
    Contains,
    Excludes,
    StartsWith,
    EndsWith,
}

fn compile_substring(
    field: &str,
    entry: &TagEntry,
    kind: &FieldKind,
    mode: Substring,
) -> Result<Compiled, ConfigError> {
    if *kind.base() != FieldKind::Str {
        return Err(kind_mismatch(field, entry, kind));
    }
    let needle = entry.param.clone();
    let (code, describe) = match mode {
        Substring::Contains => (codes::CONTAINS, "must contain"),
        Substring::Excludes => (codes::EXCLUDES, "must not contain"),
        Substring::StartsWith => (codes::STARTSWITH, "must start with"),
        Substring::EndsWith => (codes::ENDSWITH, "must end with"),
    };
    let check = move |view: &FieldView<'_>| {
        let FieldView::Str(s) = view else { return None };
        let holds = match mode {
            Substring::Contains => s.contains(&needle),
            Substring::Excludes => !s.contains(&needle),
            Substring::StartsWith => s.starts_with(&needle),
            Substring::EndsWith => s.ends_with(&needle),
        };
        (!holds).then(|| {
            FieldError::new("", code, format!("{describe} {needle:?}"))
                .with_value(view.as_json().unwrap_or(serde_json::Value::Null))
        })
    };
    Ok(Compiled::Predicate(Constraint {
        name: entry.name.clone(),
        param: entry.param.clone(),
        code,
        check: Arc::new(check),
    }))
}

#[derive(Clone, Copy)]
enum Format {
    Email,
    Url,
    Uuid,
    Alpha,
    Alphanum,
}

fn compile_format(
    field: &str,
    entry: &TagEntry,
    kind: &FieldKind,
    format: Format,
) -> Result<Compiled, ConfigError> {
    if *kind.base() != FieldKind::Str {
        return Err(kind_mismatch(field, entry, kind));
    }
    let (code, describe) = match format {
        Format::Email => (codes::INVALID_EMAIL, "must be a valid email address"),
        Format::Url => (codes::INVALID_URL, "must be a valid absolute URL"),
        Format::Uuid => (codes::INVALID_UUID, "must be a valid UUID"),
        Format::Alpha => (codes::INVALID_ALPHA, "must contain only letters"),
        Format::Alphanum => (codes::INVALID_ALPHANUM, "must contain only letters and digits"),
    };
    let check = move |view: &FieldView<'_>| {
        let FieldView::Str(s) = view else { return None };
        let holds = match format {
            Format::Email => EMAIL_RE.is_match(s),
            Format::Url => URL_RE.is_match(s),
            Format::Uuid => Uuid::parse_str(s).is_ok(),
            Format::Alpha => !s.is_empty() && s.chars().all(char::is_alphabetic),
            Format::Alphanum => !s.is_empty() && s.chars().all(char::is_alphanumeric),
        };
        (!holds).then(|| {
            FieldError::new("", code, describe)
                .with_value(view.as_json().unwrap_or(serde_json::Value::Null))
        })
    };
    Ok(Compiled::Predicate(Constraint {
        name: entry.name.clone(),
        param: entry.param.clone(),
        code,
        check: Arc::new(check),
    }))
}

fn compile_custom(field: &str, entry: &TagEntry) -> Result<Compiled, ConfigError> {
    let Some(custom) = registry::custom_validator(&entry.name) else {
        return Err(ConfigError::UnknownConstraint {
            name: entry.name.clone(),
            field: field.to_string(),
        });
    };
    let param = entry.param.clone();
    let check = move |view: &FieldView<'_>| custom(view, &param);
    Ok(Compiled::Predicate(Constraint {
        name: entry.name.clone(),
        param: entry.param.clone(),
        code: codes::CUSTOM,
        check: Arc::new(check),
    }))
}

fn kind_mismatch(field: &str, entry: &TagEntry, kind: &FieldKind) -> ConfigError {
    ConfigError::KindMismatch {
        name: entry.name.clone(),
        field: field.to_string(),
        kind: kind.label().to_string(),
    }
}

fn parse_param<T: std::str::FromStr>(field: &str, entry: &TagEntry) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    entry.param.parse().map_err(|e: T::Err| ConfigError::BadParam {
        name: entry.name.clone(),
        field: field.to_string(),
        param: entry.param.clone(),
        detail: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, param: &str) -> TagEntry {
        TagEntry { name: name.to_string(), param: param.to_string() }
    }

    fn predicate(compiled: Compiled) -> Constraint {
        match compiled {
            Compiled::Predicate(c) => c,
            other => panic!("expected a predicate, got {other:?}"),
        }
    }

    #[test]
    fn test_min_is_length_for_strings_and_numeric_for_ints() {
        let c = predicate(
            compile_entry("f", &entry("min", "3"), &FieldKind::Str, Position::Field).unwrap(),
        );
        assert!(c.check(&FieldView::Str("ab")).is_some());
        assert!(c.check(&FieldView::Str("abc")).is_none());

        let c = predicate(
            compile_entry("f", &entry("min", "3"), &FieldKind::Int, Position::Field).unwrap(),
        );
        assert!(c.check(&FieldView::Int(2)).is_some());
        assert!(c.check(&FieldView::Int(3)).is_none());
    }

    #[test]
    fn test_boundary_behavior_exact() {
        let min = predicate(
            compile_entry("f", &entry("min", "4"), &FieldKind::Str, Position::Field).unwrap(),
        );
        let max = predicate(
            compile_entry("f", &entry("max", "4"), &FieldKind::Str, Position::Field).unwrap(),
        );
        assert!(min.check(&FieldView::Str("aaaa")).is_none());
        assert!(min.check(&FieldView::Str("aaa")).is_some());
        assert!(max.check(&FieldView::Str("aaaa")).is_none());
        assert!(max.check(&FieldView::Str("aaaaa")).is_some());
    }

    #[test]
    fn test_min_on_bool_is_kind_mismatch() {
        assert!(matches!(
            compile_entry("f", &entry("min", "1"), &FieldKind::Bool, Position::Field),
            Err(ConfigError::KindMismatch { .. })
        ));
    }

    #[test]
    fn test_len_exact() {
        let c = predicate(
            compile_entry(
                "f",
                &entry("len", "2"),
                &FieldKind::List(Box::new(FieldKind::Int)),
                Position::Field,
            )
            .unwrap(),
        );
        let two = FieldView::List(vec![FieldView::Int(1), FieldView::Int(2)]);
        let three = FieldView::List(vec![FieldView::Int(1), FieldView::Int(2), FieldView::Int(3)]);
        assert!(c.check(&two).is_none());
        assert!(c.check(&three).is_some());
    }

    #[test]
    fn test_predicates_skip_absent() {
        let c = predicate(
            compile_entry("f", &entry("email", ""), &FieldKind::Str, Position::Field).unwrap(),
        );
        assert!(c.check(&FieldView::Absent).is_none());
    }

    #[test]
    fn test_email_format() {
        let c = predicate(
            compile_entry("f", &entry("email", ""), &FieldKind::Str, Position::Field).unwrap(),
        );
        assert!(c.check(&FieldView::Str("a@b.co")).is_none());
        let err = c.check(&FieldView::Str("not-an-email")).unwrap();
        assert_eq!(err.code, codes::INVALID_EMAIL);
    }

    #[test]
    fn test_uuid_format_via_parser() {
        let c = predicate(
            compile_entry("f", &entry("uuid", ""), &FieldKind::Str, Position::Field).unwrap(),
        );
        assert!(c.check(&FieldView::Str("550e8400-e29b-41d4-a716-446655440000")).is_none());
        assert!(c.check(&FieldView::Str("nope")).is_some());
    }

    #[test]
    fn test_oneof_membership() {
        let c = predicate(
            compile_entry("f", &entry("oneof", "EUR USD GBP"), &FieldKind::Str, Position::Field)
                .unwrap(),
        );
        assert!(c.check(&FieldView::Str("USD")).is_none());
        let err = c.check(&FieldView::Str("JPY")).unwrap();
        assert_eq!(err.code, codes::ONEOF);
    }

    #[test]
    fn test_pattern_malformed_is_config_error() {
        assert!(matches!(
            compile_entry("f", &entry("pattern", "("), &FieldKind::Str, Position::Field),
            Err(ConfigError::MalformedPattern { .. })
        ));
    }

    #[test]
    fn test_unique_on_scalar_rejected() {
        assert!(matches!(
            compile_entry("f", &entry("unique", ""), &FieldKind::Str, Position::Field),
            Err(ConfigError::NotACollection { .. })
        ));
    }

    #[test]
    fn test_unique_detects_duplicates() {
        let c = predicate(
            compile_entry(
                "f",
                &entry("unique", ""),
                &FieldKind::List(Box::new(FieldKind::Str)),
                Position::Field,
            )
            .unwrap(),
        );
        let dup = FieldView::List(vec![FieldView::Str("a"), FieldView::Str("a")]);
        let ok = FieldView::List(vec![FieldView::Str("a"), FieldView::Str("b")]);
        assert!(c.check(&dup).is_some());
        assert!(c.check(&ok).is_none());
    }

    #[test]
    fn test_multipleof() {
        let c = predicate(
            compile_entry("f", &entry("multipleof", "5"), &FieldKind::UInt, Position::Field)
                .unwrap(),
        );
        assert!(c.check(&FieldView::UInt(15)).is_none());
        assert!(c.check(&FieldView::UInt(7)).is_some());
    }

    #[test]
    fn test_unknown_name_fails_fast() {
        assert!(matches!(
            compile_entry("f", &entry("emial", ""), &FieldKind::Str, Position::Field),
            Err(ConfigError::UnknownConstraint { .. })
        ));
    }

    #[test]
    fn test_directive_outside_field_level_rejected() {
        assert!(matches!(
            compile_entry("f", &entry("trim", ""), &FieldKind::Str, Position::Element),
            Err(ConfigError::BadParam { .. })
        ));
        assert!(matches!(
            compile_entry("f", &entry("trim", ""), &FieldKind::Str, Position::Field),
            Ok(Compiled::Directive(Directive::Trim))
        ));
    }

    #[test]
    fn test_bad_numeric_param() {
        assert!(matches!(
            compile_entry("f", &entry("min", "abc"), &FieldKind::Int, Position::Field),
            Err(ConfigError::BadParam { .. })
        ));
    }
}
