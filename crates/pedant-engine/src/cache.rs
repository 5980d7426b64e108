//! # Field Cache — The Once-Built Per-Type Constraint Plan
//!
//! Construction walks a type's descriptor exactly once and compiles
//! everything validation and decoding will ever need: parsed tags,
//! kind-checked predicates, resolved cross-field paths, nested cache
//! references, and per-field decode plans. The result is immutable and
//! shared behind an `Arc` for the process lifetime.
//!
//! Every configuration error a type can have surfaces during this build.
//! A [`FieldCache`] that exists is, by construction, a valid one.
//!
//! ## Nested types and cycles
//!
//! Nested struct fields are compiled eagerly and depth-first, so a
//! configuration error three levels down still fails the root build. A
//! back-edge to a type already on the build stack (a recursive type) is
//! stored as a deferred reference and resolved through the global registry
//! on first use — by which point the ancestor's build has completed and
//! registered itself.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde_json::Value;

use pedant_core::error::ConfigError;
use pedant_core::reflect::{FieldKind, FieldSpec, TypeDescriptor};
use pedant_core::tag::ParsedTag;

use crate::catalog::{compile_entry, Compiled, Constraint, Directive, Position};
use crate::crossfield::CrossFieldRule;
use crate::registry;
use crate::registry::DefaultProvider;

/// String normalization applied after trim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Case {
    /// `lowercase` directive.
    Lower,
    /// `uppercase` directive.
    Upper,
}

/// Per-field decode behavior extracted from directives at build time.
#[derive(Default)]
pub(crate) struct DecodePlan {
    pub(crate) default: Option<Value>,
    pub(crate) provider: Option<(String, Arc<DefaultProvider>)>,
    pub(crate) trim: bool,
    pub(crate) case: Option<Case>,
}

impl DecodePlan {
    pub(crate) fn has_default(&self) -> bool {
        self.default.is_some() || self.provider.is_some()
    }

    pub(crate) fn normalizes(&self) -> bool {
        self.trim || self.case.is_some()
    }
}

impl std::fmt::Debug for DecodePlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodePlan")
            .field("default", &self.default)
            .field("provider", &self.provider.as_ref().map(|(n, _)| n))
            .field("trim", &self.trim)
            .field("case", &self.case)
            .finish()
    }
}

/// Reference to a nested type's cache: built eagerly for forward edges,
/// deferred for cycle back-edges.
#[derive(Debug)]
pub(crate) struct NestedRef {
    desc: &'static TypeDescriptor,
    cache: OnceCell<Arc<FieldCache>>,
}

impl NestedRef {
    fn built(desc: &'static TypeDescriptor, cache: Arc<FieldCache>) -> Self {
        let cell = OnceCell::new();
        // A freshly created cell accepts its first value.
        let _ = cell.set(cache);
        Self { desc, cache: cell }
    }

    fn deferred(desc: &'static TypeDescriptor) -> Self {
        Self { desc, cache: OnceCell::new() }
    }

    /// The nested cache, resolving a deferred back-edge through the
    /// registry on first use.
    pub(crate) fn get(&self) -> Result<&Arc<FieldCache>, ConfigError> {
        self.cache.get_or_try_init(|| registry::cache_for(self.desc))
    }
}

/// Compiled plan for one declared field.
#[derive(Debug)]
pub(crate) struct CachedField {
    pub(crate) index: usize,
    pub(crate) rust_name: &'static str,
    pub(crate) json_name: &'static str,
    pub(crate) kind: FieldKind,
    pub(crate) required: bool,
    pub(crate) constraints: Vec<Constraint>,
    pub(crate) element_constraints: Vec<Constraint>,
    pub(crate) element_required: bool,
    pub(crate) key_constraints: Vec<Constraint>,
    pub(crate) cross: Vec<CrossFieldRule>,
    pub(crate) dive: bool,
    pub(crate) nested: Option<NestedRef>,
    pub(crate) decode: DecodePlan,
}

/// The immutable compiled plan for one type: ordered [`CachedField`]s plus
/// the descriptor they were compiled from.
#[derive(Debug)]
pub struct FieldCache {
    descriptor: &'static TypeDescriptor,
    fields: Vec<CachedField>,
}

impl FieldCache {
    /// Compile a descriptor. `in_progress` carries the descriptor build
    /// stack for cycle detection; the public entry point is
    /// [`registry::cache_for`].
    pub(crate) fn build(
        descriptor: &'static TypeDescriptor,
        in_progress: &mut Vec<usize>,
    ) -> Result<Self, ConfigError> {
        let mut fields = Vec::with_capacity(descriptor.fields().len());
        for (index, spec) in descriptor.fields().iter().enumerate() {
            fields.push(compile_field(descriptor, index, spec, in_progress)?);
        }
        Ok(Self { descriptor, fields })
    }

    /// The descriptor this cache was compiled from.
    pub fn descriptor(&self) -> &'static TypeDescriptor {
        self.descriptor
    }

    pub(crate) fn fields(&self) -> &[CachedField] {
        &self.fields
    }

    /// First field (depth-first across nested types) declaring a static or
    /// dynamic default, if any. Relaxed-mode validators reject such types
    /// at construction: the default could silently never apply.
    pub(crate) fn first_default_field(&self) -> Result<Option<&'static str>, ConfigError> {
        let mut visited = Vec::new();
        self.first_default_inner(&mut visited)
    }

    fn first_default_inner(
        &self,
        visited: &mut Vec<usize>,
    ) -> Result<Option<&'static str>, ConfigError> {
        let key = self.descriptor as *const TypeDescriptor as usize;
        if visited.contains(&key) {
            return Ok(None);
        }
        visited.push(key);
        for field in &self.fields {
            if field.decode.has_default() {
                return Ok(Some(field.rust_name));
            }
            if let Some(nested) = &field.nested {
                if let Some(found) = nested.get()?.first_default_inner(visited)? {
                    return Ok(Some(found));
                }
            }
        }
        Ok(None)
    }
}

fn compile_field(
    descriptor: &'static TypeDescriptor,
    index: usize,
    spec: &FieldSpec,
    in_progress: &mut Vec<usize>,
) -> Result<CachedField, ConfigError> {
    let field_name = spec.name();
    let kind = spec.kind().clone();
    let tag = ParsedTag::parse(spec.raw_tag())?;

    if tag.dive() && !kind.is_collection() {
        return Err(ConfigError::NotACollection {
            token: "dive".to_string(),
            field: field_name.to_string(),
            kind: kind.label().to_string(),
        });
    }
    if !tag.keys().is_empty() && !kind.is_map() {
        return Err(ConfigError::NotACollection {
            token: "keys".to_string(),
            field: field_name.to_string(),
            kind: kind.label().to_string(),
        });
    }

    let mut required = false;
    let mut constraints = Vec::new();
    let mut cross = Vec::new();
    let mut decode = DecodePlan::default();

    for entry in tag.field_level() {
        match compile_entry(field_name, entry, &kind, Position::Field)? {
            Compiled::Predicate(c) => constraints.push(c),
            Compiled::Required => required = true,
            Compiled::CrossField(relation, param) => {
                cross.push(CrossFieldRule::build(descriptor, field_name, relation, &param)?);
            }
            Compiled::Directive(directive) => {
                apply_directive(field_name, &kind, directive, &mut decode)?;
            }
            Compiled::Metadata(_) => {}
        }
    }

    let mut element_constraints = Vec::new();
    let mut element_required = false;
    if tag.dive() {
        // `dive` has been validated above, so an element kind exists.
        let element_kind = kind.element().ok_or_else(|| ConfigError::NotACollection {
            token: "dive".to_string(),
            field: field_name.to_string(),
            kind: kind.label().to_string(),
        })?;
        for entry in tag.element() {
            match compile_entry(field_name, entry, element_kind, Position::Element)? {
                Compiled::Predicate(c) => element_constraints.push(c),
                Compiled::Required => element_required = true,
                Compiled::Metadata(_) => {}
                Compiled::CrossField(relation, _) => {
                    return Err(ConfigError::BadParam {
                        name: relation.name().to_string(),
                        field: field_name.to_string(),
                        param: entry.param.clone(),
                        detail: "cross-field constraints only apply at field level".to_string(),
                    });
                }
                Compiled::Directive(_) => {
                    unreachable!("directives are rejected outside field level")
                }
            }
        }
    }

    let mut key_constraints = Vec::new();
    for entry in tag.keys() {
        match compile_entry(field_name, entry, &FieldKind::Str, Position::Key)? {
            Compiled::Predicate(c) => key_constraints.push(c),
            Compiled::Metadata(_) | Compiled::Required => {}
            Compiled::CrossField(relation, _) => {
                return Err(ConfigError::BadParam {
                    name: relation.name().to_string(),
                    field: field_name.to_string(),
                    param: entry.param.clone(),
                    detail: "cross-field constraints only apply at field level".to_string(),
                });
            }
            Compiled::Directive(_) => unreachable!("directives are rejected outside field level"),
        }
    }

    let nested = resolve_nested(field_name, spec, &kind, in_progress)?;

    Ok(CachedField {
        index,
        rust_name: field_name,
        json_name: spec.json_name(),
        kind,
        required,
        constraints,
        element_constraints,
        element_required,
        key_constraints,
        cross,
        dive: tag.dive(),
        nested,
        decode,
    })
}

fn apply_directive(
    field: &str,
    kind: &FieldKind,
    directive: Directive,
    plan: &mut DecodePlan,
) -> Result<(), ConfigError> {
    match directive {
        Directive::Default(literal) => {
            plan.default = Some(parse_default_literal(field, kind, &literal)?);
        }
        Directive::DefaultFn(name) => {
            let provider = registry::default_provider(&name).ok_or_else(|| {
                ConfigError::UnknownDefaultProvider {
                    field: field.to_string(),
                    provider: name.clone(),
                }
            })?;
            plan.provider = Some((name, provider));
        }
        Directive::Trim | Directive::Lowercase | Directive::Uppercase => {
            if *kind.base() != FieldKind::Str {
                return Err(ConfigError::KindMismatch {
                    name: match directive {
                        Directive::Trim => "trim",
                        Directive::Lowercase => "lowercase",
                        _ => "uppercase",
                    }
                    .to_string(),
                    field: field.to_string(),
                    kind: kind.label().to_string(),
                });
            }
            match directive {
                Directive::Trim => plan.trim = true,
                Directive::Lowercase => plan.case = Some(Case::Lower),
                Directive::Uppercase => plan.case = Some(Case::Upper),
                Directive::Default(_) | Directive::DefaultFn(_) => {}
            }
        }
    }
    Ok(())
}

fn parse_default_literal(field: &str, kind: &FieldKind, literal: &str) -> Result<Value, ConfigError> {
    let bad = |detail: String| ConfigError::BadParam {
        name: "default".to_string(),
        field: field.to_string(),
        param: literal.to_string(),
        detail,
    };
    match kind.base() {
        FieldKind::Str | FieldKind::DateTime | FieldKind::Uuid => {
            Ok(Value::String(literal.to_string()))
        }
        FieldKind::Int => literal
            .parse::<i64>()
            .map(Value::from)
            .map_err(|e| bad(e.to_string())),
        FieldKind::UInt => literal
            .parse::<u64>()
            .map(Value::from)
            .map_err(|e| bad(e.to_string())),
        FieldKind::Float => literal
            .parse::<f64>()
            .map(Value::from)
            .map_err(|e| bad(e.to_string())),
        FieldKind::Bool => literal
            .parse::<bool>()
            .map(Value::from)
            .map_err(|e| bad(e.to_string())),
        _ => Err(bad("defaults are only supported for scalar fields".to_string())),
    }
}

fn resolve_nested(
    field: &str,
    spec: &FieldSpec,
    kind: &FieldKind,
    in_progress: &mut Vec<usize>,
) -> Result<Option<NestedRef>, ConfigError> {
    let base_is_struct = *kind.base() == FieldKind::Struct;
    let element_is_struct = kind
        .element()
        .map(|e| *e.base() == FieldKind::Struct)
        .unwrap_or(false);
    if !base_is_struct && !element_is_struct {
        return Ok(None);
    }
    let desc = spec
        .nested_descriptor()
        .ok_or_else(|| ConfigError::MissingNestedDescriptor { field: field.to_string() })?;
    if registry::is_in_progress(desc, in_progress) {
        return Ok(Some(NestedRef::deferred(desc)));
    }
    let cache = registry::cache_for_inner(desc, in_progress)?;
    Ok(Some(NestedRef::built(desc, cache)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::OnceCell as DescCell;
    use pedant_core::reflect::FieldSpec;

    fn build_one(desc: &'static TypeDescriptor) -> Result<FieldCache, ConfigError> {
        let mut stack = Vec::new();
        FieldCache::build(desc, &mut stack)
    }

    fn leak_descriptor(desc: TypeDescriptor) -> &'static TypeDescriptor {
        Box::leak(Box::new(desc))
    }

    #[test]
    fn test_dive_on_scalar_rejected() {
        let desc = leak_descriptor(
            TypeDescriptor::new("cache::tests::DiveScalar")
                .field(FieldSpec::new("n", FieldKind::Int).tag("dive,min=1")),
        );
        assert!(matches!(
            build_one(desc),
            Err(ConfigError::NotACollection { .. })
        ));
    }

    #[test]
    fn test_keys_on_list_rejected() {
        let desc = leak_descriptor(
            TypeDescriptor::new("cache::tests::KeysOnList").field(
                FieldSpec::new("xs", FieldKind::List(Box::new(FieldKind::Str)))
                    .tag("dive,keys,len=2,endkeys"),
            ),
        );
        assert!(matches!(
            build_one(desc),
            Err(ConfigError::NotACollection { .. })
        ));
    }

    #[test]
    fn test_unknown_constraint_fails_build() {
        let desc = leak_descriptor(
            TypeDescriptor::new("cache::tests::Typo")
                .field(FieldSpec::new("email", FieldKind::Str).tag("required,emial")),
        );
        assert!(matches!(
            build_one(desc),
            Err(ConfigError::UnknownConstraint { .. })
        ));
    }

    #[test]
    fn test_missing_nested_descriptor_rejected() {
        let desc = leak_descriptor(
            TypeDescriptor::new("cache::tests::NoNested")
                .field(FieldSpec::new("inner", FieldKind::Struct)),
        );
        assert!(matches!(
            build_one(desc),
            Err(ConfigError::MissingNestedDescriptor { .. })
        ));
    }

    #[test]
    fn test_default_literal_typed_by_kind() {
        let desc = leak_descriptor(
            TypeDescriptor::new("cache::tests::Defaults")
                .field(FieldSpec::new("count", FieldKind::UInt).tag("default=3"))
                .field(FieldSpec::new("label", FieldKind::Str).tag("default=none")),
        );
        let cache = build_one(desc).unwrap();
        assert_eq!(cache.fields()[0].decode.default, Some(Value::from(3u64)));
        assert_eq!(
            cache.fields()[1].decode.default,
            Some(Value::String("none".to_string()))
        );
    }

    #[test]
    fn test_non_numeric_default_on_uint_rejected() {
        let desc = leak_descriptor(
            TypeDescriptor::new("cache::tests::BadDefault")
                .field(FieldSpec::new("count", FieldKind::UInt).tag("default=lots")),
        );
        assert!(matches!(build_one(desc), Err(ConfigError::BadParam { .. })));
    }

    #[test]
    fn test_trim_on_numeric_rejected() {
        let desc = leak_descriptor(
            TypeDescriptor::new("cache::tests::TrimInt")
                .field(FieldSpec::new("n", FieldKind::Int).tag("trim")),
        );
        assert!(matches!(build_one(desc), Err(ConfigError::KindMismatch { .. })));
    }

    #[test]
    fn test_recursive_type_builds_with_deferred_edge() {
        struct Tree;
        impl Tree {
            fn descriptor() -> &'static TypeDescriptor {
                static DESC: DescCell<TypeDescriptor> = DescCell::new();
                DESC.get_or_init(|| {
                    TypeDescriptor::new("cache::tests::Tree").field(
                        FieldSpec::new(
                            "child",
                            FieldKind::Optional(Box::new(FieldKind::Struct)),
                        )
                        .nested(Tree::descriptor),
                    )
                })
            }
        }
        let cache = registry::cache_for(Tree::descriptor()).unwrap();
        let nested = cache.fields()[0].nested.as_ref().unwrap();
        // The back-edge resolves to the registered cache itself.
        assert!(Arc::ptr_eq(nested.get().unwrap(), &cache));
    }
}
