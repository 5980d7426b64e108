//! # Cross-Field Relations — Static Resolution, Runtime Evaluation
//!
//! A cross-field constraint relates one field to another field of the same
//! instance, named by a dotted reference (`pricing.floor`). The reference
//! is resolved against the owning type's descriptor once, at field-cache
//! build: every segment must exist and be reached only through struct (or
//! optional-struct) segments, and a rule that resolves back to its own
//! field is rejected outright.
//!
//! At validate time the pre-resolved index path is walked against the live
//! instance. An intermediate absent optional yields a distinguished
//! `UNRESOLVED_PATH` violation — never a panic.
//!
//! ## Relation families
//!
//! - Equality/inequality: `eqfield`, `nefield`.
//! - Ordering, numeric/string/timestamp-aware: `gtfield`, `gtefield`,
//!   `ltfield`, `ltefield`. Both sides must be present to compare; an
//!   absent side skips the check (presence is requiredness's job).
//! - Conditional requiredness against the target's stringified value or
//!   zero-ness: `required_if`, `required_unless`, `required_with`,
//!   `required_without`, and the four `excluded_*` counterparts.

use std::cmp::Ordering;

use pedant_core::codes;
use pedant_core::error::ConfigError;
use pedant_core::pool::Scratch;
use pedant_core::reflect::{FieldKind, FieldView, Reflect, TypeDescriptor};

/// The relation a cross-field rule enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// Must equal the referenced field.
    EqField,
    /// Must differ from the referenced field.
    NeField,
    /// Must be strictly greater than the referenced field.
    GtField,
    /// Must be greater than or equal to the referenced field.
    GteField,
    /// Must be strictly less than the referenced field.
    LtField,
    /// Must be less than or equal to the referenced field.
    LteField,
    /// Required when the target's stringified value equals the literal.
    RequiredIf,
    /// Required unless the target's stringified value equals the literal.
    RequiredUnless,
    /// Required when the target is non-zero.
    RequiredWith,
    /// Required when the target is zero or absent.
    RequiredWithout,
    /// Must be zero when the target's stringified value equals the literal.
    ExcludedIf,
    /// Must be zero unless the target's stringified value equals the literal.
    ExcludedUnless,
    /// Must be zero when the target is non-zero.
    ExcludedWith,
    /// Must be zero when the target is zero or absent.
    ExcludedWithout,
}

impl Relation {
    /// The tag name for this relation, used in configuration errors.
    pub fn name(self) -> &'static str {
        match self {
            Relation::EqField => "eqfield",
            Relation::NeField => "nefield",
            Relation::GtField => "gtfield",
            Relation::GteField => "gtefield",
            Relation::LtField => "ltfield",
            Relation::LteField => "ltefield",
            Relation::RequiredIf => "required_if",
            Relation::RequiredUnless => "required_unless",
            Relation::RequiredWith => "required_with",
            Relation::RequiredWithout => "required_without",
            Relation::ExcludedIf => "excluded_if",
            Relation::ExcludedUnless => "excluded_unless",
            Relation::ExcludedWith => "excluded_with",
            Relation::ExcludedWithout => "excluded_without",
        }
    }

    fn takes_literal(self) -> bool {
        matches!(
            self,
            Relation::RequiredIf
                | Relation::RequiredUnless
                | Relation::ExcludedIf
                | Relation::ExcludedUnless
        )
    }

    fn is_conditional(self) -> bool {
        !matches!(
            self,
            Relation::EqField
                | Relation::NeField
                | Relation::GtField
                | Relation::GteField
                | Relation::LtField
                | Relation::LteField
        )
    }
}

/// One resolved path segment: the field index plus its name for rendering.
#[derive(Debug, Clone)]
struct PathSegment {
    index: usize,
    name: &'static str,
}

/// A validated index-based traversal route to a (possibly nested) field.
#[derive(Debug, Clone)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// Resolve a dotted reference against a descriptor.
    ///
    /// # Errors
    ///
    /// `UnknownFieldRef` when a segment does not exist or an intermediate
    /// segment is not a (possibly optional) struct.
    pub fn resolve(
        owner: &'static TypeDescriptor,
        reference: &str,
        origin_field: &str,
    ) -> Result<Self, ConfigError> {
        let unresolvable = |detail: String| ConfigError::UnknownFieldRef {
            field: origin_field.to_string(),
            reference: reference.to_string(),
            detail,
        };

        let parts: Vec<&str> = reference.split('.').collect();
        if reference.is_empty() || parts.iter().any(|p| p.is_empty()) {
            return Err(unresolvable("empty path segment".to_string()));
        }

        let mut segments = Vec::with_capacity(parts.len());
        let mut desc = owner;
        for (i, part) in parts.iter().enumerate() {
            let Some(index) = desc.field_index(part) else {
                return Err(unresolvable(format!(
                    "no field `{part}` on `{}`",
                    desc.type_name()
                )));
            };
            let spec = &desc.fields()[index];
            segments.push(PathSegment { index, name: spec.name() });
            if i + 1 < parts.len() {
                if *spec.kind().base() != FieldKind::Struct {
                    return Err(unresolvable(format!(
                        "segment `{part}` is {}, not a struct",
                        spec.kind().label()
                    )));
                }
                desc = spec
                    .nested_descriptor()
                    .ok_or_else(|| ConfigError::MissingNestedDescriptor {
                        field: spec.name().to_string(),
                    })?;
            }
        }
        Ok(Self { segments })
    }

    /// Walk the live instance. `None` means an intermediate optional was
    /// absent; the final field's own absence is returned as
    /// `FieldView::Absent`, which is a value state, not a failure.
    pub fn walk<'a>(&self, root: &'a dyn Reflect) -> Option<FieldView<'a>> {
        let mut current = root;
        let (last, intermediate) = self.segments.split_last()?;
        for seg in intermediate {
            match current.field(seg.index) {
                FieldView::Struct(inner) => current = inner,
                _ => return None,
            }
        }
        Some(current.field(last.index))
    }
}

/// A cross-field rule bound to its resolved path at build time.
#[derive(Debug, Clone)]
pub struct CrossFieldRule {
    relation: Relation,
    reference: String,
    path: FieldPath,
    literal: Option<String>,
}

impl CrossFieldRule {
    /// Parse the rule's parameter, resolve its path, and reject
    /// self-references.
    ///
    /// Conditional `*_if`/`*_unless` relations take `<path> <literal>`;
    /// every other relation takes the bare path.
    pub fn build(
        owner: &'static TypeDescriptor,
        origin_field: &str,
        relation: Relation,
        param: &str,
    ) -> Result<Self, ConfigError> {
        let (reference, literal) = if relation.takes_literal() {
            let Some((path, lit)) = param.split_once(char::is_whitespace) else {
                return Err(ConfigError::BadParam {
                    name: relation.name().to_string(),
                    field: origin_field.to_string(),
                    param: param.to_string(),
                    detail: "expected `<field> <value>`".to_string(),
                });
            };
            (path.to_string(), Some(lit.trim().to_string()))
        } else {
            (param.trim().to_string(), None)
        };

        let path = FieldPath::resolve(owner, &reference, origin_field)?;
        if path.segments.len() == 1 && path.segments[0].name == origin_field {
            return Err(ConfigError::SelfReference { field: origin_field.to_string() });
        }
        Ok(Self { relation, reference, path, literal })
    }

    /// The relation kind.
    pub fn relation(&self) -> Relation {
        self.relation
    }

    /// The dotted reference as written.
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Evaluate against a live instance, recording violations at the
    /// scratch's current path (the owning field).
    pub fn evaluate(&self, root: &dyn Reflect, view: &FieldView<'_>, scratch: &mut Scratch) {
        let Some(target) = self.path.walk(root) else {
            scratch.record(
                codes::UNRESOLVED_PATH,
                format!("cross-field reference `{}` could not be resolved", self.reference),
                None,
            );
            return;
        };

        if self.relation.is_conditional() {
            self.evaluate_conditional(&target, view, scratch);
        } else {
            self.evaluate_comparison(&target, view, scratch);
        }
    }

    fn evaluate_comparison(
        &self,
        target: &FieldView<'_>,
        view: &FieldView<'_>,
        scratch: &mut Scratch,
    ) {
        // Comparisons need both sides present; presence itself is enforced
        // by requiredness, not here.
        if view.is_absent() || target.is_absent() {
            return;
        }
        let ordering = view.partial_cmp_view(target);
        let (code, verb, holds) = match self.relation {
            Relation::EqField => (codes::MUST_BE_EQ_FIELD, "equal", view.eq_view(target)),
            Relation::NeField => (codes::MUST_BE_NE_FIELD, "differ from", !view.eq_view(target)),
            Relation::GtField => (
                codes::MUST_BE_GT_FIELD,
                "be greater than",
                ordering == Some(Ordering::Greater),
            ),
            Relation::GteField => (
                codes::MUST_BE_GTE_FIELD,
                "be at least",
                matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
            ),
            Relation::LtField => {
                (codes::MUST_BE_LT_FIELD, "be less than", ordering == Some(Ordering::Less))
            }
            Relation::LteField => (
                codes::MUST_BE_LTE_FIELD,
                "be at most",
                matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
            ),
            _ => return,
        };
        if !holds {
            scratch.record(
                code,
                format!("must {verb} field `{}`", self.reference),
                view.as_json(),
            );
        }
    }

    fn evaluate_conditional(
        &self,
        target: &FieldView<'_>,
        view: &FieldView<'_>,
        scratch: &mut Scratch,
    ) {
        let literal_matches = || {
            target.stringified().as_deref() == self.literal.as_deref()
        };
        let (condition, why) = match self.relation {
            Relation::RequiredIf | Relation::ExcludedIf => (
                literal_matches(),
                format!(
                    "when `{}` is {:?}",
                    self.reference,
                    self.literal.as_deref().unwrap_or_default()
                ),
            ),
            Relation::RequiredUnless | Relation::ExcludedUnless => (
                !literal_matches(),
                format!(
                    "unless `{}` is {:?}",
                    self.reference,
                    self.literal.as_deref().unwrap_or_default()
                ),
            ),
            Relation::RequiredWith | Relation::ExcludedWith => {
                (!target.is_zero(), format!("together with `{}`", self.reference))
            }
            Relation::RequiredWithout | Relation::ExcludedWithout => {
                (target.is_zero(), format!("when `{}` is absent", self.reference))
            }
            _ => return,
        };
        if !condition {
            return;
        }
        match self.relation {
            Relation::RequiredIf
            | Relation::RequiredUnless
            | Relation::RequiredWith
            | Relation::RequiredWithout => {
                if view.is_zero() {
                    scratch.record(codes::REQUIRED, format!("is required {why}"), None);
                }
            }
            _ => {
                if !view.is_zero() {
                    scratch.record(codes::EXCLUDED, format!("must be absent {why}"), view.as_json());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::OnceCell;
    use pedant_core::pool::ScratchPool;
    use pedant_core::reflect::{optional, Described, FieldSpec};

    struct Window {
        floor: u64,
        ceiling: u64,
        label: Option<String>,
        bounds: Option<Box<Bounds>>,
    }

    struct Bounds {
        low: i64,
    }

    impl Described for Bounds {
        fn descriptor() -> &'static TypeDescriptor {
            static DESC: OnceCell<TypeDescriptor> = OnceCell::new();
            DESC.get_or_init(|| {
                TypeDescriptor::new("crossfield::tests::Bounds")
                    .field(FieldSpec::new("low", FieldKind::Int))
            })
        }
    }

    impl Reflect for Bounds {
        fn field(&self, index: usize) -> FieldView<'_> {
            match index {
                0 => FieldView::Int(self.low),
                _ => FieldView::Absent,
            }
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }

        fn into_any(self: Box<Self>) -> Box<dyn std::any::Any> {
            self
        }
    }

    impl Described for Window {
        fn descriptor() -> &'static TypeDescriptor {
            static DESC: OnceCell<TypeDescriptor> = OnceCell::new();
            DESC.get_or_init(|| {
                TypeDescriptor::new("crossfield::tests::Window")
                    .field(FieldSpec::new("floor", FieldKind::UInt))
                    .field(FieldSpec::new("ceiling", FieldKind::UInt))
                    .field(FieldSpec::new(
                        "label",
                        FieldKind::Optional(Box::new(FieldKind::Str)),
                    ))
                    .field(
                        FieldSpec::new(
                            "bounds",
                            FieldKind::Optional(Box::new(FieldKind::Struct)),
                        )
                        .nested(Bounds::descriptor),
                    )
            })
        }
    }

    impl Reflect for Window {
        fn field(&self, index: usize) -> FieldView<'_> {
            match index {
                0 => FieldView::UInt(self.floor),
                1 => FieldView::UInt(self.ceiling),
                2 => optional(&self.label, |s| FieldView::Str(s)),
                3 => optional(&self.bounds, |b| FieldView::Struct(b.as_ref())),
                _ => FieldView::Absent,
            }
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }

        fn into_any(self: Box<Self>) -> Box<dyn std::any::Any> {
            self
        }
    }

    fn sample() -> Window {
        Window { floor: 10, ceiling: 20, label: None, bounds: Some(Box::new(Bounds { low: 3 })) }
    }

    fn eval(rule: &CrossFieldRule, w: &Window, field_index: usize) -> Vec<pedant_core::FieldError> {
        let pool = ScratchPool::new(1);
        let mut scratch = pool.checkout();
        scratch.enter_field("field");
        let view = w.field(field_index);
        rule.evaluate(w, &view, &mut scratch);
        scratch.take_errors()
    }

    #[test]
    fn test_gtfield_pass_and_fail() {
        let rule =
            CrossFieldRule::build(Window::descriptor(), "ceiling", Relation::GtField, "floor")
                .unwrap();
        assert!(eval(&rule, &sample(), 1).is_empty());

        let mut w = sample();
        w.ceiling = 5;
        let errors = eval(&rule, &w, 1);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, codes::MUST_BE_GT_FIELD);
    }

    #[test]
    fn test_nested_reference_resolves() {
        let rule = CrossFieldRule::build(
            Window::descriptor(),
            "ceiling",
            Relation::GtField,
            "bounds.low",
        )
        .unwrap();
        assert!(eval(&rule, &sample(), 1).is_empty());
    }

    #[test]
    fn test_intermediate_absent_is_unresolved_path_error() {
        let rule = CrossFieldRule::build(
            Window::descriptor(),
            "ceiling",
            Relation::GtField,
            "bounds.low",
        )
        .unwrap();
        let mut w = sample();
        w.bounds = None;
        let errors = eval(&rule, &w, 1);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, codes::UNRESOLVED_PATH);
    }

    #[test]
    fn test_unknown_reference_rejected_at_build() {
        assert!(matches!(
            CrossFieldRule::build(Window::descriptor(), "ceiling", Relation::GtField, "nothing"),
            Err(ConfigError::UnknownFieldRef { .. })
        ));
        // Traversal through a non-struct segment is equally fatal.
        assert!(matches!(
            CrossFieldRule::build(
                Window::descriptor(),
                "ceiling",
                Relation::GtField,
                "floor.low"
            ),
            Err(ConfigError::UnknownFieldRef { .. })
        ));
    }

    #[test]
    fn test_self_reference_rejected() {
        assert!(matches!(
            CrossFieldRule::build(Window::descriptor(), "floor", Relation::EqField, "floor"),
            Err(ConfigError::SelfReference { .. })
        ));
    }

    #[test]
    fn test_required_if_literal() {
        let rule = CrossFieldRule::build(
            Window::descriptor(),
            "label",
            Relation::RequiredIf,
            "floor 10",
        )
        .unwrap();
        // floor == 10 and label is absent: required.
        let errors = eval(&rule, &sample(), 2);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, codes::REQUIRED);

        let mut w = sample();
        w.floor = 11;
        assert!(eval(&rule, &w, 2).is_empty());

        let mut w = sample();
        w.label = Some("set".into());
        assert!(eval(&rule, &w, 2).is_empty());
    }

    #[test]
    fn test_required_if_missing_literal_is_bad_param() {
        assert!(matches!(
            CrossFieldRule::build(Window::descriptor(), "label", Relation::RequiredIf, "floor"),
            Err(ConfigError::BadParam { .. })
        ));
    }

    #[test]
    fn test_required_without() {
        let rule = CrossFieldRule::build(
            Window::descriptor(),
            "label",
            Relation::RequiredWithout,
            "bounds",
        )
        .unwrap();
        let mut w = sample();
        w.bounds = None;
        let errors = eval(&rule, &w, 2);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, codes::REQUIRED);
        assert!(eval(&rule, &sample(), 2).is_empty());
    }

    #[test]
    fn test_excluded_with() {
        let rule = CrossFieldRule::build(
            Window::descriptor(),
            "label",
            Relation::ExcludedWith,
            "bounds",
        )
        .unwrap();
        let mut w = sample();
        w.label = Some("present".into());
        let errors = eval(&rule, &w, 2);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, codes::EXCLUDED);

        w.bounds = None;
        assert!(eval(&rule, &w, 2).is_empty());
    }
}
