//! # Validator Core — Pooled Recursive Traversal
//!
//! [`Validator`] pairs a type's shared [`FieldCache`] with per-validator
//! options. Construction fetches the cache through the global registry
//! (building it on first use) and is the single point where configuration
//! errors surface; `validate` itself can only ever report field
//! violations.
//!
//! ## Traversal semantics
//!
//! For each cached field, in declaration order:
//!
//! 1. Absent optionals: a required field records one `REQUIRED` violation
//!    and skips everything else; an optional one still evaluates
//!    conditional cross-field rules (`required_without` must be able to
//!    fire on an absent field) while predicates and comparisons skip.
//! 2. Every compiled predicate runs, then every cross-field rule, then
//!    recursion: plain nested structs recurse into their own cache; with
//!    `dive`, list elements and map entries get the element/key constraint
//!    lists and per-element recursion.
//! 3. The instance's self-validation hook runs last; its violations merge
//!    into the same aggregate, path-prefixed to the current position.
//!
//! Violations accumulate across the entire instance — validation never
//! stops at the first failure. Scratch state (path buffer, error vector)
//! comes from the global pool; every reported path is an owned copy.

use std::marker::PhantomData;
use std::sync::Arc;

use pedant_core::codes;
use pedant_core::error::{AggregateError, ConfigError};
use pedant_core::pool::{self, Scratch};
use pedant_core::reflect::{Described, FieldView, Reflect};

use crate::cache::{CachedField, FieldCache};
use crate::registry;

/// Deserialization mode. Strict is the default and enables the
/// presence/default/required pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Two-phase decode distinguishing missing from present-but-zero.
    #[default]
    Strict,
    /// Single-pass decode; defaults are rejected at construction.
    Relaxed,
}

/// Per-validator options.
#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    /// Decode mode.
    pub mode: Mode,
    /// Reject unrecognized payload keys (top-level and nested) before
    /// structural decoding.
    pub deny_unknown_fields: bool,
}

/// A compiled validator for `T`.
///
/// Cheap to construct after the first build per type: the underlying
/// cache is shared process-wide, so two validators for the same type hold
/// pointer-identical caches.
#[derive(Debug)]
pub struct Validator<T> {
    pub(crate) cache: Arc<FieldCache>,
    pub(crate) options: Options,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Described + Reflect> Validator<T> {
    /// Build (or fetch) the validator with default options.
    ///
    /// # Errors
    ///
    /// Any configuration error in `T`'s tags or registrations, including
    /// those of nested types.
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_options(Options::default())
    }

    /// Build (or fetch) the validator with explicit options.
    ///
    /// # Errors
    ///
    /// In addition to tag errors, a relaxed-mode validator over a type
    /// declaring `default=`/`default_fn=` anywhere in its tree is rejected
    /// here — the default would silently never apply.
    pub fn with_options(options: Options) -> Result<Self, ConfigError> {
        let cache = registry::cache_for(T::descriptor())?;
        if options.mode == Mode::Relaxed {
            if let Some(field) = cache.first_default_field()? {
                return Err(ConfigError::DefaultInRelaxedMode { field: field.to_string() });
            }
        }
        Ok(Self { cache, options, _marker: PhantomData })
    }

    /// The shared compiled cache (pointer-identical across validators for
    /// the same type).
    pub fn cache(&self) -> &Arc<FieldCache> {
        &self.cache
    }

    /// Validate a live instance, collecting every violation.
    ///
    /// # Errors
    ///
    /// One [`AggregateError`] carrying all violations, in traversal order.
    pub fn validate(&self, instance: &T) -> Result<(), AggregateError> {
        let mut scratch = pool::global().checkout();
        validate_into(&self.cache, instance, &mut scratch);
        let errors = scratch.take_errors();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AggregateError::new(errors))
        }
    }
}

/// Recursive traversal over one cache level. Shared by plain validation,
/// decode post-validation, and union dispatch.
pub(crate) fn validate_into(cache: &FieldCache, instance: &dyn Reflect, scratch: &mut Scratch) {
    for field in cache.fields() {
        let view = instance.field(field.index);
        let mark = scratch.enter_field(field.json_name);

        if view.is_absent() {
            if field.required {
                scratch.record(codes::REQUIRED, "is required", None);
            } else {
                // Conditional rules still apply to absent fields;
                // comparisons skip internally.
                for rule in &field.cross {
                    rule.evaluate(instance, &view, scratch);
                }
            }
            scratch.leave(mark);
            continue;
        }

        for constraint in &field.constraints {
            if let Some(err) = constraint.check(&view) {
                scratch.record_error(err);
            }
        }
        for rule in &field.cross {
            rule.evaluate(instance, &view, scratch);
        }

        if field.dive {
            validate_elements(field, &view, scratch);
        } else if let (Some(nested), FieldView::Struct(inner)) = (&field.nested, &view) {
            match nested.get() {
                Ok(nested_cache) => validate_into(nested_cache, *inner, scratch),
                Err(e) => {
                    scratch.record(codes::CUSTOM, format!("nested validator unavailable: {e}"), None);
                }
            }
        }

        scratch.leave(mark);
    }

    merge_self_validation(instance, scratch);
}

fn validate_elements(field: &CachedField, view: &FieldView<'_>, scratch: &mut Scratch) {
    match view {
        FieldView::List(items) => {
            for (i, element) in items.iter().enumerate() {
                let mark = scratch.enter_index(i);
                validate_one_element(field, element, scratch);
                scratch.leave(mark);
            }
        }
        FieldView::Map(entries) => {
            for (key, value) in entries {
                let mark = scratch.enter_key(key);
                let key_view = FieldView::Str(key);
                for constraint in &field.key_constraints {
                    if let Some(err) = constraint.check(&key_view) {
                        scratch.record_error(err);
                    }
                }
                validate_one_element(field, value, scratch);
                scratch.leave(mark);
            }
        }
        _ => {}
    }
}

fn validate_one_element(field: &CachedField, element: &FieldView<'_>, scratch: &mut Scratch) {
    if element.is_absent() {
        if field.element_required {
            scratch.record(codes::REQUIRED, "is required", None);
        }
        return;
    }
    for constraint in &field.element_constraints {
        if let Some(err) = constraint.check(element) {
            scratch.record_error(err);
        }
    }
    if let (Some(nested), FieldView::Struct(inner)) = (&field.nested, element) {
        match nested.get() {
            Ok(nested_cache) => validate_into(nested_cache, *inner, scratch),
            Err(e) => {
                scratch.record(codes::CUSTOM, format!("nested validator unavailable: {e}"), None);
            }
        }
    }
}

fn merge_self_validation(instance: &dyn Reflect, scratch: &mut Scratch) {
    let before = scratch.error_count();
    let prefix = scratch.path().to_string();
    instance.validate_extra(scratch.errors_mut());
    if prefix.is_empty() {
        return;
    }
    // Hook-reported paths are instance-relative; prefix them to the
    // current traversal position.
    for err in scratch.errors_mut().iter_mut().skip(before) {
        if err.path.is_empty() {
            err.path = prefix.clone();
        } else {
            err.path = format!("{prefix}.{}", err.path);
        }
    }
}
