//! # Global Registries — Shared Caches and Extension Points
//!
//! Three process-wide tables:
//!
//! - the descriptor → [`FieldCache`] registry with load-or-store insertion:
//!   racing builders may both compile a cache, but exactly one is retained
//!   and every caller shares it from then on;
//! - the custom-validator registry, consulted by the constraint catalog for
//!   names outside the built-in set;
//! - the default-provider registry, consulted by the deserializer for
//!   `default_fn=` directives. Provider existence is checked once, at
//!   field-cache build, never at decode time.
//!
//! ## Concurrency
//!
//! Caches are compiled outside the write lock. All stored values are
//! immutable behind `Arc`, so readers never block each other after the
//! first build.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;
use serde_json::Value;

use pedant_core::error::{ConfigError, FieldError};
use pedant_core::reflect::{FieldView, TypeDescriptor};

use crate::cache::FieldCache;

/// Custom predicate signature: the field view plus the raw tag parameter.
/// Return `None` to pass; a returned violation keeps its own code and
/// message, and the traversal fills in the path.
pub type CustomCheck = dyn Fn(&FieldView<'_>, &str) -> Option<FieldError> + Send + Sync;

/// Dynamic default provider: zero-argument, fallible, returns the JSON
/// value to splice in for an absent field.
pub type DefaultProvider = dyn Fn() -> Result<Value, String> + Send + Sync;

static CACHES: Lazy<RwLock<HashMap<usize, Arc<FieldCache>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));
static CUSTOM: Lazy<RwLock<HashMap<String, Arc<CustomCheck>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));
static PROVIDERS: Lazy<RwLock<HashMap<String, Arc<DefaultProvider>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

fn descriptor_key(desc: &'static TypeDescriptor) -> usize {
    desc as *const TypeDescriptor as usize
}

/// Fetch the shared compiled cache for a descriptor, building it on first
/// use.
///
/// Load-or-store semantics: when two threads race on the first build, both
/// compile, the first insert wins, and the loser's build is dropped — every
/// caller ends up holding the same `Arc`.
///
/// # Errors
///
/// Any configuration error in the type's tags, cross-field references, or
/// nested registrations.
pub fn cache_for(desc: &'static TypeDescriptor) -> Result<Arc<FieldCache>, ConfigError> {
    let mut in_progress = Vec::new();
    cache_for_inner(desc, &mut in_progress)
}

/// Recursive variant carrying the in-progress build stack for cycle
/// detection. A nested reference back into the stack becomes a deferred
/// edge resolved through this registry on first use — by which time the
/// ancestor build has completed and registered itself.
pub(crate) fn cache_for_inner(
    desc: &'static TypeDescriptor,
    in_progress: &mut Vec<usize>,
) -> Result<Arc<FieldCache>, ConfigError> {
    let key = descriptor_key(desc);
    if let Some(cache) = CACHES.read().unwrap_or_else(PoisonError::into_inner).get(&key) {
        return Ok(cache.clone());
    }

    in_progress.push(key);
    let built = FieldCache::build(desc, in_progress);
    in_progress.pop();
    let built = Arc::new(built?);

    tracing::debug!(
        type_name = desc.type_name(),
        fields = desc.fields().len(),
        "field cache built"
    );

    let mut caches = CACHES.write().unwrap_or_else(PoisonError::into_inner);
    Ok(caches.entry(key).or_insert(built).clone())
}

/// True while `desc` is on the current build stack (a type-graph cycle).
pub(crate) fn is_in_progress(desc: &'static TypeDescriptor, in_progress: &[usize]) -> bool {
    in_progress.contains(&descriptor_key(desc))
}

/// Register a custom predicate under a constraint name.
///
/// Registration must happen before any validator for a type using the name
/// is constructed; the catalog consults this table at compile time and
/// fails construction on unknown names.
pub fn register_validator<F>(name: impl Into<String>, check: F)
where
    F: Fn(&FieldView<'_>, &str) -> Option<FieldError> + Send + Sync + 'static,
{
    CUSTOM
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(name.into(), Arc::new(check));
}

/// Look up a custom predicate by name.
pub fn custom_validator(name: &str) -> Option<Arc<CustomCheck>> {
    CUSTOM.read().unwrap_or_else(PoisonError::into_inner).get(name).cloned()
}

/// Register a dynamic default provider under a name referable from
/// `default_fn=` directives.
pub fn register_default_provider<F>(name: impl Into<String>, provider: F)
where
    F: Fn() -> Result<Value, String> + Send + Sync + 'static,
{
    PROVIDERS
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(name.into(), Arc::new(provider));
}

/// Look up a default provider by name.
pub fn default_provider(name: &str) -> Option<Arc<DefaultProvider>> {
    PROVIDERS.read().unwrap_or_else(PoisonError::into_inner).get(name).cloned()
}
