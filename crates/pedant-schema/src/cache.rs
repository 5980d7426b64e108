//! # Schema Cache — Compute-Once Cells Per (Type, Shape)
//!
//! The first generation for a (descriptor, shape) pair walks the type
//! graph and stores the finished document; every later call returns the
//! same `Arc` with no further traversal.
//!
//! Concurrency: the slot map hands out one compute-once cell per pair;
//! racing first-callers serialize on the cell, exactly one computes, and
//! no caller can observe a partially built document — the cell publishes
//! only a finished value.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::{Lazy, OnceCell};
use serde_json::Value;

use pedant_core::error::ConfigError;
use pedant_core::reflect::TypeDescriptor;

use crate::Shape;

type Slot = Arc<OnceCell<Arc<Value>>>;

static SLOTS: Lazy<RwLock<HashMap<(usize, Shape), Slot>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

fn slot_for(desc: &'static TypeDescriptor, shape: Shape) -> Slot {
    let key = (desc as *const TypeDescriptor as usize, shape);
    if let Some(slot) = SLOTS.read().unwrap_or_else(PoisonError::into_inner).get(&key) {
        return slot.clone();
    }
    SLOTS
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(key)
        .or_insert_with(|| Arc::new(OnceCell::new()))
        .clone()
}

/// Return the cached document for the pair, computing it on first access.
///
/// # Errors
///
/// Whatever `build` returns; a failed build leaves the slot empty so a
/// later call (after, say, registering a missing custom validator) can
/// retry.
pub(crate) fn get_or_build(
    desc: &'static TypeDescriptor,
    shape: Shape,
    build: impl FnOnce() -> Result<Value, ConfigError>,
) -> Result<Arc<Value>, ConfigError> {
    let slot = slot_for(desc, shape);
    slot.get_or_try_init(|| {
        tracing::debug!(type_name = desc.type_name(), ?shape, "generating schema");
        build().map(Arc::new)
    })
    .cloned()
}
