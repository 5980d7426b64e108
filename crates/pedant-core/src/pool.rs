//! # Scratch Pool — Bounded Free-List for Path Buffers and Error Slices
//!
//! Every validation call needs a path buffer to track its position in the
//! instance tree and a vector to accumulate violations. Both are checked
//! out of a process-wide bounded free-list and returned on drop, so steady
//! state validation allocates nothing for bookkeeping.
//!
//! ## Checkout discipline
//!
//! - A checked-out [`Scratch`] is exclusively owned by its guard until the
//!   guard drops; the pool never hands one instance to two callers.
//! - Returning resets the scratch (clears, keeps capacity). Returns beyond
//!   the pool's capacity are dropped instead of growing the free-list.
//! - Errors handed to callers own a materialized copy of the path string
//!   ([`Scratch::record`] clones it), never a borrow of the pooled buffer.

use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, PoisonError};

use once_cell::sync::Lazy;
use serde_json::Value;

use crate::error::FieldError;

/// Reusable per-call validation state: the current path and the violation
/// accumulator.
#[derive(Debug, Default)]
pub struct Scratch {
    path: String,
    errors: Vec<FieldError>,
}

impl Scratch {
    /// Append a `.name` segment (bare `name` at the root). Returns a mark
    /// to pass to [`Scratch::leave`].
    pub fn enter_field(&mut self, name: &str) -> usize {
        let mark = self.path.len();
        if !self.path.is_empty() {
            self.path.push('.');
        }
        self.path.push_str(name);
        mark
    }

    /// Append an `[index]` segment. Returns a mark for [`Scratch::leave`].
    pub fn enter_index(&mut self, index: usize) -> usize {
        let mark = self.path.len();
        self.path.push('[');
        self.path.push_str(&index.to_string());
        self.path.push(']');
        mark
    }

    /// Append a `[key]` segment for a map entry. Returns a mark for
    /// [`Scratch::leave`].
    pub fn enter_key(&mut self, key: &str) -> usize {
        let mark = self.path.len();
        self.path.push('[');
        self.path.push_str(key);
        self.path.push(']');
        mark
    }

    /// Truncate the path back to a mark returned by an `enter_*` call.
    pub fn leave(&mut self, mark: usize) {
        self.path.truncate(mark);
    }

    /// The current dotted path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Record a violation at the current path. The path is cloned into the
    /// error so the error outlives this scratch's return to the pool.
    pub fn record(&mut self, code: &'static str, message: impl Into<String>, value: Option<Value>) {
        let mut err = FieldError::new(self.path.clone(), code, message);
        err.value = value;
        self.errors.push(err);
    }

    /// Record a violation built elsewhere (custom predicates carry their
    /// own codes); the path is overwritten with the current position when
    /// the error did not set one.
    pub fn record_error(&mut self, mut err: FieldError) {
        if err.path.is_empty() {
            err.path = self.path.clone();
        }
        self.errors.push(err);
    }

    /// Number of violations recorded so far.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Move the accumulated violations out, leaving the scratch reusable.
    pub fn take_errors(&mut self) -> Vec<FieldError> {
        std::mem::take(&mut self.errors)
    }

    /// Direct access to the accumulator, for hooks that push errors.
    pub fn errors_mut(&mut self) -> &mut Vec<FieldError> {
        &mut self.errors
    }

    fn reset(&mut self) {
        self.path.clear();
        self.errors.clear();
    }
}

/// Bounded free-list of [`Scratch`] instances.
#[derive(Debug)]
pub struct ScratchPool {
    free: Mutex<Vec<Scratch>>,
    capacity: usize,
}

impl ScratchPool {
    /// Free-list bound of the process-wide pool.
    pub const DEFAULT_CAPACITY: usize = 64;

    /// Create a pool retaining at most `capacity` idle instances.
    pub fn new(capacity: usize) -> Self {
        Self { free: Mutex::new(Vec::new()), capacity }
    }

    /// Check out a scratch, reusing an idle one when available.
    pub fn checkout(&self) -> ScratchGuard<'_> {
        let scratch = self
            .free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_default();
        ScratchGuard { pool: self, inner: Some(scratch) }
    }

    /// Number of idle instances currently held.
    pub fn idle_count(&self) -> usize {
        self.free.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn give_back(&self, mut scratch: Scratch) {
        scratch.reset();
        let mut free = self.free.lock().unwrap_or_else(PoisonError::into_inner);
        if free.len() < self.capacity {
            free.push(scratch);
        }
    }
}

/// The process-wide pool shared by all validators.
pub fn global() -> &'static ScratchPool {
    static POOL: Lazy<ScratchPool> = Lazy::new(|| ScratchPool::new(ScratchPool::DEFAULT_CAPACITY));
    &POOL
}

/// RAII checkout: derefs to [`Scratch`], returns it to the pool on drop.
#[derive(Debug)]
pub struct ScratchGuard<'a> {
    pool: &'a ScratchPool,
    inner: Option<Scratch>,
}

impl Deref for ScratchGuard<'_> {
    type Target = Scratch;

    fn deref(&self) -> &Scratch {
        self.inner.as_ref().expect("scratch present until drop")
    }
}

impl DerefMut for ScratchGuard<'_> {
    fn deref_mut(&mut self) -> &mut Scratch {
        self.inner.as_mut().expect("scratch present until drop")
    }
}

impl Drop for ScratchGuard<'_> {
    fn drop(&mut self) {
        if let Some(scratch) = self.inner.take() {
            self.pool.give_back(scratch);
        }
    }
}
