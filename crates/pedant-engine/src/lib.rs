//! # pedant-engine — The Validation Engine
//!
//! Compiles per-type constraint declarations into an immutable, shared
//! [`cache::FieldCache`] and runs them against live instances and JSON
//! payloads:
//!
//! - [`catalog`] — resolves (name, parameter, kind) triples into
//!   executable predicates; polymorphic bounds, format checks, and the
//!   pluggable custom-validator registry.
//! - [`crossfield`] — dotted references resolved to index paths at build,
//!   walked at validate time; equality/ordering/conditional relations.
//! - [`cache`] — the once-built per-type plan; every configuration error
//!   a type can have surfaces during this build.
//! - [`validate`] — [`validate::Validator`], pooled recursive traversal
//!   collecting every violation into one aggregate.
//! - [`decode`] — the two-phase strict deserializer (presence, defaults,
//!   normalization, unknown-field policy) and validated encoding.
//! - [`union`] — closed discriminated unions dispatched on a tagged field.
//! - [`registry`] — process-wide load-or-store cache sharing plus the
//!   custom-predicate and default-provider extension points.
//!
//! ## Concurrency
//!
//! Everything compiled is immutable behind `Arc` and read without locks.
//! The only mutable shared state is the scratch pool (checkout/return)
//! and the registries (read-mostly `RwLock` maps). Validator construction
//! races build at most one retained cache per type.

pub mod cache;
pub mod catalog;
pub mod crossfield;
pub mod decode;
pub mod registry;
pub mod union;
pub mod validate;

pub use cache::FieldCache;
pub use catalog::Constraint;
pub use crossfield::{CrossFieldRule, FieldPath, Relation};
pub use decode::Presence;
pub use registry::{register_default_provider, register_validator};
pub use union::{DecodedVariant, UnionBuilder, UnionValidator};
pub use validate::{Mode, Options, Validator};
