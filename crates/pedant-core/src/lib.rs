//! # pedant-core — Foundation of the Pedant Validation Stack
//!
//! Declarative per-field constraints, declared once per type, enforced on
//! every live instance. This crate holds the pieces everything else builds
//! on:
//!
//! - [`reflect`] — the explicit one-time registration model: a type
//!   publishes a [`reflect::TypeDescriptor`] and exposes live field values
//!   as [`reflect::FieldView`]s. No runtime reflection, no codegen.
//! - [`tag`] — the constraint tag grammar (`required,min=1,dive,min=2`),
//!   parsed once into a sectioned [`tag::ParsedTag`].
//! - [`error`] — the two-family error taxonomy: construction-time
//!   [`error::ConfigError`]s and per-call [`error::AggregateError`]s with
//!   stable machine [`codes`].
//! - [`pool`] — the bounded scratch free-list backing allocation-conscious
//!   validation calls.
//!
//! ## Crate Policy
//!
//! - No dependency on the engine or schema crates.
//! - Everything here is immutable after construction and safe to share
//!   across unlimited concurrent readers.
//! - Configuration errors surface at construction, never at validate time.

pub mod codes;
pub mod error;
pub mod pool;
pub mod reflect;
pub mod tag;

pub use error::{AggregateError, ConfigError, FieldError};
pub use reflect::{optional, Described, FieldKind, FieldSpec, FieldView, Reflect, TypeDescriptor};
pub use tag::{ParsedTag, TagEntry};
