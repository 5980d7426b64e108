//! # Union Dispatcher — Closed Discriminated Unions
//!
//! A [`UnionValidator`] decodes a payload whose concrete type is selected
//! by a discriminator field: the payload is read generically, the
//! discriminator value is coerced to a canonical string, the matching
//! variant is selected from a closed set fixed at construction, and the
//! variant then flows through the same decode-and-validate pipeline a
//! plain validator applies — presence pass, typed conversion, predicates,
//! cross-field rules, and the self-validation hook.
//!
//! Construction rejects an empty discriminator name, an empty variant
//! set, and duplicate discriminator values. A variant with invalid tags
//! fails at registration, not at decode.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use pedant_core::codes;
use pedant_core::error::{AggregateError, ConfigError, FieldError};
use pedant_core::pool;
use pedant_core::reflect::{Described, Reflect, TypeDescriptor};

use crate::cache::FieldCache;
use crate::decode::prepare_value;
use crate::registry;
use crate::validate::{validate_into, Options};

type VariantDecode = dyn Fn(Value) -> Result<Box<dyn Reflect>, serde_json::Error> + Send + Sync;

struct UnionVariant {
    tag: String,
    descriptor: &'static TypeDescriptor,
    cache: Arc<FieldCache>,
    decode: Box<VariantDecode>,
}

impl std::fmt::Debug for UnionVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnionVariant")
            .field("tag", &self.tag)
            .field("type", &self.descriptor.type_name())
            .finish()
    }
}

/// Builder for a [`UnionValidator`]. Variants are registered with
/// [`UnionBuilder::variant`]; each registration compiles (or fetches) the
/// variant's field cache, so tag errors surface immediately.
#[derive(Debug)]
pub struct UnionBuilder {
    discriminator: String,
    variants: Vec<UnionVariant>,
}

impl UnionBuilder {
    /// Map a discriminator value to a variant type.
    ///
    /// # Errors
    ///
    /// `DuplicateDiscriminator` when the value is already mapped; any
    /// configuration error in the variant type's tags.
    pub fn variant<T>(mut self, tag: impl Into<String>) -> Result<Self, ConfigError>
    where
        T: Described + Reflect + DeserializeOwned,
    {
        let tag = tag.into();
        if self.variants.iter().any(|v| v.tag == tag) {
            return Err(ConfigError::DuplicateDiscriminator { value: tag });
        }
        let cache = registry::cache_for(T::descriptor())?;
        let decode: Box<VariantDecode> = Box::new(|value| {
            let variant: T = serde_json::from_value(value)?;
            Ok(Box::new(variant) as Box<dyn Reflect>)
        });
        self.variants.push(UnionVariant {
            tag,
            descriptor: T::descriptor(),
            cache,
            decode,
        });
        Ok(self)
    }

    /// Finalize the union.
    ///
    /// # Errors
    ///
    /// `EmptyUnion` when the discriminator name is empty or no variant was
    /// registered.
    pub fn build(self) -> Result<UnionValidator, ConfigError> {
        if self.discriminator.is_empty() || self.variants.is_empty() {
            return Err(ConfigError::EmptyUnion);
        }
        Ok(UnionValidator {
            discriminator: self.discriminator,
            variants: self.variants,
        })
    }
}

/// Validator for a closed discriminated union.
#[derive(Debug)]
pub struct UnionValidator {
    discriminator: String,
    variants: Vec<UnionVariant>,
}

/// One successfully decoded and validated union payload.
pub struct DecodedVariant {
    tag: String,
    value: Box<dyn Reflect>,
}

impl std::fmt::Debug for DecodedVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedVariant").field("tag", &self.tag).finish()
    }
}

impl DecodedVariant {
    /// The discriminator value that selected the variant.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Borrow the decoded value as a concrete variant type.
    pub fn downcast_ref<T: Reflect>(&self) -> Option<&T> {
        self.value.as_any().downcast_ref()
    }

    /// Consume into a concrete variant type. Returns `None` (dropping the
    /// value) when the type does not match.
    pub fn downcast<T: Reflect>(self) -> Option<T> {
        if !self.value.as_any().is::<T>() {
            return None;
        }
        self.value.into_any().downcast::<T>().ok().map(|boxed| *boxed)
    }

    /// The decoded value behind the reflection interface.
    pub fn into_inner(self) -> Box<dyn Reflect> {
        self.value
    }
}

impl UnionValidator {
    /// Start building a union dispatched on the given payload key.
    pub fn builder(discriminator: impl Into<String>) -> UnionBuilder {
        UnionBuilder { discriminator: discriminator.into(), variants: Vec::new() }
    }

    /// The discriminator field name.
    pub fn discriminator(&self) -> &str {
        &self.discriminator
    }

    /// The (tag, type) mapping, in registration order. Schema generation
    /// walks this to build the closed `oneOf`.
    pub fn variants(&self) -> impl Iterator<Item = (&str, &'static TypeDescriptor)> {
        self.variants.iter().map(|v| (v.tag.as_str(), v.descriptor))
    }

    /// Decode JSON bytes into whichever variant the discriminator selects.
    ///
    /// # Errors
    ///
    /// A single-entry aggregate for malformed JSON, a missing
    /// discriminator, or an unmapped discriminator value; otherwise the
    /// selected variant's own decode/validation aggregate, with field
    /// paths referencing that variant's fields.
    pub fn decode(&self, bytes: &[u8]) -> Result<DecodedVariant, AggregateError> {
        let value: Value = serde_json::from_slice(bytes).map_err(|e| {
            AggregateError::new(vec![FieldError::new(
                "",
                codes::INVALID_JSON,
                format!("payload is not valid JSON: {e}"),
            )])
        })?;
        self.decode_value(value)
    }

    /// Decode an already-parsed JSON tree. See [`UnionValidator::decode`].
    ///
    /// # Errors
    ///
    /// See [`UnionValidator::decode`].
    pub fn decode_value(&self, value: Value) -> Result<DecodedVariant, AggregateError> {
        let tag = self.extract_discriminator(&value)?;
        let Some(variant) = self.variants.iter().find(|v| v.tag == tag) else {
            let known: Vec<&str> = self.variants.iter().map(|v| v.tag.as_str()).collect();
            return Err(AggregateError::new(vec![FieldError::new(
                self.discriminator.clone(),
                codes::UNKNOWN_DISCRIMINATOR,
                format!("unknown value {:?}; expected one of: {}", tag, known.join(", ")),
            )
            .with_value(Value::String(tag))]));
        };

        tracing::debug!(
            discriminator = self.discriminator.as_str(),
            tag = variant.tag.as_str(),
            variant_type = variant.descriptor.type_name(),
            "union dispatch"
        );

        let prepared = prepare_value(&variant.cache, &Options::default(), value)?;
        let instance = (variant.decode)(prepared).map_err(|e| {
            AggregateError::new(vec![FieldError::new(
                "",
                codes::TYPE_MISMATCH,
                format!("payload does not decode as variant {:?}: {e}", variant.tag),
            )])
        })?;

        let mut scratch = pool::global().checkout();
        validate_into(&variant.cache, instance.as_ref(), &mut scratch);
        let errors = scratch.take_errors();
        drop(scratch);
        if !errors.is_empty() {
            return Err(AggregateError::new(errors));
        }
        Ok(DecodedVariant { tag: variant.tag.clone(), value: instance })
    }

    fn extract_discriminator(&self, value: &Value) -> Result<String, AggregateError> {
        let missing = |detail: &str| {
            AggregateError::new(vec![FieldError::new(
                self.discriminator.clone(),
                codes::MISSING_DISCRIMINATOR,
                detail.to_string(),
            )])
        };
        let Value::Object(map) = value else {
            return Err(missing("payload must be an object"));
        };
        match map.get(&self.discriminator) {
            None | Some(Value::Null) => Err(missing("discriminator is required")),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(Value::Number(n)) => Ok(n.to_string()),
            Some(_) => Err(missing("discriminator must be a string or number")),
        }
    }
}
