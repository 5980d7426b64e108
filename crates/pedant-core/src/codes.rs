//! # Machine Codes — Stable Violation Identifiers
//!
//! Every built-in constraint reports violations under exactly one of these
//! codes. Codes are part of the public contract: callers branch on them,
//! test suites assert on them, and they never change meaning between
//! releases. Custom predicates supply their own codes and are not listed
//! here.

/// A required field was absent (or an `Absent` optional at validate time).
pub const REQUIRED: &str = "REQUIRED";

/// Value below the `min` bound (length or numeric, by field kind).
pub const MIN: &str = "MIN";
/// Value above the `max` bound (length or numeric, by field kind).
pub const MAX: &str = "MAX";
/// Length differs from the exact `len` bound.
pub const LEN: &str = "LEN";

/// Value not equal to the `eq` literal.
pub const EQ: &str = "EQ";
/// Value equal to the forbidden `ne` literal.
pub const NE: &str = "NE";
/// Value not strictly greater than the `gt` literal.
pub const GT: &str = "GT";
/// Value below the `gte` literal.
pub const GTE: &str = "GTE";
/// Value not strictly less than the `lt` literal.
pub const LT: &str = "LT";
/// Value above the `lte` literal.
pub const LTE: &str = "LTE";

/// Value outside the closed `oneof` set.
pub const ONEOF: &str = "ONEOF";
/// String does not match the `pattern` regex.
pub const PATTERN: &str = "PATTERN";
/// Number is not a multiple of the `multipleof` parameter.
pub const MULTIPLE_OF: &str = "MULTIPLE_OF";
/// Collection contains duplicate elements (`unique`).
pub const UNIQUE: &str = "UNIQUE";

/// String does not contain the `contains` substring.
pub const CONTAINS: &str = "CONTAINS";
/// String contains the forbidden `excludes` substring.
pub const EXCLUDES: &str = "EXCLUDES";
/// String does not start with the `startswith` prefix.
pub const STARTSWITH: &str = "STARTSWITH";
/// String does not end with the `endswith` suffix.
pub const ENDSWITH: &str = "ENDSWITH";

/// String is not a well-formed email address.
pub const INVALID_EMAIL: &str = "INVALID_EMAIL";
/// String is not a well-formed absolute URL.
pub const INVALID_URL: &str = "INVALID_URL";
/// String is not a well-formed UUID.
pub const INVALID_UUID: &str = "INVALID_UUID";
/// String contains non-alphabetic characters.
pub const INVALID_ALPHA: &str = "INVALID_ALPHA";
/// String contains non-alphanumeric characters.
pub const INVALID_ALPHANUM: &str = "INVALID_ALPHANUM";

/// Field must equal the referenced field (`eqfield`).
pub const MUST_BE_EQ_FIELD: &str = "MUST_BE_EQ_FIELD";
/// Field must differ from the referenced field (`nefield`).
pub const MUST_BE_NE_FIELD: &str = "MUST_BE_NE_FIELD";
/// Field must be strictly greater than the referenced field (`gtfield`).
pub const MUST_BE_GT_FIELD: &str = "MUST_BE_GT_FIELD";
/// Field must be greater than or equal to the referenced field (`gtefield`).
pub const MUST_BE_GTE_FIELD: &str = "MUST_BE_GTE_FIELD";
/// Field must be strictly less than the referenced field (`ltfield`).
pub const MUST_BE_LT_FIELD: &str = "MUST_BE_LT_FIELD";
/// Field must be less than or equal to the referenced field (`ltefield`).
pub const MUST_BE_LTE_FIELD: &str = "MUST_BE_LTE_FIELD";

/// Field must be absent under an `excluded_*` condition that held.
pub const EXCLUDED: &str = "EXCLUDED";

/// A cross-field path could not be walked because an intermediate optional
/// was absent. Reported as a normal violation, never a panic.
pub const UNRESOLVED_PATH: &str = "UNRESOLVED_PATH";

/// The payload was not syntactically valid JSON.
pub const INVALID_JSON: &str = "INVALID_JSON";
/// The payload carried a key that no declared field matches, with the
/// unknown-field policy enabled.
pub const UNKNOWN_FIELD: &str = "UNKNOWN_FIELD";
/// A present value could not be converted to the field's declared type.
pub const TYPE_MISMATCH: &str = "TYPE_MISMATCH";
/// A registered default provider returned an error.
pub const DEFAULT_PROVIDER_FAILED: &str = "DEFAULT_PROVIDER_FAILED";

/// Discriminator key absent from a union payload.
pub const MISSING_DISCRIMINATOR: &str = "MISSING_DISCRIMINATOR";
/// Discriminator value matched no registered variant.
pub const UNKNOWN_DISCRIMINATOR: &str = "UNKNOWN_DISCRIMINATOR";

/// Fallback code for self-validation violations that do not set their own.
pub const CUSTOM: &str = "CUSTOM";
