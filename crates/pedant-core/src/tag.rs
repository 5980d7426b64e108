//! # Constraint Tag Grammar — Sectioned Token Parser
//!
//! A field's constraints are declared in one comma-separated tag string:
//!
//! ```text
//! required,min=1,max=16,dive,keys,len=2,endkeys,oneof=EUR USD GBP
//! ```
//!
//! Three reserved keywords drive a section state machine:
//!
//! ```text
//! Collection ──dive──▶ Element ──keys──▶ Keys ──endkeys──▶ Element
//! ```
//!
//! Everything else lands in the section that is open when the token is
//! read: collection-level constraints apply to the field value itself,
//! element-level constraints (after `dive`) to each list element or map
//! value, and key-level constraints (between `keys` and `endkeys`) to each
//! map key.
//!
//! ## Fail-fast rules
//!
//! Checked here, once, at parse time — never at validate time:
//!
//! - `keys` anywhere but immediately after `dive`
//! - `endkeys` with no open `keys` block
//! - a `keys` block left unterminated
//! - a second `dive` in the same tag
//! - a token with an empty constraint name
//!
//! Kind-dependent rules (`dive` on a scalar field, `unique` on a
//! non-collection) are enforced where the field kind is known, during
//! field-cache compilation.

use crate::error::ConfigError;

/// One parsed constraint token: a name plus its raw parameter text.
///
/// Bare keywords carry an empty parameter. `name=value` and `name:value`
/// are equivalent; the first separator wins and the remainder — including
/// further separators and spaces — is the parameter verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagEntry {
    /// Constraint name, e.g. `min` or `required_if`.
    pub name: String,
    /// Raw parameter text, empty for bare keywords.
    pub param: String,
}

/// A field's tag, partitioned by section. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedTag {
    field_level: Vec<TagEntry>,
    element: Vec<TagEntry>,
    keys: Vec<TagEntry>,
    dive: bool,
}

/// Sections the state machine moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Collection,
    Element,
    Keys,
}

impl ParsedTag {
    /// Parse a tag string. An empty or all-whitespace tag parses to an
    /// empty `ParsedTag`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for any grammar violation listed in the
    /// module docs. Grammar errors are fatal configuration errors.
    pub fn parse(tag: &str) -> Result<Self, ConfigError> {
        let mut parsed = ParsedTag::default();
        let mut section = Section::Collection;
        let mut prev_was_dive = false;

        for raw in tag.split(',') {
            let token = raw.trim();
            if token.is_empty() {
                prev_was_dive = false;
                continue;
            }
            match token {
                "dive" => {
                    if parsed.dive {
                        return Err(ConfigError::NestedDive { tag: tag.to_string() });
                    }
                    parsed.dive = true;
                    section = Section::Element;
                    prev_was_dive = true;
                    continue;
                }
                "keys" => {
                    if !prev_was_dive {
                        return Err(ConfigError::KeysWithoutDive { tag: tag.to_string() });
                    }
                    section = Section::Keys;
                }
                "endkeys" => {
                    if section != Section::Keys {
                        return Err(ConfigError::EndkeysWithoutKeys { tag: tag.to_string() });
                    }
                    section = Section::Element;
                }
                _ => {
                    let entry = split_token(tag, token)?;
                    match section {
                        Section::Collection => parsed.field_level.push(entry),
                        Section::Element => parsed.element.push(entry),
                        Section::Keys => parsed.keys.push(entry),
                    }
                }
            }
            prev_was_dive = false;
        }

        if section == Section::Keys {
            return Err(ConfigError::UnterminatedKeys { tag: tag.to_string() });
        }
        Ok(parsed)
    }

    /// Collection-level entries, applying to the field value itself.
    pub fn field_level(&self) -> &[TagEntry] {
        &self.field_level
    }

    /// Element-level entries, applying per list element or map value.
    pub fn element(&self) -> &[TagEntry] {
        &self.element
    }

    /// Key-level entries, applying per map key.
    pub fn keys(&self) -> &[TagEntry] {
        &self.keys
    }

    /// Whether `dive` was present.
    pub fn dive(&self) -> bool {
        self.dive
    }

    /// True when no section holds any entry and `dive` is absent.
    pub fn is_empty(&self) -> bool {
        !self.dive && self.field_level.is_empty() && self.element.is_empty() && self.keys.is_empty()
    }

    /// Parameter of the first collection-level entry with this name.
    pub fn find(&self, name: &str) -> Option<&str> {
        self.field_level
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.param.as_str())
    }

    /// True if a collection-level entry with this name exists.
    pub fn has(&self, name: &str) -> bool {
        self.find(name).is_some()
    }
}

fn split_token(tag: &str, token: &str) -> Result<TagEntry, ConfigError> {
    let split_at = token.find(['=', ':']);
    let (name, param) = match split_at {
        Some(i) => (&token[..i], &token[i + 1..]),
        None => (token, ""),
    };
    if name.is_empty() {
        return Err(ConfigError::MalformedToken {
            tag: tag.to_string(),
            token: token.to_string(),
        });
    }
    Ok(TagEntry { name: name.to_string(), param: param.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_tag() {
        let parsed = ParsedTag::parse("").unwrap();
        assert!(parsed.is_empty());
        assert!(ParsedTag::parse("  ,  , ").unwrap().is_empty());
    }

    #[test]
    fn test_bare_and_parameterized_tokens() {
        let parsed = ParsedTag::parse("required,min=1,max:16").unwrap();
        assert_eq!(parsed.field_level().len(), 3);
        assert!(parsed.has("required"));
        assert_eq!(parsed.find("min"), Some("1"));
        assert_eq!(parsed.find("max"), Some("16"));
    }

    #[test]
    fn test_first_separator_wins() {
        let parsed = ParsedTag::parse("oneof=a:b c=d").unwrap();
        assert_eq!(parsed.find("oneof"), Some("a:b c=d"));
        let parsed = ParsedTag::parse("pattern:^a=b$").unwrap();
        assert_eq!(parsed.find("pattern"), Some("^a=b$"));
    }

    #[test]
    fn test_dive_partitions_sections() {
        let parsed = ParsedTag::parse("min=1,dive,min=2").unwrap();
        assert!(parsed.dive());
        assert_eq!(parsed.field_level().len(), 1);
        assert_eq!(parsed.element().len(), 1);
        assert_eq!(parsed.element()[0].param, "2");
    }

    #[test]
    fn test_keys_block() {
        let parsed = ParsedTag::parse("dive,keys,len=2,endkeys,oneof=a b").unwrap();
        assert_eq!(parsed.keys().len(), 1);
        assert_eq!(parsed.keys()[0].name, "len");
        assert_eq!(parsed.element().len(), 1);
        assert_eq!(parsed.element()[0].name, "oneof");
    }

    #[test]
    fn test_keys_requires_immediate_dive() {
        assert!(matches!(
            ParsedTag::parse("keys,len=2,endkeys"),
            Err(ConfigError::KeysWithoutDive { .. })
        ));
        // An intervening element constraint breaks the adjacency.
        assert!(matches!(
            ParsedTag::parse("dive,min=1,keys,len=2,endkeys"),
            Err(ConfigError::KeysWithoutDive { .. })
        ));
    }

    #[test]
    fn test_endkeys_requires_open_block() {
        assert!(matches!(
            ParsedTag::parse("dive,endkeys"),
            Err(ConfigError::EndkeysWithoutKeys { .. })
        ));
    }

    #[test]
    fn test_unterminated_keys_block() {
        assert!(matches!(
            ParsedTag::parse("dive,keys,len=2"),
            Err(ConfigError::UnterminatedKeys { .. })
        ));
    }

    #[test]
    fn test_double_dive_rejected() {
        assert!(matches!(
            ParsedTag::parse("dive,dive"),
            Err(ConfigError::NestedDive { .. })
        ));
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(matches!(
            ParsedTag::parse("=5"),
            Err(ConfigError::MalformedToken { .. })
        ));
        assert!(matches!(
            ParsedTag::parse(":x"),
            Err(ConfigError::MalformedToken { .. })
        ));
    }

    proptest! {
        /// The parser must never panic, whatever the tag text.
        #[test]
        fn prop_parse_never_panics(tag in ".{0,64}") {
            let _ = ParsedTag::parse(&tag);
        }

        /// Every successfully parsed entry count is bounded by the token count.
        #[test]
        fn prop_entry_count_bounded(tag in "[a-z=:,0-9 ]{0,64}") {
            if let Ok(parsed) = ParsedTag::parse(&tag) {
                let tokens = tag.split(',').count();
                let entries = parsed.field_level().len()
                    + parsed.element().len()
                    + parsed.keys().len();
                prop_assert!(entries <= tokens);
            }
        }
    }
}
