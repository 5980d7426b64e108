//! # pedant-schema — Schema Documents From Validation Declarations
//!
//! The same tags that drive runtime validation drive document
//! generation: declare constraints once, validate instances with
//! `pedant-engine`, and hand consumers a JSON Schema describing exactly
//! what the validator enforces.
//!
//! Two shapes serve two consumer classes:
//!
//! - [`Shape::Expanded`] — fully inlined, no `$ref`. For consumers
//!   without reference resolution (tool-call schemas, prompt payloads).
//! - [`Shape::Referenced`] — nested types factored into `$defs`. For
//!   OpenAPI-style consumers.
//!
//! Documents are computed lazily, once per (type, shape) pair, behind a
//! compute-once cell: concurrent first callers never duplicate the
//! type-graph walk and never observe a partial document.

mod cache;
mod generate;

pub use generate::{schema_for, schema_for_descriptor, union_schema};

/// Document shape: inline-expanded or `$defs`-referenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// Every nested type inlined; no references. Recursive type graphs
    /// cannot be rendered in this shape and fail generation.
    Expanded,
    /// Nested types factored into a `$defs` table, referenced by
    /// fully-qualified name.
    Referenced,
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::OnceCell;
    use pedant_core::reflect::{Described, FieldKind, FieldSpec, TypeDescriptor};
    use serde_json::json;

    struct Address {
        _street: String,
        _country: String,
    }

    impl Described for Address {
        fn descriptor() -> &'static TypeDescriptor {
            static DESC: OnceCell<TypeDescriptor> = OnceCell::new();
            DESC.get_or_init(|| {
                TypeDescriptor::new("schema::tests::Address")
                    .field(FieldSpec::new("street", FieldKind::Str).tag("required,min=1"))
                    .field(
                        FieldSpec::new("country", FieldKind::Str)
                            .tag("required,len=2,uppercase,description=ISO country code"),
                    )
            })
        }
    }

    struct Profile {
        _username: String,
        _email: String,
        _age: Option<u64>,
        _role: String,
        _tags: Vec<String>,
        _address: Address,
    }

    impl Described for Profile {
        fn descriptor() -> &'static TypeDescriptor {
            static DESC: OnceCell<TypeDescriptor> = OnceCell::new();
            DESC.get_or_init(|| {
                TypeDescriptor::new("schema::tests::Profile")
                    .field(
                        FieldSpec::new("username", FieldKind::Str)
                            .tag("required,min=3,max=16,title=Username"),
                    )
                    .field(FieldSpec::new("email", FieldKind::Str).tag("required,email"))
                    .field(
                        FieldSpec::new("age", FieldKind::Optional(Box::new(FieldKind::UInt)))
                            .tag("min=13,max=130"),
                    )
                    .field(
                        FieldSpec::new("role", FieldKind::Str)
                            .tag("oneof=admin user,default=user"),
                    )
                    .field(
                        FieldSpec::new("tags", FieldKind::List(Box::new(FieldKind::Str)))
                            .tag("unique,max=5,dive,min=2"),
                    )
                    .field(
                        FieldSpec::new("address", FieldKind::Struct)
                            .tag("required")
                            .nested(Address::descriptor),
                    )
            })
        }
    }

    #[test]
    fn test_expanded_inlines_nested_types() {
        let doc = schema_for::<Profile>(Shape::Expanded).unwrap();
        assert_eq!(doc["type"], "object");
        assert_eq!(doc["properties"]["address"]["type"], "object");
        assert_eq!(
            doc["properties"]["address"]["properties"]["street"]["minLength"],
            json!(1)
        );
        assert!(doc.get("$defs").is_none());
    }

    #[test]
    fn test_referenced_factors_nested_types() {
        let doc = schema_for::<Profile>(Shape::Referenced).unwrap();
        assert_eq!(
            doc["properties"]["address"]["$ref"],
            "#/$defs/schema.tests.Address"
        );
        assert_eq!(
            doc["$defs"]["schema.tests.Address"]["properties"]["country"]["maxLength"],
            json!(2)
        );
    }

    #[test]
    fn test_keyword_mapping() {
        let doc = schema_for::<Profile>(Shape::Expanded).unwrap();
        let props = &doc["properties"];
        assert_eq!(props["username"]["minLength"], json!(3));
        assert_eq!(props["username"]["maxLength"], json!(16));
        assert_eq!(props["username"]["title"], "Username");
        assert_eq!(props["email"]["format"], "email");
        assert_eq!(props["age"]["type"], "integer");
        assert_eq!(props["age"]["minimum"], json!(13));
        assert_eq!(props["role"]["enum"], json!(["admin", "user"]));
        assert_eq!(props["role"]["default"], "user");
        assert_eq!(props["tags"]["uniqueItems"], json!(true));
        assert_eq!(props["tags"]["maxItems"], json!(5));
        assert_eq!(props["tags"]["items"]["minLength"], json!(2));
    }

    #[test]
    fn test_required_list() {
        let doc = schema_for::<Profile>(Shape::Expanded).unwrap();
        let required = doc["required"].as_array().unwrap();
        assert!(required.contains(&json!("username")));
        assert!(required.contains(&json!("email")));
        assert!(required.contains(&json!("address")));
        assert!(!required.contains(&json!("age")));
    }

    #[test]
    fn test_metadata_passthrough() {
        let doc = schema_for::<Address>(Shape::Expanded).unwrap();
        assert_eq!(doc["properties"]["country"]["description"], "ISO country code");
    }

    #[test]
    fn test_second_call_returns_cached_document() {
        let first = schema_for::<Profile>(Shape::Expanded).unwrap();
        let second = schema_for::<Profile>(Shape::Expanded).unwrap();
        assert!(std::sync::Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
        // Shapes cache independently.
        let referenced = schema_for::<Profile>(Shape::Referenced).unwrap();
        assert!(!std::sync::Arc::ptr_eq(&first, &referenced));
    }

    struct Node {
        _next: Option<Box<Node>>,
    }

    impl Described for Node {
        fn descriptor() -> &'static TypeDescriptor {
            static DESC: OnceCell<TypeDescriptor> = OnceCell::new();
            DESC.get_or_init(|| {
                TypeDescriptor::new("schema::tests::Node").field(
                    FieldSpec::new("next", FieldKind::Optional(Box::new(FieldKind::Struct)))
                        .nested(Node::descriptor),
                )
            })
        }
    }

    #[test]
    fn test_recursive_type_fails_expanded_but_not_referenced() {
        assert!(matches!(
            schema_for::<Node>(Shape::Expanded),
            Err(pedant_core::ConfigError::RecursiveSchema { .. })
        ));
        let doc = schema_for::<Node>(Shape::Referenced).unwrap();
        assert_eq!(doc["properties"]["next"]["$ref"], "#/$defs/schema.tests.Node");
        assert_eq!(
            doc["$defs"]["schema.tests.Node"]["properties"]["next"]["$ref"],
            "#/$defs/schema.tests.Node"
        );
    }
}
