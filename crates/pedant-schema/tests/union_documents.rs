//! Union schema documents: closed `oneOf` with constant discriminators,
//! in both shapes, with variant `$defs` merged at the top level.

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use serde_json::json;

use pedant_core::reflect::{Described, FieldKind, FieldSpec, FieldView, Reflect, TypeDescriptor};
use pedant_engine::UnionValidator;
use pedant_schema::{union_schema, Shape};

#[derive(Debug, Serialize, Deserialize)]
struct CardDetails {
    number: String,
    expiry: String,
}

impl Described for CardDetails {
    fn descriptor() -> &'static TypeDescriptor {
        static DESC: OnceCell<TypeDescriptor> = OnceCell::new();
        DESC.get_or_init(|| {
            TypeDescriptor::new("union_documents::CardDetails")
                .field(FieldSpec::new("number", FieldKind::Str).tag("required,len=16"))
                .field(
                    FieldSpec::new("expiry", FieldKind::Str)
                        .tag("required,pattern=^[0-9]{2}/[0-9]{2}$"),
                )
        })
    }
}

impl Reflect for CardDetails {
    fn field(&self, index: usize) -> FieldView<'_> {
        match index {
            0 => FieldView::Str(&self.number),
            1 => FieldView::Str(&self.expiry),
            _ => FieldView::Absent,
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn std::any::Any> {
        self
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CardPayment {
    amount: u64,
    details: CardDetails,
}

impl Described for CardPayment {
    fn descriptor() -> &'static TypeDescriptor {
        static DESC: OnceCell<TypeDescriptor> = OnceCell::new();
        DESC.get_or_init(|| {
            TypeDescriptor::new("union_documents::CardPayment")
                .field(FieldSpec::new("amount", FieldKind::UInt).tag("required,min=1"))
                .field(
                    FieldSpec::new("details", FieldKind::Struct)
                        .tag("required")
                        .nested(CardDetails::descriptor),
                )
        })
    }
}

impl Reflect for CardPayment {
    fn field(&self, index: usize) -> FieldView<'_> {
        match index {
            0 => FieldView::UInt(self.amount),
            1 => FieldView::Struct(&self.details),
            _ => FieldView::Absent,
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn std::any::Any> {
        self
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct BankPayment {
    amount: u64,
    iban: String,
}

impl Described for BankPayment {
    fn descriptor() -> &'static TypeDescriptor {
        static DESC: OnceCell<TypeDescriptor> = OnceCell::new();
        DESC.get_or_init(|| {
            TypeDescriptor::new("union_documents::BankPayment")
                .field(FieldSpec::new("amount", FieldKind::UInt).tag("required,min=1"))
                .field(FieldSpec::new("iban", FieldKind::Str).tag("required,min=15,max=34"))
        })
    }
}

impl Reflect for BankPayment {
    fn field(&self, index: usize) -> FieldView<'_> {
        match index {
            0 => FieldView::UInt(self.amount),
            1 => FieldView::Str(&self.iban),
            _ => FieldView::Absent,
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn std::any::Any> {
        self
    }
}

fn payments() -> UnionValidator {
    UnionValidator::builder("method")
        .variant::<CardPayment>("card")
        .unwrap()
        .variant::<BankPayment>("bank")
        .unwrap()
        .build()
        .unwrap()
}

#[test]
fn test_one_of_covers_every_variant() {
    let doc = union_schema(&payments(), Shape::Expanded).unwrap();
    let one_of = doc["oneOf"].as_array().unwrap();
    assert_eq!(one_of.len(), 2);
}

#[test]
fn test_discriminator_is_constant_and_required() {
    let doc = union_schema(&payments(), Shape::Expanded).unwrap();
    for variant in doc["oneOf"].as_array().unwrap() {
        assert!(variant["properties"]["method"]["const"].is_string());
        assert!(variant["required"]
            .as_array()
            .unwrap()
            .contains(&json!("method")));
    }
    assert_eq!(doc["oneOf"][0]["properties"]["method"]["const"], "card");
    assert_eq!(doc["oneOf"][1]["properties"]["method"]["const"], "bank");
}

#[test]
fn test_expanded_variants_inline_nested_types() {
    let doc = union_schema(&payments(), Shape::Expanded).unwrap();
    let card = &doc["oneOf"][0];
    assert_eq!(card["properties"]["details"]["properties"]["number"]["minLength"], json!(16));
    assert!(doc.get("$defs").is_none());
}

#[test]
fn test_referenced_variants_share_a_defs_table() {
    let doc = union_schema(&payments(), Shape::Referenced).unwrap();
    let card = &doc["oneOf"][0];
    assert_eq!(
        card["properties"]["details"]["$ref"],
        "#/$defs/union_documents.CardDetails"
    );
    assert!(doc["$defs"]["union_documents.CardDetails"].is_object());
    // The bank variant has no nested types and contributes no defs.
    assert_eq!(doc["$defs"].as_object().unwrap().len(), 1);
}

#[test]
fn test_variant_constraints_survive_in_documents() {
    let doc = union_schema(&payments(), Shape::Expanded).unwrap();
    let bank = &doc["oneOf"][1];
    assert_eq!(bank["properties"]["iban"]["minLength"], json!(15));
    assert_eq!(bank["properties"]["iban"]["maxLength"], json!(34));
    assert_eq!(
        doc["oneOf"][0]["properties"]["details"]["properties"]["expiry"]["pattern"],
        "^[0-9]{2}/[0-9]{2}$"
    );
}
