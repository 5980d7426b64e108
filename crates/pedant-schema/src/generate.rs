//! # Schema Generation — Constraints to JSON-Schema Keywords
//!
//! Derives schema documents from the same per-field declarations the
//! validator enforces, in two shapes: **expanded** (every nested type
//! inlined — for consumers without `$ref` resolution) and **referenced**
//! (nested types factored into `$defs`, properties pointing at them).
//!
//! The keyword mapping is deterministic and kind-aware: `min`/`max`
//! become `minLength`/`maxLength` on strings, `minItems`/`maxItems` on
//! lists, `minProperties`/`maxProperties` on maps, and
//! `minimum`/`maximum` on numbers; enumerations become closed `enum`
//! sets; format predicates become `format`; metadata passes through
//! verbatim. Constraints with no schema counterpart (cross-field rules,
//! decode directives, custom predicates) contribute nothing.
//!
//! Definitions are keyed by the registered fully-qualified type name with
//! `::` flattened to `.` — two distinct registered types therefore cannot
//! collide in the definitions table.

use serde_json::{json, Map, Value};

use pedant_core::error::ConfigError;
use pedant_core::reflect::{Described, FieldKind, FieldSpec, TypeDescriptor};
use pedant_core::tag::{ParsedTag, TagEntry};
use pedant_engine::UnionValidator;

use crate::cache;
use crate::Shape;

/// How nested struct positions are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefMode {
    Inline,
    Refs,
}

/// Generate (or fetch) the schema document for a registered type.
///
/// # Errors
///
/// Any configuration error in the type's tags, or `RecursiveSchema` when
/// the expanded shape is requested for a cyclic type graph.
pub fn schema_for<T: Described>(shape: Shape) -> Result<std::sync::Arc<Value>, ConfigError> {
    schema_for_descriptor(T::descriptor(), shape)
}

/// Descriptor-level entry point; see [`schema_for`].
///
/// # Errors
///
/// See [`schema_for`].
pub fn schema_for_descriptor(
    desc: &'static TypeDescriptor,
    shape: Shape,
) -> Result<std::sync::Arc<Value>, ConfigError> {
    // The engine's cache build is the single source of configuration
    // truth; a type that validates also generates.
    pedant_engine::registry::cache_for(desc)?;
    cache::get_or_build(desc, shape, || build_document(desc, shape))
}

/// Closed `oneOf` schema for a discriminated union: each variant's schema
/// augmented with a constant discriminator property.
///
/// # Errors
///
/// See [`schema_for`]; variant schemas are generated (and cached) through
/// the same path.
pub fn union_schema(union: &UnionValidator, shape: Shape) -> Result<Value, ConfigError> {
    let mut one_of = Vec::new();
    let mut defs = Map::new();
    for (tag, desc) in union.variants() {
        let doc = schema_for_descriptor(desc, shape)?;
        let mut doc = (*doc).clone();
        if let Some(obj) = doc.as_object_mut() {
            if let Some(Value::Object(variant_defs)) = obj.remove("$defs") {
                for (key, def) in variant_defs {
                    defs.entry(key).or_insert(def);
                }
            }
            let properties = obj
                .entry("properties")
                .or_insert_with(|| Value::Object(Map::new()));
            if let Some(props) = properties.as_object_mut() {
                props.insert(union.discriminator().to_string(), json!({ "const": tag }));
            }
            let required = obj.entry("required").or_insert_with(|| Value::Array(Vec::new()));
            if let Some(required) = required.as_array_mut() {
                if !required.iter().any(|r| r == union.discriminator()) {
                    required.push(Value::String(union.discriminator().to_string()));
                }
            }
        }
        one_of.push(doc);
    }
    let mut root = json!({ "oneOf": one_of });
    if !defs.is_empty() {
        root["$defs"] = Value::Object(defs);
    }
    Ok(root)
}

fn build_document(desc: &'static TypeDescriptor, shape: Shape) -> Result<Value, ConfigError> {
    match shape {
        Shape::Expanded => {
            let mut stack = Vec::new();
            object_schema(desc, RefMode::Inline, &mut stack)
        }
        Shape::Referenced => {
            let mut stack = Vec::new();
            let mut defs = Map::new();
            let mut visited = Vec::new();
            collect_defs(desc, &mut defs, &mut visited)?;
            let mut root = object_schema(desc, RefMode::Refs, &mut stack)?;
            if !defs.is_empty() {
                root["$defs"] = Value::Object(defs);
            }
            Ok(root)
        }
    }
}

fn def_key(desc: &TypeDescriptor) -> String {
    desc.type_name().replace("::", ".")
}

fn collect_defs(
    desc: &'static TypeDescriptor,
    defs: &mut Map<String, Value>,
    visited: &mut Vec<usize>,
) -> Result<(), ConfigError> {
    for spec in desc.fields() {
        let Some(nested) = spec.nested_descriptor() else { continue };
        let key = nested as *const TypeDescriptor as usize;
        if visited.contains(&key) {
            continue;
        }
        visited.push(key);
        let mut stack = Vec::new();
        let doc = object_schema(nested, RefMode::Refs, &mut stack)?;
        defs.insert(def_key(nested), doc);
        collect_defs(nested, defs, visited)?;
    }
    Ok(())
}

fn object_schema(
    desc: &'static TypeDescriptor,
    mode: RefMode,
    stack: &mut Vec<usize>,
) -> Result<Value, ConfigError> {
    let key = desc as *const TypeDescriptor as usize;
    if mode == RefMode::Inline {
        if stack.contains(&key) {
            return Err(ConfigError::RecursiveSchema {
                type_name: desc.type_name().to_string(),
            });
        }
        stack.push(key);
    }

    let mut properties = Map::new();
    let mut required = Vec::new();
    for spec in desc.fields() {
        let tag = ParsedTag::parse(spec.raw_tag())?;
        if tag.has("required") {
            required.push(Value::String(spec.json_name().to_string()));
        }
        properties.insert(spec.json_name().to_string(), field_schema(spec, &tag, mode, stack)?);
    }

    if mode == RefMode::Inline {
        stack.pop();
    }

    let mut doc = json!({
        "type": "object",
        "title": desc.short_name(),
        "properties": Value::Object(properties),
    });
    if !required.is_empty() {
        doc["required"] = Value::Array(required);
    }
    Ok(doc)
}

fn field_schema(
    spec: &FieldSpec,
    tag: &ParsedTag,
    mode: RefMode,
    stack: &mut Vec<usize>,
) -> Result<Value, ConfigError> {
    let kind = spec.kind();
    let mut doc = match kind.base() {
        FieldKind::Struct => nested_schema(spec, mode, stack)?,
        FieldKind::List(element) => {
            let mut items = element_schema(spec, element, mode, stack)?;
            apply_keywords(&mut items, tag.element(), element);
            json!({ "type": "array", "items": items })
        }
        FieldKind::Map(element) => {
            let mut values = element_schema(spec, element, mode, stack)?;
            apply_keywords(&mut values, tag.element(), element);
            json!({ "type": "object", "additionalProperties": values })
        }
        scalar => scalar_schema(scalar),
    };
    apply_keywords(&mut doc, tag.field_level(), kind);
    Ok(doc)
}

fn nested_schema(
    spec: &FieldSpec,
    mode: RefMode,
    stack: &mut Vec<usize>,
) -> Result<Value, ConfigError> {
    let nested = spec
        .nested_descriptor()
        .ok_or_else(|| ConfigError::MissingNestedDescriptor { field: spec.name().to_string() })?;
    match mode {
        RefMode::Inline => object_schema(nested, RefMode::Inline, stack),
        RefMode::Refs => Ok(json!({ "$ref": format!("#/$defs/{}", def_key(nested)) })),
    }
}

fn element_schema(
    spec: &FieldSpec,
    element: &FieldKind,
    mode: RefMode,
    stack: &mut Vec<usize>,
) -> Result<Value, ConfigError> {
    if *element.base() == FieldKind::Struct {
        nested_schema(spec, mode, stack)
    } else {
        Ok(scalar_schema(element.base()))
    }
}

fn scalar_schema(kind: &FieldKind) -> Value {
    match kind {
        FieldKind::Str => json!({ "type": "string" }),
        FieldKind::Int => json!({ "type": "integer" }),
        FieldKind::UInt => json!({ "type": "integer", "minimum": 0 }),
        FieldKind::Float => json!({ "type": "number" }),
        FieldKind::Bool => json!({ "type": "boolean" }),
        FieldKind::DateTime => json!({ "type": "string", "format": "date-time" }),
        FieldKind::Uuid => json!({ "type": "string", "format": "uuid" }),
        _ => json!({}),
    }
}

fn apply_keywords(doc: &mut Value, entries: &[TagEntry], kind: &FieldKind) {
    let Some(obj) = doc.as_object_mut() else { return };
    for entry in entries {
        let param = entry.param.as_str();
        match entry.name.as_str() {
            "min" => set_bound(obj, kind, param, BoundKeyword::Min),
            "max" => set_bound(obj, kind, param, BoundKeyword::Max),
            "len" => {
                set_bound(obj, kind, param, BoundKeyword::Min);
                set_bound(obj, kind, param, BoundKeyword::Max);
            }
            "gt" => insert_number(obj, "exclusiveMinimum", param),
            "gte" => insert_number(obj, "minimum", param),
            "lt" => insert_number(obj, "exclusiveMaximum", param),
            "lte" => insert_number(obj, "maximum", param),
            "eq" => {
                obj.insert("const".to_string(), typed_value(kind, param));
            }
            "multipleof" => insert_number(obj, "multipleOf", param),
            "pattern" => {
                obj.insert("pattern".to_string(), Value::String(param.to_string()));
            }
            "oneof" => {
                let values: Vec<Value> =
                    param.split_whitespace().map(|v| typed_value(kind, v)).collect();
                obj.insert("enum".to_string(), Value::Array(values));
            }
            "email" => {
                obj.insert("format".to_string(), Value::String("email".to_string()));
            }
            "url" => {
                obj.insert("format".to_string(), Value::String("uri".to_string()));
            }
            "uuid" => {
                obj.insert("format".to_string(), Value::String("uuid".to_string()));
            }
            "alpha" => {
                obj.insert("pattern".to_string(), Value::String("^[a-zA-Z]+$".to_string()));
            }
            "alphanum" => {
                obj.insert("pattern".to_string(), Value::String("^[a-zA-Z0-9]+$".to_string()));
            }
            "unique" => {
                obj.insert("uniqueItems".to_string(), Value::Bool(true));
            }
            "title" => {
                obj.insert("title".to_string(), Value::String(param.to_string()));
            }
            "description" => {
                obj.insert("description".to_string(), Value::String(param.to_string()));
            }
            "example" => {
                obj.insert("examples".to_string(), json!([typed_value(kind, param)]));
            }
            "deprecated" => {
                obj.insert("deprecated".to_string(), Value::Bool(true));
            }
            "default" => {
                obj.insert("default".to_string(), typed_value(kind, param));
            }
            // required is collected at the object level; cross-field
            // rules, decode directives, and custom predicates have no
            // schema counterpart.
            _ => {}
        }
    }
}

enum BoundKeyword {
    Min,
    Max,
}

fn set_bound(obj: &mut Map<String, Value>, kind: &FieldKind, param: &str, which: BoundKeyword) {
    let keyword = match (kind.base(), which) {
        (FieldKind::Str, BoundKeyword::Min) => "minLength",
        (FieldKind::Str, BoundKeyword::Max) => "maxLength",
        (FieldKind::List(_), BoundKeyword::Min) => "minItems",
        (FieldKind::List(_), BoundKeyword::Max) => "maxItems",
        (FieldKind::Map(_), BoundKeyword::Min) => "minProperties",
        (FieldKind::Map(_), BoundKeyword::Max) => "maxProperties",
        (_, BoundKeyword::Min) => "minimum",
        (_, BoundKeyword::Max) => "maximum",
    };
    insert_number(obj, keyword, param);
}

fn insert_number(obj: &mut Map<String, Value>, keyword: &str, param: &str) {
    if let Some(n) = parse_number(param) {
        obj.insert(keyword.to_string(), n);
    }
}

fn parse_number(param: &str) -> Option<Value> {
    if let Ok(i) = param.parse::<i64>() {
        return Some(Value::from(i));
    }
    param.parse::<f64>().ok().and_then(|f| serde_json::Number::from_f64(f).map(Value::Number))
}

fn typed_value(kind: &FieldKind, param: &str) -> Value {
    match kind.base() {
        FieldKind::Int | FieldKind::UInt | FieldKind::Float => {
            parse_number(param).unwrap_or_else(|| Value::String(param.to_string()))
        }
        FieldKind::Bool => param
            .parse::<bool>()
            .map(Value::Bool)
            .unwrap_or_else(|_| Value::String(param.to_string())),
        _ => Value::String(param.to_string()),
    }
}
