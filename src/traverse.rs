//! Graph builder: raw schema types → type descriptors, populating the
//! registry with every nominal type reached along the way.
//!
//! Nominal types are claimed in the registry *before* their members are
//! visited. A type that is reached again while it is still being built gets
//! a plain `Structure` reference back and the traversal unwinds, so any
//! finite graph terminates no matter how it refers to itself.
use std::collections::HashMap;

use crate::error::{GenError, Result, TypePath};
use crate::ir::{
    Documentation, Enum, EnumOption, GeneratedType, Maturity, Ownership, Property, Struct,
    TaggedUnion, TypeRef,
};
use crate::registry::{Claim, Registry};
use crate::schema::{FieldDef, RawType, SchemaDocument, TypeDef};

/// Name of the synthetic discriminator property.
pub const DISCRIMINATOR: &str = "type";

pub struct TypeGraph<'s> {
    schema: &'s SchemaDocument,
    /// Struct name → discriminator literal.
    tags: HashMap<&'s str, String>,
}

fn unqualified(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

impl<'s> TypeGraph<'s> {
    /// Index the schema. Hierarchy problems are detected here, from the
    /// definitions, so the outcome never depends on traversal order.
    pub fn new(schema: &'s SchemaDocument) -> Result<Self> {
        let mut tags: HashMap<&'s str, String> = HashMap::new();

        for (parent, def) in &schema.types {
            let TypeDef::Sealed(sealed) = def else { continue };
            let malformed = |detail: String| GenError::MalformedHierarchy {
                name: parent.clone(),
                detail,
                path: TypePath::root(parent.clone()),
            };
            if sealed.variants.is_empty() {
                return Err(malformed("declares no variants".to_string()));
            }
            for variant in &sealed.variants {
                let Some(variant_def) = schema.types.get(variant) else {
                    return Err(GenError::UnknownType {
                        name: variant.clone(),
                        path: TypePath::root(parent.clone()),
                    });
                };
                let TypeDef::Struct(variant_struct) = variant_def else {
                    return Err(malformed(format!("variant `{variant}` is not a struct")));
                };
                if variant_struct.fields.iter().any(|f| !f.ignored && f.wire_name() == DISCRIMINATOR) {
                    return Err(malformed(format!(
                        "variant `{variant}` declares its own `{DISCRIMINATOR}` field"
                    )));
                }
                let tag = variant_struct
                    .serial_name
                    .clone()
                    .unwrap_or_else(|| unqualified(variant).to_string());
                match tags.get(variant.as_str()) {
                    Some(existing) if *existing != tag => {
                        return Err(malformed(format!(
                            "variant `{variant}` is tagged `{existing}` elsewhere but `{tag}` here"
                        )));
                    }
                    Some(_) => {}
                    None => {
                        tags.insert(variant.as_str(), tag);
                    }
                }
            }
        }

        // A serial name outside any hierarchy still tags the struct.
        for (name, def) in &schema.types {
            if let TypeDef::Struct(s) = def
                && let Some(tag) = &s.serial_name
                && !tags.contains_key(name.as_str())
            {
                if s.fields.iter().any(|f| !f.ignored && f.wire_name() == DISCRIMINATOR) {
                    return Err(GenError::MalformedHierarchy {
                        name: name.clone(),
                        detail: format!("declares a serial name and its own `{DISCRIMINATOR}` field"),
                        path: TypePath::root(name.clone()),
                    });
                }
                tags.insert(name.as_str(), tag.clone());
            }
        }

        Ok(TypeGraph { schema, tags })
    }

    pub fn schema(&self) -> &'s SchemaDocument { self.schema }

    /// Map `raw` to a descriptor, registering every nominal type it reaches.
    /// `path` is the breadcrumb used in error messages; it is left as it was
    /// found on success.
    pub fn traverse(&self, registry: &mut Registry, raw: &RawType, path: &mut TypePath) -> Result<TypeRef> {
        let ty = match raw {
            RawType::Int8 => TypeRef::int8(),
            RawType::Int16 => TypeRef::int16(),
            RawType::Int32 => TypeRef::int32(),
            RawType::Int64 => TypeRef::int64(),
            RawType::Float32 => TypeRef::float32(),
            RawType::Float64 => TypeRef::float64(),
            RawType::Bool => TypeRef::bool(),
            RawType::Text => TypeRef::text(),
            RawType::Void => TypeRef::void(),
            RawType::Any => TypeRef::any(),
            RawType::Json => TypeRef::any().with_nullable(true),
            RawType::JsonObject => TypeRef::dictionary(TypeRef::any().with_nullable(true)),
            RawType::List { element } | RawType::Set { element } | RawType::Array { element } => {
                TypeRef::array(self.traverse(registry, element, path)?)
            }
            RawType::Map { value, .. } => TypeRef::dictionary(self.traverse(registry, value, path)?),
            RawType::Param { name } => TypeRef::structure(name.clone()),
            RawType::Wildcard { upper_bound: Some(bound) } => self.traverse(registry, bound, path)?,
            RawType::Wildcard { upper_bound: None } => {
                return Err(GenError::UnsupportedType {
                    path: path.clone(),
                    detail: "unbounded wildcard".to_string(),
                });
            }
            RawType::Named { name, args } => self.named(registry, name, args, path)?,
        };
        Ok(ty)
    }

    fn named(
        &self,
        registry: &mut Registry,
        name: &str,
        args: &[RawType],
        path: &mut TypePath,
    ) -> Result<TypeRef> {
        let Some(def) = self.schema.types.get(name) else {
            return Err(GenError::UnknownType { name: name.to_string(), path: path.clone() });
        };
        let expected = def.generics().len();
        if args.len() != expected {
            return Err(GenError::ArityMismatch {
                name: name.to_string(),
                expected,
                found: args.len(),
                path: path.clone(),
            });
        }

        path.push(name);
        self.define(registry, name, def, path)?;
        let generics = args
            .iter()
            .map(|arg| self.traverse(registry, arg, path))
            .collect::<Result<Vec<_>>>()?;
        path.pop();

        Ok(TypeRef::generic(name, generics))
    }

    /// Register `name` unless it is already known.
    fn define(&self, registry: &mut Registry, name: &str, def: &TypeDef, path: &mut TypePath) -> Result<()> {
        if registry.contains(name) {
            return Ok(());
        }
        match def {
            TypeDef::Struct(s) => {
                let doc = Documentation::from_meta(&s.meta, Maturity::default());
                let claim = registry.claim(GeneratedType::Struct(Struct {
                    name: name.to_string(),
                    doc: doc.clone(),
                    properties: Vec::new(),
                    generics: s.generics.clone(),
                    ownership: Ownership::declared(s.meta.owner.clone()),
                }));
                if claim == Claim::Known {
                    return Ok(());
                }
                tracing::debug!(%name, "traverse: struct");

                let mut properties = self.properties(registry, &s.fields, doc.maturity, path)?;
                if let Some(tag) = self.tags.get(name) {
                    properties.push(Property {
                        name: DISCRIMINATOR.to_string(),
                        doc: Documentation::discriminator(),
                        ty: TypeRef::constant(tag.clone()),
                    });
                }
                registry.complete(GeneratedType::Struct(Struct {
                    name: name.to_string(),
                    doc,
                    properties,
                    generics: s.generics.clone(),
                    ownership: Ownership::declared(s.meta.owner.clone()),
                }));
            }
            TypeDef::Sealed(s) => {
                let doc = Documentation::from_meta(&s.meta, Maturity::default());
                // Claimed as a plain struct until the variants are known.
                let claim = registry.claim(GeneratedType::Struct(Struct {
                    name: name.to_string(),
                    doc: doc.clone(),
                    properties: Vec::new(),
                    generics: s.generics.clone(),
                    ownership: Ownership::declared(s.meta.owner.clone()),
                }));
                if claim == Claim::Known {
                    return Ok(());
                }
                tracing::debug!(%name, variants = s.variants.len(), "traverse: tagged union");

                let base_properties = self.properties(registry, &s.fields, doc.maturity, path)?;
                let mut options = Vec::with_capacity(s.variants.len());
                for variant in &s.variants {
                    let Some(variant_def) = self.schema.types.get(variant) else {
                        return Err(GenError::UnknownType { name: variant.clone(), path: path.clone() });
                    };
                    path.push(variant.as_str());
                    self.define(registry, variant, variant_def, path)?;
                    path.pop();
                    let params = variant_def.generics().iter().map(TypeRef::structure).collect();
                    options.push(TypeRef::generic(variant.as_str(), params));
                }

                registry.complete(GeneratedType::TaggedUnion(TaggedUnion {
                    name: name.to_string(),
                    doc,
                    base_properties,
                    generics: s.generics.clone(),
                    options,
                    ownership: Ownership::declared(s.meta.owner.clone()),
                }));
            }
            TypeDef::Enum(e) => {
                let doc = Documentation::from_meta(&e.meta, Maturity::default());
                let options = e
                    .constants
                    .iter()
                    .map(|c| EnumOption {
                        name: c.name.clone(),
                        doc: Documentation::from_meta(&c.meta, doc.maturity),
                    })
                    .collect();
                let ty = GeneratedType::Enum(Enum {
                    name: name.to_string(),
                    doc,
                    options,
                    ownership: Ownership::declared(e.meta.owner.clone()),
                });
                if registry.claim(ty.clone()) == Claim::Claimed {
                    tracing::debug!(%name, "traverse: enum");
                    registry.complete(ty);
                }
            }
        }
        Ok(())
    }

    /// Primary fields in declaration order, then the remaining fields whose
    /// wire name is not taken yet. Ignored fields never appear.
    fn properties(
        &self,
        registry: &mut Registry,
        fields: &[FieldDef],
        type_maturity: Maturity,
        path: &mut TypePath,
    ) -> Result<Vec<Property>> {
        let mut properties: Vec<Property> = Vec::with_capacity(fields.len());

        for field in fields.iter().filter(|f| f.primary && !f.ignored) {
            let property = self.property(registry, field, type_maturity, path)?;
            properties.push(property);
        }
        for field in fields.iter().filter(|f| !f.primary && !f.ignored) {
            if properties.iter().any(|p| p.name == field.wire_name()) {
                tracing::trace!(field = field.wire_name(), "traverse: shadowed by primary field");
                continue;
            }
            let property = self.property(registry, field, Maturity::default(), path)?;
            properties.push(property);
        }

        Ok(properties)
    }

    fn property(
        &self,
        registry: &mut Registry,
        field: &FieldDef,
        fallback: Maturity,
        path: &mut TypePath,
    ) -> Result<Property> {
        path.push(field.wire_name());
        let mut ty = self.traverse(registry, &field.ty, path)?;
        path.pop();

        if field.primary {
            // A defaulted field may be omitted by clients.
            ty.set_nullable(field.nullable || field.has_default);
            ty.set_has_default(field.has_default);
            ty.set_from_primary_definition(true);
        } else {
            ty.set_nullable(field.nullable);
        }
        ty.set_original_is_nullable(field.nullable);

        Ok(Property {
            name: field.wire_name().to_string(),
            doc: Documentation::from_meta(&field.meta, fallback),
            ty,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::TypeKind;
    use serde_json::{Value, json};

    fn schema(value: Value) -> SchemaDocument {
        serde_json::from_value(value).unwrap()
    }

    fn run(doc: &SchemaDocument, raw: RawType) -> Result<(TypeRef, Registry)> {
        let graph = TypeGraph::new(doc)?;
        let mut registry = Registry::new();
        let ty = graph.traverse(&mut registry, &raw, &mut TypePath::root("Test.call"))?;
        Ok((ty, registry))
    }

    fn get_struct<'r>(registry: &'r Registry, name: &str) -> &'r Struct {
        match registry.get(name) {
            Some(GeneratedType::Struct(s)) => s,
            other => panic!("expected struct `{name}`, found {other:?}"),
        }
    }

    #[test]
    fn self_reference_terminates() {
        let doc = schema(json!({ "types": {
            "Node": { "kind": "struct", "fields": [
                { "name": "children", "type": { "kind": "list", "element": { "kind": "named", "name": "Node" } } }
            ]}
        }}));
        let (ty, registry) = run(&doc, RawType::named("Node")).unwrap();

        assert_eq!(ty, TypeRef::structure("Node"));
        assert_eq!(registry.len(), 1);
        let node = get_struct(&registry, "Node");
        assert_eq!(node.properties.len(), 1);
        assert_eq!(node.properties[0].ty.kind(), &TypeKind::Array {
            element: Box::new(TypeRef::structure("Node"))
        });
        assert!(!registry.is_pending("Node"));
    }

    #[test]
    fn mutual_recursion_registers_each_name_once() {
        let doc = schema(json!({ "types": {
            "a.Folder": { "kind": "struct", "fields": [
                { "name": "files", "type": { "kind": "list", "element": { "kind": "named", "name": "a.File" } } }
            ]},
            "a.File": { "kind": "struct", "fields": [
                { "name": "parent", "type": { "kind": "named", "name": "a.Folder" }, "nullable": true }
            ]}
        }}));
        let (_, registry) = run(&doc, RawType::list(RawType::named("a.File"))).unwrap();
        let names: Vec<_> = registry.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["a.File", "a.Folder"]);
    }

    #[test]
    fn sealed_types_become_tagged_unions() {
        let doc = schema(json!({ "types": {
            "Shape": { "kind": "sealed", "variants": ["Circle", "Square"] },
            "Circle": { "kind": "struct", "fields": [{ "name": "radius", "type": { "kind": "float64" } }] },
            "Square": { "kind": "struct", "serial_name": "square", "fields": [{ "name": "side", "type": { "kind": "float64" } }] }
        }}));
        let (_, registry) = run(&doc, RawType::named("Shape")).unwrap();

        let Some(GeneratedType::TaggedUnion(shape)) = registry.get("Shape") else { panic!() };
        assert!(shape.base_properties.is_empty());
        assert_eq!(shape.options, vec![TypeRef::structure("Circle"), TypeRef::structure("Square")]);

        let circle = get_struct(&registry, "Circle");
        let tag = circle.properties.last().unwrap();
        assert_eq!(tag.name, "type");
        assert_eq!(tag.ty, TypeRef::constant("Circle"));
        assert_eq!(tag.doc.maturity, Maturity::Stable);

        let square = get_struct(&registry, "Square");
        assert_eq!(square.properties.last().unwrap().ty, TypeRef::constant("square"));
    }

    #[test]
    fn variant_reached_first_still_gets_its_tag() {
        let doc = schema(json!({ "types": {
            "Shape": { "kind": "sealed", "variants": ["Circle"] },
            "Circle": { "kind": "struct", "fields": [] }
        }}));
        let (_, registry) = run(&doc, RawType::named("Circle")).unwrap();
        let circle = get_struct(&registry, "Circle");
        assert_eq!(circle.properties[0].ty, TypeRef::constant("Circle"));
        assert!(!registry.contains("Shape"));
    }

    #[test]
    fn nullable_and_default_flags() {
        let doc = schema(json!({ "types": {
            "a.Options": { "kind": "struct", "fields": [
                { "name": "limit", "type": { "kind": "int32" }, "nullable": true, "has_default": true },
                { "name": "offset", "type": { "kind": "int32" }, "has_default": true },
                { "name": "total", "type": { "kind": "int64" }, "primary": false, "nullable": true }
            ]}
        }}));
        let (_, registry) = run(&doc, RawType::named("a.Options")).unwrap();
        let props = &get_struct(&registry, "a.Options").properties;

        let limit = &props[0].ty;
        assert!(limit.nullable() && limit.has_default() && limit.original_is_nullable());
        assert!(limit.from_primary_definition());

        let offset = &props[1].ty;
        assert!(offset.nullable() && offset.has_default() && !offset.original_is_nullable());

        let total = &props[2].ty;
        assert!(total.nullable() && !total.has_default() && !total.from_primary_definition());
    }

    #[test]
    fn primary_fields_win_and_ignored_fields_vanish() {
        let doc = schema(json!({ "types": {
            "a.User": { "kind": "struct", "maturity": { "stage": "stable" }, "fields": [
                { "name": "userName", "rename": "username", "type": { "kind": "text" } },
                { "name": "cache", "type": { "kind": "any" }, "ignored": true },
                { "name": "username", "type": { "kind": "int32" }, "primary": false },
                { "name": "displayName", "type": { "kind": "text" }, "primary": false }
            ]}
        }}));
        let (_, registry) = run(&doc, RawType::named("a.User")).unwrap();
        let props = &get_struct(&registry, "a.User").properties;

        let names: Vec<_> = props.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["username", "displayName"]);
        assert_eq!(props[0].ty, {
            let mut t = TypeRef::text();
            t.set_from_primary_definition(true);
            t
        });
        assert_eq!(props[0].doc.maturity, Maturity::Stable);
        assert_eq!(props[1].doc.maturity, Maturity::default());
    }

    #[test]
    fn generic_definitions_stay_raw() {
        let doc = schema(json!({ "types": {
            "a.Page": { "kind": "struct", "generics": ["T"], "fields": [
                { "name": "items", "type": { "kind": "list", "element": { "kind": "param", "name": "T" } } }
            ]},
            "a.User": { "kind": "struct", "fields": [] },
            "a.Invoice": { "kind": "struct", "fields": [] }
        }}));
        let graph = TypeGraph::new(&doc).unwrap();
        let mut registry = Registry::new();
        let mut path = TypePath::root("Test.call");
        let users = graph
            .traverse(&mut registry, &RawType::generic("a.Page", vec![RawType::named("a.User")]), &mut path)
            .unwrap();
        let invoices = graph
            .traverse(&mut registry, &RawType::generic("a.Page", vec![RawType::named("a.Invoice")]), &mut path)
            .unwrap();

        assert_eq!(users, TypeRef::generic("a.Page", vec![TypeRef::structure("a.User")]));
        assert_eq!(invoices, TypeRef::generic("a.Page", vec![TypeRef::structure("a.Invoice")]));
        let page = get_struct(&registry, "a.Page");
        assert_eq!(page.generics, ["T"]);
        assert_eq!(page.properties[0].ty.kind(), &TypeKind::Array {
            element: Box::new(TypeRef::structure("T"))
        });
        assert_eq!(path.segments(), ["Test.call"]);
    }

    #[test]
    fn enum_constants_keep_order_and_docs() {
        let doc = schema(json!({ "types": {
            "a.Level": { "kind": "enum", "constants": [
                { "name": "C" }, { "name": "A", "doc": "First letter" }, { "name": "B" }
            ]}
        }}));
        let (_, registry) = run(&doc, RawType::named("a.Level")).unwrap();
        let Some(GeneratedType::Enum(level)) = registry.get("a.Level") else { panic!() };
        let names: Vec<_> = level.options.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["C", "A", "B"]);
        assert_eq!(level.options[1].doc.synopsis.as_deref(), Some("First letter"));
    }

    #[test]
    fn json_shapes_map_to_any() {
        let doc = SchemaDocument::default();
        let (json, _) = run(&doc, RawType::Json).unwrap();
        assert!(json.nullable());
        assert_eq!(json.kind(), &TypeKind::Any);
        let (object, _) = run(&doc, RawType::JsonObject).unwrap();
        assert!(matches!(object.kind(), TypeKind::Dictionary { .. }));
        let (bounded, _) =
            run(&doc, RawType::Wildcard { upper_bound: Some(Box::new(RawType::Text)) }).unwrap();
        assert_eq!(bounded, TypeRef::text());
    }

    #[test]
    fn failures_carry_the_path() {
        let doc = schema(json!({ "types": {
            "a.Req": { "kind": "struct", "fields": [
                { "name": "filter", "type": { "kind": "wildcard" } }
            ]}
        }}));
        let err = run(&doc, RawType::named("a.Req")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unsupported type shape at Test.call → a.Req → filter: unbounded wildcard"
        );

        let err = run(&doc, RawType::named("a.Missing")).unwrap_err();
        assert!(matches!(err, GenError::UnknownType { ref name, .. } if name == "a.Missing"));

        let err = run(&doc, RawType::generic("a.Req", vec![RawType::Text])).unwrap_err();
        assert!(matches!(err, GenError::ArityMismatch { expected: 0, found: 1, .. }));
    }

    #[test]
    fn malformed_hierarchies_are_rejected_up_front() {
        let empty = schema(json!({ "types": { "S": { "kind": "sealed", "variants": [] } } }));
        assert!(matches!(TypeGraph::new(&empty), Err(GenError::MalformedHierarchy { .. })));

        let not_struct = schema(json!({ "types": {
            "S": { "kind": "sealed", "variants": ["E"] },
            "E": { "kind": "enum", "constants": [] }
        }}));
        assert!(matches!(TypeGraph::new(&not_struct), Err(GenError::MalformedHierarchy { .. })));

        let own_type = schema(json!({ "types": {
            "S": { "kind": "sealed", "variants": ["V"] },
            "V": { "kind": "struct", "fields": [{ "name": "type", "type": { "kind": "text" } }] }
        }}));
        assert!(matches!(TypeGraph::new(&own_type), Err(GenError::MalformedHierarchy { .. })));

        let conflicting = schema(json!({ "types": {
            "S": { "kind": "sealed", "variants": ["V"] },
            "T": { "kind": "sealed", "variants": ["V"] },
            "V": { "kind": "struct", "fields": [] }
        }}));
        assert!(TypeGraph::new(&conflicting).is_ok(), "same tag under two parents is fine");
    }
}
