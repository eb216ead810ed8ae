//! One JSON Schema (2020-12) document: a `$defs` entry per registry type,
//! one per generic instantiation that is actually used, and the three
//! boundary schemas of every call under `x-calls`.
use indexmap::IndexMap;
use serde_json::{Map, Value, json};

use super::{Artifact, EmitContext, Emitter};
use crate::compile::Compilation;
use crate::error::Result;
use crate::generics::{Substitution, substitute};
use crate::ir::{Documentation, GeneratedType, Property, TypeKind, TypeRef};
use crate::traverse::DISCRIMINATOR;

pub struct JsonSchema;

/// Beyond this many nested instantiations a generic reference falls back to
/// its raw definition.
const MAX_INSTANTIATION_DEPTH: usize = 8;

impl Emitter for JsonSchema {
    fn name(&self) -> &'static str { "json-schema" }

    fn emit(&self, compilation: &Compilation, cx: &EmitContext<'_>) -> Result<Vec<Artifact>> {
        let mut builder = Builder { compilation, cx, defs: IndexMap::new(), depth: 0 };

        for ty in compilation.types.types() {
            let schema = builder.definition(ty, &Substitution::new());
            builder.defs.insert(ty.name().to_string(), schema);
        }

        let mut calls = Map::new();
        for call in &compilation.calls {
            let mut entry = json!({
                "request": builder.schema(&call.request),
                "response": builder.schema(&call.response),
                "error": builder.schema(&call.error),
            });
            annotate(&mut entry, &call.doc, |text| cx.render_doc(text, &call.container));
            calls.insert(call.qualified_name(), entry);
        }

        let document = json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "$defs": Value::Object(builder.defs.into_iter().collect()),
            "x-calls": Value::Object(calls),
        });
        let mut contents = serde_json::to_string_pretty(&document)?;
        contents.push('\n');
        Ok(vec![Artifact::new("schema.json", contents)])
    }
}

fn def_ref(key: &str) -> Value {
    json!({ "$ref": format!("#/$defs/{}", key.replace('~', "~0").replace('/', "~1")) })
}

fn nullable(inner: Value) -> Value {
    json!({ "oneOf": [inner, { "type": "null" }] })
}

fn annotate(schema: &mut Value, doc: &Documentation, render: impl Fn(&str) -> String) {
    let Some(obj) = schema.as_object_mut() else { return };
    if let Some(synopsis) = &doc.synopsis {
        obj.insert("title".into(), Value::from(render(synopsis)));
    }
    if let Some(description) = &doc.description {
        obj.insert("description".into(), Value::from(render(description)));
    }
    if doc.deprecated {
        obj.insert("deprecated".into(), Value::Bool(true));
    }
}

/// `a.Page<a.User>`; used as the `$defs` key of an instantiation.
fn instantiation_key(ty: &TypeRef) -> String {
    match ty.kind() {
        TypeKind::Structure { name, generics } if !generics.is_empty() => {
            let args: Vec<String> = generics.iter().map(instantiation_key).collect();
            format!("{name}<{}>", args.join(", "))
        }
        TypeKind::Structure { name, .. } => name.clone(),
        TypeKind::Array { element } => format!("List<{}>", instantiation_key(element)),
        TypeKind::Dictionary { value } => format!("Map<{}>", instantiation_key(value)),
        TypeKind::ConstantString { value } => format!("\"{value}\""),
        other => format!("{other:?}"),
    }
}

struct Builder<'a> {
    compilation: &'a Compilation,
    cx: &'a EmitContext<'a>,
    defs: IndexMap<String, Value>,
    depth: usize,
}

impl Builder<'_> {
    fn schema(&mut self, ty: &TypeRef) -> Value {
        let base = match ty.kind() {
            TypeKind::Int8 => json!({ "type": "integer", "minimum": i8::MIN, "maximum": i8::MAX }),
            TypeKind::Int16 => json!({ "type": "integer", "minimum": i16::MIN, "maximum": i16::MAX }),
            TypeKind::Int32 => json!({ "type": "integer", "format": "int32" }),
            TypeKind::Int64 => json!({ "type": "integer", "format": "int64" }),
            TypeKind::Float32 => json!({ "type": "number", "format": "float" }),
            TypeKind::Float64 => json!({ "type": "number", "format": "double" }),
            TypeKind::Bool => json!({ "type": "boolean" }),
            TypeKind::Text => json!({ "type": "string" }),
            TypeKind::Void => json!({ "type": "object" }),
            TypeKind::Any => json!({}),
            TypeKind::ConstantString { value } => json!({ "const": value }),
            TypeKind::Array { element } => json!({ "type": "array", "items": self.schema(element) }),
            TypeKind::Dictionary { value } => {
                json!({ "type": "object", "additionalProperties": self.schema(value) })
            }
            TypeKind::Structure { name, generics } => self.structure(ty, name, generics),
        };
        if ty.nullable() { nullable(base) } else { base }
    }

    fn structure(&mut self, ty: &TypeRef, name: &str, generics: &[TypeRef]) -> Value {
        let compilation = self.compilation;
        let Some(def) = compilation.types.get(name) else {
            // Unbound parameter of a raw generic definition.
            return json!({ "x-type-parameter": name });
        };
        if generics.is_empty() || self.depth >= MAX_INSTANTIATION_DEPTH {
            return def_ref(name);
        }

        let key = instantiation_key(&ty.clone().with_nullable(false));
        if !self.defs.contains_key(&key) {
            // Reserve the key first so recursive instantiations resolve to it.
            self.defs.insert(key.clone(), Value::Null);
            let subst: Substitution = def
                .generics()
                .iter()
                .cloned()
                .zip(generics.iter().cloned())
                .collect();
            self.depth += 1;
            let schema = self.definition(def, &subst);
            self.depth -= 1;
            self.defs.insert(key.clone(), schema);
        }
        def_ref(&key)
    }

    fn definition(&mut self, ty: &GeneratedType, subst: &Substitution) -> Value {
        let mut schema = match ty {
            GeneratedType::Enum(e) => json!({
                "type": "string",
                "enum": e.options.iter().map(|o| o.name.clone()).collect::<Vec<_>>(),
            }),
            GeneratedType::Struct(s) => self.object(&s.properties, subst),
            GeneratedType::TaggedUnion(u) => {
                let options: Vec<Value> = u
                    .options
                    .iter()
                    .map(|o| self.schema(&substitute(o, subst)))
                    .collect();
                let mut out = json!({
                    "oneOf": options,
                    "discriminator": { "propertyName": DISCRIMINATOR },
                });
                if !u.base_properties.is_empty() {
                    out["allOf"] = json!([self.object(&u.base_properties, subst)]);
                }
                out
            }
        };
        let cx = self.cx;
        annotate(&mut schema, ty.doc(), |text| cx.render_doc(text, ty.name()));
        schema
    }

    fn object(&mut self, properties: &[Property], subst: &Substitution) -> Value {
        let mut props = Map::new();
        let mut required = Vec::new();
        for property in properties {
            let ty = substitute(&property.ty, subst);
            let mut schema = self.schema(&ty);
            if let Some(synopsis) = &property.doc.synopsis
                && let Some(obj) = schema.as_object_mut()
            {
                obj.insert("description".into(), Value::from(synopsis.clone()));
            }
            if !ty.nullable() {
                required.push(Value::from(property.name.clone()));
            }
            props.insert(property.name.clone(), schema);
        }
        let mut out = json!({ "type": "object", "properties": props });
        if !required.is_empty() {
            out["required"] = Value::Array(required);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile;
    use crate::config::Config;
    use crate::emit::tests::sample;
    use crate::schema::SchemaDocument;

    fn document(compilation: &Compilation) -> Value {
        let config = Config::default();
        let out = JsonSchema.emit(compilation, &EmitContext::new(&config)).unwrap();
        serde_json::from_str(&out[0].contents).unwrap()
    }

    #[test]
    fn nullable_properties_are_optional() {
        let doc = document(&sample());
        let money = &doc["$defs"]["acme.pay.Money"];
        assert_eq!(money["required"], json!(["cents"]));
        assert_eq!(
            money["properties"]["currency"],
            json!({ "oneOf": [{ "$ref": "#/$defs/acme.pay.Currency" }, { "type": "null" }] })
        );
        assert_eq!(money["title"], "An amount of money");
    }

    #[test]
    fn tagged_unions_use_a_discriminator() {
        let doc = document(&sample());
        assert_eq!(
            doc["$defs"]["acme.pay.Method"],
            json!({
                "oneOf": [{ "$ref": "#/$defs/acme.pay.Card" }, { "$ref": "#/$defs/acme.pay.Transfer" }],
                "discriminator": { "propertyName": "type" }
            })
        );
        let tag = &doc["$defs"]["acme.pay.Card"]["properties"]["type"];
        assert_eq!(tag["const"], "Card");
        assert_eq!(tag["description"], "The type discriminator");
        assert_eq!(doc["x-calls"]["payments.pay"]["error"], json!({ "type": "string" }));
    }

    #[test]
    fn generic_instantiations_get_their_own_definition() {
        let schema: SchemaDocument = serde_json::from_value(json!({
            "types": {
                "a.Page": { "kind": "struct", "generics": ["T"], "fields": [
                    { "name": "items", "type": { "kind": "list", "element": { "kind": "param", "name": "T" } } },
                    { "name": "next", "type": { "kind": "named", "name": "a.Page", "args": [{ "kind": "param", "name": "T" }] }, "nullable": true }
                ]},
                "a.User": { "kind": "struct", "fields": [] }
            },
            "containers": [{ "name": "Users", "namespace": "users", "calls": [{
                "name": "browse", "doc": "Lists users",
                "request": { "kind": "void" },
                "response": { "kind": "named", "name": "a.Page", "args": [{ "kind": "named", "name": "a.User" }] },
                "error": { "kind": "void" }
            }]}]
        }))
        .unwrap();
        let doc = document(&compile(&schema, &Config::default()).unwrap());

        assert_eq!(doc["x-calls"]["users.browse"]["response"], json!({ "$ref": "#/$defs/a.Page<a.User>" }));
        let page = &doc["$defs"]["a.Page<a.User>"];
        assert_eq!(page["properties"]["items"]["items"], json!({ "$ref": "#/$defs/a.User" }));
        assert_eq!(
            page["properties"]["next"]["oneOf"][0],
            json!({ "$ref": "#/$defs/a.Page<a.User>" })
        );
        assert_eq!(
            doc["$defs"]["a.Page"]["properties"]["items"]["items"],
            json!({ "x-type-parameter": "T" })
        );
    }
}
