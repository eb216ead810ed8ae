//! Explicit input schema.
//!
//! The graph builder never introspects a running program. Instead the RPC
//! declarations arrive as a data table: named type definitions, generic call
//! container bases, and the containers themselves. Metadata that other
//! ecosystems attach as annotations (docs, maturity, explicit ownership) is a
//! plain structured field here.
use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{GenError, Result};
use crate::ir::{Maturity, ResponseExample, Role};

// ————————————————————————————————————————————————————————————————————————————
// RAW TYPES
// ————————————————————————————————————————————————————————————————————————————

/// A raw type handle, the thing `traverse` turns into a `TypeRef`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawType {
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Bool,
    Text,
    Void,
    Any,
    /// Arbitrary JSON element.
    Json,
    /// Arbitrary JSON object.
    JsonObject,
    List { element: Box<RawType> },
    Set { element: Box<RawType> },
    /// Generic (fixed element) array.
    Array { element: Box<RawType> },
    /// Keys are textual and are not modeled.
    Map {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key: Option<Box<RawType>>,
        value: Box<RawType>,
    },
    /// Unbound type variable.
    Param { name: String },
    Named {
        name: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<RawType>,
    },
    Wildcard {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        upper_bound: Option<Box<RawType>>,
    },
}

impl RawType {
    pub fn named(name: impl Into<String>) -> Self {
        RawType::Named { name: name.into(), args: Vec::new() }
    }

    pub fn generic(name: impl Into<String>, args: Vec<RawType>) -> Self {
        RawType::Named { name: name.into(), args }
    }

    pub fn param(name: impl Into<String>) -> Self {
        RawType::Param { name: name.into() }
    }

    pub fn list(element: RawType) -> Self {
        RawType::List { element: Box::new(element) }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// METADATA
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maturity: Option<Maturity>,
    #[serde(default)]
    pub importance: i32,
    /// Explicit owning container. Only read on type definitions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

// ————————————————————————————————————————————————————————————————————————————
// TYPE DEFINITIONS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeDef {
    Struct(StructDef),
    Sealed(SealedDef),
    Enum(EnumDef),
}

impl TypeDef {
    pub fn meta(&self) -> &Metadata {
        match self {
            TypeDef::Struct(s) => &s.meta,
            TypeDef::Sealed(s) => &s.meta,
            TypeDef::Enum(e) => &e.meta,
        }
    }

    pub fn generics(&self) -> &[String] {
        match self {
            TypeDef::Struct(s) => &s.generics,
            TypeDef::Sealed(s) => &s.generics,
            TypeDef::Enum(_) => &[],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructDef {
    #[serde(default)]
    pub generics: Vec<String>,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    /// Wire tag used as the discriminator value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_name: Option<String>,
    #[serde(flatten)]
    pub meta: Metadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SealedDef {
    #[serde(default)]
    pub generics: Vec<String>,
    /// Base properties shared by every variant.
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    pub variants: Vec<String>,
    #[serde(flatten)]
    pub meta: Metadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnumDef {
    pub constants: Vec<EnumConstant>,
    #[serde(flatten)]
    pub meta: Metadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumConstant {
    pub name: String,
    #[serde(flatten)]
    pub meta: Metadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: RawType,
    /// Declared nullable.
    #[serde(default)]
    pub nullable: bool,
    /// Has a default value, so it may be omitted.
    #[serde(default)]
    pub has_default: bool,
    /// Part of the canonical constructor rather than a derived property.
    #[serde(default = "default_true")]
    pub primary: bool,
    /// Transient / never serialized.
    #[serde(default)]
    pub ignored: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename: Option<String>,
    #[serde(flatten)]
    pub meta: Metadata,
}

fn default_true() -> bool { true }

impl FieldDef {
    /// Name on the wire.
    pub fn wire_name(&self) -> &str {
        self.rename.as_deref().unwrap_or(&self.name)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// CALL CONTAINERS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerRole {
    Public,
    Provider,
    Control,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupertypeRef {
    pub name: String,
    #[serde(default)]
    pub args: Vec<RawType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallDef {
    pub name: String,
    pub request: RawType,
    pub response: RawType,
    pub error: RawType,
    #[serde(default)]
    pub roles: BTreeSet<Role>,
    #[serde(default)]
    pub response_examples: Vec<ResponseExample>,
    #[serde(flatten)]
    pub meta: Metadata,
}

/// A generic supertype of call containers, e.g. a resource API that is
/// parameterized over the resource it manages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaseDef {
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default)]
    pub supertypes: Vec<SupertypeRef>,
    #[serde(default)]
    pub calls: Vec<CallDef>,
    #[serde(flatten)]
    pub meta: Metadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerDef {
    pub name: String,
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<ContainerRole>,
    #[serde(default)]
    pub supertypes: Vec<SupertypeRef>,
    #[serde(default)]
    pub calls: Vec<CallDef>,
    #[serde(flatten)]
    pub meta: Metadata,
}

// ————————————————————————————————————————————————————————————————————————————
// DOCUMENT
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDocument {
    #[serde(default)]
    pub types: IndexMap<String, TypeDef>,
    #[serde(default)]
    pub bases: IndexMap<String, BaseDef>,
    #[serde(default)]
    pub containers: Vec<ContainerDef>,
}

impl SchemaDocument {
    /// Fold `other` into `self`. Order is preserved: entries of `other` land
    /// after the existing ones.
    pub fn merge(&mut self, other: SchemaDocument) -> Result<()> {
        for (name, def) in other.types {
            if self.types.contains_key(&name) {
                return Err(GenError::DuplicateDefinition { what: "type", name });
            }
            self.types.insert(name, def);
        }
        for (name, def) in other.bases {
            if self.bases.contains_key(&name) {
                return Err(GenError::DuplicateDefinition { what: "base", name });
            }
            self.bases.insert(name, def);
        }
        for container in other.containers {
            if self.container(&container.name).is_some() {
                return Err(GenError::DuplicateDefinition {
                    what: "container",
                    name: container.name,
                });
            }
            self.containers.push(container);
        }
        Ok(())
    }

    pub fn container(&self, name: &str) -> Option<&ContainerDef> {
        self.containers.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_flattened_metadata_and_defaults() {
        let doc: SchemaDocument = serde_json::from_value(json!({
            "types": {
                "acme.Money": {
                    "kind": "struct",
                    "doc": "An amount\nin minor units",
                    "owner": "Payments",
                    "fields": [
                        { "name": "amount", "type": { "kind": "int64" } },
                        { "name": "currency", "type": { "kind": "text" }, "nullable": true, "has_default": true }
                    ]
                }
            }
        }))
        .unwrap();

        let TypeDef::Struct(money) = &doc.types["acme.Money"] else { panic!("expected struct") };
        assert_eq!(money.meta.owner.as_deref(), Some("Payments"));
        assert_eq!(money.fields.len(), 2);
        assert!(money.fields[0].primary, "fields are primary unless stated otherwise");
        assert!(money.fields[1].nullable && money.fields[1].has_default);
    }

    #[test]
    fn raw_types_are_tagged_by_kind() {
        let raw: RawType = serde_json::from_value(json!({
            "kind": "named",
            "name": "acme.Page",
            "args": [{ "kind": "map", "value": { "kind": "param", "name": "T" } }]
        }))
        .unwrap();
        assert_eq!(
            raw,
            RawType::generic(
                "acme.Page",
                vec![RawType::Map { key: None, value: Box::new(RawType::param("T")) }],
            )
        );
    }

    #[test]
    fn merge_rejects_duplicates() {
        let mut a = SchemaDocument::default();
        a.types.insert("acme.A".into(), TypeDef::Struct(StructDef::default()));
        let mut b = SchemaDocument::default();
        b.types.insert("acme.A".into(), TypeDef::Struct(StructDef::default()));
        let err = a.merge(b).unwrap_err();
        assert!(matches!(err, GenError::DuplicateDefinition { what: "type", .. }));
    }
}
