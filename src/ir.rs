// Canonical IR shared by every emitter. No raw schema types in here.
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::docref;
use crate::schema::Metadata;

// ————————————————————————————————————————————————————————————————————————————
// TYPE DESCRIPTORS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeKind {
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Bool,
    Text,
    Array { element: Box<TypeRef> },
    /// Keys are always textual.
    Dictionary { value: Box<TypeRef> },
    /// A registry type, or (bare, before resolution) a generic parameter.
    Structure { name: String, generics: Vec<TypeRef> },
    /// Fixed discriminator literal.
    ConstantString { value: String },
    Void,
    Any,
}

/// A type descriptor: a possibly nested reference to a type plus the flags
/// describing how it appears at its use site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeRef {
    #[serde(flatten)]
    kind: TypeKind,
    nullable: bool,
    original_is_nullable: bool,
    has_default: bool,
    from_primary_definition: bool,
}

impl TypeRef {
    pub fn new(kind: TypeKind) -> Self {
        TypeRef {
            kind,
            nullable: false,
            original_is_nullable: false,
            has_default: false,
            from_primary_definition: false,
        }
    }

    pub fn int8() -> Self { Self::new(TypeKind::Int8) }
    pub fn int16() -> Self { Self::new(TypeKind::Int16) }
    pub fn int32() -> Self { Self::new(TypeKind::Int32) }
    pub fn int64() -> Self { Self::new(TypeKind::Int64) }
    pub fn float32() -> Self { Self::new(TypeKind::Float32) }
    pub fn float64() -> Self { Self::new(TypeKind::Float64) }
    pub fn bool() -> Self { Self::new(TypeKind::Bool) }
    pub fn text() -> Self { Self::new(TypeKind::Text) }
    pub fn void() -> Self { Self::new(TypeKind::Void) }
    pub fn any() -> Self { Self::new(TypeKind::Any) }

    pub fn array(element: TypeRef) -> Self {
        Self::new(TypeKind::Array { element: Box::new(element) })
    }

    pub fn dictionary(value: TypeRef) -> Self {
        Self::new(TypeKind::Dictionary { value: Box::new(value) })
    }

    pub fn structure(name: impl Into<String>) -> Self {
        Self::generic(name, Vec::new())
    }

    pub fn generic(name: impl Into<String>, generics: Vec<TypeRef>) -> Self {
        Self::new(TypeKind::Structure { name: name.into(), generics })
    }

    pub fn constant(value: impl Into<String>) -> Self {
        Self::new(TypeKind::ConstantString { value: value.into() })
    }

    pub fn kind(&self) -> &TypeKind { &self.kind }

    pub fn nullable(&self) -> bool { self.nullable }
    pub fn original_is_nullable(&self) -> bool { self.original_is_nullable }
    pub fn has_default(&self) -> bool { self.has_default }
    pub fn from_primary_definition(&self) -> bool { self.from_primary_definition }

    /// Ignored for constant strings: a discriminator is never client data.
    pub fn set_nullable(&mut self, nullable: bool) {
        self.nullable = nullable && !matches!(self.kind, TypeKind::ConstantString { .. });
    }

    pub fn set_original_is_nullable(&mut self, value: bool) {
        self.original_is_nullable = value;
    }

    pub fn set_has_default(&mut self, value: bool) {
        self.has_default = value;
    }

    pub fn set_from_primary_definition(&mut self, value: bool) {
        self.from_primary_definition = value;
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.set_nullable(nullable);
        self
    }

    /// Name of a bare `Structure` (no generic arguments).
    pub fn bare_structure_name(&self) -> Option<&str> {
        match &self.kind {
            TypeKind::Structure { name, generics } if generics.is_empty() => Some(name),
            _ => None,
        }
    }

    /// Copy the use-site flags of `site` onto this descriptor. Nullability is
    /// combined, the rest is taken from the site.
    pub fn adopt_flags(&mut self, site: &TypeRef) {
        let nullable = self.nullable || site.nullable;
        self.set_nullable(nullable);
        self.original_is_nullable = self.original_is_nullable || site.original_is_nullable;
        self.has_default = site.has_default;
        self.from_primary_definition = site.from_primary_definition;
    }

    /// Rebuild with a new kind, keeping the flags.
    pub fn map_kind(&self, kind: TypeKind) -> TypeRef {
        let mut out = TypeRef { kind, ..self.clone() };
        out.set_nullable(self.nullable);
        out
    }

    /// Visit this descriptor and every nested descriptor, parents first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a TypeRef)) {
        visit(self);
        match &self.kind {
            TypeKind::Array { element } => element.walk(visit),
            TypeKind::Dictionary { value } => value.walk(visit),
            TypeKind::Structure { generics, .. } => {
                for g in generics { g.walk(visit); }
            }
            _ => {}
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// DOCUMENTATION
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaturityLevel {
    Alpha,
    Beta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Maturity {
    Internal { level: MaturityLevel },
    Experimental { level: MaturityLevel },
    Stable,
}

impl Default for Maturity {
    fn default() -> Self {
        Maturity::Internal { level: MaturityLevel::Beta }
    }
}

impl Maturity {
    pub fn label(&self) -> String {
        match self {
            Maturity::Internal { level } => format!("Internal/{}", level_label(*level)),
            Maturity::Experimental { level } => format!("Experimental/{}", level_label(*level)),
            Maturity::Stable => "Stable".to_string(),
        }
    }
}

fn level_label(level: MaturityLevel) -> &'static str {
    match level {
        MaturityLevel::Alpha => "Alpha",
        MaturityLevel::Beta => "Beta",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Documentation {
    pub deprecated: bool,
    pub maturity: Maturity,
    pub synopsis: Option<String>,
    pub description: Option<String>,
    /// Only used to order human-facing output.
    pub importance: i32,
}

impl Documentation {
    /// Build from declared metadata; `fallback` applies when no maturity is
    /// declared. Cross-reference markup is kept verbatim for the emitters.
    pub fn from_meta(meta: &Metadata, fallback: Maturity) -> Self {
        let (synopsis, description) = match meta.doc.as_deref() {
            Some(text) => docref::split_doc(text),
            None => (None, None),
        };
        Documentation {
            deprecated: meta.deprecated,
            maturity: meta.maturity.unwrap_or(fallback),
            synopsis,
            description,
            importance: meta.importance,
        }
    }

    pub fn discriminator() -> Self {
        Documentation {
            maturity: Maturity::Stable,
            synopsis: Some("The type discriminator".to_string()),
            ..Documentation::default()
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// GENERATED TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Documentation placement only; never part of type identity.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Ownership {
    pub owner: Option<String>,
    /// Declared on the definition; never overridden by a claim.
    pub explicit: bool,
}

impl Ownership {
    pub fn declared(owner: Option<String>) -> Self {
        Ownership { explicit: owner.is_some(), owner }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Property {
    pub name: String,
    pub doc: Documentation,
    #[serde(rename = "type")]
    pub ty: TypeRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Struct {
    pub name: String,
    pub doc: Documentation,
    /// Declaration order; emitters must not reorder.
    pub properties: Vec<Property>,
    pub generics: Vec<String>,
    pub ownership: Ownership,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumOption {
    pub name: String,
    pub doc: Documentation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Enum {
    pub name: String,
    pub doc: Documentation,
    pub options: Vec<EnumOption>,
    pub ownership: Ownership,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaggedUnion {
    pub name: String,
    pub doc: Documentation,
    pub base_properties: Vec<Property>,
    pub generics: Vec<String>,
    /// One `Structure` per variant, declaration order.
    pub options: Vec<TypeRef>,
    pub ownership: Ownership,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeneratedType {
    Struct(Struct),
    Enum(Enum),
    TaggedUnion(TaggedUnion),
}

impl GeneratedType {
    pub fn name(&self) -> &str {
        match self {
            GeneratedType::Struct(s) => &s.name,
            GeneratedType::Enum(e) => &e.name,
            GeneratedType::TaggedUnion(u) => &u.name,
        }
    }

    pub fn doc(&self) -> &Documentation {
        match self {
            GeneratedType::Struct(s) => &s.doc,
            GeneratedType::Enum(e) => &e.doc,
            GeneratedType::TaggedUnion(u) => &u.doc,
        }
    }

    pub fn ownership(&self) -> &Ownership {
        match self {
            GeneratedType::Struct(s) => &s.ownership,
            GeneratedType::Enum(e) => &e.ownership,
            GeneratedType::TaggedUnion(u) => &u.ownership,
        }
    }

    pub fn ownership_mut(&mut self) -> &mut Ownership {
        match self {
            GeneratedType::Struct(s) => &mut s.ownership,
            GeneratedType::Enum(e) => &mut e.ownership,
            GeneratedType::TaggedUnion(u) => &mut u.ownership,
        }
    }

    pub fn generics(&self) -> &[String] {
        match self {
            GeneratedType::Struct(s) => &s.generics,
            GeneratedType::Enum(_) => &[],
            GeneratedType::TaggedUnion(u) => &u.generics,
        }
    }

    /// Every descriptor directly held by this type: properties, base
    /// properties and union options.
    pub fn member_types(&self) -> Vec<&TypeRef> {
        match self {
            GeneratedType::Struct(s) => s.properties.iter().map(|p| &p.ty).collect(),
            GeneratedType::Enum(_) => Vec::new(),
            GeneratedType::TaggedUnion(u) => u
                .base_properties
                .iter()
                .map(|p| &p.ty)
                .chain(u.options.iter())
                .collect(),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// GENERATED CALLS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Guest,
    User,
    Admin,
    Service,
    ThirdPartyApp,
    Provider,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseExample {
    pub status_code: u16,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedCall {
    /// Name of the call container that exposes this call.
    pub container: String,
    pub namespace: String,
    pub name: String,
    pub request: TypeRef,
    pub response: TypeRef,
    pub error: TypeRef,
    pub roles: BTreeSet<Role>,
    pub doc: Documentation,
    pub response_examples: Vec<ResponseExample>,
}

impl GeneratedCall {
    /// `namespace.name`, the identifier used in call references.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }

    pub fn descriptors(&self) -> [&TypeRef; 3] {
        [&self.request, &self.response, &self.error]
    }
}

// ————————————————————————————————————————————————————————————————————————————
// NAMES
// ————————————————————————————————————————————————————————————————————————————

fn starts_uppercase(segment: &str) -> bool {
    segment.chars().next().is_some_and(|c| c.is_uppercase())
}

/// `dk.sdu.cloud.Product.Storage` → `Product.Storage`
pub fn simple_name(qualified: &str) -> String {
    let parts: Vec<&str> = qualified.split('.').filter(|s| starts_uppercase(s)).collect();
    if parts.is_empty() { qualified.to_string() } else { parts.join(".") }
}

/// `dk.sdu.cloud.Product.Storage` → `dk.sdu.cloud`; `None` without a package.
pub fn package_of(qualified: &str) -> Option<String> {
    let parts: Vec<&str> = qualified
        .split('.')
        .filter(|s| !s.is_empty() && !starts_uppercase(s))
        .collect();
    if parts.is_empty() { None } else { Some(parts.join(".")) }
}
