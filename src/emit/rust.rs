//! Serde wire decoders: one Rust module with a type per registry entry.
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt::Write;

use super::{Artifact, EmitContext, Emitter, GENERATED_HEADER, flat_name, namespace_stem};
use crate::compile::Compilation;
use crate::error::Result;
use crate::ir::{Documentation, GeneratedType, Property, Struct, TaggedUnion, TypeKind, TypeRef, package_of};
use crate::traverse::DISCRIMINATOR;

pub struct RustModels;

impl Emitter for RustModels {
    fn name(&self) -> &'static str { "rust" }

    fn emit(&self, compilation: &Compilation, cx: &EmitContext<'_>) -> Result<Vec<Artifact>> {
        let mut generator = Generator::new(compilation, cx);
        let mut body = String::new();
        for ty in compilation.types.types() {
            body.push('\n');
            body.push_str(&generator.declaration(ty));
        }

        let mut out = format!("// {GENERATED_HEADER}\n\nuse serde::{{Deserialize, Serialize}};\n");
        if generator.uses_map {
            out.push_str("use std::collections::BTreeMap;\n");
        }
        if generator.uses_void {
            out.push_str(
                "\n/// Empty payload.\n\
                 #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]\n\
                 pub struct Void {}\n",
            );
        }
        out.push_str(&body);
        Ok(vec![Artifact::new("models.rs", out)])
    }
}

// ————————————————————————————————————————————————————————————————————————————
// NAMES
// ————————————————————————————————————————————————————————————————————————————

const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do", "dyn",
    "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in", "let", "loop",
    "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref", "return", "static",
    "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized", "use", "virtual",
    "where", "while", "yield",
];

/// `displayName` → `display_name`, `type` → `r#type`
pub fn field_ident(wire: &str) -> String {
    let mut out = String::with_capacity(wire.len() + 4);
    let mut prev_lower = false;
    for c in wire.chars() {
        if c.is_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.extend(c.to_lowercase());
            prev_lower = false;
        } else if c.is_alphanumeric() {
            out.push(c);
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
        } else {
            out.push('_');
            prev_lower = false;
        }
    }
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    match out.as_str() {
        "self" | "super" | "crate" => format!("{out}_"),
        s if KEYWORDS.contains(&s) => format!("r#{out}"),
        _ => out,
    }
}

/// `IN_PROGRESS` → `InProgress`, `active` → `Active`
pub fn variant_ident(wire: &str) -> String {
    let out: String = wire
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|segment| {
            let shouting = segment.chars().all(|c| !c.is_lowercase());
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) if shouting => {
                    first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect::<String>()
                }
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        format!("V{out}")
    } else {
        out
    }
}

/// Rust type names per registry entry. Flattened simple names, prefixed
/// with the package when two entries would collide.
fn type_names(compilation: &Compilation) -> HashMap<String, String> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut names = HashMap::new();
    for (qualified, _) in compilation.types.iter() {
        let mut name = flat_name(qualified);
        if !taken.insert(name.clone()) {
            let prefix = package_of(qualified).map(|p| namespace_stem(&p)).unwrap_or_default();
            name = format!("{prefix}{name}");
            let mut n = 2;
            while !taken.insert(name.clone()) {
                name = format!("{prefix}{}{n}", flat_name(qualified));
                n += 1;
            }
        }
        names.insert(qualified.to_string(), name);
    }
    names
}

// ————————————————————————————————————————————————————————————————————————————
// GENERATOR
// ————————————————————————————————————————————————————————————————————————————

struct Generator<'a> {
    compilation: &'a Compilation,
    cx: &'a EmitContext<'a>,
    names: HashMap<String, String>,
    /// Registry name → every registry name mentioned by its members.
    edges: HashMap<&'a str, BTreeSet<&'a str>>,
    /// Structs embedded in an enum, whose tag serde writes itself.
    variants: HashSet<&'a str>,
    uses_map: bool,
    uses_void: bool,
}

impl<'a> Generator<'a> {
    fn new(compilation: &'a Compilation, cx: &'a EmitContext<'a>) -> Self {
        let mut edges: HashMap<&'a str, BTreeSet<&'a str>> = HashMap::new();
        for (name, ty) in compilation.types.iter() {
            let targets = edges.entry(name).or_default();
            for member in ty.member_types() {
                member.walk(&mut |t| {
                    if let TypeKind::Structure { name, .. } = t.kind()
                        && compilation.types.contains(name)
                    {
                        targets.insert(name.as_str());
                    }
                });
            }
        }
        let variants = compilation
            .types
            .types()
            .filter_map(|ty| match ty {
                GeneratedType::TaggedUnion(u) => Some(u.options.iter().filter_map(TypeRef::bare_structure_name)),
                _ => None,
            })
            .flatten()
            .collect();
        Generator {
            compilation,
            cx,
            names: type_names(compilation),
            edges,
            variants,
            uses_map: false,
            uses_void: false,
        }
    }

    fn reaches(&self, from: &str, to: &str) -> bool {
        let mut seen = HashSet::new();
        let mut stack = vec![from];
        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            if let Some(next) = self.edges.get(current) {
                stack.extend(next.iter().copied());
            }
        }
        false
    }

    fn doc_comment(&self, doc: &Documentation, declared_in: &str, indent: &str) -> String {
        let mut out = String::new();
        for text in doc.synopsis.iter().chain(doc.description.iter()) {
            if !out.is_empty() {
                let _ = writeln!(out, "{indent}///");
            }
            for line in self.cx.render_doc(text, declared_in).lines() {
                if line.is_empty() {
                    let _ = writeln!(out, "{indent}///");
                } else {
                    let _ = writeln!(out, "{indent}/// {line}");
                }
            }
        }
        if doc.deprecated {
            let _ = writeln!(out, "{indent}#[deprecated]");
        }
        out
    }

    fn declaration(&mut self, ty: &GeneratedType) -> String {
        let mut out = self.doc_comment(ty.doc(), ty.name(), "");
        let name = self.names.get(ty.name()).cloned().unwrap_or_else(|| flat_name(ty.name()));
        match ty {
            GeneratedType::Enum(e) => {
                out.push_str("#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]\n");
                let _ = writeln!(out, "pub enum {name} {{");
                for option in &e.options {
                    out.push_str(&self.doc_comment(&option.doc, ty.name(), "    "));
                    let ident = variant_ident(&option.name);
                    if ident != option.name {
                        let _ = writeln!(out, "    #[serde(rename = \"{}\")]", option.name);
                    }
                    let _ = writeln!(out, "    {ident},");
                }
                out.push_str("}\n");
            }
            GeneratedType::Struct(s) => self.structure(&mut out, &name, s),
            GeneratedType::TaggedUnion(u) => self.union(&mut out, &name, u),
        }
        out
    }

    fn structure(&mut self, out: &mut String, name: &str, s: &Struct) {
        let tag = s.properties.iter().find_map(|p| match p.ty.kind() {
            TypeKind::ConstantString { value } if p.name == DISCRIMINATOR => Some(value.clone()),
            _ => None,
        });
        if let Some(tag) = &tag {
            if !out.is_empty() {
                out.push_str("///\n");
            }
            let _ = writeln!(out, "/// Wire tag: `\"{tag}\"`.");
        }
        out.push_str("#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]\n");
        let _ = writeln!(out, "pub struct {name}{} {{", params(&s.generics));
        self.fields(out, &s.name, &s.properties);
        out.push_str("}\n");
    }

    fn union(&mut self, out: &mut String, name: &str, u: &TaggedUnion) {
        let generics = params(&u.generics);
        let enum_name = if u.base_properties.is_empty() { name.to_string() } else { format!("{name}Variant") };

        if !u.base_properties.is_empty() {
            out.push_str("#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]\n");
            let _ = writeln!(out, "pub struct {name}{generics} {{");
            self.fields(out, &u.name, &u.base_properties);
            out.push_str("    #[serde(flatten)]\n");
            let _ = writeln!(out, "    pub variant: {enum_name}{generics},");
            out.push_str("}\n\n");
        }

        out.push_str("#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]\n");
        let _ = writeln!(out, "#[serde(tag = \"{DISCRIMINATOR}\")]");
        let _ = writeln!(out, "pub enum {enum_name}{generics} {{");
        for option in &u.options {
            let TypeKind::Structure { name: variant, .. } = option.kind() else { continue };
            let tag = self.tag_of(variant);
            let inner = self.field_type(option, &u.name);
            let ident = variant_ident(self.names.get(variant).map(String::as_str).unwrap_or(variant.as_str()));
            let _ = writeln!(out, "    #[serde(rename = \"{tag}\")]");
            let _ = writeln!(out, "    {ident}({inner}),");
        }
        out.push_str("}\n");
    }

    fn tag_of(&self, variant: &str) -> String {
        let tag = match self.compilation.types.get(variant) {
            Some(GeneratedType::Struct(s)) => s.properties.iter().find_map(|p| match p.ty.kind() {
                TypeKind::ConstantString { value } if p.name == DISCRIMINATOR => Some(value.clone()),
                _ => None,
            }),
            _ => None,
        };
        tag.unwrap_or_else(|| variant.rsplit('.').next().unwrap_or(variant).to_string())
    }

    fn fields(&mut self, out: &mut String, owner: &str, properties: &[Property]) {
        for property in properties {
            // Inside an enum the discriminator is written by serde.
            if matches!(property.ty.kind(), TypeKind::ConstantString { .. }) && self.variants.contains(owner) {
                continue;
            }
            out.push_str(&self.doc_comment(&property.doc, owner, "    "));
            let ident = field_ident(&property.name);
            let plain = ident.trim_start_matches("r#").trim_end_matches('_');
            if plain != property.name {
                let _ = writeln!(out, "    #[serde(rename = \"{}\")]", property.name);
            }
            let ty = self.field_type(&property.ty, owner);
            if property.ty.nullable() {
                out.push_str("    #[serde(default, skip_serializing_if = \"Option::is_none\")]\n");
            }
            let _ = writeln!(out, "    pub {ident}: {ty},");
        }
    }

    /// Type of a field of `owner`. Direct edges back into `owner` are boxed.
    fn field_type(&mut self, ty: &TypeRef, owner: &str) -> String {
        let inner = self.type_name(ty);
        let inner = match ty.kind() {
            TypeKind::Structure { name, .. } if self.compilation.types.contains(name) && self.reaches(name, owner) => {
                format!("Box<{inner}>")
            }
            _ => inner,
        };
        if ty.nullable() { format!("Option<{inner}>") } else { inner }
    }

    fn type_name(&mut self, ty: &TypeRef) -> String {
        let nested = |this: &mut Self, t: &TypeRef| {
            let name = this.type_name(t);
            if t.nullable() { format!("Option<{name}>") } else { name }
        };
        match ty.kind() {
            TypeKind::Int8 => "i8".to_string(),
            TypeKind::Int16 => "i16".to_string(),
            TypeKind::Int32 => "i32".to_string(),
            TypeKind::Int64 => "i64".to_string(),
            TypeKind::Float32 => "f32".to_string(),
            TypeKind::Float64 => "f64".to_string(),
            TypeKind::Bool => "bool".to_string(),
            TypeKind::Text | TypeKind::ConstantString { .. } => "String".to_string(),
            TypeKind::Any => "serde_json::Value".to_string(),
            TypeKind::Void => {
                self.uses_void = true;
                "Void".to_string()
            }
            TypeKind::Array { element } => format!("Vec<{}>", nested(self, element.as_ref())),
            TypeKind::Dictionary { value } => {
                self.uses_map = true;
                format!("BTreeMap<String, {}>", nested(self, value.as_ref()))
            }
            TypeKind::Structure { name, generics } => {
                let mut out = self.names.get(name).cloned().unwrap_or_else(|| name.clone());
                if !generics.is_empty() {
                    let args: Vec<String> = generics.iter().map(|g| nested(self, g)).collect();
                    let _ = write!(out, "<{}>", args.join(", "));
                }
                out
            }
        }
    }
}

fn params(generics: &[String]) -> String {
    if generics.is_empty() { String::new() } else { format!("<{}>", generics.join(", ")) }
}
