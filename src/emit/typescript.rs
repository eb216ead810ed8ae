//! TypeScript interface definitions: one module per owning container plus a
//! `Numbers.ts` module with the width-tagged number aliases.
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Write;

use super::{Artifact, EmitContext, Emitter, GENERATED_HEADER, flat_name, group_stems, groups};
use crate::compile::Compilation;
use crate::error::Result;
use crate::ir::{Documentation, GeneratedType, Property, TypeKind, TypeRef};

pub struct TypeScript;

const NUMBER_ALIASES: [&str; 6] = ["Int8", "Int16", "Int32", "Int64", "Float32", "Float64"];

impl Emitter for TypeScript {
    fn name(&self) -> &'static str { "typescript" }

    fn emit(&self, compilation: &Compilation, cx: &EmitContext<'_>) -> Result<Vec<Artifact>> {
        let stems = group_stems(compilation);
        let mut out = vec![numbers_module()];

        for (group, types) in groups(compilation) {
            let calls: Vec<_> = compilation.calls_of(group).collect();
            if types.is_empty() && calls.is_empty() {
                continue;
            }
            let mut module = Module::new(group, compilation, &stems);
            let mut body = String::new();

            for ty in &types {
                body.push_str(&module.declaration(ty, cx));
                body.push('\n');
            }

            if !calls.is_empty() {
                let _ = writeln!(body, "export interface {}Api {{", stems[group]);
                for call in calls {
                    if let Some(doc) = jsdoc(&call.doc, &call.container, cx, "    ") {
                        body.push_str(&doc);
                    }
                    let request = module.reference(&call.request);
                    let response = module.reference(&call.response);
                    let _ = writeln!(
                        body,
                        "    {}(request: {request}): Promise<{response}>;",
                        safe_identifier(&call.name)
                    );
                }
                body.push_str("}\n");
            }

            out.push(Artifact::new(format!("{}.ts", stems[group]), module.finish(&body)));
        }
        Ok(out)
    }
}

fn numbers_module() -> Artifact {
    let mut src = format!("/* eslint-disable */\n// {GENERATED_HEADER}\n");
    for alias in NUMBER_ALIASES {
        let _ = writeln!(src, "export type {alias} = number;");
    }
    Artifact::new("Numbers.ts", src)
}

fn safe_identifier(name: &str) -> &str {
    match name {
        "delete" => "remove",
        "new" => "new_",
        other => other,
    }
}

fn jsdoc(doc: &Documentation, declared_in: &str, cx: &EmitContext<'_>, indent: &str) -> Option<String> {
    if doc.synopsis.is_none() && doc.description.is_none() && !doc.deprecated {
        return None;
    }
    let mut out = format!("{indent}/**\n");
    for text in doc.synopsis.iter().chain(doc.description.iter()) {
        for line in cx.render_doc(text, declared_in).lines() {
            let _ = writeln!(out, "{indent} * {line}");
        }
    }
    if doc.deprecated {
        let _ = writeln!(out, "{indent} * @deprecated");
    }
    let _ = writeln!(out, "{indent} */");
    Some(out.replace(" * \n", " *\n"))
}

struct Module<'a> {
    group: &'a str,
    compilation: &'a Compilation,
    stems: &'a HashMap<String, String>,
    /// Module stem → imported names.
    imports: BTreeMap<String, BTreeSet<String>>,
    numbers: BTreeSet<&'static str>,
}

impl<'a> Module<'a> {
    fn new(group: &'a str, compilation: &'a Compilation, stems: &'a HashMap<String, String>) -> Self {
        Module { group, compilation, stems, imports: BTreeMap::new(), numbers: BTreeSet::new() }
    }

    fn finish(self, body: &str) -> String {
        let mut out = format!("/* eslint-disable */\n// {GENERATED_HEADER}\n");
        if !self.numbers.is_empty() {
            let names: Vec<_> = self.numbers.into_iter().collect();
            let _ = writeln!(out, "import {{ {} }} from \"./Numbers\";", names.join(", "));
        }
        for (stem, names) in &self.imports {
            let names: Vec<_> = names.iter().map(String::as_str).collect();
            let _ = writeln!(out, "import {{ {} }} from \"./{stem}\";", names.join(", "));
        }
        out.push('\n');
        out.push_str(body);
        out
    }

    fn declaration(&mut self, ty: &GeneratedType, cx: &EmitContext<'_>) -> String {
        let mut out = String::new();
        if let Some(doc) = jsdoc(ty.doc(), ty.name(), cx, "") {
            out.push_str(&doc);
        }
        let name = flat_name(ty.name());
        match ty {
            GeneratedType::Enum(e) => {
                let literals: Vec<String> = e.options.iter().map(|o| format!("\"{}\"", o.name)).collect();
                let _ = writeln!(out, "export type {name} = {};", literals.join(" | "));
                let _ = writeln!(
                    out,
                    "export const {name}Values: {name}[] = [{}];",
                    literals.join(", ")
                );
            }
            GeneratedType::Struct(s) => {
                let _ = writeln!(out, "export interface {name}{} {{", params(&s.generics));
                out.push_str(&self.properties(&s.properties, ty.name(), cx));
                out.push_str("}\n");
            }
            GeneratedType::TaggedUnion(u) => {
                let options: Vec<String> = u.options.iter().map(|o| self.reference(o)).collect();
                let union = options.join(" | ");
                if u.base_properties.is_empty() {
                    let _ = writeln!(out, "export type {name}{} = {union};", params(&u.generics));
                } else {
                    let _ = writeln!(out, "export interface {name}Base{} {{", params(&u.generics));
                    out.push_str(&self.properties(&u.base_properties, ty.name(), cx));
                    out.push_str("}\n");
                    let _ = writeln!(
                        out,
                        "export type {name}{generics} = {name}Base{generics} & ({union});",
                        generics = params(&u.generics)
                    );
                }
            }
        }
        out
    }

    fn properties(&mut self, properties: &[Property], declared_in: &str, cx: &EmitContext<'_>) -> String {
        let mut out = String::new();
        for property in properties {
            if let Some(doc) = jsdoc(&property.doc, declared_in, cx, "    ") {
                out.push_str(&doc);
            }
            let base = self.base(&property.ty);
            if property.ty.nullable() {
                let _ = writeln!(out, "    {}?: {base} | null;", property.name);
            } else {
                let _ = writeln!(out, "    {}: {base};", property.name);
            }
        }
        out
    }

    /// A descriptor in type position (generic argument, array element,
    /// call signature).
    fn reference(&mut self, ty: &TypeRef) -> String {
        let base = self.base(ty);
        if ty.nullable() { format!("{base} | null | undefined") } else { base }
    }

    fn base(&mut self, ty: &TypeRef) -> String {
        match ty.kind() {
            TypeKind::Int8 => self.number("Int8"),
            TypeKind::Int16 => self.number("Int16"),
            TypeKind::Int32 => self.number("Int32"),
            TypeKind::Int64 => self.number("Int64"),
            TypeKind::Float32 => self.number("Float32"),
            TypeKind::Float64 => self.number("Float64"),
            TypeKind::Bool => "boolean".to_string(),
            TypeKind::Text => "string".to_string(),
            TypeKind::Void => "{}".to_string(),
            TypeKind::Any => "any".to_string(),
            TypeKind::ConstantString { value } => format!("\"{value}\""),
            TypeKind::Array { element } => format!("({})[]", self.reference(element)),
            TypeKind::Dictionary { value } => format!("Record<string, {}>", self.reference(value)),
            TypeKind::Structure { name, generics } => {
                self.import(name);
                let mut out = flat_name(name);
                if !generics.is_empty() {
                    let args: Vec<String> = generics.iter().map(|g| self.reference(g)).collect();
                    let _ = write!(out, "<{}>", args.join(", "));
                }
                out
            }
        }
    }

    fn number(&mut self, alias: &'static str) -> String {
        self.numbers.insert(alias);
        alias.to_string()
    }

    fn import(&mut self, name: &str) {
        let Some(ty) = self.compilation.types.get(name) else { return };
        let group = super::group_of(ty);
        if group == self.group {
            return;
        }
        if let Some(stem) = self.stems.get(group) {
            self.imports.entry(stem.clone()).or_default().insert(flat_name(name));
        }
    }
}

fn params(generics: &[String]) -> String {
    if generics.is_empty() { String::new() } else { format!("<{}>", generics.join(", ")) }
}
