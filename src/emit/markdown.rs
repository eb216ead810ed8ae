//! Reference documentation: one markdown page per call container, listing
//! its calls and the data models it owns.
use std::cmp::Reverse;
use std::fmt::Write;

use super::{Artifact, EmitContext, Emitter, group_stems, groups};
use crate::compile::{Compilation, ContainerSummary};
use crate::error::Result;
use crate::ir::{Documentation, GeneratedCall, GeneratedType, Maturity, Property, Role, TypeKind, TypeRef, simple_name};

pub struct Markdown;

impl Emitter for Markdown {
    fn name(&self) -> &'static str { "markdown" }

    fn emit(&self, compilation: &Compilation, cx: &EmitContext<'_>) -> Result<Vec<Artifact>> {
        let stems = group_stems(compilation);
        let groups = groups(compilation);
        let artifacts = compilation
            .containers
            .iter()
            .map(|container| {
                let owned = groups.get(container.name.as_str()).map(Vec::as_slice).unwrap_or_default();
                let page = page(container, compilation, owned, cx);
                Artifact::new(format!("{}.md", stems[&container.name]), page)
            })
            .collect();
        Ok(artifacts)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// PAGE
// ————————————————————————————————————————————————————————————————————————————

fn page(container: &ContainerSummary, compilation: &Compilation, owned: &[&GeneratedType], cx: &EmitContext<'_>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# `{}`\n", simple_name(&container.name));
    let _ = writeln!(out, "{}\n", maturity_badge(&container.doc.maturity));
    if let Some(synopsis) = &container.doc.synopsis {
        let _ = writeln!(out, "_{}_\n", cx.render_doc(synopsis, &container.name));
    }
    if let Some(description) = &container.doc.description {
        let _ = writeln!(out, "## Rationale\n\n{}\n", cx.render_doc(description, &container.name));
    }

    let calls = ordered_calls(compilation.calls_of(&container.name).collect());
    if !calls.is_empty() {
        out.push_str("## Remote Procedure Calls\n\n");
        for call in calls {
            call_section(&mut out, call, cx);
        }
    }

    if !owned.is_empty() {
        out.push_str("## Data Models\n\n");
        for ty in ordered_types(owned.to_vec()) {
            type_section(&mut out, ty, cx);
        }
    }
    out
}

/// Most important first, then by name. Negative importance is hidden.
fn ordered_calls(mut calls: Vec<&GeneratedCall>) -> Vec<&GeneratedCall> {
    calls.retain(|c| c.doc.importance >= 0);
    calls.sort_by(|a, b| {
        b.doc.importance.cmp(&a.doc.importance).then_with(|| a.name.cmp(&b.name))
    });
    calls
}

/// Plain models first, request and response wrappers last.
fn ordered_types(mut types: Vec<&GeneratedType>) -> Vec<&GeneratedType> {
    fn rank(name: &str) -> u8 {
        if name.contains("Request") {
            1
        } else if name.contains("Response") {
            2
        } else {
            0
        }
    }
    // Ranked on the last segment; packages may themselves be named `requests`.
    let last = |name: &str| name.rsplit('.').next().map_or(0, rank);
    types.sort_by_key(|t| (last(t.name()), Reverse(t.doc().importance), t.name().to_string()));
    types
}

fn call_section(out: &mut String, call: &GeneratedCall, cx: &EmitContext<'_>) {
    let _ = writeln!(out, "### `{}`\n", call.name);
    let _ = writeln!(out, "{}", maturity_badge(&call.doc.maturity));
    let _ = writeln!(out, "{}", roles_badge(call));
    if call.doc.deprecated {
        let _ = writeln!(out, "{}", badge("Deprecated", "Yes", "red"));
    }
    out.push('\n');
    if let Some(synopsis) = &call.doc.synopsis {
        let _ = writeln!(out, "_{}_\n", cx.render_doc(synopsis, &call.container));
    }
    out.push_str("| Request | Response | Error |\n");
    out.push_str("|---------|----------|-------|\n");
    let _ = writeln!(
        out,
        "|<code>{}</code>|<code>{}</code>|<code>{}</code>|\n",
        notation(&call.request),
        notation(&call.response),
        notation(&call.error)
    );
    if let Some(description) = &call.doc.description {
        let _ = writeln!(out, "{}\n", cx.render_doc(description, &call.container));
    }
    if !call.response_examples.is_empty() {
        out.push_str("| Status | Description |\n|--------|-------------|\n");
        for example in &call.response_examples {
            let _ = writeln!(out, "| `{}` | {} |", example.status_code, example.description);
        }
        out.push('\n');
    }
}

fn type_section(out: &mut String, ty: &GeneratedType, cx: &EmitContext<'_>) {
    let doc = ty.doc();
    let _ = writeln!(out, "### `{}`\n", simple_name(ty.name()));
    let _ = writeln!(out, "{}", maturity_badge(&doc.maturity));
    if doc.deprecated {
        let _ = writeln!(out, "{}", badge("Deprecated", "Yes", "red"));
    }
    out.push('\n');
    if let Some(synopsis) = &doc.synopsis {
        let _ = writeln!(out, "_{}_\n", cx.render_doc(synopsis, ty.name()));
    }
    if let Some(description) = &doc.description {
        let _ = writeln!(out, "{}\n", cx.render_doc(description, ty.name()));
    }

    match ty {
        GeneratedType::Enum(e) => {
            out.push_str("| Option | Description |\n|--------|-------------|\n");
            for option in &e.options {
                let _ = writeln!(out, "| `{}` | {} |", option.name, cell(&option.doc, doc, ty.name(), cx));
            }
        }
        GeneratedType::Struct(s) => property_table(out, &s.properties, doc, ty.name(), cx),
        GeneratedType::TaggedUnion(u) => {
            let options: Vec<String> = u.options.iter().map(|o| format!("`{}`", notation(o))).collect();
            let _ = writeln!(out, "One of: {}\n", options.join(", "));
            if !u.base_properties.is_empty() {
                property_table(out, &u.base_properties, doc, ty.name(), cx);
            }
        }
    }
    out.push_str("\n---\n\n");
}

fn property_table(out: &mut String, properties: &[Property], parent: &Documentation, declared_in: &str, cx: &EmitContext<'_>) {
    out.push_str("| Property | Type | Description |\n|----------|------|-------------|\n");
    for property in properties {
        let _ = writeln!(
            out,
            "| `{}` | `{}` | {} |",
            property.name,
            notation(&property.ty),
            cell(&property.doc, parent, declared_in, cx)
        );
    }
}

/// Synopsis for a table cell, with a maturity badge when it differs from
/// the enclosing type.
fn cell(doc: &Documentation, parent: &Documentation, declared_in: &str, cx: &EmitContext<'_>) -> String {
    let mut parts = Vec::new();
    if doc.maturity != parent.maturity {
        parts.push(maturity_badge(&doc.maturity));
    }
    if doc.deprecated {
        parts.push(badge("Deprecated", "Yes", "red"));
    }
    if let Some(synopsis) = &doc.synopsis {
        parts.push(cx.render_doc(synopsis, declared_in).replace('|', "\\|"));
    }
    parts.join(" ")
}

// ————————————————————————————————————————————————————————————————————————————
// NOTATION
// ————————————————————————————————————————————————————————————————————————————

/// Language-neutral rendering of a descriptor, e.g. `List<Money>?`.
pub fn notation(ty: &TypeRef) -> String {
    let base = match ty.kind() {
        TypeKind::Int8 => "Int8".to_string(),
        TypeKind::Int16 => "Int16".to_string(),
        TypeKind::Int32 => "Int32".to_string(),
        TypeKind::Int64 => "Int64".to_string(),
        TypeKind::Float32 => "Float32".to_string(),
        TypeKind::Float64 => "Float64".to_string(),
        TypeKind::Bool => "Boolean".to_string(),
        TypeKind::Text => "String".to_string(),
        TypeKind::Void => "Unit".to_string(),
        TypeKind::Any => "Any".to_string(),
        TypeKind::ConstantString { value } => format!("\"{value}\""),
        TypeKind::Array { element } => format!("List<{}>", notation(element)),
        TypeKind::Dictionary { value } => format!("Map<String, {}>", notation(value)),
        TypeKind::Structure { name, generics } if generics.is_empty() => simple_name(name),
        TypeKind::Structure { name, generics } => {
            let args: Vec<String> = generics.iter().map(notation).collect();
            format!("{}<{}>", simple_name(name), args.join(", "))
        }
    };
    if ty.nullable() { format!("{base}?") } else { base }
}

fn badge(label: &str, message: &str, color: &str) -> String {
    format!(
        "![{label}: {message}](https://img.shields.io/static/v1?label={}&message={}&color={color}&style=flat-square)",
        label.replace(' ', "%20"),
        message.replace(' ', "%20"),
    )
}

fn maturity_badge(maturity: &Maturity) -> String {
    let color = match maturity {
        Maturity::Internal { .. } => "red",
        Maturity::Experimental { .. } => "orange",
        Maturity::Stable => "green",
    };
    badge("API", &maturity.label(), color)
}

fn roles_badge(call: &GeneratedCall) -> String {
    let message = if call.roles.is_empty() {
        "Public".to_string()
    } else {
        call.roles.iter().map(role_label).collect::<Vec<_>>().join(", ")
    };
    badge("Auth", &message, "informational")
}

fn role_label(role: &Role) -> &'static str {
    match role {
        Role::Guest => "Guest",
        Role::User => "User",
        Role::Admin => "Admin",
        Role::Service => "Service",
        Role::ThirdPartyApp => "Third party app",
        Role::Provider => "Provider",
    }
}
