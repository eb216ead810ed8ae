//! Emitters render a finished [`Compilation`] into text artifacts. They are
//! pure: writing the artifacts somewhere is the caller's business.
use std::collections::HashMap;
use std::path::PathBuf;

use indexmap::IndexMap;
use rayon::prelude::*;

use crate::compile::Compilation;
use crate::config::Config;
use crate::docref::{self, LinkContext};
use crate::error::Result;
use crate::ir::{GeneratedType, package_of, simple_name};

pub mod ir;
pub mod json_schema;
pub mod markdown;
pub mod rust;
pub mod typescript;

/// Group for types nobody owns.
pub const SHARED_GROUP: &str = "Shared";

pub const GENERATED_HEADER: &str = "Generated by rpc-typegraph. Do not edit.";

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Relative to the output directory.
    pub path: PathBuf,
    pub contents: String,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>, contents: String) -> Self {
        Artifact { path: path.into(), contents }
    }
}

pub struct EmitContext<'a> {
    pub config: &'a Config,
}

impl<'a> EmitContext<'a> {
    pub fn new(config: &'a Config) -> Self { EmitContext { config } }

    /// Rewrite cross-references in `text`, declared inside `declared_in`
    /// (a qualified type or container name).
    pub fn render_doc(&self, text: &str, declared_in: &str) -> String {
        let package = package_of(declared_in);
        docref::rewrite(
            text,
            &LinkContext { package: package.as_deref(), base_url: &self.config.docs_base_url },
        )
    }
}

pub trait Emitter: Sync {
    fn name(&self) -> &'static str;
    fn emit(&self, compilation: &Compilation, cx: &EmitContext<'_>) -> Result<Vec<Artifact>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Target {
    Typescript,
    Markdown,
    JsonSchema,
    Rust,
    Ir,
}

impl Target {
    pub const ALL: [Target; 5] = [
        Target::Typescript,
        Target::Markdown,
        Target::JsonSchema,
        Target::Rust,
        Target::Ir,
    ];

    pub fn emitter(self) -> &'static dyn Emitter {
        match self {
            Target::Typescript => &typescript::TypeScript,
            Target::Markdown => &markdown::Markdown,
            Target::JsonSchema => &json_schema::JsonSchema,
            Target::Rust => &rust::RustModels,
            Target::Ir => &ir::IrJson,
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// DRIVER
// ————————————————————————————————————————————————————————————————————————————

/// Run the emitters for `targets` in parallel. Artifacts come back in target
/// order regardless of which emitter finishes first.
pub fn emit_all(compilation: &Compilation, cx: &EmitContext<'_>, targets: &[Target]) -> Result<Vec<Artifact>> {
    let per_target = targets
        .par_iter()
        .map(|target| {
            let emitter = target.emitter();
            let _span = tracing::debug_span!("emit", target = emitter.name()).entered();
            let artifacts = emitter.emit(compilation, cx)?;
            tracing::debug!(artifacts = artifacts.len(), "emit: done");
            Ok(artifacts)
        })
        .collect::<Result<Vec<Vec<Artifact>>>>()?;
    Ok(per_target.into_iter().flatten().collect())
}

// ————————————————————————————————————————————————————————————————————————————
// SHARED HELPERS
// ————————————————————————————————————————————————————————————————————————————

pub fn group_of(ty: &GeneratedType) -> &str {
    ty.ownership().owner.as_deref().unwrap_or(SHARED_GROUP)
}

/// Types per group: compiled containers first (in compile order, even when
/// they own nothing), then other owners, then the shared group. Registry
/// order within a group.
pub fn groups(compilation: &Compilation) -> IndexMap<&str, Vec<&GeneratedType>> {
    let mut out: IndexMap<&str, Vec<&GeneratedType>> = compilation
        .containers
        .iter()
        .map(|c| (c.name.as_str(), Vec::new()))
        .collect();
    let mut shared = Vec::new();
    for ty in compilation.types.types() {
        match ty.ownership().owner.as_deref() {
            Some(owner) => out.entry(owner).or_default().push(ty),
            None => shared.push(ty),
        }
    }
    if !shared.is_empty() {
        out.insert(SHARED_GROUP, shared);
    }
    out
}

/// `acme.Product.Storage` → `ProductStorage`
pub fn flat_name(qualified: &str) -> String {
    simple_name(qualified).replace('.', "")
}

/// File stem per group: a container's namespace in `UpperCamel`, otherwise
/// its flattened name.
pub fn group_stems(compilation: &Compilation) -> HashMap<String, String> {
    let mut stems: HashMap<String, String> = compilation
        .containers
        .iter()
        .map(|c| (c.name.clone(), namespace_stem(&c.namespace)))
        .collect();
    for group in groups(compilation).keys() {
        stems.entry(group.to_string()).or_insert_with(|| flat_name(group));
    }
    stems
}

/// `accounting.wallets` → `AccountingWallets`
pub fn namespace_stem(namespace: &str) -> String {
    namespace
        .split(['.', '-', '_'])
        .filter(|s| !s.is_empty())
        .map(|s| {
            let mut chars = s.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}
