//! Call compiler: drives traversal, generic resolution and ownership for
//! every call of every container, then runs the post-run checks.
use std::collections::HashSet;

use serde::Serialize;

use crate::config::Config;
use crate::diagnostics::{Diagnostics, Warning};
use crate::docref;
use crate::error::{Result, TypePath};
use crate::generics;
use crate::ir::{Documentation, GeneratedCall, GeneratedType, Maturity, TypeRef};
use crate::ownership::OwnershipResolver;
use crate::registry::Registry;
use crate::schema::{ContainerDef, RawType, SchemaDocument};
use crate::traverse::TypeGraph;

// ————————————————————————————————————————————————————————————————————————————
// OUTPUT
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerSummary {
    pub name: String,
    pub namespace: String,
    pub doc: Documentation,
}

/// Everything one run produces. Serializes to the canonical IR; advisory
/// warnings are not part of it.
#[derive(Debug, Clone, Serialize)]
pub struct Compilation {
    pub containers: Vec<ContainerSummary>,
    pub types: Registry,
    pub calls: Vec<GeneratedCall>,
    #[serde(skip)]
    pub diagnostics: Diagnostics,
}

impl Compilation {
    pub fn calls_of<'a>(&'a self, container: &'a str) -> impl Iterator<Item = &'a GeneratedCall> + 'a {
        self.calls.iter().filter(move |c| c.container == container)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// COMPILER
// ————————————————————————————————————————————————————————————————————————————

pub struct Compiler<'s> {
    graph: TypeGraph<'s>,
    config: Config,
    registry: Registry,
    ownership: OwnershipResolver,
    diagnostics: Diagnostics,
    containers: Vec<ContainerSummary>,
    calls: Vec<GeneratedCall>,
}

impl<'s> Compiler<'s> {
    pub fn new(schema: &'s SchemaDocument, config: &Config) -> Result<Self> {
        Ok(Compiler {
            graph: TypeGraph::new(schema)?,
            config: config.clone(),
            registry: Registry::new(),
            ownership: OwnershipResolver::new(config)?,
            diagnostics: Diagnostics::new(),
            containers: Vec::new(),
            calls: Vec::new(),
        })
    }

    pub fn compile_container(&mut self, container: &'s ContainerDef) -> Result<()> {
        let span = tracing::info_span!("container", name = %container.name);
        let _guard = span.enter();

        self.ownership.register(container);
        let container_doc = Documentation::from_meta(&container.meta, Maturity::default());
        let scoped = generics::collect_calls(&self.graph, &mut self.registry, container)?;
        tracing::debug!(calls = scoped.len(), "compile: collected calls");

        for scoped_call in scoped {
            let def = scoped_call.def;
            let qualified = format!("{}.{}", container.namespace, def.name);
            let mut path = TypePath::root(qualified.as_str());

            let request = self.slot(&def.request, "request", &mut path)?;
            let response = self.slot(&def.response, "response", &mut path)?;
            let error = self.slot(&def.error, "error", &mut path)?;

            let mut params = Vec::new();
            for raw in [&def.request, &def.response, &def.error] {
                generics::raw_params(raw, &mut params);
            }

            // Undeclared call maturity follows the container's.
            let mut call = GeneratedCall {
                container: container.name.clone(),
                namespace: container.namespace.clone(),
                name: def.name.clone(),
                request,
                response,
                error,
                roles: def.roles.clone(),
                doc: Documentation::from_meta(&def.meta, container_doc.maturity),
                response_examples: def.response_examples.clone(),
            };
            generics::resolve_call(&mut call, &scoped_call.bindings, &params, &self.registry)?;

            self.ownership.claim_reachable(
                &mut self.registry,
                &mut self.diagnostics,
                &container.name,
                &call.descriptors(),
            );
            tracing::trace!(call = %qualified, "compile: done");
            self.calls.push(call);
        }

        self.containers.push(ContainerSummary {
            name: container.name.clone(),
            namespace: container.namespace.clone(),
            doc: container_doc,
        });
        Ok(())
    }

    fn slot(&mut self, raw: &RawType, slot: &str, path: &mut TypePath) -> Result<TypeRef> {
        path.push(slot);
        let ty = self.graph.traverse(&mut self.registry, raw, path)?;
        path.pop();
        Ok(ty)
    }

    /// Run the post-run checks and hand over the result.
    pub fn finish(mut self) -> Compilation {
        let compiled: HashSet<&str> = self.containers.iter().map(|c| c.name.as_str()).collect();

        for (name, ty) in self.registry.iter() {
            let ownership = ty.ownership();
            match &ownership.owner {
                None if self.config.is_own(name) => {
                    self.diagnostics.warn(Warning::MissingOwner { type_name: name.to_string() })
                }
                Some(owner) if ownership.explicit && !compiled.contains(owner.as_str()) => {
                    self.diagnostics.warn(Warning::UnknownOwner {
                        type_name: name.to_string(),
                        owner: owner.clone(),
                    })
                }
                _ => {}
            }
            for text in type_doc_texts(ty) {
                check_refs(&mut self.diagnostics, name, text);
            }
        }

        for call in &self.calls {
            let subject = call.qualified_name();
            if self.config.warn_missing_docs && call.doc.synopsis.is_none() {
                self.diagnostics.warn(Warning::MissingDocumentation { subject: subject.clone() });
            }
            for text in doc_texts(&call.doc) {
                check_refs(&mut self.diagnostics, &subject, text);
            }
        }

        Compilation {
            containers: self.containers,
            types: self.registry,
            calls: self.calls,
            diagnostics: self.diagnostics,
        }
    }
}

fn doc_texts(doc: &Documentation) -> impl Iterator<Item = &str> {
    doc.synopsis.as_deref().into_iter().chain(doc.description.as_deref())
}

fn type_doc_texts(ty: &GeneratedType) -> Vec<&str> {
    let mut texts: Vec<&str> = doc_texts(ty.doc()).collect();
    match ty {
        GeneratedType::Struct(s) => texts.extend(s.properties.iter().flat_map(|p| doc_texts(&p.doc))),
        GeneratedType::Enum(e) => texts.extend(e.options.iter().flat_map(|o| doc_texts(&o.doc))),
        GeneratedType::TaggedUnion(u) => {
            texts.extend(u.base_properties.iter().flat_map(|p| doc_texts(&p.doc)))
        }
    }
    texts
}

fn check_refs(diagnostics: &mut Diagnostics, subject: &str, text: &str) {
    for token in docref::dangling(text) {
        diagnostics.warn(Warning::MalformedDocReference {
            subject: subject.to_string(),
            detail: format!("`{token}` is not followed by an identifier"),
        });
    }
}

/// Compile every container in document order.
pub fn compile(schema: &SchemaDocument, config: &Config) -> Result<Compilation> {
    let mut compiler = Compiler::new(schema, config)?;
    for container in &schema.containers {
        compiler.compile_container(container)?;
    }
    Ok(compiler.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenError;
    use serde_json::json;

    fn schema() -> SchemaDocument {
        serde_json::from_value(json!({
            "types": {
                "acme.Money": { "kind": "struct", "fields": [{ "name": "cents", "type": { "kind": "int64" } }] },
                "acme.Ghost": { "kind": "struct", "owner": "Nowhere", "fields": [], "doc": "See $TYPE_REF" },
                "acme.PayRequest": { "kind": "struct", "fields": [
                    { "name": "amount", "type": { "kind": "named", "name": "acme.Money" } },
                    { "name": "ghost", "type": { "kind": "named", "name": "acme.Ghost" }, "nullable": true }
                ]}
            },
            "containers": [{
                "name": "Payments",
                "namespace": "payments",
                "maturity": { "stage": "stable" },
                "calls": [
                    {
                        "name": "pay",
                        "doc": "Pays an invoice",
                        "roles": ["user", "admin"],
                        "request": { "kind": "named", "name": "acme.PayRequest" },
                        "response": { "kind": "void" },
                        "error": { "kind": "text" }
                    },
                    {
                        "name": "refund",
                        "request": { "kind": "named", "name": "acme.Money" },
                        "response": { "kind": "void" },
                        "error": { "kind": "void" }
                    }
                ]
            }]
        }))
        .unwrap()
    }

    #[test]
    fn compiles_calls_and_claims_types() {
        let out = compile(&schema(), &Config::default()).unwrap();

        assert_eq!(out.calls.len(), 2);
        let pay = &out.calls[0];
        assert_eq!(pay.qualified_name(), "payments.pay");
        assert_eq!(pay.request, TypeRef::structure("acme.PayRequest"));
        assert_eq!(pay.doc.maturity, Maturity::Stable);
        assert_eq!(pay.roles.len(), 2);

        let owner = |n: &str| out.types.get(n).unwrap().ownership().owner.clone();
        assert_eq!(owner("acme.Money").as_deref(), Some("Payments"));
        assert_eq!(owner("acme.Ghost").as_deref(), Some("Nowhere"));
        assert_eq!(out.containers[0].namespace, "payments");
    }

    #[test]
    fn post_run_checks_are_advisory() {
        let out = compile(&schema(), &Config::default()).unwrap();
        let warnings: Vec<_> = out.diagnostics.warnings().cloned().collect();
        assert_eq!(
            warnings,
            vec![
                Warning::UnknownOwner { type_name: "acme.Ghost".into(), owner: "Nowhere".into() },
                Warning::MalformedDocReference {
                    subject: "acme.Ghost".into(),
                    detail: "`$TYPE_REF` is not followed by an identifier".into(),
                },
                Warning::MissingDocumentation { subject: "payments.refund".into() },
            ]
        );

        let quiet = Config { warn_missing_docs: false, ..Config::default() };
        assert_eq!(compile(&schema(), &quiet).unwrap().diagnostics.len(), 2);
    }

    #[test]
    fn structural_failures_abort_with_the_call_path() {
        let mut doc = schema();
        doc.containers[0].calls[1].request = RawType::named("acme.Missing");
        let err = compile(&doc, &Config::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown type `acme.Missing` referenced at payments.refund → request"
        );
    }

    #[test]
    fn unused_parameters_are_fatal() {
        let mut doc = schema();
        doc.containers[0].calls[1].response = RawType::param("T");
        let err = compile(&doc, &Config::default()).unwrap_err();
        assert!(matches!(err, GenError::UnresolvedGenericParameter { ref param, .. } if param == "T"));
    }
}
