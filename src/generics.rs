//! Generic resolver.
//!
//! Containers inherit calls from generic bases. Walking a container's
//! supertype chain yields, per declaring base, the map from that base's
//! formal parameters to concrete descriptors. Only the three call-boundary
//! descriptors are rewritten with it; registry entries keep their raw,
//! unsubstituted members so one definition serves every instantiation.
use indexmap::IndexMap;

use crate::error::{GenError, Result, TypePath};
use crate::ir::{GeneratedCall, TypeKind, TypeRef};
use crate::registry::Registry;
use crate::schema::{CallDef, ContainerDef, RawType, SupertypeRef};
use crate::traverse::TypeGraph;

/// Parameter name → concrete descriptor.
pub type Substitution = IndexMap<String, TypeRef>;

/// A call together with the bindings visible where it was declared.
#[derive(Debug, Clone)]
pub struct ScopedCall<'s> {
    pub def: &'s CallDef,
    /// Base that declared the call, `None` for the container's own calls.
    pub declared_by: Option<&'s str>,
    pub bindings: Substitution,
}

// ————————————————————————————————————————————————————————————————————————————
// SCOPES
// ————————————————————————————————————————————————————————————————————————————

/// Every call of `container`: inherited calls first (deepest base first,
/// supertypes in declaration order), then the container's own.
pub fn collect_calls<'s>(
    graph: &TypeGraph<'s>,
    registry: &mut Registry,
    container: &'s ContainerDef,
) -> Result<Vec<ScopedCall<'s>>> {
    let mut walk = ChainWalk {
        graph,
        container,
        stack: Vec::new(),
        accumulated: Substitution::new(),
        calls: Vec::new(),
    };
    let root = Substitution::new();
    for supertype in &container.supertypes {
        walk.visit(registry, supertype, &root)?;
    }

    let ChainWalk { accumulated, mut calls, .. } = walk;
    calls.extend(container.calls.iter().map(|def| ScopedCall {
        def,
        declared_by: None,
        bindings: accumulated.clone(),
    }));
    Ok(calls)
}

struct ChainWalk<'g, 's> {
    graph: &'g TypeGraph<'s>,
    container: &'s ContainerDef,
    stack: Vec<&'s str>,
    accumulated: Substitution,
    calls: Vec<ScopedCall<'s>>,
}

impl<'s> ChainWalk<'_, 's> {
    /// `scope` holds the bindings of the child that names `supertype`; its
    /// arguments may mention the child's own parameters.
    fn visit(&mut self, registry: &mut Registry, supertype: &'s SupertypeRef, scope: &Substitution) -> Result<()> {
        let schema = self.graph.schema();
        let Some((name, base)) = schema.bases.get_key_value(&supertype.name) else {
            return Err(GenError::UnknownBase {
                name: supertype.name.clone(),
                container: self.container.name.clone(),
            });
        };
        let mut path = TypePath::root(self.container.name.as_str());
        for ancestor in &self.stack {
            path.push(*ancestor);
        }
        path.push(name.as_str());

        if self.stack.contains(&name.as_str()) {
            return Err(GenError::MalformedHierarchy {
                name: name.clone(),
                detail: "base chain refers back to itself".to_string(),
                path,
            });
        }
        if supertype.args.len() > base.params.len() {
            return Err(GenError::ArityMismatch {
                name: name.clone(),
                expected: base.params.len(),
                found: supertype.args.len(),
                path,
            });
        }

        let mut bindings = Substitution::new();
        for (param, arg) in base.params.iter().zip(&supertype.args) {
            path.push(param.as_str());
            let ty = self.graph.traverse(registry, arg, &mut path)?;
            path.pop();
            bindings.insert(param.clone(), substitute(&ty, scope));
        }
        tracing::debug!(
            container = %self.container.name,
            base = %name,
            bound = ?bindings.keys().collect::<Vec<_>>(),
            "generics: base scope"
        );

        self.stack.push(name.as_str());
        for parent in &base.supertypes {
            self.visit(registry, parent, &bindings)?;
        }
        self.stack.pop();

        for (param, ty) in &bindings {
            self.accumulated.insert(param.clone(), ty.clone());
        }
        self.calls.extend(base.calls.iter().map(|def| ScopedCall {
            def,
            declared_by: Some(name.as_str()),
            bindings: bindings.clone(),
        }));
        Ok(())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// SUBSTITUTION
// ————————————————————————————————————————————————————————————————————————————

/// Replace every bare `Structure(param)` bound in `subst`, through arrays,
/// dictionaries and generic arguments. The result keeps the use-site flags
/// of the placeholder it replaces.
pub fn substitute(ty: &TypeRef, subst: &Substitution) -> TypeRef {
    if subst.is_empty() {
        return ty.clone();
    }
    match ty.kind() {
        TypeKind::Structure { name, generics } if generics.is_empty() => match subst.get(name) {
            Some(concrete) => {
                let mut out = concrete.clone();
                out.adopt_flags(ty);
                out
            }
            None => ty.clone(),
        },
        TypeKind::Structure { name, generics } => ty.map_kind(TypeKind::Structure {
            name: name.clone(),
            generics: generics.iter().map(|g| substitute(g, subst)).collect(),
        }),
        TypeKind::Array { element } => ty.map_kind(TypeKind::Array {
            element: Box::new(substitute(element, subst)),
        }),
        TypeKind::Dictionary { value } => ty.map_kind(TypeKind::Dictionary {
            value: Box::new(substitute(value, subst)),
        }),
        _ => ty.clone(),
    }
}

/// Type variables mentioned anywhere in `raw`, first occurrence order.
pub fn raw_params(raw: &RawType, out: &mut Vec<String>) {
    match raw {
        RawType::Param { name } => {
            if !out.contains(name) {
                out.push(name.clone());
            }
        }
        RawType::List { element } | RawType::Set { element } | RawType::Array { element } => {
            raw_params(element, out)
        }
        RawType::Map { key, value } => {
            if let Some(key) = key {
                raw_params(key, out);
            }
            raw_params(value, out);
        }
        RawType::Named { args, .. } => args.iter().for_each(|a| raw_params(a, out)),
        RawType::Wildcard { upper_bound: Some(bound) } => raw_params(bound, out),
        _ => {}
    }
}

fn mentions(ty: &TypeRef, param: &str) -> bool {
    let mut found = false;
    ty.walk(&mut |t| found |= t.bare_structure_name() == Some(param));
    found
}

/// First bare `Structure` with no registry entry, i.e. a type variable.
fn leaked_param<'t>(ty: &'t TypeRef, registry: &Registry) -> Option<&'t str> {
    let mut leaked = None;
    ty.walk(&mut |t| {
        if leaked.is_none()
            && let Some(name) = t.bare_structure_name()
            && !registry.contains(name)
        {
            leaked = Some(name);
        }
    });
    leaked
}

/// Rewrite the call-boundary descriptors. Any of `params` that survives the
/// rewrite had no argument anywhere in the chain. A base parameter bound to
/// a parent parameter that itself got no argument survives as well, so every
/// remaining type variable is rejected, not only the declared ones.
pub fn resolve_call(
    call: &mut GeneratedCall,
    subst: &Substitution,
    params: &[String],
    registry: &Registry,
) -> Result<()> {
    call.request = substitute(&call.request, subst);
    call.response = substitute(&call.response, subst);
    call.error = substitute(&call.error, subst);

    let unresolved = |param: &str| GenError::UnresolvedGenericParameter {
        param: param.to_string(),
        call: call.qualified_name(),
    };
    for param in params {
        if call.descriptors().iter().any(|d| mentions(d, param)) {
            return Err(unresolved(param));
        }
    }
    if let Some(param) = call.descriptors().iter().find_map(|d| leaked_param(d, registry)) {
        return Err(unresolved(param));
    }
    Ok(())
}
