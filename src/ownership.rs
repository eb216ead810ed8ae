//! Ownership resolver: decides which call container documents each type.
//! Ownership is placement metadata only; it never changes a type.
use std::collections::{HashMap, HashSet};

use regex::Regex;

use crate::config::Config;
use crate::diagnostics::{Diagnostics, Warning};
use crate::error::Result;
use crate::ir::{TypeKind, TypeRef};
use crate::registry::Registry;
use crate::schema::{ContainerDef, ContainerRole};

pub struct OwnershipResolver {
    config: Config,
    matcher: Option<Regex>,
    /// Container name → provider-facing or control.
    providers: HashMap<String, bool>,
}

impl OwnershipResolver {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(OwnershipResolver {
            matcher: config.provider_matcher()?,
            config: config.clone(),
            providers: HashMap::new(),
        })
    }

    /// Must be called before the container claims anything. A declared role
    /// wins over the name markers.
    pub fn register(&mut self, container: &ContainerDef) {
        let provider = match container.role {
            Some(ContainerRole::Public) => false,
            Some(ContainerRole::Provider | ContainerRole::Control) => true,
            None => self.matcher.as_ref().is_some_and(|m| m.is_match(&container.name)),
        };
        self.providers.insert(container.name.clone(), provider);
    }

    pub fn is_provider(&self, container: &str) -> bool {
        self.providers.get(container).copied().unwrap_or(false)
    }

    /// Claim every own-namespace type reachable from `roots` for `container`.
    /// Reachability follows generic arguments and the members of registry
    /// entries.
    pub fn claim_reachable(
        &self,
        registry: &mut Registry,
        diagnostics: &mut Diagnostics,
        container: &str,
        roots: &[&TypeRef],
    ) {
        let mut visited: HashSet<String> = HashSet::new();
        let mut stack: Vec<TypeRef> = roots.iter().rev().map(|t| (*t).clone()).collect();

        while let Some(ty) = stack.pop() {
            let mut names = Vec::new();
            ty.walk(&mut |t| {
                if let TypeKind::Structure { name, .. } = t.kind() {
                    names.push(name.clone());
                }
            });
            for name in names {
                if !visited.insert(name.clone()) {
                    continue;
                }
                // Unbound parameters and foreign names have no entry.
                let Some(entry) = registry.get(&name) else { continue };
                let members: Vec<TypeRef> = entry.member_types().into_iter().cloned().collect();
                if self.config.is_own(&name) {
                    self.claim(registry, diagnostics, &name, container);
                }
                stack.extend(members.into_iter().rev());
            }
        }
    }

    fn claim(&self, registry: &mut Registry, diagnostics: &mut Diagnostics, type_name: &str, container: &str) {
        let Some(ownership) = registry.ownership_mut(type_name) else { return };
        if ownership.explicit {
            return;
        }
        let Some(first) = ownership.owner.clone() else {
            tracing::trace!(%type_name, %container, "ownership: claimed");
            ownership.owner = Some(container.to_string());
            return;
        };
        if first == container {
            return;
        }
        match (self.is_provider(&first), self.is_provider(container)) {
            (true, false) => {
                tracing::debug!(%type_name, from = %first, to = %container, "ownership: moved off provider api");
                ownership.owner = Some(container.to_string());
            }
            (false, true) => {}
            _ => diagnostics.warn(Warning::OwnershipConflict {
                type_name: type_name.to_string(),
                first,
                second: container.to_string(),
            }),
        }
    }
}
