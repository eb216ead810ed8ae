//! Per-run type registry.
//!
//! Entries are inserted as placeholders before their members are visited and
//! completed in place afterwards, which is what lets self-referential graphs
//! terminate. Iteration follows insertion order.
use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Serialize;

use crate::ir::{GeneratedType, Ownership};

/// Outcome of [`Registry::claim`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// The caller inserted the placeholder and must `complete` it.
    Claimed,
    /// Already present, either settled or still being built further up the
    /// stack. The caller must not read its members.
    Known,
}

#[derive(Debug, Default, Clone, Serialize)]
#[serde(transparent)]
pub struct Registry {
    types: IndexMap<String, GeneratedType>,
    #[serde(skip)]
    pending: HashSet<String>,
}

impl Registry {
    pub fn new() -> Self { Self::default() }

    /// Insert `placeholder` under its name unless the name is already known.
    pub fn claim(&mut self, placeholder: GeneratedType) -> Claim {
        let name = placeholder.name().to_string();
        if self.types.contains_key(&name) {
            return Claim::Known;
        }
        tracing::trace!(%name, "registry: placeholder");
        self.pending.insert(name.clone());
        self.types.insert(name, placeholder);
        Claim::Claimed
    }

    /// Replace the placeholder with the finished definition, keeping its
    /// position and any ownership already recorded.
    pub fn complete(&mut self, mut ty: GeneratedType) {
        let name = ty.name().to_string();
        self.pending.remove(&name);
        match self.types.get_mut(&name) {
            Some(slot) => {
                if slot.ownership().owner.is_some() && ty.ownership().owner.is_none() {
                    *ty.ownership_mut() = slot.ownership().clone();
                }
                *slot = ty;
            }
            None => {
                self.types.insert(name, ty);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&GeneratedType> { self.types.get(name) }

    pub fn contains(&self, name: &str) -> bool { self.types.contains_key(name) }

    pub fn is_pending(&self, name: &str) -> bool { self.pending.contains(name) }

    /// Present and no longer a placeholder.
    pub fn is_settled(&self, name: &str) -> bool {
        self.contains(name) && !self.is_pending(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &GeneratedType)> {
        self.types.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn types(&self) -> impl Iterator<Item = &GeneratedType> { self.types.values() }

    pub fn ownership_mut(&mut self, name: &str) -> Option<&mut Ownership> {
        self.types.get_mut(name).map(GeneratedType::ownership_mut)
    }

    pub fn len(&self) -> usize { self.types.len() }

    pub fn is_empty(&self) -> bool { self.types.is_empty() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Documentation, Property, Struct, TypeRef};

    fn placeholder(name: &str) -> GeneratedType {
        GeneratedType::Struct(Struct {
            name: name.to_string(),
            doc: Documentation::default(),
            properties: Vec::new(),
            generics: Vec::new(),
            ownership: Ownership::default(),
        })
    }

    #[test]
    fn claim_then_complete() {
        let mut reg = Registry::new();
        assert_eq!(reg.claim(placeholder("acme.Node")), Claim::Claimed);
        assert!(reg.is_pending("acme.Node"));
        assert_eq!(reg.claim(placeholder("acme.Node")), Claim::Known);

        let GeneratedType::Struct(mut done) = placeholder("acme.Node") else { unreachable!() };
        done.properties.push(Property {
            name: "children".into(),
            doc: Documentation::default(),
            ty: TypeRef::array(TypeRef::structure("acme.Node")),
        });
        reg.complete(GeneratedType::Struct(done));

        assert!(reg.is_settled("acme.Node"));
        assert_eq!(reg.len(), 1);
        let GeneratedType::Struct(s) = reg.get("acme.Node").unwrap() else { panic!() };
        assert_eq!(s.properties.len(), 1);
    }

    #[test]
    fn completion_keeps_claimed_owner_and_order() {
        let mut reg = Registry::new();
        reg.claim(placeholder("acme.A"));
        reg.claim(placeholder("acme.B"));
        reg.ownership_mut("acme.A").unwrap().owner = Some("Payments".into());
        reg.complete(placeholder("acme.A"));

        let names: Vec<_> = reg.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["acme.A", "acme.B"]);
        assert_eq!(reg.get("acme.A").unwrap().ownership().owner.as_deref(), Some("Payments"));
    }
}
