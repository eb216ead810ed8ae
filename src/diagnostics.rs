//! Advisory warnings. None of these stop a run; they are collected while
//! compiling and reported to the operator afterwards.
use std::fmt;

use indexmap::IndexSet;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// Two non-provider containers both reference a type without an explicit
    /// owner. The first one keeps it.
    OwnershipConflict {
        type_name: String,
        first: String,
        second: String,
    },
    /// An own-namespace type that no container claimed.
    MissingOwner { type_name: String },
    /// An explicit owner naming a container that was never compiled.
    UnknownOwner { type_name: String, owner: String },
    MissingDocumentation { subject: String },
    MalformedDocReference { subject: String, detail: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::OwnershipConflict { type_name, first, second } => write!(
                f,
                "`{type_name}` is referenced by both `{first}` and `{second}`; keeping `{first}` \
                 (declare an explicit owner to silence this)"
            ),
            Warning::MissingOwner { type_name } => {
                write!(f, "`{type_name}` has no owning container")
            }
            Warning::UnknownOwner { type_name, owner } => {
                write!(f, "`{type_name}` names unknown owner `{owner}`")
            }
            Warning::MissingDocumentation { subject } => {
                write!(f, "`{subject}` has no documentation")
            }
            Warning::MalformedDocReference { subject, detail } => {
                write!(f, "malformed reference in docs of `{subject}`: {detail}")
            }
        }
    }
}

#[derive(Debug, Default, Clone, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    warnings: IndexSet<Warning>,
}

impl Diagnostics {
    pub fn new() -> Self { Self::default() }

    /// Record a warning. Repeats are dropped.
    pub fn warn(&mut self, warning: Warning) {
        if !self.warnings.contains(&warning) {
            tracing::warn!("{warning}");
            self.warnings.insert(warning);
        }
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Warning> { self.warnings.iter() }

    pub fn len(&self) -> usize { self.warnings.len() }

    pub fn is_empty(&self) -> bool { self.warnings.is_empty() }
}
