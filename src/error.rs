//! Fatal errors. Anything in here aborts the whole generation run; advisory
//! problems live in `diagnostics` instead.

use std::fmt;

// ————————————————————————————————————————————————————————————————————————————
// TYPE PATH
// ————————————————————————————————————————————————————————————————————————————

/// Breadcrumb from the originating call (or container) down to the type
/// currently being visited, e.g. `Jobs.browse → response → dk.sdu.Page → items`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypePath(Vec<String>);

impl TypePath {
    pub fn new() -> Self { Self::default() }

    pub fn root(segment: impl Into<String>) -> Self {
        Self(vec![segment.into()])
    }

    pub fn push(&mut self, segment: impl Into<String>) {
        self.0.push(segment.into());
    }

    pub fn pop(&mut self) {
        self.0.pop();
    }

    pub fn segments(&self) -> &[String] { &self.0 }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl fmt::Display for TypePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<root>");
        }
        write!(f, "{}", self.0.join(" → "))
    }
}

// ————————————————————————————————————————————————————————————————————————————
// ERRORS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, thiserror::Error)]
pub enum GenError {
    #[error("unsupported type shape at {path}: {detail}")]
    UnsupportedType { path: TypePath, detail: String },

    #[error("unknown type `{name}` referenced at {path}")]
    UnknownType { name: String, path: TypePath },

    #[error("unknown base `{name}` in the supertype chain of `{container}`")]
    UnknownBase { name: String, container: String },

    #[error("`{name}` takes {expected} type argument(s) but {found} were supplied at {path}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
        path: TypePath,
    },

    #[error("generic parameter `{param}` has no matching argument in call `{call}`")]
    UnresolvedGenericParameter { param: String, call: String },

    #[error("malformed closed hierarchy `{name}` at {path}: {detail}")]
    MalformedHierarchy {
        name: String,
        detail: String,
        path: TypePath,
    },

    #[error("duplicate definition of {what} `{name}`")]
    DuplicateDefinition { what: &'static str, name: String },

    #[error("failed to parse {origin}: {message}")]
    Input { origin: String, message: String },

    #[error("jq filter failed for {origin}: {message}")]
    Filter { origin: String, message: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = GenError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_renders_breadcrumbs() {
        let mut path = TypePath::root("Jobs.browse");
        path.push("response");
        path.push("dk.sdu.Page");
        assert_eq!(path.to_string(), "Jobs.browse → response → dk.sdu.Page");
        path.pop();
        assert_eq!(path.segments().len(), 2);
        assert_eq!(TypePath::new().to_string(), "<root>");
    }

    #[test]
    fn errors_name_the_path() {
        let mut path = TypePath::root("Payments.pay");
        path.push("request");
        let err = GenError::UnsupportedType { path, detail: "unbounded wildcard".into() };
        assert_eq!(
            err.to_string(),
            "unsupported type shape at Payments.pay → request: unbounded wildcard"
        );
    }
}
