use std::path::Path;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{GenError, Result};

/// Generation settings. Every field has a default, so an empty file (or no
/// file at all) is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Prefixes of qualified names that belong to this system. Empty means
    /// every registry type is considered own.
    pub own_namespaces: Vec<String>,
    /// Substrings that mark a container as provider-facing or control when
    /// it declares no explicit role. Matched case-insensitively.
    pub provider_markers: Vec<String>,
    /// Prefix of every link produced from documentation references.
    pub docs_base_url: String,
    pub warn_missing_docs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            own_namespaces: Vec::new(),
            provider_markers: vec!["provider".to_string(), "control".to_string()],
            docs_base_url: "/docs/reference".to_string(),
            warn_missing_docs: true,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let src = std::fs::read_to_string(path)?;
        crate::path_de::from_str_with_path(&src)
            .map_err(|message| GenError::Config(format!("{}: {message}", path.display())))
    }

    pub fn is_own(&self, qualified: &str) -> bool {
        self.own_namespaces.is_empty()
            || self.own_namespaces.iter().any(|ns| qualified.starts_with(ns.as_str()))
    }

    /// `None` when no markers are configured.
    pub fn provider_matcher(&self) -> Result<Option<Regex>> {
        let markers: Vec<String> = self
            .provider_markers
            .iter()
            .filter(|m| !m.is_empty())
            .map(|m| regex::escape(m))
            .collect();
        if markers.is_empty() {
            return Ok(None);
        }
        RegexBuilder::new(&markers.join("|"))
            .case_insensitive(true)
            .build()
            .map(Some)
            .map_err(|e| GenError::Config(format!("provider_markers: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_gives_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{}}").unwrap();
        assert_eq!(Config::load(file.path()).unwrap(), Config::default());
    }

    #[test]
    fn unknown_keys_are_rejected_with_a_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "own_namespace": ["acme."] }}"#).unwrap();
        let err = Config::load(file.path()).unwrap_err().to_string();
        assert!(err.contains("own_namespace"), "{err}");
    }

    #[test]
    fn markers_match_case_insensitively() {
        let config = Config::default();
        let matcher = config.provider_matcher().unwrap().unwrap();
        assert!(matcher.is_match("JobsProvider"));
        assert!(matcher.is_match("JobsControl"));
        assert!(!matcher.is_match("Jobs"));
    }

    #[test]
    fn own_namespaces_are_prefixes() {
        let config = Config { own_namespaces: vec!["acme.".into()], ..Config::default() };
        assert!(config.is_own("acme.Money"));
        assert!(!config.is_own("kotlinx.Json"));
        assert!(Config::default().is_own("anything.At.All"));
    }
}
