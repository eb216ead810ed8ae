//! Loading schema documents from disk: path patterns, an optional JSON
//! pointer into each file, and an optional jq pre-filter.
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{GenError, Result};
use crate::jq_exec;
use crate::path_de;
use crate::schema::SchemaDocument;

#[derive(Debug, Clone, Default)]
pub struct InputOptions {
    /// JSON Pointer selecting the schema document inside each file.
    pub json_pointer: Option<String>,
    /// jq filter applied to each file; every output is one document.
    pub jq_expr: Option<String>,
}

/// Literal paths pass through untouched; patterns containing glob syntax are
/// expanded and must match at least one file.
pub fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();
    for raw in patterns {
        let pattern = raw.as_ref();
        if !has_glob_chars(pattern) {
            out.push(PathBuf::from(pattern));
            continue;
        }
        let invalid = |message: String| GenError::Input { origin: pattern.to_string(), message };
        let mut matched_any = false;
        for entry in glob::glob(pattern).map_err(|e| invalid(e.to_string()))? {
            out.push(entry.map_err(|e| invalid(e.to_string()))?);
            matched_any = true;
        }
        if !matched_any {
            return Err(invalid("glob pattern matched no files".to_string()));
        }
    }
    Ok(out)
}

/// Read, select, filter and merge every input into one schema.
pub fn load_schema(paths: &[PathBuf], options: &InputOptions) -> Result<SchemaDocument> {
    let mut schema = SchemaDocument::default();
    for path in paths {
        for document in load_file(path, options)? {
            schema.merge(document)?;
        }
    }
    tracing::debug!(
        files = paths.len(),
        types = schema.types.len(),
        containers = schema.containers.len(),
        "input: loaded"
    );
    Ok(schema)
}

pub fn load_file(path: &Path, options: &InputOptions) -> Result<Vec<SchemaDocument>> {
    let origin = path.display().to_string();
    let failed = |message: String| GenError::Input { origin: origin.clone(), message };

    let source = std::fs::read_to_string(path).map_err(|e| failed(e.to_string()))?;
    let value: Value = serde_json::from_str(&source).map_err(|e| failed(e.to_string()))?;
    let value = match options.json_pointer.as_deref() {
        None => value,
        Some(pointer) => value
            .pointer(pointer)
            .cloned()
            .ok_or_else(|| failed(format!("JSON pointer `{pointer}` selects nothing")))?,
    };
    let values = match options.jq_expr.as_deref() {
        None => vec![value],
        Some(filter) => jq_exec::run_jaq(filter, &value, &origin)?,
    };
    values
        .into_iter()
        .map(|value| path_de::from_value_with_path(value).map_err(&failed))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const PAYMENTS: &str = r#"{ "containers": [{ "name": "Payments", "namespace": "payments" }] }"#;
    const INVOICES: &str = r#"{ "containers": [{ "name": "Invoices", "namespace": "invoices" }] }"#;

    #[test]
    fn globs_expand_and_merge() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.json"), PAYMENTS).unwrap();
        fs::write(dir.path().join("b.json"), INVOICES).unwrap();
        let pattern = format!("{}/*.json", dir.path().display());

        let paths = resolve_file_path_patterns([pattern]).unwrap();
        assert_eq!(paths.len(), 2);
        let schema = load_schema(&paths, &InputOptions::default()).unwrap();
        let names: Vec<_> = schema.containers.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Payments", "Invoices"]);
    }

    #[test]
    fn empty_glob_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/*.json", dir.path().display());
        let err = resolve_file_path_patterns([pattern]).unwrap_err();
        assert!(err.to_string().contains("matched no files"));
    }

    #[test]
    fn pointer_and_filter_select_documents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.json");
        fs::write(&path, format!(r#"{{ "bundle": {{ "parts": [{PAYMENTS}, {INVOICES}] }} }}"#)).unwrap();

        let options = InputOptions {
            json_pointer: Some("/bundle".into()),
            jq_expr: Some(".parts[]".into()),
        };
        let documents = load_file(&path, &options).unwrap();
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[1].containers[0].name, "Invoices");
    }

    #[test]
    fn bad_documents_report_the_json_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{ "containers": [{ "name": 3, "namespace": "x" }] }"#).unwrap();
        let err = load_file(&path, &InputOptions::default()).unwrap_err().to_string();
        assert!(err.starts_with("failed to parse "), "{err}");
        assert!(err.contains("containers[0].name"), "{err}");
    }
}
