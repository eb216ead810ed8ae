//! jq pre-filter for schema documents. Every output of the filter is parsed
//! back into JSON and treated as a document of its own.
use jaq_core::{Compiler, Ctx, RcIter, compile::Undefined, load};
use jaq_json::Val;
use serde_json::Value;

use crate::error::{GenError, Result};

pub fn run_jaq(filter_src: &str, input: &Value, origin: &str) -> Result<Vec<Value>> {
    let failed = |message: String| GenError::Filter { origin: origin.to_string(), message };

    let loader = load::Loader::new(jaq_std::defs().chain(jaq_json::defs()));
    let arena = load::Arena::default();
    let program = load::File { code: filter_src, path: () };

    let modules = loader.load(&arena, program).map_err(|errs| failed(format_parse_errors(errs)))?;

    let filter = Compiler::default()
        .with_funs(jaq_std::funs().chain(jaq_json::funs()))
        .compile(modules)
        .map_err(|errs| failed(format_undefined_errors(errs)))?;

    let inputs = RcIter::new(core::iter::empty());
    let outputs = filter.run((Ctx::new([], &inputs), Val::from(input.clone())));

    let mut out = Vec::new();
    for item in outputs {
        let val = item.map_err(|e| failed(format!("{e:?}")))?;
        // Val: Display -> JSON text
        let value = serde_json::from_str(&val.to_string())
            .map_err(|e| failed(format!("filter produced invalid JSON: {e}")))?;
        out.push(value);
    }
    tracing::debug!(origin, outputs = out.len(), "jq: filtered");
    Ok(out)
}

fn format_parse_errors(errs: Vec<(load::File<&str, ()>, load::Error<&str>)>) -> String {
    errs.into_iter()
        .map(|(file, err)| format!("parse error: {err:?} in `{}`", file.code))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_undefined_errors(errs: Vec<(load::File<&str, ()>, Vec<(&str, Undefined)>)>) -> String {
    let mut lines = Vec::new();
    for (file, list) in errs {
        for (name, undef) in list {
            lines.push(format!("undefined `{name}`: {undef:?} in `{}`", file.code));
        }
    }
    lines.join("\n")
}
