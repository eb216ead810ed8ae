use super::{Artifact, EmitContext, Emitter};
use crate::compile::Compilation;
use crate::error::Result;

/// The canonical IR itself, pretty-printed.
pub struct IrJson;

impl Emitter for IrJson {
    fn name(&self) -> &'static str { "ir" }

    fn emit(&self, compilation: &Compilation, _cx: &EmitContext<'_>) -> Result<Vec<Artifact>> {
        let mut contents = serde_json::to_string_pretty(compilation)?;
        contents.push('\n');
        Ok(vec![Artifact::new("ir.json", contents)])
    }
}
