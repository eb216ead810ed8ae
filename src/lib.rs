//! Type-graph compiler for RPC declarations.
//!
//! A [`schema::SchemaDocument`] describes call containers and the types
//! their calls exchange. [`compile::compile`] walks every call, builds a
//! cycle-safe registry of canonical type definitions, resolves generic
//! parameters and assigns documentation ownership. The resulting
//! [`compile::Compilation`] is what the [`emit`] targets render.
pub mod compile;
pub mod config;
pub mod diagnostics;
pub mod docref;
pub mod emit;
pub mod error;
pub mod generics;
pub mod input;
pub mod ir;
pub mod jq_exec;
pub mod ownership;
pub mod path_de;
pub mod registry;
pub mod schema;
pub mod traverse;

pub use compile::{Compilation, compile};
pub use config::Config;
pub use error::{GenError, Result};
pub use schema::SchemaDocument;
