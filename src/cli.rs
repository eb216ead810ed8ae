//! CLI: inputs → compile → (generate | ir | check)
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;

use rpc_typegraph::compile::{Compilation, compile};
use rpc_typegraph::config::Config;
use rpc_typegraph::emit::{EmitContext, Target, emit_all};
use rpc_typegraph::input::{self, InputOptions};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// compile RPC schema documents into a type graph and render it as TypeScript,
/// reference docs, JSON Schema, Rust models or the raw IR
#[derive(Parser, Debug)]
#[command(name = "rpc-typegraph", version)]
pub struct CommandLineInterface {
    /// log debug output (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// compile and write the selected targets into an output directory
    Generate(GenerateOut),
    /// compile and print the serialized IR
    Ir(IrOut),
    /// compile and report warnings without writing anything
    Check(CheckOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// JSON Pointer to select the schema document inside each file (e.g. /api/schema)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each file; every output is one schema document
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,

    /// configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// qualified-name prefix owned by this system (repeatable; adds to the config file)
    #[arg(long = "own-namespace")]
    own_namespaces: Vec<String>,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

#[derive(clap::Parser, Debug)]
struct GenerateOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// targets to emit (all when omitted)
    #[arg(short, long, value_enum, num_args = 1..)]
    target: Vec<Target>,

    /// output directory
    #[arg(short, long)]
    out_dir: PathBuf,
}

#[derive(clap::Parser, Debug)]
struct IrOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// fail when any warning was reported
    #[arg(long)]
    deny_warnings: bool,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        config.own_namespaces.extend(self.own_namespaces.iter().cloned());
        Ok(config)
    }

    fn compile(&self, config: &Config) -> anyhow::Result<Compilation> {
        let paths = input::resolve_file_path_patterns(&self.input)?;
        let options = InputOptions { json_pointer: self.json_pointer.clone(), jq_expr: self.jq_expr.clone() };
        let schema = input::load_schema(&paths, &options)?;
        let compilation = compile(&schema, config)?;
        report_warnings(&compilation);
        Ok(compilation)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> anyhow::Result<()> {
        let settings = match &self.cmd {
            Command::Generate(target) => &target.input_settings,
            Command::Ir(target) => &target.input_settings,
            Command::Check(target) => &target.input_settings,
        };
        // debug path
        if settings.no_op {
            eprintln!("{self:#?}");
            return Ok(());
        }
        let config = settings.config()?;
        let compilation = settings.compile(&config)?;

        match &self.cmd {
            Command::Generate(target) => {
                let targets = if target.target.is_empty() { Target::ALL.to_vec() } else { target.target.clone() };
                let artifacts = emit_all(&compilation, &EmitContext::new(&config), &targets)?;
                for artifact in &artifacts {
                    write_file(&target.out_dir.join(&artifact.path), &artifact.contents)?;
                }
                eprintln!(
                    "{} {} files into {}",
                    "wrote".green().bold(),
                    artifacts.len(),
                    target.out_dir.display()
                );
            }
            Command::Ir(target) => {
                let mut ir_src = serde_json::to_string_pretty(&compilation)?;
                ir_src.push('\n');
                match target.out.as_ref() {
                    Some(out) => write_file(out, &ir_src)?,
                    None => print!("{ir_src}"),
                }
            }
            Command::Check(target) => {
                let warnings = compilation.diagnostics.len();
                if target.deny_warnings && warnings > 0 {
                    bail!("{warnings} warning(s) reported and --deny-warnings is set");
                }
                eprintln!(
                    "{} {} containers, {} calls, {} types",
                    "ok".green().bold(),
                    compilation.containers.len(),
                    compilation.calls.len(),
                    compilation.types.len()
                );
            }
        }
        Ok(())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn report_warnings(compilation: &Compilation) {
    let diagnostics = &compilation.diagnostics;
    if diagnostics.is_empty() {
        return;
    }
    for warning in diagnostics.warnings() {
        eprintln!("{} {warning}", "warning:".yellow().bold());
    }
    eprintln!("{}", format!("{} warning(s)", diagnostics.len()).yellow());
}

fn write_file(path: &Path, contents: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}
