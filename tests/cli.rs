use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_rpc-typegraph"))
}

fn demo() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/accounting.json")
}

fn run(args: &[&str]) -> Output {
    Command::new(bin())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("rpc-typegraph should execute")
}

const CONFLICT: &str = r#"{
  "types": { "acme.Money": { "kind": "struct", "fields": [{ "name": "cents", "type": { "kind": "int64" } }] } },
  "containers": [
    { "name": "Payments", "namespace": "payments", "calls": [{ "name": "pay", "doc": "Pay",
      "request": { "kind": "named", "name": "acme.Money" }, "response": { "kind": "void" }, "error": { "kind": "void" } }] },
    { "name": "Invoices", "namespace": "invoices", "calls": [{ "name": "total", "doc": "Total",
      "request": { "kind": "void" }, "response": { "kind": "named", "name": "acme.Money" }, "error": { "kind": "void" } }] }
  ]
}"#;

#[test]
fn generate_writes_every_target() {
    let out = tempfile::tempdir().unwrap();
    let demo = demo();
    let output = run(&["generate", "-i", demo.to_str().unwrap(), "--out-dir", out.path().to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(0), "{}", String::from_utf8_lossy(&output.stderr));

    for file in [
        "Numbers.ts",
        "Wallets.ts",
        "Transactions.ts",
        "AccountingProvider.ts",
        "Wallets.md",
        "Transactions.md",
        "schema.json",
        "models.rs",
        "ir.json",
    ] {
        assert!(out.path().join(file).is_file(), "{file} was not written");
    }
    let wallets = std::fs::read_to_string(out.path().join("Wallets.ts")).unwrap();
    assert!(wallets.contains("export type PaymentMethod = PaymentMethodBase & (Card | BankTransfer);"), "{wallets}");
}

#[test]
fn generate_only_selected_targets() {
    let out = tempfile::tempdir().unwrap();
    let demo = demo();
    let output = run(&[
        "generate",
        "-i",
        demo.to_str().unwrap(),
        "--out-dir",
        out.path().to_str().unwrap(),
        "--target",
        "rust",
    ]);
    assert_eq!(output.status.code(), Some(0));
    let written: Vec<_> = std::fs::read_dir(out.path()).unwrap().map(|e| e.unwrap().file_name()).collect();
    assert_eq!(written, ["models.rs"]);
}

#[test]
fn ir_prints_the_compilation() {
    let demo = demo();
    let output = run(&["ir", "-i", demo.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(0));
    let ir: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(ir["calls"].as_array().map(Vec::len), Some(5));
    assert_eq!(ir["types"]["accounting.Money"]["ownership"]["owner"], "Wallets");
}

#[test]
fn check_denies_warnings_on_request() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("conflict.json");
    std::fs::write(&path, CONFLICT).unwrap();
    let path = path.to_str().unwrap();

    let lenient = run(&["check", "-i", path]);
    assert_eq!(lenient.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&lenient.stderr).contains("keeping `Payments`"));

    let strict = run(&["check", "-i", path, "--deny-warnings"]);
    assert_eq!(strict.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&strict.stderr).contains("--deny-warnings"));

    let demo = demo();
    assert_eq!(run(&["check", "-i", demo.to_str().unwrap(), "--deny-warnings"]).status.code(), Some(0));
}

#[test]
fn jq_filter_selects_documents_from_a_bundle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bundle.json");
    std::fs::write(&path, format!(r#"{{ "api": {{ "documents": [{CONFLICT}] }} }}"#)).unwrap();

    let output = run(&["ir", "-i", path.to_str().unwrap(), "--json-pointer", "/api", "--jq-expr", ".documents[]"]);
    assert_eq!(output.status.code(), Some(0), "{}", String::from_utf8_lossy(&output.stderr));
    let ir: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(ir["containers"][1]["name"], "Invoices");
}

#[test]
fn fatal_errors_exit_non_zero_with_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(
        &path,
        r#"{ "containers": [{ "name": "Jobs", "namespace": "jobs", "calls": [{ "name": "get", "doc": "Get",
            "request": { "kind": "named", "name": "jobs.Job" }, "response": { "kind": "void" }, "error": { "kind": "void" } }] }] }"#,
    )
    .unwrap();

    let output = run(&["check", "-i", path.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown type `jobs.Job` referenced at jobs.get → request"), "{stderr}");
}
