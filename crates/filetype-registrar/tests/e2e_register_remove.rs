use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use uuid::Uuid;

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("{prefix}-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn write_file(path: &Path, content: &str) {
    std::fs::write(path, content)
        .unwrap_or_else(|e| panic!("write {} failed: {e}", path.display()));
}

fn run(dir: &Path, args: &[&str]) -> Output {
    let exe = env!("CARGO_BIN_EXE_filetype-registrar");
    let out = Command::new(exe)
        .arg("--store")
        .arg(dir.join("registry.json"))
        .arg("--log-file")
        .arg(dir.join("logs").join("registry.log"))
        .args(args)
        .output()
        .expect("run filetype-registrar");
    assert!(
        out.status.success(),
        "{args:?} failed: status={:?}, stdout={}, stderr={}",
        out.status.code(),
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    );
    out
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

const REGISTER_APP_DOCUMENT: &[&str] = &[
    "register",
    "--prog-id",
    "App.Document",
    "--description",
    "App Document",
    "--icon-path",
    "C:\\app\\icon.ico",
    "--app-name",
    "MyApp",
    "--command",
    "C:\\app\\myapp.exe",
    "--ext",
    "myext",
];

#[test]
fn e2e_register_then_remove_in_sandbox() {
    let dir = unique_temp_dir("filetype-registrar-e2e");
    let _cleanup = CleanupDir(dir.clone());

    let out = run(&dir, REGISTER_APP_DOCUMENT);
    let text = stdout(&out);
    assert!(text.contains("App.Document | Type Description: App Document"), "stdout: {text}");
    assert!(text.contains("App.Document register: ok"), "stdout: {text}");

    let out = run(
        &dir,
        &["get-value", "Software\\Classes\\App.Document\\shell\\open\\command"],
    );
    let text = stdout(&out);
    assert!(text.contains("--process-start-args"), "stdout: {text}");

    let out = run(&dir, &["list-subkeys", "Software\\Classes"]);
    let lines: Vec<String> = stdout(&out).lines().map(str::to_string).collect();
    assert_eq!(lines, [".myext", "App.Document"]);

    let out = run(
        &dir,
        &["remove", "--prog-id", "App.Document", "--ext", "myext"],
    );
    let text = stdout(&out);
    assert!(text.contains("Registry cleaned up for App.Document"), "stdout: {text}");
    assert!(text.contains("Removed association for .myext"), "stdout: {text}");

    let out = run(&dir, &["list-subkeys", "Software\\Classes"]);
    assert_eq!(stdout(&out).trim(), ".myext");
    let out = run(&dir, &["get-key", "Software\\Classes\\.myext\\OpenWithProgids"]);
    assert_eq!(stdout(&out).trim(), "{}");

    let log = std::fs::read_to_string(dir.join("logs").join("registry.log")).expect("read log");
    let first = log.lines().next().expect("log has lines");
    let parts: Vec<&str> = first.splitn(3, " | ").collect();
    assert_eq!(parts.len(), 3, "line: {first}");
    assert!(parts[0].parse::<i64>().is_ok(), "line: {first}");
    assert!(parts[1].ends_with(" AM") || parts[1].ends_with(" PM"), "line: {first}");
    assert_eq!(parts[2], "App.Document | Type Description: App Document");
}

#[test]
fn e2e_remove_unregistered_is_quiet_and_succeeds() {
    let dir = unique_temp_dir("filetype-registrar-e2e");
    let _cleanup = CleanupDir(dir.clone());

    let out = run(&dir, &["remove", "--prog-id", "Never.Registered"]);
    let text = stdout(&out);
    assert!(
        text.contains("No registry entries found for Never.Registered"),
        "stdout: {text}"
    );
    assert!(!text.contains("Error:"), "stdout: {text}");
}

#[test]
fn e2e_manifest_registers_every_prog_id_and_reports_json() {
    let dir = unique_temp_dir("filetype-registrar-e2e");
    let _cleanup = CleanupDir(dir.clone());

    let manifest_path = dir.join("associations.json");
    write_file(
        &manifest_path,
        r#"
{
  "log_file": "manifest.log",
  "prog_ids": [
    { "progID": "App.Document", "description": "App Document", "command": "C:\\app\\myapp.exe", "extensions": ["myext"] },
    { "progID": "App.Project", "description": "App Project", "command": "C:\\app\\myapp.exe" }
  ]
}
"#,
    );

    let exe = env!("CARGO_BIN_EXE_filetype-registrar");
    let out = Command::new(exe)
        .arg("--store")
        .arg(dir.join("registry.json"))
        .arg("--silent")
        .arg("register")
        .arg("--manifest")
        .arg(&manifest_path)
        .arg("--json")
        .output()
        .expect("run filetype-registrar");
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let reports: serde_json::Value = serde_json::from_slice(&out.stdout).expect("json report");
    let reports = reports.as_array().expect("array");
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0]["prog_id"], "App.Document");
    assert_eq!(reports[0]["workflow"], "register");
    assert_eq!(reports[0]["failures"].as_array().map(Vec::len), Some(0));
    assert_eq!(reports[1]["prog_id"], "App.Project");

    let log = std::fs::read_to_string(dir.join("manifest.log")).expect("manifest log_file used");
    assert!(log.contains("App.Project | Type Description: App Project"));
}

#[test]
fn e2e_register_requires_prog_id_or_manifest() {
    let dir = unique_temp_dir("filetype-registrar-e2e");
    let _cleanup = CleanupDir(dir.clone());

    let exe = env!("CARGO_BIN_EXE_filetype-registrar");
    let out = Command::new(exe)
        .arg("--store")
        .arg(dir.join("registry.json"))
        .arg("register")
        .output()
        .expect("run filetype-registrar");
    assert!(!out.status.success());
}

#[test]
fn e2e_blank_prog_id_is_rejected_before_touching_store() {
    let dir = unique_temp_dir("filetype-registrar-e2e");
    let _cleanup = CleanupDir(dir.clone());
    let store = dir.join("registry.json");
    run(&dir, &["register", "--prog-id", "Keep.Doc"]);
    let before = std::fs::read_to_string(&store).expect("read store");

    let exe = env!("CARGO_BIN_EXE_filetype-registrar");
    let out = Command::new(exe)
        .arg("--store")
        .arg(&store)
        .args(["remove", "--prog-id", ""])
        .output()
        .expect("run filetype-registrar");
    assert!(!out.status.success());
    assert_eq!(std::fs::read_to_string(&store).expect("read store"), before);
}

struct CleanupDir(PathBuf);

impl Drop for CleanupDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}
