//! Integration tests for `kiln build --json` output.
//!
//! These tests verify:
//! - JSON output is always valid JSON (exactly one object on stdout)
//! - the output directory is the build root joined with `NODE_ENV`
//! - production filenames embed a content hash
//! - `ANALYZE=true` adds exactly one report file, any other value none
//! - error codes are SCREAMING_SNAKE_CASE

use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn kiln() -> Command {
    let mut cmd = Command::new(env!("CARGO"));
    cmd.args(["run", "-p", "kiln-cli", "--bin", "kiln", "--quiet", "--"]);
    // The build env must come from the test, not the caller
    cmd.env_remove("NODE_ENV");
    cmd.env_remove("ANALYZE");
    cmd
}

fn scaffold(dir: &Path) {
    let status = kiln()
        .args(["init", "--cwd"])
        .arg(dir)
        .status()
        .expect("failed to run init");
    assert!(status.success(), "init should succeed");
}

fn build_json(dir: &Path, envs: &[(&str, &str)]) -> serde_json::Value {
    let mut cmd = kiln();
    cmd.args(["build", "--json", "--cwd"]).arg(dir);
    for (key, value) in envs {
        cmd.env(key, value);
    }
    let output = cmd.output().expect("failed to run build");
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(stdout.trim_end()).expect("output should be valid JSON")
}

#[test]
fn test_build_json_emits_exactly_one_json_object() {
    let dir = tempdir().unwrap();
    scaffold(dir.path());

    let output = kiln()
        .args(["build", "--json", "--cwd"])
        .arg(dir.path())
        .output()
        .expect("failed to run build");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let trimmed = stdout.trim_end();

    assert!(trimmed.starts_with('{'), "stdout should be one JSON object");
    assert!(trimmed.ends_with('}'), "stdout should be one JSON object");

    let json: serde_json::Value = serde_json::from_str(trimmed).unwrap();
    assert_eq!(json["ok"], true);
}

#[test]
fn test_build_output_path_joins_node_env() {
    let dir = tempdir().unwrap();
    scaffold(dir.path());

    let json = build_json(dir.path(), &[("NODE_ENV", "qa")]);
    assert_eq!(json["ok"], true);
    assert_eq!(json["node_env"], "qa");

    let out_dir = dir.path().join("build").join("qa");
    assert!(out_dir.is_dir(), "output should land in build/qa");
    assert!(out_dir.join("index.html").is_file());
    assert!(out_dir.join("manifest.json").is_file());
}

#[test]
fn test_build_filenames_embed_content_hash() {
    let dir = tempdir().unwrap();
    scaffold(dir.path());

    let json = build_json(dir.path(), &[("NODE_ENV", "production")]);
    let files: Vec<String> = json["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["path"].as_str().unwrap().to_string())
        .collect();

    let main = files
        .iter()
        .find(|f| f.starts_with("js/main.") && f.ends_with(".js"))
        .expect("main chunk should be emitted");
    let hash = main.trim_start_matches("js/main.").trim_end_matches(".js");
    assert_eq!(hash.len(), 8, "main chunk should embed an 8-hex hash: {main}");
    assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));

    assert!(
        files
            .iter()
            .any(|f| f.starts_with("css/main.") && f.ends_with(".css")),
        "extracted CSS should be emitted: {files:?}"
    );
}

#[test]
fn test_bundle_contains_placeholder_texts() {
    let dir = tempdir().unwrap();
    scaffold(dir.path());

    build_json(dir.path(), &[]);

    let js_dir = dir.path().join("build").join("production").join("js");
    let mut bundle_text = String::new();
    for entry in std::fs::read_dir(&js_dir).unwrap() {
        let path = entry.unwrap().path();
        bundle_text.push_str(&std::fs::read_to_string(path).unwrap());
    }

    assert!(bundle_text.contains("Hello"));
    assert!(bundle_text.contains("Start editing to see some magic happen!"));
}

#[test]
fn test_analyze_true_adds_exactly_one_report() {
    let dir = tempdir().unwrap();
    scaffold(dir.path());

    let json = build_json(dir.path(), &[("ANALYZE", "true")]);
    let reports = json["files"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|f| f["path"] == "report.json")
        .count();
    assert_eq!(reports, 1);
    assert!(dir
        .path()
        .join("build")
        .join("production")
        .join("report.json")
        .is_file());
}

#[test]
fn test_analyze_other_values_add_no_report() {
    let dir = tempdir().unwrap();
    scaffold(dir.path());

    for value in ["false", "1", "TRUE"] {
        let json = build_json(dir.path(), &[("ANALYZE", value)]);
        let reports = json["files"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|f| f["path"] == "report.json")
            .count();
        assert_eq!(reports, 0, "ANALYZE={value} must not add a report");
    }
}

#[test]
fn test_staging_build_emits_source_maps() {
    let dir = tempdir().unwrap();
    scaffold(dir.path());

    let json = build_json(dir.path(), &[("NODE_ENV", "staging")]);
    let has_map = json["files"]
        .as_array()
        .unwrap()
        .iter()
        .any(|f| f["path"].as_str().unwrap().ends_with(".js.map"));
    assert!(has_map, "staging builds should emit .map files");
}

#[test]
fn test_failed_build_reports_error_code() {
    let dir = tempdir().unwrap();
    scaffold(dir.path());
    std::fs::write(
        dir.path().join("src").join("index.js"),
        "import './does-not-exist';\n",
    )
    .unwrap();

    let output = kiln()
        .args(["build", "--json", "--cwd"])
        .arg(dir.path())
        .output()
        .expect("failed to run build");

    assert!(!output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(stdout.trim_end()).unwrap();

    assert_eq!(json["ok"], false);
    let code = json["error"]["code"].as_str().unwrap();
    assert!(
        code.chars()
            .all(|c| c.is_ascii_uppercase() || c == '_' || c.is_ascii_digit()),
        "error code '{code}' should be SCREAMING_SNAKE_CASE"
    );

    // bail semantics: nothing may be written
    assert!(!dir.path().join("build").exists());
}

#[test]
fn test_build_human_output_not_json() {
    let dir = tempdir().unwrap();
    scaffold(dir.path());

    let output = kiln()
        .args(["build", "--cwd"])
        .arg(dir.path())
        .output()
        .expect("failed to run build");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.trim_start().starts_with('{'));
    assert!(stdout.contains("built"));
}
