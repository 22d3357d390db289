//! End-to-end tests for the inspection commands (`template`, `env`, `config`, `info`).

use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn workspace_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| manifest_dir.to_path_buf())
}

fn run_cli(env: &[(&str, &str)], args: &[&str]) -> io::Result<Output> {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let cwd = std::env::temp_dir().join(format!("servarr-e2e-inspect-{unique}"));
    std::fs::create_dir_all(&cwd)?;
    let templates = workspace_root().join("tests").join("fixtures").join("templates");

    Command::new(env!("CARGO_BIN_EXE_servarr"))
        .current_dir(&cwd)
        .env_clear()
        .env("SERVARR_TEMPLATES_DIR", templates)
        .envs(env.iter().copied())
        .arg("--no-dotenv")
        .args(args)
        .output()
}

fn stdout_json(output: &Output) -> io::Result<Value> {
    serde_json::from_slice(&output.stdout)
        .map_err(|error| io::Error::other(format!("stdout is not JSON: {error}")))
}

#[test]
fn template_show_prints_the_raw_template() -> io::Result<()> {
    let output = run_cli(&[], &["template", "show", "radarr"])?;
    assert!(output.status.success(), "{output:?}");

    let template: Value = serde_json::from_slice(&output.stdout)
        .map_err(|error| io::Error::other(error.to_string()))?;
    assert_eq!(template["rootFolders"][0]["path"], "/movies");
    Ok(())
}

#[test]
fn template_show_unknown_app_is_invalid_input() -> io::Result<()> {
    let output = run_cli(&[], &["template", "show", "plex", "--output", "json"])?;
    assert_eq!(output.status.code(), Some(2));
    assert_eq!(stdout_json(&output)?["error"]["code"], "ERR_CONFIG_UNKNOWN_APP");
    Ok(())
}

#[test]
fn env_check_lists_missing_variables() -> io::Result<()> {
    let output = run_cli(&[("SONARR_APIKEY", "abc")], &["env", "check", "--output", "json"])?;
    assert_eq!(output.status.code(), Some(2));

    let body = stdout_json(&output)?;
    let missing: Vec<&str> = body["missing"]
        .as_array()
        .map(|values| values.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    assert!(!missing.contains(&"SONARR_APIKEY"));
    assert!(missing.contains(&"RADARR_APIKEY"));
    assert!(!String::from_utf8_lossy(&output.stdout).contains("\"abc\""));
    Ok(())
}

#[test]
fn config_show_applies_env_overrides() -> io::Result<()> {
    let output = run_cli(
        &[("SERVARR_NAMESPACE", "media"), ("SERVARR_DOMAIN", "Example.ORG")],
        &["config", "show", "--output", "json"],
    )?;
    assert!(output.status.success(), "{output:?}");

    let body = stdout_json(&output)?;
    assert_eq!(body["effectiveConfig"]["namespace"], "media");
    assert_eq!(body["effectiveConfig"]["domain"], "example.org");
    Ok(())
}

#[test]
fn info_reports_cross_link_routes() -> io::Result<()> {
    let output = run_cli(&[], &["info", "--output", "json"])?;
    assert!(output.status.success(), "{output:?}");

    let body = stdout_json(&output)?;
    assert_eq!(body["crossLink"]["app"], "prowlarr");
    assert_eq!(body["crossLink"]["routes"][0]["entry"], "Sonarr");
    Ok(())
}
