//! End-to-end tests for `servarr render`.

use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

const FULL_ENV: &[(&str, &str)] = &[
    ("SONARR_APIKEY", "sonarr-key"),
    ("RADARR_APIKEY", "radarr-key"),
    ("PROWLARR_APIKEY", "prowlarr-key"),
    ("QBITTORRENT_APIKEY", "qbit-key"),
    ("SONARR_PASSWORD", "sonarr-pass"),
    ("RADARR_PASSWORD", "radarr-pass"),
    ("PROWLARR_PASSWORD", "prowlarr-pass"),
    ("QBITTORRENT_USERNAME", "admin"),
    ("QBITTORRENT_PASSWORD", "qbit-pass"),
    ("EXPORTARR_IMAGE", "ghcr.io/onedr0p/exportarr:v2.0.1"),
    ("JELLYSEERR_IMAGE", "fallenbagel/jellyseerr:2.1.0"),
    ("POSTGRES_HOST", "db.lan"),
    ("POSTGRES_PORT", "5432"),
    ("POSTGRES_PASSWORD", "pg-pass"),
    ("TRUENAS_HOST", "nas.lan"),
    ("TRUENAS_NFS_PATH_MEDIA", "/mnt/tank/media"),
];

fn workspace_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| manifest_dir.to_path_buf())
}

fn fixture_templates() -> PathBuf {
    workspace_root().join("tests").join("fixtures").join("templates")
}

fn temp_dir(label: &str) -> io::Result<PathBuf> {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("servarr-e2e-{label}-{unique}"));
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn run_cli(env: &[(&str, &str)], templates: &Path, args: &[&str]) -> io::Result<Output> {
    let cwd = temp_dir("cwd")?;
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
    serde_json::from_slice(&output.stdout).map_err(|error| {
        io::Error::other(format!(
            "stdout is not JSON ({error}): {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        ))
    })
}

#[test]
fn render_json_produces_a_redacted_plan() -> io::Result<()> {
    let output = run_cli(FULL_ENV, &fixture_templates(), &["render", "--output", "json"])?;
    assert!(output.status.success(), "{output:?}");

    let plan = stdout_json(&output)?;
    assert_eq!(plan["namespace"]["name"], "servarr");
    assert_eq!(plan["mediaVolume"]["nfs"]["server"], "nas.lan");
    assert_eq!(plan["chart"]["values"]["lidarr"]["enabled"], false);

    let prowlarr = &plan["chart"]["values"]["prowlarr"]["config"];
    assert_eq!(prowlarr["applications"][0]["fields"][1]["value"], "[REDACTED]");
    assert_eq!(prowlarr["applications"][2]["fields"][0]["value"], "lidarr-literal");

    let stdout = String::from_utf8_lossy(&output.stdout);
    for secret in ["sonarr-key", "radarr-key", "pg-pass", "qbit-pass"] {
        assert!(!stdout.contains(secret), "{secret} leaked into the plan");
    }
    Ok(())
}

#[test]
fn reveal_secrets_cross_links_real_keys() -> io::Result<()> {
    let output = run_cli(
        FULL_ENV,
        &fixture_templates(),
        &["render", "--output", "json", "--reveal-secrets"],
    )?;
    assert!(output.status.success(), "{output:?}");

    let plan = stdout_json(&output)?;
    let values = &plan["chart"]["values"];
    assert_eq!(values["prowlarr"]["config"]["apiKey"], "prowlarr-key");
    assert_eq!(
        values["prowlarr"]["config"]["applications"][0]["fields"][1]["value"],
        "sonarr-key"
    );
    assert_eq!(
        values["prowlarr"]["config"]["applications"][1]["fields"][1]["value"],
        "radarr-key"
    );
    assert_eq!(values["sonarr"]["config"]["apiKey"], "sonarr-key");
    assert_eq!(values["sonarr"]["adminPassword"], "sonarr-pass");
    assert_eq!(
        values["qbittorrent"]["extraContainers"][0]["env"][2]["value"],
        "qbit-key"
    );
    Ok(())
}

#[test]
fn missing_env_exits_with_invalid_input() -> io::Result<()> {
    let output = run_cli(&[], &fixture_templates(), &["render", "--output", "json"])?;
    assert_eq!(output.status.code(), Some(2));

    let body = stdout_json(&output)?;
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"]["code"], "ERR_CONFIG_MISSING_CREDENTIAL");
    let missing = body["error"]["meta"]["env_vars"].as_str().unwrap_or_default();
    assert!(missing.contains("SONARR_APIKEY"));
    assert!(missing.contains("POSTGRES_HOST"));
    Ok(())
}

#[test]
fn missing_template_is_reported_without_output() -> io::Result<()> {
    let empty = temp_dir("no-templates")?;
    let out = empty.join("plan.json");
    let out_arg = out.to_string_lossy().to_string();
    let output = run_cli(
        FULL_ENV,
        &empty,
        &["render", "--output", "json", "--out", &out_arg],
    )?;
    assert_eq!(output.status.code(), Some(2));

    let body = stdout_json(&output)?;
    assert_eq!(body["error"]["code"], "ERR_CONFIG_TEMPLATE_NOT_FOUND");
    assert!(!out.exists(), "no partial plan may be written");
    Ok(())
}

#[test]
fn render_out_writes_yaml_by_extension() -> io::Result<()> {
    let dir = temp_dir("yaml-out")?;
    let out = dir.join("plan.yaml");
    let out_arg = out.to_string_lossy().to_string();
    let output = run_cli(
        FULL_ENV,
        &fixture_templates(),
        &["render", "--out", &out_arg, "--no-progress"],
    )?;
    assert!(output.status.success(), "{output:?}");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("status: ok\n"));

    let document = std::fs::read_to_string(&out)?;
    assert!(document.contains("mediaClaim:"));
    assert!(document.contains("jellyseerr"));
    Ok(())
}
