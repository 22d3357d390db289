//! Integration tests for env-driven settings loading and template fixtures.

use servarr_config::{DeploymentEnv, load_deployment_settings, load_template, load_template_by_name};
use servarr_domain::ServarrApp;
use std::collections::BTreeMap;
use std::error::Error;
use std::path::{Path, PathBuf};

fn workspace_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| manifest_dir.to_path_buf())
}

fn fixture_templates_dir() -> PathBuf {
    workspace_root().join("tests/fixtures/templates")
}

fn full_env() -> BTreeMap<String, String> {
    [
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
        ("POSTGRES_HOST", "postgres.db.svc"),
        ("POSTGRES_PORT", "5432"),
        ("POSTGRES_PASSWORD", "pg-pass"),
        ("TRUENAS_HOST", "nas.lan"),
        ("TRUENAS_NFS_PATH_MEDIA", "/mnt/tank/media"),
        ("SERVARR_NAMESPACE", "media"),
        ("SERVARR_DOMAIN", "Example.COM"),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value.to_string()))
    .collect()
}

#[test]
fn full_env_loads_settings_without_a_file() -> Result<(), Box<dyn Error>> {
    let env = DeploymentEnv::from_map(&full_env())?;
    let settings = load_deployment_settings(None, &env)?;

    assert_eq!(settings.config.namespace, "media");
    assert_eq!(settings.config.domain, "example.com");
    assert_eq!(settings.config.host_for("sonarr"), "sonarr.example.com");
    assert_eq!(&*settings.nfs.server, "nas.lan");
    assert_eq!(&*settings.nfs.path, "/mnt/tank/media");
    assert_eq!(&*settings.required.postgres.username, "postgres");
    assert_eq!(settings.required.postgres.port, 5432);
    assert_eq!(settings.required.api_keys.len(), 4);
    assert_eq!(
        settings
            .required
            .api_keys
            .get(ServarrApp::Radarr)
            .map(servarr_shared::SecretString::expose),
        Some("radarr-key")
    );
    Ok(())
}

#[test]
fn blank_nfs_variables_use_placeholder_defaults() -> Result<(), Box<dyn Error>> {
    let mut map = full_env();
    map.insert("TRUENAS_HOST".to_string(), String::new());
    map.insert("TRUENAS_NFS_PATH_MEDIA".to_string(), "   ".to_string());
    map.insert("PREPARR_IMAGE".to_string(), String::new());
    let env = DeploymentEnv::from_map(&map)?;
    let settings = load_deployment_settings(None, &env)?;

    assert_eq!(&*settings.nfs.server, "localhost");
    assert_eq!(&*settings.nfs.path, "/path/to/media");
    assert_eq!(settings.preparr_image, None);
    Ok(())
}

#[test]
fn missing_variables_are_reported_together() -> Result<(), Box<dyn Error>> {
    let mut map = full_env();
    map.remove("RADARR_APIKEY");
    map.remove("POSTGRES_PASSWORD");
    let env = DeploymentEnv::from_map(&map)?;

    let Err(error) = load_deployment_settings(None, &env) else {
        return Err("expected missing credentials".into());
    };

    assert_eq!(error.code.code(), "missing_credential");
    assert_eq!(
        error.metadata.get("env_vars"),
        Some(&"RADARR_APIKEY,POSTGRES_PASSWORD".to_string())
    );
    assert!(!error.message.contains("pg-pass"));
    Ok(())
}

#[test]
fn templates_dir_override_points_at_fixtures() -> Result<(), Box<dyn Error>> {
    let mut map = full_env();
    let dir = fixture_templates_dir();
    map.insert(
        "SERVARR_TEMPLATES_DIR".to_string(),
        dir.to_string_lossy().to_string(),
    );
    let env = DeploymentEnv::from_map(&map)?;
    let settings = load_deployment_settings(None, &env)?;

    assert_eq!(settings.templates_dir(), dir.as_path());
    let prowlarr = load_template(settings.templates_dir(), ServarrApp::Prowlarr)?;
    let names: Vec<&str> = prowlarr
        .applications()
        .filter_map(|entry| entry.name())
        .collect();
    assert_eq!(names, vec!["Sonarr", "Radarr", "Lidarr"]);
    Ok(())
}

#[test]
fn unknown_or_absent_templates_fail_with_stable_codes() -> Result<(), Box<dyn Error>> {
    let dir = fixture_templates_dir();

    let Err(unknown) = load_template_by_name(&dir, "../sonarr") else {
        return Err("expected unknown app".into());
    };
    assert_eq!(unknown.code.code(), "unknown_app");

    let Err(absent) = load_template(&dir, ServarrApp::Qbittorrent) else {
        return Err("expected missing template".into());
    };
    assert_eq!(absent.code.code(), "template_not_found");
    assert_eq!(absent.metadata.get("app"), Some(&"qbittorrent".to_string()));
    Ok(())
}
