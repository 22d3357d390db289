//! Settings loading (defaults + file + env).
//!
//! The loader owns the merge order and surfaces user-facing errors as
//! typed `ErrorEnvelope`s. Everything the composer needs is assembled here
//! once, so composition never reads the process environment.

use crate::env::{DeploymentEnv, RequiredEnv, SettingsEnvOverrides};
use crate::schema::{DeploymentConfig, ValidatedDeploymentConfig};
use servarr_domain::ServarrApp;
use servarr_shared::{ErrorCode, ErrorEnvelope};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default NFS server when `TRUENAS_HOST` is unset.
pub const DEFAULT_NFS_SERVER: &str = "localhost";
/// Default NFS export when `TRUENAS_NFS_PATH_MEDIA` is unset.
pub const DEFAULT_NFS_PATH: &str = "/path/to/media";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Json,
    Toml,
}

/// NFS export backing the media volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NfsSource {
    /// NFS server host.
    pub server: Box<str>,
    /// Export path.
    pub path: Box<str>,
}

/// Everything a render needs, validated up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentSettings {
    /// Validated stack settings.
    pub config: ValidatedDeploymentConfig,
    /// Required credentials, images, and Postgres connection.
    pub required: RequiredEnv,
    /// Media volume source.
    pub nfs: NfsSource,
    /// Optional `<APP>_IMAGE` overrides.
    pub image_overrides: BTreeMap<ServarrApp, Box<str>>,
    /// Optional Preparr image override.
    pub preparr_image: Option<Box<str>>,
}

impl DeploymentSettings {
    /// Directory holding application templates.
    #[must_use]
    pub fn templates_dir(&self) -> &Path {
        &self.config.templates_dir
    }
}

/// Load settings from an optional file and apply env overrides.
///
/// Precedence (highest wins):
/// - env overrides (`SERVARR_*`, `PREPARR_HELM_VERSION`)
/// - settings file (JSON or TOML, by extension)
/// - defaults (`DeploymentConfig::default()`)
pub fn load_deployment_config_from_path(
    config_path: Option<&Path>,
    env: &DeploymentEnv,
) -> Result<ValidatedDeploymentConfig, ErrorEnvelope> {
    let config = match config_path {
        None => DeploymentConfig::default(),
        Some(path) => {
            let config_text = read_config_file(path)?;
            let format = detect_config_format(path)?;
            debug!(path = %path.display(), ?format, "loaded settings file");
            parse_config_unvalidated(&config_text, format)?
        },
    };

    apply_env_overrides(config, env)
}

/// Load settings and required env in one pass.
///
/// Missing credentials are reported here, before any template is read.
pub fn load_deployment_settings(
    config_path: Option<&Path>,
    env: &DeploymentEnv,
) -> Result<DeploymentSettings, ErrorEnvelope> {
    let config = load_deployment_config_from_path(config_path, env)?;
    let required = env.require()?;

    Ok(DeploymentSettings {
        config,
        required,
        nfs: NfsSource {
            server: env
                .truenas_host
                .clone()
                .unwrap_or_else(|| DEFAULT_NFS_SERVER.into()),
            path: env
                .truenas_nfs_path_media
                .clone()
                .unwrap_or_else(|| DEFAULT_NFS_PATH.into()),
        },
        image_overrides: env.app_images.clone(),
        preparr_image: env.preparr_image.clone(),
    })
}

/// Load settings using the current process environment.
pub fn load_deployment_settings_std_env(
    config_path: Option<&Path>,
) -> Result<DeploymentSettings, ErrorEnvelope> {
    let env = DeploymentEnv::from_std_env().map_err(ErrorEnvelope::from)?;
    load_deployment_settings(config_path, &env)
}

/// Apply env overrides to base settings (env wins) and validate the result.
pub fn apply_env_overrides(
    base: DeploymentConfig,
    env: &DeploymentEnv,
) -> Result<ValidatedDeploymentConfig, ErrorEnvelope> {
    let mut config = base;
    let SettingsEnvOverrides {
        namespace,
        timezone,
        media_size,
        storage_class,
        domain,
        ingress_class,
        templates_dir,
        chart_repo,
    } = &env.settings;

    override_string(&mut config.namespace, namespace.as_deref());
    override_string(&mut config.timezone, timezone.as_deref());
    override_string(&mut config.media_size, media_size.as_deref());
    override_string(&mut config.storage_class, storage_class.as_deref());
    override_string(&mut config.domain, domain.as_deref());
    override_string(&mut config.ingress_class, ingress_class.as_deref());
    override_string(&mut config.chart_repo, chart_repo.as_deref());
    override_string(&mut config.chart_version, env.preparr_helm_version.as_deref());
    if let Some(dir) = templates_dir {
        config.templates_dir = PathBuf::from(&**dir);
    }

    config.validate_and_normalize().map_err(ErrorEnvelope::from)
}

/// Serialize settings as pretty JSON (with trailing newline).
pub fn to_pretty_json(config: &DeploymentConfig) -> Result<String, ErrorEnvelope> {
    let mut output = serde_json::to_string_pretty(config).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::internal(),
            format!("failed to serialize settings: {error}"),
        )
    })?;
    output.push('\n');
    Ok(output)
}

/// Serialize settings as pretty TOML (with trailing newline).
pub fn to_pretty_toml(config: &DeploymentConfig) -> Result<String, ErrorEnvelope> {
    let mut output = toml::to_string_pretty(config).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::new("config", "serialize_toml"),
            format!("failed to serialize settings TOML: {error}"),
        )
    })?;
    if !output.ends_with('\n') {
        output.push('\n');
    }
    Ok(output)
}

fn override_string(target: &mut String, value: Option<&str>) {
    if let Some(value) = value {
        *target = value.to_string();
    }
}

fn parse_config_unvalidated(
    input: &str,
    format: ConfigFormat,
) -> Result<DeploymentConfig, ErrorEnvelope> {
    match format {
        ConfigFormat::Json => serde_json::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_json"),
                format!("invalid settings JSON: {error}"),
            )
            .with_metadata("source", "config")
        }),
        ConfigFormat::Toml => toml::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_toml"),
                format!("invalid settings TOML: {error}"),
            )
            .with_metadata("source", "config")
        }),
    }
}

fn read_config_file(path: &Path) -> Result<String, ErrorEnvelope> {
    std::fs::read_to_string(path).map_err(|error| {
        let code = match error.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::new("config", "config_file_not_found"),
            std::io::ErrorKind::PermissionDenied => {
                ErrorCode::new("config", "config_file_permission_denied")
            },
            _ => ErrorCode::new("config", "config_file_io"),
        };

        ErrorEnvelope::expected(code, format!("failed to read settings file: {error}"))
            .with_metadata("path", path.to_string_lossy().to_string())
    })
}

fn detect_config_format(path: &Path) -> Result<ConfigFormat, ErrorEnvelope> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        None | Some("json") => Ok(ConfigFormat::Json),
        Some("toml") => Ok(ConfigFormat::Toml),
        Some(other) => Err(ErrorEnvelope::expected(
            ErrorCode::new("config", "unsupported_format"),
            "unsupported settings format; use .json or .toml",
        )
        .with_metadata("extension", other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{ENV_PREPARR_HELM_VERSION, ENV_SERVARR_NAMESPACE, ENV_TRUENAS_HOST};
    use std::error::Error;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file(name: &str, contents: &str) -> Result<PathBuf, Box<dyn Error>> {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH)?.as_nanos();
        let dir = std::env::temp_dir().join(format!("servarr-config-load-{nanos}"));
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(name);
        std::fs::write(&path, contents)?;
        Ok(path)
    }

    fn env_from(pairs: &[(&str, &str)]) -> Result<DeploymentEnv, Box<dyn Error>> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        Ok(DeploymentEnv::from_map(&map)?)
    }

    #[test]
    fn env_wins_over_file_and_defaults() -> Result<(), Box<dyn Error>> {
        let path = temp_file("settings.json", r#"{"namespace":"from-file","timezone":"UTC"}"#)?;
        let env = env_from(&[
            (ENV_SERVARR_NAMESPACE, "from-env"),
            (ENV_PREPARR_HELM_VERSION, "0.4.0"),
        ])?;

        let config = load_deployment_config_from_path(Some(&path), &env)?;
        assert_eq!(config.namespace, "from-env");
        assert_eq!(config.timezone, "UTC");
        assert_eq!(config.chart_version, "0.4.0");
        assert_eq!(config.ingress_class, crate::schema::DEFAULT_INGRESS_CLASS);
        Ok(())
    }

    #[test]
    fn toml_file_is_detected_by_extension() -> Result<(), Box<dyn Error>> {
        let path = temp_file("settings.toml", "domain = \"media.lan\"\n")?;
        let config = load_deployment_config_from_path(Some(&path), &DeploymentEnv::default())?;
        assert_eq!(config.host_for("radarr"), "radarr.media.lan");
        Ok(())
    }

    #[test]
    fn missing_settings_file_has_stable_code() {
        let path = std::env::temp_dir().join("servarr-missing-settings-file.json");
        let error = load_deployment_config_from_path(Some(&path), &DeploymentEnv::default()).err();
        assert_eq!(
            error.map(|error| error.code),
            Some(ErrorCode::new("config", "config_file_not_found"))
        );
    }

    #[test]
    fn unsupported_extension_is_rejected() -> Result<(), Box<dyn Error>> {
        let path = temp_file("settings.yaml", "namespace: x\n")?;
        let error = load_deployment_config_from_path(Some(&path), &DeploymentEnv::default()).err();
        assert_eq!(
            error.map(|error| error.code),
            Some(ErrorCode::new("config", "unsupported_format"))
        );
        Ok(())
    }

    #[test]
    fn settings_require_credentials_before_composition() -> Result<(), Box<dyn Error>> {
        let env = env_from(&[(ENV_TRUENAS_HOST, "nas.lan")])?;
        let error = load_deployment_settings(None, &env).err();
        assert_eq!(
            error.map(|error| error.code),
            Some(ErrorCode::new("config", "missing_credential"))
        );
        Ok(())
    }

    #[test]
    fn pretty_json_ends_with_newline() -> Result<(), Box<dyn Error>> {
        let output = to_pretty_json(&DeploymentConfig::default())?;
        assert!(output.ends_with("}\n"));
        assert!(output.contains("\"templatesDir\": \"configs\""));
        Ok(())
    }
}
