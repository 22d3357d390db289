//! Environment variable parsing.
//!
//! Every variable the stack reads is parsed here once, into
//! [`DeploymentEnv`]. Parsing is strict: a variable that is present but
//! blank or malformed fails fast, and secret values never reach error
//! metadata.

use servarr_domain::{CredentialMap, ImageRef, ServarrApp};
use servarr_shared::{ErrorCode, ErrorEnvelope, REDACTED_VALUE, SecretString, is_secret_key};
use std::collections::BTreeMap;
use std::fmt;

/// Env var: Sonarr API key (secret).
pub const ENV_SONARR_APIKEY: &str = "SONARR_APIKEY";
/// Env var: Radarr API key (secret).
pub const ENV_RADARR_APIKEY: &str = "RADARR_APIKEY";
/// Env var: Prowlarr API key (secret).
pub const ENV_PROWLARR_APIKEY: &str = "PROWLARR_APIKEY";
/// Env var: qBittorrent API key used by the exporter (secret).
pub const ENV_QBITTORRENT_APIKEY: &str = "QBITTORRENT_APIKEY";

/// Env var: Sonarr admin password (secret).
// gitleaks:allow
pub const ENV_SONARR_PASSWORD: &str = "SONARR_PASSWORD";
/// Env var: Radarr admin password (secret).
// gitleaks:allow
pub const ENV_RADARR_PASSWORD: &str = "RADARR_PASSWORD";
/// Env var: Prowlarr admin password (secret).
// gitleaks:allow
pub const ENV_PROWLARR_PASSWORD: &str = "PROWLARR_PASSWORD";
/// Env var: qBittorrent web UI username.
pub const ENV_QBITTORRENT_USERNAME: &str = "QBITTORRENT_USERNAME";
/// Env var: qBittorrent web UI password (secret).
// gitleaks:allow
pub const ENV_QBITTORRENT_PASSWORD: &str = "QBITTORRENT_PASSWORD";

/// Env var: Preparr image (`repo:tag`).
pub const ENV_PREPARR_IMAGE: &str = "PREPARR_IMAGE";
/// Env var: Sonarr image (`repo:tag`).
pub const ENV_SONARR_IMAGE: &str = "SONARR_IMAGE";
/// Env var: Radarr image (`repo:tag`).
pub const ENV_RADARR_IMAGE: &str = "RADARR_IMAGE";
/// Env var: Prowlarr image (`repo:tag`).
pub const ENV_PROWLARR_IMAGE: &str = "PROWLARR_IMAGE";
/// Env var: qBittorrent image (`repo:tag`).
pub const ENV_QBITTORRENT_IMAGE: &str = "QBITTORRENT_IMAGE";
/// Env var: exportarr sidecar image (required).
pub const ENV_EXPORTARR_IMAGE: &str = "EXPORTARR_IMAGE";
/// Env var: Jellyseerr image (required).
pub const ENV_JELLYSEERR_IMAGE: &str = "JELLYSEERR_IMAGE";

/// Env var: Postgres host.
pub const ENV_POSTGRES_HOST: &str = "POSTGRES_HOST";
/// Env var: Postgres port.
pub const ENV_POSTGRES_PORT: &str = "POSTGRES_PORT";
/// Env var: Postgres user (also the database owner).
pub const ENV_POSTGRES_USER: &str = "POSTGRES_USER";
/// Env var: Postgres password (secret).
// gitleaks:allow
pub const ENV_POSTGRES_PASSWORD: &str = "POSTGRES_PASSWORD";

/// Env var: NFS server backing the media volume.
pub const ENV_TRUENAS_HOST: &str = "TRUENAS_HOST";
/// Env var: NFS export path of the media volume.
pub const ENV_TRUENAS_NFS_PATH_MEDIA: &str = "TRUENAS_NFS_PATH_MEDIA";

/// Env var: Preparr Helm chart version.
pub const ENV_PREPARR_HELM_VERSION: &str = "PREPARR_HELM_VERSION";

/// Env var: namespace override.
pub const ENV_SERVARR_NAMESPACE: &str = "SERVARR_NAMESPACE";
/// Env var: timezone override.
pub const ENV_SERVARR_TIMEZONE: &str = "SERVARR_TIMEZONE";
/// Env var: media volume size override.
pub const ENV_SERVARR_MEDIA_SIZE: &str = "SERVARR_MEDIA_SIZE";
/// Env var: storage class override.
pub const ENV_SERVARR_STORAGE_CLASS: &str = "SERVARR_STORAGE_CLASS";
/// Env var: ingress domain override.
pub const ENV_SERVARR_DOMAIN: &str = "SERVARR_DOMAIN";
/// Env var: ingress class override.
pub const ENV_SERVARR_INGRESS_CLASS: &str = "SERVARR_INGRESS_CLASS";
/// Env var: templates directory override.
pub const ENV_SERVARR_TEMPLATES_DIR: &str = "SERVARR_TEMPLATES_DIR";
/// Env var: Helm chart repository override.
pub const ENV_SERVARR_CHART_REPO: &str = "SERVARR_CHART_REPO";

/// Every variable read from the process environment.
pub const ALL_ENV_VARS: &[&str] = &[
    ENV_SONARR_APIKEY,
    ENV_RADARR_APIKEY,
    ENV_PROWLARR_APIKEY,
    ENV_QBITTORRENT_APIKEY,
    ENV_SONARR_PASSWORD,
    ENV_RADARR_PASSWORD,
    ENV_PROWLARR_PASSWORD,
    ENV_QBITTORRENT_USERNAME,
    ENV_QBITTORRENT_PASSWORD,
    ENV_PREPARR_IMAGE,
    ENV_SONARR_IMAGE,
    ENV_RADARR_IMAGE,
    ENV_PROWLARR_IMAGE,
    ENV_QBITTORRENT_IMAGE,
    ENV_EXPORTARR_IMAGE,
    ENV_JELLYSEERR_IMAGE,
    ENV_POSTGRES_HOST,
    ENV_POSTGRES_PORT,
    ENV_POSTGRES_USER,
    ENV_POSTGRES_PASSWORD,
    ENV_TRUENAS_HOST,
    ENV_TRUENAS_NFS_PATH_MEDIA,
    ENV_PREPARR_HELM_VERSION,
    ENV_SERVARR_NAMESPACE,
    ENV_SERVARR_TIMEZONE,
    ENV_SERVARR_MEDIA_SIZE,
    ENV_SERVARR_STORAGE_CLASS,
    ENV_SERVARR_DOMAIN,
    ENV_SERVARR_INGRESS_CLASS,
    ENV_SERVARR_TEMPLATES_DIR,
    ENV_SERVARR_CHART_REPO,
];

/// Applications whose API key comes from `<APP>_APIKEY`.
pub const API_KEY_APPS: [ServarrApp; 4] = [
    ServarrApp::Sonarr,
    ServarrApp::Radarr,
    ServarrApp::Prowlarr,
    ServarrApp::Qbittorrent,
];

/// Applications with an admin password from `<APP>_PASSWORD`.
pub const ADMIN_PASSWORD_APPS: [ServarrApp; 3] =
    [ServarrApp::Sonarr, ServarrApp::Radarr, ServarrApp::Prowlarr];

/// Applications whose image may be overridden by `<APP>_IMAGE`.
pub const IMAGE_OVERRIDE_APPS: [ServarrApp; 4] = [
    ServarrApp::Sonarr,
    ServarrApp::Radarr,
    ServarrApp::Prowlarr,
    ServarrApp::Qbittorrent,
];

/// Parsed environment. Everything is optional here; [`DeploymentEnv::require`]
/// decides what must be present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentEnv {
    /// `<APP>_APIKEY` values.
    pub api_keys: BTreeMap<ServarrApp, SecretString>,
    /// `<APP>_PASSWORD` values.
    pub admin_passwords: BTreeMap<ServarrApp, SecretString>,
    /// qBittorrent username.
    pub qbittorrent_username: Option<Box<str>>,
    /// qBittorrent password.
    pub qbittorrent_password: Option<SecretString>,
    /// `<APP>_IMAGE` overrides, validated as image references.
    pub app_images: BTreeMap<ServarrApp, Box<str>>,
    /// Preparr image override.
    pub preparr_image: Option<Box<str>>,
    /// Exporter sidecar image.
    pub exportarr_image: Option<Box<str>>,
    /// Jellyseerr image.
    pub jellyseerr_image: Option<Box<str>>,
    /// Postgres host.
    pub postgres_host: Option<Box<str>>,
    /// Postgres port.
    pub postgres_port: Option<u16>,
    /// Postgres user.
    pub postgres_user: Option<Box<str>>,
    /// Postgres password.
    pub postgres_password: Option<SecretString>,
    /// NFS server.
    pub truenas_host: Option<Box<str>>,
    /// NFS export path.
    pub truenas_nfs_path_media: Option<Box<str>>,
    /// Chart version override.
    pub preparr_helm_version: Option<Box<str>>,
    /// `SERVARR_*` overrides for the settings file.
    pub settings: SettingsEnvOverrides,
}

/// `SERVARR_*` overrides applied over the settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsEnvOverrides {
    /// Namespace.
    pub namespace: Option<Box<str>>,
    /// Timezone.
    pub timezone: Option<Box<str>>,
    /// Media volume size.
    pub media_size: Option<Box<str>>,
    /// Storage class.
    pub storage_class: Option<Box<str>>,
    /// Ingress domain.
    pub domain: Option<Box<str>>,
    /// Ingress class.
    pub ingress_class: Option<Box<str>>,
    /// Templates directory.
    pub templates_dir: Option<Box<str>>,
    /// Chart repository URL.
    pub chart_repo: Option<Box<str>>,
}

/// Connection parameters for the Postgres provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresEnv {
    /// Host.
    pub host: Box<str>,
    /// Port.
    pub port: u16,
    /// User; `postgres` when unset.
    pub username: Box<str>,
    /// Password.
    pub password: SecretString,
}

/// Variables that must be present for a full render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredEnv {
    /// API keys for every entry of [`API_KEY_APPS`].
    pub api_keys: CredentialMap,
    /// Admin passwords for every entry of [`ADMIN_PASSWORD_APPS`].
    pub admin_passwords: BTreeMap<ServarrApp, SecretString>,
    /// qBittorrent username.
    pub qbittorrent_username: Box<str>,
    /// qBittorrent password.
    pub qbittorrent_password: SecretString,
    /// Postgres connection.
    pub postgres: PostgresEnv,
    /// Exporter sidecar image.
    pub exportarr_image: Box<str>,
    /// Jellyseerr image.
    pub jellyseerr_image: Box<str>,
}

/// Default Postgres user and database owner.
pub const DEFAULT_POSTGRES_USER: &str = "postgres";

impl DeploymentEnv {
    /// Parse from a key/value map (useful for tests and fixtures).
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self, EnvParseError> {
        let mut api_keys = BTreeMap::new();
        for app in API_KEY_APPS {
            if let Some(key) = parse_optional_secret(map, api_key_var(app))? {
                api_keys.insert(app, key);
            }
        }

        let mut admin_passwords = BTreeMap::new();
        for app in ADMIN_PASSWORD_APPS {
            if let Some(password) = parse_optional_secret(map, password_var(app))? {
                admin_passwords.insert(app, password);
            }
        }

        let mut app_images = BTreeMap::new();
        for app in IMAGE_OVERRIDE_APPS {
            if let Some(image) = parse_optional_image(map, image_var(app))? {
                app_images.insert(app, image);
            }
        }

        Ok(Self {
            api_keys,
            admin_passwords,
            qbittorrent_username: parse_optional_trimmed_string(map, ENV_QBITTORRENT_USERNAME),
            qbittorrent_password: parse_optional_secret(map, ENV_QBITTORRENT_PASSWORD)?,
            app_images,
            preparr_image: parse_optional_image(map, ENV_PREPARR_IMAGE)?,
            exportarr_image: parse_optional_image(map, ENV_EXPORTARR_IMAGE)?,
            jellyseerr_image: parse_optional_image(map, ENV_JELLYSEERR_IMAGE)?,
            postgres_host: parse_optional_trimmed_string(map, ENV_POSTGRES_HOST),
            postgres_port: parse_optional_port(map, ENV_POSTGRES_PORT)?,
            postgres_user: parse_optional_trimmed_string(map, ENV_POSTGRES_USER),
            postgres_password: parse_optional_secret(map, ENV_POSTGRES_PASSWORD)?,
            truenas_host: parse_optional_trimmed_string(map, ENV_TRUENAS_HOST),
            truenas_nfs_path_media: parse_optional_trimmed_string(map, ENV_TRUENAS_NFS_PATH_MEDIA),
            preparr_helm_version: parse_optional_trimmed_string(map, ENV_PREPARR_HELM_VERSION),
            settings: parse_settings_env(map),
        })
    }

    /// Parse from the current process environment.
    pub fn from_std_env() -> Result<Self, EnvParseError> {
        Self::from_map(&collect_std_env())
    }

    /// Names of required variables that are not set, in declaration order.
    #[must_use]
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        for app in API_KEY_APPS {
            if !self.api_keys.contains_key(&app) {
                missing.push(api_key_var(app));
            }
        }
        for app in ADMIN_PASSWORD_APPS {
            if !self.admin_passwords.contains_key(&app) {
                missing.push(password_var(app));
            }
        }
        let singles = [
            (ENV_QBITTORRENT_USERNAME, self.qbittorrent_username.is_some()),
            (ENV_QBITTORRENT_PASSWORD, self.qbittorrent_password.is_some()),
            (ENV_EXPORTARR_IMAGE, self.exportarr_image.is_some()),
            (ENV_JELLYSEERR_IMAGE, self.jellyseerr_image.is_some()),
            (ENV_POSTGRES_HOST, self.postgres_host.is_some()),
            (ENV_POSTGRES_PORT, self.postgres_port.is_some()),
            (ENV_POSTGRES_PASSWORD, self.postgres_password.is_some()),
        ];
        missing.extend(
            singles
                .into_iter()
                .filter(|(_, present)| !present)
                .map(|(var, _)| var),
        );
        missing
    }

    /// Extract the variables a render cannot do without.
    ///
    /// Every missing variable is reported in one error, before any
    /// composition work starts.
    pub fn require(&self) -> Result<RequiredEnv, ErrorEnvelope> {
        let missing = self.missing_required();
        if !missing.is_empty() {
            return Err(missing_credential_error(&missing));
        }

        let (
            Some(qbittorrent_username),
            Some(qbittorrent_password),
            Some(exportarr_image),
            Some(jellyseerr_image),
            Some(host),
            Some(port),
            Some(password),
        ) = (
            self.qbittorrent_username.clone(),
            self.qbittorrent_password.clone(),
            self.exportarr_image.clone(),
            self.jellyseerr_image.clone(),
            self.postgres_host.clone(),
            self.postgres_port,
            self.postgres_password.clone(),
        )
        else {
            return Err(ErrorEnvelope::invariant(
                ErrorCode::internal(),
                "required env check passed with missing values",
            ));
        };

        let api_keys = self
            .api_keys
            .iter()
            .map(|(app, key)| (*app, key.clone()))
            .collect();

        Ok(RequiredEnv {
            api_keys,
            admin_passwords: self.admin_passwords.clone(),
            qbittorrent_username,
            qbittorrent_password,
            postgres: PostgresEnv {
                host,
                port,
                username: self
                    .postgres_user
                    .clone()
                    .unwrap_or_else(|| DEFAULT_POSTGRES_USER.into()),
                password,
            },
            exportarr_image,
            jellyseerr_image,
        })
    }

    /// Presence of every known variable, with secrets redacted.
    ///
    /// Used by `env check`; values of secret variables are never shown.
    #[must_use]
    pub fn describe(map: &BTreeMap<String, String>) -> Vec<EnvVarStatus> {
        ALL_ENV_VARS
            .iter()
            .copied()
            .map(|var| EnvVarStatus {
                name: var,
                present: map.get(var).is_some_and(|value| !value.trim().is_empty()),
                value: map
                    .get(var)
                    .filter(|value| !value.trim().is_empty())
                    .map(|value| redact_value(var, value.trim())),
            })
            .collect()
    }
}

/// Presence report for one variable.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct EnvVarStatus {
    /// Variable name.
    pub name: &'static str,
    /// True when set to a non-blank value.
    pub present: bool,
    /// Value, redacted for secrets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Snapshot of the known variables from the process environment.
#[must_use]
pub fn collect_std_env() -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for name in ALL_ENV_VARS {
        if let Ok(value) = std::env::var(name) {
            map.insert((*name).to_string(), value);
        }
    }
    map
}

/// `<APP>_APIKEY` for an application.
#[must_use]
pub const fn api_key_var(app: ServarrApp) -> &'static str {
    match app {
        ServarrApp::Sonarr => ENV_SONARR_APIKEY,
        ServarrApp::Radarr => ENV_RADARR_APIKEY,
        ServarrApp::Prowlarr => ENV_PROWLARR_APIKEY,
        ServarrApp::Lidarr => "LIDARR_APIKEY",
        ServarrApp::Qbittorrent => ENV_QBITTORRENT_APIKEY,
        ServarrApp::Jellyseerr => "JELLYSEERR_APIKEY",
    }
}

/// `<APP>_PASSWORD` for an application.
#[must_use]
pub const fn password_var(app: ServarrApp) -> &'static str {
    match app {
        ServarrApp::Sonarr => ENV_SONARR_PASSWORD,
        ServarrApp::Radarr => ENV_RADARR_PASSWORD,
        ServarrApp::Prowlarr => ENV_PROWLARR_PASSWORD,
        ServarrApp::Lidarr => "LIDARR_PASSWORD",
        ServarrApp::Qbittorrent => ENV_QBITTORRENT_PASSWORD,
        ServarrApp::Jellyseerr => "JELLYSEERR_PASSWORD",
    }
}

/// `<APP>_IMAGE` for an application.
#[must_use]
pub const fn image_var(app: ServarrApp) -> &'static str {
    match app {
        ServarrApp::Sonarr => ENV_SONARR_IMAGE,
        ServarrApp::Radarr => ENV_RADARR_IMAGE,
        ServarrApp::Prowlarr => ENV_PROWLARR_IMAGE,
        ServarrApp::Lidarr => "LIDARR_IMAGE",
        ServarrApp::Qbittorrent => ENV_QBITTORRENT_IMAGE,
        ServarrApp::Jellyseerr => ENV_JELLYSEERR_IMAGE,
    }
}

fn missing_credential_error(missing: &[&'static str]) -> ErrorEnvelope {
    ErrorEnvelope::expected(
        ErrorCode::new("config", "missing_credential"),
        format!(
            "required environment variables are not set: {}",
            missing.join(", ")
        ),
    )
    .with_metadata("env_vars", missing.join(","))
    .with_metadata("count", missing.len().to_string())
}

fn parse_settings_env(map: &BTreeMap<String, String>) -> SettingsEnvOverrides {
    SettingsEnvOverrides {
        namespace: parse_optional_trimmed_string(map, ENV_SERVARR_NAMESPACE),
        timezone: parse_optional_trimmed_string(map, ENV_SERVARR_TIMEZONE),
        media_size: parse_optional_trimmed_string(map, ENV_SERVARR_MEDIA_SIZE),
        storage_class: parse_optional_trimmed_string(map, ENV_SERVARR_STORAGE_CLASS),
        domain: parse_optional_trimmed_string(map, ENV_SERVARR_DOMAIN),
        ingress_class: parse_optional_trimmed_string(map, ENV_SERVARR_INGRESS_CLASS),
        templates_dir: parse_optional_trimmed_string(map, ENV_SERVARR_TEMPLATES_DIR),
        chart_repo: parse_optional_trimmed_string(map, ENV_SERVARR_CHART_REPO),
    }
}

/// Env parsing failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvParseError {
    /// A secret env var was present but empty after trimming.
    EmptySecret {
        /// Env var name.
        var: &'static str,
    },
    /// Integer env var had an invalid value.
    InvalidInt {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
    /// Image env var was not a usable `repository:tag`.
    InvalidImage {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
        /// Reason reported by the image parser.
        reason: String,
    },
}

impl EnvParseError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::EmptySecret { .. } => ErrorCode::new("config", "empty_env_var"),
            Self::InvalidInt { .. } => ErrorCode::new("config", "invalid_env_int"),
            Self::InvalidImage { .. } => ErrorCode::new("config", "invalid_env_image"),
        }
    }
}

impl fmt::Display for EnvParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySecret { var } => write!(formatter, "{var} must be non-empty"),
            Self::InvalidInt { var, .. } => write!(formatter, "{var} must be a port number"),
            Self::InvalidImage { var, reason, .. } => write!(formatter, "{var}: {reason}"),
        }
    }
}

impl std::error::Error for EnvParseError {}

impl From<EnvParseError> for ErrorEnvelope {
    fn from(error: EnvParseError) -> Self {
        let code = error.error_code();
        let message = error.to_string();
        let envelope = Self::expected(code, message);

        match error {
            EnvParseError::EmptySecret { var } => envelope.with_metadata("env_var", var),
            EnvParseError::InvalidInt { var, value }
            | EnvParseError::InvalidImage { var, value, .. } => envelope
                .with_metadata("env_var", var)
                .with_metadata("value", redact_value(var, &value)),
        }
    }
}

// Blank counts as unset, so `.env` lines like `TRUENAS_HOST=` fall back to
// defaults (or show up as missing when required).
fn parse_optional_trimmed_string(map: &BTreeMap<String, String>, var: &str) -> Option<Box<str>> {
    map.get(var)
        .map(|raw| raw.trim())
        .filter(|trimmed| !trimmed.is_empty())
        .map(Into::into)
}

fn parse_optional_secret(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<SecretString>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptySecret { var });
    }

    Ok(Some(SecretString::new(trimmed.to_owned())))
}

fn parse_optional_port(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<u16>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    match trimmed.parse::<u16>() {
        Ok(port) if port > 0 => Ok(Some(port)),
        _ => Err(EnvParseError::InvalidInt {
            var,
            value: raw.clone(),
        }),
    }
}

// Shape is checked here; defaults are filled in by the composer.
fn parse_optional_image(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<Box<str>>, EnvParseError> {
    let Some(value) = parse_optional_trimmed_string(map, var) else {
        return Ok(None);
    };

    ImageRef::parse_with_defaults(&value, "", "").map_err(|error| {
        EnvParseError::InvalidImage {
            var,
            value: value.to_string(),
            reason: error.to_string(),
        }
    })?;

    Ok(Some(value))
}

fn redact_value(var: &str, value: &str) -> String {
    if is_secret_key(var) {
        REDACTED_VALUE.to_string()
    } else {
        value.to_string()
    }
}
