//! Deployment settings schema, defaults, validation, and normalization.
//!
//! These are the stack-level knobs that are not secrets: names, sizes,
//! hostnames, and where templates live. Deserialization is strict
//! (unknown keys are rejected) and validation returns typed errors mapped
//! to `ErrorEnvelope`.

use serde::{Deserialize, Serialize};
use servarr_shared::{ErrorCode, ErrorEnvelope};
use std::fmt;
use std::path::PathBuf;
use url::Url;

/// Default Kubernetes namespace.
pub const DEFAULT_NAMESPACE: &str = "servarr";
/// Default container timezone.
pub const DEFAULT_TIMEZONE: &str = "Europe/Brussels";
/// Default media volume capacity.
pub const DEFAULT_MEDIA_SIZE: &str = "500Gi";
/// Default storage class of the media volume.
pub const DEFAULT_STORAGE_CLASS: &str = "truenas-hdd-stripe-nfs";
/// Default ingress domain.
pub const DEFAULT_DOMAIN: &str = "robbe.work";
/// Default ingress class.
pub const DEFAULT_INGRESS_CLASS: &str = "cloudflare-tunnel";
/// Default templates directory, relative to the working directory.
pub const DEFAULT_TEMPLATES_DIR: &str = "configs";
/// Default Preparr chart repository.
pub const DEFAULT_CHART_REPO: &str = "https://robbeverhelst.github.io/Preparr";
/// Default Preparr chart version.
pub const DEFAULT_CHART_VERSION: &str = "0.3.2";

const NAME_MAX_LEN: usize = 63;
const QUANTITY_SUFFIXES: &[&str] = &[
    "", "Ki", "Mi", "Gi", "Ti", "Pi", "Ei", "k", "M", "G", "T", "P", "E",
];

/// Stack-level deployment settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct DeploymentConfig {
    /// Kubernetes namespace for every namespaced resource.
    pub namespace: String,
    /// Timezone passed to every container.
    pub timezone: String,
    /// Capacity of the shared media volume (Kubernetes quantity).
    pub media_size: String,
    /// Storage class of the media volume and claim.
    pub storage_class: String,
    /// Domain appended to ingress hosts (`sonarr.<domain>`).
    pub domain: String,
    /// Ingress class for every ingress.
    pub ingress_class: String,
    /// Directory holding `<app>.json` templates.
    pub templates_dir: PathBuf,
    /// Preparr chart repository.
    pub chart_repo: String,
    /// Preparr chart version.
    pub chart_version: String,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            media_size: DEFAULT_MEDIA_SIZE.to_string(),
            storage_class: DEFAULT_STORAGE_CLASS.to_string(),
            domain: DEFAULT_DOMAIN.to_string(),
            ingress_class: DEFAULT_INGRESS_CLASS.to_string(),
            templates_dir: PathBuf::from(DEFAULT_TEMPLATES_DIR),
            chart_repo: DEFAULT_CHART_REPO.to_string(),
            chart_version: DEFAULT_CHART_VERSION.to_string(),
        }
    }
}

impl DeploymentConfig {
    /// Validate and normalize the settings.
    pub fn validate_and_normalize(mut self) -> Result<ValidatedDeploymentConfig, ConfigSchemaError> {
        self.normalize();

        validate_non_empty("timezone", &self.timezone)?;
        validate_non_empty("chartVersion", &self.chart_version)?;
        validate_dns_label("namespace", &self.namespace)?;
        validate_dns_subdomain("storageClass", &self.storage_class)?;
        validate_dns_subdomain("ingressClass", &self.ingress_class)?;
        validate_dns_subdomain("domain", &self.domain)?;
        validate_quantity("mediaSize", &self.media_size)?;
        validate_http_url("chartRepo", &self.chart_repo)?;
        if self.templates_dir.as_os_str().is_empty() {
            return Err(ConfigSchemaError::EmptyValue {
                field: "templatesDir",
            });
        }

        Ok(ValidatedDeploymentConfig { raw: self })
    }

    fn normalize(&mut self) {
        for value in [
            &mut self.namespace,
            &mut self.timezone,
            &mut self.media_size,
            &mut self.storage_class,
            &mut self.domain,
            &mut self.ingress_class,
            &mut self.chart_repo,
            &mut self.chart_version,
        ] {
            let trimmed = value.trim();
            if trimmed.len() != value.len() {
                *value = trimmed.to_string();
            }
        }
        self.domain = self.domain.to_ascii_lowercase();
        if self.chart_repo.ends_with('/') {
            self.chart_repo = self.chart_repo.trim_end_matches('/').to_string();
        }
    }

    /// Ingress host for an application slug (`sonarr.robbe.work`).
    #[must_use]
    pub fn host_for(&self, slug: &str) -> String {
        format!("{slug}.{}", self.domain)
    }
}

/// Settings that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedDeploymentConfig {
    raw: DeploymentConfig,
}

impl ValidatedDeploymentConfig {
    /// Borrow the raw settings.
    #[must_use]
    pub const fn as_ref(&self) -> &DeploymentConfig {
        &self.raw
    }

    /// Consume the wrapper and return the raw settings.
    #[must_use]
    pub fn into_inner(self) -> DeploymentConfig {
        self.raw
    }
}

impl AsRef<DeploymentConfig> for ValidatedDeploymentConfig {
    fn as_ref(&self) -> &DeploymentConfig {
        &self.raw
    }
}

impl std::ops::Deref for ValidatedDeploymentConfig {
    type Target = DeploymentConfig;

    fn deref(&self) -> &Self::Target {
        &self.raw
    }
}

/// Parse and validate settings from JSON.
pub fn parse_deployment_config_json(input: &str) -> Result<ValidatedDeploymentConfig, ErrorEnvelope> {
    let config: DeploymentConfig = serde_json::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_json"),
            format!("invalid settings JSON: {error}"),
        )
    })?;
    config.validate_and_normalize().map_err(ErrorEnvelope::from)
}

/// Parse and validate settings from TOML.
pub fn parse_deployment_config_toml(input: &str) -> Result<ValidatedDeploymentConfig, ErrorEnvelope> {
    let config: DeploymentConfig = toml::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_toml"),
            format!("invalid settings TOML: {error}"),
        )
    })?;
    config.validate_and_normalize().map_err(ErrorEnvelope::from)
}

/// Settings validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSchemaError {
    /// A required value is blank.
    EmptyValue {
        /// Field name in the settings file.
        field: &'static str,
    },
    /// A Kubernetes object name is malformed.
    InvalidName {
        /// Field name in the settings file.
        field: &'static str,
        /// Value provided.
        value: String,
    },
    /// A Kubernetes quantity is malformed.
    InvalidQuantity {
        /// Field name in the settings file.
        field: &'static str,
        /// Value provided.
        value: String,
    },
    /// A URL is malformed or not http(s).
    InvalidUrl {
        /// Field name in the settings file.
        field: &'static str,
        /// Value provided (credentials stripped).
        url: String,
    },
}

impl ConfigSchemaError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::EmptyValue { .. } => ErrorCode::new("config", "empty_setting"),
            Self::InvalidName { .. } => ErrorCode::new("config", "invalid_name"),
            Self::InvalidQuantity { .. } => ErrorCode::new("config", "invalid_quantity"),
            Self::InvalidUrl { .. } => ErrorCode::new("config", "invalid_url"),
        }
    }
}

impl fmt::Display for ConfigSchemaError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyValue { field } => write!(formatter, "{field} must be non-empty"),
            Self::InvalidName { field, value } => write!(
                formatter,
                "{field} must be a lowercase DNS name (got {value:?})"
            ),
            Self::InvalidQuantity { field, value } => write!(
                formatter,
                "{field} must be a storage quantity such as 500Gi (got {value:?})"
            ),
            Self::InvalidUrl { field, url } => {
                write!(formatter, "{field} must be an http(s) URL (got {url})")
            },
        }
    }
}

impl std::error::Error for ConfigSchemaError {}

impl From<ConfigSchemaError> for ErrorEnvelope {
    fn from(error: ConfigSchemaError) -> Self {
        let code = error.error_code();
        let message = error.to_string();
        let envelope = Self::expected(code, message);

        match error {
            ConfigSchemaError::EmptyValue { field } => envelope.with_metadata("field", field),
            ConfigSchemaError::InvalidName { field, value }
            | ConfigSchemaError::InvalidQuantity { field, value } => envelope
                .with_metadata("field", field)
                .with_metadata("value", value),
            ConfigSchemaError::InvalidUrl { field, url } => {
                envelope.with_metadata("field", field).with_metadata("url", url)
            },
        }
    }
}

/// Strips credentials from a URL before it is echoed in an error.
fn sanitize_url_for_error(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            if parsed.password().is_some() || !parsed.username().is_empty() {
                if parsed.set_username("").is_err() {
                    return "[invalid url: invalid username]".to_string();
                }
                if parsed.set_password(None).is_err() {
                    return "[invalid url: invalid password]".to_string();
                }
            }
            parsed.to_string()
        },
        Err(error) => format!("[invalid url: {error}]"),
    }
}

fn validate_non_empty(field: &'static str, value: &str) -> Result<(), ConfigSchemaError> {
    if value.is_empty() {
        return Err(ConfigSchemaError::EmptyValue { field });
    }
    Ok(())
}

// RFC 1123 label: lowercase alphanumerics and '-', alphanumeric at both ends.
fn is_dns_label(value: &str) -> bool {
    let bytes = value.as_bytes();
    let (Some(first), Some(last)) = (bytes.first(), bytes.last()) else {
        return false;
    };
    value.len() <= NAME_MAX_LEN
        && first.is_ascii_alphanumeric()
        && last.is_ascii_alphanumeric()
        && bytes
            .iter()
            .all(|byte| byte.is_ascii_lowercase() || byte.is_ascii_digit() || *byte == b'-')
}

fn validate_dns_label(field: &'static str, value: &str) -> Result<(), ConfigSchemaError> {
    validate_non_empty(field, value)?;
    if is_dns_label(value) {
        Ok(())
    } else {
        Err(ConfigSchemaError::InvalidName {
            field,
            value: value.to_string(),
        })
    }
}

fn validate_dns_subdomain(field: &'static str, value: &str) -> Result<(), ConfigSchemaError> {
    validate_non_empty(field, value)?;
    if value.len() <= 253 && value.split('.').all(is_dns_label) {
        Ok(())
    } else {
        Err(ConfigSchemaError::InvalidName {
            field,
            value: value.to_string(),
        })
    }
}

fn validate_quantity(field: &'static str, value: &str) -> Result<(), ConfigSchemaError> {
    validate_non_empty(field, value)?;
    let digits_end = value
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, suffix) = value.split_at(digits_end);
    let positive = digits.parse::<u64>().is_ok_and(|amount| amount > 0);
    if positive && QUANTITY_SUFFIXES.contains(&suffix) {
        Ok(())
    } else {
        Err(ConfigSchemaError::InvalidQuantity {
            field,
            value: value.to_string(),
        })
    }
}

fn validate_http_url(field: &'static str, value: &str) -> Result<(), ConfigSchemaError> {
    let invalid = || ConfigSchemaError::InvalidUrl {
        field,
        url: sanitize_url_for_error(value),
    };
    let parsed = Url::parse(value).map_err(|_| invalid())?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(invalid());
    }
    Ok(())
}
