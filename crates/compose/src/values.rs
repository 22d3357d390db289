//! Values handed to the Preparr Helm chart.

use crate::catalog::{AppProfile, MEDIA_CLAIM, QBITTORRENT_TORRENT_PORT};
use crate::sidecar::ExporterSidecar;
use serde::Serialize;
use servarr_domain::{AppConfigTemplate, ImageRef, ServarrApp};
use std::collections::BTreeMap;

/// Service type used for every chart-managed app.
pub const SERVICE_TYPE: &str = "LoadBalancer";
/// Ingress path.
pub const INGRESS_PATH: &str = "/";
/// Ingress path match type.
pub const INGRESS_PATH_TYPE: &str = "Prefix";
/// Path scraped by Prometheus.
pub const METRICS_PATH: &str = "/metrics";

/// Top-level chart values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreparrValues {
    /// Shared settings.
    pub global: GlobalValues,
    /// Preparr sidecar image.
    pub preparr: PreparrImageValues,
    /// External Postgres connection.
    pub postgresql: PostgresqlValues,
    /// qBittorrent.
    pub qbittorrent: AppValues,
    /// Prowlarr.
    pub prowlarr: AppValues,
    /// Sonarr.
    pub sonarr: AppValues,
    /// Radarr.
    pub radarr: AppValues,
    /// Lidarr, always disabled.
    pub lidarr: DisabledApp,
}

impl PreparrValues {
    /// Values block of a chart-managed app.
    #[must_use]
    pub fn app(&self, app: ServarrApp) -> Option<&AppValues> {
        match app {
            ServarrApp::Qbittorrent => Some(&self.qbittorrent),
            ServarrApp::Prowlarr => Some(&self.prowlarr),
            ServarrApp::Sonarr => Some(&self.sonarr),
            ServarrApp::Radarr => Some(&self.radarr),
            ServarrApp::Lidarr | ServarrApp::Jellyseerr => None,
        }
    }
}

/// `global` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlobalValues {
    /// Namespace.
    pub namespace: String,
    /// Timezone.
    pub timezone: String,
}

/// `preparr` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreparrImageValues {
    /// Always true.
    pub enabled: bool,
    /// Image.
    pub image: ImageRef,
}

/// `postgresql` block. The chart's bundled Postgres stays disabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostgresqlValues {
    /// Always false.
    pub enabled: bool,
    /// External host.
    pub external_host: String,
    /// Login.
    pub auth: PostgresAuth,
    /// Port.
    pub service: PortValue,
}

/// Postgres login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostgresAuth {
    /// User.
    pub username: String,
    /// Password.
    pub password: String,
    /// Database.
    pub database: String,
}

/// `{ port }` wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PortValue {
    /// Port number.
    pub port: u16,
}

/// Per-app block for an enabled app.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppValues {
    /// Always true.
    pub enabled: bool,
    /// Image.
    pub image: ImageRef,
    /// Service.
    pub service: ServiceValues,
    /// Ingress.
    pub ingress: IngressValues,
    /// Media mounts keyed by mount name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub storage: BTreeMap<String, StorageValues>,
    /// Bootstrap config.
    pub config: AppConfigValues,
    /// Admin password for template-configured apps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_password: Option<String>,
    /// Sidecars.
    pub extra_containers: Vec<ExporterSidecar>,
}

/// Bootstrap config of an app.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AppConfigValues {
    /// Injected template.
    Template(AppConfigTemplate),
    /// Web UI login.
    Credentials {
        /// User.
        username: String,
        /// Password.
        password: String,
    },
}

/// Service block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceValues {
    /// Service type.
    #[serde(rename = "type")]
    pub service_type: String,
    /// HTTP port (single-port apps).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Web UI port (qBittorrent).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webui: Option<PortValue>,
    /// Peer port (qBittorrent).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bittorrent: Option<PortValue>,
    /// Prometheus scrape annotations.
    pub annotations: BTreeMap<String, String>,
}

impl ServiceValues {
    /// Service for `profile`, annotated for scraping its exporter.
    #[must_use]
    pub fn for_profile(profile: &AppProfile) -> Self {
        let (port, webui, bittorrent) = match profile.app {
            ServarrApp::Qbittorrent => (
                None,
                Some(PortValue { port: profile.port }),
                Some(PortValue {
                    port: QBITTORRENT_TORRENT_PORT,
                }),
            ),
            _ => (Some(profile.port), None, None),
        };
        Self {
            service_type: SERVICE_TYPE.to_string(),
            port,
            webui,
            bittorrent,
            annotations: prometheus_annotations(profile.metrics_port),
        }
    }
}

/// Ingress block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressValues {
    /// Always true.
    pub enabled: bool,
    /// Ingress class.
    pub class_name: String,
    /// Hosts.
    pub hosts: Vec<IngressHost>,
}

impl IngressValues {
    /// Single-host ingress routing `/` to the app.
    pub fn single_host(class_name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            enabled: true,
            class_name: class_name.into(),
            hosts: vec![IngressHost {
                host: host.into(),
                paths: vec![IngressPath {
                    path: INGRESS_PATH.to_string(),
                    path_type: INGRESS_PATH_TYPE.to_string(),
                }],
            }],
        }
    }
}

/// Ingress host rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngressHost {
    /// Host.
    pub host: String,
    /// Paths.
    pub paths: Vec<IngressPath>,
}

/// Ingress path rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressPath {
    /// Path.
    pub path: String,
    /// Match type.
    pub path_type: String,
}

/// Mount of the shared media claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageValues {
    /// Always true.
    pub enabled: bool,
    /// Claim name.
    pub existing_claim: String,
    /// Subpath inside the claim.
    pub sub_path: String,
}

impl StorageValues {
    /// Mount of `sub_path` in the media claim.
    pub fn media(sub_path: impl Into<String>) -> Self {
        Self {
            enabled: true,
            existing_claim: MEDIA_CLAIM.to_string(),
            sub_path: sub_path.into(),
        }
    }
}

/// `{ enabled: false }`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DisabledApp {
    /// Always false.
    pub enabled: bool,
}

/// `prometheus.io/*` annotations pointing at `metrics_port`.
#[must_use]
pub fn prometheus_annotations(metrics_port: u16) -> BTreeMap<String, String> {
    let mut annotations = BTreeMap::new();
    annotations.insert("prometheus.io/scrape".to_string(), "true".to_string());
    annotations.insert("prometheus.io/port".to_string(), metrics_port.to_string());
    annotations.insert("prometheus.io/path".to_string(), METRICS_PATH.to_string());
    annotations
}
