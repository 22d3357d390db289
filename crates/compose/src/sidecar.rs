//! Metrics exporter sidecar.

use crate::catalog::{AppProfile, EXPORTER_NAME};
use crate::plan::EnvVar;
use serde::Serialize;

/// `exportarr` container injected next to each app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExporterSidecar {
    /// Container name.
    pub name: String,
    /// Image as `repository:tag`.
    pub image: String,
    /// Exporter arguments (the app slug).
    pub args: Vec<String>,
    /// `PORT`, `URL`, `APIKEY`.
    pub env: Vec<EnvVar>,
    /// Metrics port.
    pub ports: Vec<ContainerPort>,
    /// Fixed requests and limits.
    pub resources: ResourceRequirements,
}

/// Named container port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPort {
    /// Port number.
    pub container_port: u16,
    /// Port name.
    pub name: String,
}

/// CPU and memory amounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceList {
    /// CPU quantity.
    pub cpu: String,
    /// Memory quantity.
    pub memory: String,
}

/// Requests and limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceRequirements {
    /// Guaranteed resources.
    pub requests: ResourceList,
    /// Hard limits.
    pub limits: ResourceList,
}

impl ResourceRequirements {
    /// Footprint of the exporter: 10m/32Mi requested, 100m/128Mi limit.
    #[must_use]
    pub fn exporter() -> Self {
        Self {
            requests: ResourceList {
                cpu: "10m".to_string(),
                memory: "32Mi".to_string(),
            },
            limits: ResourceList {
                cpu: "100m".to_string(),
                memory: "128Mi".to_string(),
            },
        }
    }
}

/// Exporter scraping `profile`'s app on localhost with `api_key`.
#[must_use]
pub fn exporter_sidecar(image: &str, profile: &AppProfile, api_key: &str) -> ExporterSidecar {
    ExporterSidecar {
        name: EXPORTER_NAME.to_string(),
        image: image.to_string(),
        args: vec![profile.app.as_str().to_string()],
        env: vec![
            EnvVar::new("PORT", profile.metrics_port.to_string()),
            EnvVar::new("URL", format!("http://localhost:{}", profile.port)),
            EnvVar::new("APIKEY", api_key),
        ],
        ports: vec![ContainerPort {
            container_port: profile.metrics_port,
            name: "metrics".to_string(),
        }],
        resources: ResourceRequirements::exporter(),
    }
}
