//! Deployment plan: the typed description of every resource in the stack.
//!
//! The plan is engine-neutral. Each resource carries its own name and the
//! resources it must wait for, so a deployer can order creation without
//! knowing anything about the apps.

use crate::values::PreparrValues;
use serde::Serialize;
use servarr_domain::ImageRef;
use std::collections::BTreeMap;
use std::fmt;

/// Kind of a planned resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ResourceKind {
    /// Kubernetes namespace.
    Namespace,
    /// Cluster-scoped NFS volume.
    PersistentVolume,
    /// Claim bound to the volume.
    PersistentVolumeClaim,
    /// Postgres connection used to create databases.
    PostgresProvider,
    /// Postgres database.
    Database,
    /// Helm release.
    HelmRelease,
    /// Deployment plus service.
    App,
    /// HTTP ingress.
    Ingress,
}

impl ResourceKind {
    /// Stable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Namespace => "Namespace",
            Self::PersistentVolume => "PersistentVolume",
            Self::PersistentVolumeClaim => "PersistentVolumeClaim",
            Self::PostgresProvider => "PostgresProvider",
            Self::Database => "Database",
            Self::HelmRelease => "HelmRelease",
            Self::App => "App",
            Self::Ingress => "Ingress",
        }
    }
}

/// Reference to a planned resource, used for dependency edges.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ResourceRef {
    /// Resource kind.
    pub kind: ResourceKind,
    /// Resource name.
    pub name: String,
}

impl ResourceRef {
    /// Build a reference.
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}/{}", self.kind.as_str(), self.name)
    }
}

/// Plain `name=value` environment variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvVar {
    /// Variable name.
    pub name: String,
    /// Variable value.
    pub value: String,
}

impl EnvVar {
    /// Build a variable.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Namespace holding the stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamespaceResource {
    /// Namespace name.
    pub name: String,
}

/// NFS export details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NfsVolume {
    /// Server host.
    pub server: String,
    /// Export path.
    pub path: String,
}

/// Media volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistentVolumeResource {
    /// Volume name.
    pub name: String,
    /// Capacity quantity.
    pub capacity: String,
    /// Access modes.
    pub access_modes: Vec<String>,
    /// Reclaim policy.
    pub reclaim_policy: String,
    /// Storage class.
    pub storage_class_name: String,
    /// NFS source.
    pub nfs: NfsVolume,
}

/// Claim bound to the media volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistentVolumeClaimResource {
    /// Claim name.
    pub name: String,
    /// Namespace.
    pub namespace: String,
    /// Access modes.
    pub access_modes: Vec<String>,
    /// Storage class.
    pub storage_class_name: String,
    /// Requested storage.
    pub storage_request: String,
    /// Bound volume.
    pub volume_name: String,
    /// Creation prerequisites.
    pub depends_on: Vec<ResourceRef>,
}

/// Connection used to manage databases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostgresProvider {
    /// Provider name.
    pub name: String,
    /// Host.
    pub host: String,
    /// Port.
    pub port: u16,
    /// Login user.
    pub username: String,
    /// Password (redacted unless revealed).
    pub password: String,
    /// SSL mode.
    pub sslmode: String,
}

/// Database created through the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseResource {
    /// Resource name (`<db>-database`).
    pub resource_name: String,
    /// Database name.
    pub name: String,
    /// Owner role.
    pub owner: String,
    /// Provider that creates it.
    pub provider: String,
}

/// Helm release of the Preparr chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelmRelease {
    /// Release name.
    pub name: String,
    /// Chart name.
    pub chart: String,
    /// Chart version.
    pub version: String,
    /// Chart repository.
    pub repo: String,
    /// Target namespace.
    pub namespace: String,
    /// Chart values.
    pub values: PreparrValues,
    /// Creation prerequisites.
    pub depends_on: Vec<ResourceRef>,
}

/// Cluster service in front of an app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceResource {
    /// Service name.
    pub name: String,
    /// Service port.
    pub port: u16,
    /// Container port.
    pub target_port: u16,
}

/// Service backing an ingress path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressBackend {
    /// Service name.
    pub service_name: String,
    /// Service port.
    pub port: u16,
}

/// Single-host ingress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressResource {
    /// Ingress name.
    pub name: String,
    /// Namespace.
    pub namespace: String,
    /// Ingress class.
    pub ingress_class_name: String,
    /// Public host.
    pub host: String,
    /// Path.
    pub path: String,
    /// Path match type.
    pub path_type: String,
    /// Backend service.
    pub backend: IngressBackend,
    /// Creation prerequisites.
    pub depends_on: Vec<ResourceRef>,
}

/// App deployed outside the chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StandaloneApp {
    /// App name.
    pub name: String,
    /// Namespace.
    pub namespace: String,
    /// Container image.
    pub image: ImageRef,
    /// Container port.
    pub port: u16,
    /// Container environment.
    pub env: Vec<EnvVar>,
    /// Service.
    pub service: ServiceResource,
    /// Ingress.
    pub ingress: IngressResource,
    /// Creation prerequisites.
    pub depends_on: Vec<ResourceRef>,
}

/// Values exposed after deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanOutputs {
    /// Namespace name.
    pub namespace: String,
    /// Service names by app.
    pub services: BTreeMap<String, String>,
}

/// Every resource of the stack.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentPlan {
    /// Namespace.
    pub namespace: NamespaceResource,
    /// Media volume.
    pub media_volume: PersistentVolumeResource,
    /// Media claim.
    pub media_claim: PersistentVolumeClaimResource,
    /// Postgres provider.
    pub postgres_provider: PostgresProvider,
    /// Databases.
    pub databases: Vec<DatabaseResource>,
    /// Preparr chart release.
    pub chart: HelmRelease,
    /// Jellyseerr.
    pub jellyseerr: StandaloneApp,
    /// Outputs.
    pub outputs: PlanOutputs,
}

impl DeploymentPlan {
    /// Every resource with its prerequisites, in creation order.
    #[must_use]
    pub fn resources(&self) -> Vec<(ResourceRef, Vec<ResourceRef>)> {
        let mut resources = vec![
            (
                ResourceRef::new(ResourceKind::Namespace, &self.namespace.name),
                Vec::new(),
            ),
            (
                ResourceRef::new(ResourceKind::PersistentVolume, &self.media_volume.name),
                Vec::new(),
            ),
            (
                ResourceRef::new(ResourceKind::PersistentVolumeClaim, &self.media_claim.name),
                self.media_claim.depends_on.clone(),
            ),
            (
                ResourceRef::new(ResourceKind::PostgresProvider, &self.postgres_provider.name),
                Vec::new(),
            ),
        ];
        resources.extend(self.databases.iter().map(|database| {
            (
                ResourceRef::new(ResourceKind::Database, &database.resource_name),
                vec![ResourceRef::new(
                    ResourceKind::PostgresProvider,
                    &database.provider,
                )],
            )
        }));
        resources.push((
            ResourceRef::new(ResourceKind::HelmRelease, &self.chart.name),
            self.chart.depends_on.clone(),
        ));
        resources.push((
            ResourceRef::new(ResourceKind::App, &self.jellyseerr.name),
            self.jellyseerr.depends_on.clone(),
        ));
        resources.push((
            ResourceRef::new(ResourceKind::Ingress, &self.jellyseerr.ingress.name),
            self.jellyseerr.ingress.depends_on.clone(),
        ));
        resources
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_refs_display_as_kind_slash_name() {
        let reference = ResourceRef::new(ResourceKind::PersistentVolumeClaim, "media");
        assert_eq!(reference.to_string(), "PersistentVolumeClaim/media");
    }
}
