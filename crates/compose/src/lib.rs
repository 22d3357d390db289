//! # servarr-compose
//!
//! Builds the deployment plan: namespace, media storage, databases, the
//! Preparr chart release with its values, and Jellyseerr.
//! This crate depends on `config`, `domain`, and `shared`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

/// App ports, images, and storage mounts.
pub mod catalog;
/// Plan composition.
pub mod compose;
/// Plan resource types.
pub mod plan;
/// Secret exposure policy.
pub mod secrets;
/// Metrics exporter sidecar.
pub mod sidecar;
/// Preparr chart values.
pub mod values;

pub use catalog::{AppProfile, PREPARR_APPS, profile, template_apps};
pub use compose::{
    DirTemplateSource, StaticTemplateSource, TemplateSource, compose_plan, compose_plan_with,
    plan_databases,
};
pub use plan::{DeploymentPlan, ResourceKind, ResourceRef};
pub use secrets::SecretPolicy;
pub use sidecar::{ExporterSidecar, exporter_sidecar};
pub use values::{AppConfigValues, AppValues, PreparrValues};

/// Returns the compose crate version.
#[must_use]
pub const fn compose_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
