//! # servarr-domain
//!
//! Domain model for the media stack:
//!
//! - **App** - `ServarrApp`, the closed set of managed applications
//! - **Image** - `ImageRef` parsed from `repository:tag`
//! - **Template** - order-preserving `AppConfigTemplate` with typed views
//! - **Credentials** - `CredentialMap` of per-app API keys
//! - **Inject** - `inject_credentials` and the cross-link routing table
//!
//! ## Dependency Rules
//!
//! - Depends only on `shared` crate
//! - Pure data transformation with no I/O

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub use servarr_shared::shared_crate_version;

pub mod app;
pub mod credentials;
pub mod image;
pub mod inject;
pub mod template;

pub use app::{ServarrApp, UnknownAppError};
pub use credentials::CredentialMap;
pub use image::{ImageRef, ImageRefError};
pub use inject::{
    CROSS_LINK_APP, CROSS_LINK_ROUTES, CredentialRoute, InjectError, InjectionReport,
    inject_credentials, inject_credentials_with_report, route_for,
};
pub use template::{API_KEY_FIELD, AppConfigTemplate, ApplicationEntry, FieldEntry};

/// Returns the domain crate version.
#[must_use]
pub const fn domain_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
