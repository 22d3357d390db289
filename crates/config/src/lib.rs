//! # servarr-config
//!
//! Settings schema, environment parsing, and template loading.
//! This crate depends on `domain` and `shared` only.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

/// Environment variable parsing.
pub mod env;
/// Settings loading helpers (defaults + file + env).
pub mod load;
/// Settings schema types and validation.
pub mod schema;
/// Application template loading.
pub mod templates;

pub use env::{
    ALL_ENV_VARS, DeploymentEnv, EnvParseError, EnvVarStatus, PostgresEnv, RequiredEnv,
    SettingsEnvOverrides, api_key_var, collect_std_env, image_var, password_var,
};
pub use load::{
    DeploymentSettings, NfsSource, apply_env_overrides, load_deployment_config_from_path,
    load_deployment_settings, load_deployment_settings_std_env, to_pretty_json, to_pretty_toml,
};
pub use schema::{
    ConfigSchemaError, DeploymentConfig, ValidatedDeploymentConfig, parse_deployment_config_json,
    parse_deployment_config_toml,
};
pub use templates::{load_template, load_template_by_name, template_path};

/// Returns the config crate version.
#[must_use]
pub const fn config_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use servarr_domain::domain_crate_version;
    use servarr_shared::shared_crate_version;

    #[test]
    fn config_crate_compiles() {
        assert!(!config_crate_version().is_empty());
    }

    #[test]
    fn config_can_use_domain_and_shared() {
        assert!(!domain_crate_version().is_empty());
        assert!(!shared_crate_version().is_empty());
    }
}
