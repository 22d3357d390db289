//! Config command handler.

use crate::error::{CliError, ExitCode};
use crate::format::OutputMode;
use crate::{CliOutput, ConfigFormat, format_error_output, format_ndjson_summary, log_info};
use servarr_config::{
    DeploymentEnv, ValidatedDeploymentConfig, load_deployment_config_from_path, to_pretty_json,
    to_pretty_toml,
};
use servarr_shared::ErrorEnvelope;
use std::path::Path;

/// Run `config show`.
pub fn run_config_show(
    mode: OutputMode,
    path: Option<&Path>,
    format: ConfigFormat,
) -> Result<CliOutput, CliError> {
    let (config, document) = match effective_config(path, format) {
        Ok(loaded) => loaded,
        Err(error) => return Ok(format_error_output(mode, &error)),
    };

    let mut stderr = String::new();
    log_info(&mut stderr, "config show completed", mode.no_progress);

    let stdout = if mode.is_ndjson() {
        format_ndjson_summary(
            "ok",
            "config",
            Some(serde_json::json!({ "effectiveConfig": &*config })),
        )
    } else if mode.is_json() || mode.is_yaml() {
        let payload = serde_json::json!({
            "status": "ok",
            "configPath": path.map(|value| value.to_string_lossy().to_string()),
            "effectiveConfig": &*config,
        });
        let mut output = serde_json::to_string_pretty(&payload)?;
        output.push('\n');
        output
    } else {
        document
    };

    Ok(CliOutput {
        stdout,
        stderr,
        exit_code: ExitCode::Ok,
    })
}

fn effective_config(
    path: Option<&Path>,
    format: ConfigFormat,
) -> Result<(ValidatedDeploymentConfig, String), ErrorEnvelope> {
    let env = DeploymentEnv::from_std_env()?;
    let config = load_deployment_config_from_path(path, &env)?;
    let document = match format {
        ConfigFormat::Json => to_pretty_json(&config)?,
        ConfigFormat::Toml => to_pretty_toml(&config)?,
    };
    Ok((config, document))
}
