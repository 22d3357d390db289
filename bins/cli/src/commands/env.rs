//! Env command handler.

use crate::error::{CliError, ExitCode};
use crate::format::OutputMode;
use crate::{CliOutput, format_error_output, format_ndjson_summary};
use servarr_config::{DeploymentEnv, EnvVarStatus, collect_std_env};
use servarr_shared::ErrorEnvelope;
use std::collections::BTreeMap;

/// Run `env check` against the process environment.
pub fn run_env_check(mode: OutputMode) -> Result<CliOutput, CliError> {
    env_check_with_map(mode, &collect_std_env())
}

fn env_check_with_map(
    mode: OutputMode,
    map: &BTreeMap<String, String>,
) -> Result<CliOutput, CliError> {
    let env = match DeploymentEnv::from_map(map) {
        Ok(env) => env,
        Err(error) => return Ok(format_error_output(mode, &ErrorEnvelope::from(error))),
    };
    let statuses = DeploymentEnv::describe(map);
    let missing = env.missing_required();
    let exit_code = match env.require() {
        Ok(_) => ExitCode::Ok,
        Err(error) => ExitCode::for_envelope(&error),
    };
    let status = if missing.is_empty() { "ok" } else { "error" };

    let stdout = if mode.is_ndjson() {
        let mut out = String::new();
        for variable in &statuses {
            let line = serde_json::json!({ "type": "variable", "variable": variable });
            out.push_str(&serde_json::to_string(&line)?);
            out.push('\n');
        }
        out.push_str(&format_ndjson_summary(
            status,
            "env",
            Some(serde_json::json!({ "missing": missing })),
        ));
        out
    } else if mode.is_json() || mode.is_yaml() {
        let payload = serde_json::json!({
            "status": status,
            "variables": statuses,
            "missing": missing,
        });
        let mut output = serde_json::to_string_pretty(&payload)?;
        output.push('\n');
        output
    } else {
        format_env_text(status, &statuses, &missing)
    };

    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code,
    })
}

fn format_env_text(status: &str, statuses: &[EnvVarStatus], missing: &[&str]) -> String {
    let mut out = String::new();
    out.push_str("status: ");
    out.push_str(status);
    out.push('\n');
    out.push_str("variables:\n");
    for variable in statuses {
        out.push_str("  ");
        out.push_str(variable.name);
        match &variable.value {
            Some(value) => {
                out.push_str(" = ");
                out.push_str(value);
            },
            None => out.push_str(" (unset)"),
        }
        out.push('\n');
    }
    if !missing.is_empty() {
        out.push_str("missing: ");
        out.push_str(&missing.join(", "));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::OutputFormat;
    use std::error::Error;

    fn json_mode() -> OutputMode {
        OutputMode {
            format: OutputFormat::Json,
            no_progress: true,
            agent: false,
        }
    }

    #[test]
    fn empty_env_reports_every_required_variable() -> Result<(), Box<dyn Error>> {
        let output = env_check_with_map(json_mode(), &BTreeMap::new())?;
        let value: serde_json::Value = serde_json::from_str(&output.stdout)?;

        assert_eq!(output.exit_code, ExitCode::InvalidInput);
        assert_eq!(value["status"], "error");
        let missing = value["missing"].as_array().ok_or("missing array")?;
        assert!(missing.contains(&serde_json::json!("SONARR_APIKEY")));
        assert!(missing.contains(&serde_json::json!("POSTGRES_PASSWORD")));
        assert!(!missing.contains(&serde_json::json!("POSTGRES_USER")));
        Ok(())
    }

    #[test]
    fn secret_values_are_never_printed() -> Result<(), Box<dyn Error>> {
        let mut map = BTreeMap::new();
        map.insert("SONARR_APIKEY".to_string(), "super-secret".to_string());
        map.insert("POSTGRES_HOST".to_string(), "db.lan".to_string());

        let output = env_check_with_map(json_mode(), &map)?;
        assert!(!output.stdout.contains("super-secret"));
        assert!(output.stdout.contains("db.lan"));
        Ok(())
    }

    #[test]
    fn invalid_port_is_a_structured_error() -> Result<(), Box<dyn Error>> {
        let mut map = BTreeMap::new();
        map.insert("POSTGRES_PORT".to_string(), "not-a-port".to_string());

        let output = env_check_with_map(json_mode(), &map)?;
        let value: serde_json::Value = serde_json::from_str(&output.stdout)?;
        assert_eq!(value["error"]["code"], "ERR_CONFIG_INVALID_ENV_INT");
        assert_eq!(output.exit_code, ExitCode::InvalidInput);
        Ok(())
    }
}
