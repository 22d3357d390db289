//! Template command handler.

use crate::error::{CliError, ExitCode};
use crate::format::OutputMode;
use crate::{CliOutput, format_error_output, format_ndjson_summary};
use servarr_compose::SecretPolicy;
use servarr_config::{DeploymentEnv, api_key_var, load_deployment_config_from_path, load_template};
use servarr_domain::{AppConfigTemplate, InjectionReport, ServarrApp, inject_credentials_with_report};
use servarr_shared::{ErrorCode, ErrorEnvelope, SecretString};
use std::path::Path;

/// Inputs for `servarr template show`.
#[derive(Debug, Clone, Copy)]
pub struct TemplateShowInput<'a> {
    /// Optional settings file (for the templates directory).
    pub config_path: Option<&'a Path>,
    /// Application name.
    pub app: &'a str,
    /// Inject keys from the environment.
    pub inject: bool,
    /// Write real keys.
    pub reveal_secrets: bool,
}

struct ShownTemplate {
    app: ServarrApp,
    template: AppConfigTemplate,
    report: Option<InjectionReport>,
}

/// Run `template show`.
pub fn run_template_show(
    mode: OutputMode,
    input: &TemplateShowInput<'_>,
) -> Result<CliOutput, CliError> {
    match show_template(input) {
        Ok(shown) => format_template_output(mode, &shown),
        Err(error) => Ok(format_error_output(mode, &error)),
    }
}

fn show_template(input: &TemplateShowInput<'_>) -> Result<ShownTemplate, ErrorEnvelope> {
    let env = DeploymentEnv::from_std_env()?;
    let config = load_deployment_config_from_path(input.config_path, &env)?;
    let app: ServarrApp = input.app.parse()?;
    let template = load_template(&config.templates_dir, app)?;

    if !input.inject {
        return Ok(ShownTemplate {
            app,
            template,
            report: None,
        });
    }

    let required = env.require()?;
    let policy = if input.reveal_secrets {
        SecretPolicy::Reveal
    } else {
        SecretPolicy::Redact
    };
    let credentials = policy.credentials(&required.api_keys);
    let own_key = credentials.get(app).map(SecretString::expose).ok_or_else(|| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "missing_credential"),
            format!("{app} has no API key to inject"),
        )
        .with_metadata("app", app.as_str())
        .with_metadata("env_vars", api_key_var(app))
    })?;

    let (template, report) = inject_credentials_with_report(template, app, own_key, &credentials)?;
    Ok(ShownTemplate {
        app,
        template,
        report: Some(report),
    })
}

fn format_template_output(mode: OutputMode, shown: &ShownTemplate) -> Result<CliOutput, CliError> {
    let stdout = if mode.is_ndjson() {
        format_ndjson_summary(
            "ok",
            "template",
            Some(serde_json::json!({
                "app": shown.app.as_str(),
                "template": shown.template,
                "injection": shown.report,
            })),
        )
    } else if mode.is_json() {
        let payload = serde_json::json!({
            "status": "ok",
            "app": shown.app.as_str(),
            "template": shown.template,
            "injection": shown.report,
        });
        let mut output = serde_json::to_string_pretty(&payload)?;
        output.push('\n');
        output
    } else if mode.is_yaml() {
        serde_yaml_ng::to_string(&shown.template)?
    } else {
        let mut output = serde_json::to_string_pretty(&shown.template)?;
        output.push('\n');
        output
    };

    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: ExitCode::Ok,
    })
}
