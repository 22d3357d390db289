//! Render command handler.

use crate::error::{CliError, ExitCode};
use crate::format::{OutputFormat, OutputMode};
use crate::{CliOutput, format_error_output, format_ndjson_summary, log_info};
use servarr_compose::{DeploymentPlan, SecretPolicy, compose_plan};
use servarr_config::load_deployment_settings_std_env;
use std::path::Path;
use tracing::info;

/// Inputs for `servarr render`.
#[derive(Debug, Clone, Copy)]
pub struct RenderInput<'a> {
    /// Optional settings file.
    pub config_path: Option<&'a Path>,
    /// Destination file; stdout when absent.
    pub out: Option<&'a Path>,
    /// Write real secret values.
    pub reveal_secrets: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    fn for_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|value| value.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("yaml" | "yml") => Self::Yaml,
            _ => Self::Json,
        }
    }
}

/// Run the render command.
pub fn run_render(mode: OutputMode, input: &RenderInput<'_>) -> Result<CliOutput, CliError> {
    let settings = match load_deployment_settings_std_env(input.config_path) {
        Ok(settings) => settings,
        Err(error) => return Ok(format_error_output(mode, &error)),
    };

    let policy = if input.reveal_secrets {
        SecretPolicy::Reveal
    } else {
        SecretPolicy::Redact
    };
    let plan = match compose_plan(&settings, policy) {
        Ok(plan) => plan,
        Err(error) => return Ok(format_error_output(mode, &error)),
    };

    let mut stderr = String::new();
    let stdout = if let Some(path) = input.out {
        let document = render_document(&plan, DocumentFormat::for_path(path))?;
        std::fs::write(path, document)?;
        info!(path = %path.display(), "wrote deployment plan");
        log_info(&mut stderr, "plan written", mode.no_progress);
        format_written_summary(mode, &plan, path)?
    } else {
        match mode.format {
            OutputFormat::Json => render_document(&plan, DocumentFormat::Json)?,
            OutputFormat::Yaml => render_document(&plan, DocumentFormat::Yaml)?,
            OutputFormat::Ndjson => format_plan_ndjson(&plan)?,
            OutputFormat::Text => format_plan_text(&plan),
        }
    };

    Ok(CliOutput {
        stdout,
        stderr,
        exit_code: ExitCode::Ok,
    })
}

fn render_document(plan: &DeploymentPlan, format: DocumentFormat) -> Result<String, CliError> {
    match format {
        DocumentFormat::Json => {
            let mut output = serde_json::to_string_pretty(plan)?;
            output.push('\n');
            Ok(output)
        },
        DocumentFormat::Yaml => Ok(serde_yaml_ng::to_string(plan)?),
    }
}

fn format_written_summary(
    mode: OutputMode,
    plan: &DeploymentPlan,
    path: &Path,
) -> Result<String, CliError> {
    let resources = plan.resources().len();
    let path = path.to_string_lossy().to_string();
    if mode.is_ndjson() {
        return Ok(format_ndjson_summary(
            "ok",
            "render",
            Some(serde_json::json!({ "out": path, "resources": resources })),
        ));
    }
    if mode.is_json() || mode.is_yaml() {
        let payload = serde_json::json!({
            "status": "ok",
            "out": path,
            "namespace": plan.namespace.name,
            "resources": resources,
        });
        let mut output = serde_json::to_string_pretty(&payload)?;
        output.push('\n');
        return Ok(output);
    }
    Ok(format!(
        "status: ok\nout: {path}\nnamespace: {}\nresources: {resources}\n",
        plan.namespace.name
    ))
}

fn format_plan_text(plan: &DeploymentPlan) -> String {
    let mut out = String::new();
    out.push_str("status: ok\n");
    out.push_str("namespace: ");
    out.push_str(&plan.namespace.name);
    out.push('\n');
    out.push_str("chart: ");
    out.push_str(&plan.chart.chart);
    out.push('@');
    out.push_str(&plan.chart.version);
    out.push('\n');
    out.push_str("resources:\n");
    for (resource, depends_on) in plan.resources() {
        out.push_str("  ");
        out.push_str(&resource.to_string());
        if !depends_on.is_empty() {
            let deps: Vec<String> = depends_on.iter().map(ToString::to_string).collect();
            out.push_str(" <- ");
            out.push_str(&deps.join(", "));
        }
        out.push('\n');
    }
    out
}

fn format_plan_ndjson(plan: &DeploymentPlan) -> Result<String, CliError> {
    let mut out = String::new();
    let resources = plan.resources();
    for (resource, depends_on) in &resources {
        let line = serde_json::json!({
            "type": "resource",
            "resource": resource.to_string(),
            "dependsOn": depends_on.iter().map(ToString::to_string).collect::<Vec<_>>(),
        });
        out.push_str(&serde_json::to_string(&line)?);
        out.push('\n');
    }
    out.push_str(&format_ndjson_summary(
        "ok",
        "render",
        Some(serde_json::json!({ "resources": resources.len() })),
    ));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_extensions_select_yaml() {
        assert_eq!(
            DocumentFormat::for_path(Path::new("plan.YML")),
            DocumentFormat::Yaml
        );
        assert_eq!(
            DocumentFormat::for_path(Path::new("plan.yaml")),
            DocumentFormat::Yaml
        );
        assert_eq!(
            DocumentFormat::for_path(Path::new("plan.json")),
            DocumentFormat::Json
        );
        assert_eq!(
            DocumentFormat::for_path(Path::new("plan")),
            DocumentFormat::Json
        );
    }
}
