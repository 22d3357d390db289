//! CLI binary entrypoint.

mod commands;
mod error;
mod format;
mod logging;

use clap::{Parser, Subcommand, ValueEnum};
use commands::{
    RenderInput, TemplateShowInput, run_config_show, run_env_check, run_info, run_render,
    run_template_show,
};
use error::{CliError, ExitCode};
use format::{OutputArgs, OutputMode};
use servarr_shared::{ErrorEnvelope, REDACTED_VALUE, is_secret_key};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Parser)]
#[command(
    name = "servarr",
    version,
    about = "Render the servarr media stack deployment plan",
    long_about = None
)]
struct Cli {
    #[command(flatten)]
    output: OutputArgs,

    /// Optional settings file (JSON/TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Do not load a `.env` file from the working directory.
    #[arg(long, global = true)]
    no_dotenv: bool,

    /// Raise log verbosity (repeat for more).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show build and version details.
    Info,
    /// Compose the full deployment plan.
    ///
    /// By default every secret in the plan is written as `[REDACTED]`,
    /// including the API keys injected into the application templates.
    /// Such a plan is for review only and is not deployable; pass
    /// `--reveal-secrets` to produce one that is.
    Render {
        /// Write the plan to this file instead of stdout (`.yaml`/`.yml` for YAML).
        #[arg(long)]
        out: Option<PathBuf>,
        /// Write real secret values instead of `[REDACTED]`. Required for a
        /// deployable plan.
        #[arg(long)]
        reveal_secrets: bool,
    },
    /// Application template commands.
    Template {
        #[command(subcommand)]
        command: TemplateCommands,
    },
    /// Environment commands.
    Env {
        #[command(subcommand)]
        command: EnvCommands,
    },
    /// Settings commands.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Debug, Subcommand)]
enum TemplateCommands {
    /// Print an application template.
    Show {
        /// Application name (e.g. `prowlarr`).
        #[arg(value_name = "APP")]
        app: String,
        /// Inject API keys from the environment first.
        #[arg(long)]
        inject: bool,
        /// Write real keys instead of placeholders (with `--inject`).
        #[arg(long, requires = "inject")]
        reveal_secrets: bool,
    },
}

#[derive(Debug, Subcommand)]
enum EnvCommands {
    /// Report which variables are set and which required ones are missing.
    Check,
}

#[derive(Debug, Subcommand)]
enum ConfigCommands {
    /// Show the effective settings after applying the file and env overrides.
    Show {
        /// Document format.
        #[arg(long, value_enum, default_value_t = ConfigFormat::Json)]
        format: ConfigFormat,
    },
}

/// Settings document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    /// Pretty JSON.
    Json,
    /// TOML.
    Toml,
}

pub(crate) struct CliOutput {
    stdout: String,
    stderr: String,
    exit_code: ExitCode,
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let mode = OutputMode::from_args(&cli.output);
    logging::init_logging(cli.verbose, mode.agent);

    if !cli.no_dotenv {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "loaded .env"),
            Err(error) if error.not_found() => {},
            Err(error) => {
                return exit_with_error(&CliError::InvalidInput(format!(
                    "failed to load .env: {error}"
                )));
            },
        }
    }

    match run(&cli, mode) {
        Ok(output) => match write_output(&output) {
            Ok(()) => std::process::ExitCode::from(output.exit_code.as_u8()),
            Err(error) => exit_with_error(&error),
        },
        Err(error) => exit_with_error(&error),
    }
}

fn exit_with_error(error: &CliError) -> std::process::ExitCode {
    let _ = writeln!(io::stderr(), "error: {error}");
    std::process::ExitCode::from(error.exit_code().as_u8())
}

fn run(cli: &Cli, mode: OutputMode) -> Result<CliOutput, CliError> {
    let config_path = cli.config.as_deref();
    match &cli.command {
        Commands::Info => run_info(mode),
        Commands::Render {
            out,
            reveal_secrets,
        } => run_render(
            mode,
            &RenderInput {
                config_path,
                out: out.as_deref(),
                reveal_secrets: *reveal_secrets,
            },
        ),
        Commands::Template { command } => match command {
            TemplateCommands::Show {
                app,
                inject,
                reveal_secrets,
            } => run_template_show(
                mode,
                &TemplateShowInput {
                    config_path,
                    app,
                    inject: *inject,
                    reveal_secrets: *reveal_secrets,
                },
            ),
        },
        Commands::Env { command } => match command {
            EnvCommands::Check => run_env_check(mode),
        },
        Commands::Config { command } => match command {
            ConfigCommands::Show { format } => run_config_show(mode, config_path, *format),
        },
    }
}

/// Render a failed operation in the requested output format.
pub(crate) fn format_error_output(mode: OutputMode, error: &ErrorEnvelope) -> CliOutput {
    let payload = error_payload(error);

    let mut stderr = String::new();
    log_info(&mut stderr, "command failed", mode.no_progress);

    let stdout = if mode.is_ndjson() {
        let line = serde_json::json!({
            "type": "error",
            "status": "error",
            "error": payload,
        });
        let mut out = serde_json::to_string(&line).unwrap_or_else(|_| {
            "{\"type\":\"error\",\"status\":\"error\",\"error\":{\"code\":\"ERR_CORE_INTERNAL\"}}"
                .to_string()
        });
        out.push('\n');
        out
    } else if mode.is_json() || mode.is_yaml() {
        let document = serde_json::json!({
            "status": "error",
            "error": payload,
        });
        // This is a CLI boundary, so JSON serialization errors are internal.
        let mut out = serde_json::to_string_pretty(&document).unwrap_or_else(|_| {
            "{\"status\":\"error\",\"error\":{\"code\":\"ERR_CORE_INTERNAL\"}}".to_string()
        });
        out.push('\n');
        out
    } else {
        format_error_text(error)
    };

    CliOutput {
        stdout,
        stderr,
        exit_code: ExitCode::for_envelope(error),
    }
}

fn error_payload(error: &ErrorEnvelope) -> serde_json::Value {
    let meta: serde_json::Map<String, serde_json::Value> = error
        .metadata
        .iter()
        .map(|(key, value)| (key.clone(), serde_json::Value::String(redact_meta(key, value))))
        .collect();
    serde_json::json!({
        "code": error.code.stable_id(),
        "message": error.message,
        "kind": error.kind.to_string(),
        "meta": meta,
    })
}

fn format_error_text(error: &ErrorEnvelope) -> String {
    let mut out = String::new();
    out.push_str("status: error\n");
    out.push_str("code: ");
    out.push_str(&error.code.stable_id());
    out.push('\n');
    out.push_str("message: ");
    out.push_str(&error.message);
    out.push('\n');
    out.push_str("kind: ");
    out.push_str(&error.kind.to_string());
    out.push('\n');

    if !error.metadata.is_empty() {
        out.push_str("meta:\n");
        for (key, value) in &error.metadata {
            out.push_str("  ");
            out.push_str(key);
            out.push_str(": ");
            out.push_str(&redact_meta(key, value));
            out.push('\n');
        }
    }

    out
}

fn redact_meta(key: &str, value: &str) -> String {
    if is_secret_key(key) {
        REDACTED_VALUE.to_string()
    } else {
        value.to_string()
    }
}

pub(crate) fn log_info(stderr: &mut String, message: &str, no_progress: bool) {
    if no_progress {
        return;
    }
    stderr.push_str("info: ");
    stderr.push_str(message);
    stderr.push('\n');
}

pub(crate) fn format_ndjson_summary(
    status: &str,
    kind: &str,
    extra: Option<serde_json::Value>,
) -> String {
    let mut payload = serde_json::Map::new();
    payload.insert(
        "type".to_string(),
        serde_json::Value::String("summary".to_string()),
    );
    payload.insert(
        "status".to_string(),
        serde_json::Value::String(status.to_string()),
    );
    payload.insert(
        "kind".to_string(),
        serde_json::Value::String(kind.to_string()),
    );
    if let Some(serde_json::Value::Object(map)) = extra {
        for (key, value) in map {
            payload.insert(key, value);
        }
    }
    let mut out = serde_json::to_string(&serde_json::Value::Object(payload)).unwrap_or_else(|_| {
        "{\"type\":\"summary\",\"status\":\"error\",\"kind\":\"internal\"}".to_string()
    });
    out.push('\n');
    out
}

fn write_output(output: &CliOutput) -> Result<(), CliError> {
    let mut stdout = io::stdout();
    stdout.write_all(output.stdout.as_bytes())?;
    stdout.flush()?;

    if !output.stderr.is_empty() {
        let mut stderr = io::stderr();
        stderr.write_all(output.stderr.as_bytes())?;
        stderr.flush()?;
    }

    Ok(())
}
