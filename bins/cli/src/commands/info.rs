//! Info command handler.

use crate::error::{CliError, ExitCode};
use crate::format::OutputMode;
use crate::{CliOutput, format_ndjson_summary};
use servarr_compose::{PREPARR_APPS, compose_crate_version};
use servarr_config::config_crate_version;
use servarr_domain::{CROSS_LINK_APP, CROSS_LINK_ROUTES, domain_crate_version};

/// Run the info command.
pub fn run_info(mode: OutputMode) -> Result<CliOutput, CliError> {
    let stdout = if mode.is_ndjson() {
        format_ndjson_summary("ok", "info", Some(info_json()))
    } else if mode.is_json() || mode.is_yaml() {
        let mut payload = info_json();
        if let Some(map) = payload.as_object_mut() {
            map.insert("status".to_string(), serde_json::json!("ok"));
        }
        let mut output = serde_json::to_string_pretty(&payload)?;
        output.push('\n');
        output
    } else {
        format_info_text()
    };

    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: ExitCode::Ok,
    })
}

fn format_info_text() -> String {
    let apps: Vec<&str> = PREPARR_APPS.iter().map(|profile| profile.app.as_str()).collect();
    let routes: Vec<String> = CROSS_LINK_ROUTES
        .iter()
        .map(|route| format!("{} <- {}", route.entry_name, route.source))
        .collect();
    format!(
        "status: ok\nname: {}\nversion: {}\ndomain: {}\nconfig: {}\ncompose: {}\napps: {}\ncrossLink: {} [{}]\n",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        domain_crate_version(),
        config_crate_version(),
        compose_crate_version(),
        apps.join(", "),
        CROSS_LINK_APP,
        routes.join(", "),
    )
}

fn info_json() -> serde_json::Value {
    let routes: Vec<serde_json::Value> = CROSS_LINK_ROUTES
        .iter()
        .map(|route| {
            serde_json::json!({
                "entry": route.entry_name,
                "source": route.source.as_str(),
            })
        })
        .collect();
    serde_json::json!({
        "build": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "domainVersion": domain_crate_version(),
            "configVersion": config_crate_version(),
            "composeVersion": compose_crate_version(),
        },
        "apps": PREPARR_APPS.iter().map(|profile| profile.app.as_str()).collect::<Vec<_>>(),
        "crossLink": {
            "app": CROSS_LINK_APP.as_str(),
            "routes": routes,
        },
    })
}
