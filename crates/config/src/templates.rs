//! Application template loading.
//!
//! Templates live at `<dir>/<app>.json`. The application name is resolved
//! through [`ServarrApp`] first, so a caller-supplied name can never point
//! outside the templates directory.

use servarr_domain::{AppConfigTemplate, ServarrApp};
use servarr_shared::{ErrorCode, ErrorEnvelope};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extension of template files.
pub const TEMPLATE_EXTENSION: &str = "json";

/// Path of the template for an application.
#[must_use]
pub fn template_path(dir: &Path, app: ServarrApp) -> PathBuf {
    dir.join(format!("{}.{TEMPLATE_EXTENSION}", app.as_str()))
}

/// Read and parse the template for an application.
///
/// Fails with `config:template_not_found` when the file is missing and
/// `config:template_invalid_json` when it does not parse.
pub fn load_template(dir: &Path, app: ServarrApp) -> Result<AppConfigTemplate, ErrorEnvelope> {
    let path = template_path(dir, app);
    let contents = std::fs::read_to_string(&path).map_err(|error| {
        let code = match error.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::new("config", "template_not_found"),
            _ => ErrorCode::new("config", "template_io"),
        };
        ErrorEnvelope::expected(code, format!("failed to read {app} template: {error}"))
            .with_metadata("app", app.as_str())
            .with_metadata("path", path.to_string_lossy().to_string())
    })?;

    let template = AppConfigTemplate::from_json_str(&contents).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "template_invalid_json"),
            format!("invalid {app} template: {error}"),
        )
        .with_metadata("app", app.as_str())
        .with_metadata("path", path.to_string_lossy().to_string())
        .with_metadata("line", error.line().to_string())
        .with_metadata("column", error.column().to_string())
    })?;

    debug!(
        app = app.as_str(),
        path = %path.display(),
        bytes = contents.len(),
        "loaded template"
    );
    Ok(template)
}

/// Resolve an application by name, then load its template.
pub fn load_template_by_name(dir: &Path, name: &str) -> Result<AppConfigTemplate, ErrorEnvelope> {
    let app: ServarrApp = name.parse().map_err(ErrorEnvelope::from)?;
    load_template(dir, app)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir() -> Result<PathBuf, Box<dyn Error>> {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH)?.as_nanos();
        let dir = std::env::temp_dir().join(format!("servarr-templates-{nanos}"));
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    #[test]
    fn loads_template_by_app_slug() -> Result<(), Box<dyn Error>> {
        let dir = temp_dir()?;
        std::fs::write(
            dir.join("sonarr.json"),
            r#"{"apiKey":"PLACEHOLDER","rootFolders":[{"path":"/tv"}]}"#,
        )?;

        let template = load_template(&dir, ServarrApp::Sonarr)?;
        assert_eq!(template.api_key(), Some("PLACEHOLDER"));
        assert!(template.as_map().contains_key("rootFolders"));
        Ok(())
    }

    #[test]
    fn missing_template_is_not_found() -> Result<(), Box<dyn Error>> {
        let dir = temp_dir()?;
        let error = load_template(&dir, ServarrApp::Radarr)
            .err()
            .ok_or("expected error")?;

        assert_eq!(error.code, ErrorCode::new("config", "template_not_found"));
        assert_eq!(error.metadata.get("app").map(String::as_str), Some("radarr"));
        Ok(())
    }

    #[test]
    fn malformed_json_is_a_parse_error_with_position() -> Result<(), Box<dyn Error>> {
        let dir = temp_dir()?;
        std::fs::write(dir.join("prowlarr.json"), "{\n  \"apiKey\": \"x\",\n  oops\n}")?;

        let error = load_template(&dir, ServarrApp::Prowlarr)
            .err()
            .ok_or("expected error")?;

        assert_eq!(error.code, ErrorCode::new("config", "template_invalid_json"));
        assert_eq!(error.metadata.get("line").map(String::as_str), Some("3"));
        Ok(())
    }

    #[test]
    fn non_object_document_is_a_parse_error() -> Result<(), Box<dyn Error>> {
        let dir = temp_dir()?;
        std::fs::write(dir.join("prowlarr.json"), r#"[{"applications":[]}]"#)?;

        let error = load_template(&dir, ServarrApp::Prowlarr).err();
        assert_eq!(
            error.map(|error| error.code),
            Some(ErrorCode::new("config", "template_invalid_json"))
        );
        Ok(())
    }

    #[test]
    fn unknown_names_never_touch_the_filesystem() -> Result<(), Box<dyn Error>> {
        let dir = temp_dir()?;
        let error = load_template_by_name(&dir, "../../etc/passwd").err();
        assert_eq!(
            error.map(|error| error.code),
            Some(ErrorCode::new("config", "unknown_app"))
        );

        std::fs::write(dir.join("radarr.json"), "{}")?;
        assert!(load_template_by_name(&dir, "Radarr").is_ok());
        Ok(())
    }
}
