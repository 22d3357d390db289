//! Credential injection into application templates.
//!
//! Every template receives its own API key. The cross-linking application
//! additionally embeds the keys of downstream applications inside
//! `applications[].fields[]`; which entries get rewritten is decided by
//! [`CROSS_LINK_ROUTES`] and nothing else. Rewrites replace values in
//! place, so key order and every untouched byte of the template survive.

use crate::app::ServarrApp;
use crate::credentials::CredentialMap;
use crate::template::{
    APPLICATIONS_FIELD, AppConfigTemplate, FIELDS_FIELD, NAME_FIELD, VALUE_FIELD,
    is_api_key_field,
};
use serde::Serialize;
use serde_json::{Map, Value};
use servarr_shared::{ErrorCode, ErrorEnvelope};
use std::collections::BTreeMap;

/// Application whose template carries other applications' keys.
pub const CROSS_LINK_APP: ServarrApp = ServarrApp::Prowlarr;

/// Maps an `applications[].name` to the application whose key it receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialRoute {
    /// Entry name as written in the template (exact match).
    pub entry_name: &'static str,
    /// Application supplying the key.
    pub source: ServarrApp,
}

/// Downstream entries whose `apiKey` fields are rewritten.
///
/// Lidarr is not routed: its entries keep the template value.
pub const CROSS_LINK_ROUTES: &[CredentialRoute] = &[
    CredentialRoute {
        entry_name: "Sonarr",
        source: ServarrApp::Sonarr,
    },
    CredentialRoute {
        entry_name: "Radarr",
        source: ServarrApp::Radarr,
    },
];

/// Route for an entry name, if one exists.
#[must_use]
pub fn route_for(entry_name: &str) -> Option<&'static CredentialRoute> {
    CROSS_LINK_ROUTES
        .iter()
        .find(|route| route.entry_name == entry_name)
}

/// Injection failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InjectError {
    /// A routed entry needs a key that was not supplied.
    #[error("no API key available for {app} (required by the {entry} entry)")]
    MissingCredential {
        /// Application whose key is missing.
        app: ServarrApp,
        /// Entry name that triggered the route.
        entry: String,
    },
    /// A list walked by the cross-link pass is neither an array nor null.
    #[error("template {path} must be an array")]
    NotAnArray {
        /// Location of the offending value (`applications[0].fields`).
        path: String,
    },
}

impl From<InjectError> for ErrorEnvelope {
    fn from(error: InjectError) -> Self {
        let message = error.to_string();
        match error {
            InjectError::MissingCredential { app, entry } => {
                Self::expected(ErrorCode::new("domain", "missing_credential"), message)
                    .with_metadata("app", app.as_str())
                    .with_metadata("entry", entry)
                    .with_metadata("env_var", format!("{}_APIKEY", app.env_prefix()))
            },
            InjectError::NotAnArray { path } => {
                Self::expected(ErrorCode::new("domain", "invalid_template"), message)
                    .with_metadata("path", path)
            },
        }
    }
}

/// What an injection pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectionReport {
    /// Rewritten `apiKey` fields per source application.
    pub rewritten: BTreeMap<ServarrApp, usize>,
    /// Entry names with no route, left as written.
    pub untouched_entries: Vec<String>,
}

impl InjectionReport {
    /// Total number of rewritten fields.
    #[must_use]
    pub fn rewritten_total(&self) -> usize {
        self.rewritten.values().sum()
    }
}

/// Inject `own_key` and, for the cross-linking application, downstream keys.
pub fn inject_credentials(
    template: AppConfigTemplate,
    app: ServarrApp,
    own_key: &str,
    credentials: &CredentialMap,
) -> Result<AppConfigTemplate, InjectError> {
    inject_credentials_with_report(template, app, own_key, credentials)
        .map(|(template, _)| template)
}

/// Same as [`inject_credentials`], also describing what changed.
pub fn inject_credentials_with_report(
    mut template: AppConfigTemplate,
    app: ServarrApp,
    own_key: &str,
    credentials: &CredentialMap,
) -> Result<(AppConfigTemplate, InjectionReport), InjectError> {
    let mut report = InjectionReport::default();
    template.set_api_key(own_key);

    if app != CROSS_LINK_APP {
        return Ok((template, report));
    }

    match template.applications_mut() {
        None | Some(Value::Null) => {},
        Some(Value::Array(entries)) => {
            for (index, entry) in entries.iter_mut().enumerate() {
                if let Value::Object(entry) = entry {
                    rewrite_entry(index, entry, credentials, &mut report)?;
                }
            }
        },
        Some(_) => {
            return Err(InjectError::NotAnArray {
                path: APPLICATIONS_FIELD.to_string(),
            });
        },
    }

    Ok((template, report))
}

fn rewrite_entry(
    index: usize,
    entry: &mut Map<String, Value>,
    credentials: &CredentialMap,
    report: &mut InjectionReport,
) -> Result<(), InjectError> {
    let entry_name = entry
        .get(NAME_FIELD)
        .and_then(Value::as_str)
        .map(str::to_string);

    let fields = match entry.get_mut(FIELDS_FIELD) {
        None | Some(Value::Null) => None,
        Some(Value::Array(fields)) => Some(fields),
        Some(_) => {
            return Err(InjectError::NotAnArray {
                path: format!("{APPLICATIONS_FIELD}[{index}].{FIELDS_FIELD}"),
            });
        },
    };

    let Some(route) = entry_name.as_deref().and_then(route_for) else {
        if let Some(name) = entry_name.filter(|name| !name.is_empty()) {
            report.untouched_entries.push(name);
        }
        return Ok(());
    };

    let api_key_fields = fields
        .into_iter()
        .flatten()
        .filter_map(Value::as_object_mut)
        .filter(|field| is_api_key_field(field));
    for field in api_key_fields {
        let key = credentials
            .get(route.source)
            .ok_or_else(|| InjectError::MissingCredential {
                app: route.source,
                entry: route.entry_name.to_string(),
            })?;
        field.insert(
            VALUE_FIELD.to_string(),
            Value::String(key.expose().to_string()),
        );
        *report.rewritten.entry(route.source).or_default() += 1;
    }

    Ok(())
}
