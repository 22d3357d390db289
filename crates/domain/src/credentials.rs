//! API keys of the stack's applications.

use crate::app::ServarrApp;
use servarr_shared::SecretString;
use std::collections::BTreeMap;

/// API keys keyed by application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialMap {
    keys: BTreeMap<ServarrApp, SecretString>,
}

impl CredentialMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the key for an application, replacing any previous value.
    pub fn insert(&mut self, app: ServarrApp, key: impl Into<SecretString>) {
        self.keys.insert(app, key.into());
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, app: ServarrApp, key: impl Into<SecretString>) -> Self {
        self.insert(app, key);
        self
    }

    /// Key for an application, if known.
    #[must_use]
    pub fn get(&self, app: ServarrApp) -> Option<&SecretString> {
        self.keys.get(&app)
    }

    /// True when a key is stored for the application.
    #[must_use]
    pub fn contains(&self, app: ServarrApp) -> bool {
        self.keys.contains_key(&app)
    }

    /// Applications with a stored key.
    pub fn apps(&self) -> impl Iterator<Item = ServarrApp> + '_ {
        self.keys.keys().copied()
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True when no keys are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl FromIterator<(ServarrApp, SecretString)> for CredentialMap {
    fn from_iter<I: IntoIterator<Item = (ServarrApp, SecretString)>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_existing_key() {
        let mut map = CredentialMap::new().with(ServarrApp::Sonarr, "first");
        map.insert(ServarrApp::Sonarr, "second");

        assert_eq!(map.len(), 1);
        assert_eq!(
            map.get(ServarrApp::Sonarr).map(SecretString::expose),
            Some("second")
        );
    }

    #[test]
    fn debug_output_hides_keys() {
        let map = CredentialMap::new().with(ServarrApp::Radarr, "super-secret");
        let rendered = format!("{map:?}");
        assert!(!rendered.contains("super-secret"));
    }

    #[test]
    fn apps_iterate_in_stable_order() {
        let map: CredentialMap = [
            (ServarrApp::Radarr, SecretString::new("r")),
            (ServarrApp::Sonarr, SecretString::new("s")),
        ]
        .into_iter()
        .collect();
        let apps: Vec<ServarrApp> = map.apps().collect();
        assert_eq!(apps, vec![ServarrApp::Sonarr, ServarrApp::Radarr]);
        assert!(!map.contains(ServarrApp::Prowlarr));
    }
}
