//! Whether secrets are written into the rendered plan.

use servarr_domain::CredentialMap;
use servarr_shared::{REDACTED, SecretString};

/// Secret exposure for a render.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SecretPolicy {
    /// Replace every secret with a placeholder.
    #[default]
    Redact,
    /// Write real values; the output is then itself a secret.
    Reveal,
}

impl SecretPolicy {
    /// Value written for a secret.
    #[must_use]
    pub fn render(self, secret: &SecretString) -> String {
        match self {
            Self::Redact => REDACTED.to_string(),
            Self::Reveal => secret.expose().to_string(),
        }
    }

    /// Credential map with every key rendered under this policy.
    #[must_use]
    pub fn credentials(self, credentials: &CredentialMap) -> CredentialMap {
        credentials
            .apps()
            .filter_map(|app| {
                credentials
                    .get(app)
                    .map(|key| (app, SecretString::new(self.render(key))))
            })
            .collect()
    }
}
