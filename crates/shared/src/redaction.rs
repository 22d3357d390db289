//! Secret detection and redaction utilities.
//!
//! API keys and admin passwords flow from the environment into the rendered
//! plan. These helpers keep them out of logs and error metadata.

/// The redacted placeholder string.
pub const REDACTED: &str = "[REDACTED]";

/// Checks if a key/variable name likely refers to a secret.
///
/// # Examples
///
/// ```
/// use servarr_shared::is_secret_key;
///
/// assert!(is_secret_key("SONARR_APIKEY"));
/// assert!(is_secret_key("adminPassword"));
/// assert!(!is_secret_key("POSTGRES_HOST"));
/// ```
pub fn is_secret_key(key: &str) -> bool {
    let key = key.to_ascii_uppercase();
    key.contains("KEY")
        || key.contains("TOKEN")
        || key.contains("SECRET")
        || key.contains("PASSWORD")
        || key.contains("CREDENTIAL")
        || key.contains("AUTH")
}

/// Redacts a value if the key is likely a secret.
///
/// ```
/// use servarr_shared::redact_if_secret;
///
/// assert_eq!(redact_if_secret("RADARR_APIKEY", "abc123"), "[REDACTED]");
/// assert_eq!(redact_if_secret("TRUENAS_HOST", "nas.lan"), "nas.lan");
/// ```
pub fn redact_if_secret(key: &str, value: &str) -> String {
    if is_secret_key(key) {
        REDACTED.to_string()
    } else {
        value.to_string()
    }
}

/// A secret string wrapper that redacts on Display/Debug.
///
/// Deliberately not `Serialize`: callers must choose to `expose` a secret
/// before it can reach a rendered document.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SecretString(Box<str>);

impl SecretString {
    /// Wrap a secret value.
    pub fn new(value: impl Into<Box<str>>) -> Self {
        Self(value.into())
    }

    /// Borrow the underlying secret.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(REDACTED)
    }
}

impl std::fmt::Display for SecretString {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(REDACTED)
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self(value.into_boxed_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_stack_secret_names() {
        assert!(is_secret_key("SONARR_APIKEY"));
        assert!(is_secret_key("prowlarr_password"));
        assert!(is_secret_key("POSTGRES_PASSWORD"));
        assert!(is_secret_key("apiKey"));
        assert!(is_secret_key("QBITTORRENT_APIKEY"));
    }

    #[test]
    fn rejects_non_secret_names() {
        assert!(!is_secret_key("POSTGRES_HOST"));
        assert!(!is_secret_key("TRUENAS_NFS_PATH_MEDIA"));
        assert!(!is_secret_key("SONARR_IMAGE"));
        assert!(!is_secret_key("env_vars"));
    }

    #[test]
    fn secret_string_redacts_display_and_debug() {
        let secret = SecretString::new("shh");
        assert_eq!(secret.to_string(), REDACTED);
        assert_eq!(format!("{secret:?}"), REDACTED);
        assert_eq!(secret.expose(), "shh");
    }
}
