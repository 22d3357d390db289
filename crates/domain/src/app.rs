//! Known applications of the media stack.

use serde::{Deserialize, Serialize};
use servarr_shared::{ErrorCode, ErrorEnvelope};
use std::fmt;
use std::str::FromStr;

/// An application managed by the stack.
///
/// The lower-case slug doubles as the template file stem and the Helm
/// values key, so it never contains path separators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServarrApp {
    /// TV series manager.
    Sonarr,
    /// Movie manager.
    Radarr,
    /// Indexer manager; embeds credentials of downstream apps.
    Prowlarr,
    /// Music manager (declared but disabled in this deployment).
    Lidarr,
    /// Torrent download client.
    Qbittorrent,
    /// Request frontend, deployed outside the Preparr chart.
    Jellyseerr,
}

impl ServarrApp {
    /// Every known application, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Sonarr,
        Self::Radarr,
        Self::Prowlarr,
        Self::Lidarr,
        Self::Qbittorrent,
        Self::Jellyseerr,
    ];

    /// Lower-case slug (`sonarr`, `qbittorrent`, ...).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sonarr => "sonarr",
            Self::Radarr => "radarr",
            Self::Prowlarr => "prowlarr",
            Self::Lidarr => "lidarr",
            Self::Qbittorrent => "qbittorrent",
            Self::Jellyseerr => "jellyseerr",
        }
    }

    /// Name the application uses for itself inside Servarr payloads,
    /// e.g. the `name` of an entry under Prowlarr's `applications`.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Sonarr => "Sonarr",
            Self::Radarr => "Radarr",
            Self::Prowlarr => "Prowlarr",
            Self::Lidarr => "Lidarr",
            Self::Qbittorrent => "qBittorrent",
            Self::Jellyseerr => "Jellyseerr",
        }
    }

    /// Prefix of the app's environment variables (`SONARR_APIKEY`, ...).
    #[must_use]
    pub const fn env_prefix(self) -> &'static str {
        match self {
            Self::Sonarr => "SONARR",
            Self::Radarr => "RADARR",
            Self::Prowlarr => "PROWLARR",
            Self::Lidarr => "LIDARR",
            Self::Qbittorrent => "QBITTORRENT",
            Self::Jellyseerr => "JELLYSEERR",
        }
    }

    /// Parse a slug, ignoring surrounding whitespace and ASCII case.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        Self::ALL
            .into_iter()
            .find(|app| app.as_str().eq_ignore_ascii_case(trimmed))
    }
}

impl fmt::Display for ServarrApp {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Input did not name a known application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAppError {
    /// Raw input that failed to parse.
    pub input: String,
}

impl fmt::Display for UnknownAppError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "unknown application: {}", self.input)
    }
}

impl std::error::Error for UnknownAppError {}

impl From<UnknownAppError> for ErrorEnvelope {
    fn from(error: UnknownAppError) -> Self {
        let known = ServarrApp::ALL.map(ServarrApp::as_str).join(",");
        Self::expected(ErrorCode::new("config", "unknown_app"), error.to_string())
            .with_metadata("app", error.input)
            .with_metadata("known", known)
    }
}

impl FromStr for ServarrApp {
    type Err = UnknownAppError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Self::parse(input).ok_or_else(|| UnknownAppError {
            input: input.to_string(),
        })
    }
}
