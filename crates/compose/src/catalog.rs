//! Static facts about each deployed application.

use servarr_domain::{ImageRef, ServarrApp};

/// Shared media claim mounted by every app.
pub const MEDIA_CLAIM: &str = "media";
/// Persistent volume backing [`MEDIA_CLAIM`].
pub const MEDIA_VOLUME: &str = "servarr-media-pv";
/// Postgres provider resource name.
pub const POSTGRES_PROVIDER: &str = "postgres-provider";
/// Database name handed to the chart's Postgres block.
pub const CHART_DATABASE: &str = "servarr";
/// Helm chart and release name.
pub const CHART_NAME: &str = "preparr";
/// Exporter sidecar container name.
pub const EXPORTER_NAME: &str = "exportarr";

/// Default Preparr image repository.
pub const PREPARR_DEFAULT_REPOSITORY: &str = "ghcr.io/robbeverhelst/preparr";
/// Default Preparr image tag.
pub const PREPARR_DEFAULT_TAG: &str = "0.3.2";
/// Default exporter repository, used when `EXPORTARR_IMAGE` omits it.
pub const EXPORTER_DEFAULT_REPOSITORY: &str = "ghcr.io/onedr0p/exportarr";
/// Default Jellyseerr repository, used when `JELLYSEERR_IMAGE` omits it.
pub const JELLYSEERR_DEFAULT_REPOSITORY: &str = "fallenbagel/jellyseerr";
/// Tag used when an image reference has none.
pub const DEFAULT_TAG: &str = "latest";
/// Jellyseerr HTTP port.
pub const JELLYSEERR_PORT: u16 = 5055;
/// qBittorrent peer port.
pub const QBITTORRENT_TORRENT_PORT: u16 = 6881;

/// Apps that get a `<app>-main` and `<app>-log` database.
pub const DATABASE_APPS: [ServarrApp; 3] =
    [ServarrApp::Radarr, ServarrApp::Sonarr, ServarrApp::Prowlarr];

/// A subpath of the media claim mounted into an app.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageMount {
    /// Key under the chart's `storage` block.
    pub key: &'static str,
    /// Subpath inside the media claim.
    pub sub_path: &'static str,
}

/// How an app receives its bootstrap configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// `<app>.json` template with injected keys, plus an admin password.
    Template,
    /// Web UI username/password (qBittorrent).
    WebUiCredentials,
}

/// Chart settings for one Preparr-managed app.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppProfile {
    /// Application.
    pub app: ServarrApp,
    /// Default image repository.
    pub default_repository: &'static str,
    /// Default image tag.
    pub default_tag: &'static str,
    /// HTTP port.
    pub port: u16,
    /// Exporter metrics port.
    pub metrics_port: u16,
    /// Media mount, if any.
    pub storage: Option<StorageMount>,
    /// Where the app's config comes from.
    pub config: ConfigSource,
}

impl AppProfile {
    /// Default image for this app.
    #[must_use]
    pub fn default_image(&self) -> ImageRef {
        ImageRef::new(self.default_repository, self.default_tag)
    }
}

/// Apps deployed by the Preparr chart, in values order.
pub const PREPARR_APPS: [AppProfile; 4] = [
    AppProfile {
        app: ServarrApp::Qbittorrent,
        default_repository: "lscr.io/linuxserver/qbittorrent",
        default_tag: DEFAULT_TAG,
        port: 8080,
        metrics_port: 9711,
        storage: Some(StorageMount {
            key: "downloads",
            sub_path: "downloads",
        }),
        config: ConfigSource::WebUiCredentials,
    },
    AppProfile {
        app: ServarrApp::Prowlarr,
        default_repository: "lscr.io/linuxserver/prowlarr",
        default_tag: DEFAULT_TAG,
        port: 9696,
        metrics_port: 9707,
        storage: None,
        config: ConfigSource::Template,
    },
    AppProfile {
        app: ServarrApp::Sonarr,
        default_repository: "lscr.io/linuxserver/sonarr",
        default_tag: DEFAULT_TAG,
        port: 8989,
        metrics_port: 9708,
        storage: Some(StorageMount {
            key: "tv",
            sub_path: "media/tv",
        }),
        config: ConfigSource::Template,
    },
    AppProfile {
        app: ServarrApp::Radarr,
        default_repository: "lscr.io/linuxserver/radarr",
        default_tag: DEFAULT_TAG,
        port: 7878,
        metrics_port: 9709,
        storage: Some(StorageMount {
            key: "movies",
            sub_path: "media/movies",
        }),
        config: ConfigSource::Template,
    },
];

/// Profile of a Preparr-managed app.
#[must_use]
pub fn profile(app: ServarrApp) -> Option<&'static AppProfile> {
    PREPARR_APPS.iter().find(|profile| profile.app == app)
}

/// Apps whose config is a template on disk.
pub fn template_apps() -> impl Iterator<Item = ServarrApp> {
    PREPARR_APPS
        .iter()
        .filter(|profile| profile.config == ConfigSource::Template)
        .map(|profile| profile.app)
}
