//! Plan composition.
//!
//! Turns validated [`DeploymentSettings`] into a [`DeploymentPlan`]. Every
//! template is loaded and injected before the plan is returned, so a bad
//! template aborts the render and nothing partial is produced.

use crate::catalog::{
    AppProfile, CHART_DATABASE, CHART_NAME, ConfigSource, DATABASE_APPS, DEFAULT_TAG,
    EXPORTER_DEFAULT_REPOSITORY, JELLYSEERR_DEFAULT_REPOSITORY, JELLYSEERR_PORT, MEDIA_CLAIM,
    MEDIA_VOLUME, POSTGRES_PROVIDER, PREPARR_APPS, PREPARR_DEFAULT_REPOSITORY,
    PREPARR_DEFAULT_TAG,
};
use crate::plan::{
    DatabaseResource, DeploymentPlan, EnvVar, HelmRelease, IngressBackend, IngressResource,
    NamespaceResource, NfsVolume, PersistentVolumeClaimResource, PersistentVolumeResource,
    PlanOutputs, PostgresProvider, ResourceKind, ResourceRef, ServiceResource, StandaloneApp,
};
use crate::secrets::SecretPolicy;
use crate::sidecar::exporter_sidecar;
use crate::values::{
    AppConfigValues, AppValues, DisabledApp, GlobalValues, IngressValues, PortValue,
    PostgresAuth, PostgresqlValues, PreparrImageValues, PreparrValues, ServiceValues,
    StorageValues, INGRESS_PATH, INGRESS_PATH_TYPE,
};
use servarr_config::{DeploymentSettings, load_template};
use servarr_domain::{
    AppConfigTemplate, CredentialMap, ImageRef, InjectionReport, ServarrApp,
    inject_credentials_with_report,
};
use servarr_shared::{ErrorCode, ErrorEnvelope, ResultExt, SecretString};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info};

/// Access mode of the shared media volume.
const MEDIA_ACCESS_MODE: &str = "ReadWriteMany";
/// Reclaim policy of the media volume.
const MEDIA_RECLAIM_POLICY: &str = "Retain";
/// SSL mode of the Postgres provider.
const POSTGRES_SSLMODE: &str = "disable";
/// Jellyseerr log level.
const JELLYSEERR_LOG_LEVEL: &str = "info";

/// Source of application templates.
pub trait TemplateSource {
    /// Load the template of `app`.
    fn load(&self, app: ServarrApp) -> Result<AppConfigTemplate, ErrorEnvelope>;
}

/// Templates read from `<dir>/<app>.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirTemplateSource {
    dir: PathBuf,
}

impl DirTemplateSource {
    /// Read templates from `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl TemplateSource for DirTemplateSource {
    fn load(&self, app: ServarrApp) -> Result<AppConfigTemplate, ErrorEnvelope> {
        load_template(&self.dir, app)
    }
}

/// In-memory templates keyed by app.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticTemplateSource {
    templates: BTreeMap<ServarrApp, AppConfigTemplate>,
}

impl StaticTemplateSource {
    /// Empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a template.
    #[must_use]
    pub fn with(mut self, app: ServarrApp, template: AppConfigTemplate) -> Self {
        self.templates.insert(app, template);
        self
    }
}

impl TemplateSource for StaticTemplateSource {
    fn load(&self, app: ServarrApp) -> Result<AppConfigTemplate, ErrorEnvelope> {
        self.templates.get(&app).cloned().ok_or_else(|| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "template_not_found"),
                format!("no template registered for {app}"),
            )
            .with_metadata("app", app.as_str())
        })
    }
}

/// Compose the plan, reading templates from the configured directory.
pub fn compose_plan(
    settings: &DeploymentSettings,
    policy: SecretPolicy,
) -> Result<DeploymentPlan, ErrorEnvelope> {
    compose_plan_with(
        settings,
        policy,
        &DirTemplateSource::new(settings.templates_dir()),
    )
}

/// Compose the plan from an explicit template source.
pub fn compose_plan_with(
    settings: &DeploymentSettings,
    policy: SecretPolicy,
    templates: &dyn TemplateSource,
) -> Result<DeploymentPlan, ErrorEnvelope> {
    let config = &settings.config;
    let namespace = config.namespace.clone();
    let namespace_ref = ResourceRef::new(ResourceKind::Namespace, &namespace);
    let volume_ref = ResourceRef::new(ResourceKind::PersistentVolume, MEDIA_VOLUME);

    let media_volume = PersistentVolumeResource {
        name: MEDIA_VOLUME.to_string(),
        capacity: config.media_size.clone(),
        access_modes: vec![MEDIA_ACCESS_MODE.to_string()],
        reclaim_policy: MEDIA_RECLAIM_POLICY.to_string(),
        storage_class_name: config.storage_class.clone(),
        nfs: NfsVolume {
            server: settings.nfs.server.to_string(),
            path: settings.nfs.path.to_string(),
        },
    };

    let media_claim = PersistentVolumeClaimResource {
        name: MEDIA_CLAIM.to_string(),
        namespace: namespace.clone(),
        access_modes: vec![MEDIA_ACCESS_MODE.to_string()],
        storage_class_name: config.storage_class.clone(),
        storage_request: config.media_size.clone(),
        volume_name: MEDIA_VOLUME.to_string(),
        depends_on: vec![namespace_ref.clone(), volume_ref.clone()],
    };

    let postgres = &settings.required.postgres;
    let postgres_provider = PostgresProvider {
        name: POSTGRES_PROVIDER.to_string(),
        host: postgres.host.to_string(),
        port: postgres.port,
        username: postgres.username.to_string(),
        password: policy.render(&postgres.password),
        sslmode: POSTGRES_SSLMODE.to_string(),
    };

    let databases = plan_databases(&postgres.username);

    let values = compose_values(settings, policy, templates)?;
    let chart = HelmRelease {
        name: CHART_NAME.to_string(),
        chart: CHART_NAME.to_string(),
        version: config.chart_version.clone(),
        repo: config.chart_repo.clone(),
        namespace: namespace.clone(),
        values,
        depends_on: vec![namespace_ref.clone(), volume_ref],
    };

    let jellyseerr = plan_jellyseerr(settings, &namespace_ref)?;

    let mut services = BTreeMap::new();
    services.insert(
        ServarrApp::Jellyseerr.as_str().to_string(),
        jellyseerr.service.name.clone(),
    );

    let plan = DeploymentPlan {
        namespace: NamespaceResource {
            name: namespace.clone(),
        },
        media_volume,
        media_claim,
        postgres_provider,
        databases,
        chart,
        jellyseerr,
        outputs: PlanOutputs {
            namespace: namespace.clone(),
            services,
        },
    };

    let reveal_secrets = policy == SecretPolicy::Reveal;
    info!(
        namespace = %namespace,
        resources = plan.resources().len(),
        databases = plan.databases.len(),
        reveal_secrets,
        "composed deployment plan"
    );
    Ok(plan)
}

/// `<app>-main` and `<app>-log` per database app, then Jellyseerr's.
#[must_use]
pub fn plan_databases(owner: &str) -> Vec<DatabaseResource> {
    let database = |name: String| DatabaseResource {
        resource_name: format!("{name}-database"),
        name,
        owner: owner.to_string(),
        provider: POSTGRES_PROVIDER.to_string(),
    };

    let mut databases: Vec<DatabaseResource> = DATABASE_APPS
        .iter()
        .flat_map(|app| {
            [
                database(format!("{}-main", app.as_str())),
                database(format!("{}-log", app.as_str())),
            ]
        })
        .collect();
    databases.push(database(ServarrApp::Jellyseerr.as_str().to_string()));
    databases
}

fn compose_values(
    settings: &DeploymentSettings,
    policy: SecretPolicy,
    templates: &dyn TemplateSource,
) -> Result<PreparrValues, ErrorEnvelope> {
    let config = &settings.config;
    let required = &settings.required;
    let rendered_keys = policy.credentials(&required.api_keys);
    let exporter_image = ImageRef::parse_with_defaults(
        &required.exportarr_image,
        EXPORTER_DEFAULT_REPOSITORY,
        DEFAULT_TAG,
    )?
    .to_string();

    let mut apps = BTreeMap::new();
    for profile in &PREPARR_APPS {
        let values = compose_app_values(
            settings,
            profile,
            policy,
            &rendered_keys,
            &exporter_image,
            templates,
        )?;
        apps.insert(profile.app, values);
    }

    let mut take = |app: ServarrApp| {
        apps.remove(&app).ok_or_else(|| {
            ErrorEnvelope::invariant(
                ErrorCode::internal(),
                format!("no chart values composed for {app}"),
            )
        })
    };
    let qbittorrent = take(ServarrApp::Qbittorrent)?;
    let prowlarr = take(ServarrApp::Prowlarr)?;
    let sonarr = take(ServarrApp::Sonarr)?;
    let radarr = take(ServarrApp::Radarr)?;

    let preparr_default = ImageRef::new(PREPARR_DEFAULT_REPOSITORY, PREPARR_DEFAULT_TAG);
    Ok(PreparrValues {
        global: GlobalValues {
            namespace: config.namespace.clone(),
            timezone: config.timezone.clone(),
        },
        preparr: PreparrImageValues {
            enabled: true,
            image: ImageRef::resolve(settings.preparr_image.as_deref(), &preparr_default)?,
        },
        postgresql: PostgresqlValues {
            enabled: false,
            external_host: required.postgres.host.to_string(),
            auth: PostgresAuth {
                username: required.postgres.username.to_string(),
                password: policy.render(&required.postgres.password),
                database: CHART_DATABASE.to_string(),
            },
            service: PortValue {
                port: required.postgres.port,
            },
        },
        qbittorrent,
        prowlarr,
        sonarr,
        radarr,
        lidarr: DisabledApp { enabled: false },
    })
}

fn compose_app_values(
    settings: &DeploymentSettings,
    profile: &AppProfile,
    policy: SecretPolicy,
    rendered_keys: &CredentialMap,
    exporter_image: &str,
    templates: &dyn TemplateSource,
) -> Result<AppValues, ErrorEnvelope> {
    let app = profile.app;
    let required = &settings.required;
    let own_key = rendered_keys
        .get(app)
        .map(SecretString::expose)
        .ok_or_else(|| missing_credential(app))?;

    let image = ImageRef::resolve(
        settings.image_overrides.get(&app).map(|image| &**image),
        &profile.default_image(),
    )
    .map_err(ErrorEnvelope::from)
    .with_metadata("app", app.as_str())?;

    let (config, admin_password) = match profile.config {
        ConfigSource::Template => {
            let template = templates.load(app)?;
            let (template, report) =
                inject_credentials_with_report(template, app, own_key, rendered_keys)?;
            log_injection(app, &report);

            let password = required
                .admin_passwords
                .get(&app)
                .map(|password| policy.render(password))
                .ok_or_else(|| missing_password(app))?;
            (AppConfigValues::Template(template), Some(password))
        },
        ConfigSource::WebUiCredentials => (
            AppConfigValues::Credentials {
                username: required.qbittorrent_username.to_string(),
                password: policy.render(&required.qbittorrent_password),
            },
            None,
        ),
    };

    let storage = profile
        .storage
        .iter()
        .map(|mount| (mount.key.to_string(), StorageValues::media(mount.sub_path)))
        .collect();

    Ok(AppValues {
        enabled: true,
        image,
        service: ServiceValues::for_profile(profile),
        ingress: IngressValues::single_host(
            settings.config.ingress_class.clone(),
            settings.config.host_for(app.as_str()),
        ),
        storage,
        config,
        admin_password,
        extra_containers: vec![exporter_sidecar(exporter_image, profile, own_key)],
    })
}

fn plan_jellyseerr(
    settings: &DeploymentSettings,
    namespace_ref: &ResourceRef,
) -> Result<StandaloneApp, ErrorEnvelope> {
    let name = ServarrApp::Jellyseerr.as_str().to_string();
    let namespace = settings.config.namespace.clone();
    let image = ImageRef::parse_with_defaults(
        &settings.required.jellyseerr_image,
        JELLYSEERR_DEFAULT_REPOSITORY,
        DEFAULT_TAG,
    )
    .map_err(ErrorEnvelope::from)
    .with_metadata("app", name.as_str())?;

    Ok(StandaloneApp {
        name: name.clone(),
        namespace: namespace.clone(),
        image,
        port: JELLYSEERR_PORT,
        env: vec![EnvVar::new("LOG_LEVEL", JELLYSEERR_LOG_LEVEL)],
        service: ServiceResource {
            name: name.clone(),
            port: JELLYSEERR_PORT,
            target_port: JELLYSEERR_PORT,
        },
        ingress: IngressResource {
            name: name.clone(),
            namespace,
            ingress_class_name: settings.config.ingress_class.clone(),
            host: settings.config.host_for(&name),
            path: INGRESS_PATH.to_string(),
            path_type: INGRESS_PATH_TYPE.to_string(),
            backend: IngressBackend {
                service_name: name.clone(),
                port: JELLYSEERR_PORT,
            },
            depends_on: vec![ResourceRef::new(ResourceKind::App, &name)],
        },
        depends_on: vec![namespace_ref.clone()],
    })
}

fn log_injection(app: ServarrApp, report: &InjectionReport) {
    debug!(
        app = app.as_str(),
        rewritten = report.rewritten_total(),
        untouched = ?report.untouched_entries,
        "injected credentials"
    );
}

fn missing_credential(app: ServarrApp) -> ErrorEnvelope {
    ErrorEnvelope::expected(
        ErrorCode::new("config", "missing_credential"),
        format!("no API key configured for {app}"),
    )
    .with_metadata("app", app.as_str())
    .with_metadata("env_vars", format!("{}_APIKEY", app.env_prefix()))
}

fn missing_password(app: ServarrApp) -> ErrorEnvelope {
    ErrorEnvelope::expected(
        ErrorCode::new("config", "missing_credential"),
        format!("no admin password configured for {app}"),
    )
    .with_metadata("app", app.as_str())
    .with_metadata("env_vars", format!("{}_PASSWORD", app.env_prefix()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use servarr_config::{DeploymentEnv, load_deployment_settings};
    use servarr_shared::REDACTED;
    use std::error::Error;

    const PROWLARR_TEMPLATE: &str = r#"{
        "apiKey": "placeholder",
        "applications": [
            { "name": "Sonarr", "syncLevel": "fullSync",
              "fields": [{ "name": "baseUrl", "value": "http://sonarr:8989" },
                         { "name": "apiKey", "value": "old" }] },
            { "name": "Radarr",
              "fields": [{ "name": "apiKey", "value": "old" }] },
            { "name": "Lidarr",
              "fields": [{ "name": "apiKey", "value": "keep-me" }] }
        ]
    }"#;

    fn full_env() -> Result<DeploymentEnv, Box<dyn Error>> {
        let pairs = [
            ("SONARR_APIKEY", "sonarr-key"),
            ("RADARR_APIKEY", "radarr-key"),
            ("PROWLARR_APIKEY", "prowlarr-key"),
            ("QBITTORRENT_APIKEY", "qbit-key"),
            ("SONARR_PASSWORD", "sonarr-pass"),
            ("RADARR_PASSWORD", "radarr-pass"),
            ("PROWLARR_PASSWORD", "prowlarr-pass"),
            ("QBITTORRENT_USERNAME", "admin"),
            ("QBITTORRENT_PASSWORD", "qbit-pass"),
            ("EXPORTARR_IMAGE", "ghcr.io/onedr0p/exportarr:v2.0.1"),
            ("JELLYSEERR_IMAGE", "fallenbagel/jellyseerr:2.1.0"),
            ("POSTGRES_HOST", "db.lan"),
            ("POSTGRES_PORT", "5432"),
            ("POSTGRES_PASSWORD", "pg-pass"),
            ("SONARR_IMAGE", "lscr.io/linuxserver/sonarr:4.0.0"),
        ];
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        Ok(DeploymentEnv::from_map(&map)?)
    }

    fn templates() -> Result<StaticTemplateSource, Box<dyn Error>> {
        let plain = AppConfigTemplate::from_json_str(r#"{"apiKey":"x","rootFolders":[]}"#)?;
        Ok(StaticTemplateSource::new()
            .with(
                ServarrApp::Prowlarr,
                AppConfigTemplate::from_json_str(PROWLARR_TEMPLATE)?,
            )
            .with(ServarrApp::Sonarr, plain.clone())
            .with(ServarrApp::Radarr, plain))
    }

    fn revealed_plan() -> Result<DeploymentPlan, Box<dyn Error>> {
        let settings = load_deployment_settings(None, &full_env()?)?;
        Ok(compose_plan_with(
            &settings,
            SecretPolicy::Reveal,
            &templates()?,
        )?)
    }

    #[test]
    fn prowlarr_values_carry_cross_linked_keys() -> Result<(), Box<dyn Error>> {
        let plan = revealed_plan()?;
        let config = serde_json::to_value(&plan.chart.values.prowlarr.config)?;

        assert_eq!(config["apiKey"], "prowlarr-key");
        assert_eq!(config["applications"][0]["fields"][1]["value"], "sonarr-key");
        assert_eq!(
            config["applications"][0]["fields"][0]["value"],
            "http://sonarr:8989"
        );
        assert_eq!(config["applications"][0]["syncLevel"], "fullSync");
        assert_eq!(config["applications"][1]["fields"][0]["value"], "radarr-key");
        assert_eq!(config["applications"][2]["fields"][0]["value"], "keep-me");
        Ok(())
    }

    #[test]
    fn each_template_app_gets_its_own_key_and_password() -> Result<(), Box<dyn Error>> {
        let plan = revealed_plan()?;
        let sonarr = &plan.chart.values.sonarr;
        let config = serde_json::to_value(&sonarr.config)?;

        assert_eq!(config["apiKey"], "sonarr-key");
        assert_eq!(sonarr.admin_password.as_deref(), Some("sonarr-pass"));
        assert_eq!(sonarr.image, ImageRef::new("lscr.io/linuxserver/sonarr", "4.0.0"));
        assert_eq!(
            plan.chart.values.radarr.image,
            ImageRef::new("lscr.io/linuxserver/radarr", "latest")
        );
        Ok(())
    }

    #[test]
    fn qbittorrent_uses_webui_credentials() -> Result<(), Box<dyn Error>> {
        let plan = revealed_plan()?;
        let qbittorrent = &plan.chart.values.qbittorrent;

        assert_eq!(
            qbittorrent.config,
            AppConfigValues::Credentials {
                username: "admin".to_string(),
                password: "qbit-pass".to_string(),
            }
        );
        assert!(qbittorrent.admin_password.is_none());
        assert_eq!(
            qbittorrent.storage.get("downloads").map(|mount| mount.sub_path.as_str()),
            Some("downloads")
        );
        let exporter = qbittorrent.extra_containers.first().ok_or("sidecar")?;
        assert_eq!(exporter.image, "ghcr.io/onedr0p/exportarr:v2.0.1");
        Ok(())
    }

    #[test]
    fn lidarr_stays_disabled() -> Result<(), Box<dyn Error>> {
        let plan = revealed_plan()?;
        let values = serde_json::to_value(&plan.chart.values)?;
        assert_eq!(values["lidarr"], serde_json::json!({ "enabled": false }));
        assert_eq!(values["postgresql"]["enabled"], false);
        assert_eq!(values["postgresql"]["auth"]["database"], "servarr");
        Ok(())
    }

    #[test]
    fn databases_cover_main_and_log_per_app() {
        let names: Vec<String> = plan_databases("postgres")
            .into_iter()
            .map(|database| database.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "radarr-main",
                "radarr-log",
                "sonarr-main",
                "sonarr-log",
                "prowlarr-main",
                "prowlarr-log",
                "jellyseerr",
            ]
        );
    }

    #[test]
    fn claim_and_chart_wait_for_namespace_and_volume() -> Result<(), Box<dyn Error>> {
        let plan = revealed_plan()?;
        let expected = vec![
            ResourceRef::new(ResourceKind::Namespace, "servarr"),
            ResourceRef::new(ResourceKind::PersistentVolume, MEDIA_VOLUME),
        ];
        assert_eq!(plan.media_claim.depends_on, expected);
        assert_eq!(plan.chart.depends_on, expected);
        assert_eq!(
            plan.jellyseerr.ingress.depends_on,
            vec![ResourceRef::new(ResourceKind::App, "jellyseerr")]
        );
        assert_eq!(plan.jellyseerr.ingress.host, "jellyseerr.robbe.work");
        assert_eq!(
            plan.outputs.services.get("jellyseerr").map(String::as_str),
            Some("jellyseerr")
        );
        Ok(())
    }

    #[test]
    fn redacted_plan_contains_no_secret_values() -> Result<(), Box<dyn Error>> {
        let settings = load_deployment_settings(None, &full_env()?)?;
        let plan = compose_plan_with(&settings, SecretPolicy::Redact, &templates()?)?;
        let rendered = serde_json::to_string(&plan)?;

        for secret in [
            "sonarr-key",
            "radarr-key",
            "prowlarr-key",
            "qbit-key",
            "sonarr-pass",
            "qbit-pass",
            "pg-pass",
        ] {
            assert!(!rendered.contains(secret), "{secret} leaked");
        }
        assert!(rendered.contains(REDACTED));
        assert!(rendered.contains("keep-me"));
        Ok(())
    }

    #[test]
    fn missing_template_aborts_the_render() -> Result<(), Box<dyn Error>> {
        let settings = load_deployment_settings(None, &full_env()?)?;
        let source = StaticTemplateSource::new().with(
            ServarrApp::Prowlarr,
            AppConfigTemplate::from_json_str(PROWLARR_TEMPLATE)?,
        );

        let error = compose_plan_with(&settings, SecretPolicy::Reveal, &source)
            .err()
            .ok_or("expected error")?;
        assert_eq!(error.code, ErrorCode::new("config", "template_not_found"));
        assert_eq!(error.metadata.get("app").map(String::as_str), Some("sonarr"));
        Ok(())
    }
}
