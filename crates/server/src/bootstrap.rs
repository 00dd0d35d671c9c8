use std::sync::Arc;

use smashbot_core::config::{AppConfig, Credentials};
use smashbot_core::{Catalog, CatalogLoadError, StoreError, VoteStore};
use smashbot_db::{connect, migrations, reconcile_catalog, DbPool, SqlVoteStore};
use smashbot_slack::collector::CollectorRegistry;
use smashbot_slack::events::build_dispatcher;
use smashbot_slack::ingress::{DetachedSource, SlackIngress};
use smashbot_slack::service::GameCommandService;
use smashbot_slack::session::{SessionController, SessionSettings};
use smashbot_slack::surface::ResponseUrlSurfaceFactory;
use thiserror::Error;
use tracing::{info, warn};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub catalog: Arc<Catalog>,
    pub registry: Arc<CollectorRegistry>,
    pub ingress: SlackIngress,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("catalog load failed: {0}")]
    Catalog(#[from] CatalogLoadError),
    #[error("catalog reconciliation failed: {0}")]
    Reconcile(#[source] StoreError),
}

pub async fn bootstrap(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let catalog = Arc::new(Catalog::load(&config.catalog.path)?);
    info!(
        event_name = "system.bootstrap.catalog_loaded",
        correlation_id = "bootstrap",
        path = %config.catalog.path.display(),
        items = catalog.len(),
        "catalog loaded"
    );

    let store: Arc<dyn VoteStore> = Arc::new(SqlVoteStore::new(db_pool.clone()));
    reconcile_catalog(store.as_ref(), &catalog).await.map_err(BootstrapError::Reconcile)?;

    let registry = CollectorRegistry::new();
    let controller = Arc::new(SessionController::new(
        Arc::clone(&catalog),
        store,
        Arc::clone(&registry),
        SessionSettings::from(&config.session),
    ));
    let surfaces = Arc::new(ResponseUrlSurfaceFactory::new(reqwest::Client::new()));
    let service =
        GameCommandService::new(controller, surfaces.clone(), config.slack.invite_url.clone());
    let dispatcher = build_dispatcher(service, surfaces, Arc::clone(&registry));

    let credentials = config.slack.socket_mode_credentials();
    if credentials == Credentials::Partial {
        warn!(
            event_name = "system.bootstrap.partial_credentials",
            correlation_id = "bootstrap",
            "only one of slack.app_token and slack.bot_token is set"
        );
    }
    let ingress = SlackIngress::new(Arc::new(DetachedSource), dispatcher);
    info!(
        event_name = "system.bootstrap.dispatcher_ready",
        correlation_id = "bootstrap",
        socket_mode_credentials = ?credentials,
        "slack dispatcher wired"
    );

    Ok(Application { config, db_pool, catalog, registry, ingress })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use smashbot_core::config::{AppConfig, ConfigOverrides, LoadOptions};
    use smashbot_core::{ItemKey, VoteStore, VoteTally};
    use smashbot_db::SqlVoteStore;
    use tempfile::{NamedTempFile, TempDir};

    use crate::bootstrap::{bootstrap, BootstrapError};

    fn catalog_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp catalog");
        file.write_all(contents.as_bytes()).expect("write catalog");
        file
    }

    /// Config built from defaults and overrides only, ignoring the process environment.
    fn config(dir: &TempDir, catalog: &NamedTempFile) -> AppConfig {
        let database_url = format!("sqlite://{}", dir.path().join("smashbot.db").display());
        AppConfig::load_with(
            LoadOptions {
                config_path: Some(dir.path().join("absent.toml")),
                overrides: ConfigOverrides {
                    database_url: Some(database_url),
                    catalog_path: Some(catalog.path().to_path_buf()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            },
            |_| None,
        )
        .expect("config")
    }

    #[tokio::test]
    async fn boots_without_slack_tokens_and_seeds_every_item() {
        let dir = tempfile::tempdir().expect("temp dir");
        let catalog = catalog_file(
            r#"[
                { "name": "MS-06F Zaku II", "images": ["zaku.png"] },
                { "title": "RX-78-2 Gundam", "images": ["rx-1.png", "rx-2.png"] }
            ]"#,
        );
        let config = config(&dir, &catalog);
        assert!(config.slack.app_token.is_none() && config.slack.bot_token.is_none());

        let app = bootstrap(config).await.expect("bootstrap");

        assert_eq!(app.catalog.len(), 2);
        assert_eq!(app.registry.active_count(), 0);
        let store = SqlVoteStore::new(app.db_pool.clone());
        let tallies = store.list().await.expect("list");
        assert_eq!(
            tallies,
            vec![
                (ItemKey::from_name("MS-06F Zaku II"), VoteTally::default()),
                (ItemKey::from_name("RX-78-2 Gundam"), VoteTally::default()),
            ]
        );

        let summary = app.ingress.run().await.expect("detached ingress closes cleanly");
        assert_eq!(summary.total(), 0);
        app.db_pool.close().await;
    }

    #[tokio::test]
    async fn malformed_catalog_aborts_startup() {
        let dir = tempfile::tempdir().expect("temp dir");
        let catalog = catalog_file(r#"[{ "name": "MS-06F Zaku II", "images": [] }]"#);

        let result = bootstrap(config(&dir, &catalog)).await;

        assert!(matches!(result, Err(BootstrapError::Catalog(_))));
    }
}
