use std::sync::Arc;

use axum::Router;
use tera::Tera;
use thiserror::Error;
use tracing::info;
use watchfinder_core::audit::TracingAuditSink;
use watchfinder_core::config::{AppConfig, ConfigError, LoadOptions};
use watchfinder_core::search::{CatalogSearch, InMemoryCatalog, SearchError};
use watchfinder_db::{
    connect_with_config, migrations, DbPool, SqlReservationRepository, SqlSessionRepository,
};

use crate::conversation::ConversationService;
use crate::search::AzureSearchClient;
use crate::{api, health, reservation};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub service: Arc<ConversationService>,
    pub templates: Arc<Tera>,
    pub search_backend: &'static str,
}

impl Application {
    pub fn router(&self) -> Router {
        api::router(self.service.clone())
            .merge(reservation::router(self.templates.clone()))
            .merge(health::router(self.db_pool.clone(), self.search_backend))
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("search backend could not be initialised: {0}")]
    Search(#[source] SearchError),
    #[error("no search backend configured; set search.endpoint or search.catalog_path")]
    MissingSearchBackend,
    #[error("templates failed to load: {0}")]
    Templates(#[source] tera::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    let origin = config.public_origin()?;

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
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

    let (search, search_backend) = search_backend(&config)?;
    info!(
        event_name = "system.bootstrap.search_ready",
        correlation_id = "bootstrap",
        search_backend,
        "search backend initialised"
    );

    let templates = reservation::load_templates().map_err(BootstrapError::Templates)?;

    let service = ConversationService::new(
        search,
        origin,
        Arc::new(SqlSessionRepository::new(db_pool.clone())),
        Arc::new(SqlReservationRepository::new(db_pool.clone())),
        Arc::new(TracingAuditSink),
    );

    Ok(Application {
        config,
        db_pool,
        service: Arc::new(service),
        templates: Arc::new(templates),
        search_backend,
    })
}

fn search_backend(
    config: &AppConfig,
) -> Result<(Arc<dyn CatalogSearch>, &'static str), BootstrapError> {
    if config.search.endpoint.is_some() {
        let client = AzureSearchClient::from_config(&config.search).map_err(BootstrapError::Search)?;
        info!(
            event_name = "system.bootstrap.search_endpoint",
            correlation_id = "bootstrap",
            search_url = %client.search_url(),
            "hosted search index configured"
        );
        return Ok((Arc::new(client), "azure"));
    }
    if let Some(path) = &config.search.catalog_path {
        let catalog = InMemoryCatalog::from_json_file(path).map_err(BootstrapError::Search)?;
        info!(
            event_name = "system.bootstrap.catalog_loaded",
            correlation_id = "bootstrap",
            entries = catalog.len(),
            path = %path.display(),
            "in-memory catalog loaded"
        );
        return Ok((Arc::new(catalog), "in-memory catalog"));
    }
    Err(BootstrapError::MissingSearchBackend)
}
