//! Application state shared across request handlers.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::config::Config;
use crate::content::{ContentPipeline, PreviewGenerator};
use crate::db;
use crate::export::ExportCompositor;
use crate::file::{FileService, LocalFileStorage};
use crate::models::{DbRevisionStore, RevisionStore};

/// Shared application state.
///
/// Cheap to clone; all services live behind one Arc.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    db: PgPool,
    storage: Arc<LocalFileStorage>,
    files: Arc<FileService>,
    previews: Arc<PreviewGenerator>,
    compositor: Arc<ExportCompositor>,
    pipeline: Arc<ContentPipeline>,
    revisions: Arc<dyn RevisionStore>,
}

impl AppState {
    /// Create new application state with database connections.
    pub async fn new(config: &Config) -> Result<Self> {
        // Create PostgreSQL pool
        let db = db::create_pool(config)
            .await
            .context("failed to create database pool")?;

        // Run migrations
        db::run_migrations(&db)
            .await
            .context("failed to run migrations")?;

        let storage = Arc::new(LocalFileStorage::new(
            config.uploads_dir.clone(),
            config.files_url.clone(),
        ));

        let files = Arc::new(FileService::new(storage.clone()));

        let previews = Arc::new(PreviewGenerator::new(
            config.rasterizer_bin.clone(),
            storage.clone(),
            config.previews_dir.clone(),
        ));

        let compositor = Arc::new(
            ExportCompositor::new(
                &config.templates_dir,
                config.latex_bin.clone(),
                Duration::from_secs(config.latex_timeout_secs),
                storage.clone(),
            )
            .context("failed to initialize export compositor")?,
        );

        let revisions: Arc<dyn RevisionStore> = Arc::new(DbRevisionStore::new(db.clone()));

        let pipeline = Arc::new(ContentPipeline::new(
            db.clone(),
            files.clone(),
            previews.clone(),
            compositor.clone(),
            revisions.clone(),
        ));

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config: config.clone(),
                db,
                storage,
                files,
                previews,
                compositor,
                pipeline,
                revisions,
            }),
        })
    }

    /// Database connection pool.
    pub fn db(&self) -> &PgPool {
        &self.inner.db
    }

    /// Application configuration.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// File storage backend.
    pub fn storage(&self) -> &Arc<LocalFileStorage> {
        &self.inner.storage
    }

    /// File upload service.
    pub fn files(&self) -> &Arc<FileService> {
        &self.inner.files
    }

    /// Preview generator.
    pub fn previews(&self) -> &Arc<PreviewGenerator> {
        &self.inner.previews
    }

    /// Export compositor.
    pub fn compositor(&self) -> &Arc<ExportCompositor> {
        &self.inner.compositor
    }

    /// Content pipeline.
    pub fn pipeline(&self) -> &Arc<ContentPipeline> {
        &self.inner.pipeline
    }

    /// Revision store.
    pub fn revisions(&self) -> &Arc<dyn RevisionStore> {
        &self.inner.revisions
    }
}
