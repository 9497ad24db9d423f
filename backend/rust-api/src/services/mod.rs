use std::sync::Arc;

use crate::config::{Config, StorageBackend};
use crate::middlewares::auth::JwtService;
use crate::store::{MemoryProgressStore, MongoProgressStore, ProgressStore};
use crate::utils::time::{Clock, SystemClock};

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn ProgressStore>,
    pub clock: Arc<dyn Clock>,
    pub jwt: JwtService,
}

impl AppState {
    /// Connects the configured backend.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store: Arc<dyn ProgressStore> = match config.storage_backend {
            StorageBackend::Mongo => {
                let client = mongodb::Client::with_uri_str(&config.mongo_uri).await?;
                let store = MongoProgressStore::new(client, &config.mongo_database);
                store.ensure_indexes().await?;
                tracing::info!("MongoDB connected, indexes ensured");
                Arc::new(store)
            }
            StorageBackend::Memory => {
                let store = match &config.catalog_path {
                    Some(path) => MemoryProgressStore::from_catalog_file(path)?,
                    None => MemoryProgressStore::new(),
                };
                tracing::warn!("Using in-memory storage; progress is lost on restart");
                Arc::new(store)
            }
        };

        Ok(Self::with_store(config, store, Arc::new(SystemClock)))
    }

    pub fn with_store(
        config: Config,
        store: Arc<dyn ProgressStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let jwt = JwtService::new(&config.jwt_secret);
        Self {
            config,
            store,
            clock,
            jwt,
        }
    }

    pub fn submissions(&self) -> submission_service::SubmissionService {
        submission_service::SubmissionService::new(self.store.clone(), self.clock.clone())
    }

    pub fn profiles(&self) -> profile_service::ProfileService {
        profile_service::ProfileService::new(self.store.clone(), self.clock.clone())
    }

    pub fn lessons(&self) -> lesson_service::LessonService {
        lesson_service::LessonService::new(self.store.clone())
    }
}

pub mod grading;
pub mod lesson_service;
pub mod level_curve;
pub mod profile_service;
pub mod streak_engine;
pub mod submission_service;
