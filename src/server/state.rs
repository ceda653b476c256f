//! Shared application state for the HTTP server.
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use crate::agent::{AgentServices, AgentSettings, Dispatcher};
use crate::config::{Config, IndexStoreKind};
use crate::db::{Db, SharedDb};
use crate::embedder;
use crate::indexer::{Indexer, TextChunker};
use crate::llm::GeminiClient;
use crate::retrieval::Retriever;
use crate::search::DuckDuckGoSearch;
use crate::speech::{AudioStore, GoogleTranslateTts};
use crate::vector::store::{IndexStore, MemoryIndexStore, SqliteIndexStore};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    db: SharedDb,
    retriever: Arc<Retriever>,
    dispatcher: Dispatcher,
}

impl AppState {
    /// Wire up every collaborator named by `config`.
    ///
    /// Opening the embedder can download model files, so it runs on the
    /// blocking pool.
    pub async fn from_config(config: Config) -> Result<Self> {
        config.validate()?;

        let db = Db::open(&config.db_path)
            .with_context(|| format!("failed to open database: {}", config.db_path))?
            .into_shared();

        let embedding_config = config.embedding.clone();
        let embedder = tokio::task::spawn_blocking(move || embedder::from_config(&embedding_config))
            .await
            .context("embedder initialization task failed")??;
        info!(
            "Embedder: {} ({} dimensions)",
            embedder.name(),
            embedder.dimensions()
        );

        let store: Arc<dyn IndexStore> = match config.index_store {
            IndexStoreKind::Sqlite => Arc::new(SqliteIndexStore::new(db.clone())),
            IndexStoreKind::Memory => Arc::new(MemoryIndexStore::new()),
        };
        info!("Index store: {}", store.name());

        let chunker = TextChunker::new(config.chunk_size, config.chunk_overlap)?;
        let indexer = Indexer::new(
            embedder,
            chunker,
            Duration::from_secs(config.embedding.timeout_secs),
        );
        let retriever = Arc::new(Retriever::new(indexer, store));

        let services = AgentServices {
            db,
            retriever,
            llm: Arc::new(GeminiClient::from_config(&config.llm)?),
            tts: Arc::new(GoogleTranslateTts::from_config(&config.tts)?),
            audio: AudioStore::new(&config.server.static_dir),
            search: Arc::new(DuckDuckGoSearch::from_config(&config.search)?),
        };
        Ok(Self::from_services(config, services))
    }

    /// Build state around already constructed collaborators.
    pub fn from_services(config: Config, services: AgentServices) -> Self {
        let settings = AgentSettings::from_config(&config);
        let db = services.db.clone();
        let retriever = Arc::clone(&services.retriever);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                db,
                retriever,
                dispatcher: Dispatcher::new(services, settings),
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn db(&self) -> &SharedDb {
        &self.inner.db
    }

    pub fn retriever(&self) -> &Retriever {
        &self.inner.retriever
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }
}
