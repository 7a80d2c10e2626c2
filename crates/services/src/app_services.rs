use std::sync::Arc;

use tracing::{info, warn};

use quiz_core::model::QuizSettings;
use storage::local::JsonFileStore;
use storage::memory::MemoryStore;
use storage::repository::{PersistentStore, Storage};

use crate::Clock;
use crate::auth::SessionStore;
use crate::config::AppConfig;
use crate::content::QuestionCatalog;
use crate::error::AppServicesError;
use crate::results::ResultsLedger;
use crate::sessions::QuizRunner;

/// Assembles app-facing services over one storage bundle.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    settings: QuizSettings,
    session_store: Arc<SessionStore>,
    catalog: Arc<QuestionCatalog>,
    ledger: Arc<ResultsLedger>,
}

impl AppServices {
    #[must_use]
    pub fn new(config: AppConfig, clock: Clock, storage: &Storage) -> Self {
        Self {
            clock,
            settings: config.settings,
            session_store: Arc::new(SessionStore::new(clock, storage)),
            catalog: Arc::new(QuestionCatalog::new(clock, storage, config.fallback)),
            ledger: Arc::new(ResultsLedger::new(clock, config.settings, storage)),
        }
    }

    /// Build services over the backend `config` selects: HTTP when an API url is
    /// set, otherwise `SQLite` when a database url is set, otherwise in memory.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the local store or the backend cannot be opened.
    pub async fn from_config(config: AppConfig, clock: Clock) -> Result<Self, AppServicesError> {
        let local: Arc<dyn PersistentStore> = match &config.local_store {
            Some(path) => Arc::new(JsonFileStore::open(path)?),
            None => Arc::new(MemoryStore::new()),
        };

        let storage = if let Some(base) = &config.api_url {
            info!(api_url = %base, "using http backend");
            Storage::http(base.clone(), config.request_timeout, local)?
        } else if let Some(db_url) = &config.db_url {
            info!(db_url = %db_url, "using sqlite backend");
            Storage::sqlite(db_url, local).await?
        } else {
            warn!("no backend configured; content and results stay in memory");
            let mut storage = Storage::in_memory();
            storage.local = local;
            storage
        };

        Ok(Self::new(config, clock, &storage))
    }

    /// Rehydrate the signed-in user and load content and results.
    ///
    /// Load failures are logged and leave the affected service empty.
    pub async fn warm_up(&self) {
        if let Some(identity) = self.session_store.restore() {
            info!(user_id = %identity.id(), "restored signed-in user");
        }
        match self.catalog.load_questions().await {
            Ok(source) => info!(?source, count = self.catalog.questions().len(), "questions loaded"),
            Err(e) => warn!(error = %e, "could not load questions"),
        }
        if let Err(e) = self.catalog.load_quizzes().await {
            warn!(error = %e, "could not load quizzes");
        }
        if let Err(e) = self.ledger.load_results().await {
            warn!(error = %e, "could not load results");
        }
    }

    /// A fresh runner using the configured settings.
    #[must_use]
    pub fn runner(&self) -> QuizRunner {
        QuizRunner::new(self.clock, self.settings)
    }

    #[must_use]
    pub fn settings(&self) -> QuizSettings {
        self.settings
    }

    #[must_use]
    pub fn session_store(&self) -> Arc<SessionStore> {
        Arc::clone(&self.session_store)
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<QuestionCatalog> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn ledger(&self) -> Arc<ResultsLedger> {
        Arc::clone(&self.ledger)
    }
}
