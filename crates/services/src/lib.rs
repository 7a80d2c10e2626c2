#![forbid(unsafe_code)]

pub mod app_services;
pub mod auth;
pub mod config;
pub mod content;
pub mod error;
pub mod results;
pub mod sessions;
pub mod timer;

pub use quiz_core::Clock;

pub use app_services::AppServices;
pub use auth::{Access, SessionStore};
pub use config::AppConfig;
pub use content::{FallbackPool, PoolSource, QuestionCatalog};
pub use error::{AppServicesError, AuthError, ConfigError, ContentError, LedgerError, SessionError};
pub use results::{BucketStat, ResultAggregates, ResultsLedger};
pub use sessions::{QuizRunner, QuizSession, SessionProgress, SessionState};
pub use timer::QuizTimer;
