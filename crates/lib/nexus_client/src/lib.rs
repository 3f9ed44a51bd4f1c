//! # nexus_client
//!
//! Session, health-record and insight client for the Nexus API.
//!
//! The [`Session`] returned by [`SessionManager::login`] is passed
//! explicitly to every authenticated call; nothing reads the token from
//! global state.

pub mod config;
pub mod error;
pub mod gateway;
pub mod insights;
pub mod records;
pub mod session;

pub use config::ClientConfig;
pub use error::{AuthError, HttpError, RecordError};
pub use gateway::ApiGateway;
pub use insights::{FetchOutcome, InsightFeed, InsightService, Trigger};
pub use records::{HealthRecordStore, RecordList};
pub use session::{AccessToken, Session, SessionManager, SessionState};

/// All client components wired to one backend.
pub struct NexusClient {
    pub sessions: SessionManager,
    pub records: HealthRecordStore,
    pub insights: InsightService,
}

impl NexusClient {
    pub fn new(config: &ClientConfig) -> Result<Self, HttpError> {
        let gateway = ApiGateway::new(config)?;
        Ok(Self {
            sessions: SessionManager::new(gateway.clone()),
            records: HealthRecordStore::new(gateway.clone()),
            insights: InsightService::new(gateway),
        })
    }

    /// Fresh list view state for the entry screen.
    pub fn record_list(&self) -> RecordList {
        RecordList::new(self.records.clone())
    }

    /// Fresh view state for the insights screen.
    pub fn insight_feed(&self) -> InsightFeed {
        InsightFeed::new(self.insights.clone())
    }
}
