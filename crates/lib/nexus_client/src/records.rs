//! Health record store and the list view state derived from it.
//!
//! The server is the only source of truth. The in-memory list is replaced
//! wholesale by every successful fetch and never patched locally; a failed
//! fetch or mutation leaves it as it was.

use nexus_core::models::health::{EntryId, HealthEntry, Metrics, MutationResponse};
use nexus_core::validation::MeasurementForm;
use tracing::{debug, info};

use crate::error::{HttpError, RecordError};
use crate::gateway::{ApiGateway, Method};
use crate::session::{Session, SessionManager};

const HEALTHDATA_PATH: &str = "healthdata/";

fn entry_path(id: EntryId) -> String {
    format!("healthdata/{id}")
}

/// CRUD over the authenticated user's health entries.
#[derive(Clone, Debug)]
pub struct HealthRecordStore {
    gateway: ApiGateway,
}

impl HealthRecordStore {
    pub fn new(gateway: ApiGateway) -> Self {
        Self { gateway }
    }

    /// All entries, in server order.
    pub async fn list(&self, session: &Session) -> Result<Vec<HealthEntry>, HttpError> {
        self.gateway
            .request_json::<(), _>(Method::GET, HEALTHDATA_PATH, None, Some(session.token()))
            .await
    }

    /// Submit a new entry and return the stored version of it.
    ///
    /// The returned entry comes from a fresh listing, so it carries the
    /// server-assigned id and timestamp.
    pub async fn create(&self, session: &Session, metrics: &Metrics) -> Result<HealthEntry, HttpError> {
        let id = self.send_create(session, metrics).await?;
        self.fetch_stored(session, id).await
    }

    /// Replace all three metrics of entry `id`.
    pub async fn update(
        &self,
        session: &Session,
        id: EntryId,
        metrics: &Metrics,
    ) -> Result<HealthEntry, HttpError> {
        match self.send_update(session, id, metrics).await? {
            Some(entry) => Ok(entry),
            None => self.fetch_stored(session, id).await,
        }
    }

    /// `POST` only; returns the acknowledged id.
    async fn send_create(&self, session: &Session, metrics: &Metrics) -> Result<EntryId, HttpError> {
        let resp: MutationResponse = self
            .gateway
            .request_json(Method::POST, HEALTHDATA_PATH, Some(metrics), Some(session.token()))
            .await?;
        let id = resp
            .entry_id()
            .ok_or_else(|| HttpError::Decode("create response carried no entry id".into()))?;
        debug!(entry_id = id, "health entry created");
        Ok(id)
    }

    /// `PUT` only; returns the entry when the server echoed it back.
    async fn send_update(
        &self,
        session: &Session,
        id: EntryId,
        metrics: &Metrics,
    ) -> Result<Option<HealthEntry>, HttpError> {
        let resp: MutationResponse = self
            .gateway
            .request_json(Method::PUT, &entry_path(id), Some(metrics), Some(session.token()))
            .await?;
        Ok(match resp {
            MutationResponse::Entry(entry) if entry.id == id => Some(entry),
            _ => None,
        })
    }

    /// Remove entry `id`. An unknown id is [`HttpError::NotFound`].
    pub async fn delete(&self, session: &Session, id: EntryId) -> Result<(), HttpError> {
        self.gateway
            .request::<()>(Method::DELETE, &entry_path(id), None, Some(session.token()))
            .await
            .map(|_| ())
    }

    async fn fetch_stored(&self, session: &Session, id: EntryId) -> Result<HealthEntry, HttpError> {
        self.list(session)
            .await?
            .into_iter()
            .find(|entry| entry.id == id)
            .ok_or_else(|| HttpError::NotFound {
                detail: format!("entry {id} not listed after write"),
            })
    }
}

/// View state for the entry list screen.
///
/// Belongs to one session at a time. The first call made under a different
/// session drops everything the previous one loaded.
#[derive(Debug)]
pub struct RecordList {
    store: HealthRecordStore,
    owner: Option<u64>,
    entries: Vec<HealthEntry>,
    last_error: Option<RecordError>,
    pending_edit: Option<EntryId>,
}

impl RecordList {
    pub fn new(store: HealthRecordStore) -> Self {
        Self {
            store,
            owner: None,
            entries: Vec::new(),
            last_error: None,
            pending_edit: None,
        }
    }

    /// Last successfully fetched entries (possibly stale after a failure).
    pub fn entries(&self) -> &[HealthEntry] {
        &self.entries
    }

    pub fn get(&self, id: EntryId) -> Option<&HealthEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Error from the most recent failed server call, for a banner.
    pub fn last_error(&self) -> Option<&RecordError> {
        self.last_error.as_ref()
    }

    /// Entry currently being edited, if any.
    pub fn pending_edit(&self) -> Option<EntryId> {
        self.pending_edit
    }

    /// Refetch the list. Run on every focus of the screen.
    pub async fn refresh(&mut self, sessions: &SessionManager, session: &Session) -> Result<(), RecordError> {
        self.claim(sessions, session)?;
        let result = self.store.list(session).await;
        let entries = self.settle(sessions, session, result)?;
        debug!(count = entries.len(), "entry list refreshed");
        self.entries = entries;
        self.last_error = None;
        Ok(())
    }

    /// Start editing `id`; returns the form seeded from the listed entry.
    pub fn begin_edit(&mut self, id: EntryId) -> Result<MeasurementForm, RecordError> {
        let entry = self.get(id).ok_or(RecordError::UnknownEntry(id))?;
        let form = MeasurementForm::seeded_from(entry);
        self.pending_edit = Some(id);
        Ok(form)
    }

    pub fn cancel_edit(&mut self) {
        self.pending_edit = None;
    }

    /// Validate `form`, then create a new entry or update the one being
    /// edited, and refresh the list.
    ///
    /// The pending edit is cleared once the request is sent, whatever its
    /// outcome. A validation failure sends nothing and keeps it.
    ///
    /// Once the write is acknowledged this succeeds even if the refresh
    /// fails; the refresh error stays in [`last_error`](Self::last_error) and
    /// the returned entry is the one echoed by the server or, failing that,
    /// built from what was sent.
    pub async fn submit(
        &mut self,
        sessions: &SessionManager,
        session: &Session,
        form: &MeasurementForm,
    ) -> Result<HealthEntry, RecordError> {
        let metrics = form.to_metrics().map_err(RecordError::Validation)?;
        self.claim(sessions, session)?;

        let result = match self.pending_edit.take() {
            Some(id) => self
                .store
                .send_update(session, id, &metrics)
                .await
                .map(|echoed| (id, echoed)),
            None => self
                .store
                .send_create(session, &metrics)
                .await
                .map(|id| (id, None)),
        };
        let (id, echoed) = self.settle(sessions, session, result)?;
        info!(entry_id = id, "health entry saved");

        let listed = match self.refresh(sessions, session).await {
            Ok(()) => self.get(id).cloned(),
            Err(e) => {
                debug!(error = %e, "refresh after save failed");
                None
            }
        };
        Ok(listed.or(echoed).unwrap_or_else(|| HealthEntry {
            id,
            weight: metrics.weight,
            blood_pressure: metrics.blood_pressure.into(),
            glucose: metrics.glucose,
            timestamp: None,
        }))
    }

    /// Delete `id`, then refresh the list.
    pub async fn remove(
        &mut self,
        sessions: &SessionManager,
        session: &Session,
        id: EntryId,
    ) -> Result<(), RecordError> {
        self.claim(sessions, session)?;
        let result = self.store.delete(session, id).await;
        let outcome = self.settle(sessions, session, result);
        let not_found = matches!(outcome, Err(RecordError::Http(HttpError::NotFound { .. })));

        if outcome.is_ok() || not_found {
            if self.pending_edit == Some(id) {
                self.pending_edit = None;
            }
            if let Err(e) = self.refresh(sessions, session).await {
                debug!(error = %e, "refresh after delete failed");
            }
        }
        match &outcome {
            Ok(()) => info!(entry_id = id, "health entry deleted"),
            // A successful refetch clears the banner; keep the delete failure.
            Err(err @ RecordError::Http(_)) => self.last_error = Some(err.clone()),
            Err(_) => {}
        }
        outcome
    }

    /// Refuse work for a session that already ended, and forget state left
    /// behind by a different one.
    fn claim(&mut self, sessions: &SessionManager, session: &Session) -> Result<(), RecordError> {
        if !sessions.is_current(session) {
            return Err(RecordError::SessionEnded);
        }
        if self.owner != Some(session.id()) {
            if self.owner.is_some() {
                debug!(session_id = session.id(), "new session; clearing entry list");
            }
            self.owner = Some(session.id());
            self.entries.clear();
            self.pending_edit = None;
            self.last_error = None;
        }
        Ok(())
    }

    /// Route a server result through the session manager and drop it if the
    /// session ended meanwhile, whether it succeeded or failed. Failures
    /// under a live session are remembered for display.
    fn settle<T>(
        &mut self,
        sessions: &SessionManager,
        session: &Session,
        result: Result<T, HttpError>,
    ) -> Result<T, RecordError> {
        let was_current = sessions.is_current(session);
        let result = sessions.observe(session, result);
        if !was_current {
            debug!(session_id = session.id(), "discarding response for ended session");
            return Err(RecordError::SessionEnded);
        }
        result.map_err(|e| {
            let err = RecordError::Http(e);
            self.last_error = Some(err.clone());
            err
        })
    }
}
