//! Insight service and the insight view state.
//!
//! Fetches are not coalesced or cancelled. Every fetch started through an
//! [`InsightFeed`] takes a sequence number and only the response to the most
//! recently *issued* fetch is applied, whatever order responses arrive in.

use std::sync::{Mutex, MutexGuard, PoisonError};

use nexus_core::models::health::Insight;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::HttpError;
use crate::gateway::{ApiGateway, Method};
use crate::session::{Session, SessionManager};

const INSIGHTS_PATH: &str = "ai/";

/// Requests AI insights derived from the account's stored entries.
#[derive(Clone, Debug)]
pub struct InsightService {
    gateway: ApiGateway,
}

impl InsightService {
    pub fn new(gateway: ApiGateway) -> Self {
        Self { gateway }
    }

    /// One insight request. Depends only on the session.
    pub async fn fetch_insight(&self, session: &Session) -> Result<Insight, HttpError> {
        self.gateway
            .request_json(Method::POST, INSIGHTS_PATH, Some(&json!({})), Some(session.token()))
            .await
    }
}

/// What started a fetch. At most one fetch per trigger is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// Fetch issued when the view opens.
    InitialLoad,
    /// Fetch issued by the user's refresh action.
    Refresh,
}

impl Trigger {
    fn slot(self) -> usize {
        match self {
            Trigger::InitialLoad => 0,
            Trigger::Refresh => 1,
        }
    }
}

/// Result of [`InsightFeed::fetch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The response was applied to the feed.
    Applied(Insight),
    /// A fetch from the same trigger is already running; nothing was sent.
    Busy,
    /// The response was dropped: a newer fetch was issued, the feed was
    /// closed or the session ended before it arrived. Also returned without
    /// a request when the session had already ended.
    Discarded,
    /// The fetch failed. The previous insight stays on display.
    Failed(HttpError),
}

#[derive(Debug, Default)]
struct FeedState {
    /// Session the displayed insight and error belong to.
    owner: Option<u64>,
    insight: Option<Insight>,
    last_error: Option<HttpError>,
    /// Sequence number of the running fetch, per trigger.
    in_flight: [Option<u64>; 2],
    latest_seq: u64,
    closed: bool,
}

/// View state for the insights screen.
#[derive(Debug)]
pub struct InsightFeed {
    service: InsightService,
    state: Mutex<FeedState>,
}

/// Clears the trigger's in-flight mark even if the fetch future is dropped.
struct InFlight<'a> {
    feed: &'a InsightFeed,
    trigger: Trigger,
    seq: u64,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.feed.lock();
        let slot = &mut state.in_flight[self.trigger.slot()];
        if *slot == Some(self.seq) {
            *slot = None;
        }
    }
}

impl InsightFeed {
    pub fn new(service: InsightService) -> Self {
        Self {
            service,
            state: Mutex::new(FeedState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insight currently on display.
    pub fn insight(&self) -> Option<Insight> {
        self.lock().insight.clone()
    }

    pub fn last_error(&self) -> Option<HttpError> {
        self.lock().last_error.clone()
    }

    /// Whether `trigger` has a fetch running (its control should be disabled).
    pub fn is_loading(&self, trigger: Trigger) -> bool {
        self.lock().in_flight[trigger.slot()].is_some()
    }

    /// Mark the view as gone. Responses arriving afterwards are dropped.
    pub fn close(&self) {
        self.lock().closed = true;
    }

    /// Fetch a fresh insight and apply it if it is still wanted.
    ///
    /// The first fetch under a session other than the one that filled the
    /// feed clears the displayed insight and error before anything is sent.
    pub async fn fetch(
        &self,
        trigger: Trigger,
        sessions: &SessionManager,
        session: &Session,
    ) -> FetchOutcome {
        let (seq, _in_flight) = {
            let mut state = self.lock();
            if state.closed || !sessions.is_current(session) {
                return FetchOutcome::Discarded;
            }
            if state.owner != Some(session.id()) {
                if state.owner.is_some() {
                    debug!(session_id = session.id(), "new session; clearing insight");
                }
                state.owner = Some(session.id());
                state.insight = None;
                state.last_error = None;
                state.in_flight = [None; 2];
            }
            if state.in_flight[trigger.slot()].is_some() {
                debug!(?trigger, "insight fetch already running");
                return FetchOutcome::Busy;
            }
            state.latest_seq += 1;
            let seq = state.latest_seq;
            state.in_flight[trigger.slot()] = Some(seq);
            (seq, InFlight { feed: self, trigger, seq })
        };
        debug!(?trigger, seq, "insight fetch issued");

        let result = self.service.fetch_insight(session).await;
        let was_current = sessions.is_current(session);
        let result = sessions.observe(session, result);

        let mut state = self.lock();
        if state.closed || !was_current || seq != state.latest_seq {
            debug!(?trigger, seq, latest = state.latest_seq, "dropping superseded insight response");
            return FetchOutcome::Discarded;
        }
        match result {
            Ok(insight) => {
                state.insight = Some(insight.clone());
                state.last_error = None;
                FetchOutcome::Applied(insight)
            }
            Err(err) => {
                warn!(?trigger, error = %err, "insight fetch failed");
                state.last_error = Some(err.clone());
                FetchOutcome::Failed(err)
            }
        }
    }
}
