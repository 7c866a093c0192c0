//! Search lifecycle controller.
//!
//! Owns start/poll/cancel orchestration for the current search run, keeps a local
//! mirror of the run, and emits events for presentation layers.

use crate::api::SearchService;
use crate::model::{
    CreateSearchRequest, HistoryQuery, InfoEvent, Lead, ManualOverride, SearchEvent,
    SearchParameters, SearchRun, SearchStatus, SourceState,
};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::Duration;

pub(crate) const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1500);

const START_FAILED: &str = "Failed to start search";
const RESUME_FAILED: &str = "Failed to load search";
const POLL_FAILED: &str = "Failed to fetch search status";
const CANCEL_FAILED: &str = "Failed to cancel search";
const HISTORY_FAILED: &str = "Failed to load search history";

/// Failures surfaced to the caller. Poll failures never show up here.
#[derive(Debug, Error)]
pub(crate) enum SearchError {
    #[error("{0}")]
    Submission(String),
    #[error("{0}")]
    Resume(String),
    #[error("{0}")]
    Cancellation(String),
    #[error("{0}")]
    History(String),
}

/// Read-only projection of the current run for view layers.
#[derive(Debug, Clone, Default)]
pub(crate) struct RunSnapshot {
    pub status: SearchStatus,
    pub run: Option<SearchRun>,
    pub error: Option<String>,
}

impl RunSnapshot {
    pub fn run_id(&self) -> Option<&str> {
        self.run.as_ref().map(|r| r.id.as_str())
    }

    pub fn progress(&self) -> f64 {
        self.run.as_ref().map(|r| r.progress).unwrap_or(0.0)
    }

    pub fn leads(&self) -> &[Lead] {
        self.run.as_ref().map(|r| r.leads.as_slice()).unwrap_or(&[])
    }

    pub fn sources(&self) -> &[SourceState] {
        self.run.as_ref().map(|r| r.sources.as_slice()).unwrap_or(&[])
    }
}

struct RunState {
    snapshot: RunSnapshot,
    // Bumped whenever the tracked run changes; poll responses tagged with an older
    // generation are dropped.
    generation: u64,
}

struct Shared {
    state: Mutex<RunState>,
    events: Option<UnboundedSender<SearchEvent>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, RunState> {
        // State is plain data; a panic mid-update cannot leave it half-written.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, event: SearchEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    fn next_generation(&self) -> u64 {
        let mut st = self.lock();
        st.generation += 1;
        st.generation
    }

    /// Make `run` the current run, replacing the mirror wholesale.
    fn seed(&self, run: SearchRun) {
        let mut st = self.lock();
        st.snapshot = RunSnapshot {
            status: run.status,
            run: Some(run),
            error: None,
        };
    }

    fn fail(&self, message: String) {
        let mut st = self.lock();
        st.snapshot = RunSnapshot {
            status: SearchStatus::Error,
            run: None,
            error: Some(message),
        };
    }
}

enum PollOutcome {
    Continue,
    Stop,
}

/// Fetch one status snapshot and apply it if the run is still the tracked one.
async fn poll_and_apply(
    service: &dyn SearchService,
    shared: &Shared,
    search_id: &str,
    generation: u64,
) -> PollOutcome {
    tracing::debug!(search_id, "polling search status");
    match service.get_search(search_id).await {
        Ok(run) => apply_poll(shared, search_id, generation, run),
        Err(e) => {
            // Transient: keep the last known state and try again on the next tick.
            tracing::warn!(search_id, error = %e, "search status poll failed");
            shared.emit(SearchEvent::Info(InfoEvent::PollFailed {
                search_id: search_id.to_string(),
                message: e.user_message(POLL_FAILED),
            }));
            let st = shared.lock();
            if st.generation == generation && st.snapshot.status == SearchStatus::Searching {
                PollOutcome::Continue
            } else {
                PollOutcome::Stop
            }
        }
    }
}

fn apply_poll(shared: &Shared, search_id: &str, generation: u64, run: SearchRun) -> PollOutcome {
    let mut st = shared.lock();
    if st.generation != generation || st.snapshot.status != SearchStatus::Searching {
        tracing::debug!(search_id, "dropping stale poll response");
        return PollOutcome::Stop;
    }

    let status = run.status;
    let progress = run.progress;
    let leads_found = run.leads.len();
    // Leads and sources are replaced, not merged: each response is the full snapshot.
    st.snapshot.status = status;
    st.snapshot.run = Some(run);

    if status == SearchStatus::Searching {
        drop(st);
        shared.emit(SearchEvent::Progress {
            search_id: search_id.to_string(),
            progress,
            leads_found,
        });
        return PollOutcome::Continue;
    }

    let finished = st.snapshot.run.clone();
    drop(st);
    tracing::info!(search_id, %status, leads_found, "search left searching state");
    shared.emit(SearchEvent::StatusChanged {
        search_id: Some(search_id.to_string()),
        status,
    });
    if let (true, Some(run)) = (status.is_terminal(), finished) {
        shared.emit(SearchEvent::Finished { run: Box::new(run) });
    }
    PollOutcome::Stop
}

/// Client-side mirror of one search run plus the polling loop that keeps it fresh.
///
/// User operations take `&mut self`, so they never interleave with each other; the
/// only concurrent actor is the poller task, and at most one of those exists.
pub(crate) struct SearchLifecycleController {
    service: Arc<dyn SearchService>,
    shared: Arc<Shared>,
    params: SearchParameters,
    poll_interval: Duration,
    poller: Option<JoinHandle<()>>,
}

impl SearchLifecycleController {
    pub fn new(
        service: Arc<dyn SearchService>,
        params: SearchParameters,
        poll_interval: Duration,
    ) -> Self {
        Self::build(service, params, poll_interval, None)
    }

    pub fn with_events(
        service: Arc<dyn SearchService>,
        params: SearchParameters,
        poll_interval: Duration,
        event_tx: UnboundedSender<SearchEvent>,
    ) -> Self {
        Self::build(service, params, poll_interval, Some(event_tx))
    }

    fn build(
        service: Arc<dyn SearchService>,
        params: SearchParameters,
        poll_interval: Duration,
        events: Option<UnboundedSender<SearchEvent>>,
    ) -> Self {
        Self {
            service,
            shared: Arc::new(Shared {
                state: Mutex::new(RunState {
                    snapshot: RunSnapshot::default(),
                    generation: 0,
                }),
                events,
            }),
            params,
            poll_interval,
            poller: None,
        }
    }

    /// Submit a new search for `client_profile_id` with the current parameters.
    pub async fn start_search(
        &mut self,
        client_profile_id: &str,
    ) -> Result<SearchStatus, SearchError> {
        self.stop_polling();
        let generation = self.shared.next_generation();

        let request = CreateSearchRequest::new(client_profile_id, &self.params);
        tracing::info!(
            client_profile_id,
            quality_level = request.quality_level,
            manual_override = request.manual_override.is_some(),
            "starting search"
        );

        match self.service.create_search(&request).await {
            Ok(run) => {
                tracing::info!(search_id = %run.id, status = %run.status, "search started");
                Ok(self.track(run, generation))
            }
            Err(e) => {
                let message = e.user_message(START_FAILED);
                tracing::error!(client_profile_id, error = %e, "search start failed");
                self.shared.fail(message.clone());
                self.shared.emit(SearchEvent::StatusChanged {
                    search_id: None,
                    status: SearchStatus::Error,
                });
                self.shared.emit(SearchEvent::Failed {
                    message: message.clone(),
                });
                Err(SearchError::Submission(message))
            }
        }
    }

    /// Adopt an existing run as the current one, polling it if it is still in flight.
    pub async fn resume_search(&mut self, search_id: &str) -> Result<SearchStatus, SearchError> {
        self.stop_polling();
        let generation = self.shared.next_generation();
        tracing::info!(search_id, "resuming search");

        match self.service.get_search(search_id).await {
            Ok(run) => Ok(self.track(run, generation)),
            Err(e) => {
                let message = e.user_message(RESUME_FAILED);
                tracing::error!(search_id, error = %e, "search resume failed");
                self.shared.fail(message.clone());
                self.shared.emit(SearchEvent::Failed {
                    message: message.clone(),
                });
                Err(SearchError::Resume(message))
            }
        }
    }

    fn track(&mut self, run: SearchRun, generation: u64) -> SearchStatus {
        let status = run.status;
        let search_id = run.id.clone();
        let finished = status.is_terminal().then(|| run.clone());
        self.shared.seed(run);
        self.shared.emit(SearchEvent::StatusChanged {
            search_id: Some(search_id.clone()),
            status,
        });

        if status == SearchStatus::Searching {
            self.spawn_poller(search_id, generation);
        } else if let Some(run) = finished {
            self.shared.emit(SearchEvent::Finished { run: Box::new(run) });
        }
        status
    }

    /// Cancel the current run. Without a current run this only logs a warning.
    pub async fn cancel_search(&mut self) -> Result<(), SearchError> {
        let (search_id, generation) = {
            let st = self.shared.lock();
            match st.snapshot.run_id() {
                Some(id) => (id.to_string(), st.generation),
                None => {
                    tracing::warn!("cancel requested with no current search");
                    return Ok(());
                }
            }
        };

        // Stop before the request goes out so a late poll cannot flip the run back to searching.
        self.stop_polling();
        tracing::info!(search_id = %search_id, "cancelling search");

        match self.service.cancel_search(&search_id).await {
            Ok(mut run) => {
                // Cancellation is an explicit user action; the server may not have caught up yet.
                run.status = SearchStatus::Cancelled;
                tracing::info!(search_id = %search_id, leads = run.leads.len(), "search cancelled");
                self.shared.seed(run.clone());
                self.shared.emit(SearchEvent::StatusChanged {
                    search_id: Some(search_id),
                    status: SearchStatus::Cancelled,
                });
                self.shared.emit(SearchEvent::Finished { run: Box::new(run) });
                Ok(())
            }
            Err(e) => {
                let message = e.user_message(CANCEL_FAILED);
                tracing::error!(search_id = %search_id, error = %e, "search cancel failed");
                let still_searching = {
                    let mut st = self.shared.lock();
                    st.snapshot.error = Some(message.clone());
                    st.generation == generation && st.snapshot.status == SearchStatus::Searching
                };
                self.shared.emit(SearchEvent::Info(InfoEvent::CancelFailed {
                    message: message.clone(),
                }));
                if still_searching {
                    self.spawn_poller(search_id, generation);
                }
                Err(SearchError::Cancellation(message))
            }
        }
    }

    /// Fetch and apply one status snapshot for `search_id` if it is the current run.
    ///
    /// The poller is retired for the duration of the request, so at most one status
    /// request per run is ever outstanding, and restarted if the run is still searching.
    pub async fn poll_once(&mut self, search_id: &str) -> SearchStatus {
        let generation = {
            let st = self.shared.lock();
            if st.snapshot.run_id() != Some(search_id) {
                tracing::debug!(search_id, "ignoring poll for untracked search");
                return st.snapshot.status;
            }
            st.generation
        };

        self.stop_polling();
        if let PollOutcome::Continue =
            poll_and_apply(self.service.as_ref(), &self.shared, search_id, generation).await
        {
            self.spawn_poller(search_id.to_string(), generation);
        }
        self.status()
    }

    /// Drop the current run and return to idle.
    pub fn reset(&mut self) {
        self.stop_polling();
        {
            let mut st = self.shared.lock();
            st.generation += 1;
            st.snapshot = RunSnapshot::default();
        }
        tracing::debug!("search state reset");
        self.shared.emit(SearchEvent::Reset);
    }

    /// Store the quality level clamped to `[0, 1]`; in-flight runs are unaffected.
    pub fn set_quality_level(&mut self, level: f64) -> f64 {
        self.params.set_quality_level(level)
    }

    pub fn set_manual_override(&mut self, manual_override: Option<ManualOverride>) {
        self.params.manual_override = manual_override;
    }

    pub fn parameters(&self) -> &SearchParameters {
        &self.params
    }

    /// Past runs for a profile. Independent of the current run.
    pub async fn fetch_history(
        &self,
        client_profile_id: &str,
        query: &HistoryQuery,
    ) -> Result<Vec<SearchRun>, SearchError> {
        tracing::info!(client_profile_id, limit = query.effective_limit(), "fetching search history");
        match self.service.list_searches(client_profile_id, query).await {
            Ok(history) => {
                tracing::info!(client_profile_id, count = history.searches.len(), "search history loaded");
                Ok(history.searches)
            }
            Err(e) => {
                tracing::error!(client_profile_id, error = %e, "search history fetch failed");
                Err(SearchError::History(e.user_message(HISTORY_FAILED)))
            }
        }
    }

    pub fn snapshot(&self) -> RunSnapshot {
        self.shared.lock().snapshot.clone()
    }

    pub fn status(&self) -> SearchStatus {
        self.shared.lock().snapshot.status
    }

    pub fn progress(&self) -> f64 {
        self.shared.lock().snapshot.progress()
    }

    pub fn leads(&self) -> Vec<Lead> {
        self.shared.lock().snapshot.leads().to_vec()
    }

    pub fn sources(&self) -> Vec<SourceState> {
        self.shared.lock().snapshot.sources().to_vec()
    }

    pub fn error(&self) -> Option<String> {
        self.shared.lock().snapshot.error.clone()
    }

    pub fn current_run_id(&self) -> Option<String> {
        self.shared.lock().snapshot.run_id().map(str::to_string)
    }

    pub fn is_polling(&self) -> bool {
        self.poller.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn spawn_poller(&mut self, search_id: String, generation: u64) {
        // Exactly one poller: always retire the previous one first.
        self.stop_polling();

        let service = self.service.clone();
        let shared = self.shared.clone();
        let interval = self.poll_interval;
        tracing::info!(
            search_id = %search_id,
            interval_ms = interval.as_millis() as u64,
            "polling started"
        );
        shared.emit(SearchEvent::Info(InfoEvent::PollingStarted {
            search_id: search_id.clone(),
        }));

        // Polls are serialized: the next sleep starts only after the previous response was applied.
        self.poller = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if let PollOutcome::Stop =
                    poll_and_apply(service.as_ref(), &shared, &search_id, generation).await
                {
                    break;
                }
            }
            tracing::info!(search_id = %search_id, "polling stopped");
            shared.emit(SearchEvent::Info(InfoEvent::PollingStopped { search_id }));
        }));
    }

    fn stop_polling(&mut self) {
        if let Some(handle) = self.poller.take() {
            if !handle.is_finished() {
                // Aborting drops any in-flight request; its response is never applied.
                handle.abort();
                tracing::info!("polling stopped");
            }
        }
    }
}

impl Drop for SearchLifecycleController {
    fn drop(&mut self) {
        // A JoinHandle going out of scope does not stop the task.
        self.stop_polling();
    }
}
