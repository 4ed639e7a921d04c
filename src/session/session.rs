use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use crate::core::{normalize_batch, SearchEngine};
use crate::models::{Coordinate, Criteria, CriteriaUpdate, RawServiceRecord, ResultSet, ServiceRecord};
use crate::services::{LocationError, LocationProvider, ServiceDataSource};
use crate::session::debounce::{DebounceScheduler, DEFAULT_QUIESCENCE};
use crate::session::store::{CriteriaError, CriteriaStore};

/// Errors surfaced to the owner of a session
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SessionError {
    #[error("Failed to load services: {0}")]
    Fetch(String),

    #[error(transparent)]
    Criteria(#[from] CriteriaError),

    #[error("Search session has shut down")]
    Closed,
}

/// Session tuning
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub quiescence: Duration,
    pub initial_criteria: Criteria,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            quiescence: DEFAULT_QUIESCENCE,
            initial_criteria: Criteria::default(),
        }
    }
}

/// What the rendering layer sees
#[derive(Debug, Clone)]
pub struct SessionView {
    /// Latest published result; kept when a later fetch fails
    pub results: Arc<ResultSet>,
    pub last_error: Option<SessionError>,
    /// Why the user location is unknown; distance filtering is off while set
    pub location_error: Option<LocationError>,
    /// Number of pipeline runs so far
    pub executions: u64,
}

impl Default for SessionView {
    fn default() -> Self {
        Self {
            results: Arc::new(ResultSet::empty()),
            last_error: None,
            location_error: None,
            executions: 0,
        }
    }
}

enum Command {
    UpdateCriteria(CriteriaUpdate, oneshot::Sender<Result<u64, SessionError>>),
    ReplaceRecords(Vec<RawServiceRecord>, oneshot::Sender<u64>),
    SetLocation(Option<Coordinate>, oneshot::Sender<u64>),
    LocationFailed(LocationError, oneshot::Sender<u64>),
    ReportError(SessionError, oneshot::Sender<()>),
    CurrentCriteria(oneshot::Sender<Arc<Criteria>>),
}

/// Handle to a running search session
///
/// All session state lives on one task; this handle only sends it
/// commands. Dropping every handle stops the task.
pub struct SearchSession {
    id: Uuid,
    commands: mpsc::UnboundedSender<Command>,
    view: watch::Receiver<SessionView>,
    task: JoinHandle<()>,
}

impl SearchSession {
    /// Start a session on the current tokio runtime
    pub fn spawn(options: SessionOptions) -> Result<Self, SessionError> {
        let store = CriteriaStore::new(options.initial_criteria)?;
        let id = Uuid::new_v4();

        let (commands, rx) = mpsc::unbounded_channel();
        let (view_tx, view) = watch::channel(SessionView::default());

        let state = SessionState {
            store,
            records: Arc::from(Vec::new()),
            location: None,
            scheduler: DebounceScheduler::new(options.quiescence),
            engine: SearchEngine::new(),
            view: view_tx,
        };

        let span = tracing::info_span!("search_session", session_id = %id);
        let task = tokio::spawn(state.run(rx).instrument(span));

        tracing::info!("Search session {} started", id);

        Ok(Self {
            id,
            commands,
            view,
            task,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Snapshot of the published state
    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    /// Receiver notified on every publication
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    /// Wait for the first publication computed at or after `version`
    pub async fn wait_for_version(&self, version: u64) -> Result<SessionView, SessionError> {
        let mut rx = self.subscribe();
        let view = rx
            .wait_for(|view| view.results.version >= version)
            .await
            .map_err(|_| SessionError::Closed)?;
        Ok(view.clone())
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.commands.send(build(tx)).map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    /// Apply a partial criteria change; returns the change's scheduler version
    pub async fn update_criteria(&self, update: CriteriaUpdate) -> Result<u64, SessionError> {
        self.request(|tx| Command::UpdateCriteria(update, tx)).await?
    }

    /// Replace the whole listing collection
    pub async fn replace_records(&self, records: Vec<RawServiceRecord>) -> Result<u64, SessionError> {
        self.request(|tx| Command::ReplaceRecords(records, tx)).await
    }

    /// Set or clear the user location
    pub async fn set_location(&self, location: Option<Coordinate>) -> Result<u64, SessionError> {
        self.request(|tx| Command::SetLocation(location, tx)).await
    }

    /// Record a failed location lookup and drop the distance filter
    pub async fn location_unavailable(&self, error: LocationError) -> Result<u64, SessionError> {
        self.request(|tx| Command::LocationFailed(error, tx)).await
    }

    pub async fn criteria(&self) -> Result<Arc<Criteria>, SessionError> {
        self.request(Command::CurrentCriteria).await
    }

    /// Initial bulk fetch plus one-shot geolocation
    ///
    /// Location failures only disable the distance filter and are reported
    /// through [`SessionView::location_error`]. A fetch failure
    /// is recorded on the view and returned; earlier results stay
    /// published and the pipeline is not scheduled.
    pub async fn load<D, L>(&self, source: &D, locator: &L) -> Result<u64, SessionError>
    where
        D: ServiceDataSource,
        L: LocationProvider,
    {
        let (fetched, located) = tokio::join!(source.fetch_services(), locator.current_location());

        let records = match fetched {
            Ok(records) => records,
            Err(e) => {
                tracing::error!("Failed to fetch services: {}", e);
                let error = SessionError::Fetch(e.to_string());
                self.request(|tx| Command::ReportError(error.clone(), tx)).await?;
                return Err(error);
            }
        };

        match located {
            Ok(coordinate) => self.set_location(Some(coordinate)).await?,
            Err(e) => self.location_unavailable(e).await?,
        };
        self.replace_records(records).await
    }

    /// Stop the session task and wait for it to finish
    pub async fn shutdown(self) {
        let Self { commands, task, id, .. } = self;
        drop(commands);
        if let Err(e) = task.await {
            tracing::error!("Search session {} ended abnormally: {}", id, e);
        }
    }
}

/// Everything owned by the session task
struct SessionState {
    store: CriteriaStore,
    records: Arc<[ServiceRecord]>,
    location: Option<Coordinate>,
    scheduler: DebounceScheduler,
    engine: SearchEngine,
    view: watch::Sender<SessionView>,
}

impl SessionState {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        loop {
            let deadline = self.scheduler.deadline();

            tokio::select! {
                command = rx.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                _ = sleep_until(deadline), if deadline.is_some() => {
                    if let Some(version) = self.scheduler.poll(tokio::time::Instant::now()) {
                        self.execute(version);
                    }
                }
            }
        }

        self.scheduler.cancel();
        tracing::info!("Search session stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::UpdateCriteria(update, reply) => {
                let outcome = self
                    .store
                    .apply(&update)
                    .map(|criteria_version| {
                        tracing::debug!("Criteria updated to v{}", criteria_version);
                        self.changed()
                    })
                    .map_err(|e| {
                        tracing::warn!("Rejected criteria update: {}", e);
                        SessionError::from(e)
                    });
                let _ = reply.send(outcome);
            }
            Command::ReplaceRecords(raws, reply) => {
                let batch = normalize_batch(&raws);
                tracing::info!(
                    "Loaded {} listings ({} eligible, {} excluded)",
                    raws.len(),
                    batch.records.len(),
                    batch.excluded
                );
                self.records = Arc::from(batch.records);
                self.view.send_if_modified(|view| view.last_error.take().is_some());
                let _ = reply.send(self.changed());
            }
            Command::SetLocation(location, reply) => {
                self.location = location;
                if location.is_some() {
                    self.view.send_if_modified(|view| view.location_error.take().is_some());
                }
                let _ = reply.send(self.changed());
            }
            Command::LocationFailed(error, reply) => {
                tracing::warn!("Location unavailable, distance filter disabled: {}", error);
                self.location = None;
                self.view.send_modify(|view| view.location_error = Some(error));
                let _ = reply.send(self.changed());
            }
            Command::ReportError(error, reply) => {
                self.view.send_modify(|view| view.last_error = Some(error));
                let _ = reply.send(());
            }
            Command::CurrentCriteria(reply) => {
                let _ = reply.send(self.store.current());
            }
        }
    }

    fn changed(&mut self) -> u64 {
        self.scheduler
            .notify_change(tokio::time::Instant::now())
            .version
    }

    fn execute(&mut self, version: u64) {
        let criteria = self.store.current();
        let result = self
            .engine
            .search(&self.records, &criteria, self.location, version);

        self.publish(result);
    }

    /// Publish unless a newer version already went out
    fn publish(&mut self, result: ResultSet) {
        let version = result.version;
        if !self.scheduler.is_current(version) {
            tracing::debug!("Discarding stale result v{}", version);
            return;
        }

        let published = self.view.send_if_modified(|view| {
            if view.results.version > version {
                return false;
            }
            view.results = Arc::new(result);
            view.executions += 1;
            true
        });

        if published {
            tracing::debug!("Published result v{}", version);
        }
    }
}

async fn sleep_until(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
