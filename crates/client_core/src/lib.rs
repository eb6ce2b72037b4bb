use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::Serialize;
use shared::{
    domain::{DayKey, Routine, RoutineId},
    error::StoreError,
    protocol::{CollectionPath, Document},
};
use storage::{RealtimeStore, Subscription};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{error, info};

pub mod assembler;
pub mod record;
pub mod schedule;
pub mod selection;

pub use assembler::{AssemblyPhase, ScheduleAssembler};
pub use record::{PeriodCell, PeriodRecord};
pub use schedule::{GridCell, GridRow, ScheduleIndex, WeeklyGrid};
pub use selection::reconcile_selection;

const EVENT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    RoutinesUpdated(Vec<Routine>),
    SelectionChanged(Option<Routine>),
    DayUpdated {
        routine_id: RoutineId,
        day: DayKey,
        periods: usize,
    },
    LoadingChanged(bool),
    ConnectivityChanged {
        offline: bool,
    },
    Error(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("unknown routine {0}")]
    UnknownRoutine(RoutineId),
}

/// Everything the presentation layer needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewSnapshot {
    pub routines: Vec<Routine>,
    pub selected: Option<Routine>,
    pub schedule: ScheduleIndex,
    pub phase: AssemblyPhase,
    pub loading: bool,
    pub offline: bool,
}

impl ViewSnapshot {
    pub fn grid(&self) -> WeeklyGrid {
        WeeklyGrid::build(&self.schedule)
    }
}

#[derive(Default)]
struct ClientState {
    routines: Vec<Routine>,
    selected: Option<Routine>,
    offline: bool,
    started: bool,
    routines_subscription: Option<Subscription>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn routine_from_document(document: Document) -> Routine {
    Routine {
        name: document.str_field("name").map(str::to_string),
        id: RoutineId::new(document.id),
    }
}

/// Realtime timetable client: the live routine list, the user's selection and
/// the assembled schedule of the selected routine, over one injected store.
pub struct TimetableClient {
    store: Arc<dyn RealtimeStore>,
    assembler: ScheduleAssembler,
    inner: Arc<Mutex<ClientState>>,
    /// Serializes selection transitions coming from the user and from list
    /// updates so the assembler sees them in the same order as `inner`.
    transition: Arc<Mutex<()>>,
    events: broadcast::Sender<ClientEvent>,
}

impl TimetableClient {
    pub fn new(store: Arc<dyn RealtimeStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            assembler: ScheduleAssembler::new(Arc::clone(&store), events.clone()),
            store,
            inner: Arc::new(Mutex::new(ClientState::default())),
            transition: Arc::new(Mutex::new(())),
            events,
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// Subscribes to the routine list. Calling it again is a no-op.
    pub fn start(&self) {
        {
            let mut state = lock(&self.inner);
            if state.started {
                return;
            }
            state.started = true;
        }

        let subscription = self.store.subscribe(
            &CollectionPath::routines(),
            self.routines_handler(),
            self.routines_error_handler(),
        );

        let mut state = lock(&self.inner);
        if state.started {
            state.routines_subscription = Some(subscription);
        }
    }

    fn routines_handler(&self) -> Box<dyn Fn(Vec<Document>) + Send + Sync> {
        let inner: Weak<Mutex<ClientState>> = Arc::downgrade(&self.inner);
        let transition = Arc::clone(&self.transition);
        let assembler = self.assembler.clone();
        let events = self.events.clone();
        Box::new(move |documents| {
            let Some(inner) = inner.upgrade() else {
                return;
            };
            let routines: Vec<Routine> = documents.into_iter().map(routine_from_document).collect();

            let _transition = lock(&transition);
            let (previous, next) = {
                let mut state = lock(&inner);
                let next = reconcile_selection(state.selected.as_ref(), &routines);
                state.routines = routines.clone();
                let previous = std::mem::replace(&mut state.selected, next.clone());
                (previous, next)
            };

            info!("routines: list updated count={}", routines.len());
            let _ = events.send(ClientEvent::RoutinesUpdated(routines));
            if previous != next {
                let _ = events.send(ClientEvent::SelectionChanged(next.clone()));
            }
            let previous_id = previous.as_ref().map(|routine| &routine.id);
            let next_id = next.as_ref().map(|routine| &routine.id);
            if previous_id != next_id {
                info!(
                    "routines: selected routine removed upstream id={}",
                    previous_id.map(RoutineId::as_str).unwrap_or("-")
                );
                assembler.select(next_id);
            }
        })
    }

    fn routines_error_handler(&self) -> Box<dyn Fn(StoreError) + Send + Sync> {
        let events = self.events.clone();
        Box::new(move |err| {
            error!("routines: snapshot error err={err}");
            let _ = events.send(ClientEvent::Error(format!(
                "routine list subscription failed: {err}"
            )));
        })
    }

    /// Selects a routine from the current list.
    pub fn select_routine(&self, routine_id: &RoutineId) -> Result<Routine, ClientError> {
        let _transition = lock(&self.transition);
        let (routine, changed) = {
            let mut state = lock(&self.inner);
            let routine = state
                .routines
                .iter()
                .find(|routine| &routine.id == routine_id)
                .cloned()
                .ok_or_else(|| ClientError::UnknownRoutine(routine_id.clone()))?;
            let changed = state.selected.as_ref() != Some(&routine);
            state.selected = Some(routine.clone());
            (routine, changed)
        };

        if changed {
            info!("routines: selected id={}", routine.id);
            let _ = self
                .events
                .send(ClientEvent::SelectionChanged(Some(routine.clone())));
        }
        self.assembler.select(Some(&routine.id));
        Ok(routine)
    }

    pub fn clear_selection(&self) {
        let _transition = lock(&self.transition);
        let previous = lock(&self.inner).selected.take();
        if previous.is_some() {
            info!("routines: selection cleared");
            let _ = self.events.send(ClientEvent::SelectionChanged(None));
        }
        self.assembler.select(None);
    }

    /// Connectivity is shown to the user only; subscriptions are left alone
    /// and the store client handles reconnection itself.
    pub fn set_offline(&self, offline: bool) {
        let changed = {
            let mut state = lock(&self.inner);
            std::mem::replace(&mut state.offline, offline) != offline
        };
        if changed {
            info!("connectivity: offline={offline}");
            let _ = self
                .events
                .send(ClientEvent::ConnectivityChanged { offline });
        }
    }

    pub fn routines(&self) -> Vec<Routine> {
        lock(&self.inner).routines.clone()
    }

    pub fn selected(&self) -> Option<Routine> {
        lock(&self.inner).selected.clone()
    }

    pub fn assembler(&self) -> &ScheduleAssembler {
        &self.assembler
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        let (routines, selected, offline) = {
            let state = lock(&self.inner);
            (state.routines.clone(), state.selected.clone(), state.offline)
        };
        let (schedule, phase, loading) = self.assembler.view();
        ViewSnapshot {
            routines,
            selected,
            schedule,
            phase,
            loading,
            offline,
        }
    }

    /// Releases the routine list listener and every schedule listener.
    pub fn shutdown(&self) {
        let subscription = {
            let mut state = lock(&self.inner);
            state.started = false;
            state.routines_subscription.take()
        };
        drop(subscription);
        self.assembler.shutdown();
    }
}

impl Drop for TimetableClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
