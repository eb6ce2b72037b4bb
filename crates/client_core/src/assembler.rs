//! Per-day realtime subscriptions for the selected routine, merged into one
//! [`ScheduleIndex`].

use std::{
    collections::HashMap,
    mem,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

use serde::Serialize;
use shared::{
    domain::{DayKey, RoutineId},
    error::StoreError,
    protocol::{CollectionPath, Document},
};
use storage::{RealtimeStore, Subscription};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{record::PeriodRecord, schedule::ScheduleIndex, ClientEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssemblyPhase {
    Idle,
    Loading,
    Ready,
}

struct AssemblerState {
    selection: Option<RoutineId>,
    /// Bumped on every selection transition; deliveries carrying an older
    /// value are discarded.
    generation: u64,
    index: ScheduleIndex,
    loading: bool,
    subscriptions: HashMap<DayKey, Subscription>,
}

impl AssemblerState {
    fn phase(&self) -> AssemblyPhase {
        match (&self.selection, self.loading) {
            (None, _) => AssemblyPhase::Idle,
            (Some(_), true) => AssemblyPhase::Loading,
            (Some(_), false) => AssemblyPhase::Ready,
        }
    }
}

fn lock_state(state: &Mutex<AssemblerState>) -> MutexGuard<'_, AssemblerState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone)]
pub struct ScheduleAssembler {
    store: Arc<dyn RealtimeStore>,
    state: Arc<Mutex<AssemblerState>>,
    events: broadcast::Sender<ClientEvent>,
}

impl ScheduleAssembler {
    pub fn new(store: Arc<dyn RealtimeStore>, events: broadcast::Sender<ClientEvent>) -> Self {
        Self {
            store,
            state: Arc::new(Mutex::new(AssemblerState {
                selection: None,
                generation: 0,
                index: ScheduleIndex::new(),
                loading: false,
                subscriptions: HashMap::new(),
            })),
            events,
        }
    }

    fn state(&self) -> MutexGuard<'_, AssemblerState> {
        lock_state(&self.state)
    }

    /// Points the assembler at `routine`, or at nothing.
    ///
    /// Every subscription of the previous selection is released and the index
    /// is emptied before the new day subscriptions are opened. Selecting the
    /// routine that is already active is a no-op.
    pub fn select(&self, routine: Option<&RoutineId>) {
        let (previous, generation) = {
            let mut state = self.state();
            if state.selection.as_ref() == routine {
                return;
            }
            state.generation += 1;
            state.selection = routine.cloned();
            state.index = ScheduleIndex::new();
            state.loading = routine.is_some();
            (mem::take(&mut state.subscriptions), state.generation)
        };
        let released = previous.len();
        drop(previous);

        let _ = self
            .events
            .send(ClientEvent::LoadingChanged(routine.is_some()));

        let Some(routine_id) = routine else {
            info!("schedule: selection cleared released={released}");
            return;
        };
        info!("schedule: subscribing routine={routine_id} released={released}");

        let mut subscriptions = HashMap::with_capacity(DayKey::ALL.len());
        for day in DayKey::ALL {
            let path = CollectionPath::routine_day(routine_id, day);
            let subscription = self.store.subscribe(
                &path,
                self.update_handler(generation, routine_id.clone(), day),
                self.error_handler(generation, path.clone()),
            );
            subscriptions.insert(day, subscription);
        }

        let superseded = {
            let mut state = self.state();
            if state.generation == generation {
                state.subscriptions = subscriptions;
                None
            } else {
                Some(subscriptions)
            }
        };
        if superseded.is_some() {
            debug!("schedule: selection superseded while subscribing routine={routine_id}");
        }
    }

    fn update_handler(
        &self,
        generation: u64,
        routine_id: RoutineId,
        day: DayKey,
    ) -> Box<dyn Fn(Vec<Document>) + Send + Sync> {
        let state: Weak<Mutex<AssemblerState>> = Arc::downgrade(&self.state);
        let events = self.events.clone();
        Box::new(move |documents| {
            let Some(state) = state.upgrade() else {
                return;
            };
            let records: Vec<PeriodRecord> = documents
                .into_iter()
                .map(PeriodRecord::from_document)
                .collect();
            let periods = records.len();

            let was_loading = {
                let mut guard = lock_state(&state);
                if guard.generation != generation {
                    debug!("schedule: dropped stale delivery routine={routine_id} day={day}");
                    return;
                }
                guard.index = guard.index.with_day(day, records);
                mem::replace(&mut guard.loading, false)
            };

            debug!("schedule: day updated routine={routine_id} day={day} periods={periods}");
            let _ = events.send(ClientEvent::DayUpdated {
                routine_id: routine_id.clone(),
                day,
                periods,
            });
            if was_loading {
                let _ = events.send(ClientEvent::LoadingChanged(false));
            }
        })
    }

    fn error_handler(
        &self,
        generation: u64,
        path: CollectionPath,
    ) -> Box<dyn Fn(StoreError) + Send + Sync> {
        let state: Weak<Mutex<AssemblerState>> = Arc::downgrade(&self.state);
        let events = self.events.clone();
        Box::new(move |err| {
            warn!("schedule: day snapshot error path={path} err={err}");
            let Some(state) = state.upgrade() else {
                return;
            };
            let was_loading = {
                let mut guard = lock_state(&state);
                if guard.generation != generation {
                    return;
                }
                mem::replace(&mut guard.loading, false)
            };
            let _ = events.send(ClientEvent::Error(format!(
                "schedule subscription failed for {path}: {err}"
            )));
            if was_loading {
                let _ = events.send(ClientEvent::LoadingChanged(false));
            }
        })
    }

    /// Releases every subscription. The assembler stays usable.
    pub fn shutdown(&self) {
        self.select(None);
    }

    pub fn selection(&self) -> Option<RoutineId> {
        self.state().selection.clone()
    }

    pub fn index(&self) -> ScheduleIndex {
        self.state().index.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    pub fn phase(&self) -> AssemblyPhase {
        self.state().phase()
    }

    /// Index, phase and loading flag read under one lock.
    pub fn view(&self) -> (ScheduleIndex, AssemblyPhase, bool) {
        let state = self.state();
        (state.index.clone(), state.phase(), state.loading)
    }

    pub fn active_subscriptions(&self) -> usize {
        self.state().subscriptions.len()
    }
}

#[cfg(test)]
#[path = "tests/assembler_tests.rs"]
mod tests;
