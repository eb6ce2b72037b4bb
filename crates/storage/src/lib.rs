use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

use serde_json::{Map, Value};
use shared::{
    domain::RoutineId,
    error::StoreError,
    protocol::{CollectionPath, Document},
};
use tracing::debug;

mod fixture;

pub use fixture::{Fixture, RoutineFixture};

pub type SnapshotHandler = Box<dyn Fn(Vec<Document>) + Send + Sync>;
pub type ErrorHandler = Box<dyn Fn(StoreError) + Send + Sync>;

/// Push-based document store: every delivery is the full current snapshot of
/// one collection.
pub trait RealtimeStore: Send + Sync {
    fn subscribe(
        &self,
        path: &CollectionPath,
        on_update: SnapshotHandler,
        on_error: ErrorHandler,
    ) -> Subscription;
}

/// Disposer for a live listener. The release hook runs exactly once, either on
/// [`Subscription::unsubscribe`] or on drop.
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    pub fn noop() -> Self {
        Self { release: None }
    }

    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    pub fn is_active(&self) -> bool {
        self.release.is_some()
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

type SnapshotCallback = Arc<dyn Fn(Vec<Document>) + Send + Sync>;
type ErrorCallback = Arc<dyn Fn(StoreError) + Send + Sync>;

struct Listener {
    path: CollectionPath,
    on_update: SnapshotCallback,
    on_error: ErrorCallback,
    gate: Arc<DeliveryGate>,
}

enum Payload {
    Snapshot(SnapshotCallback, Vec<Document>),
    Failure(ErrorCallback, StoreError),
}

impl Payload {
    fn run(self) {
        match self {
            Payload::Snapshot(callback, documents) => callback(documents),
            Payload::Failure(callback, err) => callback(err),
        }
    }
}

#[derive(Default)]
struct GateState {
    /// Sequence of the last payload handed to the callbacks.
    delivered: u64,
    pending: Option<(u64, Payload)>,
    draining: bool,
}

/// Per-listener mailbox. Payloads reach the callbacks in sequence order and one
/// at a time; a payload older than one already delivered or queued is dropped.
#[derive(Default)]
struct DeliveryGate {
    state: Mutex<GateState>,
}

impl DeliveryGate {
    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn offer(&self, sequence: u64, payload: Payload) {
        let mut state = self.lock();
        if sequence <= state.delivered {
            return;
        }
        if matches!(&state.pending, Some((queued, _)) if *queued >= sequence) {
            return;
        }
        state.pending = Some((sequence, payload));
        if state.draining {
            // The thread already draining this gate picks it up.
            return;
        }

        state.draining = true;
        while let Some((sequence, payload)) = state.pending.take() {
            state.delivered = sequence;
            drop(state);
            payload.run();
            state = self.lock();
        }
        state.draining = false;
    }
}

struct Delivery {
    sequence: u64,
    gate: Arc<DeliveryGate>,
    payload: Payload,
}

impl Delivery {
    fn run(self) {
        self.gate.offer(self.sequence, self.payload);
    }
}

type Collection = BTreeMap<String, Map<String, Value>>;

#[derive(Default)]
struct MemoryStoreState {
    collections: BTreeMap<CollectionPath, Collection>,
    failures: HashMap<CollectionPath, StoreError>,
    listeners: BTreeMap<u64, Listener>,
    next_listener_id: u64,
    /// Bumped on every change; stamps the deliveries it causes.
    sequence: u64,
}

impl MemoryStoreState {
    fn snapshot(&self, path: &CollectionPath) -> Vec<Document> {
        self.collections
            .get(path)
            .map(|collection| {
                collection
                    .iter()
                    .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    fn delivery_for(&self, listener: &Listener, sequence: u64) -> Delivery {
        let payload = match self.failures.get(&listener.path) {
            Some(err) => Payload::Failure(Arc::clone(&listener.on_error), err.clone()),
            None => Payload::Snapshot(
                Arc::clone(&listener.on_update),
                self.snapshot(&listener.path),
            ),
        };
        Delivery {
            sequence,
            gate: Arc::clone(&listener.gate),
            payload,
        }
    }

    fn deliveries_where(&mut self, matches: impl Fn(&CollectionPath) -> bool) -> Vec<Delivery> {
        let sequence = self.next_sequence();
        self.listeners
            .values()
            .filter(|listener| matches(&listener.path))
            .map(|listener| self.delivery_for(listener, sequence))
            .collect()
    }
}

/// In-process realtime document store.
///
/// Deliveries are synchronous and always happen after the internal lock is
/// released, so callbacks may subscribe, unsubscribe or write re-entrantly.
/// Each listener sees snapshots in the order the changes were applied, even
/// with concurrent writers; a stale snapshot is skipped rather than delivered
/// late. A write made from inside a callback is delivered to that listener
/// once the callback returns.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreState>>,
}

fn lock_state(inner: &Mutex<MemoryStoreState>) -> MutexGuard<'_, MemoryStoreState> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

fn dispatch(deliveries: Vec<Delivery>) {
    for delivery in deliveries {
        delivery.run();
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: &Fixture) -> Self {
        let store = Self::new();
        store.apply_fixture(fixture);
        store
    }

    fn state(&self) -> MutexGuard<'_, MemoryStoreState> {
        lock_state(&self.inner)
    }

    pub fn set_document(&self, path: &CollectionPath, id: &str, fields: Map<String, Value>) {
        let deliveries = {
            let mut state = self.state();
            state
                .collections
                .entry(path.clone())
                .or_default()
                .insert(id.to_string(), fields);
            state.deliveries_where(|candidate| candidate == path)
        };
        debug!("store: set document path={path} id={id}");
        dispatch(deliveries);
    }

    pub fn delete_document(&self, path: &CollectionPath, id: &str) -> bool {
        let (removed, deliveries) = {
            let mut state = self.state();
            let removed = state
                .collections
                .get_mut(path)
                .and_then(|collection| collection.remove(id))
                .is_some();
            let deliveries = if removed {
                state.deliveries_where(|candidate| candidate == path)
            } else {
                Vec::new()
            };
            (removed, deliveries)
        };
        debug!("store: delete document path={path} id={id} removed={removed}");
        dispatch(deliveries);
        removed
    }

    pub fn replace_collection(&self, path: &CollectionPath, documents: Vec<Document>) {
        let deliveries = {
            let mut state = self.state();
            let collection = documents
                .into_iter()
                .map(|document| (document.id, document.fields))
                .collect();
            state.collections.insert(path.clone(), collection);
            state.deliveries_where(|candidate| candidate == path)
        };
        dispatch(deliveries);
    }

    /// Drops the routine document and every sub-collection nested under it.
    pub fn remove_routine(&self, routine_id: &RoutineId) {
        let routines = CollectionPath::routines();
        let deliveries = {
            let mut state = self.state();
            if let Some(collection) = state.collections.get_mut(&routines) {
                collection.remove(routine_id.as_str());
            }
            state
                .collections
                .retain(|path, _| path.routine_id().as_ref() != Some(routine_id));
            state.deliveries_where(|candidate| {
                candidate == &routines || candidate.routine_id().as_ref() == Some(routine_id)
            })
        };
        debug!("store: removed routine id={routine_id}");
        dispatch(deliveries);
    }

    /// Makes every current and future listener on `path` receive `err` until
    /// [`MemoryStore::clear_failure`] is called.
    pub fn fail_collection(&self, path: &CollectionPath, err: StoreError) {
        let deliveries = {
            let mut state = self.state();
            state.failures.insert(path.clone(), err);
            state.deliveries_where(|candidate| candidate == path)
        };
        dispatch(deliveries);
    }

    pub fn clear_failure(&self, path: &CollectionPath) {
        let deliveries = {
            let mut state = self.state();
            if state.failures.remove(path).is_none() {
                return;
            }
            state.deliveries_where(|candidate| candidate == path)
        };
        dispatch(deliveries);
    }

    /// Replaces the whole content of the store and notifies every listener.
    pub fn apply_fixture(&self, fixture: &Fixture) {
        let deliveries = {
            let mut state = self.state();
            state.collections = fixture.collections();
            state.deliveries_where(|_| true)
        };
        debug!(
            "store: applied fixture routines={}",
            fixture.routines.len()
        );
        dispatch(deliveries);
    }

    pub fn documents(&self, path: &CollectionPath) -> Vec<Document> {
        self.state().snapshot(path)
    }

    pub fn listener_count(&self, path: &CollectionPath) -> usize {
        self.state()
            .listeners
            .values()
            .filter(|listener| &listener.path == path)
            .count()
    }

    pub fn total_listeners(&self) -> usize {
        self.state().listeners.len()
    }
}

impl RealtimeStore for MemoryStore {
    fn subscribe(
        &self,
        path: &CollectionPath,
        on_update: SnapshotHandler,
        on_error: ErrorHandler,
    ) -> Subscription {
        let (listener_id, initial) = {
            let mut state = self.state();
            let listener_id = state.next_listener_id;
            state.next_listener_id += 1;
            let listener = Listener {
                path: path.clone(),
                on_update: Arc::from(on_update),
                on_error: Arc::from(on_error),
                gate: Arc::new(DeliveryGate::default()),
            };
            let sequence = state.next_sequence();
            let initial = state.delivery_for(&listener, sequence);
            state.listeners.insert(listener_id, listener);
            (listener_id, initial)
        };
        debug!("store: subscribed path={path} listener={listener_id}");

        let weak: Weak<Mutex<MemoryStoreState>> = Arc::downgrade(&self.inner);
        let released_path = path.clone();
        let subscription = Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                lock_state(&inner).listeners.remove(&listener_id);
                debug!("store: unsubscribed path={released_path} listener={listener_id}");
            }
        });

        initial.run();
        subscription
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
