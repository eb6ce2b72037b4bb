use super::*;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::{json, Map, Value};
use storage::{ErrorHandler, MemoryStore, SnapshotHandler};

type SharedSnapshotHandler = Arc<dyn Fn(Vec<Document>) + Send + Sync>;
type SharedErrorHandler = Arc<dyn Fn(StoreError) + Send + Sync>;

struct ManualListener {
    path: CollectionPath,
    on_update: SharedSnapshotHandler,
    on_error: SharedErrorHandler,
    active: Arc<AtomicBool>,
}

/// Store that never delivers on its own; tests push snapshots explicitly,
/// including to listeners that were already released.
#[derive(Default)]
struct ManualStore {
    listeners: Mutex<Vec<ManualListener>>,
}

impl ManualStore {
    fn handlers(&self, path: &CollectionPath) -> Vec<(SharedSnapshotHandler, SharedErrorHandler, bool)> {
        self.listeners
            .lock()
            .expect("listeners")
            .iter()
            .filter(|listener| &listener.path == path)
            .map(|listener| {
                (
                    Arc::clone(&listener.on_update),
                    Arc::clone(&listener.on_error),
                    listener.active.load(Ordering::SeqCst),
                )
            })
            .collect()
    }

    fn deliver(&self, path: &CollectionPath, documents: Vec<Document>) {
        for (on_update, _, active) in self.handlers(path) {
            if active {
                on_update(documents.clone());
            }
        }
    }

    fn fail(&self, path: &CollectionPath, err: StoreError) {
        for (_, on_error, active) in self.handlers(path) {
            if active {
                on_error(err.clone());
            }
        }
    }

    fn active_count(&self) -> usize {
        self.listeners
            .lock()
            .expect("listeners")
            .iter()
            .filter(|listener| listener.active.load(Ordering::SeqCst))
            .count()
    }
}

impl RealtimeStore for ManualStore {
    fn subscribe(
        &self,
        path: &CollectionPath,
        on_update: SnapshotHandler,
        on_error: ErrorHandler,
    ) -> Subscription {
        let active = Arc::new(AtomicBool::new(true));
        self.listeners.lock().expect("listeners").push(ManualListener {
            path: path.clone(),
            on_update: Arc::from(on_update),
            on_error: Arc::from(on_error),
            active: Arc::clone(&active),
        });
        Subscription::new(move || active.store(false, Ordering::SeqCst))
    }
}

fn doc(id: &str, fields: Value) -> Document {
    let Value::Object(fields) = fields else {
        panic!("fields must be an object");
    };
    Document::new(id, fields)
}

fn day_path(routine: &str, day: DayKey) -> CollectionPath {
    CollectionPath::routine_day(&RoutineId::new(routine), day)
}

fn events() -> (broadcast::Sender<ClientEvent>, broadcast::Receiver<ClientEvent>) {
    broadcast::channel(256)
}

fn drain(rx: &mut broadcast::Receiver<ClientEvent>) -> Vec<ClientEvent> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}

fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.set_document(&day_path("10A", DayKey::Mon), "2", Map::new());
    store.set_document(
        &day_path("10A", DayKey::Mon),
        "1",
        doc("1", json!({ "sname": "Math", "tname": "Smith" })).fields,
    );
    store.set_document(
        &day_path("10A", DayKey::Tue),
        "3",
        doc("3", json!({ "subject": "Physics" })).fields,
    );
    store.set_document(
        &day_path("9B", DayKey::Mon),
        "1",
        doc("1", json!({ "sname": "History" })).fields,
    );
    store
}

#[test]
fn starts_idle_with_no_subscriptions() {
    let store = Arc::new(ManualStore::default());
    let (tx, _rx) = events();
    let assembler = ScheduleAssembler::new(store.clone(), tx);

    assert_eq!(assembler.phase(), AssemblyPhase::Idle);
    assert!(!assembler.is_loading());
    assert!(assembler.index().is_empty());
    assert_eq!(store.active_count(), 0);
}

#[test]
fn selecting_opens_one_subscription_per_weekday() {
    let store = Arc::new(ManualStore::default());
    let (tx, _rx) = events();
    let assembler = ScheduleAssembler::new(store.clone(), tx);

    assembler.select(Some(&RoutineId::new("10A")));

    assert_eq!(store.active_count(), 5);
    assert_eq!(assembler.active_subscriptions(), 5);
    for day in DayKey::ALL {
        assert_eq!(store.handlers(&day_path("10A", day)).len(), 1);
    }
    assert!(store
        .handlers(&CollectionPath::new("routines/10A/sat"))
        .is_empty());
    assert_eq!(assembler.phase(), AssemblyPhase::Loading);
}

#[test]
fn first_day_delivery_clears_loading_even_before_other_days_report() {
    let store = Arc::new(ManualStore::default());
    let (tx, mut rx) = events();
    let assembler = ScheduleAssembler::new(store.clone(), tx);
    assembler.select(Some(&RoutineId::new("10A")));
    assert!(assembler.is_loading());

    store.deliver(&day_path("10A", DayKey::Wed), vec![doc("1", json!({}))]);

    assert!(!assembler.is_loading());
    assert_eq!(assembler.phase(), AssemblyPhase::Ready);
    assert_eq!(
        assembler.index().reported_days().collect::<Vec<_>>(),
        vec![DayKey::Wed]
    );
    let events = drain(&mut rx);
    assert_eq!(events.first(), Some(&ClientEvent::LoadingChanged(true)));
    assert_eq!(events.last(), Some(&ClientEvent::LoadingChanged(false)));
}

#[test]
fn each_delivery_replaces_only_its_own_day_slice_sorted() {
    let store = Arc::new(ManualStore::default());
    let (tx, _rx) = events();
    let assembler = ScheduleAssembler::new(store.clone(), tx);
    assembler.select(Some(&RoutineId::new("10A")));

    store.deliver(
        &day_path("10A", DayKey::Mon),
        vec![doc("10", json!({})), doc("2", json!({})), doc("1", json!({}))],
    );
    store.deliver(&day_path("10A", DayKey::Tue), vec![doc("5", json!({}))]);
    store.deliver(&day_path("10A", DayKey::Mon), vec![doc("3", json!({}))]);

    let index = assembler.index();
    let monday: Vec<&str> = index
        .day(DayKey::Mon)
        .expect("monday")
        .iter()
        .map(|record| record.id.as_str())
        .collect();
    assert_eq!(monday, vec!["3"]);
    assert_eq!(index.day(DayKey::Tue).map(<[_]>::len), Some(1));
    assert!(index.day(DayKey::Wed).is_none());
}

#[test]
fn day_error_clears_loading_without_stopping_other_days() {
    let store = Arc::new(ManualStore::default());
    let (tx, mut rx) = events();
    let assembler = ScheduleAssembler::new(store.clone(), tx);
    assembler.select(Some(&RoutineId::new("10A")));

    store.fail(
        &day_path("10A", DayKey::Mon),
        StoreError::unavailable("backend offline"),
    );
    assert!(!assembler.is_loading());
    assert_eq!(store.active_count(), 5);

    store.deliver(&day_path("10A", DayKey::Tue), vec![doc("1", json!({}))]);
    assert!(assembler.index().day(DayKey::Tue).is_some());

    let events = drain(&mut rx);
    assert!(events
        .iter()
        .any(|event| matches!(event, ClientEvent::Error(message) if message.contains("routines/10A/mon"))));
}

#[test]
fn clearing_releases_subscriptions_and_empties_index() {
    let store = Arc::new(ManualStore::default());
    let (tx, _rx) = events();
    let assembler = ScheduleAssembler::new(store.clone(), tx);
    assembler.select(Some(&RoutineId::new("10A")));
    store.deliver(&day_path("10A", DayKey::Mon), vec![doc("1", json!({}))]);

    assembler.select(None);

    assert_eq!(store.active_count(), 0);
    assert_eq!(assembler.active_subscriptions(), 0);
    assert!(assembler.index().is_empty());
    assert_eq!(assembler.phase(), AssemblyPhase::Idle);
}

#[test]
fn switching_routines_drops_previous_data_and_stale_deliveries() {
    let store = Arc::new(ManualStore::default());
    let (tx, _rx) = events();
    let assembler = ScheduleAssembler::new(store.clone(), tx);
    assembler.select(Some(&RoutineId::new("10A")));
    store.deliver(&day_path("10A", DayKey::Mon), vec![doc("1", json!({ "sname": "Math" }))]);

    let (stale_update, _, _) = store
        .handlers(&day_path("10A", DayKey::Tue))
        .pop()
        .expect("tuesday handler");

    assembler.select(Some(&RoutineId::new("9B")));
    assert!(assembler.index().is_empty());
    assert!(assembler.is_loading());

    // A delivery racing the release must not leak into the new index.
    stale_update(vec![doc("1", json!({ "sname": "Stale" }))]);
    assert!(assembler.index().is_empty());
    assert!(assembler.is_loading());

    store.deliver(&day_path("9B", DayKey::Mon), vec![doc("1", json!({ "sname": "History" }))]);
    let index = assembler.index();
    assert_eq!(index.reported_days().collect::<Vec<_>>(), vec![DayKey::Mon]);
    assert_eq!(index.find(DayKey::Mon, 1).expect("period").cell().subject, "History");
    assert_eq!(store.active_count(), 5);
}

#[test]
fn reselecting_the_active_routine_keeps_subscriptions() {
    let store = Arc::new(ManualStore::default());
    let (tx, _rx) = events();
    let assembler = ScheduleAssembler::new(store.clone(), tx);
    let routine = RoutineId::new("10A");
    assembler.select(Some(&routine));
    store.deliver(&day_path("10A", DayKey::Mon), vec![doc("1", json!({}))]);

    assembler.select(Some(&routine));

    assert_eq!(store.handlers(&day_path("10A", DayKey::Mon)).len(), 1);
    assert!(assembler.index().day(DayKey::Mon).is_some());
}

#[test]
fn select_clear_select_reproduces_the_same_index_without_duplicates() {
    let store = Arc::new(seeded_store());
    let (tx, _rx) = events();
    let assembler = ScheduleAssembler::new(store.clone(), tx);
    let routine = RoutineId::new("10A");

    assembler.select(Some(&routine));
    let first = assembler.index();
    assert_eq!(store.total_listeners(), 5);

    assembler.select(None);
    assert_eq!(store.total_listeners(), 0);

    assembler.select(Some(&routine));
    assert_eq!(store.total_listeners(), 5);
    assert_eq!(assembler.index(), first);
    assert_eq!(first.day(DayKey::Mon).map(<[_]>::len), Some(2));
}

#[test]
fn memory_store_updates_flow_into_the_index() {
    let store = Arc::new(seeded_store());
    let (tx, _rx) = events();
    let assembler = ScheduleAssembler::new(store.clone(), tx);
    assembler.select(Some(&RoutineId::new("10A")));
    assert!(!assembler.is_loading());

    store.set_document(
        &day_path("10A", DayKey::Tue),
        "1",
        doc("1", json!({ "sname": "Art" })).fields,
    );
    let index = assembler.index();
    let tuesday: Vec<Option<i64>> = index
        .day(DayKey::Tue)
        .expect("tuesday")
        .iter()
        .map(|record| record.period_number)
        .collect();
    assert_eq!(tuesday, vec![Some(1), Some(3)]);
}

#[test]
fn dropping_the_assembler_releases_listeners() {
    let store = Arc::new(seeded_store());
    let (tx, _rx) = events();
    {
        let assembler = ScheduleAssembler::new(store.clone(), tx);
        assembler.select(Some(&RoutineId::new("10A")));
        assert_eq!(store.total_listeners(), 5);
    }
    assert_eq!(store.total_listeners(), 0);
}
