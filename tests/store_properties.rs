use chrono::{FixedOffset, TimeZone, Utc};
use countdo::countdown::{Remaining, format_remaining, remaining};
use countdo::models::Todo;
use countdo::storage::{MemoryStorage, Storage};
use countdo::store::{DEFAULT_STORAGE_KEY, TodoStore, decode, encode};
use countdo::SqliteStorage;
use rstest::rstest;

fn sequential_ids() -> impl FnMut() -> String {
    let mut n = 0;
    move || {
        n += 1;
        format!("todo-{n}")
    }
}

fn store_with(texts: &[&str]) -> TodoStore<MemoryStorage, impl FnMut() -> String> {
    let mut store = TodoStore::open(MemoryStorage::new(), sequential_ids());
    for text in texts {
        store.add(text, None, None);
    }
    store
}

fn ids<S: Storage, G: countdo::ids::IdGenerator>(store: &TodoStore<S, G>) -> Vec<String> {
    store.todos().iter().map(|t| t.id.clone()).collect()
}

fn assert_counts_consistent<S: Storage, G: countdo::ids::IdGenerator>(store: &TodoStore<S, G>) {
    let counts = store.counts();
    assert_eq!(counts.total, store.todos().len());
    assert_eq!(counts.completed, store.todos().iter().filter(|t| t.completed).count());
}

#[test]
fn counts_track_every_operation() {
    let mut store = store_with(&[]);
    assert_counts_consistent(&store);

    // deterministic pseudo-random op sequence
    let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
    for step in 0..300 {
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        let len = store.todos().len();
        let pick = |n: u64| if len == 0 { 0 } else { (n % len as u64) as usize };
        match seed % 5 {
            0 | 1 => {
                store.add(&format!("task {step}"), None, None);
            }
            2 if len > 0 => {
                let id = store.todos()[pick(seed >> 8)].id.clone();
                store.toggle(&id);
            }
            3 if len > 0 => {
                let id = store.todos()[pick(seed >> 8)].id.clone();
                store.delete(&id);
            }
            4 => store.reorder(pick(seed >> 8), pick(seed >> 24)),
            _ => store.toggle("absent"),
        }
        assert_counts_consistent(&store);
    }
}

#[rstest]
#[case("")]
#[case("   ")]
#[case("\t\n")]
fn blank_text_is_rejected(#[case] text: &str) {
    let mut store = store_with(&["existing"]);
    let before = store.todos().to_vec();
    assert!(store.add(text, None, None).is_none());
    assert_eq!(store.todos(), before.as_slice());
}

#[test]
fn add_inserts_at_head_without_touching_others() {
    let mut store = store_with(&["a", "b"]);
    let before = store.todos().to_vec();
    store.add("c", None, Some("Work".to_string()));

    let todos = store.todos();
    assert_eq!(todos[0].text, "c");
    assert!(!todos[0].completed);
    assert_eq!(todos[0].category.as_deref(), Some("Work"));
    assert_eq!(&todos[1..], before.as_slice());
}

#[test]
fn toggle_twice_restores_completion() {
    let mut store = store_with(&["a", "b"]);
    store.toggle("todo-1");
    assert!(store.get("todo-1").unwrap().completed);
    store.toggle("todo-1");
    assert!(!store.get("todo-1").unwrap().completed);
    assert!(!store.get("todo-2").unwrap().completed);
}

#[test]
fn delete_removes_exactly_one_and_keeps_order() {
    let mut store = store_with(&["a", "b", "c", "d"]);
    store.delete("todo-2");
    assert_eq!(ids(&store), ["todo-4", "todo-3", "todo-1"]);
    store.delete("todo-2");
    assert_eq!(store.todos().len(), 3);
}

#[rstest]
#[case(0, 3, ["todo-3", "todo-2", "todo-1", "todo-4"])]
#[case(3, 0, ["todo-1", "todo-4", "todo-3", "todo-2"])]
#[case(1, 2, ["todo-4", "todo-2", "todo-3", "todo-1"])]
#[case(2, 2, ["todo-4", "todo-3", "todo-2", "todo-1"])]
#[case(4, 0, ["todo-4", "todo-3", "todo-2", "todo-1"])]
#[case(0, 9, ["todo-4", "todo-3", "todo-2", "todo-1"])]
fn reorder_moves_a_single_element(#[case] from: usize, #[case] to: usize, #[case] expected: [&str; 4]) {
    let mut store = store_with(&["a", "b", "c", "d"]);
    let mut before = ids(&store);
    store.reorder(from, to);

    let after = ids(&store);
    assert_eq!(after, expected);

    let mut sorted_after = after.clone();
    sorted_after.sort();
    before.sort();
    assert_eq!(sorted_after, before);
}

#[test]
fn timestamps_round_trip_to_the_millisecond() {
    let mut todo = Todo::new("rt".to_string(), "round trip".to_string());
    todo.created_at = Utc.timestamp_millis_opt(1_792_395_000_123).unwrap();
    todo.due_date = Some(
        FixedOffset::west_opt(7 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 12, 24, 0, 0, 0)
            .unwrap(),
    );

    let decoded = decode(&encode(&[todo.clone()]).unwrap()).unwrap();
    assert_eq!(decoded, vec![todo.clone()]);
    assert_eq!(decoded[0].created_at.timestamp_millis(), 1_792_395_000_123);
    assert_eq!(decoded[0].due_date.unwrap().offset(), todo.due_date.unwrap().offset());
}

#[test]
fn collection_survives_a_restart_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todos.db");
    let path = path.to_str().unwrap();

    let due = FixedOffset::east_opt(3600).unwrap().with_ymd_and_hms(2026, 10, 30, 0, 0, 0).unwrap();
    let expected = {
        let mut store = TodoStore::open(SqliteStorage::new(path).unwrap(), sequential_ids());
        store.add("with due date", Some(due), Some("Finance".to_string()));
        store.add("plain", None, None);
        store.toggle("todo-2");
        store.todos().to_vec()
    };

    let store = TodoStore::open(SqliteStorage::new(path).unwrap(), sequential_ids());
    assert_eq!(store.todos(), expected.as_slice());
    assert_eq!(store.counts().completed, 1);
}

#[test]
fn malformed_storage_never_panics() {
    for raw in ["", "null", "{}", "[1,2]", "[{\"id\":5}]", "\u{0}"] {
        let storage = MemoryStorage::new().with_entry(DEFAULT_STORAGE_KEY, raw);
        let store = TodoStore::open(storage, sequential_ids());
        assert!(store.todos().is_empty(), "input {raw:?}");
    }
}

#[test]
fn due_today_at_noon_has_hours_left() {
    let zone = FixedOffset::east_opt(9 * 3600).unwrap();
    let due = zone.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap();
    let noon = zone.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
    let r = remaining(&due, &noon);
    assert!(!r.is_overdue);
    assert!(r.hours > 0);
}

#[test]
fn format_examples() {
    assert_eq!(format_remaining(&Remaining::from_parts(2, 5, 30, false)), "2d 5h remaining");
    assert_eq!(format_remaining(&Remaining::from_parts(0, 0, 45, true)), "45m overdue");
}
