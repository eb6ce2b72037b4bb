use super::*;

fn routines() -> Vec<Routine> {
    vec![
        Routine::new("9B", Some("Class 9B")),
        Routine::new("10A", Some("Class 10A")),
    ]
}

#[test]
fn no_previous_selection_never_auto_selects() {
    assert_eq!(reconcile_selection(None, &routines()), None);
    assert_eq!(reconcile_selection(None, &[]), None);
}

#[test]
fn removed_selection_becomes_none() {
    let selected = Routine::new("11C", Some("Class 11C"));
    assert_eq!(reconcile_selection(Some(&selected), &routines()), None);
    assert_eq!(reconcile_selection(Some(&selected), &[]), None);
}

#[test]
fn surviving_selection_takes_the_fresh_record() {
    let stale = Routine::new("10A", Some("Old label"));
    let next = reconcile_selection(Some(&stale), &routines()).expect("still listed");
    assert_eq!(next.id.as_str(), "10A");
    assert_eq!(next.name.as_deref(), Some("Class 10A"));
}

#[test]
fn match_is_by_id_not_by_label() {
    let selected = Routine::new("10B", Some("Class 10A"));
    assert_eq!(reconcile_selection(Some(&selected), &routines()), None);
}
