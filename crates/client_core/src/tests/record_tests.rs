use super::*;
use serde_json::json;

fn record(id: &str, fields: Value) -> PeriodRecord {
    let Value::Object(fields) = fields else {
        panic!("fields must be an object");
    };
    PeriodRecord::from_document(Document::new(id, fields))
}

#[test]
fn period_number_follows_leading_integer_rules() {
    assert_eq!(parse_period_number("3"), Some(3));
    assert_eq!(parse_period_number("07"), Some(7));
    assert_eq!(parse_period_number(" 5"), Some(5));
    assert_eq!(parse_period_number("2-extra"), Some(2));
    assert_eq!(parse_period_number("-1"), Some(-1));
    assert_eq!(parse_period_number("+8"), Some(8));
    assert_eq!(parse_period_number("p3"), None);
    assert_eq!(parse_period_number(""), None);
    assert_eq!(parse_period_number("-"), None);
}

#[test]
fn subject_prefers_sname_then_subject_then_name() {
    let all = record("1", json!({ "sname": "Math", "subject": "Maths", "name": "M" }));
    assert_eq!(all.cell().subject, "Math");

    let secondary = record("1", json!({ "subject": "Physics", "name": "P" }));
    assert_eq!(secondary.cell().subject, "Physics");

    let tertiary = record("1", json!({ "name": "Chemistry" }));
    assert_eq!(tertiary.cell().subject, "Chemistry");

    let none = record("1", json!({}));
    assert_eq!(none.cell().subject, "");
}

#[test]
fn empty_and_non_text_candidates_fall_through() {
    let cell = record(
        "1",
        json!({ "sname": "", "subject": null, "name": "Biology", "tname": false, "teacher": "Rao" }),
    )
    .cell();
    assert_eq!(cell.subject, "Biology");
    assert_eq!(cell.teacher, "Rao");
}

#[test]
fn numeric_values_render_in_decimal() {
    let cell = record("1", json!({ "sname": "Lab", "room": 204, "scode": 7 })).cell();
    assert_eq!(cell.room, "204");
    assert_eq!(cell.code, "7");
}

#[test]
fn teacher_code_and_room_chains() {
    let cell = record(
        "2",
        json!({ "sname": "Math", "teacher": "Smith", "code": "MA101", "room": "B12" }),
    )
    .cell();
    assert_eq!(
        cell,
        PeriodCell {
            subject: "Math".into(),
            teacher: "Smith".into(),
            code: "MA101".into(),
            room: "B12".into(),
        }
    );

    let primary = record("2", json!({ "tname": "Jones", "teacher": "Smith", "scode": "X1", "code": "Y2" })).cell();
    assert_eq!(primary.teacher, "Jones");
    assert_eq!(primary.code, "X1");
}

#[test]
fn unnumbered_records_sort_after_numbered_ones() {
    let mut records = vec![
        record("notes", json!({})),
        record("10", json!({})),
        record("2", json!({})),
        record("x", json!({})),
    ];
    records.sort_by(compare_periods);
    let ids: Vec<&str> = records.iter().map(|record| record.id.as_str()).collect();
    assert_eq!(ids, vec!["2", "10", "notes", "x"]);
}
