use scriptlink::dataset::{Dataset, Value};
use scriptlink::error::ScriptlinkError;

#[test]
fn records_become_rows_in_first_seen_column_order() {
    let json = r#"[
        {"FormName": "Demographics", "ScriptName": "A", "Version": 2},
        {"ScriptName": "B", "FormName": null, "Active": true},
        {"FormName": "Diagnosis"}
    ]"#;
    let dataset = Dataset::from_json_reader(json.as_bytes()).expect("loads");
    assert_eq!(dataset.columns(), ["FormName", "ScriptName", "Version", "Active"]);
    assert_eq!(dataset.len(), 3);
    assert_eq!(
        dataset.rows()[0],
        vec![Value::from("Demographics"), Value::from("A"), Value::from(2.0), Value::Empty]
    );
    assert_eq!(dataset.rows()[1][0], Value::Empty);
    assert_eq!(dataset.rows()[1][3], Value::from("true"));
    assert_eq!(dataset.rows()[2][1], Value::Empty);
    assert_eq!(dataset.column_index("Version"), Some(2));
    assert_eq!(dataset.column_index("version"), None, "headers are exact identifiers");
}

#[test]
fn numbers_normalize_to_plain_text() {
    assert_eq!(Value::from(7.0).normalized(), "7");
    assert_eq!(Value::from(-3i64).normalized(), "-3");
    assert_eq!(Value::from(2.5).normalized(), "2.5");
    assert_eq!(Value::Empty.normalized(), "");
    assert!(Value::from("  ").is_blank());
    assert!(!Value::from(0.0).is_blank());
}

#[test]
fn rejects_ragged_rows_and_duplicate_headers() {
    let err = Dataset::new(vec!["A".into(), "B".into()], vec![vec![Value::from("x")]]).unwrap_err();
    assert!(matches!(err, ScriptlinkError::Dataset(_)));
    let err = Dataset::new(vec!["A".into(), "A".into()], Vec::new()).unwrap_err();
    assert!(format!("{err}").contains("Duplicate column"));
}

#[test]
fn rejects_documents_that_are_not_record_lists() {
    let err = Dataset::from_json_reader(r#"{"FormName": "x"}"#.as_bytes()).unwrap_err();
    assert!(matches!(err, ScriptlinkError::Dataset(_)));
    assert!(Dataset::from_json_path("/definitely/not/here.json").is_err());
}
