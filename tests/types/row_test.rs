use lembar::types::{error::DatabaseError, row::Row, value::Value};

fn create_user_row(name: &str, score: f64) -> Row {
    Row::new(vec![
        Value::Text(name.to_string()),
        Value::Real(score),
        Value::Null,
        Value::Blob(vec![1, 2, 3]),
    ])
}

#[test]
fn test_row_bytes_keep_values_and_take_row_id() {
    let row = create_user_row("alice", 9.5);
    let bytes = row.to_bytes();
    assert_eq!(bytes.len(), row.size());

    let decoded = Row::from_bytes(12, &bytes).unwrap();
    assert_eq!(decoded.row_id, Some(12));
    assert_eq!(decoded.values, row.values);
}

#[test]
fn test_empty_row() {
    let row = Row::new(vec![]);
    let decoded = Row::from_bytes(1, &row.to_bytes()).unwrap();
    assert!(decoded.values.is_empty());
}

#[test]
fn test_get_value() {
    let row = create_user_row("bob", 1.0);
    assert_eq!(row.get_value(0), Some(&Value::Text("bob".into())));
    assert_eq!(row.get_value(2), Some(&Value::Null));
    assert_eq!(row.get_value(4), None);
}

#[test]
fn test_trailing_bytes_are_corruption() {
    let mut bytes = create_user_row("carol", 2.0).to_bytes();
    bytes.push(0);
    assert!(matches!(
        Row::from_bytes(3, &bytes),
        Err(DatabaseError::Corruption { .. })
    ));
}

#[test]
fn test_missing_count_is_corruption() {
    assert!(matches!(
        Row::from_bytes(3, &[1, 0]),
        Err(DatabaseError::Corruption { .. })
    ));
}
