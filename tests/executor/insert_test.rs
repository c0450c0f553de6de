use lembar::{DatabaseError, QueryResult, Value, storage::node::MAX_VALUE_SIZE};

use crate::{query, setup_test_db};

fn users_table(prefix: &str) -> (lembar::Connection, lembar::utils::mock::TempDatabase) {
    let (mut connection, temp_db) = setup_test_db(prefix);
    connection
        .execute("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL, score REAL, avatar BLOB)")
        .unwrap();
    (connection, temp_db)
}

#[test]
fn test_insert_assigns_increasing_row_ids() {
    let (mut connection, _temp_db) = users_table("insert_row_ids");

    let result = connection
        .execute("INSERT INTO users (name) VALUES ('alice'), ('bob')")
        .unwrap();
    assert_eq!(result, QueryResult::RowsAffected(2));
    connection.execute("INSERT INTO users (name) VALUES ('carol')").unwrap();

    let result_set = query(&mut connection, "SELECT id, name FROM users");
    assert_eq!(
        result_set.rows,
        vec![
            vec![Value::Integer(1), Value::Text("alice".into())],
            vec![Value::Integer(2), Value::Text("bob".into())],
            vec![Value::Integer(3), Value::Text("carol".into())],
        ]
    );
}

#[test]
fn test_insert_explicit_row_id() {
    let (mut connection, _temp_db) = users_table("insert_explicit");

    connection
        .execute("INSERT INTO users VALUES (10, 'ten', 1.5, NULL)")
        .unwrap();
    connection.execute("INSERT INTO users (name) VALUES ('next')").unwrap();
    connection
        .execute("INSERT INTO users (rowid, name) VALUES (-4, 'negative')")
        .unwrap();

    let result_set = query(&mut connection, "SELECT rowid, name FROM users");
    assert_eq!(result_set.columns, vec!["rowid", "name"]);
    let ids: Vec<Value> = result_set.rows.iter().map(|row| row[0].clone()).collect();
    assert_eq!(
        ids,
        vec![Value::Integer(-4), Value::Integer(10), Value::Integer(11)]
    );

    let result = connection.execute("INSERT INTO users VALUES (10, 'again', NULL, NULL)");
    assert!(matches!(
        result,
        Err(DatabaseError::ConstraintViolation { details }) if details.contains("UNIQUE")
    ));
}

#[test]
fn test_insert_literal_kinds() {
    let (mut connection, _temp_db) = users_table("insert_literals");
    connection
        .execute("INSERT INTO users (name, score, avatar) VALUES ('it''s', -2, X'CAFE')")
        .unwrap();

    let result_set = query(&mut connection, "SELECT * FROM users");
    assert_eq!(
        result_set.rows,
        vec![vec![
            Value::Integer(1),
            Value::Text("it's".into()),
            Value::Real(-2.0),
            Value::Blob(vec![0xCA, 0xFE]),
        ]]
    );
}

#[test]
fn test_insert_type_mismatch() {
    let (mut connection, _temp_db) = users_table("insert_mismatch");

    let result = connection.execute("INSERT INTO users (name) VALUES (42)");
    assert!(matches!(
        result,
        Err(DatabaseError::TypeMismatch { column, .. }) if column == "name"
    ));

    let result = connection.execute("INSERT INTO users (id, name) VALUES ('x', 'a')");
    assert!(matches!(result, Err(DatabaseError::TypeMismatch { .. })));

    assert!(query(&mut connection, "SELECT * FROM users").is_empty());
}

#[test]
fn test_insert_not_null() {
    let (mut connection, _temp_db) = users_table("insert_not_null");
    let result = connection.execute("INSERT INTO users (score) VALUES (1.0)");
    assert!(matches!(
        result,
        Err(DatabaseError::ConstraintViolation { details }) if details.contains("NOT NULL")
    ));
}

#[test]
fn test_insert_column_errors() {
    let (mut connection, _temp_db) = users_table("insert_columns");

    assert!(matches!(
        connection.execute("INSERT INTO users VALUES (1, 'a')"),
        Err(DatabaseError::ColumnCountMismatch { expected: 4, actual: 2, .. })
    ));
    assert!(matches!(
        connection.execute("INSERT INTO users (nickname) VALUES ('a')"),
        Err(DatabaseError::UnknownColumn { name, .. }) if name == "nickname"
    ));
    assert!(matches!(
        connection.execute("INSERT INTO users (name, name) VALUES ('a', 'b')"),
        Err(DatabaseError::ConstraintViolation { .. })
    ));
    assert!(matches!(
        connection.execute("INSERT INTO missing VALUES (1)"),
        Err(DatabaseError::UnknownTable { .. })
    ));
}

#[test]
fn test_failed_multi_row_insert_is_atomic() {
    let (mut connection, _temp_db) = users_table("insert_atomic");
    connection.execute("INSERT INTO users (name) VALUES ('kept')").unwrap();

    let result = connection.execute("INSERT INTO users (name) VALUES ('one'), ('two'), (NULL)");
    assert!(result.is_err());

    let result_set = query(&mut connection, "SELECT name FROM users");
    assert_eq!(result_set.rows, vec![vec![Value::Text("kept".into())]]);

    // Row ids carry on from the committed state.
    connection.execute("INSERT INTO users (name) VALUES ('after')").unwrap();
    let result_set = query(&mut connection, "SELECT id FROM users WHERE name = 'after'");
    assert_eq!(result_set.rows, vec![vec![Value::Integer(2)]]);
}

#[test]
fn test_row_too_large() {
    let (mut connection, _temp_db) = users_table("insert_too_large");
    let big = "x".repeat(MAX_VALUE_SIZE);
    let result = connection.execute(&format!("INSERT INTO users (name) VALUES ('{}')", big));
    assert!(matches!(result, Err(DatabaseError::RowTooLarge { .. })));

    connection
        .execute(&format!("INSERT INTO users (name) VALUES ('{}')", "y".repeat(900)))
        .unwrap();
    let result_set = query(&mut connection, "SELECT name FROM users");
    assert_eq!(result_set.rows, vec![vec![Value::Text("y".repeat(900))]]);
}

#[test]
fn test_many_inserts_survive_reopen() {
    let (mut connection, temp_db) = users_table("insert_reopen");
    for i in 0..300 {
        connection
            .execute(&format!(
                "INSERT INTO users (name, score) VALUES ('user{}', {})",
                i, i
            ))
            .unwrap();
    }
    connection.close();

    let mut connection = temp_db.connect().unwrap();
    let result_set = query(&mut connection, "SELECT * FROM users");
    assert_eq!(result_set.len(), 300);
    assert_eq!(result_set.rows[299][1], Value::Text("user299".into()));
    assert_eq!(result_set.rows[299][2], Value::Real(299.0));
}

#[test]
fn test_insert_into_untyped_columns() {
    let (mut connection, _temp_db) = setup_test_db("insert_untyped");
    connection.execute("CREATE TABLE t (a, b)").unwrap();

    connection.execute("INSERT INTO t VALUES (1, 'x')").unwrap();
    connection.execute("INSERT INTO t VALUES ('y', X'00FF')").unwrap();

    let result_set = query(&mut connection, "SELECT a, b FROM t");
    assert_eq!(
        result_set.rows,
        vec![
            vec![Value::Integer(1), Value::Text("x".into())],
            vec![Value::Text("y".into()), Value::Blob(vec![0x00, 0xFF])],
        ]
    );
}

#[test]
fn test_insert_into_numeric_affinity_columns() {
    let (mut connection, _temp_db) = setup_test_db("insert_numeric");
    connection
        .execute("CREATE TABLE d (flag BOOLEAN, day DATE, amount DECIMAL(10, 2))")
        .unwrap();

    connection
        .execute("INSERT INTO d VALUES (TRUE, '2024-01-01', '12.50')")
        .unwrap();

    let result_set = query(&mut connection, "SELECT flag, day, amount FROM d");
    assert_eq!(
        result_set.rows,
        vec![vec![
            Value::Integer(1),
            Value::Text("2024-01-01".into()),
            Value::Real(12.5),
        ]]
    );
}
