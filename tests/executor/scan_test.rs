use lembar::{DatabaseError, Value};

use crate::{query, setup_test_db};

fn seeded(prefix: &str) -> (lembar::Connection, lembar::utils::mock::TempDatabase) {
    let (mut connection, temp_db) = setup_test_db(prefix);
    connection
        .execute_batch(
            "CREATE TABLE items (id INTEGER PRIMARY KEY, label TEXT, price REAL, qty INTEGER);
             INSERT INTO items (label, price, qty) VALUES
                ('apple', 1.25, 10),
                ('pear', 2, 0),
                ('plum', NULL, 10),
                ('fig', 3.5, NULL);",
        )
        .unwrap();
    (connection, temp_db)
}

#[test]
fn test_select_star_in_row_id_order() {
    let (mut connection, _temp_db) = seeded("scan_star");
    let result_set = query(&mut connection, "SELECT * FROM items");
    assert_eq!(result_set.columns, vec!["id", "label", "price", "qty"]);
    assert_eq!(result_set.len(), 4);
    assert_eq!(
        result_set.rows[1],
        vec![
            Value::Integer(2),
            Value::Text("pear".into()),
            Value::Real(2.0),
            Value::Integer(0),
        ]
    );
}

#[test]
fn test_select_projection() {
    let (mut connection, _temp_db) = seeded("scan_projection");
    let result_set = query(&mut connection, "SELECT qty, LABEL, oid FROM items");
    assert_eq!(result_set.columns, vec!["qty", "label", "oid"]);
    assert_eq!(
        result_set.rows[0],
        vec![Value::Integer(10), Value::Text("apple".into()), Value::Integer(1)]
    );

    assert!(matches!(
        connection.execute("SELECT colour FROM items"),
        Err(DatabaseError::UnknownColumn { .. })
    ));
}

#[test]
fn test_point_lookup_by_row_id() {
    let (mut connection, _temp_db) = seeded("scan_point");

    let by_alias = query(&mut connection, "SELECT label FROM items WHERE id = 3");
    assert_eq!(by_alias.rows, vec![vec![Value::Text("plum".into())]]);

    let by_rowid = query(&mut connection, "SELECT label FROM items WHERE rowid = 3");
    assert_eq!(by_rowid, by_alias);

    let reversed = query(&mut connection, "SELECT label FROM items WHERE 3 = _rowid_");
    assert_eq!(reversed, by_alias);

    assert!(query(&mut connection, "SELECT * FROM items WHERE id = 99").is_empty());
    assert!(query(&mut connection, "SELECT * FROM items WHERE id = 'three'").is_empty());
}

#[test]
fn test_filter_on_column() {
    let (mut connection, _temp_db) = seeded("scan_filter");

    let result_set = query(&mut connection, "SELECT label FROM items WHERE qty = 10");
    assert_eq!(
        result_set.rows,
        vec![
            vec![Value::Text("apple".into())],
            vec![Value::Text("plum".into())],
        ]
    );

    // Integer literal against a real column compares numerically.
    let result_set = query(&mut connection, "SELECT label FROM items WHERE price = 2");
    assert_eq!(result_set.rows, vec![vec![Value::Text("pear".into())]]);

    // NULL never compares equal.
    assert!(query(&mut connection, "SELECT * FROM items WHERE price = NULL").is_empty());
    assert!(query(&mut connection, "SELECT * FROM items WHERE label = 'kiwi'").is_empty());
}

#[test]
fn test_select_errors() {
    let (mut connection, _temp_db) = seeded("scan_errors");

    assert!(matches!(
        connection.execute("SELECT * FROM nowhere"),
        Err(DatabaseError::UnknownTable { .. })
    ));
    assert!(matches!(
        connection.execute("SELECT * FROM items WHERE colour = 'red'"),
        Err(DatabaseError::UnknownColumn { .. })
    ));
    assert!(matches!(
        connection.execute("SELECT * FROM items ORDER BY label"),
        Err(DatabaseError::Syntax { .. })
    ));
    assert!(matches!(
        connection.execute("SELEC * FROM items"),
        Err(DatabaseError::Syntax { .. })
    ));
}

#[test]
fn test_large_table_scan() {
    let (mut connection, _temp_db) = setup_test_db("scan_large");
    connection
        .execute("CREATE TABLE log (id INTEGER PRIMARY KEY, line TEXT)")
        .unwrap();
    for chunk in 0..20 {
        let values: Vec<String> = (0..50)
            .map(|i| format!("('line {:04}')", chunk * 50 + i))
            .collect();
        connection
            .execute(&format!("INSERT INTO log (line) VALUES {}", values.join(", ")))
            .unwrap();
    }

    let result_set = query(&mut connection, "SELECT id FROM log");
    assert_eq!(result_set.len(), 1000);
    let ids: Vec<i64> = result_set
        .rows
        .iter()
        .map(|row| match row[0] {
            Value::Integer(id) => id,
            _ => panic!("row id is not an integer"),
        })
        .collect();
    assert_eq!(ids, (1..=1000).collect::<Vec<_>>());

    let result_set = query(&mut connection, "SELECT line FROM log WHERE id = 777");
    assert_eq!(result_set.rows, vec![vec![Value::Text("line 0776".into())]]);
}
