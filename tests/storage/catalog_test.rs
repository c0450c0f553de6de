use lembar::{
    storage::{catalog::Catalog, schema::ColumnSchema},
    types::{error::DatabaseError, value::DataType},
    utils::mock::TempDatabase,
};

fn user_columns() -> Vec<ColumnSchema> {
    vec![
        ColumnSchema::new("id", "INTEGER", 0).primary_key(),
        ColumnSchema::new("name", "TEXT", 1).not_null(),
        ColumnSchema::new("score", "REAL", 2),
    ]
}

#[test]
fn test_create_and_lookup_table() {
    let temp_db = TempDatabase::with_prefix("catalog_create").unwrap();
    let mut store = temp_db.open_store().unwrap();
    let mut catalog = Catalog::load(&mut store).unwrap();
    assert!(catalog.table_names().is_empty());

    let root = catalog.create_table(&mut store, "Users", user_columns()).unwrap();

    let schema = catalog.lookup_table("users").unwrap();
    assert_eq!(schema.table_name, "Users");
    assert_eq!(schema.root_page_id, root);
    assert_eq!(schema.columns.len(), 3);
    assert_eq!(schema.columns[2].data_type, DataType::Real);
    assert!(catalog.contains("USERS"));
    assert_eq!(catalog.table_names(), vec!["Users".to_string()]);
}

#[test]
fn test_duplicate_and_unknown_tables() {
    let temp_db = TempDatabase::with_prefix("catalog_errors").unwrap();
    let mut store = temp_db.open_store().unwrap();
    let mut catalog = Catalog::load(&mut store).unwrap();
    catalog.create_table(&mut store, "users", user_columns()).unwrap();

    assert!(matches!(
        catalog.create_table(&mut store, "USERS", user_columns()),
        Err(DatabaseError::DuplicateTable { name }) if name == "USERS"
    ));
    assert!(matches!(
        catalog.lookup_table("orders"),
        Err(DatabaseError::UnknownTable { name }) if name == "orders"
    ));
    assert!(matches!(
        catalog.drop_table(&mut store, "orders"),
        Err(DatabaseError::UnknownTable { .. })
    ));
}

#[test]
fn test_catalog_persists_across_reopen() {
    let temp_db = TempDatabase::with_prefix("catalog_reopen").unwrap();
    {
        let mut store = temp_db.open_store().unwrap();
        let mut catalog = Catalog::load(&mut store).unwrap();
        catalog.create_table(&mut store, "b_table", user_columns()).unwrap();
        catalog
            .create_table(&mut store, "a_table", vec![ColumnSchema::new("x", "", 0)])
            .unwrap();
        store.flush().unwrap();
    }

    let mut store = temp_db.open_store().unwrap();
    let catalog = Catalog::load(&mut store).unwrap();
    assert_eq!(
        catalog.table_names(),
        vec!["a_table".to_string(), "b_table".to_string()]
    );
    let schema = catalog.lookup_table("a_table").unwrap();
    assert_eq!(schema.columns[0].data_type, DataType::Any);
    assert!(catalog.lookup_table("b_table").unwrap().columns[0].is_row_id_alias());
}

#[test]
fn test_drop_table_frees_pages_and_allows_recreate() {
    let temp_db = TempDatabase::with_prefix("catalog_drop").unwrap();
    let mut store = temp_db.open_store().unwrap();
    let mut catalog = Catalog::load(&mut store).unwrap();

    let root = catalog.create_table(&mut store, "users", user_columns()).unwrap();
    catalog.drop_table(&mut store, "users").unwrap();

    assert!(!catalog.contains("users"));
    assert_eq!(store.free_page_count(), 1);

    // The freed root is handed out again.
    let new_root = catalog.create_table(&mut store, "users", user_columns()).unwrap();
    assert_eq!(new_root, root);
    assert_eq!(store.free_page_count(), 0);

    let reloaded = Catalog::load(&mut store).unwrap();
    assert_eq!(reloaded.table_names(), vec!["users".to_string()]);
}
