mod insert_test;
mod scan_test;

use lembar::{Connection, ResultSet, utils::mock::TempDatabase};

pub fn setup_test_db(prefix: &str) -> (Connection, TempDatabase) {
    let temp_db = TempDatabase::with_prefix(prefix).expect("Failed to create temp directory");
    let connection = temp_db.connect().expect("Failed to open database");
    (connection, temp_db)
}

pub fn query(connection: &mut Connection, sql: &str) -> ResultSet {
    connection
        .execute(sql)
        .expect("query failed")
        .into_rows()
        .expect("statement returned no rows")
}
