mod common;

use assert_cmd::prelude::*;
use common::*;
use predicates::prelude::*;

#[cfg(not(feature = "storage-rocksdb"))]
#[test]
fn test_rocksdb_fallback_warning() {
    let orders = orders_csv(&[&order_row(1, "10.00")]);
    let events = events_csv(&[]);
    let config = config_yaml("");

    let mut cmd = gateway_command(orders.path(), events.path(), config.path(), "http://127.0.0.1:1");
    cmd.arg("--db-path").arg("some_db");

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."))
        .stdout(predicate::str::contains("1,pending,,,,0"));
}

#[cfg(feature = "storage-rocksdb")]
#[test]
fn test_rocksdb_no_fallback_warning() {
    let orders = orders_csv(&[&order_row(1, "10.00")]);
    let events = events_csv(&[]);
    let config = config_yaml("");

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    let mut cmd = gateway_command(orders.path(), events.path(), config.path(), "http://127.0.0.1:1");
    cmd.arg("--db-path").arg(&db_path);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("WARNING: Persistent storage").not());
}
