#![cfg(feature = "storage-rocksdb")]

mod common;

use common::*;
use mockito::Matcher;
use serde_json::json;
use tempfile::tempdir;

#[test]
fn test_rocksdb_capture_in_later_run() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    let mut server = mockito::Server::new();
    let authorize = server
        .mock("POST", TRANSACTIONS_PATH)
        .match_body(Matcher::PartialJson(json!({"command": "cc:authonly"})))
        .with_body(approval("3102579005"))
        .expect(1)
        .create();
    let capture = server
        .mock("POST", TRANSACTIONS_PATH)
        .match_body(Matcher::PartialJson(json!({
            "command": "cc:capture",
            "amount": "42.50",
            "refnum": "3102579005"
        })))
        .with_body(approval("3102579100"))
        .expect(1)
        .create();
    let config = config_yaml("capture: false");

    // 1. First run: authorize only
    let orders = orders_csv(&[&order_row(1, "42.50")]);
    let events = events_csv(&[&charge_row(1, "4111111111111111")]);

    let mut cmd1 = gateway_command(orders.path(), events.path(), config.path(), &server.url());
    cmd1.arg("--db-path").arg(&db_path);

    let output1 = cmd1.output().expect("Failed to execute command");
    assert!(output1.status.success());
    let stdout1 = String::from_utf8_lossy(&output1.stdout);
    assert!(stdout1.contains("1,on-hold,3102579005,3102579005,no,0"));

    // 2. Second run: the same order row is ignored, processing captures the stored authorization
    let events = events_csv(&[&status_row(1, "processing")]);

    let mut cmd2 = gateway_command(orders.path(), events.path(), config.path(), &server.url());
    cmd2.arg("--db-path").arg(&db_path);

    let output2 = cmd2.output().expect("Failed to execute command");
    assert!(output2.status.success());
    let stdout2 = String::from_utf8_lossy(&output2.stdout);
    assert!(stdout2.contains("1,processing,3102579100,3102579005,yes,0"));

    authorize.assert();
    capture.assert();
}
