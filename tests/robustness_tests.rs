mod common;

use assert_cmd::prelude::*;
use common::*;
use predicates::prelude::*;

#[test]
fn test_bad_rows_are_reported_and_skipped() {
    let orders = orders_csv(&[
        "oops, 1, 10.00",
        &order_row(2, "15.00"),
        &order_row(3, "15.00").replace("USD", "EUR"),
    ]);
    let events = events_csv(&[
        "teleport, 2, , , , , ,",
        &status_row(2, ""),
        &charge_row(2, ""),
        &charge_row(3, "4111111111111111"),
        &status_row(99, "processing"),
        &status_row(2, "on-hold"),
    ]);
    let config = config_yaml("");

    // Nothing reaches the network: every charge is rejected up front.
    gateway_command(orders.path(), events.path(), config.path(), "http://127.0.0.1:1")
        .assert()
        .success()
        .stderr(predicate::str::contains("Error reading order"))
        .stderr(predicate::str::contains("Error reading event"))
        .stderr(predicate::str::contains("has no status"))
        .stderr(predicate::str::contains("Credit card details cannot be left incomplete."))
        .stderr(predicate::str::contains("USAePay supports only USD currency."))
        .stderr(predicate::str::contains("Order 99 not found"))
        .stdout(predicate::str::contains("2,on-hold,,,,0"))
        .stdout(predicate::str::contains("3,pending,,,,0"));
}

#[test]
fn test_missing_credentials_make_gateway_unavailable() {
    let orders = orders_csv(&[&order_row(1, "10.00")]);
    let events = events_csv(&[&charge_row(1, "4111111111111111")]);
    let mut config = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(&mut config, b"source_key: \"\"\n").unwrap();

    gateway_command(orders.path(), events.path(), config.path(), "http://127.0.0.1:1")
        .assert()
        .success()
        .stderr(predicate::str::contains("Please enter your Source Key"))
        .stdout(predicate::str::contains("1,pending,,,,0"));
}

#[test]
fn test_missing_input_file_fails() {
    let events = events_csv(&[]);
    let config = config_yaml("");

    gateway_command(
        std::path::Path::new("does/not/exist.csv"),
        events.path(),
        config.path(),
        "http://127.0.0.1:1",
    )
    .assert()
    .failure();
}
