mod common;

use assert_cmd::prelude::*;
use common::*;
use mockito::Matcher;
use predicates::prelude::*;
use serde_json::json;

#[test]
fn test_cli_authorize_then_capture() {
    let mut server = mockito::Server::new();
    let authorize = server
        .mock("POST", TRANSACTIONS_PATH)
        .match_header("authorization", Matcher::Regex("^Basic ".to_string()))
        .match_body(Matcher::PartialJson(json!({
            "command": "cc:authonly",
            "amount": "42.50",
            "invoice": "1",
            "creditcard": {"number": "4111111111111111", "expiration": "0931", "cvc": "123"}
        })))
        .with_body(approval("3102579005"))
        .expect(1)
        .create();
    let capture = server
        .mock("POST", TRANSACTIONS_PATH)
        .match_body(Matcher::Json(json!({
            "command": "cc:capture",
            "amount": "42.50",
            "refnum": "3102579005"
        })))
        .with_body(approval("3102579100"))
        .expect(1)
        .create();

    let orders = orders_csv(&[&order_row(1, "42.50")]);
    let events = events_csv(&[
        &charge_row(1, "4111 1111 1111 1111"),
        &status_row(1, "processing"),
    ]);
    let config = config_yaml("capture: false");

    gateway_command(orders.path(), events.path(), config.path(), &server.url())
        .assert()
        .success()
        .stdout(predicate::str::contains(REPORT_HEADER))
        .stdout(predicate::str::contains("1,processing,3102579100,3102579005,yes,0"));

    authorize.assert();
    capture.assert();
}

#[test]
fn test_cli_sale_captures_immediately() {
    let mut server = mockito::Server::new();
    let sale = server
        .mock("POST", TRANSACTIONS_PATH)
        .match_body(Matcher::PartialJson(json!({"command": "cc:sale", "amount": "19.99"})))
        .with_body(approval("3102579005"))
        .expect(1)
        .create();

    let orders = orders_csv(&[&order_row(1, "19.99")]);
    let events = events_csv(&[
        &charge_row(1, "5555555555554444"),
        // Already captured: completing the order sends nothing.
        &status_row(1, "completed"),
    ]);
    let config = config_yaml("capture: true");

    gateway_command(orders.path(), events.path(), config.path(), &server.url())
        .assert()
        .success()
        .stdout(predicate::str::contains("1,completed,3102579005,3102579005,yes,0"));

    sale.assert();
}

#[test]
fn test_cli_rejects_disallowed_card_without_calling_gateway() {
    let mut server = mockito::Server::new();
    let any = server
        .mock("POST", Matcher::Any)
        .with_body(approval("1"))
        .expect(0)
        .create();

    let orders = orders_csv(&[&order_row(1, "42.50")]);
    let events = events_csv(&[&charge_row(1, "6011000000000004")]);
    let config = config_yaml("allowed_card_types: [visa, mastercard]");

    gateway_command(orders.path(), events.path(), config.path(), &server.url())
        .assert()
        .success()
        .stderr(predicate::str::contains("Card Type Not Accepted"))
        .stdout(predicate::str::contains("1,failed,,,,0"));

    any.assert();
}

#[test]
fn test_cli_decline_fails_order() {
    let mut server = mockito::Server::new();
    let _decline = server
        .mock("POST", TRANSACTIONS_PATH)
        .with_body(r#"{"result":"Declined","error_code":"10127","error":"Card Declined"}"#)
        .create();

    let orders = orders_csv(&[&order_row(1, "42.50")]);
    let events = events_csv(&[&charge_row(1, "4111111111111111")]);
    let config = config_yaml("");

    gateway_command(orders.path(), events.path(), config.path(), &server.url())
        .assert()
        .success()
        .stderr(predicate::str::contains("Gateway Error: Card Declined (error 10127)"))
        .stdout(predicate::str::contains("1,failed,,,,0"));
}

#[test]
fn test_cli_cancel_voids_authorization() {
    let mut server = mockito::Server::new();
    let _authorize = server
        .mock("POST", TRANSACTIONS_PATH)
        .match_body(Matcher::PartialJson(json!({"command": "cc:authonly"})))
        .with_body(approval("3102579005"))
        .create();
    let void = server
        .mock("POST", TRANSACTIONS_PATH)
        .match_body(Matcher::Json(json!({"command": "void", "refnum": "3102579005"})))
        .with_body(approval("3102579005"))
        .expect(1)
        .create();

    let orders = orders_csv(&[&order_row(1, "42.50")]);
    let events = events_csv(&[
        &charge_row(1, "4111111111111111"),
        &status_row(1, "cancelled"),
    ]);
    let config = config_yaml("capture: false");

    gateway_command(orders.path(), events.path(), config.path(), &server.url())
        .assert()
        .success()
        .stdout(predicate::str::contains("1,cancelled,3102579005,,,0"));

    void.assert();
}

#[test]
fn test_cli_refund() {
    let mut server = mockito::Server::new();
    let _sale = server
        .mock("POST", TRANSACTIONS_PATH)
        .match_body(Matcher::PartialJson(json!({"command": "cc:sale"})))
        .with_body(approval("3102579005"))
        .create();
    let refund = server
        .mock("POST", TRANSACTIONS_PATH)
        .match_body(Matcher::PartialJson(json!({
            "command": "refund",
            "amount": "10.00",
            "refnum": "3102579005"
        })))
        .with_body(approval("3102579200"))
        .expect(1)
        .create();

    let orders = orders_csv(&[&order_row(1, "42.50")]);
    let events = events_csv(&[
        &charge_row(1, "4111111111111111"),
        &refund_row(1, "10.00", "Damaged"),
        &refund_row(1, "0", "Nothing"),
    ]);
    let config = config_yaml("");

    gateway_command(orders.path(), events.path(), config.path(), &server.url())
        .assert()
        .success()
        .stderr(predicate::str::contains("Amount must be positive"))
        .stdout(predicate::str::contains("1,processing,3102579005,3102579005,yes,10.00"));

    refund.assert();
}
