#![allow(dead_code)]

use assert_cmd::cargo_bin;
use std::io::{Error, Write};
use std::path::Path;
use std::process::Command;
use tempfile::NamedTempFile;

pub const ORDERS_HEADER: &str =
    "id, number, total, currency, email, first_name, last_name, street, city, state, postcode, country, status";
pub const EVENTS_HEADER: &str = "type, order, card_number, card_expiry, card_cvc, status, amount, reason";
pub const REPORT_HEADER: &str = "order,status,transaction_id,charge_id,charge_captured,refunded";

pub const TRANSACTIONS_PATH: &str = "/api/v2/transactions";

fn write_csv(header: &str, rows: &[&str]) -> Result<NamedTempFile, Error> {
    let mut file = NamedTempFile::new()?;
    writeln!(file, "{header}")?;
    for row in rows {
        writeln!(file, "{row}")?;
    }
    file.flush()?;
    Ok(file)
}

pub fn orders_csv(rows: &[&str]) -> NamedTempFile {
    write_csv(ORDERS_HEADER, rows).unwrap()
}

pub fn events_csv(rows: &[&str]) -> NamedTempFile {
    write_csv(EVENTS_HEADER, rows).unwrap()
}

/// A $`total` USD order for Ann Lee.
pub fn order_row(id: u64, total: &str) -> String {
    format!(
        "{id}, {id}, {total}, USD, ann@example.com, Ann, Lee, 1 Main St, Springfield, IL, 62701, US, pending"
    )
}

pub fn charge_row(order: u64, card_number: &str) -> String {
    format!("charge, {order}, {card_number}, 09 / 2031, 123, , ,")
}

pub fn status_row(order: u64, status: &str) -> String {
    format!("status, {order}, , , , {status}, ,")
}

pub fn refund_row(order: u64, amount: &str, reason: &str) -> String {
    format!("refund, {order}, , , , , {amount}, {reason}")
}

/// Gateway settings with test credentials plus `extra` YAML lines.
pub fn config_yaml(extra: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "source_key: _V87Qtb513Cd3vabM7RC0TbtJWeSo8p7").unwrap();
    writeln!(file, "pin: \"1234\"").unwrap();
    writeln!(file, "{extra}").unwrap();
    file.flush().unwrap();
    file
}

/// The CLI pointed at `endpoint`, with no ambient gateway environment.
pub fn gateway_command(orders: &Path, events: &Path, config: &Path, endpoint: &str) -> Command {
    let mut cmd = Command::new(cargo_bin!("usaepay-gateway"));
    cmd.arg(orders)
        .arg(events)
        .arg("--config")
        .arg(config)
        .env_remove("USAEPAY_CONFIG")
        .env_remove("USAEPAY_SOURCE_KEY")
        .env_remove("USAEPAY_PIN")
        .env_remove("USAEPAY_SANDBOX")
        .env("USAEPAY_ENDPOINT", format!("{endpoint}{TRANSACTIONS_PATH}"));
    cmd
}

pub fn approval(refnum: &str) -> String {
    format!(
        r#"{{"type":"transaction","refnum":"{refnum}","result_code":"A","result":"Approved","authcode":"314407",
            "avs":{{"result_code":"YYY","result":"Address: Match & 5 Digit Zip: Match"}},
            "cvc":{{"result_code":"M","result":"Match"}}}}"#
    )
}
