mod common;

use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use common::{charge_success_body, sign, sign_with, SECRET};
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

fn seed_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    let seed = serde_json::json!({
        "bookings": [
            { "id": 1, "reference": "LBK-1", "package_id": 10, "agent_id": 9, "status": "pending" }
        ],
        "packages": [
            { "id": 10, "name": "Umrah Standard", "price": "500000" }
        ],
        "agents": [
            { "id": 9, "name": "Al-Safa Travels", "commission_rate": "10", "commission_type": "percentage" }
        ]
    });
    write!(file, "{seed}").unwrap();
    file
}

fn capture_line(signature: &str, body: &[u8]) -> String {
    serde_json::json!({
        "signature": signature,
        "body": String::from_utf8(body.to_vec()).unwrap(),
    })
    .to_string()
}

#[test]
fn test_replay_settles_and_reports_state() {
    let seed = seed_file();
    let body = charge_success_body(1, 45_000_000, "LBK-1-1700000001");

    let mut capture = NamedTempFile::new().unwrap();
    // The same delivery twice: at-least-once redelivery must be a no-op.
    writeln!(capture, "{}", capture_line(&sign(&body), &body)).unwrap();
    writeln!(capture, "{}", capture_line(&sign(&body), &body)).unwrap();

    let mut cmd = Command::new(cargo_bin!("labbaik-settlement"));
    cmd.arg(seed.path())
        .arg(capture.path())
        .arg("--secret")
        .arg(SECRET);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("200 settled"))
        .stdout(predicate::str::contains("200 already settled"))
        .stdout(predicate::str::contains("LBK-1,confirmed"))
        .stdout(predicate::str::contains("1,gateway,verified,450000"));
}

#[test]
fn test_replay_rejects_forged_delivery() {
    let seed = seed_file();
    let body = charge_success_body(1, 45_000_000, "LBK-1-1700000001");

    let mut capture = NamedTempFile::new().unwrap();
    writeln!(
        capture,
        "{}",
        capture_line(&sign_with("wrong_secret", &body), &body)
    )
    .unwrap();

    let mut cmd = Command::new(cargo_bin!("labbaik-settlement"));
    cmd.arg(seed.path())
        .arg(capture.path())
        .arg("--secret")
        .arg(SECRET);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("401 invalid signature"))
        .stdout(predicate::str::contains("LBK-1,pending"));
}

#[test]
fn test_replay_flags_amount_mismatch() {
    let seed = seed_file();
    // 100 units short of the resolved 450000.
    let body = charge_success_body(1, 44_990_000, "LBK-1-1700000001");

    let mut capture = NamedTempFile::new().unwrap();
    writeln!(capture, "{}", capture_line(&sign(&body), &body)).unwrap();

    let mut cmd = Command::new(cargo_bin!("labbaik-settlement"));
    cmd.arg(seed.path())
        .arg(capture.path())
        .arg("--secret")
        .arg(SECRET);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("403 payment could not be verified"))
        .stdout(predicate::str::contains("LBK-1,pending"));
}
