use std::path::Path;

use assert_cmd::Command;
use httpmock::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

fn clerk(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("clerk").unwrap();
    cmd.env("HOME", home)
        .env_remove("STRIPE_TEST_SECRET_KEY")
        .env_remove("STRIPE_LIVE_SECRET_KEY")
        .env_remove("RUST_LOG");
    cmd
}

fn initialized() -> TempDir {
    let home = tempfile::tempdir().unwrap();
    let data = home.path().join("data");
    clerk(home.path())
        .args(["init", "--data-dir", data.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized clerk"));
    home
}

fn point_at(home: &Path, server: &MockServer) {
    let path = home.join(".config/clerk/settings.json");
    let mut settings: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    settings["stripe_api_base"] = serde_json::Value::String(server.base_url());
    std::fs::write(&path, settings.to_string()).unwrap();
}

#[test]
fn status_before_init() {
    let home = tempfile::tempdir().unwrap();
    clerk(home.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Database not found"));
}

#[test]
fn commands_require_init() {
    let home = tempfile::tempdir().unwrap();
    clerk(home.path())
        .args(["clients", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: Database not found"));
}

#[test]
fn add_and_list_clients() {
    let home = initialized();
    clerk(home.path())
        .args(["clients", "add", "Acme Plumbing", "--email", "ops@acme.test", "--customer", "cus_1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added client #1"));
    clerk(home.path())
        .args(["clients", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Acme Plumbing"));
    clerk(home.path())
        .args(["clients", "show", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cus_1"));
}

#[test]
fn duplicate_reference_is_rejected() {
    let home = initialized();
    clerk(home.path()).args(["clients", "add", "Acme"]).assert().success();
    clerk(home.path())
        .args(["clients", "ref-add", "1", "payment", "pi_1"])
        .assert()
        .success();
    clerk(home.path())
        .args(["clients", "ref-add", "1", "payment", "pi_1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already linked"));
}

#[test]
fn expense_validation() {
    let home = initialized();
    clerk(home.path())
        .args(["expenses", "add", "Hosting", "--amount", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("amount must be greater than zero"));
    clerk(home.path())
        .args(["expenses", "add", "Hosting", "--amount", "20", "--category", "hosting", "--date", "2025-01-31", "--recurring", "monthly"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Next due: 2025-02-28"));
    clerk(home.path())
        .args(["expenses", "pause", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Paused expense #1"));
}

#[test]
fn sync_without_key_fails() {
    let home = initialized();
    clerk(home.path()).args(["clients", "add", "Acme", "--customer", "cus_1"]).assert().success();
    clerk(home.path())
        .args(["sync", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("STRIPE_TEST_SECRET_KEY"));
}

#[test]
fn sync_reports_partial_failures() {
    let home = initialized();
    let server = MockServer::start();
    point_at(home.path(), &server);

    server.mock(|when, then| {
        when.method(GET).path("/v1/customers/cus_1");
        then.status(200)
            .json_body(serde_json::json!({"id": "cus_1", "name": "Acme"}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/v1/payment_intents/pi_1");
        then.status(200).json_body(serde_json::json!({
            "id": "pi_1", "object": "payment_intent", "amount": 50000,
            "currency": "usd", "status": "succeeded", "created": 1700000000
        }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/v1/payment_intents/pi_2");
        then.status(404).json_body(serde_json::json!({
            "error": {"type": "invalid_request_error", "code": "resource_missing",
                      "message": "No such payment_intent: 'pi_2'"}
        }));
    });

    clerk(home.path()).args(["clients", "add", "Acme", "--customer", "cus_1"]).assert().success();
    clerk(home.path()).args(["clients", "ref-add", "1", "payment", "pi_1"]).assert().success();
    clerk(home.path()).args(["clients", "ref-add", "1", "payment", "pi_2"]).assert().success();

    clerk(home.path())
        .args(["sync", "1"])
        .env("STRIPE_TEST_SECRET_KEY", "sk_test_123")
        .assert()
        .success()
        .stdout(predicate::str::contains("$500.00"))
        .stdout(predicate::str::contains("overdue"))
        .stdout(predicate::str::contains("payment pi_2"));

    clerk(home.path())
        .args(["clients", "show", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("$500.00"))
        .stdout(predicate::str::contains("No such payment_intent"));
}

#[test]
fn ledger_export_with_degraded_lists() {
    let home = initialized();
    let server = MockServer::start();
    point_at(home.path(), &server);

    let empty = serde_json::json!({"object": "list", "data": [], "has_more": false});
    for path in ["/v1/charges", "/v1/subscriptions", "/v1/payment_intents"] {
        let body = empty.clone();
        server.mock(move |when, then| {
            when.method(GET).path(path);
            then.status(200).json_body(body);
        });
    }
    server.mock(|when, then| {
        when.method(GET).path("/v1/invoices");
        then.status(500).json_body(serde_json::json!({"error": {"type": "api_error", "message": "boom"}}));
    });

    clerk(home.path())
        .args(["expenses", "add", "Office rent", "--amount", "1200", "--date", "2025-03-01"])
        .assert()
        .success();

    clerk(home.path())
        .args(["ledger", "export", "--type", "expense", "--search", "RENT"])
        .env("STRIPE_TEST_SECRET_KEY", "sk_test_123")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "2025-03-01,expense_1,expense,Office rent,,-1200.00,usd,completed,",
        ));
}

#[test]
fn ledger_assign_expense_without_stripe() {
    let home = initialized();
    clerk(home.path()).args(["clients", "add", "Acme"]).assert().success();
    clerk(home.path())
        .args(["expenses", "add", "Domain", "--amount", "12"])
        .assert()
        .success();
    clerk(home.path())
        .args(["ledger", "assign", "expense_1", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Assigned expense_1 to client #1"));
    clerk(home.path())
        .args(["ledger", "assign", "charge_ch_1", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("comes from Stripe"));
}

#[test]
fn switch_environment() {
    let home = initialized();
    clerk(home.path())
        .args(["env", "set", "live"])
        .assert()
        .success()
        .stdout(predicate::str::contains("STRIPE_LIVE_SECRET_KEY is not set"));
    clerk(home.path())
        .args(["env", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("live"));
}

#[test]
fn ledger_marks_shared_customer() {
    let home = initialized();
    let server = MockServer::start();
    point_at(home.path(), &server);

    let empty = serde_json::json!({"object": "list", "data": [], "has_more": false});
    for path in ["/v1/invoices", "/v1/subscriptions", "/v1/payment_intents"] {
        let body = empty.clone();
        server.mock(move |when, then| {
            when.method(GET).path(path);
            then.status(200).json_body(body);
        });
    }
    server.mock(|when, then| {
        when.method(GET).path("/v1/charges");
        then.status(200).json_body(serde_json::json!({
            "object": "list", "has_more": false,
            "data": [{"id": "ch_1", "object": "charge", "amount": 2500, "currency": "usd",
                      "status": "succeeded", "created": 1700000000, "customer": "cus_1"}]
        }));
    });

    clerk(home.path()).args(["clients", "add", "Acme", "--customer", "cus_1"]).assert().success();
    clerk(home.path()).args(["clients", "add", "Acme Labs", "--customer", "cus_1"]).assert().success();

    clerk(home.path())
        .args(["ledger", "list"])
        .env("STRIPE_TEST_SECRET_KEY", "sk_test_123")
        .assert()
        .success()
        .stdout(predicate::str::contains("Acme Labs (shared)"))
        .stdout(predicate::str::contains("ch_1"));
}
