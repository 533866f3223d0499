use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

struct Sandbox {
    config: TempDir,
    data: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let sandbox = Self {
            config: TempDir::new().unwrap(),
            data: TempDir::new().unwrap(),
        };
        sandbox
            .buddy()
            .args(["init", "--data-dir"])
            .arg(sandbox.data.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("Initialized budget buddy"));
        sandbox
    }

    fn buddy(&self) -> Command {
        let mut cmd = Command::cargo_bin("buddy").unwrap();
        cmd.env("BUDDY_CONFIG_DIR", self.config.path())
            .env_remove("BUDDY_LOG");
        cmd
    }

    fn register(&self, id: &str) {
        self.buddy()
            .args(["users", "register", id, "--email", "a@example.com", "--budget", "500"])
            .assert()
            .success();
    }

    fn expense(&self, user: &str, title: &str, amount: &str, category: &str, date: &str) {
        self.buddy()
            .args([
                "expenses", "add", user, "--title", title, "--amount", amount, "--category",
                category, "--date", date,
            ])
            .assert()
            .success();
    }
}

#[test]
fn expense_updates_user_summary_and_insights() {
    let sb = Sandbox::new();
    sb.register("u1");
    sb.expense("u1", "Lunch", "12.50", "food", "2024-03-04");
    sb.expense("u1", "Bus", "30", "transport", "2024-04-02");

    sb.buddy()
        .args(["users", "show", "u1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("used $42.50"));

    sb.buddy()
        .args(["insights", "u1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Your top spending category is transport with $30.00"))
        .stdout(predicate::str::contains("compared to last month"));
}

#[test]
fn insights_json_uses_type_field() {
    let sb = Sandbox::new();
    sb.register("u1");
    sb.expense("u1", "Lunch", "12.50", "food", "2024-03-04");

    sb.buddy()
        .args(["insights", "u1", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"type\": \"top_categories\""));
}

#[test]
fn expense_for_unknown_user_fails() {
    let sb = Sandbox::new();
    sb.buddy()
        .args(["expenses", "add", "ghost", "--title", "x", "--amount", "1", "--category", "food"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown user"));
}

#[test]
fn bad_date_is_rejected() {
    let sb = Sandbox::new();
    sb.register("u1");
    sb.buddy()
        .args([
            "expenses", "add", "u1", "--title", "x", "--amount", "1", "--category", "food",
            "--date", "03/04/2024",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid record"));
}

#[test]
fn voice_parses_amount_and_category() {
    let sb = Sandbox::new();
    sb.buddy()
        .args(["voice", "Spent $12.50 on groceries"])
        .assert()
        .success()
        .stdout(predicate::str::contains("$12.50"))
        .stdout(predicate::str::contains("food"));
}

#[test]
fn voice_save_without_amount_fails() {
    let sb = Sandbox::new();
    sb.register("u1");
    sb.buddy()
        .args(["voice", "bought some shoes", "--user", "u1", "--save"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not find an amount"));
}

#[test]
fn voice_save_records_expense() {
    let sb = Sandbox::new();
    sb.register("u1");
    sb.buddy()
        .args(["voice", "taxi 18", "--user", "u1", "--save"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved $18.00 in transport"));

    sb.buddy()
        .args(["expenses", "list", "u1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("taxi 18"));
}

#[test]
fn predict_without_model_fails() {
    let sb = Sandbox::new();
    sb.buddy()
        .args(["predict", "--amount", "10", "--description", "lunch"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No trained category model"));
}

#[test]
fn train_needs_ten_records() {
    let sb = Sandbox::new();
    sb.register("u1");
    sb.expense("u1", "Lunch", "12", "food", "2024-03-04");

    sb.buddy()
        .arg("train")
        .assert()
        .success()
        .stdout(predicate::str::contains("Need at least 10 transactions, found 1"));
}

#[test]
fn train_then_predict() {
    let sb = Sandbox::new();
    sb.register("u1");
    sb.register("u2");
    for i in 0..6 {
        let day = format!("2024-03-{:02}", i + 1);
        sb.expense("u1", "lunch", &format!("{}", 10 + i), "food", &day);
        sb.expense("u2", "rent for unit 4b", &format!("{}", 1200 + i * 10), "housing", &day);
    }

    sb.buddy()
        .arg("train")
        .assert()
        .success()
        .stdout(predicate::str::contains("AI model trained successfully with 12 transactions"));

    assert!(sb.data.path().join("models/category_prediction_model.json").exists());

    sb.buddy()
        .args([
            "predict",
            "--amount",
            "1210",
            "--date",
            "2024-03-03",
            "--description",
            "rent for unit 4b",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("housing"));
}

#[test]
fn category_lifecycle() {
    let sb = Sandbox::new();
    sb.register("u1");
    sb.buddy()
        .args(["categories", "add", "u1", "Pets", "--allocated", "80", "--id", "pets"])
        .assert()
        .success();
    sb.expense("u1", "Vet", "20", "pets", "2024-03-04");

    sb.buddy()
        .args(["categories", "update", "u1", "pets", "--allocated", "100"])
        .assert()
        .success()
        .stdout(predicate::str::contains("$80.00 remaining of $100.00"));

    sb.buddy()
        .args(["categories", "delete", "u1", "pets"])
        .assert()
        .success();
    sb.buddy()
        .args(["categories", "delete", "u1", "pets"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown category"));
}

#[test]
fn negative_or_infinite_expense_is_rejected() {
    let sb = Sandbox::new();
    sb.register("u1");
    for amount in ["--amount=-50", "--amount=inf"] {
        sb.buddy()
            .args(["expenses", "add", "u1", "--title", "x", amount, "--category", "food"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid record"));
    }
    sb.buddy()
        .args(["users", "show", "u1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("used $0.00"));
}

#[test]
fn suggest_lists_model_categories() {
    let sb = Sandbox::new();
    sb.register("u1");
    sb.buddy()
        .args(["expenses", "suggest", "u1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No trained category model"));

    for i in 0..5 {
        let day = format!("2024-05-{:02}", i + 1);
        sb.expense("u1", "lunch", &format!("{}", 10 + i), "food", &day);
        sb.expense("u1", "rent for unit 4b", &format!("{}", 1200 + i * 10), "housing", &day);
    }
    sb.buddy().arg("train").assert().success();

    sb.buddy()
        .args(["expenses", "suggest", "u1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Suggested categories"))
        .stdout(predicate::str::contains("rent for unit 4b"));
}
