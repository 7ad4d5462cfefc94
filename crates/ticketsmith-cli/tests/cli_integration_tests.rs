//! CLI integration tests for ticketsmith
//!
//! Tests the ticketsmith CLI commands end-to-end using assert_cmd. Every
//! test gets its own config directory and database file.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

/// Command isolated from the user's config, database and API keys
#[allow(deprecated)]
fn ticketsmith_cmd(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("ticketsmith").unwrap();
    cmd.env("TICKETSMITH_CONFIG_DIR", home.path())
        .env("TICKETSMITH_DB_PATH", home.path().join("ticketsmith.db"))
        .env_remove("TICKETSMITH_API_KEY")
        .env_remove("OPENAI_API_KEY")
        .env("RUST_LOG", "off")
        .current_dir(home.path());
    cmd
}

/// Run with --format json and parse stdout
fn run_json(home: &TempDir, args: &[&str]) -> Value {
    let output = ticketsmith_cmd(home)
        .args(args)
        .args(["--format", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    serde_json::from_slice(&output).expect("stdout should be JSON")
}

fn str_field<'a>(value: &'a Value, path: &[&str]) -> &'a str {
    path.iter()
        .fold(value, |v, key| &v[*key])
        .as_str()
        .unwrap_or_else(|| panic!("missing field {:?} in {}", path, value))
}

/// Register an org and return (org id, admin id)
fn register(home: &TempDir) -> (String, String) {
    let reg = run_json(
        home,
        &[
            "org",
            "register",
            "--name",
            "Acme",
            "--admin-name",
            "ada lovelace",
            "--admin-email",
            "ada@acme.io",
        ],
    );
    (
        str_field(&reg, &["organization", "id"]).to_string(),
        str_field(&reg, &["admin", "id"]).to_string(),
    )
}

#[test]
fn test_help() {
    let home = TempDir::new().unwrap();
    ticketsmith_cmd(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("tickets"))
        .stdout(predicate::str::contains("projects"));
}

#[test]
fn test_org_register_text_output() {
    let home = TempDir::new().unwrap();
    ticketsmith_cmd(&home)
        .args([
            "org",
            "register",
            "--name",
            "Acme",
            "--admin-name",
            "Ada",
            "--admin-email",
            "ada@acme.io",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Organization registered!"))
        .stdout(predicate::str::contains("acme.io"));
}

#[test]
fn test_org_register_same_domain_fails() {
    let home = TempDir::new().unwrap();
    register(&home);

    ticketsmith_cmd(&home)
        .args([
            "org",
            "register",
            "--name",
            "Acme Two",
            "--admin-name",
            "Bob",
            "--admin-email",
            "bob@acme.io",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E010"));
}

#[test]
fn test_employees_add_and_list() {
    let home = TempDir::new().unwrap();
    let (org, _) = register(&home);

    let dev = run_json(
        &home,
        &[
            "employees",
            "add",
            "--org",
            &org,
            "--name",
            "Grace",
            "--email",
            "grace@acme.io",
            "--role",
            "developer",
            "--skills",
            "Go, Docker",
        ],
    );
    assert_eq!(str_field(&dev, &["role"]), "DEVELOPER");
    assert_eq!(dev["skills"], serde_json::json!(["Go", "Docker"]));

    let developers = run_json(&home, &["employees", "list", "--org", &org, "--role", "DEVELOPER"]);
    assert_eq!(developers.as_array().map(Vec::len), Some(1));

    let everyone = run_json(&home, &["employees", "list", "--org", &org]);
    assert_eq!(everyone.as_array().map(Vec::len), Some(2));

    let dev_id = str_field(&dev, &["id"]).to_string();
    let updated = run_json(&home, &["employees", "skills", &dev_id, "Rust"]);
    assert_eq!(updated["skills"], serde_json::json!(["Rust"]));
}

#[test]
fn test_employees_add_bad_role() {
    let home = TempDir::new().unwrap();
    let (org, _) = register(&home);

    ticketsmith_cmd(&home)
        .args([
            "employees",
            "add",
            "--org",
            &org,
            "--name",
            "Grace",
            "--email",
            "grace@acme.io",
            "--role",
            "intern",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E800"));
}

#[test]
fn test_projects_create_list_show() {
    let home = TempDir::new().unwrap();
    let (org, admin) = register(&home);

    let project = run_json(
        &home,
        &[
            "projects",
            "create",
            "--org",
            &org,
            "--title",
            "web portal",
            "--description",
            "Customer facing web portal",
            "--manager",
            &admin,
            "--techlead",
            &admin,
            "--techstack",
            "Go,Docker",
        ],
    );
    assert_eq!(str_field(&project, &["title"]), "Web Portal");
    let project_id = str_field(&project, &["id"]).to_string();

    let listed = run_json(&home, &["projects", "list", "--as", &admin]);
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    let board = run_json(&home, &["projects", "show", &project_id]);
    let columns: Vec<&str> = board["columns"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();
    assert_eq!(columns, vec!["in-progress", "in-testing", "completed"]);

    ticketsmith_cmd(&home)
        .args(["projects", "show", &project_id])
        .assert()
        .success()
        .stdout(predicate::str::contains("In Progress (0)"));
}

#[test]
fn test_ticket_create_without_api_key_fails() {
    let home = TempDir::new().unwrap();
    let (org, admin) = register(&home);
    let project = run_json(
        &home,
        &[
            "projects",
            "create",
            "--org",
            &org,
            "--title",
            "Platform",
            "--description",
            "Shared platform services",
            "--manager",
            &admin,
            "--techlead",
            &admin,
        ],
    );
    let project_id = str_field(&project, &["id"]);

    ticketsmith_cmd(&home)
        .args(["tickets", "create", "--as", &admin, "--project", project_id, "fix the login page"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E600"));
}

#[test]
fn test_ticket_create_unknown_project_without_api_key() {
    let home = TempDir::new().unwrap();
    let (_, admin) = register(&home);

    ticketsmith_cmd(&home)
        .args(["tickets", "create", "--as", &admin, "--project", "missing", "fix the login page"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E001"))
        .stderr(predicate::str::contains("E600").not());
}

#[test]
fn test_ticket_advance_unknown() {
    let home = TempDir::new().unwrap();
    register(&home);

    ticketsmith_cmd(&home)
        .args(["tickets", "advance", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E002"));

    ticketsmith_cmd(&home)
        .args(["tickets", "advance", "missing", "--to", "blocked"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E800"));
}

#[test]
fn test_config_set_get_list_reset() {
    let home = TempDir::new().unwrap();

    ticketsmith_cmd(&home)
        .args(["config", "set", "assignment.extraction_timeout_secs", "45"])
        .assert()
        .success();

    ticketsmith_cmd(&home)
        .args(["config", "get", "assignment.extraction_timeout_secs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("45"));

    ticketsmith_cmd(&home)
        .args(["config", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("llm.default_model = gpt-3.5-turbo"));

    ticketsmith_cmd(&home)
        .args(["config", "set", "llm.api_key", "sk-secret"])
        .assert()
        .failure();

    ticketsmith_cmd(&home).args(["config", "reset"]).assert().success();

    ticketsmith_cmd(&home)
        .args(["config", "get", "assignment.extraction_timeout_secs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("30"));
}

#[test]
fn test_doctor_runs() {
    let home = TempDir::new().unwrap();
    ticketsmith_cmd(&home)
        .arg("doctor")
        .assert()
        .success()
        .stdout(predicate::str::contains("Ticketsmith Health Check"))
        .stdout(predicate::str::contains("[OK] Database: Connected"));
}
