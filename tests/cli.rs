use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

/// Command isolated from any user config, with all time windows at zero.
fn base_cmd(config_home: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("roster"));
    cmd.env("XDG_CONFIG_HOME", config_home.path())
        .env_remove("ROSTER_CONFIG")
        .env_remove("RUST_LOG")
        .args(["--debounce-ms", "0", "--latency-ms", "0", "--linger-ms", "0"]);
    cmd
}

fn json_stdout(cmd: &mut Command) -> Value {
    let assert = cmd.assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    serde_json::from_str(stdout.trim()).expect("valid JSON output")
}

#[test]
fn search_prints_matching_names() {
    let home = TempDir::new().unwrap();
    base_cmd(&home)
        .args(["search", "ryan w"])
        .assert()
        .success()
        .stdout("Ryan Winthrop\n");
}

#[test]
fn search_json_has_query_count_and_results() {
    let home = TempDir::new().unwrap();
    let json = json_stdout(base_cmd(&home).args(["search", "jo", "--json"]));

    assert_eq!(json["query"], "jo");
    assert_eq!(json["count"], 2);
    let results = json["results"].as_array().unwrap();
    assert_eq!(results[0]["first_name"], "John");
    assert_eq!(results[1]["first_name"], "Jeff");
}

#[test]
fn empty_query_lists_everyone_in_order() {
    let home = TempDir::new().unwrap();
    let json = json_stdout(base_cmd(&home).args(["search", "", "--json"]));

    assert_eq!(json["count"], 7);
    assert_eq!(json["results"][0]["first_name"], "Noordeep");
    assert_eq!(json["results"][6]["last_name"], "Roy");
}

#[test]
fn search_without_matches_prints_nothing() {
    let home = TempDir::new().unwrap();
    base_cmd(&home)
        .args(["search", "zzz"])
        .assert()
        .success()
        .stdout("");
}

#[test]
fn records_lists_sample_roster() {
    let home = TempDir::new().unwrap();
    base_cmd(&home)
        .arg("records")
        .assert()
        .success()
        .stdout(contains("Noordeep Sidhu"))
        .stdout(contains("Susan Roy"));
}

#[test]
fn config_file_replaces_records() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("custom.toml");
    fs::write(
        &config,
        r#"
[[records]]
first_name = "Ada"
last_name = "Lovelace"

[[records]]
first_name = "Alan"
last_name = "Turing"
"#,
    )
    .unwrap();

    base_cmd(&home)
        .args(["--config", config.to_str().unwrap(), "search", "a e"])
        .assert()
        .success()
        .stdout("Ada Lovelace\n");
}

#[test]
fn default_config_location_is_used() {
    let home = TempDir::new().unwrap();
    let dir = home.path().join("roster");
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("config.toml"),
        "[[records]]\nfirst_name = \"Grace\"\nlast_name = \"Hopper\"\n",
    )
    .unwrap();

    base_cmd(&home)
        .arg("records")
        .assert()
        .success()
        .stdout("Grace Hopper\n");
}

#[test]
fn invalid_config_fails_with_context() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("bad.toml");
    fs::write(&config, "[[records]]\nfirst_name = \"\"\nlast_name = \"X\"\n").unwrap();

    base_cmd(&home)
        .args(["--config", config.to_str().unwrap(), "records"])
        .assert()
        .failure()
        .stderr(contains("load config from"))
        .stderr(contains("empty name"));
}

#[test]
fn watch_reports_transitions_for_final_query() {
    let home = TempDir::new().unwrap();
    let assert = base_cmd(&home)
        .args(["watch", "--json"])
        .write_stdin("s\nsu\nsusan\n")
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();

    let events: Vec<Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).expect("one JSON object per line"))
        .collect();
    assert!(!events.is_empty());
    assert!(events.iter().all(|e| e["event"] == "busy" || e["event"] == "results"));

    let last_results = events
        .iter()
        .rev()
        .find(|e| e["event"] == "results")
        .expect("results published");
    assert_eq!(last_results["count"], 1);
    assert_eq!(last_results["results"][0]["first_name"], "Susan");

    let last = events.last().unwrap();
    assert_eq!(last["event"], "busy");
    assert_eq!(last["busy"], false);
}

#[test]
fn verbose_logs_go_to_stderr() {
    let home = TempDir::new().unwrap();
    base_cmd(&home)
        .args(["-v", "search", "ryan w"])
        .assert()
        .success()
        .stdout("Ryan Winthrop\n")
        .stderr(contains("search_complete"))
        .stdout(predicate::str::contains("search_complete").not());
}
