use std::fs;
use std::path::Path;

use consentry_cli::{Invocation, invoke};
use serde_json::{Value, json};

fn run_with(jar: &Path, args: &[&str]) -> Invocation {
    let jar = jar.to_string_lossy().into_owned();
    let mut argv = vec!["consentry".to_string(), "--jar".to_string(), jar];
    argv.extend(args.iter().map(ToString::to_string));
    invoke(argv)
}

fn json_stdout(invocation: &Invocation) -> Value {
    assert_eq!(invocation.exit_code, 0, "stderr: {}", invocation.stderr);
    serde_json::from_str(&invocation.stdout).expect("stdout is JSON")
}

#[test]
fn first_status_seeds_the_default_record() {
    let dir = tempfile::tempdir().expect("tempdir");
    let jar = dir.path().join("jar.json");

    let status = json_stdout(&run_with(&jar, &["--output", "json", "status"]));

    assert_eq!(
        status,
        json!({
            "policiesKey": "cookies_policy",
            "policies": {
                "essential": "accepted",
                "settings": "rejected",
                "usage": "rejected"
            }
        })
    );
    assert!(jar.is_file());
}

#[test]
fn decisions_persist_between_invocations() {
    let dir = tempfile::tempdir().expect("tempdir");
    let jar = dir.path().join("jar.json");

    let accepted = run_with(&jar, &["--extra-policy", "marketing", "accept", "marketing"]);
    assert_eq!(accepted.exit_code, 0, "stderr: {}", accepted.stderr);
    assert_eq!(accepted.stdout, "marketing: accepted\n");

    let check = run_with(&jar, &["check", "marketing"]);
    assert_eq!(check.stdout, "marketing: accepted\n");

    let unknown = run_with(&jar, &["check", "video"]);
    assert_eq!(unknown.stdout, "video: unknown\n");
}

#[test]
fn rejecting_essential_leaves_it_accepted() {
    let dir = tempfile::tempdir().expect("tempdir");
    let jar = dir.path().join("jar.json");

    let rejected = run_with(&jar, &["--show-events", "reject", "essential"]);

    assert_eq!(rejected.exit_code, 0);
    assert_eq!(rejected.stdout, "essential: accepted\n");
    assert_eq!(rejected.stderr, "event: rejectPolicy essential\n");
}

#[test]
fn bulk_decisions_cover_every_policy() {
    let dir = tempfile::tempdir().expect("tempdir");
    let jar = dir.path().join("jar.json");

    let all = json_stdout(&run_with(
        &jar,
        &["--output", "json", "--extra-policy", "video", "accept-all"],
    ));
    assert_eq!(
        all["policies"],
        json!({
            "essential": "accepted",
            "settings": "accepted",
            "usage": "accepted",
            "video": "accepted"
        })
    );

    let none = json_stdout(&run_with(&jar, &["--output", "json", "reject-all"]));
    assert_eq!(
        none["policies"],
        json!({
            "essential": "accepted",
            "settings": "rejected",
            "usage": "rejected",
            "video": "rejected"
        })
    );
}

#[test]
fn show_events_reports_accept_in_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let jar = dir.path().join("jar.json");

    let accepted = run_with(&jar, &["--show-events", "--output", "json", "accept", "usage"]);

    assert_eq!(accepted.exit_code, 0);
    let types: Vec<String> = accepted
        .stderr
        .lines()
        .map(|line| {
            let event: Value = serde_json::from_str(line).expect("event line is JSON");
            event["type"].as_str().unwrap_or_default().to_string()
        })
        .collect();
    assert_eq!(types, vec!["cookie_set", "policy_changed", "policy_accepted"]);
}

#[test]
fn cookies_can_be_set_listed_and_deleted() {
    let dir = tempfile::tempdir().expect("tempdir");
    let jar = dir.path().join("jar.json");

    let set = run_with(&jar, &["cookies", "set", "theme", "dark mode"]);
    assert_eq!(set.exit_code, 0, "stderr: {}", set.stderr);

    let get = run_with(&jar, &["cookies", "get", "theme"]);
    assert_eq!(get.stdout, "dark mode\n");

    let list = json_stdout(&run_with(&jar, &["--output", "json", "cookies", "list"]));
    assert_eq!(list["theme"], "dark mode");
    assert!(list.get("cookies_policy").is_some());

    let elsewhere = run_with(&jar, &["cookies", "delete", "theme", "--path", "/shop"]);
    assert_eq!(elsewhere.exit_code, 0);
    assert_eq!(run_with(&jar, &["cookies", "get", "theme"]).exit_code, 0);

    let deleted = run_with(&jar, &["cookies", "delete", "theme"]);
    assert_eq!(deleted.exit_code, 0);
    let missing = run_with(&jar, &["cookies", "get", "theme"]);
    assert_eq!(missing.exit_code, 2);
    assert_eq!(missing.stderr, "error: cookie 'theme' is not set\n");
}

#[test]
fn reset_restores_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let jar = dir.path().join("jar.json");
    assert_eq!(run_with(&jar, &["accept-all"]).exit_code, 0);

    let reset = json_stdout(&run_with(&jar, &["--output", "json", "reset"]));

    assert_eq!(reset["policies"]["usage"], "rejected");
    assert_eq!(reset["policies"]["essential"], "accepted");
}

#[test]
fn config_file_selects_the_policies_key() {
    let dir = tempfile::tempdir().expect("tempdir");
    let jar = dir.path().join("jar.json");
    let config = dir.path().join("consent.json");
    fs::write(&config, r#"{"policiesKey":"embed_policy","extraPolicies":["video"]}"#)
        .expect("write config");
    let config = config.to_string_lossy().into_owned();

    let status = json_stdout(&run_with(
        &jar,
        &["--config", &config, "--output", "json", "status"],
    ));

    assert_eq!(status["policiesKey"], "embed_policy");
    assert_eq!(status["policies"]["video"], "rejected");
}

#[test]
fn blank_policies_key_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let jar = dir.path().join("jar.json");

    let invocation = run_with(&jar, &["--policies-key", " ", "status"]);

    assert_eq!(invocation.exit_code, 2);
    assert_eq!(
        invocation.stderr,
        "error: invalid policiesKey: must not be blank\n"
    );
    assert!(!jar.exists());
}

#[test]
fn corrupt_jar_file_is_an_operational_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    let jar = dir.path().join("jar.json");
    fs::write(&jar, "{ not json").expect("write jar");

    let invocation = run_with(&jar, &["status"]);

    assert_eq!(invocation.exit_code, 3);
    assert!(invocation.stderr.starts_with("error: cookie jar snapshot is invalid"));
}
