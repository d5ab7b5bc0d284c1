//! Integration tests for the trainer binary.
//!
//! These tests verify end-to-end behavior including:
//! - Preset listing and step expansion
//! - Running sessions and persisting them between invocations
//! - Status, reset and the global stopwatch

use assert_cmd::Command;
use predicates::prelude::*;
use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::Stdio;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

/// Helper to create a test data directory
fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Helper to get the CLI binary, isolated from the user's config and data
fn cli(data_dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("trainer"));
    cmd.env("XDG_CONFIG_HOME", data_dir.join("config"))
        .env_remove("RUST_LOG")
        .arg("--data-dir")
        .arg(data_dir);
    cmd
}

fn status_json(data_dir: &Path, category: &str) -> serde_json::Value {
    let output = cli(data_dir)
        .args(["status", "--json", "--category", category])
        .output()
        .expect("Failed to run status");
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).expect("status --json is not JSON")
}

#[test]
fn test_cli_help() {
    Command::new(assert_cmd::cargo::cargo_bin!("trainer"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Workout and mobility session timer"));
}

#[test]
fn test_presets_lists_builtins() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .arg("presets")
        .assert()
        .success()
        .stdout(predicate::str::contains("preMobility:"))
        .stdout(predicate::str::contains("morning_mobility"))
        .stdout(predicate::str::contains("strength_block  Strength Block (3 exercises, 2-day plan)"))
        .stdout(predicate::str::contains("cooldown"));
}

#[test]
fn test_presets_filtered_by_category() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .args(["presets", "--category", "post"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cooldown"))
        .stdout(predicate::str::contains("strength_block").not());
}

#[test]
fn test_unknown_category_rejected() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .args(["presets", "--category", "cardio"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown category"));
}

#[test]
fn test_steps_for_circuit() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .args(["steps", "morning_mobility"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cat-Cow: Setup [0:05]"))
        .stdout(predicate::str::contains("Cat-Cow: Set 1 of 2 • 45s [0:45]"))
        .stdout(predicate::str::contains("90/90 Hip Switch: Set 1 of 1 (left) • 40s"))
        .stdout(predicate::str::contains("Rest (between exercises) [0:15]"))
        .stdout(predicate::str::contains("completed      Completed"));
}

#[test]
fn test_steps_for_plan_day() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .args(["steps", "strength_block", "--plan", "--day", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Paused Squat: Warm-up • Set 1/1 • 3 reps"))
        .stdout(predicate::str::contains(
            "Paused Squat: Working • Set 4/4 • 3 reps • Intensity RPE 8 • Weight 90kg • Tempo 2-2-1",
        ));
}

#[test]
fn test_steps_for_selected_exercise() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .args(["steps", "strength_block", "--exercise", "bench_press"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Bench Press: Setup [0:15]"))
        .stdout(predicate::str::contains("Back Squat").not());
}

#[test]
fn test_steps_unknown_preset_fails() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .args(["steps", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("preset 'nope'"));
}

#[test]
fn test_run_auto_complete_finishes_circuit() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .args(["run", "cooldown", "--auto-complete"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Couch Stretch: Set 1 of 1 (left) • 30s"))
        .stdout(predicate::str::contains("Session complete"));

    let snap = status_json(temp_dir.path(), "postMobility");
    assert_eq!(snap["state"], "completed");
    assert_eq!(snap["currentStep"]["kind"], "completed");
}

#[test]
fn test_run_auto_complete_walks_every_exercise() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .args(["run", "strength_block", "--auto-complete"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Back Squat: Warm-up • Set 1/2"))
        .stdout(predicate::str::contains("Bench Press: Setup"))
        .stdout(predicate::str::contains("Plank: Working • Set 3/3 • 45s"))
        .stdout(predicate::str::contains("Up next: Bench Press"));

    let snap = status_json(temp_dir.path(), "workout");
    assert_eq!(snap["state"], "completed");
    assert_eq!(snap["currentStep"]["label"], "Completed");
}

#[test]
fn test_quit_keeps_session_for_status() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .args(["run", "strength_block"])
        .write_stdin("q\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Session saved"));

    assert!(temp_dir
        .path()
        .join("state/engine.snapshot.workout.v1.json")
        .exists());

    cli(temp_dir.path())
        .args(["status", "--category", "workout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("workout: activeSet"))
        .stdout(predicate::str::contains("Back Squat: Warm-up • Set 1/2 • 5 reps"))
        .stdout(predicate::str::contains("Next: Back Squat: Rest (warm-up)"));
}

#[test]
fn test_interactive_done_and_pause_persist() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .args(["run", "strength_block"])
        .write_stdin("d\np\nq\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Paused"));

    let snap = status_json(temp_dir.path(), "workout");
    assert_eq!(snap["state"], "resting");
    assert_eq!(snap["isPaused"], true);
    assert_eq!(snap["stepIndex"], 1);
    let remaining = snap["timeRemainingSeconds"].as_u64().unwrap();
    assert!((50..=60).contains(&remaining), "remaining {}", remaining);
}

#[test]
fn test_run_resumes_session_in_progress() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .args(["run", "strength_block"])
        .write_stdin("d\nq\n")
        .assert()
        .success();

    cli(temp_dir.path())
        .args(["run", "strength_block"])
        .write_stdin("q\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Resuming session in progress"));

    let snap = status_json(temp_dir.path(), "workout");
    assert_eq!(snap["stepIndex"], 1);
}

#[test]
fn test_full_reset_from_run() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .args(["run", "morning_mobility"])
        .write_stdin("R\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Session reset."));

    let snap = status_json(temp_dir.path(), "preMobility");
    assert_eq!(snap["state"], "idle");
    assert!(!temp_dir
        .path()
        .join("state/engine.snapshot.preMobility.v1.json")
        .exists());
}

#[test]
fn test_reset_command_clears_category() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .args(["run", "strength_block"])
        .write_stdin("q\n")
        .assert()
        .success();

    cli(temp_dir.path())
        .args(["reset", "--category", "workout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Reset workout"));

    cli(temp_dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("preMobility: idle"))
        .stdout(predicate::str::contains("workout: idle"))
        .stdout(predicate::str::contains("postMobility: idle"));
}

#[test]
fn test_stopwatch_lifecycle() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .args(["stopwatch", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Stopwatch: paused 0:00"));

    cli(temp_dir.path())
        .args(["stopwatch", "start"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Stopwatch: running"));

    cli(temp_dir.path())
        .args(["stopwatch", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("running"));

    cli(temp_dir.path())
        .args(["stopwatch", "pause"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Stopwatch: paused"));

    cli(temp_dir.path())
        .args(["stopwatch", "reset"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Stopwatch: paused 0:00"));

    assert!(!temp_dir.path().join("state/globalTimer.v1.json").exists());
}

#[test]
fn test_presets_loaded_from_data_dir() {
    let temp_dir = setup_test_dir();
    fs::write(
        temp_dir.path().join("presets.json"),
        r#"{
            "version": 1,
            "workouts": [{
                "id": "evening",
                "name": "Evening Flow",
                "category": "postMobility",
                "exercises": [
                    { "id": "fold", "name": "Forward Fold", "mode": "time", "durationSeconds": 20, "sets": 2 }
                ]
            }]
        }"#,
    )
    .unwrap();

    cli(temp_dir.path())
        .arg("presets")
        .assert()
        .success()
        .stdout(predicate::str::contains("evening  Evening Flow (1 exercises)"))
        .stdout(predicate::str::contains("morning_mobility").not());

    cli(temp_dir.path())
        .args(["steps", "evening"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Forward Fold: Set 2 of 2 • 20s"));
}

#[test]
fn test_config_presets_path_is_used() {
    let temp_dir = setup_test_dir();
    let config_dir = temp_dir.path().join("config/trainer");
    fs::create_dir_all(&config_dir).unwrap();

    let presets = temp_dir.path().join("elsewhere.json");
    fs::write(
        &presets,
        r#"[{ "id": "legs", "name": "Leg Day", "category": "workout",
              "exercises": [{ "id": "squat", "name": "Squat", "reps": 5, "workingSets": 1 }] }]"#,
    )
    .unwrap();
    fs::write(
        config_dir.join("config.toml"),
        format!("[library]\npresets_path = {:?}\n", presets),
    )
    .unwrap();

    cli(temp_dir.path())
        .arg("presets")
        .assert()
        .success()
        .stdout(predicate::str::contains("legs  Leg Day"));
}

#[test]
fn test_interactive_countdown_refreshes_while_running() {
    let temp_dir = setup_test_dir();

    let mut child = std::process::Command::new(assert_cmd::cargo::cargo_bin!("trainer"))
        .env("XDG_CONFIG_HOME", temp_dir.path().join("config"))
        .env_remove("RUST_LOG")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .args(["run", "cooldown"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("Failed to spawn trainer");

    // Keep stdin open for a few ticks before quitting
    thread::sleep(Duration::from_millis(2_600));
    child
        .stdin
        .take()
        .expect("stdin not piped")
        .write_all(b"q\n")
        .expect("Failed to send quit");
    let output = child.wait_with_output().expect("trainer did not exit");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let shown: BTreeSet<&str> = stdout
        .match_indices(" left")
        .filter_map(|(i, _)| stdout[..i].rsplit(' ').next())
        .collect();
    assert!(
        shown.len() >= 2,
        "countdown never refreshed: {:?}\n{}",
        shown,
        stdout
    );
    assert!(stdout.contains('\r'));
    assert!(stdout.contains("Session saved"));
}

fn write_two_workouts(data_dir: &Path) {
    fs::write(
        data_dir.join("presets.json"),
        r#"[
            { "id": "legs", "name": "Leg Day", "category": "workout",
              "exercises": [{ "id": "squat", "name": "Squat", "reps": 5, "workingSets": 2 }] },
            { "id": "arms", "name": "Arm Day", "category": "workout",
              "exercises": [{ "id": "curl", "name": "Curl", "reps": 12, "workingSets": 2 }] }
        ]"#,
    )
    .unwrap();
}

#[test]
fn test_run_refuses_session_of_other_preset() {
    let temp_dir = setup_test_dir();
    write_two_workouts(temp_dir.path());

    cli(temp_dir.path())
        .args(["run", "legs"])
        .write_stdin("q\n")
        .assert()
        .success();

    cli(temp_dir.path())
        .args(["run", "arms"])
        .write_stdin("q\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "A workout session from another preset is in progress",
        ))
        .stderr(predicate::str::contains("trainer reset --category workout"));

    cli(temp_dir.path())
        .args(["status", "--category", "workout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Squat: Working • Set 1/2"));

    // After a reset the other preset runs normally
    cli(temp_dir.path())
        .args(["reset", "--category", "workout"])
        .assert()
        .success();
    cli(temp_dir.path())
        .args(["run", "arms"])
        .write_stdin("q\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Curl: Working • Set 1/2"));
}

