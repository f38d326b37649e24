//! Binary-level tests: invocation surface and failure paths that never reach
//! the destination database.

mod common;

use assert_cmd::Command;
use predicates::str::contains;

use common::TestWorkspace;

#[test]
fn no_arguments_prints_usage_without_failing() {
    Command::cargo_bin("csv2pg")
        .expect("binary exists")
        .assert()
        .success()
        .stderr(contains("Usage"));
}

#[test]
fn partial_arguments_print_usage_without_failing() {
    Command::cargo_bin("csv2pg")
        .expect("binary exists")
        .args(["localhost", "5432", "postgres"])
        .assert()
        .success()
        .stderr(contains("Usage"));
}

#[test]
fn help_flag_documents_the_positional_arguments() {
    Command::cargo_bin("csv2pg")
        .expect("binary exists")
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("HOST"))
        .stdout(contains("DIRECTORY"));
}

#[test]
fn missing_directory_fails_the_run() {
    Command::cargo_bin("csv2pg")
        .expect("binary exists")
        .args([
            "localhost",
            "5432",
            "postgres",
            "postgres",
            "scratch",
            "/definitely/not/a/real/directory",
        ])
        .assert()
        .failure()
        .stderr(contains("error"));
}

#[test]
fn inference_failure_aborts_before_touching_the_destination() {
    let ws = TestWorkspace::new();
    ws.write("bad.csv", "id,notes\n1,\n2,\n");

    // The capability mask for 'notes' stays empty; analysis fails before any
    // connection is attempted, so no live server is needed here.
    Command::cargo_bin("csv2pg")
        .expect("binary exists")
        .args([
            "localhost",
            "5432",
            "postgres",
            "postgres",
            "scratch",
            ws.path().to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(contains("notes"));
}

#[test]
fn directory_without_csv_files_is_a_clean_no_op() {
    let ws = TestWorkspace::new();
    ws.write("readme.txt", "not a table\n");

    Command::cargo_bin("csv2pg")
        .expect("binary exists")
        .args([
            "localhost",
            "5432",
            "postgres",
            "postgres",
            "scratch",
            ws.path().to_str().unwrap(),
        ])
        .assert()
        .success();
}
