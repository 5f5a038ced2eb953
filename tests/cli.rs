//! End-to-end tests driving the real binary
//!
//! Exit codes are part of the interface; build scripts branch on them, so
//! these tests assert the numeric values, not just success/failure.

use assert_cmd::Command;
use predicates::prelude::*;

fn mkpipe() -> Command {
    Command::cargo_bin("mkpipe").unwrap()
}

#[test]
fn no_arguments_reports_no_commands_and_prints_help() {
    mkpipe()
        .assert()
        .code(8)
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("--sort"));
}

#[test]
fn help_flag_lists_commands_and_succeeds() {
    mkpipe()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--foreach"))
        .stdout(predicate::str::contains("Run a command for each line"));
}

#[test]
fn unknown_flag_exits_with_unknown_argument() {
    mkpipe()
        .args(["--in", "x", "--definitely-not-a-flag"])
        .assert()
        .code(7);
}

#[test]
fn missing_parameter_exits_before_running_the_stage() {
    mkpipe().args(["--include", "1"]).assert().code(6);
}

#[test]
fn sort_unique_print_chain() {
    mkpipe()
        .args(["--in", "b\\na\\nb\\nc", "--sort", "none", "--unique", "--print"])
        .assert()
        .success()
        .stdout("a\nb\nc\n");
}

#[test]
fn sum_of_first_column_as_integers() {
    mkpipe()
        .args(["--in", "3 a\\n4 b\\n5 c", "--sum", "column=1,int", "--print"])
        .assert()
        .success()
        .stdout("12\n");
}

#[test]
fn include_with_open_end_keeps_the_tail() {
    mkpipe()
        .args(["--in", "l0\\nl1\\nl2\\nl3\\nl4", "--include", "1", "0", "--print"])
        .assert()
        .success()
        .stdout("l1\nl2\nl3\nl4\n");
}

#[test]
fn invalid_filter_pattern_exits_with_regex_error() {
    mkpipe().args(["--in", "x", "--filter", "["]).assert().code(2);
}

#[test]
fn soft_failures_are_ignored_without_stop_on_error() {
    mkpipe()
        .args([
            "--stoponerror",
            "false",
            "--filter",
            "[",
            "--in",
            "survived",
            "--print",
        ])
        .assert()
        .success()
        .stdout("survived\n");
}

#[test]
fn timestamp_prints_unix_seconds() {
    mkpipe()
        .args(["--timestamp", "--print"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^[0-9]+\n$").unwrap());
}

#[test]
fn out_writes_buffer_with_trailing_newline() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("nested/result.txt");
    mkpipe()
        .args(["--in", "payload", "--out", target.to_str().unwrap()])
        .assert()
        .success();
    assert_eq!(std::fs::read_to_string(target).unwrap(), "payload\n");
}

#[cfg(unix)]
#[test]
fn exec_captures_output_into_the_buffer() {
    mkpipe()
        .args(["--exec", "echo", "hello", ";", "--print"])
        .assert()
        .success()
        .stdout("hello\n");
}

#[cfg(unix)]
#[test]
fn foreach_appends_each_line_to_the_command() {
    mkpipe()
        .args([
            "--in", "a\\nb", "--foreach", "echo", "-", ";", "--print",
        ])
        .assert()
        .success()
        .stdout("- a\n- b\n");
}

#[test]
fn missing_binary_exits_with_command_not_found() {
    mkpipe()
        .args(["--exec", "mkpipe-no-such-binary-zzz", ";"])
        .assert()
        .code(10);
}

#[test]
fn env_value_without_equals_is_rejected() {
    mkpipe().args(["--env", "NOEQUALS"]).assert().code(5);
}

#[cfg(unix)]
#[test]
fn env_overlay_reaches_spawned_commands() {
    mkpipe()
        .args([
            "--env",
            "MKPIPE_PROBE=visible",
            "--exec",
            "sh",
            "-c",
            "echo $MKPIPE_PROBE",
            ";",
            "--print",
        ])
        .assert()
        .success()
        .stdout("visible\n");
}
