//! End-to-end tests driving the compiled `thrash` binary with `-c`.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn thrash() -> Command {
    Command::cargo_bin("thrash").unwrap()
}

#[test]
fn runs_a_simple_command() {
    thrash().args(["-c", "echo hello"]).assert().success().stdout(predicate::str::contains("hello"));
}

#[test]
fn pipeline_passes_output_between_stages() {
    thrash()
        .args(["-c", "printf 'b\\na\\nc\\n' | sort"])
        .assert()
        .success()
        .stdout(predicate::eq("a\nb\nc\n"));
}

#[test]
fn pipeline_reports_last_stage_exit_code() {
    thrash().args(["-c", "true | false"]).assert().code(1);
}

#[test]
fn truncate_redirection_writes_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.txt");
    thrash().args(["-c", &format!("echo hi > {}", path.display())]).assert().success();
    assert_eq!(fs::read_to_string(&path).unwrap(), "hi\n");
}

#[test]
fn append_redirection_extends_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.txt");
    fs::write(&path, "first\n").unwrap();
    thrash().args(["-c", &format!("echo second >> {}", path.display())]).assert().success();
    assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
}

#[test]
fn input_redirection_feeds_stdin() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("in.txt");
    fs::write(&path, "roundtrip\n").unwrap();
    thrash()
        .args(["-c", &format!("cat < {}", path.display())])
        .assert()
        .success()
        .stdout(predicate::str::contains("roundtrip"));
}

#[test]
fn unknown_command_reports_127() {
    thrash().args(["-c", "definitely-not-a-real-command-xyz"]).assert().code(127);
}

#[test]
fn semicolon_separates_independent_segments() {
    thrash()
        .args(["-c", "echo one; echo two"])
        .assert()
        .success()
        .stdout(predicate::eq("one\ntwo\n"));
}

#[test]
fn variable_assignment_then_expansion() {
    thrash()
        .args(["-c", "FOO=bar; echo $FOO"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bar"));
}

#[test]
fn assignment_followed_by_pipeline_stage_is_rejected() {
    thrash().args(["-c", "FOO=bar | echo x"]).assert().failure();
}

#[test]
fn cd_into_existing_directory_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    thrash().args(["-c", &format!("cd {}", dir.path().display())]).assert().success();
}

#[test]
fn cd_into_missing_directory_fails() {
    thrash().args(["-c", "cd /no/such/path/thrash-test"]).assert().failure();
}

#[test]
fn unset_in_a_pipeline_is_rejected() {
    thrash().args(["-c", "unset FOO | echo x"]).assert().failure();
}

#[test]
fn export_makes_variable_visible_to_children() {
    thrash()
        .args(["-c", "FOO=bar; export FOO; echo $FOO"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bar"));
}

#[test]
fn export_in_a_pipeline_is_rejected() {
    thrash().args(["-c", "export FOO | echo x"]).assert().failure();
}

#[test]
fn pipeline_with_empty_first_stage_is_a_no_op() {
    thrash().args(["-c", "| echo hi"]).assert().success().stdout(predicate::str::is_empty());
}

#[test]
fn single_quote_inside_double_quotes_is_literal() {
    thrash()
        .args(["-c", r#"echo "it's fine""#])
        .assert()
        .success()
        .stdout(predicate::eq("it's fine\n"));
}
