use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn prints_version() {
    Command::new(env!("CARGO_BIN_EXE_blog-tui"))
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn prints_help() {
    Command::new(env!("CARGO_BIN_EXE_blog-tui"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Blog-TUI"))
        .stdout(predicate::str::contains("--version"));
}
