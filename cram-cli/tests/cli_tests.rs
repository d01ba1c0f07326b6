//! Tests for the `cram` command-line interface.
//!
//! Each test runs the built binary against test files created in a fresh
//! temporary directory and checks its output, exit code and effects on disk.

#![cfg(unix)]
#![cfg(test)]
#![allow(clippy::panic_in_result_fn)]

use anyhow::Context;
use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;
use std::io::Read;
use std::time::{Duration, Instant};

const PASSING_TEST: &str = "Greeting:\n\n  $ echo hello\n  hello\n";
const FAILING_TEST: &str = "  $ echo hello\n  goodbye\n";

fn cram() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("cram"))
}

#[test]
fn no_tests_prints_usage() {
    cram()
        .assert()
        .code(2)
        .stdout(predicate::str::contains("cram [OPTIONS] TESTS..."));
}

#[test]
fn help_and_version() {
    cram()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--keep-tmpdir"));

    cram()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn unknown_option() {
    cram().arg("--frobnicate").assert().code(2);
}

#[test]
fn mutually_exclusive_options() {
    for (first, second) in [("-y", "-n"), ("-q", "-v"), ("-q", "-i")] {
        cram()
            .args([first, second, "whatever.t"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains(format!(
                "options {first} and {second} are mutually exclusive"
            )));
    }
}

#[test]
fn missing_path() -> anyhow::Result<()> {
    let temp = assert_fs::TempDir::new()?;
    let missing = temp.child("missing.t");

    cram()
        .arg(missing.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no such file:"));

    Ok(())
}

#[test]
fn passing_test() -> anyhow::Result<()> {
    let temp = assert_fs::TempDir::new()?;
    let test = temp.child("pass.t");
    test.write_str(PASSING_TEST)?;

    cram()
        .arg(test.path())
        .assert()
        .success()
        .stdout(".\n# Ran 1 tests, 0 skipped, 0 failed.\n\n");

    temp.child("pass.t.err").assert(predicate::path::missing());

    Ok(())
}

#[test]
fn failing_test_writes_err_file() -> anyhow::Result<()> {
    let temp = assert_fs::TempDir::new()?;
    let test = temp.child("fail.t");
    test.write_str(FAILING_TEST)?;

    cram()
        .arg(test.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("-  goodbye\n+  hello\n"))
        .stdout(predicate::str::contains("fail.t\t\n+++ "))
        .stdout(predicate::str::contains("fail.t.err\t\n@@ -1,2 +1,2 @@\n"))
        .stdout(predicate::str::contains("# Ran 1 tests, 0 skipped, 1 failed."));

    temp.child("fail.t.err")
        .assert("  $ echo hello\n  hello\n");
    test.assert(FAILING_TEST);

    Ok(())
}

#[test]
fn quiet_hides_diff() -> anyhow::Result<()> {
    let temp = assert_fs::TempDir::new()?;
    let test = temp.child("fail.t");
    test.write_str(FAILING_TEST)?;

    cram()
        .arg("-q")
        .arg(test.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("@@").not())
        .stdout(predicate::str::contains("# Ran 1 tests, 0 skipped, 1 failed."));

    Ok(())
}

#[test]
fn verbose_reports_each_test() -> anyhow::Result<()> {
    let temp = assert_fs::TempDir::new()?;
    temp.child("a.t").write_str(PASSING_TEST)?;
    temp.child("b.t").touch()?;

    cram()
        .arg("-v")
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("a.t: passed\n"))
        .stdout(predicate::str::contains("b.t: empty\n"))
        .stdout(predicate::str::ends_with(
            "# Ran 2 tests, 1 skipped, 0 failed.\n",
        ));

    Ok(())
}

#[test]
fn directory_discovery_skips_hidden() -> anyhow::Result<()> {
    let temp = assert_fs::TempDir::new()?;
    temp.child("sub/nested.t").write_str(PASSING_TEST)?;
    temp.child(".hidden/ignored.t").write_str(FAILING_TEST)?;
    temp.child("notes.txt").write_str(FAILING_TEST)?;

    cram()
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("# Ran 1 tests, 0 skipped, 0 failed."));

    Ok(())
}

#[test]
fn interactive_yes_merges_output() -> anyhow::Result<()> {
    let temp = assert_fs::TempDir::new()?;
    let test = temp.child("fail.t");
    test.write_str(FAILING_TEST)?;

    cram()
        .args(["-i", "-y"])
        .arg(test.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Accept this change? [yN] y"));

    test.assert("  $ echo hello\n  hello\n");
    temp.child("fail.t.err").assert(predicate::path::missing());

    // The merged test passes from now on.
    cram().arg(test.path()).assert().success();

    Ok(())
}

#[test]
fn interactive_declined_from_stdin() -> anyhow::Result<()> {
    let temp = assert_fs::TempDir::new()?;
    let test = temp.child("fail.t");
    test.write_str(FAILING_TEST)?;

    cram()
        .arg("-i")
        .arg(test.path())
        .write_stdin("n\n")
        .assert()
        .code(1);

    test.assert(FAILING_TEST);
    temp.child("fail.t.err").assert(predicate::path::exists());

    Ok(())
}

#[test]
fn exit_codes_and_test_dir() -> anyhow::Result<()> {
    let temp = assert_fs::TempDir::new()?;
    temp.child("data.txt").write_str("payload\n")?;
    let test = temp.child("env.t");
    test.write_str(concat!(
        "  $ cat \"$TESTDIR/data.txt\"\n",
        "  payload\n",
        "  $ false\n",
        "  [1]\n",
        "  $ printf 'no newline'\n",
        "  no newline%\n",
        "  $ echo \"$LANG $TZ\"\n",
        "  C GMT\n",
    ))?;

    cram()
        .arg(test.path())
        .env("LANG", "en_US.UTF-8")
        .assert()
        .success();

    Ok(())
}

#[test]
fn keep_tmpdir() -> anyhow::Result<()> {
    let temp = assert_fs::TempDir::new()?;
    let test = temp.child("tmp.t");
    test.write_str("  $ test -d \"$CRAMTMP\" && echo ok\n  ok\n")?;

    cram()
        .arg("--keep-tmpdir")
        .arg(test.path())
        .assert()
        .success();

    Ok(())
}

#[test]
fn interrupt_while_prompting() -> anyhow::Result<()> {
    let temp = assert_fs::TempDir::new()?;
    let test = temp.child("fail.t");
    test.write_str(FAILING_TEST)?;

    // Stdin stays open and silent, so the prompt waits for an answer.
    let mut child = std::process::Command::new(assert_cmd::cargo::cargo_bin!("cram"))
        .args(["-i", "--color", "never"])
        .arg(test.path())
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::null())
        .spawn()
        .context("failed to spawn cram")?;

    let mut stdout = child.stdout.take().context("failed to open stdout")?;
    let mut output = vec![];
    let mut buffer = [0u8; 256];
    while !String::from_utf8_lossy(&output).contains("Accept this change? [yN] ") {
        let count = stdout.read(&mut buffer)?;
        anyhow::ensure!(count > 0, "cram exited before prompting");
        output.extend_from_slice(&buffer[..count]);
    }

    let status = std::process::Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()?;
    assert!(status.success());

    let deadline = Instant::now() + Duration::from_secs(10);
    let exit_status = loop {
        if let Some(exit_status) = child.try_wait()? {
            break Some(exit_status);
        }
        if Instant::now() > deadline {
            child.kill()?;
            break None;
        }
        std::thread::sleep(Duration::from_millis(50));
    };

    assert_eq!(exit_status.and_then(|status| status.code()), Some(130));
    test.assert(FAILING_TEST);

    Ok(())
}
