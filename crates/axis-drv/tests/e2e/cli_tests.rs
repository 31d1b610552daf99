//! CLI interface tests: argument parsing and the error paths around it
//! (§6.5).

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("e2e").join("fixtures")
}

fn axis_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_axis"))
}

#[test]
fn missing_source_file_is_a_cli_error() {
    Command::new(axis_bin()).assert().failure().code(3).stderr(predicate::str::contains("no source file"));
}

#[test]
fn unrecognized_flag_is_a_cli_error() {
    Command::new(axis_bin())
        .arg("--bogus")
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("unrecognized option"));
}

#[test]
fn dash_o_with_no_path_is_a_cli_error() {
    Command::new(axis_bin())
        .arg(fixtures_dir().join("return_literal.ax"))
        .arg("-o")
        .assert()
        .failure()
        .code(3);
}

#[test]
fn check_flag_reports_no_errors_and_writes_nothing() {
    let temp_dir = TempDir::new().expect("temp dir");
    let output_path = temp_dir.path().join("should_not_exist");

    Command::new(axis_bin())
        .arg(fixtures_dir().join("return_literal.ax"))
        .arg("--check")
        .arg("-o")
        .arg(&output_path)
        .assert()
        .success();

    assert!(!output_path.exists(), "--check must not produce an output file");
}

#[test]
fn verbose_flag_writes_an_assembly_listing_alongside_the_output() {
    let temp_dir = TempDir::new().expect("temp dir");
    let output_path = temp_dir.path().join("prog");

    Command::new(axis_bin())
        .arg(fixtures_dir().join("return_literal.ax"))
        .arg("-o")
        .arg(&output_path)
        .arg("-v")
        .assert()
        .success();

    assert!(output_path.exists());
    assert!(output_path.with_extension("s").exists(), "-v should emit a listing next to the output");
}

#[test]
fn output_defaults_to_a_out_in_the_working_directory() {
    let temp_dir = TempDir::new().expect("temp dir");
    let default_output = temp_dir.path().join("a.out");

    Command::new(axis_bin())
        .current_dir(temp_dir.path())
        .arg(fixtures_dir().join("return_literal.ax"))
        .assert()
        .success();

    assert!(default_output.exists());
}
