//! Full pipeline tests: each fixture is compiled with `--elf` and the
//! resulting executable is run, checking its exit code against the
//! end-to-end scenarios table (§8).

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use std::process::Command as StdCommand;
use tempfile::TempDir;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("e2e").join("fixtures")
}

fn axis_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_axis"))
}

/// Compile `fixture` (a file under `e2e/fixtures/`) with `--elf` into a
/// fresh temp directory and return the path to the produced executable.
/// `temp_dir` must outlive the returned path.
fn compile(temp_dir: &TempDir, fixture: &str, name: &str) -> PathBuf {
    let output_path = temp_dir.path().join(name);
    let input_path = fixtures_dir().join(fixture);

    Command::new(axis_bin())
        .arg(&input_path)
        .arg("-o")
        .arg(&output_path)
        .arg("--elf")
        .assert()
        .success();

    assert!(output_path.exists(), "{fixture} should have produced an executable");
    output_path
}

fn run_and_get_exit_code(executable: &PathBuf) -> i32 {
    let status = StdCommand::new(executable).status().expect("failed to run compiled executable");
    status.code().expect("process should exit normally, not via signal")
}

#[test]
fn scenario_1_literal_return() {
    let temp_dir = TempDir::new().expect("temp dir");
    let exe = compile(&temp_dir, "return_literal.ax", "return_literal");
    assert_eq!(run_and_get_exit_code(&exe), 42);
}

#[test]
fn scenario_2_arithmetic() {
    let temp_dir = TempDir::new().expect("temp dir");
    let exe = compile(&temp_dir, "arithmetic.ax", "arithmetic");
    assert_eq!(run_and_get_exit_code(&exe), 30);
}

#[test]
fn scenario_3_while_loop() {
    let temp_dir = TempDir::new().expect("temp dir");
    let exe = compile(&temp_dir, "while_loop.ax", "while_loop");
    assert_eq!(run_and_get_exit_code(&exe), 10);
}

#[test]
fn scenario_4_when_branch() {
    let temp_dir = TempDir::new().expect("temp dir");
    let exe = compile(&temp_dir, "when_branch.ax", "when_branch");
    assert_eq!(run_and_get_exit_code(&exe), 1);
}

#[test]
fn scenario_5_recursive_factorial() {
    let temp_dir = TempDir::new().expect("temp dir");
    let exe = compile(&temp_dir, "recursive_factorial.ax", "recursive_factorial");
    assert_eq!(run_and_get_exit_code(&exe), 120);
}

#[test]
fn scenario_6_signed_arithmetic_shift() {
    let temp_dir = TempDir::new().expect("temp dir");
    let exe = compile(&temp_dir, "signed_shift.ax", "signed_shift");
    // -5 >> 1 (arithmetic) is -3; an 8-bit process exit code reports -3 mod 256.
    assert_eq!(run_and_get_exit_code(&exe), 253);
}

/// Scenario 7: a `when` body long enough that its conditional jump can't
/// stay in 8-bit rel8 form, forcing the assembler's relaxation pass to
/// widen it to rel32. The program must still run correctly.
#[test]
fn scenario_7_jump_relaxation_produces_a_working_executable() {
    let temp_dir = TempDir::new().expect("temp dir");
    let exe = compile(&temp_dir, "jump_relaxation.ax", "jump_relaxation");
    assert_eq!(run_and_get_exit_code(&exe), 30);
}

#[test]
fn invalid_syntax_fails_without_writing_an_output_file() {
    let temp_dir = TempDir::new().expect("temp dir");
    let output_path = temp_dir.path().join("invalid_syntax");
    let input_path = fixtures_dir().join("invalid_syntax.ax");

    Command::new(axis_bin())
        .arg(&input_path)
        .arg("-o")
        .arg(&output_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("axis:"));

    assert!(!output_path.exists());
}

#[test]
fn type_error_fails_without_writing_an_output_file() {
    let temp_dir = TempDir::new().expect("temp dir");
    let output_path = temp_dir.path().join("type_error");
    let input_path = fixtures_dir().join("type_error.ax");

    Command::new(axis_bin())
        .arg(&input_path)
        .arg("-o")
        .arg(&output_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("TypeError"));

    assert!(!output_path.exists());
}

#[test]
fn mode_script_is_rejected_as_out_of_scope() {
    let temp_dir = TempDir::new().expect("temp dir");
    let output_path = temp_dir.path().join("mode_script");
    let input_path = fixtures_dir().join("mode_script.ax");

    Command::new(axis_bin())
        .arg(&input_path)
        .arg("-o")
        .arg(&output_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("mode script"));

    assert!(!output_path.exists());
}

#[test]
fn default_output_format_is_a_raw_blob_not_an_elf_executable() {
    let temp_dir = TempDir::new().expect("temp dir");
    let output_path = temp_dir.path().join("raw_out");
    let input_path = fixtures_dir().join("return_literal.ax");

    Command::new(axis_bin()).arg(&input_path).arg("-o").arg(&output_path).assert().success();

    let bytes = std::fs::read(&output_path).expect("output should exist");
    assert_ne!(&bytes[0..4], b"\x7fELF", "raw output must not carry an ELF magic number");
}

#[test]
fn elf_flag_produces_a_file_starting_with_the_elf_magic_number() {
    let temp_dir = TempDir::new().expect("temp dir");
    let exe = compile(&temp_dir, "return_literal.ax", "elf_magic");

    let bytes = std::fs::read(&exe).expect("output should exist");
    assert_eq!(&bytes[0..4], b"\x7fELF");
}
