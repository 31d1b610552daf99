//! End-to-end tests for the AXIS compiler driver.
//!
//! Both modules exercise the built `axis` binary directly: `cli_tests`
//! covers argument parsing and error paths, `compilation_tests` runs the
//! full pipeline against the fixtures under `e2e/fixtures/` and, where the
//! spec's end-to-end scenarios pin a specific exit code, runs the produced
//! executable and checks it.

#[path = "e2e/cli_tests.rs"]
mod cli_tests;
#[path = "e2e/compilation_tests.rs"]
mod compilation_tests;
