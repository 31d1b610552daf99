//! axis-drv - the compiler driver.
//!
//! Parses the command line, runs the four-stage pipeline (lex, parse,
//! analyze, then codegen/assemble/link) over one source file, and turns
//! whatever came out - diagnostics or an executable - into process exit
//! status and side effects. Everything in here is orchestration; the
//! actual compiler logic lives in `axis-lex`/`axis-par`/`axis-sem`/
//! `axis-mir`/`axis-lir`/`axis-gen`.

pub mod cli;
pub mod pipeline;

use pipeline::Outcome;

/// Entry point shared by `main.rs` and the integration tests: parse `args`
/// (excluding argv[0]), run the pipeline, and return the process exit code.
pub fn run<I: IntoIterator<Item = String>>(args: I) -> i32 {
    let cli = match cli::parse(args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("{e}");
            return 3;
        }
    };

    match pipeline::run(&cli) {
        Ok(Outcome::Success) => 0,
        Ok(Outcome::Failed) => 1,
        Err(e) => {
            eprintln!("axis: {e}");
            2
        }
    }
}
