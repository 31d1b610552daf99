//! Pipeline orchestration: source bytes in, diagnostics or an output file
//! out (§2, §6.6 - "each invocation is pure from (source bytes, flags) to
//! (bytes, diagnostics)").

use std::fs;
use std::path::Path;

use axis_lex::Lexer;
use axis_mir::lower_program;
use axis_par::Parser;
use axis_sem::Analyzer;
use axis_util::{Diagnostic, Handler, SourceMap};

use crate::cli::Cli;

/// What happened, so `main` can pick an exit code without re-deriving it
/// from diagnostic contents.
pub enum Outcome {
    /// `--check` ran clean, or a full build wrote its output file.
    Success,
    /// At least one diagnostic was reported; none were hidden (§7).
    Failed,
}

pub fn run(cli: &Cli) -> anyhow::Result<Outcome> {
    let source_path = &cli.source;
    let file_name = source_path.display().to_string();

    if cli.verbose {
        eprintln!("reading: {file_name}");
    }
    let content = fs::read_to_string(source_path).map_err(|e| anyhow::anyhow!("cannot read {file_name}: {e}"))?;

    let mut source_map = SourceMap::new();
    let file = source_map.add_file(file_name.clone(), content.clone());

    let mut handler = Handler::new();

    if cli.verbose {
        eprintln!("lexing {file_name}");
    }
    let tokens = Lexer::new(&content, file, file_name.clone(), &mut handler).tokenize();
    if handler.has_errors() {
        return report(handler);
    }

    if cli.verbose {
        eprintln!("parsing {file_name} ({} tokens)", tokens.len());
    }
    let ast = Parser::new(tokens, file, file_name.clone(), &mut handler).parse_program();
    if handler.has_errors() {
        return report(handler);
    }

    if cli.verbose {
        eprintln!("analyzing {file_name}");
    }
    let hir = Analyzer::new(file, file_name.clone(), &mut handler).analyze(&ast);
    if handler.has_errors() {
        return report(handler);
    }

    if cli.check {
        if cli.verbose {
            eprintln!("--check passed, no output written");
        }
        return Ok(Outcome::Success);
    }

    if cli.verbose {
        eprintln!("lowering to machine instructions");
    }
    let module = lower_program(&hir);

    if cli.verbose {
        let listing_path = listing_path_for(cli);
        eprintln!("writing listing: {}", listing_path.display());
        fs::write(&listing_path, format!("{module:#?}")).map_err(|e| anyhow::anyhow!("cannot write {}: {e}", listing_path.display()))?;
    }

    if cli.verbose {
        eprintln!("assembling ({})", if cli.elf { "elf" } else { "raw" });
    }
    let bytes = if cli.elf { axis_gen::build_elf(&module) } else { axis_gen::build_raw(&module) };

    let output_path = output_path_for(cli);
    if cli.verbose {
        eprintln!("writing: {} ({} bytes)", output_path.display(), bytes.len());
    }
    write_executable(&output_path, &bytes)?;

    Ok(Outcome::Success)
}

fn output_path_for(cli: &Cli) -> std::path::PathBuf {
    cli.output.clone().unwrap_or_else(|| std::path::PathBuf::from("a.out"))
}

fn listing_path_for(cli: &Cli) -> std::path::PathBuf {
    let mut path = output_path_for(cli);
    path.set_extension("s");
    path
}

#[cfg(unix)]
fn write_executable(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::write(path, bytes).map_err(|e| anyhow::anyhow!("cannot write {}: {e}", path.display()))?;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn write_executable(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    fs::write(path, bytes).map_err(|e| anyhow::anyhow!("cannot write {}: {e}", path.display()))
}

fn report(handler: Handler) -> anyhow::Result<Outcome> {
    for diagnostic in handler.into_diagnostics() {
        print_diagnostic(&diagnostic);
    }
    Ok(Outcome::Failed)
}

fn print_diagnostic(diagnostic: &Diagnostic) {
    eprintln!("{diagnostic}");
}
