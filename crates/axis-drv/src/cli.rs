//! Command-line argument parsing (§6.5).
//!
//! The contract is deliberately small - one positional source path plus
//! four flags - so this is a hand-rolled scan rather than reaching for an
//! argument-parsing crate the rest of the pipeline has no other use for.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Cli {
    pub source: PathBuf,
    pub output: Option<PathBuf>,
    pub elf: bool,
    pub check: bool,
    pub verbose: bool,
}

#[derive(Debug)]
pub struct CliError(pub String);

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "axis: {}", self.0)
    }
}

impl std::error::Error for CliError {}

pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Cli, CliError> {
    let mut source = None;
    let mut output = None;
    let mut elf = false;
    let mut check = false;
    let mut verbose = false;

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-o" => {
                let path = iter.next().ok_or_else(|| CliError("-o requires a path argument".into()))?;
                output = Some(PathBuf::from(path));
            }
            "--elf" => elf = true,
            "--check" => check = true,
            "-v" => verbose = true,
            other if other.starts_with('-') && other != "-" => {
                return Err(CliError(format!("unrecognized option `{other}`")));
            }
            other => {
                if source.is_some() {
                    return Err(CliError("only one source file may be given".into()));
                }
                source = Some(PathBuf::from(other));
            }
        }
    }

    let source = source.ok_or_else(|| CliError("no source file given".into()))?;
    Ok(Cli { source, output, elf, check, verbose })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(s: &[&str]) -> Vec<String> {
        s.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_minimal_invocation() {
        let cli = parse(args(&["main.ax"])).unwrap();
        assert_eq!(cli.source, PathBuf::from("main.ax"));
        assert!(cli.output.is_none());
        assert!(!cli.elf);
        assert!(!cli.check);
        assert!(!cli.verbose);
    }

    #[test]
    fn parses_output_path_and_flags() {
        let cli = parse(args(&["main.ax", "-o", "prog", "--elf", "-v"])).unwrap();
        assert_eq!(cli.output, Some(PathBuf::from("prog")));
        assert!(cli.elf);
        assert!(cli.verbose);
    }

    #[test]
    fn rejects_missing_source() {
        assert!(parse(args(&["--elf"])).is_err());
    }

    #[test]
    fn rejects_a_second_positional_argument() {
        assert!(parse(args(&["a.ax", "b.ax"])).is_err());
    }

    #[test]
    fn rejects_dash_o_with_no_following_path() {
        assert!(parse(args(&["main.ax", "-o"])).is_err());
    }
}
