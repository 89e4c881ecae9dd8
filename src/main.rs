use std::ffi::OsString;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use clap::Parser;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use beautysh::config::{self, ConfigError, ConfigLayer};
use beautysh::diff::{unified_diff, use_color};
use beautysh::{Beautifier, FunctionStyle, ParseException};

fn function_styles_help() -> String {
    let mut help = String::from("Function styles (--force-function-style):");
    for style in FunctionStyle::ALL {
        help.push_str(&format!("\n  {:<8} {}", style.name(), style.example()));
    }
    help
}

#[derive(Parser)]
#[command(name = "beautysh")]
#[command(about = "A Bash beautifier for the masses")]
#[command(version, disable_version_flag = true)]
#[command(after_long_help = function_styles_help())]
struct Cli {
    /// Files to format; `-` reads stdin and writes stdout
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Spaces per indentation level
    #[arg(short = 'i', long = "indent-size", value_name = "N")]
    indent_size: Option<i64>,

    /// Indent with tabs instead of spaces
    #[arg(short = 't', long = "tab")]
    tab: bool,

    /// Keep the original as FILE.bak before rewriting
    #[arg(short = 'b', long = "backup")]
    backup: bool,

    /// Only report files that would change, with a diff; rewrite nothing
    #[arg(short = 'c', long = "check")]
    check: bool,

    /// Rewrite every function header to STYLE (fnpar, fnonly or paronly)
    #[arg(short = 's', long = "force-function-style", value_name = "STYLE")]
    force_function_style: Option<String>,

    /// Rewrite variable references to STYLE (braces)
    #[arg(long = "variable-style", value_name = "STYLE")]
    variable_style: Option<String>,

    /// Read settings from this TOML file
    #[arg(long = "config", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(long)]
    verbose: bool,

    /// Print version
    #[arg(short = 'v', long = "version", action = clap::ArgAction::Version)]
    version: Option<bool>,
}

impl Cli {
    /// Flags that were given; absent ones leave config files in charge
    fn layer(&self) -> ConfigLayer {
        ConfigLayer {
            indent_size: self.indent_size,
            tab: self.tab.then_some(true),
            backup: self.backup.then_some(true),
            check: self.check.then_some(true),
            force_function_style: self.force_function_style.clone(),
            variable_style: self.variable_style.clone(),
        }
    }
}

#[derive(Debug, Error)]
enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("cannot read {path}: {source}")]
    Read { path: String, source: io::Error },
    #[error("cannot write {path}: {source}")]
    Write { path: String, source: io::Error },
    #[error("{path}: {source}")]
    Parse { path: String, source: ParseException },
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_env("BEAUTYSH_LOG").unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.files.is_empty() {
        eprintln!("Please provide at least one input file");
        std::process::exit(1);
    }

    let working_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let explicit = match &cli.config {
        Some(path) => match config::load_file(path) {
            Ok(layer) => layer,
            Err(e) => {
                eprintln!("beautysh: {}", e);
                std::process::exit(1);
            }
        },
        None => ConfigLayer::default(),
    };
    let overrides = explicit.merge(cli.layer());

    let mut failed = false;
    for file in &cli.files {
        match process(file, &working_dir, &overrides) {
            Ok(would_change) => failed |= would_change,
            Err(e) => {
                eprintln!("beautysh: {}", e);
                failed = true;
            }
        }
    }

    std::process::exit(if failed { 1 } else { 0 });
}

/// Format one file. Returns whether check mode found it unformatted.
fn process(file: &Path, working_dir: &Path, overrides: &ConfigLayer) -> Result<bool, RunError> {
    let stdin = file == Path::new("-");
    let label = file.display().to_string();

    let settings = config::discover((!stdin).then_some(file), working_dir)
        .merge(overrides.clone())
        .resolve()?;

    let source = if stdin {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .map_err(|source| RunError::Read {
                path: label.clone(),
                source,
            })?;
        buf
    } else {
        fs::read_to_string(file).map_err(|source| RunError::Read {
            path: label.clone(),
            source,
        })?
    };

    let outcome = Beautifier::new(settings.format).format(&source, &label);
    if let Some(error) = outcome.error {
        if stdin && !settings.check {
            print!("{}", source);
        }
        return Err(RunError::Parse {
            path: label,
            source: error,
        });
    }
    let changed = outcome.output != source;

    if settings.check {
        if changed {
            println!("File {} would be reformatted", label);
            print!("{}", unified_diff(&source, &outcome.output, use_color()));
        }
        return Ok(changed);
    }

    if stdin {
        print!("{}", outcome.output);
        return Ok(false);
    }
    if !changed {
        return Ok(false);
    }

    if settings.backup {
        let mut backup = OsString::from(file.as_os_str());
        backup.push(".bak");
        let backup = PathBuf::from(backup);
        fs::write(&backup, &source).map_err(|source| RunError::Write {
            path: backup.display().to_string(),
            source,
        })?;
        info!(path = %backup.display(), "wrote backup");
    }

    fs::write(file, &outcome.output).map_err(|source| RunError::Write {
        path: label.clone(),
        source,
    })?;
    info!(path = %label, "reformatted");
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn test_short_version_flag() {
        let err = Cli::try_parse_from(["beautysh", "-v"]).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::DisplayVersion);
        let err = Cli::try_parse_from(["beautysh", "--version"]).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_flags_map_to_layer() {
        let cli = Cli::try_parse_from(["beautysh", "-t", "-s", "paronly", "a.sh"]).unwrap();
        let layer = cli.layer();
        assert_eq!(layer.tab, Some(true));
        assert_eq!(layer.backup, None);
        assert_eq!(layer.force_function_style.as_deref(), Some("paronly"));
        assert_eq!(cli.files, vec![PathBuf::from("a.sh")]);
    }

    #[test]
    fn test_function_styles_help_lists_examples() {
        let help = function_styles_help();
        assert!(help.contains("fnpar    function foo() { ... }"));
        assert!(help.contains("fnonly   function foo { ... }"));
        assert!(help.contains("paronly  foo() { ... }"));
    }
}
