//! kiln CLI: build kernels, probe devices, and maintain the binary cache.
//!
//! Provides `kiln build` to compile a kernel source file through the same
//! pipeline an application uses, `kiln probe` to list devices and what they
//! can compile, and `kiln cache` to inspect or empty the persistent cache.

#![warn(missing_docs)]

mod build;
mod cache;
mod probe;
mod settings;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use kiln_common::Dialect;

/// kiln: online kernel compiler with a persistent binary cache.
#[derive(Parser, Debug)]
#[command(name = "kiln", version, about = "Kiln kernel compiler")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a custom `kiln.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile a kernel source file.
    Build(BuildArgs),
    /// List devices and the dialects they can build.
    Probe(ProbeArgs),
    /// Inspect or empty the persistent cache.
    Cache {
        /// What to do with the cache.
        #[command(subcommand)]
        action: CacheAction,
    },
}

/// Arguments for the `kiln build` subcommand.
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Kernel source file.
    pub file: String,

    /// Source dialect (default: inferred from the file extension).
    #[arg(short, long, value_enum)]
    pub lang: Option<Lang>,

    /// Write the compiled binary to this path.
    #[arg(short, long)]
    pub output: Option<String>,

    /// Compiler flag, repeatable (e.g. `--flag -cl-mad-enable`).
    #[arg(long = "flag", allow_hyphen_values = true)]
    pub flags: Vec<String>,

    /// Output format for the build report.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for the `kiln probe` subcommand.
#[derive(Parser, Debug)]
pub struct ProbeArgs {
    /// Only report this dialect.
    #[arg(short, long, value_enum)]
    pub lang: Option<Lang>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// `kiln cache` actions.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAction {
    /// Print entry count and total size.
    Stats,
    /// Remove every cached binary.
    Clear,
}

/// Source dialect selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Lang {
    /// OpenCL C.
    Opencl,
    /// Pre-compiled SPIR-V.
    Spirv,
    /// SYCL C++.
    Sycl,
}

impl From<Lang> for Dialect {
    fn from(lang: Lang) -> Self {
        match lang {
            Lang::Opencl => Dialect::OpenCl,
            Lang::Spirv => Dialect::Spirv,
            Lang::Sycl => Dialect::Sycl,
        }
    }
}

/// Report output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };

    let result = match cli.command {
        Command::Build(ref args) => build::run(args, &global),
        Command::Probe(ref args) => probe::run(args, &global),
        Command::Cache { action } => cache::run(action, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Installs the logger. `RUST_LOG` overrides the level chosen by the flags.
fn init_logging(quiet: bool, verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else if quiet {
        log::LevelFilter::Error
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_build_defaults() {
        let cli = Cli::parse_from(["kiln", "build", "kernel.cl"]);
        match cli.command {
            Command::Build(ref args) => {
                assert_eq!(args.file, "kernel.cl");
                assert!(args.lang.is_none());
                assert!(args.output.is_none());
                assert!(args.flags.is_empty());
                assert_eq!(args.format, ReportFormat::Text);
            }
            _ => panic!("expected Build command"),
        }
    }

    #[test]
    fn parse_build_with_flags() {
        let cli = Cli::parse_from([
            "kiln",
            "build",
            "k.cl",
            "--lang",
            "opencl",
            "-o",
            "k.spv",
            "--flag",
            "-cl-mad-enable",
            "--flag",
            "-DN=4",
            "--format",
            "json",
        ]);
        match cli.command {
            Command::Build(ref args) => {
                assert_eq!(args.lang, Some(Lang::Opencl));
                assert_eq!(args.output.as_deref(), Some("k.spv"));
                assert_eq!(args.flags, vec!["-cl-mad-enable", "-DN=4"]);
                assert_eq!(args.format, ReportFormat::Json);
            }
            _ => panic!("expected Build command"),
        }
    }

    #[test]
    fn parse_probe() {
        let cli = Cli::parse_from(["kiln", "probe", "--lang", "sycl"]);
        match cli.command {
            Command::Probe(ref args) => assert_eq!(args.lang, Some(Lang::Sycl)),
            _ => panic!("expected Probe command"),
        }
    }

    #[test]
    fn parse_cache_actions() {
        let cli = Cli::parse_from(["kiln", "cache", "stats"]);
        assert!(matches!(cli.command, Command::Cache { action: CacheAction::Stats }));
        let cli = Cli::parse_from(["kiln", "cache", "clear"]);
        assert!(matches!(cli.command, Command::Cache { action: CacheAction::Clear }));
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::parse_from(["kiln", "--quiet", "--config", "/etc/kiln.toml", "probe"]);
        assert!(cli.quiet);
        assert!(!cli.verbose);
        assert_eq!(cli.config.as_deref(), Some("/etc/kiln.toml"));
    }

    #[test]
    fn lang_maps_to_dialect() {
        assert_eq!(Dialect::from(Lang::Opencl), Dialect::OpenCl);
        assert_eq!(Dialect::from(Lang::Spirv), Dialect::Spirv);
        assert_eq!(Dialect::from(Lang::Sycl), Dialect::Sycl);
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
