//! Command-line interface argument parsing and definitions
//!
//! This module defines the CLI structure using clap's derive API.

use clap::{Parser, Subcommand, ValueEnum};
use is_terminal::IsTerminal;
use schemabridge_core::ErrorAuthority;
use std::path::PathBuf;

/// Schemabridge CLI - compile declarative data models into validation schemas
///
/// Loads model documents (JSON or YAML), derives one schema per model and
/// validates data files against them.
#[derive(Parser, Debug)]
#[command(
    name = "schemabridge",
    version,
    author,
    about,
    long_about = None,
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Enable verbose output (can be used multiple times for increased verbosity)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "SCHEMABRIDGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(short, long, value_enum, global = true, default_value = "human")]
    pub output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile a model document and print the derived schemas
    Describe(DescribeArgs),

    /// Validate a data file against one model of a model document
    Validate(ValidateArgs),

    /// Generate shell completions for the specified shell
    Completions(CompletionsArgs),
}

/// Arguments for the describe command
#[derive(Parser, Debug)]
pub struct DescribeArgs {
    /// Path to the model document (JSON or YAML)
    #[arg(value_name = "MODELS")]
    pub models: PathBuf,

    /// Only describe this model (and the schemas it nests)
    #[arg(short, long, value_name = "NAME")]
    pub model: Option<String>,
}

/// Arguments for the validate command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to the model document (JSON or YAML)
    #[arg(value_name = "MODELS")]
    pub models: PathBuf,

    /// Name of the model to validate against
    #[arg(short, long, value_name = "NAME")]
    pub model: String,

    /// Path to the data file (JSON or YAML)
    #[arg(value_name = "DATA")]
    pub data: PathBuf,

    /// Construct a source instance after the derived schema accepts the data
    #[arg(long)]
    pub validate_source: bool,

    /// Whose errors are reported when source validation fails
    #[arg(long, value_enum)]
    pub authority: Option<Authority>,

    /// Keep the derived schema's validated data instead of the source instance's values
    #[arg(long)]
    pub no_backpopulate: bool,
}

/// Arguments for the completions command
#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Output format options
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output with colors and formatting
    Human,
    /// Compact JSON output
    Json,
    /// Pretty-printed JSON output
    JsonPretty,
    /// YAML output
    Yaml,
}

/// Error authority as a command-line value
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Authority {
    /// Translate source errors into the derived error shape
    Derived,
    /// Report the source model's own errors untranslated
    Source,
}

impl From<Authority> for ErrorAuthority {
    fn from(authority: Authority) -> Self {
        match authority {
            Authority::Derived => ErrorAuthority::Derived,
            Authority::Source => ErrorAuthority::Source,
        }
    }
}

/// Supported shells for completion generation
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Effective verbosity; quiet mode always reports zero
    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }

    /// Whether to colorize output
    pub fn use_color(&self) -> bool {
        !self.no_color && std::io::stdout().is_terminal()
    }
}

impl Shell {
    pub fn to_clap_shell(self) -> clap_complete::Shell {
        match self {
            Shell::Bash => clap_complete::Shell::Bash,
            Shell::Zsh => clap_complete::Shell::Zsh,
            Shell::Fish => clap_complete::Shell::Fish,
            Shell::PowerShell => clap_complete::Shell::PowerShell,
            Shell::Elvish => clap_complete::Shell::Elvish,
        }
    }
}
