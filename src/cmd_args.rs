use std::ffi::OsString;
use std::path::PathBuf;

use crate::config::DEFAULT_MAX_ROWS;
pub use clap::Parser;
use clap::{Args, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct ClapArgs {
    /// Profile name
    /// Profile to read the console connection from. Default is 'default'.
    /// If the profile is not configured, the command will fail.
    #[clap(short = 'p', long, default_value = "default", help = "profile name")]
    profile: String,

    /// Verbose mode
    /// Optional. Log request flow to stderr.
    #[clap(
        short = 'v',
        long,
        help = "Print verbose message",
        default_value = "false"
    )]
    verbose: bool,

    #[command(subcommand)]
    command: ConsoleCommand,
}

/// Impex options shared by `validate` and `import`
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ImpexArgs {
    /// Impex file; `-` or nothing reads stdin
    pub file: Option<PathBuf>,

    /// Validation mode
    #[arg(long, default_value = "IMPORT_STRICT")]
    pub validation: String,

    #[arg(long, default_value_t = 1)]
    pub max_threads: u32,

    #[arg(long)]
    pub legacy_mode: bool,

    /// Allow beanshell/groovy code inside the impex
    #[arg(long)]
    pub enable_code_execution: bool,

    /// Extra form field, repeatable (key=value)
    #[arg(long = "param", value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Validate an impex script without importing it
    Validate(ImpexArgs),

    /// Import an impex script
    Import(ImpexArgs),

    /// Run a flexible search (or SQL) query
    Flex {
        /// Query text; `-` or nothing reads stdin
        query: Option<String>,

        /// Treat the query as plain SQL
        #[arg(long)]
        sql: bool,

        #[arg(long)]
        commit: bool,

        #[arg(long, default_value_t = DEFAULT_MAX_ROWS)]
        max_rows: u32,
    },

    /// Run a groovy script
    Groovy {
        /// Script text; `-` or nothing reads stdin
        script: Option<String>,

        /// Read the script from a file
        #[arg(short = 'f', long, conflicts_with = "script")]
        file: Option<PathBuf>,

        #[arg(long)]
        commit: bool,

        /// Timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Change the level of a logger
    LogLevel { logger: String, level: String },
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))
}

#[derive(Debug, Clone)]
pub struct CommandLineArgs {
    profile: String,
    verbose: bool,
    command: ConsoleCommand,
}

impl CommandLineArgs {
    pub fn parse() -> Self {
        Self::from(ClapArgs::parse())
    }

    pub fn parse_from<I, T>(itr: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::from(ClapArgs::parse_from(itr))
    }

    pub fn profile(&self) -> &String {
        &self.profile
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn command(&self) -> &ConsoleCommand {
        &self.command
    }
}

impl From<ClapArgs> for CommandLineArgs {
    fn from(args: ClapArgs) -> Self {
        Self {
            profile: args.profile,
            verbose: args.verbose,
            command: args.command,
        }
    }
}
