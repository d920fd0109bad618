//! # Command-line Application
//!
//! Resolves the connection profile, reads command content from arguments,
//! files or stdin, runs one console command and prints its result.

use crate::client::HacClient;
use crate::cmd_args::{CommandLineArgs, ConsoleCommand, ImpexArgs};
use crate::config;
use crate::profile::{ConnectionProfile, IniProfile, IniProfileStore};
use crate::result::HacResult;
use crate::transport::HttpTransport;
use anyhow::{bail, Context, Result};
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

/// Marker for "read from stdin" in positional arguments
const STDIN_MARKER: &str = "-";

pub struct App {
    args: CommandLineArgs,
    client: HacClient<IniProfile, HttpTransport>,
}

impl App {
    pub fn new(args: CommandLineArgs) -> Result<Self> {
        let profile_path = config::get_profile_path();
        let profile = Self::load_profile(args.profile(), &profile_path)?;
        let transport = HttpTransport::new(&profile)
            .with_context(|| format!("Failed to set up HTTP client for '{}'", profile.server()))?;

        Ok(Self {
            args,
            client: HacClient::new(profile, transport),
        })
    }

    /// Load profile from INI file; unlike an interactive client there is no
    /// blank fallback, a command always needs a console to talk to.
    fn load_profile(profile_name: &str, profile_path: &str) -> Result<IniProfile> {
        tracing::debug!("Loading profile '{}' from '{}'", profile_name, profile_path);

        let store = IniProfileStore::new(profile_path);
        let Some(profile) = store.get_profile(profile_name)? else {
            bail!(
                "Profile '{}' not found in '{}'",
                profile_name,
                store.path()
            );
        };
        if profile.server().is_empty() {
            bail!("Profile '{}' has no server configured", profile_name);
        }

        tracing::debug!("Profile loaded successfully, console: {}", profile.generated_url());
        Ok(profile)
    }

    /// Run the command given on the command line
    pub fn run(&self) -> Result<HacResult> {
        let result = match self.args.command() {
            ConsoleCommand::Validate(impex) => {
                let params = impex_params(impex, read_impex(impex)?);
                self.client.validate_impex(&params)
            }
            ConsoleCommand::Import(impex) => {
                let params = impex_params(impex, read_impex(impex)?);
                self.client.import_impex(&params)
            }
            ConsoleCommand::Flex {
                query,
                sql,
                commit,
                max_rows,
            } => {
                let query = read_content(query.as_deref())?;
                self.client
                    .execute_flexible_search(*commit, *sql, *max_rows, &query)
            }
            ConsoleCommand::Groovy {
                script,
                file,
                commit,
                timeout,
            } => {
                let script = match file {
                    Some(path) => read_file(path)?,
                    None => read_content(script.as_deref())?,
                };
                let timeout = timeout
                    .map(Duration::from_secs)
                    .unwrap_or_else(|| self.client.default_timeout());
                self.client.execute_groovy_script(&script, *commit, timeout)
            }
            ConsoleCommand::LogLevel { logger, level } => {
                self.client
                    .execute_log_update(logger, level, self.client.default_timeout())
            }
        };
        Ok(result)
    }
}

/// Console form fields for an impex run; `--param` values replace defaults
/// with the same key and are appended otherwise.
pub fn impex_params(args: &ImpexArgs, content: String) -> Vec<(String, String)> {
    let mut params = vec![
        ("scriptContent".to_string(), content),
        ("validationEnum".to_string(), args.validation.clone()),
        ("maxThreads".to_string(), args.max_threads.to_string()),
        ("encoding".to_string(), "UTF-8".to_string()),
        ("legacyMode".to_string(), args.legacy_mode.to_string()),
        (
            "enableCodeExecution".to_string(),
            args.enable_code_execution.to_string(),
        ),
    ];

    for (key, value) in &args.params {
        match params.iter_mut().find(|(existing, _)| existing == key) {
            Some(param) => param.1 = value.clone(),
            None => params.push((key.clone(), value.clone())),
        }
    }
    params
}

fn read_impex(args: &ImpexArgs) -> Result<String> {
    match args.file.as_deref() {
        Some(path) if path != Path::new(STDIN_MARKER) => read_file(path),
        _ => read_stdin(),
    }
}

fn read_content(arg: Option<&str>) -> Result<String> {
    match arg {
        Some(text) if text != STDIN_MARKER => Ok(text.to_string()),
        _ => read_stdin(),
    }
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read '{}'", path.display()))
}

fn read_stdin() -> Result<String> {
    if atty::is(atty::Stream::Stdin) {
        bail!("No content given; pass it as an argument or pipe it on stdin");
    }
    let mut content = String::new();
    std::io::stdin()
        .read_to_string(&mut content)
        .context("Failed to read stdin")?;
    Ok(content)
}

/// Print a result: payload to `out`, failures to `err`. Returns whether the
/// command succeeded.
pub fn report(result: &HacResult, out: &mut impl Write, err: &mut impl Write) -> Result<bool> {
    if let Some(message) = result.error_message() {
        // JSON commands already put the status code in front of HTTP errors
        let status = format!("[{}]", result.http_code());
        if message.starts_with(&status) {
            writeln!(err, "{message}")?;
        } else {
            writeln!(err, "{status} {message}")?;
        }
        if let Some(detail) = result.detail_message() {
            writeln!(err, "{detail}")?;
        }
        return Ok(false);
    }

    if let Some(output) = result.output() {
        write!(out, "{output}")?;
        if !output.ends_with('\n') {
            writeln!(out)?;
        }
    }
    if let Some(value) = result.result() {
        writeln!(out, "Result: {value}")?;
    }
    Ok(true)
}
