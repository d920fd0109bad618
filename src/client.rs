//! # Console Command Client
//!
//! One method per console capability. Each builds the form parameters, posts
//! them through a [`Transport`], and folds the response into a [`HacResult`]:
//!
//! ```text
//! transport status -> structural absence -> console exception
//!                  -> stack trace -> success payload
//! ```
//!
//! No method returns `Err`; every failure is a result with an error message.

use crate::config::DEFAULT_TIMEOUT;
use crate::parser::{
    self, AttributeOutcome, ConsoleDocument, JsonMap, ParseError, NO_DATA_MESSAGE,
};
use crate::profile::ConnectionProfile;
use crate::result::{
    HacResult, HacResultBuilder, STATUS_BAD_GATEWAY, STATUS_BAD_REQUEST, STATUS_OK,
};
use crate::search::{SearchBackend, SearchQuery};
use crate::transport::{FormParams, Transport, TransportResponse};
use std::time::Duration;

pub const IMPEX_VALIDATE_PATH: &str = "/console/impex/import/validate";
pub const IMPEX_IMPORT_PATH: &str = "/console/impex/import";
pub const FLEXIBLE_SEARCH_PATH: &str = "/console/flexsearch/execute";
pub const SCRIPTING_PATH: &str = "/console/scripting/execute";
pub const LOG_LEVEL_PATH: &str = "/platform/log4j/changeLevel/";

pub const SEARCH_UNREACHABLE_MESSAGE: &str =
    "Unable to connect to the search server. Please, check connection configuration";

const VALIDATION_RESULT_ID: &str = "validationResultMsg";
const IMPEX_RESULT_ID: &str = "impexResult";
/// Class of the container whose first child holds the import diagnostics
const IMPEX_DETAIL_CLASS: &str = "impexResult";

/// How the JSON payload is wrapped in the response body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JsonBody {
    /// JSON is the text of the HTML `<body>`
    HtmlEmbedded,
    /// The body is JSON
    Raw,
}

/// Client for the console of the active connection profile
pub struct HacClient<P: ConnectionProfile, T: Transport> {
    profile: P,
    transport: T,
    search: Option<Box<dyn SearchBackend>>,
}

impl<P: ConnectionProfile, T: Transport> HacClient<P, T> {
    pub fn new(profile: P, transport: T) -> Self {
        Self {
            profile,
            transport,
            search: None,
        }
    }

    pub fn with_search_backend(mut self, backend: Box<dyn SearchBackend>) -> Self {
        self.search = Some(backend);
        self
    }

    pub fn profile(&self) -> &P {
        &self.profile
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Timeout of commands that don't take one explicitly
    pub fn default_timeout(&self) -> Duration {
        self.profile.timeout().unwrap_or(DEFAULT_TIMEOUT)
    }

    fn action_url(&self, suffix: &str) -> String {
        format!("{}{}", self.profile.generated_url(), suffix)
    }

    /// Validate an impex script without importing it.
    /// `params` are the console form fields, passed verbatim.
    pub fn validate_impex(&self, params: &FormParams) -> HacResult {
        self.impex_command(IMPEX_VALIDATE_PATH, params, VALIDATION_RESULT_ID, None)
    }

    /// Import an impex script. On failure the first diagnostic line of the
    /// console becomes the detail message.
    pub fn import_impex(&self, params: &FormParams) -> HacResult {
        self.impex_command(
            IMPEX_IMPORT_PATH,
            params,
            IMPEX_RESULT_ID,
            Some(IMPEX_DETAIL_CLASS),
        )
    }

    fn impex_command(
        &self,
        suffix: &str,
        params: &FormParams,
        element_id: &str,
        detail_class: Option<&str>,
    ) -> HacResult {
        let url = self.action_url(suffix);
        let timeout = self.default_timeout();

        let mut response = match self
            .transport
            .post(&url, params, false, timeout, &self.profile)
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Impex request to {} failed: {}", url, e);
                return HacResult::builder()
                    .http_code(STATUS_BAD_REQUEST)
                    .error_message(e.to_string())
                    .build();
            }
        };

        let builder = HacResult::builder().http_code(response.status());
        if response.status() != STATUS_OK {
            // bare reason phrase, unlike the JSON commands
            return builder.error_message(response.reason()).build();
        }

        let text = match response.read_body_text() {
            Ok(Some(text)) => text,
            Ok(None) => return builder.error_message(NO_DATA_MESSAGE).build(),
            Err(e) => {
                tracing::warn!("Failed to read impex response: {}", e);
                return builder.error_message(e.to_string()).build();
            }
        };

        let document = ConsoleDocument::parse(&text);
        match parser::parse_attribute_response(&document, element_id, detail_class) {
            Ok(AttributeOutcome::Success(output)) => builder.output(output).build(),
            Ok(AttributeOutcome::Failure { message, detail }) => {
                let builder = builder.error_message(message);
                let builder = match detail {
                    Some(detail) => builder.detail_message(detail),
                    None => builder,
                };
                builder.build()
            }
            Err(e) => builder.error_message(e.to_string()).build(),
        }
    }

    /// Run a flexible search query, or a plain SQL query when `plain_sql` is
    /// set. The result set is rendered as a text table.
    pub fn execute_flexible_search(
        &self,
        commit: bool,
        plain_sql: bool,
        max_rows: u32,
        content: &str,
    ) -> HacResult {
        let (flexible_query, sql_query) = if plain_sql {
            ("", content)
        } else {
            (content, "")
        };
        let max_count = max_rows.to_string();
        let params = form_params([
            ("scriptType", "flexibleSearch"),
            ("commit", bool_text(commit)),
            ("flexibleSearchQuery", flexible_query),
            ("sqlQuery", sql_query),
            ("maxCount", max_count.as_str()),
            ("user", self.profile.username()),
        ]);
        let url = self.action_url(FLEXIBLE_SEARCH_PATH);

        let timeout = self.default_timeout();
        let (builder, json) = match self.fetch_json(&url, &params, timeout, JsonBody::HtmlEmbedded)
        {
            Ok(fetched) => fetched,
            Err(result) => return result,
        };

        if let Some(message) = parser::console_failure(&json) {
            return builder.error_message(message).build();
        }
        match parser::query_table(&json) {
            Ok(table) => builder.output(table).build(),
            Err(e) => builder.error_message(e.to_string()).build(),
        }
    }

    /// Run a groovy script. The script's console output becomes `output`,
    /// its return value `result`.
    pub fn execute_groovy_script(&self, content: &str, commit: bool, timeout: Duration) -> HacResult {
        let params = form_params([
            ("scriptType", "groovy"),
            ("commit", bool_text(commit)),
            ("script", content),
        ]);
        let url = self.action_url(SCRIPTING_PATH);

        match self.fetch_json(&url, &params, timeout, JsonBody::Raw) {
            Ok((builder, json)) => script_result(builder, &json),
            Err(result) => result,
        }
    }

    /// Hand a search query to the search backend
    pub fn execute_search(&self, query: Option<&SearchQuery>) -> HacResult {
        match (query, &self.search) {
            (Some(query), Some(backend)) => backend.execute_query(query),
            (Some(_), None) => {
                tracing::warn!("No search backend configured");
                search_unreachable()
            }
            (None, _) => search_unreachable(),
        }
    }

    /// Change the level of a logger on the connected node
    pub fn execute_log_update(&self, logger_name: &str, level: &str, timeout: Duration) -> HacResult {
        let params = form_params([("loggerName", logger_name), ("levelName", level)]);
        let url = self.action_url(LOG_LEVEL_PATH);

        match self.fetch_json(&url, &params, timeout, JsonBody::HtmlEmbedded) {
            Ok((builder, json)) => script_result(builder, &json),
            Err(result) => result,
        }
    }

    /// Post a command and decode its JSON payload.
    ///
    /// `Err` carries the finished failure result; `Ok` carries a builder that
    /// already holds the status code.
    fn fetch_json(
        &self,
        url: &str,
        params: &FormParams,
        timeout: Duration,
        body: JsonBody,
    ) -> Result<(HacResultBuilder, JsonMap), HacResult> {
        tracing::debug!("Executing console command {}", url);

        let mut response = self
            .transport
            .post(url, params, true, timeout, &self.profile)
            .map_err(|e| {
                tracing::warn!("Request to {} failed: {}", url, e);
                HacResult::builder()
                    .http_code(STATUS_BAD_REQUEST)
                    .error_message(format!("{e} {url}"))
                    .build()
            })?;

        let builder = HacResult::builder().http_code(response.status());
        if response.status() != STATUS_OK || !response.has_body() {
            return Err(builder.error_message(status_message(&response)).build());
        }

        let text = match response.read_body_text() {
            Ok(Some(text)) => text,
            Ok(None) => return Err(builder.error_message(NO_DATA_MESSAGE).build()),
            Err(e) => {
                tracing::warn!("Failed to read response from {}: {}", url, e);
                return Err(builder
                    .http_code(STATUS_BAD_REQUEST)
                    .error_message(format!("{e} {url}"))
                    .build());
            }
        };

        let payload = match body {
            JsonBody::Raw => text,
            JsonBody::HtmlEmbedded => match ConsoleDocument::parse(&text).body_text() {
                Some(payload) => payload,
                None => return Err(builder.error_message(NO_DATA_MESSAGE).build()),
            },
        };

        match parser::decode_mapping(&payload) {
            Ok(json) => Ok((builder, json)),
            Err(e) => {
                if let ParseError::Undecodable { reason } = &e {
                    tracing::error!("Cannot parse response from {}: {}", url, reason);
                }
                Err(builder.error_message(e.to_string()).build())
            }
        }
    }
}

/// Result of a script-like command: console failure, else output and result
fn script_result(builder: HacResultBuilder, json: &JsonMap) -> HacResult {
    if let Some(message) = parser::console_failure(json) {
        return builder.error_message(message).build();
    }
    let output = parser::console_output(json);
    let builder = match output.output {
        Some(text) => builder.output(text),
        None => builder,
    };
    let builder = match output.result {
        Some(result) => builder.result(result),
        None => builder,
    };
    builder.build()
}

fn search_unreachable() -> HacResult {
    HacResult::builder()
        .http_code(STATUS_BAD_GATEWAY)
        .error_message(SEARCH_UNREACHABLE_MESSAGE)
        .build()
}

/// `[<code>] <reason phrase>`
fn status_message(response: &TransportResponse) -> String {
    format!("[{}] {}", response.status(), response.reason())
}

fn bool_text(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

fn form_params<const N: usize>(pairs: [(&str, &str); N]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}
