//! # Console Response Parser
//!
//! The administration console is a web UI, not an API, and answers in three
//! shapes:
//!
//! - HTML pages carrying the outcome in `data-level`/`data-result` attributes
//!   of a known element (impex import and validation)
//! - HTML pages whose body text is a JSON document (flexible search, log level)
//! - plain JSON (groovy scripting)
//!
//! This module turns each shape into plain values. Failures are returned as
//! [`ParseError`], never raised.

use crate::table::TableBuilder;
use scraper::{ElementRef, Html};
use serde_json::{Map, Value};
use thiserror::Error;

pub const NO_DATA_MESSAGE: &str = "No data in response";
pub const CANNOT_PARSE_MESSAGE: &str = "Cannot parse response from the server...";

/// `data-level` value marking a failed impex run
const ERROR_LEVEL: &str = "error";
const LEVEL_ATTR: &str = "data-level";
const RESULT_ATTR: &str = "data-result";

/// Decoded console JSON object
pub type JsonMap = Map<String, Value>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// An expected element, attribute or key is missing
    #[error("No data in response")]
    NoData,
    /// The payload is not a JSON object
    #[error("Cannot parse response from the server...")]
    Undecodable { reason: String },
}

/// An HTML page returned by the console
pub struct ConsoleDocument {
    html: Html,
}

impl ConsoleDocument {
    /// Parse an HTML document. HTML parsing is lenient and never fails.
    pub fn parse(text: &str) -> Self {
        Self {
            html: Html::parse_document(text),
        }
    }

    fn elements(&self) -> impl Iterator<Item = ElementRef<'_>> {
        self.html
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
    }

    pub fn element_by_id(&self, id: &str) -> Option<ElementRef<'_>> {
        self.elements().find(|el| el.value().id() == Some(id))
    }

    pub fn first_element_with_class(&self, class: &str) -> Option<ElementRef<'_>> {
        self.elements()
            .find(|el| el.value().classes().any(|c| c == class))
    }

    /// Whitespace-normalised text of the first child element of the first
    /// element carrying `class`
    pub fn first_child_text_of_class(&self, class: &str) -> Option<String> {
        let container = self.first_element_with_class(class)?;
        let child = container.children().find_map(ElementRef::wrap)?;
        Some(normalized_text(child))
    }

    /// Raw text content of `<body>`, trimmed
    pub fn body_text(&self) -> Option<String> {
        let body = self.elements().find(|el| el.value().name() == "body")?;
        Some(body.text().collect::<String>().trim().to_string())
    }

    /// `content` attribute of `<meta name="...">`
    pub fn meta_content(&self, name: &str) -> Option<String> {
        self.elements()
            .filter(|el| el.value().name() == "meta")
            .find(|el| el.value().attr("name") == Some(name))
            .and_then(|el| el.value().attr("content"))
            .map(str::to_string)
    }
}

fn normalized_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Outcome carried by the attributes of an impex result element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeOutcome {
    Success(String),
    Failure {
        message: String,
        detail: Option<String>,
    },
}

/// Read the outcome from the `data-level`/`data-result` attributes of the
/// element `element_id`.
///
/// When the level is `error` and `detail_class` is given, the text of the
/// first child of the first element with that class becomes the detail.
pub fn parse_attribute_response(
    document: &ConsoleDocument,
    element_id: &str,
    detail_class: Option<&str>,
) -> Result<AttributeOutcome, ParseError> {
    let element = document
        .element_by_id(element_id)
        .ok_or(ParseError::NoData)?;
    let (Some(level), Some(result)) = (
        element.value().attr(LEVEL_ATTR),
        element.value().attr(RESULT_ATTR),
    ) else {
        return Err(ParseError::NoData);
    };

    if level == ERROR_LEVEL {
        Ok(AttributeOutcome::Failure {
            message: result.to_string(),
            detail: detail_class.and_then(|class| document.first_child_text_of_class(class)),
        })
    } else {
        Ok(AttributeOutcome::Success(result.to_string()))
    }
}

/// Decode `text` as a JSON object
pub fn decode_mapping(text: &str) -> Result<JsonMap, ParseError> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ParseError::Undecodable {
            reason: format!("expected a JSON object, got {}", json_kind(&other)),
        }),
        Err(e) => Err(ParseError::Undecodable {
            reason: e.to_string(),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Textual form of a JSON value; strings are taken verbatim, `null` is absent
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Error reported by the console itself, if any.
///
/// A non-null `exception` wins over a non-empty `stacktraceText`.
pub fn console_failure(json: &JsonMap) -> Option<String> {
    if let Some(exception) = json.get("exception").filter(|v| !v.is_null()) {
        let message = exception
            .get("message")
            .and_then(value_text)
            .or_else(|| value_text(exception))
            .unwrap_or_default();
        return Some(message);
    }

    json.get("stacktraceText")
        .and_then(value_text)
        .filter(|text| !text.is_empty())
}

/// Success payload of a script or log level response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsoleOutput {
    pub output: Option<String>,
    pub result: Option<String>,
}

pub fn console_output(json: &JsonMap) -> ConsoleOutput {
    ConsoleOutput {
        output: json.get("outputText").and_then(value_text),
        result: json.get("executionResult").and_then(value_text),
    }
}

/// Render `headers` and `resultList` of a flexible search response as a table
pub fn query_table(json: &JsonMap) -> Result<String, ParseError> {
    let headers = json
        .get("headers")
        .and_then(Value::as_array)
        .ok_or(ParseError::NoData)?;

    let mut table = TableBuilder::new();
    table.add_row(headers.iter().map(cell_text));

    if let Some(rows) = json.get("resultList").and_then(Value::as_array) {
        for row in rows {
            match row.as_array() {
                Some(cells) => table.add_row(cells.iter().map(cell_text)),
                None => table.add_row([cell_text(row)]),
            };
        }
    }

    Ok(table.render())
}

fn cell_text(value: &Value) -> String {
    value_text(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(value: Value) -> JsonMap {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    const IMPORT_ERROR_PAGE: &str = r#"<html><body>
        <div id="impexResult" data-level="error" data-result="Import has encountered problems"></div>
        <pre class="impexResult"><code>line 2 at main script: unknown attributes [Product.foo]</code><span>more</span></pre>
    </body></html>"#;

    #[test]
    fn parse_attribute_response_should_return_success_output() {
        let document = ConsoleDocument::parse(
            r#"<div id="validationResultMsg" data-level="success" data-result="Import script is valid"></div>"#,
        );

        let outcome = parse_attribute_response(&document, "validationResultMsg", None);

        assert_eq!(
            outcome,
            Ok(AttributeOutcome::Success("Import script is valid".to_string()))
        );
    }

    #[test]
    fn parse_attribute_response_should_extract_error_detail() {
        let document = ConsoleDocument::parse(IMPORT_ERROR_PAGE);

        let outcome = parse_attribute_response(&document, "impexResult", Some("impexResult"));

        assert_eq!(
            outcome,
            Ok(AttributeOutcome::Failure {
                message: "Import has encountered problems".to_string(),
                detail: Some(
                    "line 2 at main script: unknown attributes [Product.foo]".to_string()
                ),
            })
        );
    }

    #[test]
    fn parse_attribute_response_should_skip_detail_when_not_requested() {
        let document = ConsoleDocument::parse(IMPORT_ERROR_PAGE);

        let outcome = parse_attribute_response(&document, "impexResult", None);

        assert!(matches!(
            outcome,
            Ok(AttributeOutcome::Failure { detail: None, .. })
        ));
    }

    #[test]
    fn parse_attribute_response_should_report_missing_element() {
        let document = ConsoleDocument::parse("<html><body><p>login</p></body></html>");

        let outcome = parse_attribute_response(&document, "impexResult", None);

        assert_eq!(outcome, Err(ParseError::NoData));
        assert_eq!(ParseError::NoData.to_string(), NO_DATA_MESSAGE);
    }

    #[test]
    fn parse_attribute_response_should_report_missing_attribute() {
        let document = ConsoleDocument::parse(r#"<div id="impexResult" data-result="x"></div>"#);

        let outcome = parse_attribute_response(&document, "impexResult", None);

        assert_eq!(outcome, Err(ParseError::NoData));
    }

    #[test]
    fn body_text_should_unwrap_embedded_json() {
        let document =
            ConsoleDocument::parse(r#"<html><body>  {"outputText":"ok"}  </body></html>"#);

        assert_eq!(document.body_text().as_deref(), Some(r#"{"outputText":"ok"}"#));
    }

    #[test]
    fn meta_content_should_find_named_meta() {
        let document = ConsoleDocument::parse(
            r#"<html><head><meta name="_csrf_header" content="X-CSRF-TOKEN"><meta name="_csrf" content="abc-123"></head></html>"#,
        );

        assert_eq!(document.meta_content("_csrf").as_deref(), Some("abc-123"));
        assert_eq!(document.meta_content("missing"), None);
    }

    #[test]
    fn decode_mapping_should_reject_malformed_json() {
        let error = decode_mapping("{not json").unwrap_err();

        assert!(matches!(error, ParseError::Undecodable { .. }));
        assert_eq!(error.to_string(), CANNOT_PARSE_MESSAGE);
    }

    #[test]
    fn decode_mapping_should_reject_non_objects() {
        assert!(matches!(
            decode_mapping("[1, 2]"),
            Err(ParseError::Undecodable { .. })
        ));
    }

    #[test]
    fn console_failure_should_prefer_exception_over_stacktrace() {
        let json = as_map(json!({
            "exception": {"message": "Table does not exist"},
            "stacktraceText": "at line 1",
            "outputText": "ignored"
        }));

        assert_eq!(console_failure(&json).as_deref(), Some("Table does not exist"));
    }

    #[test]
    fn console_failure_should_ignore_null_exception_and_empty_stacktrace() {
        let json = as_map(json!({"exception": null, "stacktraceText": "", "outputText": "ok"}));

        assert_eq!(console_failure(&json), None);
    }

    #[test]
    fn console_failure_should_report_stacktrace() {
        let json = as_map(json!({"stacktraceText": "groovy.lang.MissingPropertyException"}));

        assert_eq!(
            console_failure(&json).as_deref(),
            Some("groovy.lang.MissingPropertyException")
        );
    }

    #[test]
    fn console_output_should_stringify_non_string_results() {
        let json = as_map(json!({"outputText": "done", "executionResult": 42}));

        assert_eq!(
            console_output(&json),
            ConsoleOutput {
                output: Some("done".to_string()),
                result: Some("42".to_string()),
            }
        );
    }

    #[test]
    fn query_table_should_render_headers_and_rows_in_order() {
        let json = as_map(json!({"headers": ["id"], "resultList": [["1"], ["2"]]}));

        assert_eq!(query_table(&json), Ok("id\n1 \n2 \n".to_string()));
    }

    #[test]
    fn query_table_should_render_null_cells_empty() {
        let json = as_map(json!({"headers": ["PK", "name"], "resultList": [[8796093054980u64, null]]}));

        assert_eq!(
            query_table(&json),
            Ok("PK            | name\n8796093054980 |     \n".to_string())
        );
    }

    #[test]
    fn query_table_should_require_headers() {
        let json = as_map(json!({"resultList": []}));

        assert_eq!(query_table(&json), Err(ParseError::NoData));
    }
}
