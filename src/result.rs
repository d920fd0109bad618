//! # Command Result
//!
//! Every console command ends in a [`HacResult`]: the transport status plus
//! either a success payload or an error message. Expected remote failures are
//! reported through this value rather than through `Err`.

use serde::Serialize;

/// HTTP 200
pub const STATUS_OK: u16 = 200;
/// HTTP 400, used when no usable response was received
pub const STATUS_BAD_REQUEST: u16 = 400;
/// HTTP 502, used when the search backend is unreachable
pub const STATUS_BAD_GATEWAY: u16 = 502;

/// Outcome of a single console command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HacResult {
    http_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<String>,
}

impl HacResult {
    /// Start building a result
    pub fn builder() -> HacResultBuilder {
        HacResultBuilder::default()
    }

    /// Status code reported by the transport (0 if none was set)
    pub fn http_code(&self) -> u16 {
        self.http_code
    }

    /// Human-readable success payload
    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Extended diagnostic accompanying an error (impex import only)
    pub fn detail_message(&self) -> Option<&str> {
        self.detail_message.as_deref()
    }

    /// Machine-oriented value, e.g. the return value of a groovy script
    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    /// A command succeeded iff no error message was recorded
    pub fn is_success(&self) -> bool {
        self.error_message.is_none()
    }
}

/// Accumulates the fields of a [`HacResult`].
///
/// Nothing is validated on `build()`: callers must not set an output and an
/// error message on the same result.
#[derive(Debug, Clone, Default)]
pub struct HacResultBuilder {
    inner: HacResult,
}

impl HacResultBuilder {
    pub fn http_code(mut self, code: u16) -> Self {
        self.inner.http_code = code;
        self
    }

    pub fn output(mut self, output: impl Into<String>) -> Self {
        self.inner.output = Some(output.into());
        self
    }

    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.inner.error_message = Some(message.into());
        self
    }

    pub fn detail_message(mut self, message: impl Into<String>) -> Self {
        self.inner.detail_message = Some(message.into());
        self
    }

    pub fn result(mut self, result: impl Into<String>) -> Self {
        self.inner.result = Some(result.into());
        self
    }

    pub fn build(self) -> HacResult {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_should_start_empty() {
        let result = HacResult::builder().build();

        assert_eq!(result.http_code(), 0);
        assert!(result.output().is_none());
        assert!(result.is_success());
    }

    #[test]
    fn builder_should_keep_status_set_before_outcome() {
        let builder = HacResult::builder().http_code(STATUS_OK);
        let result = builder.error_message("boom").detail_message("line 3").build();

        assert_eq!(result.http_code(), 200);
        assert_eq!(result.error_message(), Some("boom"));
        assert_eq!(result.detail_message(), Some("line 3"));
        assert!(!result.is_success());
    }

    #[test]
    fn result_should_serialize_only_present_fields() {
        let result = HacResult::builder()
            .http_code(STATUS_OK)
            .output("done")
            .result("42")
            .build();

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"httpCode": 200, "output": "done", "result": "42"})
        );
    }
}
