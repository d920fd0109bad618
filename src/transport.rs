//! # Console Transport
//!
//! Posts form-encoded commands to the console. [`Transport`] is the seam the
//! command client is written against; [`HttpTransport`] is the real
//! implementation on top of a blocking `reqwest` client.
//!
//! The console is protected by a form login with CSRF tokens. A session is
//! opened lazily on the first command and kept in the cookie jar:
//!
//! ```text
//! GET  <console>/                        -> login page, <meta name="_csrf">
//! POST <console>/j_spring_security_check -> j_username, j_password, _csrf
//! POST <console>/<command>               -> X-CSRF-TOKEN: <token>
//! ```

use crate::parser::ConsoleDocument;
use crate::profile::ConnectionProfile;
use bytes::{Buf, Bytes};
use flate2::read::{GzDecoder, ZlibDecoder};
use regex::Regex;
use reqwest::blocking::{Client, Response};
use reqwest::cookie::Jar;
use reqwest::header::{ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_TYPE};
use reqwest::{StatusCode, Url};
use std::io::Read;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use thiserror::Error;

/// Ordered form parameters of a command
pub type FormParams = [(String, String)];

const LOGIN_PATH: &str = "/j_spring_security_check";
const CSRF_META: &str = "_csrf";
const CSRF_HEADER: &str = "X-CSRF-TOKEN";
const SUPPORTED_ENCODINGS: &str = "gzip, deflate, zstd";

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid console URL '{url}'")]
    InvalidUrl { url: String },
    #[error("Login to {url} was rejected")]
    LoginRejected { url: String },
}

/// Readable response body
pub type Body = Box<dyn Read + Send>;

/// Status line and body stream of a console response
pub struct TransportResponse {
    status: u16,
    reason: String,
    charset: Option<String>,
    body: Option<Body>,
}

impl TransportResponse {
    pub fn new(status: u16, reason: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
            charset: None,
            body: None,
        }
    }

    pub fn with_body(mut self, body: impl Read + Send + 'static) -> Self {
        self.body = Some(Box::new(body));
        self
    }

    /// Body that is already buffered in memory
    pub fn with_bytes(self, bytes: impl Into<Bytes>) -> Self {
        self.with_body(bytes.into().reader())
    }

    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Read the whole body and decode it with the declared charset
    /// (UTF-8 when none or an unknown one is declared).
    ///
    /// Returns `Ok(None)` when the response has no body. The body can only be
    /// read once.
    pub fn read_body_text(&mut self) -> std::io::Result<Option<String>> {
        let Some(mut body) = self.body.take() else {
            return Ok(None);
        };
        let mut raw = Vec::new();
        body.read_to_end(&mut raw)?;

        let encoding = self
            .charset
            .as_deref()
            .and_then(|label| encoding_rs::Encoding::for_label(label.as_bytes()))
            .unwrap_or(encoding_rs::UTF_8);
        let (text, _, malformed) = encoding.decode(&raw);
        if malformed {
            tracing::warn!("Response body is not valid {}", encoding.name());
        }
        Ok(Some(text.into_owned()))
    }
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("reason", &self.reason)
            .field("charset", &self.charset)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

/// Sends console commands.
///
/// Ordinary HTTP error statuses are returned as responses; `Err` is reserved
/// for failures where no response could be obtained.
pub trait Transport {
    /// POST `params` to `url`.
    ///
    /// With `require_success`, an expired console session is renewed and the
    /// request retried once before the response is handed back.
    fn post(
        &self,
        url: &str,
        params: &FormParams,
        require_success: bool,
        timeout: Duration,
        profile: &dyn ConnectionProfile,
    ) -> Result<TransportResponse, TransportError>;
}

/// [`Transport`] over HTTP(S) with console login handling
pub struct HttpTransport {
    client: Client,
    /// CSRF token of the current console session
    session: Mutex<Option<String>>,
}

impl HttpTransport {
    pub fn new(profile: &dyn ConnectionProfile) -> Result<Self, TransportError> {
        let jar = Arc::new(Jar::default());
        if let Some(replica) = profile.replica() {
            let base = profile.generated_url();
            let url = Url::parse(&base).map_err(|_| TransportError::InvalidUrl { url: base })?;
            tracing::debug!("Routing requests to replica '{}'", replica.id);
            jar.add_cookie_str(&format!("{}={}", replica.cookie_name, replica.id), &url);
        }

        let client = Client::builder()
            .cookie_provider(jar)
            .danger_accept_invalid_certs(profile.insecure())
            .build()?;

        Ok(Self {
            client,
            session: Mutex::new(None),
        })
    }

    /// Token of the current session, logging in first if there is none.
    /// Profiles without a user name never log in.
    fn session_token(
        &self,
        timeout: Duration,
        profile: &dyn ConnectionProfile,
    ) -> Result<Option<String>, TransportError> {
        if profile.username().is_empty() {
            return Ok(None);
        }

        let mut session = self.session.lock().unwrap_or_else(|e| e.into_inner());
        if session.is_none() {
            *session = Some(self.login(timeout, profile)?);
        }
        Ok(session.clone())
    }

    fn reset_session(&self) {
        *self.session.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    fn login(
        &self,
        timeout: Duration,
        profile: &dyn ConnectionProfile,
    ) -> Result<String, TransportError> {
        let base = profile.generated_url();
        tracing::debug!("Opening console session at {}", base);

        let login_page = self.client.get(&base).timeout(timeout).send()?.text()?;
        let token = ConsoleDocument::parse(&login_page)
            .meta_content(CSRF_META)
            .unwrap_or_default();

        let login_url = format!("{base}{LOGIN_PATH}");
        let form = [
            ("j_username", profile.username()),
            ("j_password", profile.password()),
            (CSRF_META, token.as_str()),
        ];
        let response = self
            .client
            .post(&login_url)
            .timeout(timeout)
            .form(&form)
            .send()?;

        if is_login_page(&response) || !response.status().is_success() {
            return Err(TransportError::LoginRejected { url: base });
        }

        // The token is rotated on login; the landing page carries the new one.
        let landing = response.text()?;
        let token = ConsoleDocument::parse(&landing)
            .meta_content(CSRF_META)
            .unwrap_or(token);
        tracing::debug!("Console session opened for user '{}'", profile.username());
        Ok(token)
    }

    fn send_command(
        &self,
        url: &str,
        params: &FormParams,
        timeout: Duration,
        profile: &dyn ConnectionProfile,
    ) -> Result<Response, TransportError> {
        let token = self.session_token(timeout, profile)?;
        let mut request = self
            .client
            .post(url)
            .timeout(timeout)
            .header(ACCEPT_ENCODING, SUPPORTED_ENCODINGS)
            .form(params);
        if let Some(token) = token {
            request = request.header(CSRF_HEADER, token);
        }
        Ok(request.send()?)
    }
}

impl Transport for HttpTransport {
    fn post(
        &self,
        url: &str,
        params: &FormParams,
        require_success: bool,
        timeout: Duration,
        profile: &dyn ConnectionProfile,
    ) -> Result<TransportResponse, TransportError> {
        tracing::debug!("POST {} ({} parameters)", url, params.len());
        let mut response = self.send_command(url, params, timeout, profile)?;

        if require_success && session_expired(&response) {
            tracing::debug!(
                "Console session rejected with {}, logging in again",
                response.status()
            );
            self.reset_session();
            response = self.send_command(url, params, timeout, profile)?;
        }

        tracing::debug!("Response status {}", response.status());
        into_transport_response(response)
    }
}

fn is_login_page(response: &Response) -> bool {
    response.url().path().ends_with("/login")
}

fn session_expired(response: &Response) -> bool {
    is_login_page(response)
        || matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        )
}

fn into_transport_response(response: Response) -> Result<TransportResponse, TransportError> {
    let status = response.status();
    let charset = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(charset_of);
    let content_encoding = response
        .headers()
        .get(CONTENT_ENCODING)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_ascii_lowercase());

    let mut transport_response =
        TransportResponse::new(status.as_u16(), status.canonical_reason().unwrap_or(""));
    if let Some(charset) = charset {
        transport_response = transport_response.with_charset(charset);
    }

    let body: Body = match content_encoding.as_deref() {
        Some("gzip") | Some("x-gzip") => Box::new(GzDecoder::new(response)),
        Some("deflate") => Box::new(ZlibDecoder::new(response)),
        Some("zstd") => Box::new(zstd::stream::read::Decoder::new(response)?),
        _ => Box::new(response),
    };
    Ok(transport_response.with_body(body))
}

/// `charset` parameter of a `Content-Type` header value
fn charset_of(content_type: &str) -> Option<String> {
    static CHARSET: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = CHARSET
        .get_or_init(|| Regex::new(r#"(?i)charset\s*=\s*"?([^";\s]+)"#).ok())
        .as_ref()?;
    pattern
        .captures(content_type)
        .map(|captures| captures[1].to_string())
}
