use hacline::profile::ConnectionProfile;
use hacline::transport::{FormParams, Transport, TransportError, TransportResponse};
use std::collections::VecDeque;
use std::io::{self, Read};
use std::sync::Mutex;
use std::time::Duration;

/// What the canned transport answers with
pub enum Canned {
    Response {
        status: u16,
        reason: &'static str,
        body: Option<String>,
    },
    /// 200 OK whose body stream fails while being read
    BrokenBody,
    /// No response at all
    Failure(&'static str),
}

impl Canned {
    pub fn ok(body: impl Into<String>) -> Self {
        Canned::Response {
            status: 200,
            reason: "OK",
            body: Some(body.into()),
        }
    }

    pub fn status(status: u16, reason: &'static str) -> Self {
        Canned::Response {
            status,
            reason,
            body: Some(String::new()),
        }
    }
}

/// A request the client made
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub url: String,
    pub params: Vec<(String, String)>,
    pub require_success: bool,
    pub timeout: Duration,
}

impl RecordedCall {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

struct FailingReader;

impl Read for FailingReader {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset"))
    }
}

/// In-memory transport that replays canned responses in order
#[derive(Default)]
pub struct CannedTransport {
    responses: Mutex<VecDeque<Canned>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl CannedTransport {
    pub fn new(responses: impl IntoIterator<Item = Canned>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_call(&self) -> RecordedCall {
        self.calls().pop().expect("no request was made")
    }
}

impl Transport for CannedTransport {
    fn post(
        &self,
        url: &str,
        params: &FormParams,
        require_success: bool,
        timeout: Duration,
        _profile: &dyn ConnectionProfile,
    ) -> Result<TransportResponse, TransportError> {
        self.calls.lock().unwrap().push(RecordedCall {
            url: url.to_string(),
            params: params.to_vec(),
            require_success,
            timeout,
        });

        match self.responses.lock().unwrap().pop_front() {
            Some(Canned::Response {
                status,
                reason,
                body,
            }) => {
                let response = TransportResponse::new(status, reason);
                Ok(match body {
                    Some(body) => response.with_bytes(body.into_bytes()),
                    None => response,
                })
            }
            Some(Canned::BrokenBody) => {
                Ok(TransportResponse::new(200, "OK").with_body(FailingReader))
            }
            Some(Canned::Failure(message)) => Err(TransportError::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                message,
            ))),
            None => panic!("unexpected request to {url}"),
        }
    }
}
