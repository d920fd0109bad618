//! Common test utilities shared by the integration tests

pub mod canned_transport;

// Re-export commonly used items
#[allow(unused_imports)]
pub use canned_transport::{Canned, CannedTransport, RecordedCall};
