//! # Search Delegation
//!
//! Search queries are not run through the console; they are handed to a
//! separate search backend when one is configured.

use crate::result::HacResult;

/// A query against one search core
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub core: String,
    pub query: String,
    pub rows: u32,
}

impl SearchQuery {
    pub fn new(core: impl Into<String>, query: impl Into<String>, rows: u32) -> Self {
        Self {
            core: core.into(),
            query: query.into(),
            rows,
        }
    }
}

/// Executes search queries on behalf of the command client.
///
/// Backends are shared by every thread that uses the client.
pub trait SearchBackend: Send + Sync {
    fn execute_query(&self, query: &SearchQuery) -> HacResult;
}
