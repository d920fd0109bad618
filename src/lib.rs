//! # hacline - Command Client for the Administration Console
//!
//! Sends operator commands to a remote SAP Commerce administration console
//! (hAC) over HTTP and turns its answers into one uniform [`HacResult`].
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  params   ┌─────────────┐  HTTP POST  ┌──────────┐
//! │  HacClient   │──────────▶│  Transport  │────────────▶│ Console  │
//! │              │◀──────────│             │◀────────────│          │
//! │ - commands   │  response └─────────────┘  HTML/JSON  └──────────┘
//! │ - results    │
//! └──────┬───────┘
//!        │ body
//!        ▼
//! ┌──────────────┐  rows    ┌──────────────┐
//! │    parser    │─────────▶│ TableBuilder │
//! └──────────────┘          └──────────────┘
//! ```
//!
//! Connection settings come from INI profiles ([`profile`]), the same way
//! for the library and the `hacline` binary.

pub mod app;
pub mod client;
pub mod cmd_args;
pub mod config;
pub mod parser;
pub mod profile;
pub mod result;
pub mod search;
pub mod table;
pub mod transport;

// Re-export main types for easy access
pub use client::HacClient;
pub use profile::{get_blank_profile, ConnectionProfile, IniProfile, IniProfileStore};
pub use result::{HacResult, HacResultBuilder};
pub use search::{SearchBackend, SearchQuery};
pub use table::TableBuilder;
pub use transport::{HttpTransport, Transport, TransportError, TransportResponse};
