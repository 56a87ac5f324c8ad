//! Authenticated session with the EcoTaxa web interface.
//!
//! The service only offers a browser workflow, so the session keeps the login
//! cookies and exposes three request primitives (`get`, `get_html`,
//! `post_form`) that the catalog and export components build on.

mod client;
mod error;

pub use client::{EcotaxaSession, SessionConfig};
pub use error::SessionError;

/// Public EcoTaxa instance.
pub const DEFAULT_BASE_URL: &str = "https://ecotaxa.obs-vlfr.fr";

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes for large artifacts).
pub const READ_TIMEOUT_SECS: u64 = 300;
