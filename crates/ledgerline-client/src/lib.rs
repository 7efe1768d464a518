//! Client-side actions against the ledger REST API.
//!
//! Every mutation follows the same path: validate locally, submit once,
//! invalidate the affected cached queries only on success. Nothing is retried;
//! failures come back as [`ActionError`] whose
//! [`user_message`](ActionError::user_message) is what the user sees.

pub mod actions;
pub mod backend;
pub mod endpoints;
pub mod error;
pub mod export;
pub mod http;

#[cfg(test)]
mod fake;

pub use actions::LedgerClient;
pub use backend::{ApiRequest, LedgerBackend, Method};
pub use error::{ActionError, GENERIC_FAILURE_MESSAGE};
pub use export::{credit_notes_csv, ledger_csv, payroll_csv};
pub use http::HttpBackend;
