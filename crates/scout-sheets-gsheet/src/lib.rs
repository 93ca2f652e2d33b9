//! # scout-sheets-gsheet
//!
//! Google Sheets adapter for scout-sheets, speaking the v4 values API
//! over a blocking HTTP client.
//!
//! Reads go through the [`scout_sheets_core::Workbook`] adapter interface;
//! every sheet lookup runs a fresh request, so there is no caching across
//! accesses. Writes are supported directly on [`GoogleSheetReader`] and
//! are rate limited: the standard quota is roughly 60 write requests per
//! minute per credential, so the client sleeps a minimum delay after each
//! write. Prefer bulk rectangular writes over per-cell writes.
//!
//! Credentials are opaque: anything that can produce a bearer token via
//! [`CredentialProvider`] works. No authentication protocol is
//! implemented here.

mod client;
mod credential;
mod error;
mod sheet;

pub use client::GoogleSheetReader;
pub use credential::{CredentialProvider, StaticToken};
pub use error::{GSheetError, GSheetResult};
pub use sheet::{RemoteSheet, ValueRange};
