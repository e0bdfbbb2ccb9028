//! Google Sheets v4 backend for the tabular-store abstraction.

mod client;
mod types;

pub use client::{RetryPolicy, SheetsStore};
pub use types::{ApiError, UpdateValuesResponse, ValueRange};
