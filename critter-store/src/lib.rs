//! Critter Store - counter protocol over a remote tabular store
//!
//! The `TabularStore` trait abstracts the backing spreadsheet service;
//! `SheetsStore` implements it against the Google Sheets v4 API and
//! `InMemoryTable` implements it for tests. `CounterStore` layers the
//! read-increment-write counter protocol on top of either.

pub mod auth;
pub mod counter;
pub mod sheets;
pub mod tabular;

pub use auth::{AuthorizedUserToken, StaticToken, TokenProvider};
pub use counter::CounterStore;
pub use sheets::{RetryPolicy, SheetsStore};
pub use tabular::{InMemoryTable, TabularStore, ValueInputMode};
