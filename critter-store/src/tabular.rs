//! The tabular-store abstraction and its in-memory test double.

use async_trait::async_trait;
use critter_core::StoreError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// How the backing store parses written cell values.
///
/// Counter writes always use `UserEntered` so that `"3"` lands as the
/// number 3 rather than a literal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueInputMode {
    /// Store the value exactly as sent.
    Raw,
    /// Parse the value as if typed into the sheet.
    UserEntered,
}

impl ValueInputMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueInputMode::Raw => "RAW",
            ValueInputMode::UserEntered => "USER_ENTERED",
        }
    }
}

/// A remote table addressed by `(subsheet, range)`.
///
/// Implementations must be thread-safe (Send + Sync). Errors are reported
/// as `StoreError::Unavailable`; callers decide whether to retry.
#[async_trait]
pub trait TabularStore: Send + Sync {
    /// Read the rows currently held in `range` on `subsheet`. An empty
    /// range yields an empty vector, not an error.
    async fn read(&self, subsheet: &str, range: &str) -> Result<Vec<Vec<String>>, StoreError>;

    /// Write a grid of values at `range` on `subsheet`, returning the
    /// number of cells the store reports as updated.
    async fn update(
        &self,
        subsheet: &str,
        range: &str,
        values: &[Vec<String>],
        mode: ValueInputMode,
    ) -> Result<u32, StoreError>;
}

/// In-memory `TabularStore` for tests.
///
/// Cells are keyed by `(subsheet, cell address)`; ranges wider than a
/// single cell are not modelled. Reads and writes can be made to fail for
/// fault-injection tests, and call counts are recorded so tests can assert
/// the store was never reached.
#[derive(Debug, Default)]
pub struct InMemoryTable {
    cells: Mutex<HashMap<(String, String), String>>,
    read_failure: Mutex<Option<StoreError>>,
    write_failure: Mutex<Option<StoreError>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl InMemoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a single cell.
    pub fn seed(&self, subsheet: &str, address: &str, value: impl Into<String>) {
        self.cells
            .lock()
            .expect("cell map lock")
            .insert((subsheet.to_string(), address.to_string()), value.into());
    }

    /// Current value of a cell, if any.
    pub fn value_at(&self, subsheet: &str, address: &str) -> Option<String> {
        self.cells
            .lock()
            .expect("cell map lock")
            .get(&(subsheet.to_string(), address.to_string()))
            .cloned()
    }

    /// Make every subsequent read fail with `error`.
    pub fn fail_reads(&self, error: StoreError) {
        *self.read_failure.lock().expect("failure lock") = Some(error);
    }

    /// Make every subsequent write fail with `error`.
    pub fn fail_writes(&self, error: StoreError) {
        *self.write_failure.lock().expect("failure lock") = Some(error);
    }

    pub fn read_calls(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    pub fn write_calls(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl TabularStore for InMemoryTable {
    async fn read(&self, subsheet: &str, range: &str) -> Result<Vec<Vec<String>>, StoreError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        if let Some(err) = self.read_failure.lock().expect("failure lock").clone() {
            return Err(err);
        }
        Ok(self
            .value_at(subsheet, range)
            .map(|value| vec![vec![value]])
            .unwrap_or_default())
    }

    async fn update(
        &self,
        subsheet: &str,
        range: &str,
        values: &[Vec<String>],
        _mode: ValueInputMode,
    ) -> Result<u32, StoreError> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        if let Some(err) = self.write_failure.lock().expect("failure lock").clone() {
            return Err(err);
        }
        let mut written = 0;
        if let Some(value) = values.first().and_then(|row| row.first()) {
            self.seed(subsheet, range, value.clone());
            written = 1;
        }
        Ok(written)
    }
}
