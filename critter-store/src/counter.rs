//! The counter protocol: addressed reads and read-increment-write cycles.

use crate::tabular::{TabularStore, ValueInputMode};
use critter_core::StoreError;
use std::sync::Arc;

/// Validated, addressed access to counters in a remote tabular store.
pub struct CounterStore {
    store: Arc<dyn TabularStore>,
}

impl CounterStore {
    pub fn new(store: Arc<dyn TabularStore>) -> Self {
        Self { store }
    }

    /// Read the raw rows for `range` on `subsheet`. Empty ranges yield an
    /// empty vector.
    pub async fn read_row(
        &self,
        subsheet: &str,
        range: &str,
    ) -> Result<Vec<Vec<String>>, StoreError> {
        let rows = self.store.read(subsheet, range).await?;
        tracing::debug!(subsheet, range, rows = rows.len(), "rows retrieved");
        Ok(rows)
    }

    /// Write a grid of values at `range` on `subsheet`, returning the cell
    /// count reported by the store. The count is informational only.
    pub async fn write_row(
        &self,
        subsheet: &str,
        range: &str,
        values: &[Vec<String>],
        mode: ValueInputMode,
    ) -> Result<u32, StoreError> {
        let updated = self.store.update(subsheet, range, values, mode).await?;
        tracing::debug!(subsheet, range, updated, "cells updated");
        Ok(updated)
    }

    /// Increment the counter at `address` on `subsheet` by one and return
    /// the new value.
    ///
    /// The cell must already hold an integer: an empty cell is
    /// `StoreError::EmptyCell` and a non-integer one is
    /// `StoreError::InvalidCounter`; neither issues a write.
    ///
    /// The read and the write are two independent remote calls with no
    /// transaction around them. Two near-simultaneous increments of the
    /// same address can interleave, and the later writer's read may be
    /// stale, losing one update. Contention here is people pressing
    /// buttons seconds apart, so this is accepted rather than locked.
    pub async fn increment(&self, subsheet: &str, address: &str) -> Result<i64, StoreError> {
        let location = || format!("{}!{}", subsheet, address);

        let rows = self.read_row(subsheet, address).await?;
        let cell = rows
            .first()
            .and_then(|row| row.first())
            .ok_or_else(|| StoreError::EmptyCell {
                location: location(),
            })?;
        let current: i64 = cell
            .trim()
            .parse()
            .map_err(|_| StoreError::InvalidCounter {
                location: location(),
                value: cell.clone(),
            })?;

        let next = current + 1;
        self.write_row(
            subsheet,
            address,
            &[vec![next.to_string()]],
            ValueInputMode::UserEntered,
        )
        .await?;
        tracing::info!(subsheet, address, next, "counter incremented");
        Ok(next)
    }
}

impl std::fmt::Debug for CounterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CounterStore").finish()
    }
}
