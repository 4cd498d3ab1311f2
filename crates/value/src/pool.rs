//! Byte-accounted allocation arena.
//!
//! Heap values are reference counted; the pool meters what is allocated
//! through it and enforces the configured budget.

use crate::error::ValueError;
use crate::string::Str;
use serde::{Deserialize, Serialize};
use std::cell::Cell;

/// Fixed per-allocation overhead charged on top of the payload.
pub const HEADER_BYTES: usize = 16;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum live bytes; `None` means unbounded.
    pub byte_limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub allocations: usize,
    pub frees: usize,
    pub bytes_in_use: usize,
    pub peak_bytes: usize,
}

#[derive(Debug, Default)]
pub struct Pool {
    config: PoolConfig,
    stats: Cell<PoolStats>,
}

impl Pool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PoolConfig) -> Self {
        Pool {
            config,
            stats: Cell::new(PoolStats::default()),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn stats(&self) -> PoolStats {
        self.stats.get()
    }

    /// Reserves `bytes` of payload, failing once the budget is spent.
    pub fn charge(&self, bytes: usize) -> Result<(), ValueError> {
        let requested = bytes + HEADER_BYTES;
        let mut stats = self.stats.get();
        if let Some(limit) = self.config.byte_limit {
            let available = limit.saturating_sub(stats.bytes_in_use);
            if requested > available {
                log::warn!(
                    "pool budget exhausted: requested {} bytes, {} available",
                    requested,
                    available
                );
                return Err(ValueError::OutOfMemory {
                    requested,
                    available,
                });
            }
        }
        stats.allocations += 1;
        stats.bytes_in_use += requested;
        stats.peak_bytes = stats.peak_bytes.max(stats.bytes_in_use);
        self.stats.set(stats);
        Ok(())
    }

    /// Returns a previous charge to the budget. Never required for
    /// correctness; everything is reclaimed when the pool is dropped.
    pub fn free(&self, bytes: usize) {
        let mut stats = self.stats.get();
        stats.frees += 1;
        stats.bytes_in_use = stats.bytes_in_use.saturating_sub(bytes + HEADER_BYTES);
        self.stats.set(stats);
    }

    pub fn alloc_str(&self, text: &str) -> Result<Str, ValueError> {
        let s = Str::new(text)?;
        self.charge(text.len())?;
        Ok(s)
    }

    /// Releases one logical reference and frees the accounting when the
    /// string's count reaches zero.
    pub fn release_str(&self, s: &Str) {
        if s.release() {
            self.free(s.len());
        }
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        let stats = self.stats.get();
        log::trace!(
            "pool dropped: {} allocations, {} bytes live, peak {}",
            stats.allocations,
            stats.bytes_in_use,
            stats.peak_bytes
        );
    }
}
