use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Atomic counters tracking workflow outcomes.
///
/// All counters use relaxed ordering. For a point-in-time view, call
/// [`snapshot`](Self::snapshot).
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    /// Plain-allowlist stores completed.
    pub stores: AtomicU64,
    /// Plain-allowlist retrieves completed.
    pub retrieves: AtomicU64,
    /// Mint-gated stores completed.
    pub mint_stores: AtomicU64,
    /// Mint-gated retrieves completed.
    pub mint_retrieves: AtomicU64,
    /// Allowlist, collection and mint transactions submitted successfully.
    pub ledger_actions: AtomicU64,
    /// Operations that returned a failure.
    pub failures: AtomicU64,
    /// Collections left without content by a failed mint-gated store.
    pub orphaned_collections: AtomicU64,
    /// Memory records re-inserted after decryption.
    pub memories_restored: AtomicU64,
    /// Decrypted memory entries dropped as malformed.
    pub memories_skipped: AtomicU64,
    /// Download tokens minted.
    pub downloads_staged: AtomicU64,
}

impl PipelineMetrics {
    pub fn increment_stores(&self) {
        self.stores.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_retrieves(&self) {
        self.retrieves.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_mint_stores(&self) {
        self.mint_stores.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_mint_retrieves(&self) {
        self.mint_retrieves.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_ledger_actions(&self) {
        self.ledger_actions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_failures(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_orphaned_collections(&self) {
        self.orphaned_collections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_memories_restored(&self, n: u64) {
        self.memories_restored.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_memories_skipped(&self, n: u64) {
        self.memories_skipped.fetch_add(n, Ordering::Relaxed);
    }

    pub fn increment_downloads_staged(&self) {
        self.downloads_staged.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            stores: self.stores.load(Ordering::Relaxed),
            retrieves: self.retrieves.load(Ordering::Relaxed),
            mint_stores: self.mint_stores.load(Ordering::Relaxed),
            mint_retrieves: self.mint_retrieves.load(Ordering::Relaxed),
            ledger_actions: self.ledger_actions.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            orphaned_collections: self.orphaned_collections.load(Ordering::Relaxed),
            memories_restored: self.memories_restored.load(Ordering::Relaxed),
            memories_skipped: self.memories_skipped.load(Ordering::Relaxed),
            downloads_staged: self.downloads_staged.load(Ordering::Relaxed),
        }
    }
}

/// A plain data snapshot of [`PipelineMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MetricsSnapshot {
    pub stores: u64,
    pub retrieves: u64,
    pub mint_stores: u64,
    pub mint_retrieves: u64,
    pub ledger_actions: u64,
    pub failures: u64,
    pub orphaned_collections: u64,
    pub memories_restored: u64,
    pub memories_skipped: u64,
    pub downloads_staged: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_increments() {
        let m = PipelineMetrics::default();
        m.increment_stores();
        m.increment_stores();
        m.increment_orphaned_collections();
        m.add_memories_restored(4);
        let snap = m.snapshot();
        assert_eq!(snap.stores, 2);
        assert_eq!(snap.orphaned_collections, 1);
        assert_eq!(snap.memories_restored, 4);
        assert_eq!(snap.failures, 0);
    }
}
