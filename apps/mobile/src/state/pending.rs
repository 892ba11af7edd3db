//! # Pending Ventes
//!
//! Ventes rung up while the backend was unreachable, waiting for
//! `flush_pending`. Kept in memory: closing the app loses them, so the
//! shell warns before quitting with a non-empty queue.
//!
//! Also owns the per-device receipt counter.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use caisse_core::Vente;
use tracing::info;

#[derive(Debug, Default)]
pub struct PendingState {
    ventes: Mutex<Vec<Vente>>,
    sequence: AtomicU32,
}

impl PendingState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next receipt sequence number, starting at 1.
    pub fn next_sequence(&self) -> u32 {
        self.sequence.fetch_add(1, Ordering::SeqCst).wrapping_add(1)
    }

    pub fn push(&self, vente: Vente) {
        info!(vente_id = %vente.id, receipt = %vente.receipt_number, "Vente queued");
        self.lock().push(vente);
    }

    /// Queued ventes, oldest first.
    pub fn snapshot(&self) -> Vec<Vente> {
        self.lock().clone()
    }

    /// Drops a vente once the backend acknowledged it.
    pub fn acknowledge(&self, vente_id: &str) -> bool {
        let mut ventes = self.lock();
        let before = ventes.len();
        ventes.retain(|v| v.id != vente_id);
        ventes.len() != before
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Vente>> {
        self.ventes.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caisse_api::testing::sample_vente;

    #[test]
    fn test_queue_and_acknowledge() {
        let pending = PendingState::new();
        let first = sample_vente("tab-01");
        let second = sample_vente("tab-01");
        pending.push(first.clone());
        pending.push(second.clone());

        assert_eq!(pending.len(), 2);
        assert_eq!(pending.snapshot()[0].id, first.id);

        assert!(pending.acknowledge(&first.id));
        assert!(!pending.acknowledge(&first.id));
        assert_eq!(pending.snapshot()[0].id, second.id);
    }

    #[test]
    fn test_sequence_starts_at_one() {
        let pending = PendingState::new();
        assert_eq!(pending.next_sequence(), 1);
        assert_eq!(pending.next_sequence(), 2);
    }
}
