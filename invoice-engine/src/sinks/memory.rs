use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use billing_client::domain::{InvoiceKey, InvoiceSnapshot, SnapshotStatus};
use tokio::sync::Mutex;

use super::SnapshotStore;
use crate::error::{BillingError, Result};

/// Snapshot store held in memory, with the same write rules as the
/// `invoice_snapshot` upsert.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    rows: Mutex<HashMap<InvoiceKey, InvoiceSnapshot>>,
    pending_conflicts: AtomicUsize,
    writes: AtomicUsize,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` upserts with a write conflict.
    pub fn inject_conflicts(&self, n: usize) {
        self.pending_conflicts.store(n, Ordering::SeqCst);
    }

    /// Rows actually written, not counting kept rows.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.lock().await.is_empty()
    }

    fn take_conflict(&self) -> bool {
        self.pending_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait::async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn get(&self, key: &InvoiceKey) -> Result<Option<InvoiceSnapshot>> {
        Ok(self.rows.lock().await.get(key).cloned())
    }

    async fn upsert(&self, snapshot: &InvoiceSnapshot, overwrite_settled: bool) -> Result<u64> {
        let key = snapshot.key();
        if self.take_conflict() {
            return Err(BillingError::PersistenceConflict(format!(
                "{key}: concurrent writer"
            )));
        }

        let mut rows = self.rows.lock().await;
        if let Some(stored) = rows.get(&key) {
            let unchanged = stored.content_hash == snapshot.content_hash;
            let locked = stored.status == SnapshotStatus::Settled && !overwrite_settled;
            if unchanged || locked {
                return Ok(0);
            }
        }

        rows.insert(key, snapshot.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(1)
    }
}

#[cfg(test)]
mod tests {
    use billing_client::domain::InvoiceVariant;
    use rust_decimal_macros::dec;
    use time::macros::datetime;

    use super::*;

    fn snapshot(status: SnapshotStatus, total: rust_decimal::Decimal, hash: &str) -> InvoiceSnapshot {
        InvoiceSnapshot {
            account_id: "acc-1".into(),
            facility_id: "fac-1".into(),
            period_year: 2024,
            period_month: 1,
            invoice_variant: InvoiceVariant::Billed,
            status,
            demand_final: status == SnapshotStatus::Settled,
            total_consumption_kwh: dec!(100),
            unit_price_energy: dec!(2),
            unit_price_distribution: dec!(1),
            btv_rate: dec!(0.05),
            vat_rate: dec!(0.20),
            energy_charge: dec!(200),
            distribution_charge: dec!(100),
            btv_charge: dec!(10),
            demand_base_charge: dec!(0),
            demand_excess_charge: dec!(0),
            reactive_penalty_charge: dec!(0),
            subtotal_before_vat: dec!(310),
            vat_charge: dec!(62),
            total_invoice: total,
            subsidy_offset: dec!(0),
            total_payable: total,
            unused_subsidy_credit: dec!(0),
            content_hash: hash.into(),
            updated_at: datetime!(2024-02-01 00:00 UTC),
        }
    }

    #[tokio::test]
    async fn identical_content_is_not_rewritten() {
        let store = MemorySnapshotStore::new();
        let s = snapshot(SnapshotStatus::Provisional, dec!(372), "h1");
        assert_eq!(store.upsert(&s, false).await.unwrap(), 1);
        assert_eq!(store.upsert(&s, false).await.unwrap(), 0);
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn settled_rows_need_an_explicit_overwrite() {
        let store = MemorySnapshotStore::new();
        store
            .upsert(&snapshot(SnapshotStatus::Settled, dec!(372), "h1"), false)
            .await
            .unwrap();

        let changed = snapshot(SnapshotStatus::Settled, dec!(400), "h2");
        assert_eq!(store.upsert(&changed, false).await.unwrap(), 0);
        assert_eq!(store.upsert(&changed, true).await.unwrap(), 1);

        let stored = store.get(&changed.key()).await.unwrap().unwrap();
        assert_eq!(stored.total_invoice, dec!(400));
    }

    #[tokio::test]
    async fn injected_conflicts_are_consumed_one_per_write() {
        let store = MemorySnapshotStore::new();
        store.inject_conflicts(1);
        let s = snapshot(SnapshotStatus::Provisional, dec!(372), "h1");

        assert!(matches!(
            store.upsert(&s, false).await,
            Err(BillingError::PersistenceConflict(_))
        ));
        assert_eq!(store.upsert(&s, false).await.unwrap(), 1);
        assert_eq!(store.len().await, 1);
    }
}
