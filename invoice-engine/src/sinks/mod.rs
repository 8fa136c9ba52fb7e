//! Write side of the engine: where invoice snapshots are kept.

pub mod memory;
pub mod postgres;

pub use memory::MemorySnapshotStore;
pub use postgres::PgSnapshotStore;

use std::sync::Arc;

use billing_client::domain::{InvoiceKey, InvoiceSnapshot};

use crate::error::Result;

#[async_trait::async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn get(&self, key: &InvoiceKey) -> Result<Option<InvoiceSnapshot>>;

    /// Conditional upsert keyed by the snapshot's [`InvoiceKey`].
    ///
    /// A stored row is replaced only when its `content_hash` differs, and a
    /// settled row only when `overwrite_settled` is set. Returns the number of
    /// rows written; 0 means the stored row was kept.
    async fn upsert(&self, snapshot: &InvoiceSnapshot, overwrite_settled: bool) -> Result<u64>;
}

#[async_trait::async_trait]
impl<T> SnapshotStore for Arc<T>
where
    T: SnapshotStore + ?Sized,
{
    async fn get(&self, key: &InvoiceKey) -> Result<Option<InvoiceSnapshot>> {
        (**self).get(key).await
    }

    async fn upsert(&self, snapshot: &InvoiceSnapshot, overwrite_settled: bool) -> Result<u64> {
        (**self).upsert(snapshot, overwrite_settled).await
    }
}
