use billing_client::db::snapshot_queries;
use billing_client::domain::{InvoiceKey, InvoiceSnapshot};
use sqlx::PgPool;

use super::SnapshotStore;
use crate::error::{BillingError, Result};

/// SQLSTATEs that mean another writer got to the key first.
const CONFLICT_STATES: [&str; 2] = ["23505", "40001"];

#[derive(Clone)]
pub struct PgSnapshotStore {
    pool: PgPool,
}

impl PgSnapshotStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn persistence_error(key: &InvoiceKey, e: anyhow::Error) -> BillingError {
    let sqlstate = e
        .downcast_ref::<sqlx::Error>()
        .and_then(|err| match err {
            sqlx::Error::Database(db) => db.code().map(|c| c.into_owned()),
            _ => None,
        });

    match sqlstate {
        Some(code) if CONFLICT_STATES.contains(&code.as_str()) => {
            metrics::counter!("snapshot_write_conflicts_total").increment(1);
            BillingError::PersistenceConflict(format!("{key}: sqlstate {code}: {e:#}"))
        }
        _ => {
            tracing::error!(%key, error = %e, "snapshot store failure");
            BillingError::Persistence(format!("{key}: {e:#}"))
        }
    }
}

#[async_trait::async_trait]
impl SnapshotStore for PgSnapshotStore {
    async fn get(&self, key: &InvoiceKey) -> Result<Option<InvoiceSnapshot>> {
        snapshot_queries::get_snapshot(&self.pool, key)
            .await
            .map_err(|e| persistence_error(key, e))
    }

    async fn upsert(&self, snapshot: &InvoiceSnapshot, overwrite_settled: bool) -> Result<u64> {
        snapshot_queries::upsert_snapshot(&self.pool, snapshot, overwrite_settled)
            .await
            .map_err(|e| persistence_error(&snapshot.key(), e))
    }
}

#[cfg(test)]
mod tests {
    use billing_client::domain::InvoiceVariant;

    use super::*;

    #[test]
    fn non_database_errors_are_plain_persistence_failures() {
        let key = InvoiceKey::new("acc-1", "fac-1", 2024, 1, InvoiceVariant::Billed).unwrap();
        let err = persistence_error(&key, anyhow::Error::new(sqlx::Error::PoolTimedOut));
        assert!(matches!(err, BillingError::Persistence(_)));
        assert!(!err.is_retryable());
    }
}
