use billing_client::domain::{InvalidKey, InvoiceKey};

pub type Result<T> = std::result::Result<T, BillingError>;

#[derive(thiserror::Error, Debug)]
pub enum BillingError {
    /// An upstream read failed. Safe to retry with backoff.
    #[error("data unavailable: {0}")]
    DataUnavailable(String),
    /// A record or an intermediate value is malformed, out of range or not
    /// finite. Needs an operator, not a retry.
    #[error("invalid reading: {0}")]
    InvalidReading(String),
    #[error("no applicable tariff: {0}")]
    NoApplicableTariff(String),
    #[error("no applicable YEKDEM record: {0}")]
    NoApplicableYekdemRecord(String),
    #[error("unknown facility {account_id}/{facility_id}")]
    UnknownFacility {
        account_id: String,
        facility_id: String,
    },
    /// The snapshot write lost a race for its key.
    #[error("persistence conflict: {0}")]
    PersistenceConflict(String),
    #[error("persistence failed: {0}")]
    Persistence(String),
    #[error("snapshot {0} is settled and the recomputation differs; an explicit overwrite is required")]
    SettledSnapshotLocked(InvoiceKey),
    #[error("snapshot {0} not found")]
    NotFound(InvoiceKey),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("run cancelled")]
    Cancelled,
    #[error("run deadline exceeded")]
    DeadlineExceeded,
    #[error(transparent)]
    InvalidKey(#[from] InvalidKey),
}

impl BillingError {
    /// Whether the caller may retry the whole run.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::DataUnavailable(_) | Self::PersistenceConflict(_))
    }

    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DataUnavailable(_) => "data_unavailable",
            Self::InvalidReading(_) => "invalid_reading",
            Self::NoApplicableTariff(_) => "no_applicable_tariff",
            Self::NoApplicableYekdemRecord(_) => "no_applicable_yekdem_record",
            Self::UnknownFacility { .. } => "unknown_facility",
            Self::PersistenceConflict(_) => "persistence_conflict",
            Self::Persistence(_) => "persistence",
            Self::SettledSnapshotLocked(_) => "settled_snapshot_locked",
            Self::NotFound(_) => "not_found",
            Self::Unauthorized(_) => "unauthorized",
            Self::Cancelled => "cancelled",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::InvalidKey(_) => "invalid_key",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_errors_are_retryable() {
        assert!(BillingError::DataUnavailable("timeout".into()).is_retryable());
        assert!(BillingError::PersistenceConflict("race".into()).is_retryable());
        assert!(!BillingError::InvalidReading("nan".into()).is_retryable());
        assert!(!BillingError::NoApplicableTariff("none".into()).is_retryable());
        assert!(!BillingError::Cancelled.is_retryable());
    }

    #[test]
    fn invalid_key_converts() {
        let err: BillingError = InvalidKey::Month(0).into();
        assert_eq!(err.kind(), "invalid_key");
        assert_eq!(err.to_string(), "period month 0 is outside 1..=12");
    }
}
