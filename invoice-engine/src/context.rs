//! Per-call context threaded into the engine entry points: who is calling,
//! and when the call should give up.

use std::future::Future;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{BillingError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Admin,
    /// Automated billing runs.
    Service,
    /// An end user who may only read their own account's snapshots.
    Subscriber { account_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub actor: String,
    pub role: Role,
}

impl AuthContext {
    pub fn admin(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            role: Role::Admin,
        }
    }

    pub fn service(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            role: Role::Service,
        }
    }

    pub fn subscriber(actor: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            role: Role::Subscriber {
                account_id: account_id.into(),
            },
        }
    }

    pub fn require_compute(&self) -> Result<()> {
        match self.role {
            Role::Admin | Role::Service => Ok(()),
            Role::Subscriber { .. } => Err(self.denied("compute invoices")),
        }
    }

    pub fn require_overwrite_settled(&self) -> Result<()> {
        match self.role {
            Role::Admin => Ok(()),
            _ => Err(self.denied("overwrite a settled snapshot")),
        }
    }

    pub fn require_read(&self, account_id: &str) -> Result<()> {
        match &self.role {
            Role::Admin | Role::Service => Ok(()),
            Role::Subscriber { account_id: own } if own == account_id => Ok(()),
            Role::Subscriber { .. } => Err(self.denied("read another account's snapshots")),
        }
    }

    fn denied(&self, action: &str) -> BillingError {
        BillingError::Unauthorized(format!("{} may not {action}", self.actor))
    }
}

/// Cancellation and deadline of one run.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Fail if the run was cancelled or ran past its deadline.
    pub fn check(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(BillingError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(BillingError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Drive `fut` unless the run is cancelled or its deadline passes first.
    pub async fn guard<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check()?;

        let deadline = async {
            match self.deadline {
                Some(d) => tokio::time::sleep_until(d).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(BillingError::Cancelled),
            _ = deadline => Err(BillingError::DeadlineExceeded),
            res = fut => res,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn subscribers_only_read_their_own_account() {
        let auth = AuthContext::subscriber("ayse", "acc-1");
        assert!(auth.require_read("acc-1").is_ok());
        assert!(matches!(auth.require_read("acc-2"), Err(BillingError::Unauthorized(_))));
        assert!(matches!(auth.require_compute(), Err(BillingError::Unauthorized(_))));
    }

    #[test]
    fn only_admins_overwrite_settled_snapshots() {
        assert!(AuthContext::admin("ops").require_overwrite_settled().is_ok());
        assert!(AuthContext::service("cron").require_overwrite_settled().is_err());
        assert!(AuthContext::service("cron").require_compute().is_ok());
    }

    #[tokio::test]
    async fn cancelled_context_stops_pending_work() {
        let token = CancellationToken::new();
        let ctx = RunContext::new().with_cancellation(token.clone());
        token.cancel();

        let res = ctx.guard(async { Ok(1) }).await;
        assert!(matches!(res, Err(BillingError::Cancelled)));
    }

    #[tokio::test]
    async fn deadline_interrupts_slow_work() {
        let ctx = RunContext::new().with_deadline(Instant::now() + Duration::from_millis(10));

        let res: Result<()> = ctx
            .guard(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert!(matches!(res, Err(BillingError::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn unrestricted_context_passes_results_through() {
        let ctx = RunContext::new();
        assert_eq!(ctx.guard(async { Ok(7) }).await.unwrap(), 7);
    }
}
