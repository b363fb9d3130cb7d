use std::{future::Future, time::Duration};

use tokio_util::sync::CancellationToken;

use rewardcalc_chain::ChainError;

use crate::error::RewardError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupted {
    Cancelled,
    TimedOut(Duration),
}

impl Interrupted {
    pub fn describe(self) -> String {
        match self {
            Self::Cancelled => "cancelled".to_string(),
            Self::TimedOut(d) => format!("timed out after {}ms", d.as_millis()),
        }
    }
}

/// Runs external queries under a timeout and the caller's cancellation token.
#[derive(Debug, Clone, Copy)]
pub struct QueryGuard {
    timeout: Duration,
}

impl QueryGuard {
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub async fn run<F: Future>(
        &self,
        cancel: &CancellationToken,
        query: F,
    ) -> Result<F::Output, Interrupted> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(Interrupted::Cancelled),
            res = tokio::time::timeout(self.timeout, query) => {
                res.map_err(|_| Interrupted::TimedOut(self.timeout))
            }
        }
    }

    /// Chain reads: a timeout becomes `DataUnavailable` naming `what`.
    pub async fn chain<T, F>(
        &self,
        cancel: &CancellationToken,
        what: impl FnOnce() -> String,
        query: F,
    ) -> Result<T, RewardError>
    where
        F: Future<Output = Result<T, ChainError>>,
    {
        match self.run(cancel, query).await {
            Ok(res) => res.map_err(RewardError::from),
            Err(Interrupted::Cancelled) => Err(RewardError::Cancelled),
            Err(timed_out @ Interrupted::TimedOut(_)) => {
                Err(RewardError::unavailable(what(), timed_out.describe()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_timeout_is_data_unavailable() {
        let guard = QueryGuard::new(Duration::from_millis(10));
        let cancel = CancellationToken::new();

        let res: Result<(), _> = guard
            .chain(&cancel, || "slow read".to_string(), async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        assert_eq!(
            res,
            Err(RewardError::unavailable("slow read", "timed out after 10ms"))
        );
    }

    #[tokio::test]
    async fn test_cancelled_token_wins() {
        let guard = QueryGuard::new(Duration::from_secs(5));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let res = guard.run(&cancel, async { 1 }).await;
        assert_eq!(res, Err(Interrupted::Cancelled));
    }

    #[tokio::test]
    async fn test_chain_errors_pass_through() {
        let guard = QueryGuard::new(Duration::from_secs(5));
        let cancel = CancellationToken::new();

        let res: Result<u64, _> = guard
            .chain(&cancel, String::new, async {
                Err(ChainError::Transport("connection reset".to_string()))
            })
            .await;
        assert!(res.unwrap_err().is_retryable());
    }
}
