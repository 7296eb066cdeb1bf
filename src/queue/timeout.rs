// src/queue/timeout.rs

//! Timeout supervision for an in-flight command.
//!
//! The timer is armed for one full period; on expiry an optional recheck
//! predicate may defer the timeout by re-arming another full period, as
//! often as it keeps answering `true`. The deliberately coarse re-arm
//! cadence means a command can survive up to one extra full period after
//! its check first answers `false`.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

use crate::types::TimeoutCheck;

/// Outcome of supervising one command future.
#[derive(Debug)]
pub(crate) enum Supervised<T> {
    /// The command settled before any un-deferred timeout expiry.
    Completed(T),
    /// A timeout period expired and the check (if any) said stop.
    TimedOut,
}

/// Await `fut`, enforcing the timeout policy.
///
/// `period == None` disables the timer entirely and just awaits the
/// future. A settled future always wins over a concurrently expiring
/// timer; no timer outlives settlement.
pub(crate) async fn supervise<T>(
    fut: impl Future<Output = T>,
    period: Option<Duration>,
    check: Option<TimeoutCheck>,
) -> Supervised<T> {
    let Some(period) = period else {
        return Supervised::Completed(fut.await);
    };

    tokio::pin!(fut);

    loop {
        tokio::select! {
            result = &mut fut => return Supervised::Completed(result),
            _ = sleep(period) => {
                let keep_waiting = match check.as_deref() {
                    Some(check) => check().await,
                    None => false,
                };
                if !keep_waiting {
                    return Supervised::TimedOut;
                }
                debug!("timeout check deferred expiry; re-arming full period");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn completes_before_expiry() {
        let out = supervise(async { 42 }, Some(Duration::from_secs(5)), None).await;
        assert!(matches!(out, Supervised::Completed(42)));
    }

    #[tokio::test]
    async fn times_out_without_check() {
        let out = supervise(
            std::future::pending::<()>(),
            Some(Duration::from_millis(20)),
            None,
        )
        .await;
        assert!(matches!(out, Supervised::TimedOut));
    }

    #[tokio::test]
    async fn disabled_timer_waits_indefinitely() {
        let slow = async {
            sleep(Duration::from_millis(80)).await;
            "done"
        };
        let out = supervise(slow, None, None).await;
        assert!(matches!(out, Supervised::Completed("done")));
    }

    #[tokio::test]
    async fn truthy_check_defers_past_several_periods() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_in_check = Arc::clone(&calls);
        let check: TimeoutCheck = Arc::new(move || {
            let calls = Arc::clone(&calls_in_check);
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                true
            })
        });

        let slow = async {
            sleep(Duration::from_millis(120)).await;
            "survived"
        };
        let out = supervise(slow, Some(Duration::from_millis(25)), Some(check)).await;

        assert!(matches!(out, Supervised::Completed("survived")));
        // The command outlived the base period several times over; the
        // check was consulted once per expiry.
        assert!(calls.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn falsy_check_fails_at_first_expiry() {
        let check: TimeoutCheck = Arc::new(|| Box::pin(async { false }));
        let out = supervise(
            std::future::pending::<()>(),
            Some(Duration::from_millis(20)),
            Some(check),
        )
        .await;
        assert!(matches!(out, Supervised::TimedOut));
    }
}
