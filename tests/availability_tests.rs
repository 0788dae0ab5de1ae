// Availability poller behaviour under paused tokio time

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use verify_release::availability::{AvailabilityCheck, AvailabilityPoller};
use verify_release::error::{AvailabilityError, Result, VerifyError};

/// Check that reports "not yet" `failures` times, then available
fn available_after(failures: u32, calls: &AtomicU32) -> impl Fn() -> Result<bool> + Send + Sync + '_ {
    move || {
        let call = calls.fetch_add(1, Ordering::SeqCst);
        Ok(call >= failures)
    }
}

/// Check that answers "not yet" `misses` times and then never returns
struct HangsAfter {
    misses: u32,
    calls: AtomicU32,
}

impl HangsAfter {
    fn new(misses: u32) -> Self {
        Self {
            misses,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl AvailabilityCheck for HangsAfter {
    async fn check(&self) -> Result<bool> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.misses {
            return Ok(false);
        }
        std::future::pending().await
    }
}

#[tokio::test(start_paused = true)]
async fn test_available_after_n_failures_takes_n_plus_one_checks() {
    for failures in [0u32, 1, 3, 7] {
        let calls = AtomicU32::new(0);
        let check = available_after(failures, &calls);
        let poller = AvailabilityPoller::new(Duration::from_secs(60))
            .with_interval(Duration::from_secs(5));

        let outcome = poller
            .wait_until_available("@pulumi/random", "4.16.2", &check)
            .await
            .unwrap();

        assert_eq!(outcome.attempts, failures + 1);
        assert_eq!(calls.load(Ordering::SeqCst), failures + 1);
        assert_eq!(outcome.elapsed, Duration::from_secs(5) * failures);
    }
}

#[tokio::test(start_paused = true)]
async fn test_timeout_overshoots_by_at_most_one_interval() {
    let calls = AtomicU32::new(0);
    let never = || -> Result<bool> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(false)
    };
    let poller =
        AvailabilityPoller::new(Duration::from_secs(12)).with_interval(Duration::from_secs(5));

    let start = tokio::time::Instant::now();
    let err = poller
        .wait_until_available("pulumi-random", "4.16.2", &never)
        .await
        .unwrap_err();
    let elapsed = start.elapsed();

    // Checks at 0s, 5s, 10s and 15s; the budget is exhausted after the fourth.
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert!(elapsed >= poller.timeout());
    assert!(elapsed <= poller.timeout() + poller.interval());
    match err {
        VerifyError::Availability(inner) => match *inner {
            AvailabilityError::Timeout {
                ref package,
                attempts,
                timeout,
                ..
            } => {
                assert_eq!(package, "pulumi-random");
                assert_eq!(attempts, 4);
                assert_eq!(timeout, Duration::from_secs(12));
            }
            other => panic!("unexpected availability error: {other}"),
        },
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_timeout_on_exact_interval_boundary() {
    let calls = AtomicU32::new(0);
    let never = || -> Result<bool> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(false)
    };
    let poller =
        AvailabilityPoller::new(Duration::from_secs(30)).with_interval(Duration::from_secs(5));

    let err = poller
        .wait_until_available("Pulumi.Random", "4.16.2", &never)
        .await
        .unwrap_err();

    // 0s, 5s, ... 30s
    assert_eq!(calls.load(Ordering::SeqCst), 7);
    assert_eq!(err.exit_code(), verify_release::exit_codes::TIMEOUT_ERROR);
}

#[tokio::test(start_paused = true)]
async fn test_late_success_within_overshoot_is_available() {
    let calls = AtomicU32::new(0);
    // The miss at t = 5s is still inside the 9s budget, so the t = 10s check runs.
    let check = available_after(2, &calls);
    let poller =
        AvailabilityPoller::new(Duration::from_secs(9)).with_interval(Duration::from_secs(5));

    let outcome = poller
        .wait_until_available("@pulumi/random", "4.16.2", &check)
        .await
        .unwrap();
    assert_eq!(outcome.attempts, 3);
    assert_eq!(outcome.elapsed, Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn test_hanging_check_is_bounded_by_the_budget() {
    let check = HangsAfter::new(0);
    let poller =
        AvailabilityPoller::new(Duration::from_secs(60)).with_interval(Duration::from_secs(5));

    let start = tokio::time::Instant::now();
    let err = tokio::time::timeout(
        Duration::from_secs(3600),
        poller.wait_until_available("Pulumi.Random", "4.16.2", &check),
    )
    .await
    .expect("poller outlived its budget")
    .unwrap_err();

    assert_eq!(start.elapsed(), Duration::from_secs(65));
    assert_eq!(err.exit_code(), verify_release::exit_codes::TIMEOUT_ERROR);
    assert_eq!(check.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_check_hanging_late_gets_only_the_remaining_budget() {
    let check = HangsAfter::new(2);
    let poller =
        AvailabilityPoller::new(Duration::from_secs(12)).with_interval(Duration::from_secs(5));

    let start = tokio::time::Instant::now();
    let err = poller
        .wait_until_available("pulumi-random", "4.16.2", &check)
        .await
        .unwrap_err();

    // Misses at 0s and 5s; the check started at 10s is abandoned at 12s + 5s.
    assert_eq!(start.elapsed(), Duration::from_secs(17));
    assert!(start.elapsed() <= poller.timeout() + poller.interval());
    match err {
        VerifyError::Availability(inner) => {
            assert!(matches!(*inner, AvailabilityError::Timeout { attempts: 3, .. }))
        }
        other => panic!("unexpected error: {other}"),
    }
}
