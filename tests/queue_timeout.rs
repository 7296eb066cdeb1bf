// tests/queue_timeout.rs

mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

use tokio::time::{Duration, sleep};

use cmdrelay::bridge::{Bridge, BridgeCall, BridgeReply};
use cmdrelay::errors::CmdRelayError;
use cmdrelay::queue::{CommandQueue, Connector};
use cmdrelay::types::TimeoutCheck;
use cmdrelay_test_utils::{CommandOptionsBuilder, FakeBridge, SettingsBuilder};

type TestResult = Result<(), Box<dyn Error>>;

/// A bridge whose command calls never settle; kills succeed immediately.
fn hanging_bridge() -> FakeBridge {
    FakeBridge::new(Arc::new(|call| {
        Box::pin(async move {
            match call {
                BridgeCall::Execute { .. } | BridgeCall::Spawn { .. } => {
                    std::future::pending().await
                }
                BridgeCall::Kill { .. } => Ok(BridgeReply::Killed),
                other => panic!("unexpected call: {other:?}"),
            }
        })
    }))
}

fn queue_over(bridge: FakeBridge, default_timeout_secs: u64) -> CommandQueue {
    let settings = SettingsBuilder::new()
        .default_timeout_secs(default_timeout_secs)
        .build();
    let connector: Connector = Box::new(move || Ok(Arc::new(bridge.clone()) as Arc<dyn Bridge>));
    CommandQueue::with_connector(settings, PathBuf::from("."), connector)
}

#[tokio::test]
async fn hung_command_times_out_and_is_killed() -> TestResult {
    init_tracing();

    let bridge = hanging_bridge();
    let queue = queue_over(bridge.clone(), 30);

    let started = Instant::now();
    let err = queue
        .run(
            "hang",
            &["--now"],
            CommandOptionsBuilder::new().timeout_secs(1).build(),
        )
        .await
        .unwrap_err();

    match err {
        CmdRelayError::Timeout { command_line } => assert_eq!(command_line, "hang --now"),
        other => panic!("unexpected error: {other:?}"),
    }

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(900), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(3), "{elapsed:?}");

    // The process tree for the issued id was killed.
    assert_eq!(bridge.kill_ids(), [0]);

    Ok(())
}

#[tokio::test]
async fn default_timeout_applies_when_unset() -> TestResult {
    init_tracing();

    let bridge = hanging_bridge();
    let queue = queue_over(bridge, 1);

    let err = queue
        .run("hang", &[], CommandOptionsBuilder::new().build())
        .await
        .unwrap_err();
    assert!(matches!(err, CmdRelayError::Timeout { .. }));

    Ok(())
}

#[tokio::test]
async fn disabled_timeout_never_fires() -> TestResult {
    init_tracing();

    let bridge = FakeBridge::new(Arc::new(|call| {
        Box::pin(async move {
            match call {
                BridgeCall::Execute { command, .. } => {
                    sleep(Duration::from_millis(1500)).await;
                    Ok(BridgeReply::Output(command))
                }
                other => panic!("unexpected call: {other:?}"),
            }
        })
    }));
    // Default period is 1s; disabling must outlive it.
    let queue = queue_over(bridge.clone(), 1);

    let out = queue
        .run("slow", &[], CommandOptionsBuilder::new().no_timeout().build())
        .await?;
    assert_eq!(out, "slow");
    assert!(bridge.kill_ids().is_empty());

    Ok(())
}

#[tokio::test]
async fn truthy_check_defers_until_natural_completion() -> TestResult {
    init_tracing();

    let checks = Arc::new(AtomicU32::new(0));
    let checks_in_check = Arc::clone(&checks);
    let check: TimeoutCheck = Arc::new(move || {
        let checks = Arc::clone(&checks_in_check);
        Box::pin(async move {
            checks.fetch_add(1, Ordering::SeqCst);
            true
        })
    });

    let bridge = FakeBridge::new(Arc::new(|call| {
        Box::pin(async move {
            match call {
                BridgeCall::Execute { command, .. } => {
                    sleep(Duration::from_millis(1500)).await;
                    Ok(BridgeReply::Output(command))
                }
                other => panic!("unexpected call: {other:?}"),
            }
        })
    }));
    let queue = queue_over(bridge.clone(), 30);

    let out = queue
        .run(
            "slow",
            &[],
            CommandOptionsBuilder::new()
                .timeout_secs(1)
                .timeout_check(check)
                .build(),
        )
        .await?;

    assert_eq!(out, "slow");
    assert!(checks.load(Ordering::SeqCst) >= 1);
    assert!(bridge.kill_ids().is_empty());

    Ok(())
}

#[tokio::test]
async fn falsy_check_fails_at_first_expiry() -> TestResult {
    init_tracing();

    let checks = Arc::new(AtomicU32::new(0));
    let checks_in_check = Arc::clone(&checks);
    let check: TimeoutCheck = Arc::new(move || {
        let checks = Arc::clone(&checks_in_check);
        Box::pin(async move {
            checks.fetch_add(1, Ordering::SeqCst);
            false
        })
    });

    let bridge = hanging_bridge();
    let queue = queue_over(bridge.clone(), 30);

    let started = Instant::now();
    let err = queue
        .run(
            "hang",
            &[],
            CommandOptionsBuilder::new()
                .timeout_secs(1)
                .timeout_check(check)
                .build(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, CmdRelayError::Timeout { .. }));
    assert_eq!(checks.load(Ordering::SeqCst), 1);
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(bridge.kill_ids(), [0]);

    Ok(())
}

#[tokio::test]
async fn expected_timeout_still_rejects_with_timeout_error() -> TestResult {
    init_tracing();

    let bridge = hanging_bridge();
    let queue = queue_over(bridge, 30);

    let err = queue
        .run(
            "hang",
            &[],
            CommandOptionsBuilder::new()
                .timeout_secs(1)
                .timeout_expected()
                .build(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CmdRelayError::Timeout { .. }));

    Ok(())
}

#[tokio::test]
async fn queue_advances_after_a_timeout() -> TestResult {
    init_tracing();

    let bridge = FakeBridge::new(Arc::new(|call| {
        Box::pin(async move {
            match call {
                BridgeCall::Execute { command, .. } if command == "hang" => {
                    std::future::pending().await
                }
                BridgeCall::Execute { command, .. } => Ok(BridgeReply::Output(command)),
                BridgeCall::Kill { .. } => Ok(BridgeReply::Killed),
                other => panic!("unexpected call: {other:?}"),
            }
        })
    }));
    let queue = queue_over(bridge, 30);

    let (hung, next) = tokio::join!(
        queue.run(
            "hang",
            &[],
            CommandOptionsBuilder::new().timeout_secs(1).build()
        ),
        queue.run("after", &[], CommandOptionsBuilder::new().build()),
    );

    assert!(matches!(hung, Err(CmdRelayError::Timeout { .. })));
    assert_eq!(next?, "after");

    Ok(())
}
