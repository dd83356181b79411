//! End-to-end runtime tests against a local flag file.

use flagsync::prelude::*;
use flagsync::runtime::Providers;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

const EMPTY_FLAGS: &str = r#"{"flags":{}}"#;

fn file_runtime(path: &std::path::Path) -> Runtime {
    Runtime::new(Providers {
        sync: Arc::new(
            FilePathSync::new(path)
                .with_debounce(Duration::from_millis(20))
                .with_poll_interval(Duration::from_millis(50)),
        ),
        evaluator: Arc::new(JsonEvaluator::new()),
        service: Arc::new(HttpService::new(0)),
    })
}

#[tokio::test]
async fn test_start_and_interrupt() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("flags.json");
    fs::write(&path, EMPTY_FLAGS).unwrap();

    let runtime = file_runtime(&path);
    let mut states = runtime.subscribe();
    let cancel = CancellationToken::new();

    let run = runtime.run(cancel.clone());
    let interrupt = async {
        states
            .wait_for(|s| *s == RuntimeState::Running)
            .await
            .map(|_| ())
            .unwrap();
        cancel.cancel();
    };

    let (result, ()) = timeout(Duration::from_secs(5), async { tokio::join!(run, interrupt) })
        .await
        .expect("runtime did not terminate in time");

    assert!(result.is_ok());
    assert_eq!(runtime.state(), RuntimeState::Terminated);
}

#[tokio::test]
async fn test_missing_file_fails_before_running() {
    let runtime = file_runtime(std::path::Path::new("/nonexistent/flags.json"));
    let states = runtime.subscribe();

    let result = runtime.run(CancellationToken::new()).await;

    assert!(matches!(result, Err(Error::SourceUnreachable { .. })));
    assert_eq!(*states.borrow(), RuntimeState::Terminated);
}

#[tokio::test]
async fn test_file_change_reloads_evaluator() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("flags.json");
    fs::write(&path, EMPTY_FLAGS).unwrap();

    let runtime = file_runtime(&path);
    let evaluator = runtime.evaluator();
    let mut states = runtime.subscribe();
    let cancel = CancellationToken::new();

    let run = runtime.run(cancel.clone());
    let driver = async {
        states
            .wait_for(|s| *s == RuntimeState::Running)
            .await
            .map(|_| ())
            .unwrap();
        // Let the watcher settle on its baseline before editing.
        sleep(Duration::from_millis(100)).await;

        fs::write(
            &path,
            r#"{"flags":{"checkout":{"variants":{"on":true,"off":false},"defaultVariant":"off"}}}"#,
        )
        .unwrap();

        let mut reloaded = false;
        for _ in 0..100 {
            if evaluator.resolve_boolean("checkout") == Ok(false) {
                reloaded = true;
                break;
            }
            sleep(Duration::from_millis(20)).await;
        }

        // A broken edit is rejected and the last good flags keep serving.
        fs::write(&path, "{ broken").unwrap();
        sleep(Duration::from_millis(200)).await;
        let still_served = evaluator.resolve_boolean("checkout") == Ok(false);

        cancel.cancel();
        (reloaded, still_served)
    };

    let (result, (reloaded, still_served)) = tokio::join!(run, driver);
    assert!(result.is_ok());
    assert!(reloaded, "evaluator never picked up the edited file");
    assert!(still_served, "a malformed edit replaced the last good flags");
}

#[tokio::test]
async fn test_unknown_provider_is_fatal_before_io() {
    let overrides = Overrides {
        uri: Some("/nonexistent/flags.json".to_string()),
        sync_provider: Some("s3".to_string()),
        ..Default::default()
    };

    let result = RuntimeConfig::load(None, &overrides);
    assert!(matches!(
        result,
        Err(Error::ProviderNotFound { kind: "sync", .. })
    ));
}
