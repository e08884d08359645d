//! The polling loop behind `tabs.waitForElement` and
//! `tabs.waitForNavigation`.

use std::future::Future;
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use tracing::debug;

use tabwire_core::Result;

/// Terminal state of a wait. `found: false` is a successful response, not
/// an error; `elapsed` is wall-clock milliseconds since the wait began.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOutcome {
    pub found: bool,
    pub elapsed: u64,
}

impl WaitOutcome {
    pub fn to_value(self) -> Value {
        json!({ "found": self.found, "elapsed": self.elapsed })
    }
}

/// Poll `check` every `interval` until it yields strict JSON `true` or the
/// deadline passes. Anything else (`false`, `null`, a missing value) is
/// "not yet"; so is a per-attempt error, since a tab mid-navigation is
/// expected to fail a few polls before it settles.
pub async fn poll_until<F, Fut>(mut check: F, timeout: Duration, interval: Duration) -> WaitOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Value>>,
{
    let started = Instant::now();
    while started.elapsed() < timeout {
        match check().await {
            Ok(Value::Bool(true)) => {
                return WaitOutcome {
                    found: true,
                    elapsed: started.elapsed().as_millis() as u64,
                };
            }
            Ok(_) => {}
            Err(e) => {
                debug!(error = %e, "Poll attempt failed, retrying");
            }
        }
        tokio::time::sleep(interval).await;
    }
    WaitOutcome {
        found: false,
        elapsed: timeout.as_millis() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use tabwire_core::Error;

    fn scripted(replies: Vec<Result<Value>>) -> impl FnMut() -> std::pin::Pin<Box<dyn Future<Output = Result<Value>> + Send>> {
        let queue = Arc::new(Mutex::new(VecDeque::from(replies)));
        move || {
            let queue = queue.clone();
            Box::pin(async move {
                queue
                    .lock()
                    .unwrap()
                    .pop_front()
                    .unwrap_or(Ok(Value::Bool(false)))
            })
        }
    }

    #[tokio::test]
    async fn test_only_strict_true_succeeds() {
        // undefined, null, false, then true: only the last one terminates.
        let check = scripted(vec![
            Ok(Value::Null),
            Ok(Value::Null),
            Ok(Value::Bool(false)),
            Ok(Value::Bool(true)),
        ]);
        let outcome = poll_until(
            check,
            Duration::from_secs(5),
            Duration::from_millis(10),
        )
        .await;
        assert!(outcome.found);
        assert!(outcome.elapsed >= 30);
    }

    #[tokio::test]
    async fn test_truthy_non_bool_is_not_success() {
        let check = scripted(vec![Ok(Value::String("true".into())), Ok(Value::Bool(true))]);
        let outcome = poll_until(
            check,
            Duration::from_secs(5),
            Duration::from_millis(10),
        )
        .await;
        assert!(outcome.found);
        assert!(outcome.elapsed >= 10);
    }

    #[tokio::test]
    async fn test_errors_are_swallowed_and_retried() {
        let check = scripted(vec![
            Err(Error::Browser("No tab with id 4".into())),
            Err(Error::Browser("No tab with id 4".into())),
            Ok(Value::Bool(true)),
        ]);
        let outcome = poll_until(
            check,
            Duration::from_secs(5),
            Duration::from_millis(10),
        )
        .await;
        assert!(outcome.found);
    }

    #[tokio::test]
    async fn test_timeout_reports_the_budget() {
        let started = Instant::now();
        let outcome = poll_until(
            || async { Ok(Value::Bool(false)) },
            Duration::from_millis(500),
            Duration::from_millis(50),
        )
        .await;
        assert!(!outcome.found);
        assert_eq!(outcome.elapsed, 500);
        assert!(started.elapsed() >= Duration::from_millis(500));
    }

    #[test]
    fn test_outcome_wire_shape() {
        let value = WaitOutcome {
            found: true,
            elapsed: 120,
        }
        .to_value();
        assert_eq!(value, serde_json::json!({"found": true, "elapsed": 120}));
    }
}
