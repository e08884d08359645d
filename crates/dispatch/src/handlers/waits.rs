//! Polling commands. Both resolve their injection once up front and then
//! re-run it every interval; a `found: false` response after the timeout is
//! still a success at the wire level.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use tabwire_browser::{first_frame_result, PageFunction, ScriptInjection};
use tabwire_core::Result;

use crate::frames::scoped_injection;
use crate::wait::poll_until;
use crate::{opt_u64, require_str, require_tab_id, Handler, HandlerContext};

fn wait_budget(ctx: &HandlerContext, params: &Value) -> (Duration, Duration) {
    let timeout = opt_u64(params, "timeout").unwrap_or(ctx.wait.default_timeout_ms);
    (
        Duration::from_millis(timeout),
        Duration::from_millis(ctx.wait.poll_interval_ms),
    )
}

async fn poll_injection(
    ctx: &HandlerContext,
    injection: ScriptInjection,
    timeout: Duration,
    interval: Duration,
) -> Value {
    let outcome = poll_until(
        || {
            let injection = injection.clone();
            let bridge = ctx.bridge.clone();
            async move { Ok(first_frame_result(bridge.execute_script(injection).await?)) }
        },
        timeout,
        interval,
    )
    .await;
    outcome.to_value()
}

pub struct WaitForElement;

#[async_trait]
impl Handler for WaitForElement {
    fn name(&self) -> &'static str {
        "tabs.waitForElement"
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_tab_id(params)?;
        require_str(params, "selector").map(|_| ())
    }

    async fn execute(&self, ctx: HandlerContext, params: Value) -> Result<Value> {
        let tab_id = require_tab_id(&params)?;
        let selector = require_str(&params, "selector")?.to_string();
        let (timeout, interval) = wait_budget(&ctx, &params);
        let injection = scoped_injection(&ctx, tab_id, &selector, |element| {
            PageFunction::SelectorExists { selector: element }
        })
        .await?;
        Ok(poll_injection(&ctx, injection, timeout, interval).await)
    }
}

pub struct WaitForNavigation;

#[async_trait]
impl Handler for WaitForNavigation {
    fn name(&self) -> &'static str {
        "tabs.waitForNavigation"
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_tab_id(params).map(|_| ())
    }

    async fn execute(&self, ctx: HandlerContext, params: Value) -> Result<Value> {
        let tab_id = require_tab_id(&params)?;
        let (timeout, interval) = wait_budget(&ctx, &params);
        let injection = ScriptInjection::main_frame(tab_id, PageFunction::DocumentComplete);
        Ok(poll_injection(&ctx, injection, timeout, interval).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context, StubSurface};
    use serde_json::json;
    use std::sync::Arc;
    use tabwire_core::Error;

    #[tokio::test]
    async fn test_wait_for_element_found_on_third_poll() {
        let surface = Arc::new(StubSurface::new());
        surface.script(Ok(Value::Bool(false))).await;
        surface.script(Err(Error::Browser("frame detached".into()))).await;
        surface.script(Ok(Value::Bool(true))).await;
        let ctx = context(surface);
        let result = WaitForElement
            .execute(ctx, json!({"tabId": 1, "selector": "#late"}))
            .await
            .unwrap();
        assert_eq!(result["found"], json!(true));
    }

    #[tokio::test]
    async fn test_wait_for_element_times_out_with_budget_elapsed() {
        // Default reply is null, which never satisfies the strict-true check.
        let ctx = context(Arc::new(StubSurface::new()));
        let result = WaitForElement
            .execute(
                ctx,
                json!({"tabId": 1, "selector": "#never", "timeout": 60}),
            )
            .await
            .unwrap();
        assert_eq!(result, json!({"found": false, "elapsed": 60}));
    }

    #[tokio::test]
    async fn test_wait_for_navigation_complete() {
        let surface = Arc::new(StubSurface::replying(Value::Bool(true)));
        let ctx = context(surface.clone());
        let result = WaitForNavigation
            .execute(ctx, json!({"tabId": 1}))
            .await
            .unwrap();
        assert_eq!(result["found"], json!(true));
        let injections = surface.injections.lock().await;
        assert!(injections[0].func.source().contains("readyState"));
    }

    #[test]
    fn test_selector_is_required_before_polling() {
        let err = WaitForElement.validate(&json!({"tabId": 1})).unwrap_err();
        assert_eq!(err.to_string(), "Missing required parameter: selector");
    }
}
