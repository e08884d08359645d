//! Command dispatch: the registry of wire commands, the dispatcher that
//! turns inbound frames into responses, and the handlers behind every
//! `tabs.*` operation.

pub mod actionables;
pub mod dispatcher;
pub mod frames;
pub mod handlers;
pub mod registry;
pub mod snapshot;
pub mod wait;

#[cfg(test)]
pub mod testing;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use tabwire_agent::AgentBridge;
use tabwire_browser::{BrowserSurface, TabId};
use tabwire_core::config::WaitConfig;
use tabwire_core::{Error, Result};

pub use dispatcher::Dispatcher;
pub use registry::HandlerRegistry;

/// Everything a handler may touch while executing.
#[derive(Clone)]
pub struct HandlerContext {
    pub surface: Arc<dyn BrowserSurface>,
    pub bridge: Arc<AgentBridge>,
    pub wait: WaitConfig,
}

/// One wire command. `validate` runs before `execute` and must catch every
/// missing-parameter case synchronously, so a malformed request never
/// reaches the browser.
#[async_trait]
pub trait Handler: Send + Sync {
    fn name(&self) -> &'static str;

    fn validate(&self, _params: &Value) -> Result<()> {
        Ok(())
    }

    async fn execute(&self, ctx: HandlerContext, params: Value) -> Result<Value>;
}

fn missing(key: &str) -> Error {
    Error::Validation(format!("Missing required parameter: {}", key))
}

pub fn require_str<'a>(params: &'a Value, key: &str) -> Result<&'a str> {
    params
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| missing(key))
}

pub fn require_tab_id(params: &Value) -> Result<TabId> {
    params
        .get("tabId")
        .and_then(Value::as_i64)
        .ok_or_else(|| missing("tabId"))
}

pub fn opt_str(params: &Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
}

pub fn opt_i64(params: &Value, key: &str) -> Option<i64> {
    params.get(key).and_then(Value::as_i64)
}

pub fn opt_u64(params: &Value, key: &str) -> Option<u64> {
    params.get(key).and_then(Value::as_u64)
}

pub fn opt_f64(params: &Value, key: &str) -> Option<f64> {
    params.get(key).and_then(Value::as_f64)
}

pub fn opt_bool(params: &Value, key: &str) -> Option<bool> {
    params.get(key).and_then(Value::as_bool)
}
