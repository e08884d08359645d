//! Web storage commands, local and session flavors of the same trio.

use async_trait::async_trait;
use serde_json::{json, Value};

use tabwire_browser::{PageFunction, ScriptInjection};
use tabwire_core::Result;

use crate::handlers::script::{apply_frame_params, run_injection};
use crate::{opt_str, require_str, require_tab_id, Handler, HandlerContext};

async fn storage_op(ctx: &HandlerContext, params: &Value, func: PageFunction) -> Result<Value> {
    let tab_id = require_tab_id(params)?;
    let injection = apply_frame_params(ScriptInjection::main_frame(tab_id, func), params);
    run_injection(ctx, injection).await
}

pub struct GetLocalStorage;

#[async_trait]
impl Handler for GetLocalStorage {
    fn name(&self) -> &'static str {
        "tabs.getLocalStorage"
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_tab_id(params).map(|_| ())
    }

    async fn execute(&self, ctx: HandlerContext, params: Value) -> Result<Value> {
        let storage = storage_op(
            &ctx,
            &params,
            PageFunction::GetLocalStorage {
                key: opt_str(&params, "key"),
            },
        )
        .await?;
        Ok(json!({ "storage": storage }))
    }
}

pub struct SetLocalStorage;

#[async_trait]
impl Handler for SetLocalStorage {
    fn name(&self) -> &'static str {
        "tabs.setLocalStorage"
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_tab_id(params)?;
        require_str(params, "key")?;
        require_str(params, "value").map(|_| ())
    }

    async fn execute(&self, ctx: HandlerContext, params: Value) -> Result<Value> {
        let done = storage_op(
            &ctx,
            &params,
            PageFunction::SetLocalStorage {
                key: require_str(&params, "key")?.to_string(),
                value: require_str(&params, "value")?.to_string(),
            },
        )
        .await?;
        Ok(json!({ "success": done.as_bool().unwrap_or(false) }))
    }
}

pub struct ClearLocalStorage;

#[async_trait]
impl Handler for ClearLocalStorage {
    fn name(&self) -> &'static str {
        "tabs.clearLocalStorage"
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_tab_id(params).map(|_| ())
    }

    async fn execute(&self, ctx: HandlerContext, params: Value) -> Result<Value> {
        let done = storage_op(&ctx, &params, PageFunction::ClearLocalStorage).await?;
        Ok(json!({ "success": done.as_bool().unwrap_or(false) }))
    }
}

pub struct GetSessionStorage;

#[async_trait]
impl Handler for GetSessionStorage {
    fn name(&self) -> &'static str {
        "tabs.getSessionStorage"
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_tab_id(params).map(|_| ())
    }

    async fn execute(&self, ctx: HandlerContext, params: Value) -> Result<Value> {
        let storage = storage_op(
            &ctx,
            &params,
            PageFunction::GetSessionStorage {
                key: opt_str(&params, "key"),
            },
        )
        .await?;
        Ok(json!({ "storage": storage }))
    }
}

pub struct SetSessionStorage;

#[async_trait]
impl Handler for SetSessionStorage {
    fn name(&self) -> &'static str {
        "tabs.setSessionStorage"
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_tab_id(params)?;
        require_str(params, "key")?;
        require_str(params, "value").map(|_| ())
    }

    async fn execute(&self, ctx: HandlerContext, params: Value) -> Result<Value> {
        let done = storage_op(
            &ctx,
            &params,
            PageFunction::SetSessionStorage {
                key: require_str(&params, "key")?.to_string(),
                value: require_str(&params, "value")?.to_string(),
            },
        )
        .await?;
        Ok(json!({ "success": done.as_bool().unwrap_or(false) }))
    }
}

pub struct ClearSessionStorage;

#[async_trait]
impl Handler for ClearSessionStorage {
    fn name(&self) -> &'static str {
        "tabs.clearSessionStorage"
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_tab_id(params).map(|_| ())
    }

    async fn execute(&self, ctx: HandlerContext, params: Value) -> Result<Value> {
        let done = storage_op(&ctx, &params, PageFunction::ClearSessionStorage).await?;
        Ok(json!({ "success": done.as_bool().unwrap_or(false) }))
    }
}
