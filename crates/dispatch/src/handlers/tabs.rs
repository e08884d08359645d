//! Tab lifecycle commands: straight passes through the browser surface.

use async_trait::async_trait;
use serde_json::{json, Value};

use tabwire_browser::{CaptureOptions, CreateTabParams};
use tabwire_core::Result;

use crate::{opt_bool, opt_i64, opt_u64, require_str, require_tab_id, Handler, HandlerContext};

pub struct ListTabs;

#[async_trait]
impl Handler for ListTabs {
    fn name(&self) -> &'static str {
        "tabs.list"
    }

    async fn execute(&self, ctx: HandlerContext, _params: Value) -> Result<Value> {
        let tabs = ctx.surface.list_tabs().await?;
        Ok(serde_json::to_value(tabs)?)
    }
}

pub struct CreateTab;

#[async_trait]
impl Handler for CreateTab {
    fn name(&self) -> &'static str {
        "tabs.create"
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_str(params, "url").map(|_| ())
    }

    async fn execute(&self, ctx: HandlerContext, params: Value) -> Result<Value> {
        let create: CreateTabParams = serde_json::from_value(params)?;
        let tab = ctx.surface.create_tab(create).await?;
        Ok(json!({ "id": tab.id, "url": tab.url, "title": tab.title }))
    }
}

pub struct CloseTab;

#[async_trait]
impl Handler for CloseTab {
    fn name(&self) -> &'static str {
        "tabs.close"
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_tab_id(params).map(|_| ())
    }

    async fn execute(&self, ctx: HandlerContext, params: Value) -> Result<Value> {
        ctx.surface.close_tab(require_tab_id(&params)?).await?;
        Ok(json!({ "success": true }))
    }
}

pub struct ActivateTab;

#[async_trait]
impl Handler for ActivateTab {
    fn name(&self) -> &'static str {
        "tabs.activate"
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_tab_id(params).map(|_| ())
    }

    async fn execute(&self, ctx: HandlerContext, params: Value) -> Result<Value> {
        ctx.surface.activate_tab(require_tab_id(&params)?).await?;
        Ok(json!({ "success": true }))
    }
}

pub struct ReloadTab;

#[async_trait]
impl Handler for ReloadTab {
    fn name(&self) -> &'static str {
        "tabs.reload"
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_tab_id(params).map(|_| ())
    }

    async fn execute(&self, ctx: HandlerContext, params: Value) -> Result<Value> {
        let bypass_cache = opt_bool(&params, "bypassCache").unwrap_or(false);
        ctx.surface
            .reload_tab(require_tab_id(&params)?, bypass_cache)
            .await?;
        Ok(json!({ "success": true }))
    }
}

/// Updates the URL, then suspends until the tab reports load-complete.
/// The two steps run strictly in that order.
pub struct Navigate;

#[async_trait]
impl Handler for Navigate {
    fn name(&self) -> &'static str {
        "tabs.navigate"
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_tab_id(params)?;
        require_str(params, "url").map(|_| ())
    }

    async fn execute(&self, ctx: HandlerContext, params: Value) -> Result<Value> {
        let tab_id = require_tab_id(&params)?;
        let url = require_str(&params, "url")?;
        ctx.surface.set_tab_url(tab_id, url).await?;
        ctx.surface.wait_for_load(tab_id).await?;
        Ok(json!({ "success": true }))
    }
}

pub struct GoBack;

#[async_trait]
impl Handler for GoBack {
    fn name(&self) -> &'static str {
        "tabs.goBack"
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_tab_id(params).map(|_| ())
    }

    async fn execute(&self, ctx: HandlerContext, params: Value) -> Result<Value> {
        ctx.surface.go_back(require_tab_id(&params)?).await?;
        Ok(json!({ "success": true }))
    }
}

pub struct GoForward;

#[async_trait]
impl Handler for GoForward {
    fn name(&self) -> &'static str {
        "tabs.goForward"
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_tab_id(params).map(|_| ())
    }

    async fn execute(&self, ctx: HandlerContext, params: Value) -> Result<Value> {
        ctx.surface.go_forward(require_tab_id(&params)?).await?;
        Ok(json!({ "success": true }))
    }
}

pub struct CaptureScreenshot;

#[async_trait]
impl Handler for CaptureScreenshot {
    fn name(&self) -> &'static str {
        "tabs.captureScreenshot"
    }

    async fn execute(&self, ctx: HandlerContext, params: Value) -> Result<Value> {
        let opts = CaptureOptions {
            window_id: opt_i64(&params, "windowId"),
            format: params
                .get("format")
                .and_then(Value::as_str)
                .unwrap_or("png")
                .to_string(),
            quality: opt_u64(&params, "quality").unwrap_or(100).min(100) as u8,
        };
        let data_url = ctx.surface.capture_visible_tab(opts).await?;
        Ok(json!({ "dataUrl": data_url }))
    }
}

pub struct GetFrames;

#[async_trait]
impl Handler for GetFrames {
    fn name(&self) -> &'static str {
        "tabs.getFrames"
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_tab_id(params).map(|_| ())
    }

    async fn execute(&self, ctx: HandlerContext, params: Value) -> Result<Value> {
        let frames = ctx.surface.get_frames(require_tab_id(&params)?).await?;
        Ok(json!({ "frames": serde_json::to_value(frames)? }))
    }
}
