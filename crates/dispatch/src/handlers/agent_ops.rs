//! Commands whose page side is richer than a one-shot query: element
//! inspection, highlighting, synthetic events, structured extraction,
//! mutation observation, and CSS injection. All of them route through the
//! agent bridge, which prefers a live page agent and falls back to script
//! injection.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use tabwire_browser::PageFunction;
use tabwire_core::{Error, Result};

use crate::{
    opt_bool, opt_str, opt_u64, require_str, require_tab_id, Handler, HandlerContext,
};

pub struct GetElementInfo;

#[async_trait]
impl Handler for GetElementInfo {
    fn name(&self) -> &'static str {
        "tabs.getElementInfo"
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_tab_id(params)?;
        require_str(params, "selector").map(|_| ())
    }

    async fn execute(&self, ctx: HandlerContext, params: Value) -> Result<Value> {
        let tab_id = require_tab_id(&params)?;
        let func = PageFunction::ElementInfo {
            selector: require_str(&params, "selector")?.to_string(),
            include_styles: opt_bool(&params, "includeStyles").unwrap_or(false),
        };
        ctx.bridge.forward(tab_id, &func).await
    }
}

pub struct HighlightElement;

#[async_trait]
impl Handler for HighlightElement {
    fn name(&self) -> &'static str {
        "tabs.highlightElement"
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_tab_id(params)?;
        require_str(params, "selector").map(|_| ())
    }

    async fn execute(&self, ctx: HandlerContext, params: Value) -> Result<Value> {
        let tab_id = require_tab_id(&params)?;
        let func = PageFunction::Highlight {
            selector: require_str(&params, "selector")?.to_string(),
            outline: opt_str(&params, "outline"),
            background: opt_str(&params, "backgroundColor"),
            duration_ms: opt_u64(&params, "duration"),
        };
        ctx.bridge.forward(tab_id, &func).await
    }
}

pub struct SimulateEvent;

#[async_trait]
impl Handler for SimulateEvent {
    fn name(&self) -> &'static str {
        "tabs.simulateEvent"
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_tab_id(params)?;
        require_str(params, "selector")?;
        require_str(params, "eventType").map(|_| ())
    }

    async fn execute(&self, ctx: HandlerContext, params: Value) -> Result<Value> {
        let tab_id = require_tab_id(&params)?;
        let func = PageFunction::SimulateEvent {
            selector: require_str(&params, "selector")?.to_string(),
            event_type: require_str(&params, "eventType")?.to_string(),
            options: params.get("options").cloned().unwrap_or_else(|| json!({})),
        };
        ctx.bridge.forward(tab_id, &func).await
    }
}

pub struct ExtractStructuredData;

#[async_trait]
impl Handler for ExtractStructuredData {
    fn name(&self) -> &'static str {
        "tabs.extractStructuredData"
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_tab_id(params)?;
        require_str(params, "rowSelector")?;
        column_selectors(params).map(|_| ())
    }

    async fn execute(&self, ctx: HandlerContext, params: Value) -> Result<Value> {
        let tab_id = require_tab_id(&params)?;
        let func = PageFunction::ExtractStructuredData {
            row_selector: require_str(&params, "rowSelector")?.to_string(),
            column_selectors: column_selectors(&params)?,
            extract_attribute: opt_str(&params, "extractAttribute"),
        };
        ctx.bridge.forward(tab_id, &func).await
    }
}

fn column_selectors(params: &Value) -> Result<Map<String, Value>> {
    params
        .get("columnSelectors")
        .and_then(Value::as_object)
        .cloned()
        .ok_or_else(|| Error::Validation("Missing required parameter: columnSelectors".into()))
}

pub struct ObserveMutations;

#[async_trait]
impl Handler for ObserveMutations {
    fn name(&self) -> &'static str {
        "tabs.observeMutations"
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_tab_id(params).map(|_| ())
    }

    async fn execute(&self, ctx: HandlerContext, params: Value) -> Result<Value> {
        let tab_id = require_tab_id(&params)?;
        let selector = opt_str(&params, "selector");
        let func = PageFunction::ObserveMutations {
            selector: selector.clone(),
            options: observer_options(&params),
            max_mutations: opt_u64(&params, "maxMutations").unwrap_or(100) as usize,
            timeout_ms: opt_u64(&params, "timeout"),
        };
        let result = ctx.bridge.forward(tab_id, &func).await?;
        ctx.bridge
            .set_observer(tab_id, selector.as_deref().unwrap_or("body"))
            .await;
        Ok(result)
    }
}

/// MutationObserver init built from the flat boolean params. Only the flags
/// the driver sent are forwarded; the page applies its own defaults.
fn observer_options(params: &Value) -> Value {
    const FLAGS: [&str; 6] = [
        "attributes",
        "childList",
        "subtree",
        "attributeOldValue",
        "characterData",
        "characterDataOldValue",
    ];
    let mut options = Map::new();
    for flag in FLAGS {
        if let Some(v) = opt_bool(params, flag) {
            options.insert(flag.to_string(), Value::Bool(v));
        }
    }
    Value::Object(options)
}

pub struct InjectCss;

#[async_trait]
impl Handler for InjectCss {
    fn name(&self) -> &'static str {
        "tabs.injectCSS"
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_tab_id(params)?;
        require_str(params, "css").map(|_| ())
    }

    async fn execute(&self, ctx: HandlerContext, params: Value) -> Result<Value> {
        let tab_id = require_tab_id(&params)?;
        let func = PageFunction::InjectCss {
            style_id: opt_str(&params, "id"),
            css: require_str(&params, "css")?.to_string(),
        };
        let result = ctx.bridge.forward(tab_id, &func).await?;
        if let Some(style_id) = result.get("styleId").and_then(Value::as_str) {
            ctx.bridge.record_style(tab_id, style_id).await;
        }
        Ok(result)
    }
}

pub struct RemoveCss;

#[async_trait]
impl Handler for RemoveCss {
    fn name(&self) -> &'static str {
        "tabs.removeCSS"
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_tab_id(params)?;
        require_str(params, "styleId").map(|_| ())
    }

    async fn execute(&self, ctx: HandlerContext, params: Value) -> Result<Value> {
        let tab_id = require_tab_id(&params)?;
        let style_id = require_str(&params, "styleId")?;
        let func = PageFunction::RemoveCss {
            style_id: style_id.to_string(),
        };
        let result = ctx.bridge.forward(tab_id, &func).await?;
        ctx.bridge.remove_style(tab_id, style_id).await;
        Ok(result)
    }
}
