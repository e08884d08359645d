//! Script-injection commands. Selector-based ops honor the `>>>` frame
//! scoping syntax; all ops honor explicit `frameId`/`allFrames` params.

use async_trait::async_trait;
use serde_json::{json, Value};

use tabwire_browser::{
    first_frame_result, PageFunction, ScriptInjection, ScriptWorld, TabId,
};
use tabwire_core::Result;

use crate::frames::scoped_injection;
use crate::{opt_bool, opt_f64, opt_str, opt_u64, require_str, require_tab_id, Handler, HandlerContext};

pub(crate) fn apply_frame_params(mut injection: ScriptInjection, params: &Value) -> ScriptInjection {
    if let Some(frame_id) = params.get("frameId").and_then(Value::as_i64) {
        injection.frame_id = Some(frame_id);
    }
    if opt_bool(params, "allFrames") == Some(true) {
        injection.all_frames = true;
    }
    injection
}

/// Run an injection and shape the result: the first frame's value
/// normally, one entry per frame under `allFrames`.
pub(crate) async fn run_injection(ctx: &HandlerContext, injection: ScriptInjection) -> Result<Value> {
    let all_frames = injection.all_frames;
    let results = ctx.bridge.execute_script(injection).await?;
    if all_frames {
        Ok(serde_json::to_value(results)?)
    } else {
        Ok(first_frame_result(results))
    }
}

/// Injection for a selector that may carry frame scoping.
pub(crate) async fn selector_injection(
    ctx: &HandlerContext,
    tab_id: TabId,
    selector: &str,
    params: &Value,
    build: impl FnOnce(String) -> PageFunction,
) -> Result<ScriptInjection> {
    let injection = scoped_injection(ctx, tab_id, selector, build).await?;
    Ok(apply_frame_params(injection, params))
}

pub struct ExecuteScript;

#[async_trait]
impl Handler for ExecuteScript {
    fn name(&self) -> &'static str {
        "tabs.executeScript"
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_tab_id(params)?;
        require_str(params, "script").map(|_| ())
    }

    async fn execute(&self, ctx: HandlerContext, params: Value) -> Result<Value> {
        let tab_id = require_tab_id(&params)?;
        let script = require_str(&params, "script")?.to_string();
        let world = match opt_str(&params, "world").as_deref() {
            Some("MAIN") => ScriptWorld::Main,
            _ => ScriptWorld::Isolated,
        };
        let mut injection =
            ScriptInjection::main_frame(tab_id, PageFunction::Eval { script });
        injection.world = world;
        run_injection(&ctx, apply_frame_params(injection, &params)).await
    }
}

pub struct ExtractText;

#[async_trait]
impl Handler for ExtractText {
    fn name(&self) -> &'static str {
        "tabs.extractText"
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_tab_id(params).map(|_| ())
    }

    async fn execute(&self, ctx: HandlerContext, params: Value) -> Result<Value> {
        let tab_id = require_tab_id(&params)?;
        let injection = match opt_str(&params, "selector") {
            Some(selector) => {
                selector_injection(&ctx, tab_id, &selector, &params, |element| {
                    PageFunction::ExtractText {
                        selector: Some(element),
                    }
                })
                .await?
            }
            None => apply_frame_params(
                ScriptInjection::main_frame(tab_id, PageFunction::ExtractText { selector: None }),
                &params,
            ),
        };
        let text = run_injection(&ctx, injection).await?;
        Ok(json!({ "text": text }))
    }
}

pub struct FindElements;

#[async_trait]
impl Handler for FindElements {
    fn name(&self) -> &'static str {
        "tabs.findElements"
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_tab_id(params)?;
        require_str(params, "selector").map(|_| ())
    }

    async fn execute(&self, ctx: HandlerContext, params: Value) -> Result<Value> {
        let tab_id = require_tab_id(&params)?;
        let selector = require_str(&params, "selector")?.to_string();
        let injection = selector_injection(&ctx, tab_id, &selector, &params, |element| {
            PageFunction::FindElements { selector: element }
        })
        .await?;
        let mut elements = run_injection(&ctx, injection).await?;
        if elements.is_null() {
            elements = json!([]);
        }
        Ok(json!({ "elements": elements }))
    }
}

pub struct Click;

#[async_trait]
impl Handler for Click {
    fn name(&self) -> &'static str {
        "tabs.click"
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_tab_id(params)?;
        require_str(params, "selector").map(|_| ())
    }

    async fn execute(&self, ctx: HandlerContext, params: Value) -> Result<Value> {
        let tab_id = require_tab_id(&params)?;
        let selector = require_str(&params, "selector")?.to_string();
        let index = opt_u64(&params, "index").unwrap_or(0) as usize;
        let injection = selector_injection(&ctx, tab_id, &selector, &params, |element| {
            PageFunction::Click {
                selector: element,
                index,
            }
        })
        .await?;
        let clicked = run_injection(&ctx, injection).await?;
        Ok(json!({ "success": clicked.as_bool().unwrap_or(false) }))
    }
}

pub struct TypeText;

#[async_trait]
impl Handler for TypeText {
    fn name(&self) -> &'static str {
        "tabs.type"
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_tab_id(params)?;
        require_str(params, "selector")?;
        require_str(params, "text").map(|_| ())
    }

    async fn execute(&self, ctx: HandlerContext, params: Value) -> Result<Value> {
        let tab_id = require_tab_id(&params)?;
        let selector = require_str(&params, "selector")?.to_string();
        let text = require_str(&params, "text")?.to_string();
        let append = opt_bool(&params, "append").unwrap_or(false);
        let injection = selector_injection(&ctx, tab_id, &selector, &params, |element| {
            PageFunction::TypeText {
                selector: element,
                text,
                append,
            }
        })
        .await?;
        let typed = run_injection(&ctx, injection).await?;
        Ok(json!({ "success": typed.as_bool().unwrap_or(false) }))
    }
}

pub struct Scroll;

#[async_trait]
impl Handler for Scroll {
    fn name(&self) -> &'static str {
        "tabs.scroll"
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_tab_id(params).map(|_| ())
    }

    async fn execute(&self, ctx: HandlerContext, params: Value) -> Result<Value> {
        let tab_id = require_tab_id(&params)?;
        let injection = ScriptInjection::main_frame(
            tab_id,
            PageFunction::Scroll {
                x: opt_f64(&params, "x").unwrap_or(0.0),
                y: opt_f64(&params, "y").unwrap_or(0.0),
                behavior: opt_str(&params, "behavior").unwrap_or_else(|| "smooth".to_string()),
            },
        );
        run_injection(&ctx, apply_frame_params(injection, &params)).await
    }
}
