//! DOM-derived analyses. Both capture the element tree through the agent
//! bridge and do all the interpretation broker-side, so results are
//! identical whether a live page agent or a one-shot injection produced
//! the capture.

use async_trait::async_trait;
use serde_json::{json, Value};

use tabwire_browser::{PageFunction, RawNode};
use tabwire_core::Result;

use crate::{actionables, opt_bool, opt_str, require_tab_id, snapshot, Handler, HandlerContext};

pub struct GetActionables;

#[async_trait]
impl Handler for GetActionables {
    fn name(&self) -> &'static str {
        "tabs.getActionables"
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_tab_id(params).map(|_| ())
    }

    async fn execute(&self, ctx: HandlerContext, params: Value) -> Result<Value> {
        let tab_id = require_tab_id(&params)?;
        let captured = ctx
            .bridge
            .forward(tab_id, &PageFunction::DomSnapshot { root: None })
            .await?;
        if captured.is_null() {
            return Ok(json!({ "actionables": [] }));
        }
        let root: RawNode = serde_json::from_value(captured)?;
        Ok(json!({ "actionables": actionables::scan_to_value(&root) }))
    }
}

pub struct GetAccessibilitySnapshot;

#[async_trait]
impl Handler for GetAccessibilitySnapshot {
    fn name(&self) -> &'static str {
        "tabs.getAccessibilitySnapshot"
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_tab_id(params).map(|_| ())
    }

    async fn execute(&self, ctx: HandlerContext, params: Value) -> Result<Value> {
        let tab_id = require_tab_id(&params)?;
        let root_sel = opt_str(&params, "root");
        let interesting_only = opt_bool(&params, "interestingOnly").unwrap_or(true);
        let captured = ctx
            .bridge
            .forward(tab_id, &PageFunction::DomSnapshot { root: root_sel })
            .await?;
        if captured.is_null() {
            return Ok(json!({ "snapshot": null }));
        }
        let root: RawNode = serde_json::from_value(captured)?;
        let tree = snapshot::build(&root, interesting_only);
        Ok(json!({ "snapshot": tree }))
    }
}
