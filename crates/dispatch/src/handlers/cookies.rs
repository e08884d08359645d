//! Cookie commands, delegated straight to the browser surface.

use async_trait::async_trait;
use serde_json::{json, Value};

use tabwire_browser::{CookieDetails, CookieFilter};
use tabwire_core::Result;

use crate::{require_str, Handler, HandlerContext};

pub struct GetCookies;

#[async_trait]
impl Handler for GetCookies {
    fn name(&self) -> &'static str {
        "tabs.getCookies"
    }

    async fn execute(&self, ctx: HandlerContext, params: Value) -> Result<Value> {
        let filter: CookieFilter = serde_json::from_value(params)?;
        let cookies = ctx.surface.get_cookies(filter).await?;
        Ok(json!({ "cookies": cookies }))
    }
}

pub struct SetCookie;

#[async_trait]
impl Handler for SetCookie {
    fn name(&self) -> &'static str {
        "tabs.setCookie"
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_str(params, "name")?;
        require_str(params, "value").map(|_| ())
    }

    async fn execute(&self, ctx: HandlerContext, params: Value) -> Result<Value> {
        let details: CookieDetails = serde_json::from_value(params)?;
        let cookie = ctx.surface.set_cookie(details).await?;
        Ok(json!({ "cookie": cookie }))
    }
}

pub struct DeleteCookie;

#[async_trait]
impl Handler for DeleteCookie {
    fn name(&self) -> &'static str {
        "tabs.deleteCookie"
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_str(params, "url")?;
        require_str(params, "name").map(|_| ())
    }

    async fn execute(&self, ctx: HandlerContext, params: Value) -> Result<Value> {
        let url = require_str(&params, "url")?;
        let name = require_str(&params, "name")?;
        ctx.surface.delete_cookie(url, name).await?;
        Ok(json!({ "success": true }))
    }
}
