//! Frame-scoped targeting: `iframe#panel >>> button` addresses an element
//! inside a frame, with arbitrary nesting. The frame part is a selector for
//! the iframe element in its parent document; it is resolved to a frame id
//! by matching the iframe's `src` against the tab's frame list.

use serde_json::Value;

use tabwire_browser::{
    first_frame_result, PageFunction, ScriptInjection, ScriptWorld, TabId,
};
use tabwire_core::{Error, Result};

use crate::HandlerContext;

const FRAME_DELIMITER: &str = ">>>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSelector {
    /// Iframe-element selectors, outermost first. Empty for an unscoped
    /// selector.
    pub frames: Vec<String>,
    pub element: String,
}

pub fn parse_frame_selector(selector: &str) -> FrameSelector {
    if !selector.contains(FRAME_DELIMITER) {
        return FrameSelector {
            frames: Vec::new(),
            element: selector.to_string(),
        };
    }
    let mut parts: Vec<String> = selector
        .split(FRAME_DELIMITER)
        .map(|s| s.trim().to_string())
        .collect();
    let element = parts.pop().unwrap_or_default();
    FrameSelector {
        frames: parts,
        element,
    }
}

/// Build an injection for a possibly frame-scoped selector. Unscoped
/// selectors run in the main frame; scoped ones walk the iframe chain,
/// resolving each hop to a frame id before the final function is injected.
pub async fn scoped_injection(
    ctx: &HandlerContext,
    tab_id: TabId,
    selector: &str,
    build: impl FnOnce(String) -> PageFunction,
) -> Result<ScriptInjection> {
    let parsed = parse_frame_selector(selector);
    if parsed.frames.is_empty() {
        return Ok(ScriptInjection::main_frame(tab_id, build(parsed.element)));
    }

    let mut current_frame: Option<i64> = None;
    for frame_sel in &parsed.frames {
        current_frame = Some(resolve_frame(ctx, tab_id, current_frame, frame_sel).await?);
    }

    Ok(ScriptInjection {
        tab_id,
        func: build(parsed.element),
        world: ScriptWorld::Isolated,
        frame_id: current_frame,
        all_frames: false,
    })
}

/// Find the frame id for an iframe element matched by `frame_sel` inside
/// `parent_frame`. The iframe's `src` is read from the parent document and
/// matched against the tab's frame list by URL.
async fn resolve_frame(
    ctx: &HandlerContext,
    tab_id: TabId,
    parent_frame: Option<i64>,
    frame_sel: &str,
) -> Result<i64> {
    let injection = ScriptInjection {
        tab_id,
        func: PageFunction::FindElements {
            selector: frame_sel.to_string(),
        },
        world: ScriptWorld::Isolated,
        frame_id: parent_frame,
        all_frames: false,
    };
    let matches = first_frame_result(ctx.bridge.execute_script(injection).await?);
    let src = matches
        .as_array()
        .and_then(|els| els.first())
        .and_then(|el| el.get("attributes"))
        .and_then(|attrs| attrs.get("src"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::NotFound(format!("frame matching '{}'", frame_sel)))?
        .to_string();

    let frames = ctx.surface.get_frames(tab_id).await?;
    // Exact URL match first; a substring match would hand back an ancestor
    // frame whose URL is a prefix of the iframe's src.
    frames
        .iter()
        .find(|f| f.url == src)
        .or_else(|| frames.iter().find(|f| f.url.contains(&src)))
        .map(|f| f.frame_id)
        .ok_or_else(|| Error::NotFound(format!("frame matching '{}'", frame_sel)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::testing::{context, StubSurface};
    use serde_json::json;
    use tabwire_browser::FrameInfo;

    #[tokio::test]
    async fn test_exact_frame_url_wins_over_ancestor_prefix() {
        let mut surface = StubSurface::new();
        surface.frames = vec![
            FrameInfo {
                frame_id: 0,
                parent_frame_id: None,
                url: "https://example.com".into(),
            },
            FrameInfo {
                frame_id: 3,
                parent_frame_id: Some(0),
                url: "https://example.com/embed/chat".into(),
            },
        ];
        let surface = Arc::new(surface);
        surface
            .script(Ok(json!([
                {"index": 0, "tagName": "IFRAME",
                 "attributes": {"src": "https://example.com/embed/chat"}}
            ])))
            .await;
        let ctx = context(surface);

        let injection = scoped_injection(&ctx, 1, "iframe.chat >>> input", |sel| {
            PageFunction::SelectorExists { selector: sel }
        })
        .await
        .unwrap();
        assert_eq!(injection.frame_id, Some(3));
    }

    #[test]
    fn test_plain_selector_is_unscoped() {
        let parsed = parse_frame_selector("#submit");
        assert!(parsed.frames.is_empty());
        assert_eq!(parsed.element, "#submit");
    }

    #[test]
    fn test_single_frame_hop() {
        let parsed = parse_frame_selector("iframe#myframe >>> .my-element");
        assert_eq!(parsed.frames, vec!["iframe#myframe"]);
        assert_eq!(parsed.element, ".my-element");
    }

    #[test]
    fn test_nested_frames() {
        let parsed = parse_frame_selector("iframe.outer >>> iframe.inner >>> button");
        assert_eq!(parsed.frames, vec!["iframe.outer", "iframe.inner"]);
        assert_eq!(parsed.element, "button");
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        let parsed = parse_frame_selector("frame[name='content']>>>  button ");
        assert_eq!(parsed.frames, vec!["frame[name='content']"]);
        assert_eq!(parsed.element, "button");
    }
}
