//! Raw DOM capture returned by `PageFunction::DomSnapshot`.
//!
//! The page-side walker serializes each element as tag + attributes +
//! direct text + layout rect + children. The broker-side analyses
//! (actionables scan, accessibility snapshot) run entirely over this tree,
//! so a live agent connection and a one-shot injection produce identical
//! results.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Non-zero intersecting bounding box, the visibility test the
    /// actionables scan applies.
    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawNode {
    pub tag: String,
    pub attrs: HashMap<String, String>,
    /// Text directly under this element (not descendants).
    pub text: Option<String>,
    pub rect: Option<Rect>,
    pub children: Vec<RawNode>,
}

impl RawNode {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(|s| s.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.contains_key(name)
    }

    /// Whole-subtree text, whitespace-collapsed.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn collect_text(&self, out: &mut String) {
        if let Some(text) = &self.text {
            out.push_str(text);
            out.push(' ');
        }
        for child in &self.children {
            child.collect_text(out);
        }
    }

    /// Depth-first search for the first descendant (or self) matching a
    /// plain `#id` selector. Used to resolve the `root` parameter of the
    /// accessibility snapshot against an already-captured tree.
    pub fn find_by_id(&self, id: &str) -> Option<&RawNode> {
        if self.attr("id") == Some(id) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_by_id(id))
    }

    pub fn is_disabled(&self) -> bool {
        self.has_attr("disabled") || self.attr("aria-disabled") == Some("true")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(tag: &str, text: Option<&str>, children: Vec<RawNode>) -> RawNode {
        RawNode {
            tag: tag.to_string(),
            text: text.map(String::from),
            children,
            ..Default::default()
        }
    }

    #[test]
    fn test_text_content_collapses_whitespace() {
        let tree = node(
            "div",
            Some("  Hello \n"),
            vec![node("span", Some("world  "), vec![])],
        );
        assert_eq!(tree.text_content(), "Hello world");
    }

    #[test]
    fn test_find_by_id() {
        let mut inner = node("button", Some("Go"), vec![]);
        inner.attrs.insert("id".into(), "go-btn".into());
        let tree = node("div", None, vec![node("section", None, vec![inner])]);
        assert_eq!(tree.find_by_id("go-btn").map(|n| n.tag.as_str()), Some("button"));
        assert!(tree.find_by_id("missing").is_none());
    }

    #[test]
    fn test_rect_area() {
        assert!(Rect { x: 0.0, y: 0.0, width: 10.0, height: 4.0 }.has_area());
        assert!(!Rect { x: 5.0, y: 5.0, width: 0.0, height: 4.0 }.has_area());
    }
}
