//! `tabs.getAccessibilitySnapshot`: derive a filtered accessibility tree
//! from a captured DOM. Roles come from the explicit `role` attribute or a
//! static tag table; names follow the ARIA precedence chain; with
//! `interestingOnly`, structural wrappers with nothing to say are elided
//! and their lone interesting child is promoted.

use once_cell::sync::Lazy;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

use tabwire_browser::RawNode;

static TAG_ROLES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("html", "document"),
        ("main", "main"),
        ("nav", "navigation"),
        ("header", "banner"),
        ("footer", "contentinfo"),
        ("aside", "complementary"),
        ("section", "region"),
        ("article", "article"),
        ("form", "form"),
        ("search", "search"),
        ("button", "button"),
        ("summary", "button"),
        ("textarea", "textbox"),
        ("select", "combobox"),
        ("option", "option"),
        ("table", "table"),
        ("thead", "rowgroup"),
        ("tbody", "rowgroup"),
        ("tfoot", "rowgroup"),
        ("tr", "row"),
        ("th", "columnheader"),
        ("td", "cell"),
        ("ul", "list"),
        ("ol", "list"),
        ("li", "listitem"),
        ("img", "img"),
        ("dialog", "dialog"),
        ("progress", "progressbar"),
        ("hr", "separator"),
        ("fieldset", "group"),
        ("details", "group"),
        ("h1", "heading"),
        ("h2", "heading"),
        ("h3", "heading"),
        ("h4", "heading"),
        ("h5", "heading"),
        ("h6", "heading"),
    ])
});

/// Tags whose accessible name may come from their text content.
const NAME_FROM_CONTENT: &[&str] = &[
    "a", "button", "summary", "option", "label", "legend", "caption", "th", "td", "li",
    "h1", "h2", "h3", "h4", "h5", "h6",
];

/// Build the snapshot for a captured subtree. Returns `None` when the
/// whole subtree is uninteresting under `interesting_only`.
pub fn build(root: &RawNode, interesting_only: bool) -> Option<Value> {
    node_snapshot(root, root, interesting_only)
}

fn node_snapshot(root: &RawNode, node: &RawNode, interesting_only: bool) -> Option<Value> {
    if is_a11y_hidden(node) {
        return None;
    }

    let role = role_of(node);
    let name = accessible_name(root, node);
    let properties = properties_of(node);

    let children: Vec<Value> = node
        .children
        .iter()
        .filter_map(|child| node_snapshot(root, child, interesting_only))
        .collect();

    let interesting = role.is_some() || name.is_some() || !properties.is_empty();
    if interesting_only && !interesting {
        return match children.len() {
            0 => None,
            1 => Some(children.into_iter().next().unwrap_or(Value::Null)),
            _ => Some(json!({ "role": "generic", "children": children })),
        };
    }

    let mut out = Map::new();
    if let Some(role) = role {
        out.insert("role".to_string(), Value::String(role));
    }
    if let Some(name) = name {
        out.insert("name".to_string(), Value::String(name));
    }
    for (key, value) in properties {
        out.insert(key, value);
    }
    if !children.is_empty() {
        out.insert("children".to_string(), Value::Array(children));
    }
    Some(Value::Object(out))
}

fn is_a11y_hidden(node: &RawNode) -> bool {
    node.attr("aria-hidden") == Some("true")
        || node.has_attr("hidden")
        || (node.tag == "input" && node.attr("type") == Some("hidden"))
        || matches!(node.tag.as_str(), "script" | "style" | "template" | "noscript")
}

fn role_of(node: &RawNode) -> Option<String> {
    if let Some(role) = node.attr("role").filter(|r| !r.is_empty()) {
        return Some(role.to_string());
    }
    match node.tag.as_str() {
        "a" => node.has_attr("href").then(|| "link".to_string()),
        "input" => Some(input_role(node.attr("type").unwrap_or("text")).to_string()),
        "select" => {
            if node.has_attr("multiple") {
                Some("listbox".to_string())
            } else {
                Some("combobox".to_string())
            }
        }
        tag => TAG_ROLES.get(tag).map(|r| r.to_string()),
    }
}

fn input_role(input_type: &str) -> &'static str {
    match input_type {
        "checkbox" => "checkbox",
        "radio" => "radio",
        "range" => "slider",
        "number" => "spinbutton",
        "search" => "searchbox",
        "button" | "submit" | "reset" | "image" => "button",
        _ => "textbox",
    }
}

/// aria-label, aria-labelledby, associated `<label for>`, alt,
/// placeholder, title, then (for content-named tags) text content.
fn accessible_name(root: &RawNode, node: &RawNode) -> Option<String> {
    if let Some(label) = node.attr("aria-label").filter(|s| !s.is_empty()) {
        return Some(label.to_string());
    }
    if let Some(ids) = node.attr("aria-labelledby") {
        let name = ids
            .split_whitespace()
            .filter_map(|id| root.find_by_id(id))
            .map(RawNode::text_content)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if !name.is_empty() {
            return Some(name);
        }
    }
    if let Some(id) = node.attr("id") {
        if let Some(label) = find_label_for(root, id) {
            let text = label.text_content();
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    for attr in ["alt", "placeholder", "title"] {
        if let Some(value) = node.attr(attr).filter(|s| !s.is_empty()) {
            return Some(value.to_string());
        }
    }
    if NAME_FROM_CONTENT.contains(&node.tag.as_str()) {
        let text = node.text_content();
        if !text.is_empty() {
            return Some(text);
        }
    }
    None
}

fn find_label_for<'a>(root: &'a RawNode, target_id: &str) -> Option<&'a RawNode> {
    if root.tag == "label" && root.attr("for") == Some(target_id) {
        return Some(root);
    }
    root.children
        .iter()
        .find_map(|c| find_label_for(c, target_id))
}

/// ARIA state flags flattened onto the node, with `"true"/"false"` strings
/// normalized to booleans.
fn properties_of(node: &RawNode) -> Vec<(String, Value)> {
    let mut out = Vec::new();

    if node.tag.len() == 2 && node.tag.starts_with('h') {
        if let Ok(level) = node.tag[1..].parse::<u8>() {
            out.push(("level".to_string(), json!(level)));
        }
    } else if let Some(level) = node.attr("aria-level").and_then(|v| v.parse::<u8>().ok()) {
        out.push(("level".to_string(), json!(level)));
    }

    for (attr, key) in [
        ("aria-expanded", "expanded"),
        ("aria-selected", "selected"),
        ("aria-pressed", "pressed"),
        ("aria-checked", "checked"),
        ("aria-disabled", "disabled"),
        ("aria-required", "required"),
        ("aria-busy", "busy"),
    ] {
        if let Some(raw) = node.attr(attr) {
            out.push((key.to_string(), normalize_flag(raw)));
        }
    }

    if let Some(popup) = node.attr("aria-haspopup").filter(|s| !s.is_empty()) {
        out.push(("haspopup".to_string(), json!(popup)));
    }

    // Native form-control state where no ARIA override was emitted.
    if node.has_attr("checked") && !node.has_attr("aria-checked") {
        out.push(("checked".to_string(), json!(true)));
    }
    if node.has_attr("required") && !node.has_attr("aria-required") {
        out.push(("required".to_string(), json!(true)));
    }
    if node.has_attr("disabled") && !node.has_attr("aria-disabled") {
        out.push(("disabled".to_string(), json!(true)));
    }
    if let Some(value) = node.attr("value").filter(|s| !s.is_empty()) {
        if matches!(node.tag.as_str(), "input" | "textarea" | "select" | "option") {
            out.push(("value".to_string(), json!(value)));
        }
    }

    out
}

fn normalize_flag(raw: &str) -> Value {
    match raw {
        "true" => json!(true),
        "false" => json!(false),
        other => json!(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn el(tag: &str, attrs: &[(&str, &str)], text: Option<&str>, children: Vec<RawNode>) -> RawNode {
        RawNode {
            tag: tag.to_string(),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
            text: text.map(String::from),
            rect: None,
            children,
        }
    }

    #[test]
    fn test_roles_and_names_from_tags() {
        let tree = el(
            "main",
            &[],
            None,
            vec![
                el("h1", &[], Some("Welcome"), vec![]),
                el("button", &[], Some("Submit"), vec![]),
            ],
        );
        let snapshot = build(&tree, true).unwrap();
        assert_eq!(snapshot["role"], "main");
        assert_eq!(
            snapshot["children"][0],
            json!({"role": "heading", "name": "Welcome", "level": 1})
        );
        assert_eq!(
            snapshot["children"][1],
            json!({"role": "button", "name": "Submit"})
        );
    }

    #[test]
    fn test_aria_flags_normalized_to_booleans() {
        let tree = el(
            "button",
            &[("aria-expanded", "false"), ("aria-haspopup", "menu")],
            Some("Menu"),
            vec![],
        );
        let snapshot = build(&tree, true).unwrap();
        assert_eq!(
            snapshot,
            json!({"role": "button", "name": "Menu", "expanded": false, "haspopup": "menu"})
        );
    }

    #[test]
    fn test_form_control_state() {
        let tree = el(
            "form",
            &[],
            None,
            vec![
                el("label", &[("for", "email")], Some("Email"), vec![]),
                el(
                    "input",
                    &[("id", "email"), ("type", "text"), ("required", ""), ("value", "user@example.com")],
                    None,
                    vec![],
                ),
                el(
                    "input",
                    &[("type", "checkbox"), ("checked", ""), ("aria-label", "Subscribe to newsletter")],
                    None,
                    vec![],
                ),
            ],
        );
        let snapshot = build(&tree, true).unwrap();
        let textbox = &snapshot["children"][1];
        assert_eq!(textbox["role"], "textbox");
        assert_eq!(textbox["name"], "Email");
        assert_eq!(textbox["required"], true);
        assert_eq!(textbox["value"], "user@example.com");
        let checkbox = &snapshot["children"][2];
        assert_eq!(checkbox["role"], "checkbox");
        assert_eq!(checkbox["name"], "Subscribe to newsletter");
        assert_eq!(checkbox["checked"], true);
    }

    #[test]
    fn test_wrapper_with_one_interesting_child_is_promoted() {
        let tree = el(
            "main",
            &[],
            None,
            vec![el(
                "div",
                &[],
                None,
                vec![el(
                    "div",
                    &[],
                    None,
                    vec![el("button", &[], Some("Deep"), vec![])],
                )],
            )],
        );
        let snapshot = build(&tree, true).unwrap();
        // Both wrapper divs collapse away.
        assert_eq!(
            snapshot["children"][0],
            json!({"role": "button", "name": "Deep"})
        );
    }

    #[test]
    fn test_wrapper_with_nothing_interesting_is_elided() {
        let tree = el(
            "main",
            &[],
            None,
            vec![
                el("div", &[], None, vec![el("span", &[], None, vec![])]),
                el("button", &[], Some("Only"), vec![]),
            ],
        );
        let snapshot = build(&tree, true).unwrap();
        let children = snapshot["children"].as_array().unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0]["name"], "Only");
    }

    #[test]
    fn test_full_tree_keeps_wrappers() {
        let tree = el(
            "main",
            &[],
            None,
            vec![el(
                "div",
                &[],
                None,
                vec![el("button", &[], Some("Inside"), vec![])],
            )],
        );
        let snapshot = build(&tree, false).unwrap();
        // The div survives, role-less, with its child intact.
        let wrapper = &snapshot["children"][0];
        assert!(wrapper.get("role").is_none());
        assert_eq!(wrapper["children"][0]["name"], "Inside");
    }

    #[test]
    fn test_hidden_subtrees_are_dropped() {
        let tree = el(
            "main",
            &[],
            None,
            vec![
                el("div", &[("aria-hidden", "true")], None, vec![
                    el("button", &[], Some("Invisible"), vec![]),
                ]),
                el("button", &[], Some("Visible"), vec![]),
            ],
        );
        let snapshot = build(&tree, true).unwrap();
        let children = snapshot["children"].as_array().unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0]["name"], "Visible");
    }

    #[test]
    fn test_explicit_role_wins_over_tag() {
        let tree = el("div", &[("role", "navigation"), ("aria-label", "Primary")], None, vec![]);
        let snapshot = build(&tree, true).unwrap();
        assert_eq!(snapshot, json!({"role": "navigation", "name": "Primary"}));
    }
}
