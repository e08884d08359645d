//! `tabs.getActionables`: scan a captured DOM tree for interactive
//! elements and emit numbered, selector-addressable descriptions a driver
//! can act on.

use serde::Serialize;
use serde_json::Value;

use tabwire_browser::RawNode;

const DESCRIPTION_MAX: usize = 100;

const INTERACTIVE_TAGS: &[&str] = &["a", "button", "input", "select", "textarea", "summary"];

const INTERACTIVE_ROLES: &[&str] = &[
    "button", "link", "checkbox", "radio", "menuitem", "menuitemcheckbox", "menuitemradio",
    "tab", "switch", "combobox", "listbox", "option", "slider", "searchbox", "textbox",
    "spinbutton",
];

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Actionable {
    pub label_number: usize,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub selector: String,
}

/// Walk the tree in document order collecting visible, enabled interactive
/// elements. Label numbers are sequential from 0 in encounter order.
pub fn scan(root: &RawNode) -> Vec<Actionable> {
    let mut out = Vec::new();
    let mut path: Vec<(&RawNode, usize)> = Vec::new();
    walk(root, root, &mut path, &mut out);
    out
}

pub fn scan_to_value(root: &RawNode) -> Value {
    serde_json::to_value(scan(root)).unwrap_or_else(|_| Value::Array(Vec::new()))
}

fn walk<'a>(
    root: &'a RawNode,
    node: &'a RawNode,
    path: &mut Vec<(&'a RawNode, usize)>,
    out: &mut Vec<Actionable>,
) {
    if is_actionable(node) && is_visible(node) && !node.is_disabled() {
        out.push(Actionable {
            label_number: out.len(),
            description: describe(node),
            kind: kind_of(node),
            selector: selector_for(root, node, path),
        });
    }
    for (index, child) in node.children.iter().enumerate() {
        path.push((node, index));
        walk(root, child, path, out);
        path.pop();
    }
}

fn is_actionable(node: &RawNode) -> bool {
    if INTERACTIVE_TAGS.contains(&node.tag.as_str()) {
        return node.attr("type") != Some("hidden");
    }
    if let Some(role) = node.attr("role") {
        if INTERACTIVE_ROLES.contains(&role) {
            return true;
        }
    }
    if let Some(tabindex) = node.attr("tabindex") {
        if tabindex != "-1" {
            return true;
        }
    }
    matches!(node.attr("contenteditable"), Some("true") | Some(""))
}

fn is_visible(node: &RawNode) -> bool {
    if node.attr("aria-hidden") == Some("true") || node.has_attr("hidden") {
        return false;
    }
    node.rect.map(|r| r.has_area()).unwrap_or(false)
}

/// What this element is, in selector-ish notation: `button`, `a`,
/// `input[type="email"]`, `div[role="button"]`.
fn kind_of(node: &RawNode) -> String {
    if node.tag == "input" {
        let input_type = node.attr("type").unwrap_or("text");
        return format!("input[type=\"{}\"]", input_type);
    }
    if !INTERACTIVE_TAGS.contains(&node.tag.as_str()) {
        if let Some(role) = node.attr("role") {
            return format!("{}[role=\"{}\"]", node.tag, role);
        }
    }
    node.tag.clone()
}

/// Human-facing label: aria-label, then visible text, then placeholder,
/// value, title, alt; links without any of those fall back to their href.
fn describe(node: &RawNode) -> String {
    let candidates = [
        node.attr("aria-label").map(str::to_string),
        Some(node.text_content()).filter(|t| !t.is_empty()),
        node.attr("placeholder").map(str::to_string),
        node.attr("value").map(str::to_string),
        node.attr("title").map(str::to_string),
        node.attr("alt").map(str::to_string),
    ];
    for candidate in candidates.into_iter().flatten() {
        if !candidate.is_empty() {
            return truncate(&candidate);
        }
    }
    if node.tag == "a" {
        if let Some(href) = node.attr("href") {
            return truncate(&format!("Link to: {}", href));
        }
    }
    String::new()
}

fn truncate(s: &str) -> String {
    if s.chars().count() <= DESCRIPTION_MAX {
        s.to_string()
    } else {
        s.chars().take(DESCRIPTION_MAX).collect()
    }
}

/// Selector strategy: `#id` when the element has one; otherwise its class
/// compound, qualified by ancestors until it matches uniquely; otherwise a
/// positional `parent > tag:nth-child(n)`.
fn selector_for(root: &RawNode, node: &RawNode, path: &[(&RawNode, usize)]) -> String {
    if let Some(id) = node.attr("id").filter(|id| !id.is_empty()) {
        return format!("#{}", css_escape(id));
    }

    if let Some(selector) = class_selector(root, node, path) {
        return selector;
    }

    positional_selector(node, path)
}

fn class_selector(root: &RawNode, node: &RawNode, path: &[(&RawNode, usize)]) -> Option<String> {
    let own = compound_of(node)?;
    if count_matches(root, &[own.clone()]) == 1 {
        return Some(own.render());
    }

    // Qualify with ancestors, nearest first. An ancestor with an id anchors
    // the selector and ends the walk.
    let mut chain = vec![own];
    for (ancestor, _) in path.iter().rev() {
        if let Some(id) = ancestor.attr("id").filter(|id| !id.is_empty()) {
            let rendered = chain
                .iter()
                .rev()
                .map(Compound::render)
                .collect::<Vec<_>>()
                .join(" ");
            return Some(format!("#{} {}", css_escape(id), rendered));
        }
        chain.push(Compound {
            tag: Some(ancestor.tag.clone()),
            classes: classes_of(ancestor),
        });
        if count_matches(root, &chain.iter().rev().cloned().collect::<Vec<_>>()) == 1 {
            let rendered = chain
                .iter()
                .rev()
                .map(Compound::render)
                .collect::<Vec<_>>()
                .join(" ");
            return Some(rendered);
        }
    }
    None
}

fn positional_selector(node: &RawNode, path: &[(&RawNode, usize)]) -> String {
    match path.last() {
        Some((parent, index)) => {
            let parent_part = match parent.attr("id").filter(|id| !id.is_empty()) {
                Some(id) => format!("#{}", css_escape(id)),
                None => parent.tag.clone(),
            };
            format!("{} > {}:nth-child({})", parent_part, node.tag, index + 1)
        }
        None => node.tag.clone(),
    }
}

#[derive(Debug, Clone)]
struct Compound {
    tag: Option<String>,
    classes: Vec<String>,
}

impl Compound {
    fn matches(&self, node: &RawNode) -> bool {
        if let Some(tag) = &self.tag {
            if &node.tag != tag {
                return false;
            }
        }
        let node_classes = classes_of(node);
        self.classes.iter().all(|c| node_classes.contains(c))
    }

    fn render(&self) -> String {
        let mut out = self.tag.clone().unwrap_or_default();
        for class in &self.classes {
            out.push('.');
            out.push_str(&css_escape(class));
        }
        out
    }
}

fn compound_of(node: &RawNode) -> Option<Compound> {
    let classes = classes_of(node);
    if classes.is_empty() {
        return None;
    }
    Some(Compound {
        tag: Some(node.tag.clone()),
        classes,
    })
}

fn classes_of(node: &RawNode) -> Vec<String> {
    node.attr("class")
        .map(|c| c.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

/// Count nodes matching a descendant-combined compound chain, outermost
/// compound first.
fn count_matches(root: &RawNode, chain: &[Compound]) -> usize {
    fn descend(node: &RawNode, chain: &[Compound], count: &mut usize) {
        match chain {
            [] => {}
            [last] => {
                if last.matches(node) {
                    *count += 1;
                }
                for child in &node.children {
                    descend(child, chain, count);
                }
            }
            [first, rest @ ..] => {
                if first.matches(node) {
                    // The remaining chain may match anywhere below.
                    for child in &node.children {
                        descend(child, rest, count);
                    }
                }
                for child in &node.children {
                    descend(child, chain, count);
                }
            }
        }
    }
    let mut count = 0;
    descend(root, chain, &mut count);
    count
}

fn css_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for (i, c) in raw.chars().enumerate() {
        let safe = c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii();
        if i == 0 && c.is_ascii_digit() {
            // A leading digit takes the hex form with a terminating space;
            // a bare backslash-digit would start a hex escape that swallows
            // the characters after it.
            out.push_str(&format!("\\{:x} ", c as u32));
        } else if safe {
            out.push(c);
        } else {
            out.push('\\');
            out.push(c);
        }
    }
    out
}
