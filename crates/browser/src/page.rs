//! The closed vocabulary of page-side operations.
//!
//! Handlers never ship free-form DOM code (except `Eval`, which carries the
//! driver's own script); everything else is a named function with typed
//! arguments. `source()` renders the CDP `Runtime.evaluate` expression for
//! backends that reach the page by script injection; a live page agent
//! receives the same operation by name instead.

use serde_json::{Map, Value};

#[derive(Debug, Clone)]
pub enum PageFunction {
    /// Driver-supplied script body (`tabs.executeScript`).
    Eval { script: String },
    SelectorExists { selector: String },
    DocumentComplete,
    ExtractText { selector: Option<String> },
    FindElements { selector: String },
    Click { selector: String, index: usize },
    TypeText { selector: String, text: String, append: bool },
    Scroll { x: f64, y: f64, behavior: String },
    GetLocalStorage { key: Option<String> },
    SetLocalStorage { key: String, value: String },
    ClearLocalStorage,
    GetSessionStorage { key: Option<String> },
    SetSessionStorage { key: String, value: String },
    ClearSessionStorage,
    /// Capture the element tree (tag, attributes, direct text, rect) under
    /// `root` (whole document when `None`). Feeds the broker-side analyses.
    DomSnapshot { root: Option<String> },
    ElementInfo { selector: String, include_styles: bool },
    Highlight {
        selector: String,
        outline: Option<String>,
        background: Option<String>,
        duration_ms: Option<u64>,
    },
    SimulateEvent { selector: String, event_type: String, options: Value },
    ExtractStructuredData {
        row_selector: String,
        column_selectors: Map<String, Value>,
        extract_attribute: Option<String>,
    },
    ObserveMutations {
        selector: Option<String>,
        options: Value,
        max_mutations: usize,
        timeout_ms: Option<u64>,
    },
    InjectCss { style_id: Option<String>, css: String },
    RemoveCss { style_id: String },
}

fn js_str(s: &str) -> String {
    // serde_json escaping is valid JS string literal escaping.
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

fn js_opt_str(s: &Option<String>) -> String {
    match s {
        Some(s) => js_str(s),
        None => "null".to_string(),
    }
}

impl PageFunction {
    /// Command name on the agent leg (pull-style dispatch).
    pub fn agent_command(&self) -> &'static str {
        match self {
            PageFunction::Eval { .. } => "eval",
            PageFunction::SelectorExists { .. } => "selectorExists",
            PageFunction::DocumentComplete => "documentComplete",
            PageFunction::ExtractText { .. } => "extractText",
            PageFunction::FindElements { .. } => "findElements",
            PageFunction::Click { .. } => "click",
            PageFunction::TypeText { .. } => "type",
            PageFunction::Scroll { .. } => "scroll",
            PageFunction::GetLocalStorage { .. } => "getLocalStorage",
            PageFunction::SetLocalStorage { .. } => "setLocalStorage",
            PageFunction::ClearLocalStorage => "clearLocalStorage",
            PageFunction::GetSessionStorage { .. } => "getSessionStorage",
            PageFunction::SetSessionStorage { .. } => "setSessionStorage",
            PageFunction::ClearSessionStorage => "clearSessionStorage",
            PageFunction::DomSnapshot { .. } => "domSnapshot",
            PageFunction::ElementInfo { .. } => "getElementInfo",
            PageFunction::Highlight { .. } => "highlightElement",
            PageFunction::SimulateEvent { .. } => "simulateEvent",
            PageFunction::ExtractStructuredData { .. } => "extractStructuredData",
            PageFunction::ObserveMutations { .. } => "observeMutations",
            PageFunction::InjectCss { .. } => "injectCSS",
            PageFunction::RemoveCss { .. } => "removeCSS",
        }
    }

    /// JS expression evaluated in the page for script-injection backends.
    pub fn source(&self) -> String {
        match self {
            PageFunction::Eval { script } => {
                format!("(() => {{ {} }})()", script)
            }
            PageFunction::SelectorExists { selector } => {
                format!("document.querySelector({}) !== null", js_str(selector))
            }
            PageFunction::DocumentComplete => {
                "document.readyState === 'complete'".to_string()
            }
            PageFunction::ExtractText { selector } => format!(
                "((sel) => {{ if (sel) {{ return Array.from(document.querySelectorAll(sel)).map(el => el.textContent); }} return document.body.textContent; }})({})",
                js_opt_str(selector)
            ),
            PageFunction::FindElements { selector } => format!(
                "Array.from(document.querySelectorAll({})).map((el, index) => ({{ index, tagName: el.tagName, id: el.id, className: el.className, text: (el.textContent || '').substring(0, 100), attributes: Array.from(el.attributes).reduce((acc, a) => {{ acc[a.name] = a.value; return acc; }}, {{}}), rect: el.getBoundingClientRect() }}))",
                js_str(selector)
            ),
            PageFunction::Click { selector, index } => format!(
                "((sel, i) => {{ const el = document.querySelectorAll(sel)[i]; if (el) {{ el.click(); return true; }} return false; }})({}, {})",
                js_str(selector),
                index
            ),
            PageFunction::TypeText { selector, text, append } => format!(
                "((sel, text, append) => {{ const el = document.querySelector(sel); if (el && (el.tagName === 'INPUT' || el.tagName === 'TEXTAREA')) {{ el.value = append ? el.value + text : text; el.dispatchEvent(new Event('input', {{ bubbles: true }})); el.dispatchEvent(new Event('change', {{ bubbles: true }})); return true; }} return false; }})({}, {}, {})",
                js_str(selector),
                js_str(text),
                append
            ),
            PageFunction::Scroll { x, y, behavior } => format!(
                "(() => {{ window.scrollTo({{ left: {}, top: {}, behavior: {} }}); return {{ x: window.scrollX, y: window.scrollY }}; }})()",
                x,
                y,
                js_str(behavior)
            ),
            PageFunction::GetLocalStorage { key } => format!(
                "((key) => key ? {{ [key]: localStorage.getItem(key) }} : {{ ...localStorage }})({})",
                js_opt_str(key)
            ),
            PageFunction::SetLocalStorage { key, value } => format!(
                "(() => {{ localStorage.setItem({}, {}); return true; }})()",
                js_str(key),
                js_str(value)
            ),
            PageFunction::ClearLocalStorage => {
                "(() => { localStorage.clear(); return true; })()".to_string()
            }
            PageFunction::GetSessionStorage { key } => format!(
                "((key) => key ? {{ [key]: sessionStorage.getItem(key) }} : {{ ...sessionStorage }})({})",
                js_opt_str(key)
            ),
            PageFunction::SetSessionStorage { key, value } => format!(
                "(() => {{ sessionStorage.setItem({}, {}); return true; }})()",
                js_str(key),
                js_str(value)
            ),
            PageFunction::ClearSessionStorage => {
                "(() => { sessionStorage.clear(); return true; })()".to_string()
            }
            PageFunction::DomSnapshot { root } => format!(
                "((rootSel) => {{ const root = rootSel ? document.querySelector(rootSel) : document.documentElement; if (!root) return null; const walk = (el) => {{ const attrs = {{}}; for (const a of el.attributes) attrs[a.name] = a.value; const r = el.getBoundingClientRect(); let text = ''; for (const n of el.childNodes) if (n.nodeType === 3) text += n.textContent; return {{ tag: el.tagName.toLowerCase(), attrs, text: text || null, rect: {{ x: r.x, y: r.y, width: r.width, height: r.height }}, children: Array.from(el.children).map(walk) }}; }}; return walk(root); }})({})",
                js_opt_str(root)
            ),
            PageFunction::ElementInfo { selector, include_styles } => format!(
                "((sel, includeStyles) => {{ const el = document.querySelector(sel); if (!el) return null; const rect = el.getBoundingClientRect(); const styles = window.getComputedStyle(el); return {{ tagName: el.tagName, id: el.id, className: el.className, textContent: el.textContent, value: el.value, href: el.href, disabled: el.disabled, checked: el.checked, rect: {{ top: rect.top, left: rect.left, width: rect.width, height: rect.height }}, isVisible: rect.width > 0 && rect.height > 0 && styles.display !== 'none' && styles.visibility !== 'hidden', styles: includeStyles ? {{ display: styles.display, visibility: styles.visibility, position: styles.position, opacity: styles.opacity }} : null, attributes: Array.from(el.attributes).reduce((acc, a) => {{ acc[a.name] = a.value; return acc; }}, {{}}) }}; }})({}, {})",
                js_str(selector),
                include_styles
            ),
            PageFunction::Highlight { selector, outline, background, duration_ms } => format!(
                "((sel, outline, bg, duration) => {{ const els = document.querySelectorAll(sel); const saved = []; els.forEach(el => {{ saved.push([el, el.style.outline, el.style.backgroundColor]); el.style.outline = outline || '2px solid red'; if (bg) el.style.backgroundColor = bg; }}); if (duration) setTimeout(() => saved.forEach(([el, o, b]) => {{ el.style.outline = o; el.style.backgroundColor = b; }}), duration); return {{ count: els.length }}; }})({}, {}, {}, {})",
                js_str(selector),
                js_opt_str(outline),
                js_opt_str(background),
                duration_ms.map(|d| d.to_string()).unwrap_or_else(|| "null".to_string())
            ),
            PageFunction::SimulateEvent { selector, event_type, options } => format!(
                "((sel, type, opts) => {{ const el = document.querySelector(sel); if (!el) throw new Error('Element not found'); const base = {{ bubbles: true, cancelable: true, ...opts }}; let ev; if (type.startsWith('mouse')) ev = new MouseEvent(type, base); else if (type.startsWith('key')) ev = new KeyboardEvent(type, base); else if (type === 'focus' || type === 'blur') ev = new FocusEvent(type, base); else ev = new Event(type, base); el.dispatchEvent(ev); return {{ success: true }}; }})({}, {}, {})",
                js_str(selector),
                js_str(event_type),
                options
            ),
            PageFunction::ExtractStructuredData { row_selector, column_selectors, extract_attribute } => format!(
                "((rowSel, cols, attr) => {{ const data = []; document.querySelectorAll(rowSel).forEach(row => {{ const rowData = {{}}; for (const [key, sel] of Object.entries(cols)) {{ const el = row.querySelector(sel); if (el) rowData[key] = attr ? el.getAttribute(attr) : el.textContent.trim(); }} if (Object.keys(rowData).length > 0) data.push(rowData); }}); return {{ data }}; }})({}, {}, {})",
                js_str(row_selector),
                Value::Object(column_selectors.clone()),
                js_opt_str(extract_attribute)
            ),
            PageFunction::ObserveMutations { selector, options, max_mutations, timeout_ms } => format!(
                "((sel, opts, max, timeout) => new Promise((resolve) => {{ const target = sel ? document.querySelector(sel) : document.body; if (!target) {{ resolve(null); return; }} const mutations = []; const observer = new MutationObserver((list) => {{ list.forEach(m => mutations.push({{ type: m.type, target: m.target.tagName, attributeName: m.attributeName, addedNodes: m.addedNodes.length, removedNodes: m.removedNodes.length }})); if (mutations.length >= max) {{ observer.disconnect(); resolve({{ mutations }}); }} }}); observer.observe(target, {{ attributes: true, childList: true, subtree: true, ...opts }}); setTimeout(() => {{ observer.disconnect(); resolve({{ mutations }}); }}, timeout || 5000); }}))({}, {}, {}, {})",
                js_opt_str(selector),
                options,
                max_mutations,
                timeout_ms.map(|t| t.to_string()).unwrap_or_else(|| "null".to_string())
            ),
            PageFunction::InjectCss { style_id, css } => format!(
                "((id, css) => {{ const styleId = id || 'injected-style-' + Date.now(); let el = document.getElementById(styleId); if (!el) {{ el = document.createElement('style'); el.id = styleId; document.head.appendChild(el); }} el.textContent = css; return {{ styleId }}; }})({}, {})",
                js_opt_str(style_id),
                js_str(css)
            ),
            PageFunction::RemoveCss { style_id } => format!(
                "((id) => {{ const el = document.getElementById(id); if (!el) throw new Error('Style not found'); el.remove(); return {{ success: true }}; }})({})",
                js_str(style_id)
            ),
        }
    }

    /// Params object for the agent leg rendering of the same operation.
    pub fn agent_params(&self) -> Value {
        use serde_json::json;
        match self {
            PageFunction::Eval { script } => json!({ "script": script }),
            PageFunction::SelectorExists { selector } => json!({ "selector": selector }),
            PageFunction::DocumentComplete => json!({}),
            PageFunction::ExtractText { selector } => json!({ "selector": selector }),
            PageFunction::FindElements { selector } => json!({ "selector": selector }),
            PageFunction::Click { selector, index } => {
                json!({ "selector": selector, "index": index })
            }
            PageFunction::TypeText { selector, text, append } => {
                json!({ "selector": selector, "text": text, "append": append })
            }
            PageFunction::Scroll { x, y, behavior } => {
                json!({ "x": x, "y": y, "behavior": behavior })
            }
            PageFunction::GetLocalStorage { key } | PageFunction::GetSessionStorage { key } => {
                json!({ "key": key })
            }
            PageFunction::SetLocalStorage { key, value }
            | PageFunction::SetSessionStorage { key, value } => {
                json!({ "key": key, "value": value })
            }
            PageFunction::ClearLocalStorage | PageFunction::ClearSessionStorage => json!({}),
            PageFunction::DomSnapshot { root } => json!({ "root": root }),
            PageFunction::ElementInfo { selector, include_styles } => {
                json!({ "selector": selector, "includeStyles": include_styles })
            }
            PageFunction::Highlight { selector, outline, background, duration_ms } => json!({
                "selector": selector,
                "outline": outline,
                "backgroundColor": background,
                "duration": duration_ms,
            }),
            PageFunction::SimulateEvent { selector, event_type, options } => {
                json!({ "selector": selector, "eventType": event_type, "options": options })
            }
            PageFunction::ExtractStructuredData {
                row_selector,
                column_selectors,
                extract_attribute,
            } => json!({
                "rowSelector": row_selector,
                "columnSelectors": Value::Object(column_selectors.clone()),
                "extractAttribute": extract_attribute,
            }),
            PageFunction::ObserveMutations { selector, options, max_mutations, timeout_ms } => {
                json!({
                    "selector": selector,
                    "options": options,
                    "maxMutations": max_mutations,
                    "timeout": timeout_ms,
                })
            }
            PageFunction::InjectCss { style_id, css } => {
                json!({ "id": style_id, "css": css })
            }
            PageFunction::RemoveCss { style_id } => json!({ "styleId": style_id }),
        }
    }
}
