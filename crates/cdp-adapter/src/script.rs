//! In-page scripts used to resolve selectors
//!
//! Every selector form is resolved by a script that finds the first visible
//! match, tags it with a one-off marker attribute and returns a CSS selector
//! for that marker. Later clicks and fills address the element through the
//! marker, so text, role and xpath selectors all end up as plain CSS.

use action_primitives::SelectorExpr;
use serde_json::Value;
use uuid::Uuid;

/// Attribute written onto resolved elements
pub const HANDLE_ATTR: &str = "data-healwright-handle";

/// Quote `input` as a JavaScript string literal
pub(crate) fn js_string(input: &str) -> String {
    Value::String(input.to_string()).to_string()
}

/// Fresh marker token for one resolution
pub fn new_token(expr: &SelectorExpr) -> String {
    format!("{}-{}", expr.kind(), Uuid::new_v4().simple())
}

/// Script that marks the first visible element matching `expr` with `token`
pub fn marking_script(expr: &SelectorExpr, token: &str) -> String {
    format!(
        r#"(() => {{
            const attr = {attr};
            const token = {token};
            const normalize = (input) => (input || '').replace(/\s+/g, ' ').trim();
            const lower = (input) => normalize(input).toLowerCase();
            const isVisible = (el) => {{
                if (!(el instanceof Element)) return false;
                const style = window.getComputedStyle(el);
                if (style.visibility === 'hidden' || style.display === 'none') return false;
                const rect = el.getBoundingClientRect();
                return rect.width > 0 || rect.height > 0 || el.getClientRects().length > 0;
            }};
            let nodes;
            try {{
                nodes = {finder};
            }} catch (err) {{
                return {{ status: 'invalid', message: String(err) }};
            }}
            const match = nodes.find(isVisible);
            if (!match) {{
                return {{ status: 'not-found' }};
            }}
            match.setAttribute(attr, token);
            return {{ status: 'ok', selector: '[' + attr + '="' + token + '"]' }};
        }})()"#,
        attr = js_string(HANDLE_ATTR),
        token = js_string(token),
        finder = finder(expr),
    )
}

fn finder(expr: &SelectorExpr) -> String {
    match expr {
        SelectorExpr::Css(css) => {
            format!("Array.from(document.querySelectorAll({}))", js_string(css))
        }
        SelectorExpr::Id(id) => format!(
            "(() => {{ const el = document.getElementById({}); return el ? [el] : []; }})()",
            js_string(id)
        ),
        SelectorExpr::XPath(xpath) => format!(
            r#"(() => {{
                const result = document.evaluate({}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
                const out = [];
                for (let i = 0; i < result.snapshotLength; i++) out.push(result.snapshotItem(i));
                return out;
            }})()"#,
            js_string(xpath)
        ),
        SelectorExpr::Text { content, exact } => format!(
            r#"(() => {{
                const target = lower({content});
                const exact = {exact};
                const all = Array.from(document.querySelectorAll('body *')).filter(el => {{
                    const value = lower(el.innerText || el.textContent || '');
                    if (!value) return false;
                    return exact ? value === target : value.includes(target);
                }});
                return all.filter(el => !all.some(other => other !== el && el.contains(other)));
            }})()"#,
            content = js_string(content),
            exact = if *exact { "true" } else { "false" },
        ),
        SelectorExpr::Role { role, name } => format!(
            r#"(() => {{
                const role = {role};
                const targetName = {name};
                const implicit = {{
                    button: 'button, input[type=button], input[type=submit], input[type=reset]',
                    link: 'a[href]',
                    textbox: 'input:not([type]), input[type=text], input[type=email], input[type=password], input[type=search], input[type=tel], input[type=url], textarea',
                    checkbox: 'input[type=checkbox]',
                    radio: 'input[type=radio]',
                    combobox: 'select',
                    heading: 'h1, h2, h3, h4, h5, h6',
                }};
                const computeName = (el) => {{
                    const label = el.getAttribute('aria-label');
                    if (label) return label;
                    const labelledby = el.getAttribute('aria-labelledby');
                    if (labelledby) {{
                        return labelledby.split(/\s+/)
                            .map(id => document.getElementById(id))
                            .map(node => node ? (node.textContent || '') : '')
                            .join(' ');
                    }}
                    if (el.id) {{
                        const forLabel = document.querySelector('label[for="' + CSS.escape(el.id) + '"]');
                        if (forLabel) return forLabel.textContent || '';
                    }}
                    if (el.placeholder) return el.placeholder;
                    if (el.title) return el.title;
                    if (el.tagName === 'INPUT' && el.value) return el.value;
                    return el.innerText || el.textContent || '';
                }};
                let query = '[role="' + role + '"]';
                if (implicit[role]) query += ', ' + implicit[role];
                const candidates = Array.from(document.querySelectorAll(query));
                if (targetName === null) return candidates;
                return candidates.filter(el => lower(computeName(el)) === lower(targetName));
            }})()"#,
            role = js_string(role),
            name = name
                .as_deref()
                .map(js_string)
                .unwrap_or_else(|| "null".to_string()),
        ),
    }
}

/// Outcome of a marking script
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkResult {
    /// Element tagged; the selector addresses it
    Marked(String),
    NotFound,
    /// The browser rejected the selector
    Invalid(String),
}

/// Interpret the value returned by [`marking_script`]
pub fn extract_selector(value: &Value) -> MarkResult {
    match value.get("status").and_then(Value::as_str) {
        Some("ok") => value
            .get("selector")
            .and_then(Value::as_str)
            .map(|selector| MarkResult::Marked(selector.to_string()))
            .unwrap_or(MarkResult::NotFound),
        Some("invalid") => MarkResult::Invalid(
            value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("selector rejected by the page")
                .to_string(),
        ),
        _ => MarkResult::NotFound,
    }
}

/// Function body that clears an input and moves focus to it
pub(crate) const CLEAR_FN: &str = r#"function() {
    this.focus();
    if ('value' in this) { this.value = ''; }
    else if (this.isContentEditable) { this.textContent = ''; }
    this.dispatchEvent(new Event('input', { bubbles: true }));
}"#;

/// Function body that reports whether an element accepts typed input
pub(crate) const EDITABLE_FN: &str = r#"function() {
    if (this.isContentEditable) return true;
    const tag = (this.tagName || '').toLowerCase();
    if (tag !== 'input' && tag !== 'textarea') return false;
    return !this.disabled && !this.readOnly;
}"#;

/// Function body that fires the events frameworks listen for after typing
pub(crate) const COMMIT_FN: &str = r#"function() {
    this.dispatchEvent(new Event('input', { bubbles: true }));
    this.dispatchEvent(new Event('change', { bubbles: true }));
}"#;

/// Function body returning the element's current value
pub(crate) const READ_VALUE_FN: &str = r#"function() {
    if ('value' in this) return String(this.value ?? '');
    return this.isContentEditable ? (this.textContent || '') : '';
}"#;
