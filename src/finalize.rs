//! Finalize Module
//!
//! Everything that runs after the walk: the deferred replacement log, head and
//! body script injection, `s:trans-fmt` formatting, and the finalizer that
//! strips engine scaffolding from client-bound output.

use markup5ever_rcdom::Handle;
use serde_json::{json, Value};
use tracing::debug;

use crate::component::{JIT_ATTR, SLOT_TAG};
use crate::directive::{is_directive_attr, DirectiveSet, Hook};
use crate::dom;
use crate::render::{TemplateRenderer, HIDE_ATTR};

pub const LOCALE_SCRIPT_NAME: &str = "sui-locale";
pub const DATA_SCRIPT_NAME: &str = "sui-data";

// ═══════════════════════════════════════════════════════════════════════════════
// REPLACEMENT LOG
// ═══════════════════════════════════════════════════════════════════════════════

/// `original -> replacements` edits recorded during the walk.
#[derive(Default)]
pub struct ReplacementLog {
    edits: Vec<(Handle, Vec<Handle>)>,
}

impl ReplacementLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, original: Handle, replacements: Vec<Handle>) {
        self.edits.push((original, replacements));
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Drain the log in record order.
    pub fn take(&mut self) -> Vec<(Handle, Vec<Handle>)> {
        std::mem::take(&mut self.edits)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// INJECTION
// ═══════════════════════════════════════════════════════════════════════════════

/// JSON safe to embed in a `<script>` body.
fn script_json(value: &Value) -> String {
    let encoded = serde_json::to_string(value).unwrap_or_else(|e| json!({ "error": e.to_string() }).to_string());
    encoded.replace("</", "<\\/")
}

pub fn head_injection_script(messages: &str) -> String {
    format!("window.__sui_locale = {};", messages)
}

pub fn body_injection_script(data: &str, debug: bool) -> String {
    format!("window.__sui_data = {};\nwindow.__sui_debug = {};", data, debug)
}

fn script_element(name: &str, body: &str) -> Handle {
    let script = dom::new_element("script", &[("name", name), ("type", "text/javascript")]);
    dom::append(&script, dom::new_text(body));
    script
}

impl TemplateRenderer {
    /// Splice every recorded replacement, in record order.
    pub(crate) fn apply_replacements(&mut self) {
        if self.replacements.is_empty() {
            return;
        }
        debug!(edits = self.replacements.len(), "applying replacements");
        for (original, nodes) in self.replacements.take() {
            if !dom::replace_with(&original, &nodes) {
                debug!(nodes = nodes.len(), "replacement target is detached, skipped");
            }
        }
    }

    pub(crate) fn inject(&mut self, root: &Handle) {
        if let Some(head) = dom::find_element(root, "head") {
            let messages = self
                .locale
                .as_ref()
                .map(|l| json!(l.script_messages))
                .unwrap_or_else(|| json!({}));
            dom::append(
                &head,
                script_element(LOCALE_SCRIPT_NAME, &head_injection_script(&script_json(&messages))),
            );
        }

        if self.options.component {
            return;
        }
        if let Some(body) = dom::find_element(root, "body") {
            let data = script_json(&self.data.to_json());
            dom::append(
                &body,
                script_element(DATA_SCRIPT_NAME, &body_injection_script(&data, self.options.debug)),
            );
        }
    }

    /// `s:trans-fmt="<name>"` rewrites the element text through the locale.
    pub(crate) fn format_translations(&mut self, root: &Handle) {
        let Some(locale) = self.locale.as_ref() else {
            return;
        };
        let mut stack = vec![root.clone()];
        while let Some(node) = stack.pop() {
            if let Some(name) = DirectiveSet::of(&node).trans_fmt {
                let formatted = locale.format(&name, &dom::inner_text(&node));
                dom::set_text(&node, &formatted);
                continue;
            }
            stack.extend(dom::children(&node).into_iter().filter(dom::is_element));
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // FINALIZER
    // ═══════════════════════════════════════════════════════════════════════════

    /// Drop hidden nodes, then tidy the tree for the client.
    pub(crate) fn finalize(&mut self, root: &Handle) {
        let hidden = collect(root, &|node: &Handle| self.is_hidden(node));
        for node in &hidden {
            dom::detach(node);
        }
        debug!(removed = hidden.len(), "removed hidden nodes");
        tidy(root);
    }
}

fn collect(handle: &Handle, matches: &dyn Fn(&Handle) -> bool) -> Vec<Handle> {
    let mut found = Vec::new();
    for child in dom::children(handle) {
        if dom::is_element(&child) && matches(&child) {
            found.push(child);
        } else {
            found.extend(collect(&child, matches));
        }
    }
    found
}

/// Strip scaffolding below `handle`: comments and `<s:set>` go away, slots
/// and `s:jit` hosts are unwrapped, and only client hooks survive among `s:*`
/// attributes.
pub fn tidy(handle: &Handle) {
    for child in dom::children(handle) {
        if dom::is_comment(&child) {
            dom::detach(&child);
            continue;
        }
        if !dom::is_element(&child) {
            continue;
        }

        let tag = dom::tag_name(&child).unwrap_or_default();
        if tag == SLOT_TAG || dom::has_attr(&child, JIT_ATTR) {
            tidy(&child);
            dom::unwrap(&child);
            continue;
        }
        if tag == "s:set" {
            dom::detach(&child);
            continue;
        }

        dom::retain_attrs(&child, keep_attr);
        tidy(&child);
    }
}

fn keep_attr(name: &str) -> bool {
    if is_directive_attr(name) {
        return Hook::from_attr(name).is_some();
    }
    name != HIDE_ATTR && name != "is" && !name.starts_with("...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keep_attr() {
        assert!(keep_attr("class"));
        assert!(keep_attr("s:event"));
        assert!(keep_attr("s:ns"));
        assert!(!keep_attr("s:key-if"));
        assert!(!keep_attr("s:bind:title"));
        assert!(!keep_attr("is"));
        assert!(!keep_attr("...props"));
    }

    #[test]
    fn test_tidy_unwraps_slots_and_drops_set() {
        let root = dom::new_element("div", &[]);
        let slot = dom::new_element("slot", &[]);
        let inner = dom::new_element("span", &[("s:key-text", "3"), ("class", "x")]);
        dom::append(&slot, inner);
        dom::append(&root, slot);
        dom::append(&root, dom::new_element("s:set", &[("name", "a")]));

        tidy(&root);

        let children = dom::children(&root);
        assert_eq!(children.len(), 1);
        assert_eq!(dom::tag_name(&children[0]).as_deref(), Some("span"));
        assert_eq!(dom::attrs(&children[0]), vec![("class".to_string(), "x".to_string())]);
    }

    #[test]
    fn test_script_json_escapes_closing_tags() {
        let out = script_json(&json!({ "html": "</script>" }));
        assert_eq!(out, r#"{"html":"<\/script>"}"#);
    }
}
