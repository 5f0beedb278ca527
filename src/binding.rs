//! Sequence & Binding Registry
//!
//! Every dynamic attribute or text occurrence gets the next sequence number of
//! the render pass. The number is written onto the node as a key marker and
//! recorded in the mapping together with the unevaluated expression, so a
//! hydration runtime can find the live position and re-evaluate it.

use markup5ever_rcdom::Handle;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::directive::{is_directive_attr, DirectiveSet};
use crate::dom;
use crate::error::{ExprError, RenderError};
use crate::eval::has_statement;
use crate::render::{bind_attr_marker, key_attr_marker, TemplateRenderer, BIND_TEXT, KEY_TEXT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingKind {
    Attr,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    pub key: u64,
    #[serde(rename = "type")]
    pub kind: BindingKind,
    /// Attribute name for attribute bindings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub expression: String,
}

#[derive(Debug, Default)]
pub struct BindingRegistry {
    sequence: u64,
    mapping: BTreeMap<u64, Mapping>,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next render-pass sequence number, starting at 1.
    pub fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    pub fn record(&mut self, kind: BindingKind, target: Option<&str>, expression: &str) -> u64 {
        let key = self.next_sequence();
        self.mapping.insert(
            key,
            Mapping {
                key,
                kind,
                target: target.map(str::to_string),
                expression: expression.to_string(),
            },
        );
        key
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn mapping(&self) -> &BTreeMap<u64, Mapping> {
        &self.mapping
    }

    pub fn into_mapping(self) -> BTreeMap<u64, Mapping> {
        self.mapping
    }
}

impl TemplateRenderer {
    /// Interpolate every plain attribute and apply `s:attr-*` toggles.
    /// No-op on resolved nodes.
    pub(crate) fn interpolate_attrs(&mut self, handle: &Handle) {
        if self.states.is_resolved(handle) {
            return;
        }

        let directives = DirectiveSet::of(handle);
        for (name, expr) in &directives.bool_attrs {
            self.toggle_attr(handle, name, expr);
        }

        for (name, value) in dom::attrs(handle) {
            if is_directive_attr(&name) || !has_statement(&value) {
                continue;
            }

            let expression = value.trim().to_string();
            let replaced = self.gateway.replace(&value, &self.data);
            let key = self.registry.record(BindingKind::Attr, Some(name.as_str()), &expression);
            self.report_spans("attr", key, replaced.errors);

            dom::set_attr(handle, &name, &replaced.text);
            dom::set_attr(handle, &bind_attr_marker(&name), &expression);
            dom::set_attr(handle, &key_attr_marker(&name), &key.to_string());
        }
    }

    /// `s:attr-<name>`: true sets `<name>=""`, false drops it.
    fn toggle_attr(&mut self, handle: &Handle, name: &str, expr: &str) {
        let key = self.registry.record(BindingKind::Attr, Some(name), expr);
        dom::set_attr(handle, &key_attr_marker(name), &key.to_string());

        match self.gateway.exec(expr, &self.data) {
            Ok(Value::Bool(true)) => dom::set_attr(handle, name, ""),
            Ok(Value::Bool(false)) => dom::remove_attr(handle, name),
            Ok(_) => {}
            Err(source) => self.report(RenderError::Expression {
                directive: format!("s:attr-{}", name),
                expr: expr.to_string(),
                key,
                source,
            }),
        }
    }

    /// Interpolate a text node and mark its parent with the binding.
    pub(crate) fn interpolate_text(&mut self, handle: &Handle) {
        let Some(text) = dom::text_of(handle) else {
            return;
        };
        if !has_statement(&text) {
            return;
        }

        let expression = text.trim().to_string();
        let replaced = self.gateway.replace(&text, &self.data);
        let key = self.registry.record(BindingKind::Text, None, &expression);
        self.report_spans("text", key, replaced.errors);

        if let Some(parent) = dom::parent_of(handle) {
            if DirectiveSet::of(&parent).raw {
                self.states.mark_raw(handle);
            }
            mark_text_binding(&parent, &expression, key);
        }
        dom::set_text_contents(handle, &replaced.text);
    }

    fn report_spans(&mut self, directive: &str, key: u64, errors: Vec<(String, ExprError)>) {
        for (expr, source) in errors {
            self.report(RenderError::Expression {
                directive: directive.to_string(),
                expr,
                key,
                source,
            });
        }
    }
}

/// Add a text binding to the parent's markers.
///
/// One binding: `s:key-text="3"` and `s:bind` holds the expression. Several:
/// `s:key-text` lists the keys in child order, space separated, and `s:bind`
/// becomes a JSON array of the expressions in the same order.
fn mark_text_binding(parent: &Handle, expression: &str, key: u64) {
    let Some(keys) = dom::get_attr(parent, KEY_TEXT).filter(|k| !k.trim().is_empty()) else {
        dom::set_attr(parent, BIND_TEXT, expression);
        dom::set_attr(parent, KEY_TEXT, &key.to_string());
        return;
    };

    let bound = dom::get_attr(parent, BIND_TEXT).unwrap_or_default();
    let mut expressions: Vec<String> = if keys.trim().contains(' ') {
        serde_json::from_str(&bound).unwrap_or_default()
    } else {
        vec![bound]
    };
    expressions.push(expression.to_string());

    let list = Value::from(expressions).to_string();
    dom::set_attr(parent, BIND_TEXT, &list);
    dom::set_attr(parent, KEY_TEXT, &format!("{} {}", keys.trim(), key));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_strictly_increasing() {
        let mut registry = BindingRegistry::new();
        let a = registry.next_sequence();
        let b = registry.record(BindingKind::Text, None, "{{ x }}");
        let c = registry.record(BindingKind::Attr, Some("title"), "{{ t }}");
        assert_eq!((a, b, c), (1, 2, 3));
        assert_eq!(registry.mapping().len(), 2);
        assert_eq!(registry.mapping()[&3].target.as_deref(), Some("title"));
    }

    #[test]
    fn test_text_markers_accumulate() {
        let parent = dom::new_element("p", &[]);
        mark_text_binding(&parent, "{{ a }}", 1);
        assert_eq!(dom::get_attr(&parent, KEY_TEXT).as_deref(), Some("1"));
        assert_eq!(dom::get_attr(&parent, BIND_TEXT).as_deref(), Some("{{ a }}"));

        mark_text_binding(&parent, "{{ b }}", 2);
        mark_text_binding(&parent, "{{ c }}", 5);
        assert_eq!(dom::get_attr(&parent, KEY_TEXT).as_deref(), Some("1 2 5"));
        assert_eq!(
            dom::get_attr(&parent, BIND_TEXT).as_deref(),
            Some(r#"["{{ a }}","{{ b }}","{{ c }}"]"#)
        );
    }

    #[test]
    fn test_mapping_json_shape() {
        let mut registry = BindingRegistry::new();
        registry.record(BindingKind::Attr, Some("title"), "{{ user.name }}");
        let json = serde_json::to_value(registry.mapping()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "1": { "key": 1, "type": "attr", "target": "title", "expression": "{{ user.name }}" }
            })
        );
    }
}
