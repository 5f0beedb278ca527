//! Control-Flow Resolver
//!
//! `s:if`/`s:elif`/`s:else` groups are resolved by hiding every member and
//! revealing at most one. `s:for` expands into one clone per item; the clones
//! replace the template only after the walk, through the replacement log.

use markup5ever_rcdom::Handle;
use serde_json::Value;
use tracing::{debug, warn};

use crate::directive::DirectiveSet;
use crate::dom;
use crate::error::{ExprError, RenderError};
use crate::eval::{has_statement, is_true, type_name, unwrap_statement};
use crate::render::{
    TemplateRenderer, ERROR_ATTR, GENERATE_ATTR, KEY_FOR, KEY_FOR_ITEM_INDEX, KEY_FOR_ITEM_KEY,
    KEY_IF,
};

/// Loop sources must be a sequence; `null` iterates nothing.
pub fn to_items(value: Value) -> Result<Vec<Value>, &'static str> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        other => Err(type_name(&other)),
    }
}

impl TemplateRenderer {
    // ═══════════════════════════════════════════════════════════════════════════
    // CONDITIONALS
    // ═══════════════════════════════════════════════════════════════════════════

    pub(crate) fn resolve_condition(&mut self, handle: &Handle, expr: &str) {
        let key = self.registry.next_sequence();
        dom::set_attr(handle, KEY_IF, &key.to_string());
        self.states.mark_resolved(handle);
        self.hide(handle);

        let (elifs, else_branch) = self.collect_branches(handle, key);

        match self.gateway.exec(expr, &self.data) {
            Ok(value) if is_true(&value) => {
                self.reveal_branch(handle);
                return;
            }
            Ok(_) => {}
            Err(source) => {
                self.report(RenderError::Expression {
                    directive: "s:if".to_string(),
                    expr: expr.to_string(),
                    key,
                    source,
                });
                return;
            }
        }

        for (branch, elif_expr) in &elifs {
            match self.gateway.exec(elif_expr, &self.data) {
                Ok(value) if is_true(&value) => {
                    self.reveal_branch(branch);
                    return;
                }
                Ok(_) => {}
                Err(source) => {
                    self.report(RenderError::Expression {
                        directive: "s:elif".to_string(),
                        expr: elif_expr.clone(),
                        key,
                        source,
                    });
                    return;
                }
            }
        }

        if let Some(branch) = else_branch {
            self.reveal_branch(&branch);
        }
    }

    /// Contiguous `s:elif` siblings, then an optional `s:else` that closes
    /// the group. Every member shares the group key and starts hidden.
    fn collect_branches(&mut self, handle: &Handle, key: u64) -> (Vec<(Handle, String)>, Option<Handle>) {
        let mut elifs = Vec::new();
        let mut else_branch = None;

        for sibling in dom::following_element_siblings(handle) {
            let directives = DirectiveSet::of(&sibling);
            if !directives.is_branch_continuation() {
                break;
            }

            self.states.mark_resolved(&sibling);
            dom::set_attr(&sibling, KEY_IF, &key.to_string());
            self.hide(&sibling);

            match directives.elif_expr {
                Some(expr) => elifs.push((sibling, expr)),
                None => {
                    else_branch = Some(sibling);
                    break;
                }
            }
        }

        (elifs, else_branch)
    }

    fn reveal_branch(&mut self, handle: &Handle) {
        self.states.clear_resolved(handle);
        self.interpolate_attrs(handle);
        self.states.mark_resolved(handle);
        self.show(handle);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // LOOPS
    // ═══════════════════════════════════════════════════════════════════════════

    pub(crate) fn expand_loop(&mut self, handle: &Handle, directives: &DirectiveSet) {
        let key = self.registry.next_sequence();
        dom::set_attr(handle, KEY_FOR, &key.to_string());
        self.states.mark_resolved(handle);
        self.hide(handle);

        let source = directives.for_source.as_deref().unwrap_or_default();
        let items = match self.gateway.exec(source, &self.data) {
            Ok(value) => match to_items(value) {
                Ok(items) => items,
                Err(found) => {
                    self.report(RenderError::Shape {
                        expr: source.to_string(),
                        found: found.to_string(),
                    });
                    return;
                }
            },
            Err(error) => {
                self.report(RenderError::Expression {
                    directive: "s:for".to_string(),
                    expr: source.to_string(),
                    key,
                    source: error,
                });
                return;
            }
        };

        let item_var = directives.item_var();
        let index_var = directives.index_var();
        let mut output = Vec::with_capacity(items.len() + 1);

        // Editors get the untouched template alongside the generated items.
        if self.options.authoring {
            let template = dom::deep_clone(handle);
            self.states.mark_resolved(&template);
            output.push(template);
        }

        self.data.push_frame();
        for (index, item) in items.into_iter().enumerate() {
            let clone = dom::deep_clone(handle);
            self.data.bind(item_var, item);
            self.data.bind(index_var, Value::from(index));

            // Inside a loop `s:if` excludes the items it is true for.
            if let Some(filter) = directives.if_expr.as_deref() {
                match self.gateway.exec(filter, &self.data) {
                    Ok(value) if is_true(&value) => continue,
                    Ok(_) => {}
                    Err(error) => {
                        dom::set_attr(&clone, ERROR_ATTR, &error.to_string());
                        self.report(RenderError::Expression {
                            directive: "s:if".to_string(),
                            expr: filter.to_string(),
                            key,
                            source: error,
                        });
                        self.states.mark_resolved(&clone);
                        self.show(&clone);
                        output.push(clone);
                        continue;
                    }
                }
            }

            self.interpolate_attrs(&clone);
            self.states.mark_resolved(&clone);

            let item_key = self.registry.next_sequence();
            dom::set_attr(&clone, KEY_FOR_ITEM_INDEX, &index.to_string());
            dom::set_attr(&clone, KEY_FOR_ITEM_KEY, &item_key.to_string());
            self.show(&clone);
            if self.options.authoring {
                dom::set_attr(&clone, GENERATE_ATTR, "true");
            }

            self.walk(&clone);
            output.push(clone);
        }
        self.data.pop_frame();

        debug!(key, source, nodes = output.len(), "expanded loop");
        self.replacements.record(handle.clone(), output);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ASSIGNMENT
    // ═══════════════════════════════════════════════════════════════════════════

    /// `<s:set name="x" value="...">`: a whole `{{ }}` value is evaluated,
    /// mixed text is interpolated, anything else is stored as a string.
    pub(crate) fn resolve_assignment(&mut self, handle: &Handle) {
        self.states.mark_resolved(handle);

        let Some(name) = dom::get_attr(handle, "name").filter(|n| !n.is_empty()) else {
            return;
        };
        let raw = dom::get_attr(handle, "value").unwrap_or_default();

        let value = if !has_statement(&raw) {
            Value::String(raw.clone())
        } else if unwrap_statement(&raw) != raw.trim() {
            match self.gateway.exec(&raw, &self.data) {
                Ok(value) => value,
                Err(source) => {
                    self.assignment_failed(&name, &raw, source);
                    Value::String(raw.clone())
                }
            }
        } else {
            let replaced = self.gateway.replace(&raw, &self.data);
            match replaced.errors.into_iter().next() {
                Some((_, source)) => {
                    self.assignment_failed(&name, &raw, source);
                    Value::String(raw.clone())
                }
                None => Value::String(replaced.text),
            }
        };

        self.gateway.assign(&mut self.data, &name, value);
    }

    fn assignment_failed(&mut self, name: &str, raw: &str, source: ExprError) {
        warn!(name, "storing raw value for failed assignment");
        self.report(RenderError::Assignment {
            name: name.to_string(),
            expr: raw.to_string(),
            source,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_items() {
        assert_eq!(to_items(json!(["a", "b"])).unwrap().len(), 2);
        assert!(to_items(Value::Null).unwrap().is_empty());
        assert_eq!(to_items(json!({ "a": 1 })), Err("map"));
        assert_eq!(to_items(json!("abc")), Err("string"));
    }
}
