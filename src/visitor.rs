use markup5ever_rcdom::{Handle, NodeData};
use tracing::trace;

use crate::directive::DirectiveSet;
use crate::render::TemplateRenderer;

/// The NodeVisitor trait defines the single traversal mechanism over the markup tree.
///
/// Rules:
/// 1. Children are visited in document order, after their parent.
/// 2. `visit_element` returns `true` to prune the element's children.
/// 3. Children are snapshotted before descending; structural edits belong in
///    the replacement log, not in the middle of a walk.
pub trait NodeVisitor {
    fn visit_node(&mut self, handle: &Handle) {
        walk_node(self, handle);
    }

    /// Returns true when the children must not be walked.
    fn visit_element(&mut self, _handle: &Handle) -> bool {
        false
    }

    fn visit_text(&mut self, _handle: &Handle) {
        // Leaf node, nothing to walk
    }
}

pub fn walk_node<V: NodeVisitor + ?Sized>(visitor: &mut V, handle: &Handle) {
    let skip_children = match &handle.data {
        NodeData::Element { .. } => visitor.visit_element(handle),
        NodeData::Text { .. } => {
            visitor.visit_text(handle);
            false
        }
        _ => false,
    };

    if !skip_children {
        walk_children(visitor, handle);
    }
}

pub fn walk_children<V: NodeVisitor + ?Sized>(visitor: &mut V, handle: &Handle) {
    let children = handle.children.borrow().clone();
    for child in &children {
        visitor.visit_node(child);
    }
}

impl NodeVisitor for TemplateRenderer {
    /// Directive dispatch: translation, loop, condition, assignment,
    /// component, then attribute interpolation.
    fn visit_element(&mut self, handle: &Handle) -> bool {
        if self.states.is_resolved(handle) {
            return false;
        }

        let directives = DirectiveSet::of(handle);
        trace!(tag = ?crate::dom::tag_name(handle), "visit element");

        self.translate_attrs(handle, &directives);

        // The loop owns its clones' subtrees.
        if directives.has_loop() {
            self.expand_loop(handle, &directives);
            return true;
        }

        if let Some(expr) = directives.if_expr.as_deref() {
            self.resolve_condition(handle, expr);
        }

        if directives.set {
            self.resolve_assignment(handle);
        }

        self.expand_component(handle);
        self.interpolate_attrs(handle);
        self.states.mark_resolved(handle);
        false
    }

    fn visit_text(&mut self, handle: &Handle) {
        if self.states.is_resolved(handle) {
            return;
        }
        self.translate_text_node(handle);
        self.interpolate_text(handle);
        self.states.mark_resolved(handle);
    }
}

impl TemplateRenderer {
    pub(crate) fn walk(&mut self, handle: &Handle) {
        self.visit_node(handle);
    }
}
