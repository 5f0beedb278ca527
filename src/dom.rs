//! Node helpers over the `RcDom` tree.
//!
//! Parent links are `Cell<Option<Weak>>`, so reading one means taking it out
//! and putting it back.

use html5ever::{Attribute, LocalName, Namespace, QualName};
use markup5ever_rcdom::{Handle, Node, NodeData};
use std::cell::RefCell;
use std::rc::Rc;
use tendril::StrTendril;

/// Identity of a node for side tables. Only stable while the node is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn of(handle: &Handle) -> Self {
        NodeId(Rc::as_ptr(handle) as usize)
    }
}

pub fn is_element(handle: &Handle) -> bool {
    matches!(handle.data, NodeData::Element { .. })
}

pub fn is_comment(handle: &Handle) -> bool {
    matches!(handle.data, NodeData::Comment { .. })
}

pub fn tag_name(handle: &Handle) -> Option<String> {
    match &handle.data {
        NodeData::Element { name, .. } => Some(name.local.to_string()),
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ATTRIBUTES
// ═══════════════════════════════════════════════════════════════════════════════

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

fn attr_name(name: &str) -> QualName {
    QualName::new(None, Namespace::from(""), LocalName::from(name))
}

/// Snapshot of `(name, value)` pairs in document order.
pub fn attrs(handle: &Handle) -> Vec<(String, String)> {
    match &handle.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .map(|a| (a.name.local.to_string(), a.value.to_string()))
            .collect(),
        _ => Vec::new(),
    }
}

pub fn get_attr(handle: &Handle, name: &str) -> Option<String> {
    match &handle.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| &*a.name.local == name)
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

pub fn has_attr(handle: &Handle, name: &str) -> bool {
    get_attr(handle, name).is_some()
}

/// Overwrite in place, or append when absent.
pub fn set_attr(handle: &Handle, name: &str, value: &str) {
    if let NodeData::Element { attrs, .. } = &handle.data {
        let mut attrs = attrs.borrow_mut();
        match attrs.iter_mut().find(|a| &*a.name.local == name) {
            Some(attr) => attr.value = StrTendril::from(value),
            None => attrs.push(Attribute {
                name: attr_name(name),
                value: StrTendril::from(value),
            }),
        }
    }
}

pub fn remove_attr(handle: &Handle, name: &str) {
    if let NodeData::Element { attrs, .. } = &handle.data {
        attrs.borrow_mut().retain(|a| &*a.name.local != name);
    }
}

pub fn retain_attrs(handle: &Handle, mut keep: impl FnMut(&str) -> bool) {
    if let NodeData::Element { attrs, .. } = &handle.data {
        attrs.borrow_mut().retain(|a| keep(&a.name.local));
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEXT
// ═══════════════════════════════════════════════════════════════════════════════

pub fn text_of(handle: &Handle) -> Option<String> {
    match &handle.data {
        NodeData::Text { contents } => Some(contents.borrow().to_string()),
        _ => None,
    }
}

pub fn set_text_contents(handle: &Handle, text: &str) {
    if let NodeData::Text { contents } = &handle.data {
        *contents.borrow_mut() = StrTendril::from(text);
    }
}

/// Concatenated descendant text.
pub fn inner_text(handle: &Handle) -> String {
    let mut out = String::new();
    collect_text(handle, &mut out);
    out
}

fn collect_text(handle: &Handle, out: &mut String) {
    if let NodeData::Text { contents } = &handle.data {
        out.push_str(&contents.borrow());
    }
    for child in handle.children.borrow().iter() {
        collect_text(child, out);
    }
}

pub fn new_text(text: &str) -> Handle {
    Node::new(NodeData::Text {
        contents: RefCell::new(StrTendril::from(text)),
    })
}

pub fn new_element(tag: &str, attributes: &[(&str, &str)]) -> Handle {
    let attrs = attributes
        .iter()
        .map(|(name, value)| Attribute {
            name: attr_name(name),
            value: StrTendril::from(*value),
        })
        .collect();
    Node::new(NodeData::Element {
        name: QualName::new(None, Namespace::from(HTML_NAMESPACE), LocalName::from(tag)),
        attrs: RefCell::new(attrs),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    })
}

/// Replace all children with a single text node.
pub fn set_text(handle: &Handle, text: &str) {
    for child in handle.children.borrow().iter() {
        child.parent.set(None);
    }
    handle.children.borrow_mut().clear();
    append(handle, new_text(text));
}

// ═══════════════════════════════════════════════════════════════════════════════
// STRUCTURE
// ═══════════════════════════════════════════════════════════════════════════════

pub fn parent_of(handle: &Handle) -> Option<Handle> {
    let weak = handle.parent.take();
    let parent = weak.as_ref().and_then(|w| w.upgrade());
    handle.parent.set(weak);
    parent
}

pub fn children(handle: &Handle) -> Vec<Handle> {
    handle.children.borrow().clone()
}

pub fn append(parent: &Handle, child: Handle) {
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child);
}

/// Element siblings after `handle`, in document order.
pub fn following_element_siblings(handle: &Handle) -> Vec<Handle> {
    let Some(parent) = parent_of(handle) else {
        return Vec::new();
    };
    let siblings = parent.children.borrow();
    let following = siblings
        .iter()
        .skip_while(|s| !Rc::ptr_eq(s, handle))
        .skip(1)
        .filter(|s| is_element(s))
        .cloned()
        .collect();
    following
}

/// First child element named `tag`, searched depth first.
pub fn find_element(handle: &Handle, tag: &str) -> Option<Handle> {
    for child in handle.children.borrow().iter() {
        if tag_name(child).as_deref() == Some(tag) {
            return Some(child.clone());
        }
        if let Some(found) = find_element(child, tag) {
            return Some(found);
        }
    }
    None
}

/// Splice `replacements` into the parent at `handle`'s position and detach
/// `handle`. Returns false when `handle` has no parent.
pub fn replace_with(handle: &Handle, replacements: &[Handle]) -> bool {
    let Some(parent) = parent_of(handle) else {
        return false;
    };
    let mut siblings = parent.children.borrow_mut();
    let Some(position) = siblings.iter().position(|s| Rc::ptr_eq(s, handle)) else {
        return false;
    };
    for node in replacements {
        node.parent.set(Some(Rc::downgrade(&parent)));
    }
    siblings.splice(position..=position, replacements.iter().cloned());
    handle.parent.set(None);
    true
}

pub fn detach(handle: &Handle) -> bool {
    replace_with(handle, &[])
}

/// Replace an element with its own children.
pub fn unwrap(handle: &Handle) -> bool {
    let inner = children(handle);
    handle.children.borrow_mut().clear();
    replace_with(handle, &inner)
}

/// Deep copy of a subtree. The copy is detached.
pub fn deep_clone(handle: &Handle) -> Handle {
    let data = match &handle.data {
        NodeData::Document => NodeData::Document,
        NodeData::Doctype {
            name,
            public_id,
            system_id,
        } => NodeData::Doctype {
            name: name.clone(),
            public_id: public_id.clone(),
            system_id: system_id.clone(),
        },
        NodeData::Text { contents } => NodeData::Text {
            contents: RefCell::new(contents.borrow().clone()),
        },
        NodeData::Comment { contents } => NodeData::Comment {
            contents: contents.clone(),
        },
        NodeData::Element {
            name,
            attrs,
            template_contents,
            mathml_annotation_xml_integration_point,
        } => NodeData::Element {
            name: name.clone(),
            attrs: RefCell::new(attrs.borrow().clone()),
            template_contents: RefCell::new(template_contents.borrow().as_ref().map(deep_clone)),
            mathml_annotation_xml_integration_point: *mathml_annotation_xml_integration_point,
        },
        NodeData::ProcessingInstruction { target, contents } => {
            NodeData::ProcessingInstruction {
                target: target.clone(),
                contents: contents.clone(),
            }
        }
    };

    let copy = Node::new(data);
    for child in handle.children.borrow().iter() {
        append(&copy, deep_clone(child));
    }
    copy
}
