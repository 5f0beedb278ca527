//! Directive vocabulary.
//!
//! Directive attributes are recognized once per visit into a [`DirectiveSet`];
//! resolution code reads the set instead of scanning attribute names again.

use markup5ever_rcdom::Handle;

use crate::dom;

pub const DIRECTIVE_PREFIX: &str = "s:";

pub const DEFAULT_ITEM_VAR: &str = "item";
pub const DEFAULT_INDEX_VAR: &str = "index";

/// Passthrough hooks the client runtime needs after finalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    Namespace,
    Component,
    Ready,
    Event,
}

impl Hook {
    pub fn attr_name(self) -> &'static str {
        match self {
            Hook::Namespace => "s:ns",
            Hook::Component => "s:cn",
            Hook::Ready => "s:ready",
            Hook::Event => "s:event",
        }
    }

    pub fn from_attr(name: &str) -> Option<Self> {
        match name {
            "s:ns" => Some(Hook::Namespace),
            "s:cn" => Some(Hook::Component),
            "s:ready" => Some(Hook::Ready),
            "s:event" => Some(Hook::Event),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    If(String),
    Elif(String),
    Else,
    For(String),
    ForItem(String),
    ForIndex(String),
    Set,
    Bind(String),
    TransNode(String),
    TransText(Vec<String>),
    TransEscape,
    TransAttr { name: String, keys: Vec<String> },
    TransFmt(String),
    BoolAttr { name: String, expr: String },
    Hook(Hook, String),
    Raw(bool),
}

impl Directive {
    /// Recognize one attribute. Scaffolding written by the engine itself
    /// (`s:key-*`, `s:bind:*`, `s:error`, ...) is not a directive.
    pub fn parse(name: &str, value: &str) -> Option<Self> {
        let directive = match name {
            "s:if" => Directive::If(value.to_string()),
            "s:elif" => Directive::Elif(value.to_string()),
            "s:else" => Directive::Else,
            "s:for" => Directive::For(value.to_string()),
            "s:for-item" => Directive::ForItem(value.to_string()),
            "s:for-index" => Directive::ForIndex(value.to_string()),
            "s:set" => Directive::Set,
            "s:bind" => Directive::Bind(value.to_string()),
            "s:trans-node" => Directive::TransNode(value.to_string()),
            "s:trans-text" => Directive::TransText(split_keys(value)),
            "s:trans-escape" => Directive::TransEscape,
            "s:trans-fmt" => Directive::TransFmt(value.to_string()),
            "s:raw" => Directive::Raw(value.is_empty() || value == "true"),
            _ => {
                if let Some(hook) = Hook::from_attr(name) {
                    return Some(Directive::Hook(hook, value.to_string()));
                }
                if let Some(target) = name.strip_prefix("s:trans-attr-") {
                    return Some(Directive::TransAttr {
                        name: target.to_string(),
                        keys: split_keys(value),
                    });
                }
                if let Some(target) = name.strip_prefix("s:attr-") {
                    return Some(Directive::BoolAttr {
                        name: target.to_string(),
                        expr: value.to_string(),
                    });
                }
                return None;
            }
        };
        Some(directive)
    }
}

pub fn split_keys(value: &str) -> Vec<String> {
    value.split(',').map(|k| k.trim().to_string()).collect()
}

pub fn is_directive_attr(name: &str) -> bool {
    name.starts_with(DIRECTIVE_PREFIX)
}

/// Everything the engine needs to know about one element's directives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectiveSet {
    pub if_expr: Option<String>,
    pub elif_expr: Option<String>,
    pub is_else: bool,
    pub for_source: Option<String>,
    pub for_item: Option<String>,
    pub for_index: Option<String>,
    /// `<s:set>` element or `s:set` attribute.
    pub set: bool,
    pub bind: Option<String>,
    pub trans_node: Option<String>,
    pub trans_text: Option<Vec<String>>,
    pub trans_escape: bool,
    pub trans_attrs: Vec<(String, Vec<String>)>,
    pub trans_fmt: Option<String>,
    pub bool_attrs: Vec<(String, String)>,
    pub hooks: Vec<(Hook, String)>,
    pub raw: bool,
}

impl DirectiveSet {
    pub fn of(handle: &Handle) -> Self {
        let mut set = Self::from_attrs(&dom::attrs(handle));
        if dom::tag_name(handle).as_deref() == Some("s:set") {
            set.set = true;
        }
        set
    }

    pub fn from_attrs(attrs: &[(String, String)]) -> Self {
        let mut set = Self::default();
        for (name, value) in attrs {
            let Some(directive) = Directive::parse(name, value) else {
                continue;
            };
            match directive {
                Directive::If(expr) => set.if_expr = Some(expr),
                Directive::Elif(expr) => set.elif_expr = Some(expr),
                Directive::Else => set.is_else = true,
                Directive::For(source) => set.for_source = Some(source),
                Directive::ForItem(var) => set.for_item = Some(var),
                Directive::ForIndex(var) => set.for_index = Some(var),
                Directive::Set => set.set = true,
                Directive::Bind(expr) => set.bind = Some(expr),
                Directive::TransNode(key) => set.trans_node = Some(key),
                Directive::TransText(keys) => set.trans_text = Some(keys),
                Directive::TransEscape => set.trans_escape = true,
                Directive::TransAttr { name, keys } => set.trans_attrs.push((name, keys)),
                Directive::TransFmt(name) => set.trans_fmt = Some(name),
                Directive::BoolAttr { name, expr } => set.bool_attrs.push((name, expr)),
                Directive::Hook(hook, value) => set.hooks.push((hook, value)),
                Directive::Raw(raw) => set.raw = raw,
            }
        }
        set
    }

    pub fn has_loop(&self) -> bool {
        self.for_source.is_some()
    }

    pub fn item_var(&self) -> &str {
        self.for_item
            .as_deref()
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_ITEM_VAR)
    }

    pub fn index_var(&self) -> &str {
        self.for_index
            .as_deref()
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_INDEX_VAR)
    }

    pub fn is_branch_continuation(&self) -> bool {
        self.elif_expr.is_some() || self.is_else
    }
}
