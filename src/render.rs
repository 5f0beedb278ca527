//! Render entry.
//!
//! A [`TemplateRenderer`] carries all per-render state (sequence counter,
//! mapping, node states, replacement log, errors) and is consumed by
//! [`TemplateRenderer::render`], so one instance serves exactly one render.

use markup5ever_rcdom::Handle;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, instrument, warn};

use crate::binding::{BindingRegistry, Mapping};
use crate::component::{ComponentLoader, NoComponents};
use crate::dom;
use crate::error::RenderError;
use crate::eval::{Evaluator, ExpressionGateway};
use crate::finalize::ReplacementLog;
use crate::locale::Locale;
use crate::options::RenderOptions;
use crate::parse::{html_root, parse_markup, serialize, serialize_children};
use crate::scope::Data;
use crate::state::NodeStates;

// ═══════════════════════════════════════════════════════════════════════════════
// MARKERS
// ═══════════════════════════════════════════════════════════════════════════════

pub const HIDE_ATTR: &str = "sui-hide";
pub const AUTHORING_HIDE_ATTR: &str = "data-sui-hide";
pub const GENERATE_ATTR: &str = "data-sui-generate";
pub const ERROR_ATTR: &str = "s:error";

pub const KEY_IF: &str = "s:key-if";
pub const KEY_FOR: &str = "s:key-for";
pub const KEY_FOR_ITEM_INDEX: &str = "s:key-for-item-index";
pub const KEY_FOR_ITEM_KEY: &str = "s:key-for-item-key";
pub const KEY_TEXT: &str = "s:key-text";
pub const BIND_TEXT: &str = "s:bind";

pub fn bind_attr_marker(name: &str) -> String {
    format!("s:bind:{}", name)
}

pub fn key_attr_marker(name: &str) -> String {
    format!("s:key-attr-{}", name)
}

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of one render pass.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rendered {
    pub html: String,
    /// Non-fatal errors, in the order they occurred.
    pub errors: Vec<RenderError>,
    /// Sequence key -> binding, for client-side hydration.
    pub mapping: BTreeMap<u64, Mapping>,
}

impl Rendered {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn mapping_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.mapping)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RENDERER
// ═══════════════════════════════════════════════════════════════════════════════

pub struct TemplateRenderer {
    pub(crate) data: Data,
    pub(crate) options: RenderOptions,
    pub(crate) locale: Option<Locale>,
    pub(crate) gateway: Box<dyn ExpressionGateway>,
    pub(crate) components: Box<dyn ComponentLoader>,
    pub(crate) registry: BindingRegistry,
    pub(crate) states: NodeStates,
    pub(crate) replacements: ReplacementLog,
    pub(crate) errors: Vec<RenderError>,
}

impl TemplateRenderer {
    pub fn new(data: Data, options: RenderOptions) -> Self {
        Self {
            data,
            options,
            locale: None,
            gateway: Box::new(Evaluator),
            components: Box::new(NoComponents),
            registry: BindingRegistry::new(),
            states: NodeStates::new(),
            replacements: ReplacementLog::new(),
            errors: Vec::new(),
        }
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = Some(locale);
        self
    }

    pub fn with_gateway(mut self, gateway: impl ExpressionGateway + 'static) -> Self {
        self.gateway = Box::new(gateway);
        self
    }

    pub fn with_components(mut self, loader: impl ComponentLoader + 'static) -> Self {
        self.components = Box::new(loader);
        self
    }

    pub fn data(&self) -> &Data {
        &self.data
    }

    pub fn errors(&self) -> &[RenderError] {
        &self.errors
    }

    /// Resolve `html` against the data context.
    ///
    /// Only unreadable markup is an `Err`; evaluation problems end up in
    /// [`Rendered::errors`].
    #[instrument(skip_all, fields(authoring = self.options.authoring, request = self.options.request))]
    pub fn render(mut self, html: &str) -> Result<Rendered, RenderError> {
        let dom = parse_markup(html)?;
        let root = html_root(&dom).ok_or_else(|| RenderError::Parse {
            message: "document has no <html> element".to_string(),
        })?;

        self.resolve(&root);
        self.inject(&root);
        self.format_translations(&root);

        let html = if self.options.authoring {
            match dom::find_element(&root, "body") {
                Some(body) => serialize_children(&body, &|h: &Handle| self.states.is_raw(h)),
                None => String::new(),
            }
        } else {
            if self.options.is_client_output() {
                self.finalize(&root);
            }
            serialize(&dom.document, &|h: &Handle| self.states.is_raw(h))
        };

        Ok(Rendered {
            html,
            errors: self.errors,
            mapping: self.registry.into_mapping(),
        })
    }

    /// Walk the tree, then apply the deferred replacements.
    pub(crate) fn resolve(&mut self, root: &Handle) {
        self.walk(root);
        debug!(
            nodes = self.states.len(),
            keys = self.registry.sequence(),
            "walk complete"
        );
        self.apply_replacements();
    }

    pub(crate) fn report(&mut self, error: RenderError) {
        warn!(code = error.code(), "{}", error);
        self.errors.push(error);
    }

    pub(crate) fn hide(&self, handle: &Handle) {
        if self.options.authoring {
            dom::set_attr(handle, AUTHORING_HIDE_ATTR, "true");
        } else {
            dom::set_attr(handle, HIDE_ATTR, "true");
        }
    }

    pub(crate) fn show(&self, handle: &Handle) {
        if self.options.authoring {
            dom::remove_attr(handle, AUTHORING_HIDE_ATTR);
        } else {
            dom::remove_attr(handle, HIDE_ATTR);
        }
    }

    pub(crate) fn is_hidden(&self, handle: &Handle) -> bool {
        if self.options.authoring {
            dom::has_attr(handle, AUTHORING_HIDE_ATTR)
        } else {
            dom::has_attr(handle, HIDE_ATTR)
        }
    }
}
