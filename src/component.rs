//! Component expansion.
//!
//! Elements naming a component through `is="..."` are handed to a
//! [`ComponentLoader`]. The walker then descends into whatever the loader put
//! under the element, so component markup is resolved in the same pass.

use markup5ever_rcdom::Handle;
use std::collections::HashMap;
use tracing::trace;

use crate::dom;
use crate::error::RenderError;
use crate::parse::{html_root, parse_markup};
use crate::render::TemplateRenderer;
use crate::scope::Data;

pub const COMPONENT_ATTR: &str = "is";
pub const JIT_ATTR: &str = "s:jit";
pub const SLOT_TAG: &str = "slot";

pub trait ComponentLoader {
    fn is_component(&self, handle: &Handle) -> bool;

    /// Expand `handle` in place.
    fn expand(&self, handle: &Handle, data: &Data) -> Result<(), String>;
}

/// Loader for renders without components.
pub struct NoComponents;

impl ComponentLoader for NoComponents {
    fn is_component(&self, _handle: &Handle) -> bool {
        false
    }

    fn expand(&self, _handle: &Handle, _data: &Data) -> Result<(), String> {
        Ok(())
    }
}

pub fn component_name(handle: &Handle) -> Option<String> {
    dom::get_attr(handle, COMPONENT_ATTR).filter(|name| !name.is_empty())
}

/// Components registered as markup fragments by name.
///
/// The element's own children move into the fragment's `<slot>`; the slot
/// and the host element are unwrapped by the finalizer through `s:jit`.
#[derive(Debug, Clone, Default)]
pub struct TemplateComponents {
    templates: HashMap<String, String>,
}

impl TemplateComponents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(mut self, name: &str, markup: &str) -> Self {
        self.templates.insert(name.to_string(), markup.to_string());
        self
    }

    /// Exact match first, then case-insensitive.
    fn lookup(&self, name: &str) -> Option<&str> {
        if let Some(markup) = self.templates.get(name) {
            return Some(markup);
        }
        let lower = name.to_lowercase();
        self.templates
            .iter()
            .find(|(registered, _)| registered.to_lowercase() == lower)
            .map(|(_, markup)| markup.as_str())
    }
}

impl ComponentLoader for TemplateComponents {
    fn is_component(&self, handle: &Handle) -> bool {
        component_name(handle).is_some()
    }

    fn expand(&self, handle: &Handle, _data: &Data) -> Result<(), String> {
        let name = component_name(handle).unwrap_or_default();
        let markup = self
            .lookup(&name)
            .ok_or_else(|| "component is not registered".to_string())?;

        let fragment = parse_markup(markup).map_err(|e| e.to_string())?;
        let body = html_root(&fragment)
            .and_then(|root| dom::find_element(&root, "body"))
            .ok_or_else(|| "component markup has no body".to_string())?;

        let slotted = dom::children(handle);
        for child in &slotted {
            dom::detach(child);
        }

        for node in dom::children(&body) {
            dom::detach(&node);
            dom::append(handle, node);
        }
        if let Some(slot) = dom::find_element(handle, SLOT_TAG) {
            for child in slotted {
                dom::append(&slot, child);
            }
        }

        dom::set_attr(handle, JIT_ATTR, "true");
        dom::set_attr(handle, "s:cn", &name);
        Ok(())
    }
}

impl TemplateRenderer {
    pub(crate) fn expand_component(&mut self, handle: &Handle) {
        if !self.components.is_component(handle) {
            return;
        }
        let name = component_name(handle).unwrap_or_default();
        trace!(name = %name, "expanding component");

        if let Err(message) = self.components.expand(handle, &self.data) {
            self.report(RenderError::Component { name, message });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let components = TemplateComponents::new().with_template("Card", "<div class=\"card\"></div>");
        assert!(components.lookup("Card").is_some());
        assert!(components.lookup("card").is_some());
        assert!(components.lookup("panel").is_none());
    }

    #[test]
    fn test_expand_moves_children_into_slot() {
        let components =
            TemplateComponents::new().with_template("card", "<div class=\"card\"><slot></slot></div>");
        let host = dom::new_element("div", &[("is", "card")]);
        dom::append(&host, dom::new_text("inside"));

        assert!(components.is_component(&host));
        components.expand(&host, &Data::new()).unwrap();

        let card = dom::find_element(&host, "div").unwrap();
        assert_eq!(dom::get_attr(&card, "class").as_deref(), Some("card"));
        let slot = dom::find_element(&host, "slot").unwrap();
        assert_eq!(dom::inner_text(&slot), "inside");
        assert_eq!(dom::get_attr(&host, JIT_ATTR).as_deref(), Some("true"));
    }

    #[test]
    fn test_unknown_component_is_an_error() {
        let host = dom::new_element("div", &[("is", "missing")]);
        assert!(TemplateComponents::new().expand(&host, &Data::new()).is_err());
    }
}
