//! Markup I/O
//!
//! Parses template markup into an `RcDom` with html5ever and serializes the
//! resolved tree back to a string. Serialization is done here rather than by
//! html5ever's serializer because interpolated text under `s:raw` must be
//! written without escaping.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use lazy_static::lazy_static;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use regex::Regex;
use std::collections::HashSet;

use crate::error::RenderError;

lazy_static! {
    static ref HTML_TAG_RE: Regex = Regex::new(r"(?i)<html[\s>]").unwrap();

    static ref VOID_ELEMENTS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        s.insert("area");
        s.insert("base");
        s.insert("br");
        s.insert("col");
        s.insert("embed");
        s.insert("hr");
        s.insert("img");
        s.insert("input");
        s.insert("link");
        s.insert("meta");
        s.insert("param");
        s.insert("source");
        s.insert("track");
        s.insert("wbr");
        s
    };

    /// Elements whose text content is never escaped.
    static ref RAW_TEXT_ELEMENTS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        s.insert("script");
        s.insert("style");
        s.insert("xmp");
        s.insert("iframe");
        s.insert("noembed");
        s.insert("noframes");
        s.insert("plaintext");
        s
    };
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARSING
// ═══════════════════════════════════════════════════════════════════════════════

/// Fragments without an `<html>` tag are wrapped into a full document.
pub fn wrap_document(html: &str) -> String {
    if HTML_TAG_RE.is_match(html) {
        html.to_string()
    } else {
        format!(r#"<!DOCTYPE html><html lang="en-us">{}</html>"#, html)
    }
}

pub fn parse_markup(html: &str) -> Result<RcDom, RenderError> {
    let source = wrap_document(html);
    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut source.as_bytes())
        .map_err(|e| RenderError::Parse {
            message: e.to_string(),
        })
}

/// The `<html>` element of a parsed document.
pub fn html_root(dom: &RcDom) -> Option<Handle> {
    dom.document
        .children
        .borrow()
        .iter()
        .find(|child| crate::dom::tag_name(child).as_deref() == Some("html"))
        .cloned()
}

// ═══════════════════════════════════════════════════════════════════════════════
// SERIALIZATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Serialize a node and its subtree. `is_raw` marks text nodes that bypass
/// escaping.
pub fn serialize(handle: &Handle, is_raw: &dyn Fn(&Handle) -> bool) -> String {
    let mut out = String::new();
    write_node(handle, &mut out, false, is_raw);
    out
}

/// Serialize only the children of a node.
pub fn serialize_children(handle: &Handle, is_raw: &dyn Fn(&Handle) -> bool) -> String {
    let mut out = String::new();
    let raw_parent = crate::dom::tag_name(handle)
        .map_or(false, |tag| RAW_TEXT_ELEMENTS.contains(tag.as_str()));
    for child in handle.children.borrow().iter() {
        write_node(child, &mut out, raw_parent, is_raw);
    }
    out
}

fn write_node(handle: &Handle, out: &mut String, raw_parent: bool, is_raw: &dyn Fn(&Handle) -> bool) {
    match &handle.data {
        NodeData::Document => {
            for child in handle.children.borrow().iter() {
                write_node(child, out, false, is_raw);
            }
        }
        NodeData::Doctype { name, .. } => {
            out.push_str("<!DOCTYPE ");
            out.push_str(name);
            out.push('>');
        }
        NodeData::Text { contents } => {
            let text = contents.borrow();
            if raw_parent || is_raw(handle) {
                out.push_str(&text);
            } else {
                escape_into(&text, false, out);
            }
        }
        NodeData::Comment { contents } => {
            out.push_str("<!--");
            out.push_str(contents);
            out.push_str("-->");
        }
        NodeData::ProcessingInstruction { target, contents } => {
            out.push_str("<?");
            out.push_str(target);
            out.push(' ');
            out.push_str(contents);
            out.push('>');
        }
        NodeData::Element {
            name,
            attrs,
            template_contents,
            ..
        } => {
            let tag: &str = &name.local;
            out.push('<');
            out.push_str(tag);
            for attr in attrs.borrow().iter() {
                out.push(' ');
                out.push_str(&attr.name.local);
                out.push_str("=\"");
                escape_into(&attr.value, true, out);
                out.push('"');
            }
            out.push('>');

            if VOID_ELEMENTS.contains(tag) {
                return;
            }

            let raw_text = RAW_TEXT_ELEMENTS.contains(tag);
            if let Some(contents) = template_contents.borrow().as_ref() {
                for child in contents.children.borrow().iter() {
                    write_node(child, out, raw_text, is_raw);
                }
            }
            for child in handle.children.borrow().iter() {
                write_node(child, out, raw_text, is_raw);
            }

            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

fn escape_into(text: &str, attr_mode: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\u{00A0}' => out.push_str("&nbsp;"),
            '"' if attr_mode => out.push_str("&quot;"),
            '<' if !attr_mode => out.push_str("&lt;"),
            '>' if !attr_mode => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn never_raw(_: &Handle) -> bool {
        false
    }

    #[test]
    fn test_wrap_document() {
        assert!(wrap_document("<p>x</p>").starts_with("<!DOCTYPE html><html lang=\"en-us\">"));
        let full = "<html><body></body></html>";
        assert_eq!(wrap_document(full), full);
    }

    #[test]
    fn test_directive_attributes_survive_parsing() {
        let dom = parse_markup(r#"<div s:if="score > 50">win</div><li s:for="items" s:for-item="x"></li>"#)
            .unwrap();
        let root = html_root(&dom).unwrap();
        let div = crate::dom::find_element(&root, "div").unwrap();
        assert_eq!(crate::dom::get_attr(&div, "s:if").as_deref(), Some("score > 50"));
        let li = crate::dom::find_element(&root, "li").unwrap();
        assert_eq!(crate::dom::get_attr(&li, "s:for-item").as_deref(), Some("x"));
    }

    #[test]
    fn test_serialize_round_trip() {
        let dom = parse_markup(r#"<p class="a">fish &amp; chips</p><br><img src="x.png">"#).unwrap();
        let html = serialize(&dom.document, &never_raw);
        assert!(html.starts_with("<!DOCTYPE html><html lang=\"en-us\"><head></head><body>"));
        assert!(html.contains(r#"<p class="a">fish &amp; chips</p><br><img src="x.png">"#));
        assert!(html.ends_with("</body></html>"));
    }

    #[test]
    fn test_script_contents_not_escaped() {
        let dom = parse_markup("<script>if (a < b && c) {}</script>").unwrap();
        let html = serialize(&dom.document, &never_raw);
        assert!(html.contains("<script>if (a < b && c) {}</script>"));
    }

    #[test]
    fn test_attribute_quotes_escaped() {
        let dom = parse_markup(r#"<a title='say "hi"'>x</a>"#).unwrap();
        let root = html_root(&dom).unwrap();
        let html = serialize(&root, &never_raw);
        assert!(html.contains(r#"title="say &quot;hi&quot;""#));
    }
}
