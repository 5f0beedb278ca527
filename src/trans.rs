//! Translation & Escaping Pipeline
//!
//! Rewrites `'::literal'` markers inside `{{ }}` spans using the loaded
//! locale, before the binding registry sees the text. A literal written with
//! a triple colon (`':::literal'`) opts out and is reduced to `'::literal'`.

use lazy_static::lazy_static;
use markup5ever_rcdom::Handle;
use regex::Regex;

use crate::directive::DirectiveSet;
use crate::dom;
use crate::eval::STMT_RE;
use crate::locale::Locale;
use crate::render::TemplateRenderer;

lazy_static! {
    static ref TRANS_SINGLE_RE: Regex = Regex::new(r"'::(.*?)'").unwrap();
    static ref TRANS_DOUBLE_RE: Regex = Regex::new(r#""::(.*?)""#).unwrap();
}

const ESCAPE_PREFIXES: [(&str, &str); 4] = [
    ("':::", "'::"),
    ("&#39;:::", "&#39;::"),
    ("\":::", "\"::"),
    ("&#34;:::", "&#34;::"),
];

/// Reduce an escaped literal to its double-colon form.
pub fn escape_literal(value: &str) -> Option<String> {
    ESCAPE_PREFIXES.iter().find_map(|(escaped, plain)| {
        value
            .strip_prefix(escaped)
            .map(|rest| format!("{}{}", plain, rest))
    })
}

/// Apply [`escape_literal`] to every `{{ }}` span of `content`.
pub fn escape_text(content: &str) -> String {
    let mut out = content.to_string();
    for caps in STMT_RE.captures_iter(content) {
        let span = caps.get(1).map_or("", |m| m.as_str()).trim();
        if let Some(escaped) = escape_literal(span) {
            out = out.replacen(span, &escaped, 1);
        }
    }
    out
}

/// Whole-node translation for `s:trans-node`.
pub fn translate_node(locale: Option<&Locale>, key: &str, message: &str) -> String {
    locale
        .and_then(|l| l.lookup(Some(key), message))
        .unwrap_or(message)
        .to_string()
}

/// Translate the marked literals of every `{{ }}` span in `content`.
///
/// Each span indexes `keys` from the start. When a span holds more markers
/// than there are keys the content is returned unchanged.
pub fn translate_text(locale: Option<&Locale>, content: &str, keys: &[String]) -> String {
    let mut out = content.to_string();

    for caps in STMT_RE.captures_iter(content) {
        let span = caps.get(1).map_or("", |m| m.as_str()).trim();
        if let Some(escaped) = escape_literal(span) {
            out = out.replacen(span, &escaped, 1);
            continue;
        }

        let mut literals: Vec<&str> = TRANS_SINGLE_RE
            .captures_iter(span)
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect();
        if literals.is_empty() {
            literals = TRANS_DOUBLE_RE
                .captures_iter(span)
                .filter_map(|c| c.get(1).map(|m| m.as_str()))
                .collect();
        }
        if literals.len() > keys.len() {
            return content.to_string();
        }

        for (literal, key) in literals.into_iter().zip(keys) {
            let message = literal.trim();
            let key = key.as_str();

            let translated = locale
                .and_then(|l| l.lookup(Some(key), message))
                .unwrap_or(message);
            out = out.replacen(&format!("::{}", message), translated, 1);
        }
    }
    out
}

impl TemplateRenderer {
    /// `s:trans-attr-<name>`: translate the named attribute in place.
    pub(crate) fn translate_attrs(&mut self, handle: &Handle, directives: &DirectiveSet) {
        for (name, keys) in &directives.trans_attrs {
            let value = dom::get_attr(handle, name).unwrap_or_default();
            if value.is_empty() {
                continue;
            }
            let translated = translate_text(self.locale.as_ref(), &value, keys);
            dom::set_attr(handle, name, &translated);
        }
    }

    /// Translation directives on the parent apply to its text children in
    /// the order node, escape, text.
    pub(crate) fn translate_text_node(&mut self, handle: &Handle) {
        let Some(parent) = dom::parent_of(handle) else {
            return;
        };
        let Some(original) = dom::text_of(handle) else {
            return;
        };
        let trimmed = original.trim();
        if trimmed.is_empty() {
            return;
        }

        let directives = DirectiveSet::of(&parent);
        let locale = self.locale.as_ref();
        let mut text = trimmed.to_string();
        if let Some(key) = &directives.trans_node {
            text = translate_node(locale, key, &text);
        }
        if directives.trans_escape {
            text = escape_text(&text);
        }
        if let Some(keys) = &directives.trans_text {
            text = translate_text(locale, &text, keys);
        }

        if text != trimmed {
            let updated = original.replacen(trimmed, &text, 1);
            dom::set_text_contents(handle, &updated);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(list: &[&str]) -> Vec<String> {
        list.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_escape_literal() {
        assert_eq!(escape_literal("':::Hello'").as_deref(), Some("'::Hello'"));
        assert_eq!(escape_literal("&#34;:::Hi&#34;").as_deref(), Some("&#34;::Hi&#34;"));
        assert_eq!(escape_literal("'::Hello'"), None);
        assert_eq!(escape_text("{{ ':::raw' }} and {{ x }}"), "{{ '::raw' }} and {{ x }}");
    }

    #[test]
    fn test_translate_without_locale_strips_marker() {
        let out = translate_text(None, "{{ '::Hello' }}", &keys(&["k"]));
        assert_eq!(out, "{{ 'Hello' }}");
    }

    #[test]
    fn test_key_beats_message() {
        let locale = Locale::new("fr-fr")
            .with_key("k", "Bonjour")
            .with_message("Hello", "Salut");
        let out = translate_text(Some(&locale), "{{ '::Hello' }}", &keys(&["k"]));
        assert_eq!(out, "{{ 'Bonjour' }}");

        // a key resolving to the literal itself is treated as a placeholder
        let stale = Locale::new("fr-fr")
            .with_key("k", "Hello")
            .with_message("Hello", "Salut");
        let out = translate_text(Some(&stale), "{{ '::Hello' }}", &keys(&["k"]));
        assert_eq!(out, "{{ 'Salut' }}");
    }

    #[test]
    fn test_double_quoted_and_multiple_keys() {
        let locale = Locale::new("de-de").with_key("a", "Ja").with_key("b", "Nein");
        let out = translate_text(
            Some(&locale),
            r#"{{ ok ? "::Yes" : "::No" }}"#,
            &keys(&["a", "b"]),
        );
        assert_eq!(out, r#"{{ ok ? "Ja" : "Nein" }}"#);
    }

    #[test]
    fn test_each_span_reads_keys_from_the_start() {
        let locale = Locale::new("fr-fr").with_key("greet", "Bonjour");
        let out = translate_text(
            Some(&locale),
            "{{ '::Hello' }} / {{ '::Hello' }}",
            &keys(&["greet"]),
        );
        assert_eq!(out, "{{ 'Bonjour' }} / {{ 'Bonjour' }}");
    }

    #[test]
    fn test_more_markers_than_keys_is_untouched() {
        let content = "{{ '::One' + '::Two' }}";
        assert_eq!(translate_text(None, content, &keys(&["k"])), content);
    }

    #[test]
    fn test_escaped_span_is_not_translated() {
        let locale = Locale::new("fr-fr").with_message("Hello", "Salut");
        let out = translate_text(Some(&locale), "{{ ':::Hello' }}", &keys(&["k"]));
        assert_eq!(out, "{{ '::Hello' }}");
    }

    #[test]
    fn test_translate_node() {
        let locale = Locale::new("fr-fr").with_message("Save", "Enregistrer");
        assert_eq!(translate_node(Some(&locale), "save", "Save"), "Enregistrer");
        assert_eq!(translate_node(None, "save", "Save"), "Save");
    }
}
