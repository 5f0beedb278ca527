//! Output shape per mode: injection, hidden-node removal, tidy.

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::finalize::{DATA_SCRIPT_NAME, LOCALE_SCRIPT_NAME};
    use crate::{render, Data, Locale, RenderOptions, TemplateRenderer};

    fn data(value: serde_json::Value) -> Data {
        Data::from_value(value).unwrap()
    }

    const GROUP: &str = r#"<div s:if="on">yes</div><div s:else>no</div>"#;

    #[test]
    fn test_request_mode_removes_hidden_and_scaffolding() {
        let rendered = render(GROUP, data(json!({ "on": true })), RenderOptions::request()).unwrap();
        assert!(rendered.html.starts_with("<!DOCTYPE html><html lang=\"en-us\">"));
        assert!(rendered.html.contains("<div>yes</div>"));
        assert!(!rendered.html.contains(">no<"));
        assert!(!rendered.html.contains("s:key-if"));
        assert!(!rendered.html.contains("sui-hide"));
    }

    #[test]
    fn test_preview_mode_finalizes_like_request() {
        let options = RenderOptions {
            preview: true,
            ..RenderOptions::default()
        };
        let rendered = render(GROUP, data(json!({ "on": false })), options).unwrap();
        assert!(rendered.html.contains("<div>no</div>"));
        assert!(!rendered.html.contains(">yes<"));
    }

    #[test]
    fn test_default_mode_keeps_hidden_branches() {
        let rendered = render(GROUP, data(json!({ "on": true })), RenderOptions::default()).unwrap();
        assert!(rendered.html.contains(r#"sui-hide="true">no</div>"#));
        assert!(rendered.html.contains("s:key-if"));
    }

    #[test]
    fn test_authoring_mode_returns_body_markup() {
        let rendered = render(GROUP, data(json!({ "on": true })), RenderOptions::authoring()).unwrap();
        assert!(rendered.html.starts_with("<div"));
        assert!(!rendered.html.contains("<body"));
        assert!(rendered.html.contains(r#"data-sui-hide="true">no</div>"#));
        assert!(!rendered.html.contains(" sui-hide"));
    }

    #[test]
    fn test_tidy_keeps_client_hooks_only() {
        let html = r#"<button s:event="save" s:ready="init" is="btn" ...rest="x" s:raw="true" class="b">ok</button><!-- note --><slot><i>in</i></slot>"#;
        let out = render(html, Data::new(), RenderOptions::request()).unwrap().html;

        assert!(out.contains(r#"<button s:event="save" s:ready="init" class="b">ok</button>"#));
        assert!(!out.contains("<!--"));
        assert!(!out.contains("<slot"));
        assert!(out.contains("<i>in</i>"));
    }

    #[test]
    fn test_head_and_body_injection() {
        let locale = Locale {
            script_messages: [("bye".to_string(), "Au revoir".to_string())].into_iter().collect(),
            ..Locale::new("fr-fr")
        };
        let rendered = TemplateRenderer::new(data(json!({ "page": "</script>" })), RenderOptions::default())
            .with_locale(locale)
            .render("<p>x</p>")
            .unwrap();

        let head = format!(r#"<script name="{}" type="text/javascript">"#, LOCALE_SCRIPT_NAME);
        assert!(rendered.html.contains(&head));
        assert!(rendered.html.contains(r#"window.__sui_locale = {"bye":"Au revoir"};"#));

        let body = format!(r#"<script name="{}" type="text/javascript">"#, DATA_SCRIPT_NAME);
        assert!(rendered.html.contains(&body));
        assert!(rendered.html.contains(r#"window.__sui_data = {"page":"<\/script>"};"#));
        assert!(rendered.html.contains("window.__sui_debug = false;"));
    }

    #[test]
    fn test_component_mode_skips_body_data() {
        let options = RenderOptions {
            component: true,
            debug: true,
            ..RenderOptions::default()
        };
        let rendered = render("<p>x</p>", Data::new(), options).unwrap();
        assert!(rendered.html.contains(LOCALE_SCRIPT_NAME));
        assert!(!rendered.html.contains(DATA_SCRIPT_NAME));
    }

    #[test]
    fn test_debug_flag_reaches_body_script() {
        let options = RenderOptions::from_json(r#"{"debug": true}"#).unwrap();
        assert!(options.cache_disabled());
        let rendered = render("<p>x</p>", Data::new(), options).unwrap();
        assert!(rendered.html.contains("window.__sui_debug = true;"));
    }

    #[test]
    fn test_loop_output_is_spliced_before_finalizing() {
        let rendered = render(
            r#"<ol><li s:for="steps">{{ item }}</li><li>last</li></ol>"#,
            data(json!({ "steps": ["a", "b"] })),
            RenderOptions::request(),
        )
        .unwrap();
        assert!(rendered.html.contains("<ol><li>a</li><li>b</li><li>last</li></ol>"));
    }
}
