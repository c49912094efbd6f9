//! Builds the ray.so address that renders a request.

use crate::options::RenderRequest;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// The public ray.so editor.
pub const DEFAULT_BASE_URL: &str = "https://ray.so/";

/// Characters `encodeURIComponent` leaves alone, everything else is escaped.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Standard padded base64 of the UTF-8 bytes of `code`.
pub fn encode_code(code: &str) -> String {
    BASE64.encode(code.as_bytes())
}

fn component(text: &str) -> String {
    utf8_percent_encode(text, COMPONENT).to_string()
}

/// Appends the request as query parameters to `base`.
///
/// Parameter names and order are what the site reads: `title`, `theme`,
/// `spacing`, `background`, `darkMode`, `code`, `language`.
pub fn build_page_url(base: &str, request: &RenderRequest, code: &str) -> String {
    format!(
        "{base}?title={}&theme={}&spacing={}&background={}&darkMode={}&code={}&language={}",
        component(&request.title),
        request.theme,
        request.padding,
        request.background,
        request.dark_mode,
        component(&encode_code(code)),
        component(request.language.as_str()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{Language, Padding, Theme};
    use percent_encoding::percent_decode_str;

    fn query_param<'a>(url: &'a str, name: &str) -> Option<&'a str> {
        let (_, query) = url.split_once('?')?;
        query
            .split('&')
            .find_map(|pair| pair.strip_prefix(name)?.strip_prefix('='))
    }

    fn decoded_code(url: &str) -> String {
        let raw = query_param(url, "code").expect("code parameter");
        let b64 = percent_decode_str(raw).decode_utf8().unwrap();
        String::from_utf8(BASE64.decode(b64.as_bytes()).unwrap()).unwrap()
    }

    #[test]
    fn default_request_url() {
        let url = build_page_url(DEFAULT_BASE_URL, &RenderRequest::default(), "console.log(1)");
        assert!(url.starts_with("https://ray.so/?title=&theme=breeze&spacing=32"));
        assert!(url.contains("theme=breeze&spacing=32&background=true&darkMode=true"));
        assert!(url.ends_with("&language=auto"));
        assert_eq!(decoded_code(&url), "console.log(1)");
    }

    #[test]
    fn parameter_order_is_fixed() {
        let url = build_page_url(DEFAULT_BASE_URL, &RenderRequest::default(), "x");
        let names: Vec<_> = url
            .split_once('?')
            .unwrap()
            .1
            .split('&')
            .map(|p| p.split_once('=').unwrap().0)
            .collect();
        assert_eq!(
            names,
            ["title", "theme", "spacing", "background", "darkMode", "code", "language"]
        );
    }

    #[test]
    fn base64_round_trips_unicode_and_newlines() {
        let samples = [
            "",
            "fn main() {\n    println!(\"héllo, 世界\");\n}\n",
            "a+b/c=d&e?f#g",
            "emoji 🦀\r\n\ttab",
        ];
        for code in samples {
            let url = build_page_url(DEFAULT_BASE_URL, &RenderRequest::default(), code);
            assert_eq!(decoded_code(&url), code);
        }
    }

    #[test]
    fn base64_specials_are_escaped() {
        // "??>" encodes to "Pz8+", which carries a '+'
        let url = build_page_url(DEFAULT_BASE_URL, &RenderRequest::default(), "??>");
        assert_eq!(query_param(&url, "code"), Some("Pz8%2B"));
        let url = build_page_url(DEFAULT_BASE_URL, &RenderRequest::default(), "a");
        assert_eq!(query_param(&url, "code"), Some("YQ%3D%3D"));
    }

    #[test]
    fn title_and_language_are_component_encoded() {
        let request = RenderRequest {
            title: "My snippet (v2) & more!".into(),
            theme: Theme::Candy,
            background: false,
            dark_mode: false,
            padding: Padding::Xl,
            language: Language::ObjectiveC,
            local_preview: None,
        };
        let url = build_page_url("http://127.0.0.1:9/", &request, "x");
        assert!(url.starts_with("http://127.0.0.1:9/?title=My%20snippet%20(v2)%20%26%20more!&theme=candy&spacing=128&background=false&darkMode=false&code="));
        assert!(url.ends_with("&language=objective%20c"));

        let cpp = RenderRequest {
            language: Language::Cpp,
            ..RenderRequest::default()
        };
        assert!(build_page_url(DEFAULT_BASE_URL, &cpp, "x").ends_with("language=c%2B%2B"));
        let csharp = RenderRequest {
            language: Language::CSharp,
            ..RenderRequest::default()
        };
        assert!(build_page_url(DEFAULT_BASE_URL, &csharp, "x").ends_with("language=c%23"));
    }

    #[test]
    fn deterministic() {
        let request = RenderRequest::default();
        let first = build_page_url(DEFAULT_BASE_URL, &request, "let x = 1;");
        for _ in 0..10 {
            assert_eq!(build_page_url(DEFAULT_BASE_URL, &request, "let x = 1;"), first);
        }
    }
}
