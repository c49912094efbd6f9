//! Render options: the enum tables ray.so understands and the caller-facing
//! [`RaySoOptions`] record.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;

/// Color scheme of the rendered card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Theme {
    #[default]
    Breeze,
    Candy,
    Crimson,
    Falcon,
    Meadow,
    Midnight,
    Raindrop,
    Sunset,
}

impl Theme {
    pub const ALL: [Theme; 8] = [
        Theme::Breeze,
        Theme::Candy,
        Theme::Crimson,
        Theme::Falcon,
        Theme::Meadow,
        Theme::Midnight,
        Theme::Raindrop,
        Theme::Sunset,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Breeze => "breeze",
            Theme::Candy => "candy",
            Theme::Crimson => "crimson",
            Theme::Falcon => "falcon",
            Theme::Meadow => "meadow",
            Theme::Midnight => "midnight",
            Theme::Raindrop => "raindrop",
            Theme::Sunset => "sunset",
        }
    }

    /// Case-insensitive lookup.
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.to_lowercase();
        Self::ALL.into_iter().find(|t| t.as_str() == token)
    }
}

/// Margin around the code inside the frame, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Padding {
    Sm,
    #[default]
    Md,
    Lg,
    Xl,
}

impl Padding {
    pub const ALL: [Padding; 4] = [Padding::Sm, Padding::Md, Padding::Lg, Padding::Xl];

    pub fn px(&self) -> u32 {
        match self {
            Padding::Sm => 16,
            Padding::Md => 32,
            Padding::Lg => 64,
            Padding::Xl => 128,
        }
    }

    /// Exact match on the pixel value; `32.0` is 32, `32.5` is nothing.
    pub fn from_px(px: f64) -> Option<Self> {
        Self::ALL.into_iter().find(|p| f64::from(p.px()) == px)
    }
}

/// Syntax highlighting language; `Auto` lets the site guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    #[default]
    Auto,
    Bash,
    Cpp,
    CSharp,
    Clojure,
    CoffeeScript,
    Crystal,
    Css,
    D,
    Dart,
    Diff,
    Docker,
    Elm,
    Erlang,
    Fortran,
    FSharp,
    Gherkin,
    Go,
    Groovy,
    Haskell,
    Html,
    Java,
    JavaScript,
    Json,
    Jsx,
    Julia,
    Kotlin,
    Latex,
    Lisp,
    Lua,
    Markdown,
    Mathematica,
    Nginx,
    ObjectiveC,
    OCaml,
    Perl,
    Php,
    PowerShell,
    Python,
    R,
    Ruby,
    Rust,
    Scala,
    Scss,
    Smalltalk,
    Sql,
    Swift,
    TypeScript,
    Tsx,
    Twig,
    Verilog,
    Vhdl,
    XQuery,
    Yaml,
}

impl Language {
    pub const ALL: [Language; 54] = [
        Language::Auto,
        Language::Bash,
        Language::Cpp,
        Language::CSharp,
        Language::Clojure,
        Language::CoffeeScript,
        Language::Crystal,
        Language::Css,
        Language::D,
        Language::Dart,
        Language::Diff,
        Language::Docker,
        Language::Elm,
        Language::Erlang,
        Language::Fortran,
        Language::FSharp,
        Language::Gherkin,
        Language::Go,
        Language::Groovy,
        Language::Haskell,
        Language::Html,
        Language::Java,
        Language::JavaScript,
        Language::Json,
        Language::Jsx,
        Language::Julia,
        Language::Kotlin,
        Language::Latex,
        Language::Lisp,
        Language::Lua,
        Language::Markdown,
        Language::Mathematica,
        Language::Nginx,
        Language::ObjectiveC,
        Language::OCaml,
        Language::Perl,
        Language::Php,
        Language::PowerShell,
        Language::Python,
        Language::R,
        Language::Ruby,
        Language::Rust,
        Language::Scala,
        Language::Scss,
        Language::Smalltalk,
        Language::Sql,
        Language::Swift,
        Language::TypeScript,
        Language::Tsx,
        Language::Twig,
        Language::Verilog,
        Language::Vhdl,
        Language::XQuery,
        Language::Yaml,
    ];

    /// Token sent as the `language` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Auto => "auto",
            Language::Bash => "bash",
            Language::Cpp => "c++",
            Language::CSharp => "c#",
            Language::Clojure => "clojure",
            Language::CoffeeScript => "coffeescript",
            Language::Crystal => "crystal",
            Language::Css => "css",
            Language::D => "d",
            Language::Dart => "dart",
            Language::Diff => "diff",
            Language::Docker => "docker",
            Language::Elm => "elm",
            Language::Erlang => "erlang",
            Language::Fortran => "fortran",
            Language::FSharp => "f#",
            Language::Gherkin => "gherkin",
            Language::Go => "go",
            Language::Groovy => "groovy",
            Language::Haskell => "haskell",
            Language::Html => "html",
            Language::Java => "java",
            Language::JavaScript => "javascript",
            Language::Json => "json",
            Language::Jsx => "jsx",
            Language::Julia => "julia",
            Language::Kotlin => "kotlin",
            Language::Latex => "latex",
            Language::Lisp => "lisp",
            Language::Lua => "lua",
            Language::Markdown => "markdown",
            Language::Mathematica => "mathematica",
            Language::Nginx => "nginx",
            Language::ObjectiveC => "objective c",
            Language::OCaml => "ocaml",
            Language::Perl => "perl",
            Language::Php => "php",
            Language::PowerShell => "powershell",
            Language::Python => "python",
            Language::R => "r",
            Language::Ruby => "ruby",
            Language::Rust => "rust",
            Language::Scala => "scala",
            Language::Scss => "scss",
            Language::Smalltalk => "smalltalk",
            Language::Sql => "sql",
            Language::Swift => "swift",
            Language::TypeScript => "typescript",
            Language::Tsx => "tsx",
            Language::Twig => "twig",
            Language::Verilog => "verilog",
            Language::Vhdl => "vhdl",
            Language::XQuery => "xquery",
            Language::Yaml => "yaml",
        }
    }
}

impl Language {
    /// Case-insensitive lookup.
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.to_lowercase();
        Self::ALL.into_iter().find(|l| l.as_str() == token)
    }
}

macro_rules! token_display {
    ($($ty:ty),*) => {$(
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.as_str().to_string()
            }
        }
    )*};
}

token_display!(Theme, Language);

impl fmt::Display for Padding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.px())
    }
}

/// Padding as the caller wrote it: a number or a numeric string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PaddingValue {
    Number(f64),
    Text(String),
}

impl PaddingValue {
    /// Numeric coercion; surrounding whitespace is ignored and an empty string is 0.
    ///
    /// Strings may also use the `0x`, `0o` and `0b` integer prefixes, so `"0x20"` is 32.
    pub fn coerce(&self) -> Option<Padding> {
        let px = match self {
            PaddingValue::Number(n) => *n,
            PaddingValue::Text(s) => parse_number(s)?,
        };
        Padding::from_px(px)
    }
}

fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return Some(0.0);
    }
    let radix = match text.get(..2).map(str::to_ascii_lowercase).as_deref() {
        Some("0x") => 16,
        Some("0o") => 8,
        Some("0b") => 2,
        _ => return text.parse().ok(),
    };
    let digits = &text[2..];
    if !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    u64::from_str_radix(digits, radix).ok().map(|n| n as f64)
}

impl Default for PaddingValue {
    fn default() -> Self {
        PaddingValue::Number(f64::from(Padding::default().px()))
    }
}

impl From<Padding> for PaddingValue {
    fn from(value: Padding) -> Self {
        PaddingValue::Number(f64::from(value.px()))
    }
}

impl From<u32> for PaddingValue {
    fn from(value: u32) -> Self {
        PaddingValue::Number(f64::from(value))
    }
}

impl From<i32> for PaddingValue {
    fn from(value: i32) -> Self {
        PaddingValue::Number(f64::from(value))
    }
}

impl From<&str> for PaddingValue {
    fn from(value: &str) -> Self {
        PaddingValue::Text(value.to_string())
    }
}

impl From<String> for PaddingValue {
    fn from(value: String) -> Self {
        PaddingValue::Text(value)
    }
}

/// Caller-facing configuration of a render.
///
/// Nothing here is checked until [`Validator::validate`](crate::Validator::validate)
/// turns it into a [`RenderRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RaySoOptions {
    pub title: String,
    pub theme: String,
    pub background: bool,
    pub dark_mode: bool,
    pub padding: PaddingValue,
    pub language: String,
    /// Also write the image to disk.
    pub local_preview: bool,
    /// Destination directory; empty means the current working directory.
    pub local_preview_path: String,
    /// Fixed file name; `None` means `example_<8 hex chars>.png`.
    pub local_preview_file: Option<String>,
    /// Log every step of the render at info level.
    pub debug: bool,
}

impl Default for RaySoOptions {
    fn default() -> Self {
        Self {
            title: String::new(),
            theme: Theme::default().into(),
            background: true,
            dark_mode: true,
            padding: PaddingValue::default(),
            language: Language::default().into(),
            local_preview: false,
            local_preview_path: String::new(),
            local_preview_file: None,
            debug: false,
        }
    }
}

impl RaySoOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.theme = theme.into();
        self
    }

    pub fn with_background(mut self, background: bool) -> Self {
        self.background = background;
        self
    }

    pub fn with_dark_mode(mut self, dark_mode: bool) -> Self {
        self.dark_mode = dark_mode;
        self
    }

    pub fn with_padding(mut self, padding: impl Into<PaddingValue>) -> Self {
        self.padding = padding.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Writes the image into `dir` (empty for the working directory).
    pub fn with_local_preview(mut self, dir: impl Into<String>) -> Self {
        self.local_preview = true;
        self.local_preview_path = dir.into();
        self
    }

    pub fn with_local_preview_file(mut self, name: impl Into<String>) -> Self {
        self.local_preview_file = Some(name.into());
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Reads options from untyped JSON, reporting every wrongly-shaped key at once.
    ///
    /// Missing keys take their defaults and unknown keys are ignored. A `null` is a wrong
    /// shape, except for `localPreviewFile` where it means no fixed name.
    pub fn from_json(value: &Value) -> Result<Self, ValidationError> {
        let (options, errors) = Self::read_json(value);
        if errors.is_empty() {
            Ok(options)
        } else {
            Err(ValidationError::new(errors))
        }
    }

    /// Shape-checks `value`; keys of the wrong shape keep their default.
    pub(crate) fn read_json(value: &Value) -> (Self, Vec<String>) {
        let mut options = Self::default();
        let mut errors = Vec::new();

        let Some(obj) = value.as_object() else {
            errors.push("Options must be an object.".to_string());
            return (options, errors);
        };

        let mut reader = JsonReader { obj, errors: &mut errors };
        if let Some(v) = reader.text("title", "Title parameter must be type of string.") {
            options.title = v;
        }
        if let Some(v) = reader.flag("background", "Background parameter must be type of boolean.") {
            options.background = v;
        }
        if let Some(v) = reader.flag("darkMode", "Dark mode parameter must be type of boolean.") {
            options.dark_mode = v;
        }
        if let Some(v) =
            reader.flag("localPreview", "Local preview parameter must be type of boolean.")
        {
            options.local_preview = v;
        }
        if let Some(v) = reader.text(
            "localPreviewPath",
            "Local preview path parameter must be type of string.",
        ) {
            options.local_preview_path = v;
        }
        if let Some(v) = reader.text("theme", "Theme parameter must be type of string.") {
            options.theme = v;
        }
        match reader.get("padding") {
            None => {}
            Some(Value::Number(n)) => {
                options.padding = PaddingValue::Number(n.as_f64().unwrap_or(f64::NAN))
            }
            Some(Value::String(s)) => options.padding = PaddingValue::Text(s.clone()),
            Some(_) => reader
                .errors
                .push("Padding parameter must be type of string or number.".to_string()),
        }
        if let Some(v) = reader.text("language", "Language parameter must be type of string.") {
            options.language = v;
        }
        if reader.get("localPreviewFile").is_some_and(|v| !v.is_null())
            && let Some(v) = reader.text(
                "localPreviewFile",
                "Local preview file parameter must be type of string.",
            )
        {
            options.local_preview_file = Some(v);
        }
        if let Some(v) = reader.flag("debug", "Debug parameter must be type of boolean.") {
            options.debug = v;
        }

        (options, errors)
    }
}

struct JsonReader<'a> {
    obj: &'a Map<String, Value>,
    errors: &'a mut Vec<String>,
}

impl<'a> JsonReader<'a> {
    fn get(&self, key: &str) -> Option<&'a Value> {
        self.obj.get(key)
    }

    fn text(&mut self, key: &str, message: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s.clone()),
            _ => {
                self.errors.push(message.to_string());
                None
            }
        }
    }

    fn flag(&mut self, key: &str, message: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Bool(b) => Some(*b),
            _ => {
                self.errors.push(message.to_string());
                None
            }
        }
    }
}

/// Where a local preview goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalPreview {
    /// Destination directory; empty means the current working directory.
    pub dir: PathBuf,
    /// Fixed name, or `None` for a random `example_<hex>.png`.
    pub file_name: Option<String>,
}

/// A validated, immutable render request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub title: String,
    pub theme: Theme,
    pub background: bool,
    pub dark_mode: bool,
    pub padding: Padding,
    pub language: Language,
    pub local_preview: Option<LocalPreview>,
}

impl Default for RenderRequest {
    fn default() -> Self {
        Self {
            title: String::new(),
            theme: Theme::default(),
            background: true,
            dark_mode: true,
            padding: Padding::default(),
            language: Language::default(),
            local_preview: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn themes_are_case_insensitive() {
        for theme in Theme::ALL {
            let upper = theme.as_str().to_uppercase();
            assert_eq!(Theme::from_token(&upper), Some(theme));
        }
        assert_eq!(Theme::from_token("solarized"), None);
    }

    #[test]
    fn language_table_has_auto_and_symbols() {
        assert_eq!(Language::ALL.len(), 54);
        assert_eq!(Language::from_token("AUTO"), Some(Language::Auto));
        assert_eq!(Language::from_token("c++"), Some(Language::Cpp));
        assert_eq!(Language::from_token("Objective C"), Some(Language::ObjectiveC));
        assert_eq!(Language::from_token("cobol"), None);
    }

    #[test]
    fn language_tokens_are_unique() {
        let mut tokens: Vec<_> = Language::ALL.iter().map(Language::as_str).collect();
        tokens.sort_unstable();
        tokens.dedup();
        assert_eq!(tokens.len(), Language::ALL.len());
    }

    #[test]
    fn padding_coercion() {
        assert_eq!(PaddingValue::from(64).coerce(), Some(Padding::Lg));
        assert_eq!(PaddingValue::from("128").coerce(), Some(Padding::Xl));
        assert_eq!(PaddingValue::from(" 16 ").coerce(), Some(Padding::Sm));
        assert_eq!(PaddingValue::from("32.0").coerce(), Some(Padding::Md));
        assert_eq!(PaddingValue::from(17).coerce(), None);
        assert_eq!(PaddingValue::from("big").coerce(), None);
        assert_eq!(PaddingValue::from("").coerce(), None);
        assert_eq!(PaddingValue::Number(32.5).coerce(), None);
    }

    #[test]
    fn padding_accepts_radix_prefixes() {
        assert_eq!(PaddingValue::from("0x20").coerce(), Some(Padding::Md));
        assert_eq!(PaddingValue::from("0X80").coerce(), Some(Padding::Xl));
        assert_eq!(PaddingValue::from("0o40").coerce(), Some(Padding::Md));
        assert_eq!(PaddingValue::from(" 0b10000 ").coerce(), Some(Padding::Sm));
        assert_eq!(PaddingValue::from("0x").coerce(), None);
        assert_eq!(PaddingValue::from("-0x20").coerce(), None);
        assert_eq!(PaddingValue::from("0b102").coerce(), None);
        assert_eq!(PaddingValue::from("0x+20").coerce(), None);
    }

    #[test]
    fn defaults_match_site_defaults() {
        let opts = RaySoOptions::default();
        assert_eq!(opts.theme, "breeze");
        assert_eq!(opts.language, "auto");
        assert_eq!(opts.padding.coerce(), Some(Padding::Md));
        assert!(opts.background && opts.dark_mode);
        assert!(!opts.local_preview && !opts.debug);
    }

    #[test]
    fn deserializes_camel_case_with_defaults() {
        let opts: RaySoOptions =
            serde_json::from_value(json!({ "darkMode": false, "padding": "64" })).unwrap();
        assert!(!opts.dark_mode);
        assert_eq!(opts.padding, PaddingValue::Text("64".into()));
        assert_eq!(opts.theme, "breeze");
    }

    #[test]
    fn from_json_reports_every_bad_shape() {
        let err = RaySoOptions::from_json(&json!({
            "title": 5,
            "background": "yes",
            "padding": [32],
            "language": 7,
        }))
        .unwrap_err();
        assert_eq!(
            err.errors(),
            [
                "Title parameter must be type of string.",
                "Background parameter must be type of boolean.",
                "Padding parameter must be type of string or number.",
                "Language parameter must be type of string.",
            ]
        );
    }

    #[test]
    fn from_json_rejects_null_values() {
        let err = RaySoOptions::from_json(&json!({
            "title": null,
            "background": null,
            "padding": null,
            "theme": null,
        }))
        .unwrap_err();
        assert_eq!(
            err.errors(),
            [
                "Title parameter must be type of string.",
                "Background parameter must be type of boolean.",
                "Theme parameter must be type of string.",
                "Padding parameter must be type of string or number.",
            ]
        );
    }

    #[test]
    fn null_preview_file_means_no_fixed_name() {
        let opts = RaySoOptions::from_json(&json!({ "localPreviewFile": null })).unwrap();
        assert_eq!(opts.local_preview_file, None);
    }

    #[test]
    fn from_json_accepts_well_shaped_input() {
        let opts = RaySoOptions::from_json(&json!({
            "title": "demo",
            "theme": "Candy",
            "padding": 16,
            "localPreview": true,
            "unknown": 1,
        }))
        .unwrap();
        assert_eq!(opts.title, "demo");
        assert_eq!(opts.theme, "Candy");
        assert_eq!(opts.padding, PaddingValue::Number(16.0));
        assert!(opts.local_preview);
    }

    #[test]
    fn from_json_rejects_non_objects() {
        let err = RaySoOptions::from_json(&json!("breeze")).unwrap_err();
        assert_eq!(err.errors(), ["Options must be an object."]);
    }
}
