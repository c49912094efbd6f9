//! Turns [`RaySoOptions`] into a [`RenderRequest`], collecting every violation.

use crate::error::ValidationError;
use crate::options::{Language, LocalPreview, RaySoOptions, RenderRequest, Theme};
use regex::Regex;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::LazyLock;

static POSIX_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(/[^/ ]*)+/?$").expect("static regex"));

static WINDOWS_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(?:[A-Za-z]:[\\/][^<>:"|?*\x00-\x1f]*|\\\\[^\\/<>:"|?*]+\\[^\\/<>:"|?*]+(?:\\[^<>:"|?*\x00-\x1f]*)?)$"#,
    )
    .expect("static regex")
});

/// Accepted shape of a local preview directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathShape {
    /// Absolute path without spaces, e.g. `/home/me/shots`.
    Posix,
    /// Drive (`C:\shots`, `C:/shots`) or UNC (`\\server\share\shots`) path.
    Windows,
}

impl PathShape {
    /// The shape matching the platform this binary was built for.
    pub fn host() -> Self {
        if cfg!(windows) {
            PathShape::Windows
        } else {
            PathShape::Posix
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathShape::Posix => POSIX_PATH.is_match(path),
            PathShape::Windows => WINDOWS_PATH.is_match(path),
        }
    }
}

/// Checks options against the enum tables and the configured path shape.
#[derive(Debug, Clone, Copy)]
pub struct Validator {
    path_shape: PathShape,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(PathShape::host())
    }
}

impl Validator {
    pub fn new(path_shape: PathShape) -> Self {
        Self { path_shape }
    }

    pub fn path_shape(&self) -> PathShape {
        self.path_shape
    }

    /// Validates typed options. Either every check passes or all failures are returned.
    pub fn validate(&self, options: &RaySoOptions) -> Result<RenderRequest, ValidationError> {
        let mut errors = Vec::new();
        let request = self.check(options, &mut errors);
        match request {
            Some(request) if errors.is_empty() => Ok(request),
            _ => Err(ValidationError::new(errors)),
        }
    }

    /// Validates untyped options: shape violations are reported along with value violations.
    pub fn validate_json(&self, value: &Value) -> Result<RenderRequest, ValidationError> {
        let (options, mut errors) = RaySoOptions::read_json(value);
        let request = self.check(&options, &mut errors);
        match request {
            Some(request) if errors.is_empty() => Ok(request),
            _ => Err(ValidationError::new(errors)),
        }
    }

    fn check(&self, options: &RaySoOptions, errors: &mut Vec<String>) -> Option<RenderRequest> {
        if !options.local_preview_path.is_empty()
            && !self.path_shape.matches(&options.local_preview_path)
        {
            errors.push(
                "The local preview path is incorrect. Please check it and try again.".to_string(),
            );
        }

        let theme = Theme::from_token(&options.theme);
        if theme.is_none() {
            errors.push(format!(
                "There is no such a theme. Available themes: {}.",
                Theme::ALL.map(|t| t.as_str()).join(", ")
            ));
        }

        let padding = options.padding.coerce();
        if padding.is_none() {
            errors.push("Padding parameter must be 16, 32, 64 or 128.".to_string());
        }

        let language = Language::from_token(&options.language);
        if language.is_none() {
            errors.push(
                "There is no such a language. Use 'auto' to define code language automatically."
                    .to_string(),
            );
        }

        if let Some(name) = &options.local_preview_file
            && !is_plain_file_name(name)
        {
            errors.push("Local preview file name must be a plain file name.".to_string());
        }

        Some(RenderRequest {
            title: options.title.clone(),
            theme: theme?,
            background: options.background,
            dark_mode: options.dark_mode,
            padding: padding?,
            language: language?,
            local_preview: options.local_preview.then(|| LocalPreview {
                dir: PathBuf::from(&options.local_preview_path),
                file_name: options.local_preview_file.clone(),
            }),
        })
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}
