//! Error types returned by [`RaySo::render`](crate::RaySo::render).

use std::fmt;
use thiserror::Error;

/// Result type alias for render operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything a render call can fail with.
#[derive(Error, Debug)]
pub enum Error {
    /// The options were rejected before any browser was started.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The browser failed somewhere between launch and cleanup.
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Every constraint violation found in a set of options, in check order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Parameters validation failed.\n\nError message(s): \n{}\n", .errors.join("\n"))]
pub struct ValidationError {
    errors: Vec<String>,
}

impl ValidationError {
    /// Wraps a non-empty list of messages.
    pub(crate) fn new(errors: Vec<String>) -> Self {
        debug_assert!(!errors.is_empty());
        Self { errors }
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }
}

/// The step of the render sequence a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStage {
    Launch,
    Navigate,
    Select,
    Capture,
    Persist,
}

impl fmt::Display for RenderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RenderStage::Launch => "launching the browser",
            RenderStage::Navigate => "loading the page",
            RenderStage::Select => "selecting the frame",
            RenderStage::Capture => "taking the screenshot",
            RenderStage::Persist => "writing the local preview",
        };
        f.write_str(name)
    }
}

/// A failure of the browser collaborator, tagged with the stage it broke in.
#[derive(Error, Debug)]
#[error("Render failed while {stage}: {cause:#}")]
pub struct RenderError {
    stage: RenderStage,
    cause: anyhow::Error,
}

impl RenderError {
    pub fn new(stage: RenderStage, cause: impl Into<anyhow::Error>) -> Self {
        Self {
            stage,
            cause: cause.into(),
        }
    }

    pub fn stage(&self) -> RenderStage {
        self.stage
    }

    /// The automation-layer failure, with its context chain.
    pub fn cause(&self) -> &anyhow::Error {
        &self.cause
    }
}
