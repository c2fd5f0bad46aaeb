//! Error taxonomy for the compile pipeline.
//!
//! Only [`AssetError`] is recovered locally (the inliner keeps the original
//! path). Everything wrapped in [`CompileError`] aborts the whole compile.

use std::path::PathBuf;

use thiserror::Error;

/// Per-leaf asset failure. Absorbed by the inliner, never surfaced to callers.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset path escapes the asset root: {0}")]
    PathEscapesRoot(String),

    #[error("failed to read asset {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("asset {path} is {size} bytes, above the {limit} byte source limit")]
    SourceTooLarge { path: String, size: u64, limit: u64 },

    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    #[error("image does not fit in {limit} bytes even at {width}px wide")]
    SizeBound { limit: usize, width: u32 },

    #[error("transcode task aborted: {0}")]
    Task(String),
}

/// The view program could not produce a tree, or the serialized markup would
/// not survive an HTML parser unchanged.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RenderError {
    #[error("binding `{0}` does not start at content, meta, loop or a loop alias")]
    UnknownBinding(String),

    #[error("view nesting exceeds {0} levels")]
    TooDeep(usize),

    #[error("void element <{0}> cannot have children")]
    VoidWithChildren(String),

    #[error("<{child}> inside <{parent}> would be re-parented by the browser")]
    InvalidNesting { parent: String, child: String },

    #[error("serialized markup does not round-trip: {0}")]
    MarkupMismatch(String),

    #[error("metadata cannot be exposed to bindings: {0}")]
    Metadata(String),
}

/// The client entry for a template could not be built.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("failed to serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("minification failed: {0}")]
    Minify(String),

    #[error("client entry for `{0}` contains a closing script tag")]
    UnsafeScript(String),
}

/// The assembled document broke one of its structural guarantees.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("assembly invariant violated: {0}")]
pub struct AssemblyInvariantViolation(pub String);

/// Request-level failure. Any of these means no HTML is returned.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("unknown template `{0}`")]
    TemplateNotFound(String),

    #[error("render failed: {0}")]
    Render(#[from] RenderError),

    #[error("client bundle synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),

    #[error(transparent)]
    Assembly(#[from] AssemblyInvariantViolation),
}

impl CompileError {
    /// Whether the failure is the caller's fault (4xx) rather than ours (5xx).
    pub fn is_client_error(&self) -> bool {
        matches!(self, CompileError::TemplateNotFound(_))
    }
}

/// Configuration file could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}
