//! # invitation-forge – Template-driven invitation compiler
//!
//! This crate turns a template identifier and a free-form content tree into
//! one self-contained, hydratable HTML document. The pipeline stages are:
//!
//! 1. **Resolve** – look the template up in the registry ([`templates`])
//! 2. **Inline** – local image references become size-bounded data URIs ([`assets`])
//! 3. **Derive** – project title, slug and dates from the content ([`metadata`])
//! 4. **Render** – interpret the template's view program to markup
//!    ([`render`], [`view`], [`markup`])
//! 5. **Synthesize** – the cached, minified hydration entry ([`bundle`], [`jsminify`])
//! 6. **Assemble** – one HTML file with markup, payload and script ([`document`])
//!
//! [`pipeline::Compiler`] runs all of them; [`server`] exposes it over HTTP.

pub mod assets;
pub mod bundle;
pub mod config;
pub mod content;
pub mod document;
pub mod error;
pub mod jsminify;
pub mod markup;
pub mod metadata;
pub mod pipeline;
pub mod render;
pub mod server;
pub mod templates;
pub mod view;

// Re-exports for convenience
pub use config::CompilerConfig;
pub use error::CompileError;
pub use pipeline::{compile, CompileRequest, CompiledArtifact, Compiler};
