//! Pipeline – ties together inlining, rendering, bundle synthesis and
//! assembly into a single call.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::assets::{AssetInliner, AssetResolver, FsAssetResolver};
use crate::bundle::{synthesize, DataPayload};
use crate::config::CompilerConfig;
use crate::content::{lookup_str, ContentTree};
use crate::document::{assemble, DocumentHead};
use crate::error::CompileError;
use crate::render::render_with;
use crate::templates;

/// Inbound compile request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileRequest {
    pub template_identifier: String,
    /// Falls back to the template's default content when absent or null.
    #[serde(default)]
    pub content: Option<ContentTree>,
}

impl CompileRequest {
    pub fn new(template_identifier: impl Into<String>, content: ContentTree) -> Self {
        Self {
            template_identifier: template_identifier.into(),
            content: Some(content),
        }
    }
}

/// What happened during one compile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileReport {
    pub template: String,
    pub inlined_assets: usize,
    pub failed_assets: Vec<String>,
    pub bytes: usize,
}

/// A finished artifact. Never partial.
#[derive(Debug, Clone)]
pub struct CompiledArtifact {
    pub html: String,
    pub title: String,
    pub slug: String,
    pub report: CompileReport,
}

/// A configured compiler. Cheap to share behind an `Arc`.
pub struct Compiler {
    config: CompilerConfig,
    inliner: AssetInliner,
}

impl Compiler {
    pub fn new(config: CompilerConfig, resolver: Arc<dyn AssetResolver>) -> Self {
        let inliner = AssetInliner::from_config(&config, resolver);
        Self { config, inliner }
    }

    /// Compiler reading assets from `config.asset_root`.
    pub fn from_config(config: CompilerConfig) -> Self {
        let resolver = Arc::new(FsAssetResolver::from_config(&config));
        Self::new(config, resolver)
    }

    /// Compile one request into a self-contained HTML document.
    pub async fn compile(
        &self,
        request: &CompileRequest,
    ) -> Result<CompiledArtifact, CompileError> {
        let result = self.run(request).await;
        match &result {
            Ok(artifact) => log::info!(
                "Compiled '{}' with template '{}': {} bytes, {} asset(s) inlined, {} kept as paths",
                artifact.slug,
                artifact.report.template,
                artifact.report.bytes,
                artifact.report.inlined_assets,
                artifact.report.failed_assets.len()
            ),
            Err(err) if err.is_client_error() => log::warn!("Compile rejected: {err}"),
            Err(err) => log::error!("Compile failed: {err}"),
        }
        result
    }

    async fn run(&self, request: &CompileRequest) -> Result<CompiledArtifact, CompileError> {
        let descriptor = templates::resolve(&request.template_identifier)?;
        let content = request
            .content
            .as_ref()
            .unwrap_or(&descriptor.default_content);

        let (content, inline_report) = self.inliner.inline(content).await;
        let meta = descriptor.derive_metadata(&content);

        let markup = render_with(descriptor, &content, &meta, self.config.verify_markup)?;
        let script = synthesize(descriptor, &content, &meta)?;
        let payload = DataPayload::new(descriptor.identifier, &meta, &content).to_script_json()?;

        let lang = match lookup_str(&content, "locale") {
            Some(_) => meta.locale.as_str(),
            None => self.config.lang.as_str(),
        };
        let description = match &meta.event_date_display {
            Some(date) => format!("{} · {}", meta.title, date),
            None => meta.title.clone(),
        };
        let head = DocumentHead {
            lang,
            title: &meta.title,
            description: &description,
            stylesheet: descriptor.stylesheet,
            resources: self.config.allowed_links(),
        };
        let html = assemble(&head, &markup, &payload, &script)?;

        let report = CompileReport {
            template: descriptor.identifier.to_string(),
            inlined_assets: inline_report.inlined,
            failed_assets: inline_report.failed,
            bytes: html.len(),
        };
        Ok(CompiledArtifact {
            html,
            title: meta.title,
            slug: meta.slug,
            report,
        })
    }
}

/// One-shot compile with an explicit resolver.
pub async fn compile(
    request: &CompileRequest,
    config: &CompilerConfig,
    resolver: Arc<dyn AssetResolver>,
) -> Result<CompiledArtifact, CompileError> {
    Compiler::new(config.clone(), resolver).compile(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssetError;
    use serde_json::json;

    fn no_assets() -> Arc<dyn AssetResolver> {
        Arc::new(|path: &str| -> Result<Vec<u8>, AssetError> {
            Err(AssetError::PathEscapesRoot(path.to_string()))
        })
    }

    #[tokio::test]
    async fn pipeline_basic() {
        let request = CompileRequest::new(
            "sakinah",
            json!({ "couple": { "bride": "Alifah", "groom": "Faris" }, "eventDate": "2025-11-23" }),
        );
        let artifact = compile(&request, &CompilerConfig::default(), no_assets())
            .await
            .unwrap();
        assert!(artifact.html.starts_with("<!DOCTYPE html>"));
        assert_eq!(artifact.slug, "the-wedding-of-alifah-faris");
        assert_eq!(artifact.report.bytes, artifact.html.len());
        assert!(artifact.html.contains("<html lang=\"id\">"));
    }

    #[tokio::test]
    async fn missing_content_uses_template_defaults() {
        let request: CompileRequest =
            serde_json::from_str(r#"{ "templateIdentifier": "Aurora" }"#).unwrap();
        let artifact = compile(&request, &CompilerConfig::default(), no_assets())
            .await
            .unwrap();
        assert!(artifact.html.contains("Alifah &amp; Faris"));
        assert!(artifact.html.contains("<html lang=\"en\">"));
    }

    #[tokio::test]
    async fn unknown_template_is_rejected() {
        let request = CompileRequest::new("nope", json!({}));
        let err = compile(&request, &CompilerConfig::default(), no_assets())
            .await
            .unwrap_err();
        assert!(matches!(err, CompileError::TemplateNotFound(_)));
    }

    #[tokio::test]
    async fn configured_lang_applies_without_locale() {
        let config = CompilerConfig {
            lang: "ms".to_string(),
            ..CompilerConfig::default()
        };
        let request = CompileRequest::new("celebration", json!({ "honoree": { "name": "Naya" } }));
        let artifact = compile(&request, &config, no_assets()).await.unwrap();
        assert!(artifact.html.contains("<html lang=\"ms\">"));
    }
}
