//! Compiler configuration – transcode limits, asset root, and the whitelist of
//! external resources an artifact is allowed to reference.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Knobs for one compiler instance. Every field has a default, so a config
/// file only needs to mention what it overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompilerConfig {
    /// Directory that relative asset references are resolved against.
    pub asset_root: PathBuf,
    /// Inlined images are downscaled to at most this many pixels wide.
    pub max_image_width: u32,
    /// Starting JPEG quality (1–100).
    pub jpeg_quality: u8,
    /// Quality floor used when shrinking an image to fit `max_inlined_bytes`.
    pub min_jpeg_quality: u8,
    /// Ceiling on the decoded size of one inlined image.
    pub max_inlined_bytes: usize,
    /// Source files larger than this are not even read.
    pub max_source_bytes: u64,
    /// Upper bound on images decoded at the same time.
    pub max_concurrent_decodes: usize,
    /// Re-parse the rendered markup and compare it with the tree.
    pub verify_markup: bool,
    /// `lang` attribute of the generated document.
    pub lang: String,
    /// External stylesheet/script links placed in `<head>`.
    pub resource_links: Vec<ResourceLink>,
    /// Hosts a resource link may point at. Anything else is dropped.
    pub allowed_resource_hosts: Vec<String>,
}

/// Kind of external resource linked from the document head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Stylesheet,
    Preconnect,
    Script,
}

/// One whitelisted external resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLink {
    pub kind: ResourceKind,
    pub href: String,
}

impl ResourceLink {
    pub fn stylesheet(href: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::Stylesheet,
            href: href.into(),
        }
    }

    /// Host part of an `https://` href, or `None` for any other scheme.
    pub fn https_host(&self) -> Option<&str> {
        let rest = self.href.strip_prefix("https://")?;
        let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
        let authority = &rest[..end];
        // Userinfo would let `https://fonts.googleapis.com@evil.test` pass a
        // naive host check.
        if authority.contains('@') || authority.is_empty() {
            return None;
        }
        Some(authority.split(':').next().unwrap_or(authority))
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("public"),
            max_image_width: 1200,
            jpeg_quality: 80,
            min_jpeg_quality: 40,
            max_inlined_bytes: 512 * 1024,
            max_source_bytes: 25 * 1024 * 1024,
            max_concurrent_decodes: 4,
            verify_markup: true,
            lang: "id".to_string(),
            resource_links: vec![
                ResourceLink {
                    kind: ResourceKind::Preconnect,
                    href: "https://fonts.googleapis.com".to_string(),
                },
                ResourceLink::stylesheet(concat!(
                    "https://fonts.googleapis.com/css2?family=Great+Vibes",
                    "&family=Lora:ital,wght@0,400;0,600;1,400&display=swap",
                )),
                ResourceLink {
                    kind: ResourceKind::Script,
                    href: "https://cdn.tailwindcss.com".to_string(),
                },
            ],
            allowed_resource_hosts: vec![
                "fonts.googleapis.com".to_string(),
                "fonts.gstatic.com".to_string(),
                "cdn.tailwindcss.com".to_string(),
            ],
        }
    }
}

impl CompilerConfig {
    /// Deserialise from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Resource links that pass the host whitelist, in configured order.
    pub fn allowed_links(&self) -> Vec<&ResourceLink> {
        self.resource_links
            .iter()
            .filter(|link| {
                let allowed = link.https_host().is_some_and(|host| {
                    self.allowed_resource_hosts
                        .iter()
                        .any(|h| h.eq_ignore_ascii_case(host))
                });
                if !allowed {
                    log::warn!("Dropping non-whitelisted resource link {}", link.href);
                }
                allowed
            })
            .collect()
    }
}
