//! Asset inliner – rewrites a content tree so every local image reference
//! becomes a size-bounded `data:` URI.
//!
//! The tree is rebuilt bottom-up, never mutated. Each distinct image path is
//! an independent job: all jobs run concurrently and are joined before any
//! container is rebuilt. The decode/encode work runs on the blocking pool,
//! gated by a semaphore so a gallery of camera originals cannot all sit in
//! memory at once.
//!
//! A leaf that cannot be read or transcoded keeps its original path string;
//! the compile carries on with the rest of the tree.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};
use futures::future::join_all;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use serde_json::{Map, Value};
use tokio::sync::Semaphore;

use crate::config::CompilerConfig;
use crate::content::{is_asset_reference, normalize_asset_path, ContentTree};
use crate::error::AssetError;

/// Quality is lowered by this much per attempt when an encode is too large.
const QUALITY_STEP: u8 = 10;
/// Images are never shrunk below this width while hunting for a fit.
const MIN_WIDTH: u32 = 160;

// ---------------------------------------------------------------------------
// Path resolution
// ---------------------------------------------------------------------------

/// Maps a relative asset reference to its raw bytes.
///
/// Implementations are called from the blocking pool, so plain synchronous
/// I/O is fine.
pub trait AssetResolver: Send + Sync {
    fn resolve(&self, path: &str) -> Result<Vec<u8>, AssetError>;
}

impl<F> AssetResolver for F
where
    F: Fn(&str) -> Result<Vec<u8>, AssetError> + Send + Sync,
{
    fn resolve(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        self(path)
    }
}

/// Reads assets from a directory on disk.
#[derive(Debug, Clone)]
pub struct FsAssetResolver {
    root: PathBuf,
    max_source_bytes: u64,
}

impl FsAssetResolver {
    pub fn new(root: impl Into<PathBuf>, max_source_bytes: u64) -> Self {
        Self {
            root: root.into(),
            max_source_bytes,
        }
    }

    pub fn from_config(config: &CompilerConfig) -> Self {
        Self::new(&config.asset_root, config.max_source_bytes)
    }
}

impl AssetResolver for FsAssetResolver {
    fn resolve(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        let rel = Path::new(path);
        let only_normal = rel
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !only_normal {
            return Err(AssetError::PathEscapesRoot(path.to_string()));
        }

        let root = self.root.canonicalize().map_err(read_err(&self.root))?;
        let full = root.join(rel);
        let full = full.canonicalize().map_err(read_err(&full))?;
        // Symlinks inside the root may still point outside it.
        if !full.starts_with(&root) {
            return Err(AssetError::PathEscapesRoot(path.to_string()));
        }

        let size = std::fs::metadata(&full).map_err(read_err(&full))?.len();
        if size > self.max_source_bytes {
            return Err(AssetError::SourceTooLarge {
                path: path.to_string(),
                size,
                limit: self.max_source_bytes,
            });
        }
        std::fs::read(&full).map_err(read_err(&full))
    }
}

fn read_err(path: &Path) -> impl FnOnce(std::io::Error) -> AssetError {
    let path = path.to_path_buf();
    move |source| AssetError::Read { path, source }
}

// ---------------------------------------------------------------------------
// Transcoding
// ---------------------------------------------------------------------------

/// Limits applied to every inlined image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeParams {
    pub max_width: u32,
    pub quality: u8,
    pub min_quality: u8,
    pub max_bytes: usize,
}

impl From<&CompilerConfig> for TranscodeParams {
    fn from(config: &CompilerConfig) -> Self {
        Self {
            max_width: config.max_image_width.max(1),
            quality: config.jpeg_quality.clamp(1, 100),
            min_quality: config
                .min_jpeg_quality
                .clamp(1, config.jpeg_quality.clamp(1, 100)),
            max_bytes: config.max_inlined_bytes,
        }
    }
}

impl Default for TranscodeParams {
    fn default() -> Self {
        Self::from(&CompilerConfig::default())
    }
}

/// An encoded image ready to be embedded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlinedImage {
    pub mime: &'static str,
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

impl InlinedImage {
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, BASE64_STD.encode(&self.bytes))
    }
}

/// Decode `bytes`, cap the width, and re-encode within `params.max_bytes`.
///
/// Sources that actually use transparency become PNG; everything else becomes
/// baseline JPEG. When the first encode is too large the JPEG quality is
/// stepped down to `min_quality`, then the width is reduced by a quarter per
/// round until the image fits or [`MIN_WIDTH`] is reached.
pub fn transcode(bytes: &[u8], params: &TranscodeParams) -> Result<InlinedImage, AssetError> {
    let source = image::load_from_memory(bytes).map_err(AssetError::Decode)?;
    let transparent = uses_transparency(&source);
    let mut width = source.width().min(params.max_width).max(1);

    loop {
        let scaled = scale_to_width(&source, width);

        if transparent {
            let png = encode_png(&scaled)?;
            if png.len() <= params.max_bytes {
                return Ok(InlinedImage {
                    mime: "image/png",
                    width: scaled.width(),
                    height: scaled.height(),
                    bytes: png,
                });
            }
        } else {
            let rgb = DynamicImage::ImageRgb8(scaled.to_rgb8());
            let mut quality = params.quality;
            loop {
                let jpeg = encode_jpeg(&rgb, quality)?;
                if jpeg.len() <= params.max_bytes {
                    return Ok(InlinedImage {
                        mime: "image/jpeg",
                        width: rgb.width(),
                        height: rgb.height(),
                        bytes: jpeg,
                    });
                }
                if quality <= params.min_quality {
                    break;
                }
                quality = quality.saturating_sub(QUALITY_STEP).max(params.min_quality);
            }
        }

        if width <= MIN_WIDTH {
            return Err(AssetError::SizeBound {
                limit: params.max_bytes,
                width,
            });
        }
        width = (width / 4 * 3).max(MIN_WIDTH);
    }
}

fn uses_transparency(img: &DynamicImage) -> bool {
    if !img.color().has_alpha() {
        return false;
    }
    match img.as_rgba8() {
        Some(buf) => buf.pixels().any(|p| p[3] < u8::MAX),
        None => img.to_rgba8().pixels().any(|p| p[3] < u8::MAX),
    }
}

fn scale_to_width(img: &DynamicImage, width: u32) -> DynamicImage {
    if width >= img.width() {
        return img.clone();
    }
    let height = ((u64::from(img.height()) * u64::from(width)) / u64::from(img.width())).max(1);
    img.resize_exact(width, height as u32, FilterType::Triangle)
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, AssetError> {
    let mut buf = Vec::new();
    img.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))
        .map_err(AssetError::Encode)?;
    Ok(buf)
}

fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, AssetError> {
    let mut buf = Vec::new();
    let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
    rgba.write_with_encoder(PngEncoder::new(&mut buf))
        .map_err(AssetError::Encode)?;
    Ok(buf)
}

// ---------------------------------------------------------------------------
// Tree rewriting
// ---------------------------------------------------------------------------

/// Outcome counters for one inlining pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineReport {
    pub inlined: usize,
    /// Paths that kept their original value, in tree order.
    pub failed: Vec<String>,
}

/// Rewrites image leaves of a content tree into data URIs.
#[derive(Clone)]
pub struct AssetInliner {
    resolver: Arc<dyn AssetResolver>,
    params: TranscodeParams,
    permits: Arc<Semaphore>,
}

impl AssetInliner {
    pub fn new(
        resolver: Arc<dyn AssetResolver>,
        params: TranscodeParams,
        max_concurrent_decodes: usize,
    ) -> Self {
        Self {
            resolver,
            params,
            permits: Arc::new(Semaphore::new(max_concurrent_decodes.max(1))),
        }
    }

    pub fn from_config(config: &CompilerConfig, resolver: Arc<dyn AssetResolver>) -> Self {
        Self::new(
            resolver,
            TranscodeParams::from(config),
            config.max_concurrent_decodes,
        )
    }

    /// Build a new tree with every local image reference inlined.
    ///
    /// The output has exactly the input's shape. Identical paths within one
    /// tree are transcoded once.
    pub async fn inline(&self, tree: &ContentTree) -> (ContentTree, InlineReport) {
        let mut paths = Vec::new();
        collect_asset_paths(tree, &mut paths);
        paths.sort_unstable();
        paths.dedup();

        let jobs = paths.iter().map(|path| async move {
            let outcome = self.inline_leaf(path).await;
            if let Err(err) = &outcome {
                log::warn!("Keeping original asset reference {path:?}: {err}");
            }
            (path.to_string(), outcome.ok())
        });
        // Fan-in: every leaf result is in before any container is rebuilt.
        let resolved: HashMap<String, Option<String>> =
            join_all(jobs).await.into_iter().collect();

        let mut report = InlineReport::default();
        let out = rebuild(tree, &resolved, &mut report);
        (out, report)
    }

    async fn inline_leaf(&self, path: &str) -> Result<String, AssetError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| AssetError::Task(e.to_string()))?;
        let resolver = Arc::clone(&self.resolver);
        let params = self.params.clone();
        let rel = normalize_asset_path(path).to_string();

        let image = tokio::task::spawn_blocking(move || {
            let bytes = resolver.resolve(&rel)?;
            transcode(&bytes, &params)
        })
        .await
        .map_err(|e| AssetError::Task(e.to_string()))??;

        log::debug!(
            "Inlined {path} as {} {}x{} ({} bytes)",
            image.mime,
            image.width,
            image.height,
            image.bytes.len()
        );
        Ok(image.to_data_uri())
    }
}

fn collect_asset_paths<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::String(s) if is_asset_reference(s) => out.push(s),
        Value::Array(items) => items.iter().for_each(|v| collect_asset_paths(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_asset_paths(v, out)),
        _ => {}
    }
}

/// Rebuild the tree bottom-up from the joined leaf results.
fn rebuild(
    value: &Value,
    resolved: &HashMap<String, Option<String>>,
    report: &mut InlineReport,
) -> Value {
    match value {
        Value::String(s) if is_asset_reference(s) => match resolved.get(s.as_str()) {
            Some(Some(uri)) => {
                report.inlined += 1;
                Value::String(uri.clone())
            }
            _ => {
                report.failed.push(s.clone());
                value.clone()
            }
        },
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| rebuild(item, resolved, report))
                .collect(),
        ),
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, v) in map {
                out.insert(key.clone(), rebuild(v, resolved, report));
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
    use serde_json::json;
    use std::io::Cursor;

    fn decode_data_uri(src: &str) -> Option<(String, Vec<u8>)> {
        let (header, data) = src.strip_prefix("data:")?.split_once(',')?;
        let mime = header.strip_suffix(";base64")?;
        Some((mime.to_string(), BASE64_STD.decode(data).ok()?))
    }

    fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Jpeg).unwrap();
        out.into_inner()
    }

    fn png_bytes(width: u32, height: u32, alpha: u8) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 10, 10, alpha]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn resolver_with(files: Vec<(&'static str, Vec<u8>)>) -> Arc<dyn AssetResolver> {
        let files: HashMap<&'static str, Vec<u8>> = files.into_iter().collect();
        Arc::new(move |path: &str| {
            files.get(path).cloned().ok_or_else(|| AssetError::Read {
                path: PathBuf::from(path),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
        })
    }

    #[test]
    fn transcode_caps_width_and_keeps_aspect() {
        let params = TranscodeParams {
            max_width: 300,
            ..TranscodeParams::default()
        };
        let out = transcode(&jpeg_bytes(900, 600), &params).unwrap();
        assert_eq!(out.mime, "image/jpeg");
        assert_eq!((out.width, out.height), (300, 200));
        assert!(out.bytes.len() <= params.max_bytes);
    }

    #[test]
    fn transcode_never_upscales() {
        let out = transcode(&jpeg_bytes(40, 30), &TranscodeParams::default()).unwrap();
        assert_eq!((out.width, out.height), (40, 30));
    }

    #[test]
    fn transparent_png_stays_png() {
        let out = transcode(&png_bytes(20, 20, 128), &TranscodeParams::default()).unwrap();
        assert_eq!(out.mime, "image/png");
    }

    #[test]
    fn opaque_png_becomes_jpeg() {
        let out = transcode(&png_bytes(20, 20, 255), &TranscodeParams::default()).unwrap();
        assert_eq!(out.mime, "image/jpeg");
    }

    #[test]
    fn transcode_shrinks_to_fit_byte_ceiling() {
        let params = TranscodeParams {
            max_width: 1200,
            quality: 95,
            min_quality: 40,
            max_bytes: 20 * 1024,
        };
        let out = transcode(&jpeg_bytes(1600, 1200), &params).unwrap();
        assert!(out.bytes.len() <= params.max_bytes);
        assert!(out.width <= 1200);
    }

    #[test]
    fn transcode_reports_impossible_ceiling() {
        let params = TranscodeParams {
            max_bytes: 16,
            ..TranscodeParams::default()
        };
        let err = transcode(&jpeg_bytes(400, 300), &params).unwrap_err();
        assert!(matches!(err, AssetError::SizeBound { limit: 16, .. }));
    }

    #[test]
    fn transcode_is_deterministic() {
        let src = jpeg_bytes(500, 400);
        let a = transcode(&src, &TranscodeParams::default()).unwrap();
        let b = transcode(&src, &TranscodeParams::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn data_uri_round_trips_through_decoder() {
        let image = InlinedImage {
            mime: "image/png",
            width: 1,
            height: 1,
            bytes: vec![1, 2, 3],
        };
        let (mime, bytes) = decode_data_uri(&image.to_data_uri()).unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(bytes, vec![1, 2, 3]);
        assert!(decode_data_uri("photo.png").is_none());
        assert!(decode_data_uri("data:text/plain,hello").is_none());
    }

    #[tokio::test]
    async fn missing_leaf_keeps_path_and_siblings_inline() {
        let inliner = AssetInliner::new(
            resolver_with(vec![("cover.jpg", jpeg_bytes(64, 48))]),
            TranscodeParams::default(),
            2,
        );
        let tree = json!({
            "cover": "cover.jpg",
            "gallery": ["missing.png", "/cover.jpg"],
            "caption": "cover.jpg is nice",
        });
        let (out, report) = inliner.inline(&tree).await;

        assert!(out["cover"].as_str().unwrap().starts_with("data:image/jpeg;base64,"));
        assert_eq!(out["gallery"][0], json!("missing.png"));
        assert!(out["gallery"][1].as_str().unwrap().starts_with("data:image/jpeg;base64,"));
        assert_eq!(out["caption"], json!("cover.jpg is nice"));
        assert_eq!(report.inlined, 2);
        assert_eq!(report.failed, vec!["missing.png".to_string()]);
    }

    #[tokio::test]
    async fn undecodable_bytes_keep_path() {
        let inliner = AssetInliner::new(
            resolver_with(vec![("broken.png", b"not an image".to_vec())]),
            TranscodeParams::default(),
            1,
        );
        let (out, report) = inliner.inline(&json!({ "a": "broken.png" })).await;
        assert_eq!(out, json!({ "a": "broken.png" }));
        assert_eq!(report.failed.len(), 1);
    }

    #[tokio::test]
    async fn object_key_order_is_preserved() {
        let inliner = AssetInliner::new(resolver_with(vec![]), TranscodeParams::default(), 1);
        let raw = r#"{"zeta":1,"alpha":{"m":2,"b":3},"mid":[true,null]}"#;
        let tree: Value = serde_json::from_str(raw).unwrap();
        let (out, _) = inliner.inline(&tree).await;
        assert_eq!(
            serde_json::to_string(&out).unwrap(),
            r#"{"zeta":1,"alpha":{"m":2,"b":3},"mid":[true,null]}"#
        );
    }

    #[test]
    fn fs_resolver_rejects_parent_components() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = FsAssetResolver::new(dir.path(), 1024);
        let err = resolver.resolve("../etc/passwd.png").unwrap_err();
        assert!(matches!(err, AssetError::PathEscapesRoot(_)));
    }

    #[test]
    fn fs_resolver_enforces_source_limit() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("big.png"), vec![0u8; 2048]).unwrap();
        let resolver = FsAssetResolver::new(dir.path(), 1024);
        let err = resolver.resolve("big.png").unwrap_err();
        assert!(matches!(err, AssetError::SourceTooLarge { size: 2048, .. }));
    }
}
