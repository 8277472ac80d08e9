//! Raster images and asynchronous loading.
//!
//! Raster nodes never load anything themselves. Applying a `Source`
//! property queues a [`LoadRequest`]; the host drains the queue, resolves
//! each request through an [`ImageLoader`] and hands the result back with
//! `complete_load`. A result is installed only if the node still wants that
//! source, so a burst of source changes can never leave an older image on
//! screen.

use crate::arena::NodeId;
use crate::error::RasterError;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use kurbo::Size;
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

/// A decoded RGBA8 image.
#[derive(Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    pixels: Arc<[u8]>,
}

impl std::fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl RasterImage {
    /// Wrap raw RGBA8 pixels. Returns `None` if the buffer size does not match.
    pub fn from_rgba8(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        if pixels.len() != width as usize * height as usize * 4 {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels: pixels.into(),
        })
    }

    /// Decode an encoded image (PNG, JPEG, WebP).
    pub fn decode(bytes: &[u8]) -> Result<Self, RasterError> {
        let rgba = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Self {
            width,
            height,
            pixels: rgba.into_raw().into(),
        })
    }

    /// Decode a `data:<mime>;base64,<payload>` URL.
    pub fn from_data_url(url: &str) -> Result<Self, RasterError> {
        let unsupported = || RasterError::UnsupportedSource(truncate(url));
        let rest = url.strip_prefix("data:").ok_or_else(unsupported)?;
        let (header, payload) = rest.split_once(',').ok_or_else(unsupported)?;
        if !header.ends_with(";base64") {
            return Err(unsupported());
        }
        let bytes = STANDARD.decode(payload.trim()).map_err(|_| unsupported())?;
        Self::decode(&bytes)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> Size {
        Size::new(f64::from(self.width), f64::from(self.height))
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Encode as a PNG data URL.
    pub fn to_png_data_url(&self) -> Result<String, RasterError> {
        let buffer = image::RgbaImage::from_raw(self.width, self.height, self.pixels.to_vec())
            .ok_or_else(|| RasterError::UnsupportedSource("pixel buffer".into()))?;
        let mut png = std::io::Cursor::new(Vec::new());
        buffer.write_to(&mut png, image::ImageFormat::Png)?;
        Ok(format!("data:image/png;base64,{}", STANDARD.encode(png.into_inner())))
    }
}

fn truncate(source: &str) -> String {
    source.chars().take(48).collect()
}

/// A load the host has to perform for a raster node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub node: NodeId,
    pub source: String,
}

/// Future returned by [`ImageLoader::load`].
pub type LoadFuture<'a> = Pin<Box<dyn Future<Output = Result<RasterImage, RasterError>> + 'a>>;

/// Resolves raster sources to decoded images.
pub trait ImageLoader {
    fn load<'a>(&'a self, source: &'a str) -> LoadFuture<'a>;
}

/// Resolve every request in order, returning each with its result.
pub async fn load_all(
    loader: &dyn ImageLoader,
    requests: Vec<LoadRequest>,
) -> Vec<(LoadRequest, Result<RasterImage, RasterError>)> {
    let mut results = Vec::with_capacity(requests.len());
    for request in requests {
        let result = loader.load(&request.source).await;
        results.push((request, result));
    }
    results
}

/// Loader backed by a map of pre-decoded images. Data URLs decode directly.
#[derive(Debug, Default, Clone)]
pub struct MemoryImageLoader {
    images: HashMap<String, RasterImage>,
}

impl MemoryImageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: impl Into<String>, image: RasterImage) {
        self.images.insert(source.into(), image);
    }
}

impl ImageLoader for MemoryImageLoader {
    fn load<'a>(&'a self, source: &'a str) -> LoadFuture<'a> {
        Box::pin(async move {
            if source.starts_with("data:") {
                return RasterImage::from_data_url(source);
            }
            self.images
                .get(source)
                .cloned()
                .ok_or_else(|| RasterError::NotFound(source.to_string()))
        })
    }
}

/// Loader reading image files relative to a root directory.
#[derive(Debug, Clone)]
pub struct FileImageLoader {
    root: PathBuf,
}

impl FileImageLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, source: &str) -> Result<PathBuf, RasterError> {
        let path = Path::new(source);
        if source.contains("://") || path.is_absolute() {
            return Err(RasterError::UnsupportedSource(truncate(source)));
        }
        if path
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(RasterError::UnsupportedSource(truncate(source)));
        }
        Ok(self.root.join(path))
    }
}

impl ImageLoader for FileImageLoader {
    fn load<'a>(&'a self, source: &'a str) -> LoadFuture<'a> {
        Box::pin(async move {
            if source.starts_with("data:") {
                return RasterImage::from_data_url(source);
            }
            let path = self.resolve(source)?;
            let bytes = match std::fs::read(&path) {
                Ok(bytes) => bytes,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    return Err(RasterError::NotFound(source.to_string()));
                }
                Err(err) => return Err(err.into()),
            };
            log::debug!("loaded {} bytes from {}", bytes.len(), path.display());
            RasterImage::decode(&bytes)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker() -> RasterImage {
        RasterImage::from_rgba8(2, 1, vec![255, 0, 0, 255, 0, 0, 255, 255]).unwrap()
    }

    #[test]
    fn test_from_rgba8_checks_size() {
        assert!(RasterImage::from_rgba8(2, 2, vec![0; 4]).is_none());
        assert_eq!(checker().size(), Size::new(2.0, 1.0));
    }

    #[test]
    fn test_data_url_decodes_png() {
        let url = checker().to_png_data_url().unwrap();
        let decoded = RasterImage::from_data_url(&url).unwrap();
        assert_eq!(decoded, checker());
    }

    #[test]
    fn test_data_url_rejects_non_base64() {
        assert!(matches!(
            RasterImage::from_data_url("data:image/png,raw"),
            Err(RasterError::UnsupportedSource(_))
        ));
        assert!(RasterImage::from_data_url("data:image/png;base64,????").is_err());
    }

    #[test]
    fn test_memory_loader() {
        let mut loader = MemoryImageLoader::new();
        loader.insert("a.png", checker());
        let found = pollster::block_on(loader.load("a.png")).unwrap();
        assert_eq!(found.width(), 2);
        assert!(matches!(
            pollster::block_on(loader.load("missing.png")),
            Err(RasterError::NotFound(_))
        ));
    }

    #[test]
    fn test_file_loader_reads_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let url = checker().to_png_data_url().unwrap();
        let png = STANDARD.decode(url.split_once(',').unwrap().1).unwrap();
        std::fs::write(dir.path().join("img.png"), png).unwrap();

        let loader = FileImageLoader::new(dir.path());
        let image = pollster::block_on(loader.load("img.png")).unwrap();
        assert_eq!(image, checker());
        assert!(matches!(
            pollster::block_on(loader.load("nope.png")),
            Err(RasterError::NotFound(_))
        ));
        assert!(matches!(
            pollster::block_on(loader.load("../escape.png")),
            Err(RasterError::UnsupportedSource(_))
        ));
        assert!(matches!(
            pollster::block_on(loader.load("https://example.com/a.png")),
            Err(RasterError::UnsupportedSource(_))
        ));
    }

    #[test]
    fn test_load_all_keeps_order() {
        let mut loader = MemoryImageLoader::new();
        loader.insert("a", checker());
        let node = {
            use crate::backend::{NodeKind, SceneBackend};
            let mut scene = crate::svg::SvgScene::new();
            scene.create(NodeKind::Raster)
        };
        let requests = vec![
            LoadRequest { node, source: "a".into() },
            LoadRequest { node, source: "b".into() },
        ];
        let results = pollster::block_on(load_all(&loader, requests));
        assert!(results[0].1.is_ok());
        assert!(results[1].1.is_err());
    }
}
