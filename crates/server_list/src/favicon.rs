//! Favicon lookup, decoding and caching.
//!
//! The cache keys icons by their resolved name. A miss fetches raw bytes from a
//! [`ByteSource`] and hands them to an [`IconDecoder`]; only successful results
//! are stored, so a broken file is retried on the next ping. There is no expiry:
//! [`FaviconCache::clear`] drops everything when profiles are reloaded.

use crate::error::{FaviconError, FaviconResult};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use dashmap::DashMap;
use std::io::{Cursor, ErrorKind};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Edge length, in pixels, of a server list icon
pub const DEFAULT_FAVICON_SIZE: u32 = 64;

/// Resolves an icon key to raw file bytes.
pub trait ByteSource: Send + Sync {
    fn fetch(&self, key: &str) -> FaviconResult<Vec<u8>>;
}

impl<F> ByteSource for F
where
    F: Fn(&str) -> FaviconResult<Vec<u8>> + Send + Sync,
{
    fn fetch(&self, key: &str) -> FaviconResult<Vec<u8>> {
        self(key)
    }
}

/// Turns raw bytes into a cached icon value.
pub trait IconDecoder<T>: Send + Sync {
    fn decode(&self, key: &str, bytes: &[u8]) -> FaviconResult<T>;
}

impl<T, F> IconDecoder<T> for F
where
    F: Fn(&str, &[u8]) -> FaviconResult<T> + Send + Sync,
{
    fn decode(&self, key: &str, bytes: &[u8]) -> FaviconResult<T> {
        self(key, bytes)
    }
}

/// Reads icons from a directory. Keys without an extension get `.png` appended.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path for `key`, refusing anything that would leave the root directory.
    pub fn path_for(&self, key: &str) -> FaviconResult<PathBuf> {
        let relative = Path::new(key);
        let is_plain = !key.is_empty()
            && !key.contains('\\')
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !is_plain {
            return Err(FaviconError::InvalidKey(key.to_string()));
        }

        let mut path = self.root.join(relative);
        if path.extension().is_none() {
            path.set_extension("png");
        }
        Ok(path)
    }
}

impl ByteSource for DirectorySource {
    fn fetch(&self, key: &str) -> FaviconResult<Vec<u8>> {
        let path = self.path_for(key)?;
        std::fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => FaviconError::NotFound(key.to_string()),
            _ => FaviconError::Read(path, e),
        })
    }
}

/// A decoded icon, scaled to the favicon size, with its wire encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedIcon {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
    png: Vec<u8>,
    data_uri: String,
}

impl DecodedIcon {
    /// Encodes 8-bit RGBA pixels.
    pub fn from_rgba(key: &str, width: u32, height: u32, rgba: Vec<u8>) -> FaviconResult<Self> {
        if width == 0 || height == 0 || rgba.len() != (width as usize) * (height as usize) * 4 {
            return Err(FaviconError::InvalidDimensions {
                key: key.to_string(),
                width,
                height,
            });
        }
        let png = encode_png(key, width, height, &rgba)?;
        let data_uri = format!("data:image/png;base64,{}", STANDARD.encode(&png));
        Ok(Self {
            width,
            height,
            rgba,
            png,
            data_uri,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    pub fn png_bytes(&self) -> &[u8] {
        &self.png
    }

    /// `data:image/png;base64,...`, the form clients expect in a status response.
    pub fn data_uri(&self) -> &str {
        &self.data_uri
    }
}

fn encode_png(key: &str, width: u32, height: u32, rgba: &[u8]) -> FaviconResult<Vec<u8>> {
    let encode_error = |e: png::EncodingError| FaviconError::Encode(key.to_string(), e.to_string());

    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().map_err(encode_error)?;
        writer.write_image_data(rgba).map_err(encode_error)?;
        writer.finish().map_err(encode_error)?;
    }
    Ok(out)
}

/// Decodes PNG files and scales them to a square icon.
#[derive(Debug, Clone, Copy)]
pub struct PngDecoder {
    size: u32,
}

impl Default for PngDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_FAVICON_SIZE)
    }
}

impl PngDecoder {
    pub fn new(size: u32) -> Self {
        Self { size: size.max(1) }
    }

    pub fn size(&self) -> u32 {
        self.size
    }
}

impl IconDecoder<DecodedIcon> for PngDecoder {
    fn decode(&self, key: &str, bytes: &[u8]) -> FaviconResult<DecodedIcon> {
        let decode_error = |e: png::DecodingError| FaviconError::Decode(key.to_string(), e.to_string());

        let mut decoder = png::Decoder::new(Cursor::new(bytes));
        decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
        let mut reader = decoder.read_info().map_err(decode_error)?;
        let mut buffer = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buffer).map_err(decode_error)?;
        let data = &buffer[..info.buffer_size()];

        if info.width == 0 || info.height == 0 {
            return Err(FaviconError::InvalidDimensions {
                key: key.to_string(),
                width: info.width,
                height: info.height,
            });
        }

        let rgba = match info.color_type {
            png::ColorType::Rgba => data.to_vec(),
            png::ColorType::Rgb => data
                .chunks_exact(3)
                .flat_map(|p| [p[0], p[1], p[2], u8::MAX])
                .collect(),
            png::ColorType::GrayscaleAlpha => data
                .chunks_exact(2)
                .flat_map(|p| [p[0], p[0], p[0], p[1]])
                .collect(),
            png::ColorType::Grayscale => data.iter().flat_map(|&g| [g, g, g, u8::MAX]).collect(),
            png::ColorType::Indexed => {
                return Err(FaviconError::Decode(
                    key.to_string(),
                    "indexed image was not expanded".to_string(),
                ));
            }
        };

        let scaled = scale_nearest(&rgba, info.width, info.height, self.size);
        debug!(
            "Decoded favicon {} ({}x{} -> {}x{})",
            key, info.width, info.height, self.size, self.size
        );
        DecodedIcon::from_rgba(key, self.size, self.size, scaled)
    }
}

/// Nearest-neighbour resize of RGBA pixels to a `size`x`size` square.
fn scale_nearest(rgba: &[u8], width: u32, height: u32, size: u32) -> Vec<u8> {
    if width == size && height == size {
        return rgba.to_vec();
    }

    let (width, height, size) = (width as usize, height as usize, size as usize);
    let mut out = Vec::with_capacity(size * size * 4);
    for y in 0..size {
        let source_y = y * height / size;
        for x in 0..size {
            let source_x = x * width / size;
            let offset = (source_y * width + source_x) * 4;
            out.extend_from_slice(&rgba[offset..offset + 4]);
        }
    }
    out
}

/// Concurrent icon cache. Entries are never mutated once inserted.
pub struct FaviconCache<T = DecodedIcon> {
    entries: DashMap<String, Arc<T>>,
}

impl<T> Default for FaviconCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FaviconCache<T> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Cached icon for `key`, fetching and decoding it on a miss.
    ///
    /// Returns `None` when the source or the decoder fails; nothing is cached in
    /// that case. Concurrent misses on one key may both decode; the first insert
    /// wins and every caller receives that entry.
    pub fn get<S, D>(&self, key: &str, source: &S, decoder: &D) -> Option<Arc<T>>
    where
        S: ByteSource + ?Sized,
        D: IconDecoder<T> + ?Sized,
    {
        if let Some(entry) = self.entries.get(key) {
            return Some(Arc::clone(entry.value()));
        }

        let bytes = match source.fetch(key) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Favicon {} unavailable: {}", key, e);
                return None;
            }
        };
        let decoded = match decoder.decode(key, &bytes) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!("Favicon {} could not be decoded: {}", key, e);
                return None;
            }
        };

        let entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(decoded));
        Some(Arc::clone(entry.value()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
        debug!("Favicon cache cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn png_file(width: u32, height: u32, color: png::ColorType, pixels: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, width, height);
            encoder.set_color(color);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header().unwrap();
            writer.write_image_data(pixels).unwrap();
        }
        out
    }

    fn counting_decoder(calls: &AtomicUsize) -> impl Fn(&str, &[u8]) -> FaviconResult<String> + '_ {
        move |_key: &str, bytes: &[u8]| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(String::from_utf8_lossy(bytes).into_owned())
        }
    }

    #[test]
    fn test_hit_returns_same_entry_without_decoding() {
        let cache: FaviconCache<String> = FaviconCache::new();
        let fetches = AtomicUsize::new(0);
        let decodes = AtomicUsize::new(0);
        let source = |key: &str| -> FaviconResult<Vec<u8>> {
            fetches.fetch_add(1, Ordering::SeqCst);
            Ok(key.as_bytes().to_vec())
        };
        let decoder = counting_decoder(&decodes);

        let first = cache.get("icon1", &source, &decoder).unwrap();
        let second = cache.get("icon1", &source, &decoder).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*first, "icon1");
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        assert_eq!(decodes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failures_are_not_cached() {
        let cache: FaviconCache<String> = FaviconCache::new();
        let decodes = AtomicUsize::new(0);
        let decoder = counting_decoder(&decodes);

        let failing = |key: &str| -> FaviconResult<Vec<u8>> { Err(FaviconError::NotFound(key.to_string())) };
        assert!(cache.get("icon1", &failing, &decoder).is_none());
        assert!(cache.is_empty());

        let working = |_key: &str| -> FaviconResult<Vec<u8>> { Ok(b"fixed".to_vec()) };
        assert_eq!(cache.get("icon1", &working, &decoder).as_deref().map(String::as_str), Some("fixed"));
        assert_eq!(cache.len(), 1);

        let bad_decoder = |key: &str, _bytes: &[u8]| -> FaviconResult<String> {
            Err(FaviconError::Decode(key.to_string(), "corrupt".into()))
        };
        assert!(cache.get("icon2", &working, &bad_decoder).is_none());
        assert!(!cache.contains("icon2"));
    }

    #[test]
    fn test_clear_forces_refetch() {
        let cache: FaviconCache<String> = FaviconCache::new();
        let fetches = AtomicUsize::new(0);
        let decodes = AtomicUsize::new(0);
        let source = |key: &str| -> FaviconResult<Vec<u8>> {
            fetches.fetch_add(1, Ordering::SeqCst);
            Ok(key.as_bytes().to_vec())
        };
        let decoder = counting_decoder(&decodes);

        cache.get("icon1", &source, &decoder);
        cache.clear();
        assert!(cache.is_empty());
        cache.get("icon1", &source, &decoder);
        cache.get("icon1", &source, &decoder);
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_concurrent_misses_share_one_entry() {
        let cache: FaviconCache<String> = FaviconCache::new();
        let decodes = AtomicUsize::new(0);
        let decoder = counting_decoder(&decodes);
        let source = |key: &str| -> FaviconResult<Vec<u8>> { Ok(key.as_bytes().to_vec()) };

        let results: Vec<Arc<String>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| cache.get("shared", &source, &decoder).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(cache.len(), 1);
        let cached = cache.get("shared", &source, &decoder).unwrap();
        assert!(results.iter().all(|r| **r == "shared"));
        assert!(decodes.load(Ordering::SeqCst) >= 1);
        assert_eq!(*cached, "shared");
    }

    #[test]
    fn test_png_decoder_scales_and_encodes() {
        // 2x2: red, green / blue, white
        let pixels = [255, 0, 0, 255, 0, 255, 0, 255, 0, 0, 255, 255, 255, 255, 255, 255];
        let bytes = png_file(2, 2, png::ColorType::Rgba, &pixels);

        let icon = PngDecoder::new(4).decode("grid", &bytes).unwrap();
        assert_eq!((icon.width(), icon.height()), (4, 4));
        assert_eq!(icon.rgba().len(), 4 * 4 * 4);
        // top-left quadrant is red, bottom-right is white
        assert_eq!(&icon.rgba()[0..4], &[255, 0, 0, 255]);
        assert_eq!(&icon.rgba()[icon.rgba().len() - 4..], &[255, 255, 255, 255]);
        assert!(icon.data_uri().starts_with("data:image/png;base64,"));

        let round_trip = PngDecoder::new(4).decode("again", icon.png_bytes()).unwrap();
        assert_eq!(round_trip.rgba(), icon.rgba());
    }

    #[test]
    fn test_png_decoder_expands_grayscale_and_rgb() {
        let gray = png_file(1, 1, png::ColorType::Grayscale, &[128]);
        let icon = PngDecoder::new(1).decode("gray", &gray).unwrap();
        assert_eq!(icon.rgba(), &[128, 128, 128, 255]);

        let rgb = png_file(1, 1, png::ColorType::Rgb, &[1, 2, 3]);
        let icon = PngDecoder::new(2).decode("rgb", &rgb).unwrap();
        assert_eq!(&icon.rgba()[0..4], &[1, 2, 3, 255]);
    }

    #[test]
    fn test_png_decoder_rejects_garbage() {
        let result = PngDecoder::default().decode("junk", b"not a png");
        assert!(matches!(result, Err(FaviconError::Decode(key, _)) if key == "junk"));
    }

    #[test]
    fn test_from_rgba_validates_dimensions() {
        assert!(matches!(
            DecodedIcon::from_rgba("x", 2, 2, vec![0; 3]),
            Err(FaviconError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_directory_source() {
        let dir = TempDir::new().unwrap();
        let pixels = [0, 0, 0, 255];
        std::fs::write(dir.path().join("server.png"), png_file(1, 1, png::ColorType::Rgba, &pixels)).unwrap();
        let source = DirectorySource::new(dir.path());

        assert_eq!(source.path_for("server").unwrap(), dir.path().join("server.png"));
        assert_eq!(source.path_for("server.png").unwrap(), dir.path().join("server.png"));
        assert!(source.fetch("server").is_ok());
        assert!(matches!(source.fetch("missing"), Err(FaviconError::NotFound(_))));

        for key in ["", "../secret", "a/../../b", "/etc/passwd", "..\\win", "./server"] {
            assert!(
                matches!(source.path_for(key), Err(FaviconError::InvalidKey(_))),
                "key {:?} should be rejected",
                key
            );
        }

        let cache: FaviconCache = FaviconCache::new();
        let icon = cache.get("server", &source, &PngDecoder::new(8)).unwrap();
        assert_eq!(icon.width(), 8);
    }
}
