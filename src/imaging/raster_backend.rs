//! Raster backend: the handle is a boxed `image::DynamicImage`.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode | `image::ImageReader` with content sniffing |
//! | Resize | `DynamicImage::resize_to_fill` with `Lanczos3` (centered fit) |
//! | Encode | `DynamicImage::save_with_format`, format from extension |
//! | Sharpen / smooth | `DynamicImage::filter3x3` |
//! | Blur | `imageproc::filter::separable_filter_equal` with a uniform kernel |
//! | Custom | mode filter over 8-bit samples |
//!
//! ## Filters
//!
//! | Kind | Parameters | Effect |
//! |---|---|---|
//! | `blur` | `radius` = 5 | Box blur; radius 1 averages a 3×3 box |
//! | `sharpen` | – | 3×3 kernel `[-2 … 32 … -2] / 16` |
//! | `smooth` | – | 3×3 kernel `[1 … 5 … 1] / 13` |
//! | `custom` | `size` = 3 | Mode filter: most frequent value in a `size`×`size` box |

use super::backend::{
    BackendError, BackendSettings, ImageBackend, ImageHandle, LoadError, SaveError,
};
use super::destination::{resolve_destination, write_image};
use super::filters::{FilterRegistry, ParamSpec, ResolvedParams};
use super::params::{BackendKind, FilterKind, TargetSize};
use super::source::load_decoded;
use super::viewer::show_image;
use image::imageops::FilterType;
use image::{DynamicImage, ImageBuffer, ImageFormat, Pixel};
use imageproc::filter::separable_filter_equal;
use log::debug;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

const SHARPEN_KERNEL: [f32; 9] = [-2.0, -2.0, -2.0, -2.0, 32.0, -2.0, -2.0, -2.0, -2.0];
const SMOOTH_KERNEL: [f32; 9] = [1.0, 1.0, 1.0, 1.0, 5.0, 1.0, 1.0, 1.0, 1.0];

/// Relative lift on box weights; larger than the f32 rounding error of a
/// 129-tap sum, far smaller than one 8-bit level.
const BOX_WEIGHT_BIAS: f32 = 1e-4;

const BLUR_PARAMS: &[ParamSpec] = &[ParamSpec {
    name: "radius",
    default: 5.0,
    min: 0.0,
    max: 64.0,
    description: "Box radius in pixels (rounded); radius 1 covers 3x3 pixels",
}];

const MODE_PARAMS: &[ParamSpec] = &[ParamSpec {
    name: "size",
    default: 3.0,
    min: 1.0,
    max: 15.0,
    description: "Box size in pixels (even sizes use the next odd box)",
}];

static RASTER_FILTERS: LazyLock<FilterRegistry<RasterImage>> = LazyLock::new(|| {
    let mut registry = FilterRegistry::new(BackendKind::Raster);
    registry.register(
        FilterKind::Blur,
        "Box blur by the given radius (default 5)",
        BLUR_PARAMS,
        box_blur,
    );
    registry.register(FilterKind::Sharpen, "Sharpen with a 3x3 kernel", &[], sharpen);
    registry.register(FilterKind::Smooth, "Smooth with a 3x3 kernel", &[], smooth);
    registry.register(
        FilterKind::Custom,
        "Mode filter: most frequent value in a box (raster backend only)",
        MODE_PARAMS,
        mode_filter,
    );
    registry
});

/// Decoded image plus the format it was decoded from.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    image: DynamicImage,
    format: Option<ImageFormat>,
}

impl RasterImage {
    pub fn new(image: DynamicImage, format: Option<ImageFormat>) -> Self {
        Self { image, format }
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// Same format, new pixels.
    fn derive(&self, image: DynamicImage) -> Self {
        Self {
            image,
            format: self.format,
        }
    }
}

impl ImageHandle for RasterImage {
    fn width(&self) -> u32 {
        self.image.width()
    }

    fn height(&self) -> u32 {
        self.image.height()
    }

    fn channels(&self) -> u8 {
        self.image.color().channel_count()
    }

    fn format(&self) -> Option<ImageFormat> {
        self.format
    }
}

/// Backend built on `image::DynamicImage`.
///
/// See the [module docs](self) for the operation and filter tables.
#[derive(Debug, Clone, Default)]
pub struct RasterBackend {
    settings: BackendSettings,
}

impl RasterBackend {
    pub fn new(settings: BackendSettings) -> Self {
        Self { settings }
    }
}

impl ImageBackend for RasterBackend {
    type Handle = RasterImage;

    fn kind(&self) -> BackendKind {
        BackendKind::Raster
    }

    fn load(&self, source: &str) -> Result<RasterImage, LoadError> {
        let decoded = load_decoded(source, &self.settings.fetch)?;
        Ok(RasterImage::new(decoded.image, decoded.format))
    }

    fn resize(&self, handle: &RasterImage, size: TargetSize) -> RasterImage {
        debug!(
            "Fit {}x{} → {size} (Lanczos3)",
            handle.width(),
            handle.height()
        );
        // Fill-resize then center-crop to exact dimensions
        handle.derive(
            handle
                .image
                .resize_to_fill(size.width(), size.height(), FilterType::Lanczos3),
        )
    }

    fn save(&self, handle: &RasterImage, path: &Path) -> Result<PathBuf, SaveError> {
        let (path, format) = resolve_destination(
            path,
            &self.settings.output_dir,
            self.default_extension(handle),
        )?;
        write_image(&handle.image, &path, format)?;
        Ok(path)
    }

    fn show(&self, handle: &RasterImage) -> Result<(), BackendError> {
        show_image(&handle.image, self.settings.viewer.as_deref())
    }

    fn filters(&self) -> &FilterRegistry<RasterImage> {
        &RASTER_FILTERS
    }

    fn default_extension(&self, handle: &RasterImage) -> &'static str {
        handle
            .format
            .filter(|format| format.writing_enabled())
            .and_then(|format| format.extensions_str().first().copied())
            .unwrap_or("png")
    }
}

// =============================================================================
// Filters
// =============================================================================

fn box_blur(handle: &RasterImage, params: &ResolvedParams) -> RasterImage {
    let radius = params.get("radius").round() as usize;
    if radius == 0 {
        return handle.derive(handle.image.clone());
    }
    let kernel = box_kernel(radius);
    let blurred = match &handle.image {
        DynamicImage::ImageLuma8(buf) => {
            DynamicImage::ImageLuma8(separable_filter_equal(buf, &kernel))
        }
        DynamicImage::ImageLumaA8(buf) => {
            DynamicImage::ImageLumaA8(separable_filter_equal(buf, &kernel))
        }
        DynamicImage::ImageRgb8(buf) => DynamicImage::ImageRgb8(separable_filter_equal(buf, &kernel)),
        DynamicImage::ImageRgba8(buf) => {
            DynamicImage::ImageRgba8(separable_filter_equal(buf, &kernel))
        }
        other => DynamicImage::ImageRgba8(separable_filter_equal(&other.to_rgba8(), &kernel)),
    };
    handle.derive(blurred)
}

/// Uniform `2r+1` tap kernel. The weight sits just above `1/n` because the
/// f32 → u8 conversion truncates: a flat region must come back unchanged.
fn box_kernel(radius: usize) -> Vec<f32> {
    let taps = 2 * radius + 1;
    vec![(1.0 + BOX_WEIGHT_BIAS) / taps as f32; taps]
}

fn sharpen(handle: &RasterImage, _params: &ResolvedParams) -> RasterImage {
    handle.derive(handle.image.filter3x3(&SHARPEN_KERNEL))
}

fn smooth(handle: &RasterImage, _params: &ResolvedParams) -> RasterImage {
    handle.derive(handle.image.filter3x3(&SMOOTH_KERNEL))
}

fn mode_filter(handle: &RasterImage, params: &ResolvedParams) -> RasterImage {
    let radius = params.get("size").round() as usize / 2;
    let filtered = match &handle.image {
        DynamicImage::ImageLuma8(buf) => DynamicImage::ImageLuma8(mode_buffer(buf, radius)),
        DynamicImage::ImageLumaA8(buf) => DynamicImage::ImageLumaA8(mode_buffer(buf, radius)),
        DynamicImage::ImageRgb8(buf) => DynamicImage::ImageRgb8(mode_buffer(buf, radius)),
        DynamicImage::ImageRgba8(buf) => DynamicImage::ImageRgba8(mode_buffer(buf, radius)),
        other => DynamicImage::ImageRgba8(mode_buffer(&other.to_rgba8(), radius)),
    };
    handle.derive(filtered)
}

fn mode_buffer<P>(buf: &ImageBuffer<P, Vec<u8>>, radius: usize) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let (width, height) = buf.dimensions();
    let mut out = buf.clone();
    mode_pass(
        buf.as_raw(),
        &mut out,
        width as usize,
        height as usize,
        P::CHANNEL_COUNT as usize,
        radius,
    );
    out
}

/// Per-channel mode over a `(2r+1)²` box clipped to the image. A value must
/// occur more than twice to win (ties go to the lower value); otherwise the
/// original sample is kept. `out` starts as a copy of `data`.
fn mode_pass(
    data: &[u8],
    out: &mut [u8],
    width: usize,
    height: usize,
    channels: usize,
    radius: usize,
) {
    if radius == 0 {
        return;
    }
    let mut counts = [0u16; 256];
    let mut seen: Vec<u8> = Vec::with_capacity((2 * radius + 1).pow(2));

    for y in 0..height {
        let rows = y.saturating_sub(radius)..(y + radius + 1).min(height);
        for x in 0..width {
            let cols = x.saturating_sub(radius)..(x + radius + 1).min(width);
            for ch in 0..channels {
                seen.clear();
                for yy in rows.clone() {
                    for xx in cols.clone() {
                        let v = data[(yy * width + xx) * channels + ch];
                        counts[v as usize] += 1;
                        seen.push(v);
                    }
                }
                let mut best = (0u16, 0u8);
                for &v in &seen {
                    let count = counts[v as usize];
                    if count > best.0 || (count == best.0 && v < best.1) {
                        best = (count, v);
                    }
                }
                for &v in &seen {
                    counts[v as usize] = 0;
                }
                let i = (y * width + x) * channels + ch;
                out[i] = if best.0 > 2 { best.1 } else { data[i] };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::FilterParams;
    use crate::test_helpers::{gradient_image, write_png};
    use image::{GrayImage, Luma, Rgb, RgbImage};
    use tempfile::TempDir;

    fn backend(output_dir: &Path) -> RasterBackend {
        RasterBackend::new(BackendSettings {
            output_dir: output_dir.to_path_buf(),
            ..BackendSettings::default()
        })
    }

    fn handle(image: DynamicImage) -> RasterImage {
        RasterImage::new(image, Some(ImageFormat::Png))
    }

    #[test]
    fn load_reports_dimensions_and_format() {
        let tmp = TempDir::new().unwrap();
        let path = write_png(tmp.path(), "src.png", 64, 48);
        let image = backend(tmp.path()).load(path.to_str().unwrap()).unwrap();
        assert_eq!((image.width(), image.height()), (64, 48));
        assert_eq!(image.format(), Some(ImageFormat::Png));
        assert_eq!(image.channels(), 3);
    }

    #[test]
    fn resize_hits_exact_dimensions() {
        let b = RasterBackend::default();
        let source = handle(gradient_image(400, 225));
        for (w, h) in [(120, 120), (300, 600), (1080, 120), (200, 113)] {
            let size = crate::imaging::ResizeBounds { min: 1, max: 2000 }
                .check(w, h)
                .unwrap();
            let out = b.resize(&source, size);
            assert_eq!((out.width(), out.height()), (w, h));
        }
    }

    #[test]
    fn resize_to_current_size_keeps_pixels() {
        let b = RasterBackend::default();
        let source = handle(gradient_image(300, 200));
        let size = crate::imaging::ResizeBounds::default().check(300, 200).unwrap();
        let out = b.resize(&source, size);
        assert_eq!((out.width(), out.height()), (300, 200));
        assert_eq!(out.image(), source.image());
    }

    #[test]
    fn resize_landscape_to_portrait_is_exact() {
        let b = RasterBackend::default();
        let source = handle(gradient_image(1920, 1080));
        let size = crate::imaging::ResizeBounds { min: 1, max: 2000 }
            .check(300, 600)
            .unwrap();
        let out = b.resize(&source, size);
        assert_eq!((out.width(), out.height()), (300, 600));
    }

    #[test]
    fn resize_keeps_format_and_original() {
        let b = RasterBackend::default();
        let source = handle(gradient_image(200, 200));
        let size = crate::imaging::ResizeBounds::default().check(120, 150).unwrap();
        let out = b.resize(&source, size);
        assert_eq!(out.format(), Some(ImageFormat::Png));
        assert_eq!((source.width(), source.height()), (200, 200));
    }

    #[test]
    fn blur_defaults_to_radius_five() {
        let b = RasterBackend::default();
        let applied = b
            .apply_filter(&handle(gradient_image(32, 32)), FilterKind::Blur, &FilterParams::new())
            .unwrap();
        assert_eq!(applied.params.get("radius"), 5.0);
        assert_eq!(applied.params.defaulted(), &["radius"]);
    }

    #[test]
    fn blur_preserves_flat_image() {
        let flat = DynamicImage::ImageRgb8(RgbImage::from_pixel(20, 10, Rgb([10, 200, 90])));
        let b = RasterBackend::default();
        let out = b
            .apply_filter(&handle(flat.clone()), FilterKind::Blur, &FilterParams::new())
            .unwrap();
        assert_eq!(out.image.image(), &flat);
    }

    #[test]
    fn blur_radius_zero_is_identity() {
        let source = handle(gradient_image(16, 12));
        let out = box_blur(&source, &resolved(FilterKind::Blur, &[("radius", 0.0)]));
        assert_eq!(out.image(), source.image());
    }

    #[test]
    fn blur_radius_one_averages_neighbours() {
        // Single bright pixel in the middle of a 3x3 dark image
        let mut img = GrayImage::new(3, 3);
        img.put_pixel(1, 1, Luma([90]));
        let out = box_blur(
            &handle(DynamicImage::ImageLuma8(img)),
            &resolved(FilterKind::Blur, &[("radius", 1.0)]),
        );
        assert_eq!(out.image().to_luma8().get_pixel(1, 1), &Luma([10]));
    }

    #[test]
    fn filters_are_deterministic() {
        let b = RasterBackend::default();
        let source = handle(gradient_image(40, 30));
        for kind in FilterKind::ALL {
            let first = b.apply_filter(&source, kind, &FilterParams::new()).unwrap();
            let second = b.apply_filter(&source, kind, &FilterParams::new()).unwrap();
            assert_eq!(first.image, second.image, "{kind} not deterministic");
            assert_eq!(
                (first.image.width(), first.image.height()),
                (source.width(), source.height())
            );
        }
    }

    #[test]
    fn sharpen_and_smooth_reject_parameters() {
        let b = RasterBackend::default();
        let mut params = FilterParams::new();
        params.insert("radius".into(), 2.0);
        let source = handle(gradient_image(8, 8));
        assert!(b.apply_filter(&source, FilterKind::Sharpen, &params).is_err());
        assert!(b.apply_filter(&source, FilterKind::Smooth, &params).is_err());
    }

    #[test]
    fn mode_filter_picks_majority_and_keeps_outliers() {
        // 3x3 of 50 with one 200 in the centre → centre becomes 50
        let mut img = GrayImage::from_pixel(3, 3, Luma([50]));
        img.put_pixel(1, 1, Luma([200]));
        let out = mode_filter(
            &handle(DynamicImage::ImageLuma8(img)),
            &resolved(FilterKind::Custom, &[]),
        );
        assert_eq!(out.image().to_luma8().get_pixel(1, 1), &Luma([50]));

        // All distinct values → nothing occurs more than twice → unchanged
        let distinct = GrayImage::from_fn(3, 3, |x, y| Luma([(y * 3 + x) as u8 * 10]));
        let out = mode_filter(
            &handle(DynamicImage::ImageLuma8(distinct.clone())),
            &resolved(FilterKind::Custom, &[]),
        );
        assert_eq!(out.image().to_luma8(), distinct);
    }

    #[test]
    fn save_without_extension_uses_decoded_format() {
        let tmp = TempDir::new().unwrap();
        let b = backend(&tmp.path().join("saved"));
        let path = b.save(&handle(gradient_image(10, 10)), Path::new("photo")).unwrap();
        assert_eq!(path, tmp.path().join("saved/photo.png"));
        assert!(path.is_file());
    }

    #[test]
    fn save_jpeg_source_defaults_to_jpg() {
        let b = RasterBackend::default();
        let jpeg = RasterImage::new(gradient_image(4, 4), Some(ImageFormat::Jpeg));
        assert_eq!(b.default_extension(&jpeg), "jpg");
        let unknown = RasterImage::new(gradient_image(4, 4), None);
        assert_eq!(b.default_extension(&unknown), "png");
    }

    #[test]
    fn save_keeps_recognized_extension() {
        let tmp = TempDir::new().unwrap();
        let b = backend(tmp.path());
        let requested = tmp.path().join("out.bmp");
        let path = b.save(&handle(gradient_image(10, 10)), &requested).unwrap();
        assert_eq!(path, requested);
        assert_eq!(image::image_dimensions(&path).unwrap(), (10, 10));
    }

    fn resolved(kind: FilterKind, pairs: &[(&str, f64)]) -> ResolvedParams {
        let params: FilterParams = pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        RASTER_FILTERS.resolve(kind, &params).unwrap()
    }
}
