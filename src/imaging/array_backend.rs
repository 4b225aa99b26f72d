//! Array backend: the handle is a raw `(height, width, channel)` `u8` array.
//!
//! Decoding and encoding still go through the `image` crate; everything in
//! between is plain `ndarray` math:
//!
//! - **Resize** crops with [`plan_crop`], blurs with an anti-aliasing
//!   Gaussian when shrinking (`sigma = (scale - 1) / 2` per axis), then
//!   samples bilinearly at pixel centres.
//! - **Filters** convert to `f32` in `[0, 1]`, run, then clamp and rescale
//!   to `0..=255` before a new handle is built.
//! - Borders repeat the edge sample (`nearest` mode).
//!
//! ## Filters
//!
//! | Kind | Parameters | Effect |
//! |---|---|---|
//! | `blur` | `sigma` = 2 | Gaussian blur |
//! | `sharpen` | `radius` = 1, `amount` = 1 | Unsharp mask |
//! | `smooth` | `size` = 3 | Mean over a `size`×`size` box |
//! | `custom` | `radius` = 8, `strength` = 0.5 | Local contrast boost, then an unsharp pass blended in at 0.1 |

use super::backend::{
    BackendError, BackendSettings, ImageBackend, ImageHandle, LoadError, SaveError,
};
use super::calculations::{antialias_sigma, plan_crop};
use super::destination::{resolve_destination, write_image};
use super::filters::{FilterRegistry, ParamSpec, ResolvedParams};
use super::params::{BackendKind, FilterKind, TargetSize};
use super::source::load_decoded;
use super::viewer::show_image;
use image::{
    ColorType, DynamicImage, GrayAlphaImage, GrayImage, ImageFormat, Luma, LumaA, Rgb, RgbImage,
    Rgba, RgbaImage,
};
use log::debug;
use ndarray::{Array3, ArrayView3, Axis, Zip, s};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Weight of the sharpened copy in the `custom` blend.
const CUSTOM_SHARPEN_WEIGHT: f32 = 0.1;

/// Gaussian kernels extend to this many standard deviations.
const GAUSSIAN_TRUNCATE: f64 = 4.0;

const BLUR_PARAMS: &[ParamSpec] = &[ParamSpec {
    name: "sigma",
    default: 2.0,
    min: 0.1,
    max: 20.0,
    description: "Gaussian standard deviation in pixels",
}];

const SHARPEN_PARAMS: &[ParamSpec] = &[
    ParamSpec {
        name: "radius",
        default: 1.0,
        min: 0.1,
        max: 20.0,
        description: "Blur sigma of the unsharp mask",
    },
    ParamSpec {
        name: "amount",
        default: 1.0,
        min: 0.0,
        max: 10.0,
        description: "How much of the detail layer is added back",
    },
];

const SMOOTH_PARAMS: &[ParamSpec] = &[ParamSpec {
    name: "size",
    default: 3.0,
    min: 1.0,
    max: 31.0,
    description: "Box size in pixels (even sizes use the next odd box)",
}];

const CUSTOM_PARAMS: &[ParamSpec] = &[
    ParamSpec {
        name: "radius",
        default: 8.0,
        min: 1.0,
        max: 32.0,
        description: "Sigma of the neighbourhood used for local contrast",
    },
    ParamSpec {
        name: "strength",
        default: 0.5,
        min: 0.0,
        max: 5.0,
        description: "Local contrast gain (0 leaves contrast as is)",
    },
];

static ARRAY_FILTERS: LazyLock<FilterRegistry<ArrayImage>> = LazyLock::new(|| {
    let mut registry = FilterRegistry::new(BackendKind::Array);
    registry.register(FilterKind::Blur, "Gaussian blur", BLUR_PARAMS, gaussian_blur);
    registry.register(
        FilterKind::Sharpen,
        "Unsharp mask",
        SHARPEN_PARAMS,
        unsharp,
    );
    registry.register(FilterKind::Smooth, "Mean filter", SMOOTH_PARAMS, mean_smooth);
    registry.register(
        FilterKind::Custom,
        "Local contrast enhancement plus a light sharpening blend (array backend only)",
        CUSTOM_PARAMS,
        local_contrast,
    );
    registry
});

/// Decoded pixels as `(height, width, channel)` plus the source format.
///
/// Channels are 1 (gray), 2 (gray + alpha), 3 (RGB) or 4 (RGBA). Deeper
/// source images are reduced to 8 bits per sample on load.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayImage {
    pixels: Array3<u8>,
    format: Option<ImageFormat>,
}

impl ArrayImage {
    pub fn from_dynamic(image: &DynamicImage, format: Option<ImageFormat>) -> Self {
        let (width, height) = (image.width() as usize, image.height() as usize);
        let (channels, raw) = match image.color() {
            ColorType::L8 | ColorType::L16 => (1, image.to_luma8().into_raw()),
            ColorType::La8 | ColorType::La16 => (2, image.to_luma_alpha8().into_raw()),
            ColorType::Rgb8 | ColorType::Rgb16 | ColorType::Rgb32F => {
                (3, image.to_rgb8().into_raw())
            }
            _ => (4, image.to_rgba8().into_raw()),
        };
        let pixels = Array3::from_shape_fn((height, width, channels), |(y, x, c)| {
            raw[(y * width + x) * channels + c]
        });
        Self { pixels, format }
    }

    pub fn pixels(&self) -> ArrayView3<'_, u8> {
        self.pixels.view()
    }

    pub fn to_dynamic(&self) -> DynamicImage {
        let (height, width, channels) = self.pixels.dim();
        let (w, h) = (width as u32, height as u32);
        let at = |x: u32, y: u32, c: usize| self.pixels[[y as usize, x as usize, c]];
        match channels {
            1 => DynamicImage::ImageLuma8(GrayImage::from_fn(w, h, |x, y| Luma([at(x, y, 0)]))),
            2 => DynamicImage::ImageLumaA8(GrayAlphaImage::from_fn(w, h, |x, y| {
                LumaA([at(x, y, 0), at(x, y, 1)])
            })),
            3 => DynamicImage::ImageRgb8(RgbImage::from_fn(w, h, |x, y| {
                Rgb([at(x, y, 0), at(x, y, 1), at(x, y, 2)])
            })),
            _ => DynamicImage::ImageRgba8(RgbaImage::from_fn(w, h, |x, y| {
                Rgba([at(x, y, 0), at(x, y, 1), at(x, y, 2), at(x, y, 3)])
            })),
        }
    }

    fn derive(&self, pixels: Array3<u8>) -> Self {
        Self {
            pixels,
            format: self.format,
        }
    }
}

impl ImageHandle for ArrayImage {
    fn width(&self) -> u32 {
        self.pixels.len_of(Axis(1)) as u32
    }

    fn height(&self) -> u32 {
        self.pixels.len_of(Axis(0)) as u32
    }

    fn channels(&self) -> u8 {
        self.pixels.len_of(Axis(2)) as u8
    }

    fn format(&self) -> Option<ImageFormat> {
        self.format
    }
}

/// Backend built on `ndarray`.
///
/// See the [module docs](self) for the resize pipeline and filter table.
#[derive(Debug, Clone, Default)]
pub struct ArrayBackend {
    settings: BackendSettings,
}

impl ArrayBackend {
    pub fn new(settings: BackendSettings) -> Self {
        Self { settings }
    }
}

impl ImageBackend for ArrayBackend {
    type Handle = ArrayImage;

    fn kind(&self) -> BackendKind {
        BackendKind::Array
    }

    fn load(&self, source: &str) -> Result<ArrayImage, LoadError> {
        let decoded = load_decoded(source, &self.settings.fetch)?;
        Ok(ArrayImage::from_dynamic(&decoded.image, decoded.format))
    }

    fn resize(&self, handle: &ArrayImage, size: TargetSize) -> ArrayImage {
        handle.derive(resize_pixels(
            handle.pixels(),
            size.width() as usize,
            size.height() as usize,
        ))
    }

    fn save(&self, handle: &ArrayImage, path: &Path) -> Result<PathBuf, SaveError> {
        let (path, format) = resolve_destination(
            path,
            &self.settings.output_dir,
            self.default_extension(handle),
        )?;
        write_image(&handle.to_dynamic(), &path, format)?;
        Ok(path)
    }

    fn show(&self, handle: &ArrayImage) -> Result<(), BackendError> {
        show_image(&handle.to_dynamic(), self.settings.viewer.as_deref())
    }

    fn filters(&self) -> &FilterRegistry<ArrayImage> {
        &ARRAY_FILTERS
    }

    fn default_extension(&self, _handle: &ArrayImage) -> &'static str {
        "png"
    }
}

// =============================================================================
// Resize
// =============================================================================

fn resize_pixels(pixels: ArrayView3<'_, u8>, out_w: usize, out_h: usize) -> Array3<u8> {
    let (height, width, _) = pixels.dim();
    let plan = plan_crop((width as u32, height as u32), (out_w as u32, out_h as u32));
    let (rows, cols) = (plan.rows as usize, plan.cols as usize);
    debug!("Crop {width}x{height}: {rows} rows, {cols} columns per side → {out_w}x{out_h}");

    let cropped = pixels.slice(s![rows..height - rows, cols..width - cols, ..]);
    let (crop_h, crop_w, _) = cropped.dim();
    if (crop_w, crop_h) == (out_w, out_h) {
        return cropped.to_owned();
    }

    let mut values = to_float(cropped);
    let sigma_y = antialias_sigma(crop_h as f64 / out_h as f64);
    if sigma_y > 0.0 {
        values = convolve_axis(&values, &gaussian_kernel(sigma_y), Axis(0));
    }
    let sigma_x = antialias_sigma(crop_w as f64 / out_w as f64);
    if sigma_x > 0.0 {
        values = convolve_axis(&values, &gaussian_kernel(sigma_x), Axis(1));
    }
    to_ubyte(&resample(&values, out_w, out_h))
}

/// Source index pair and blend weight for each output position.
fn sample_positions(input: usize, output: usize) -> Vec<(usize, usize, f32)> {
    let scale = input as f64 / output as f64;
    let last = (input - 1) as f64;
    (0..output)
        .map(|o| {
            let src = ((o as f64 + 0.5) * scale - 0.5).clamp(0.0, last);
            let i0 = src.floor() as usize;
            let i1 = (i0 + 1).min(input - 1);
            (i0, i1, (src - i0 as f64) as f32)
        })
        .collect()
}

fn resample(values: &Array3<f32>, out_w: usize, out_h: usize) -> Array3<f32> {
    let (height, width, channels) = values.dim();
    let ys = sample_positions(height, out_h);
    let xs = sample_positions(width, out_w);
    Array3::from_shape_fn((out_h, out_w, channels), |(y, x, c)| {
        let (y0, y1, ty) = ys[y];
        let (x0, x1, tx) = xs[x];
        let top = values[[y0, x0, c]] * (1.0 - tx) + values[[y0, x1, c]] * tx;
        let bottom = values[[y1, x0, c]] * (1.0 - tx) + values[[y1, x1, c]] * tx;
        top * (1.0 - ty) + bottom * ty
    })
}

// =============================================================================
// Float pipeline
// =============================================================================

fn to_float(pixels: ArrayView3<'_, u8>) -> Array3<f32> {
    pixels.mapv(|v| f32::from(v) / 255.0)
}

/// Clamp to `[0, 1]` and rescale to the 0–255 channel range.
fn to_ubyte(values: &Array3<f32>) -> Array3<u8> {
    values.mapv(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
}

fn gaussian_kernel(sigma: f64) -> Vec<f32> {
    if sigma <= 0.0 {
        return vec![1.0];
    }
    let radius = (GAUSSIAN_TRUNCATE * sigma).ceil() as i64;
    let weights: Vec<f64> = (-radius..=radius)
        .map(|i| (-((i * i) as f64) / (2.0 * sigma * sigma)).exp())
        .collect();
    let total: f64 = weights.iter().sum();
    weights.iter().map(|w| (w / total) as f32).collect()
}

fn box_kernel(size: usize) -> Vec<f32> {
    let window = (size / 2) * 2 + 1;
    vec![1.0 / window as f32; window]
}

/// 1-D convolution along `axis`, repeating edge samples.
fn convolve_axis(input: &Array3<f32>, kernel: &[f32], axis: Axis) -> Array3<f32> {
    let len = input.len_of(axis);
    let last = len as isize - 1;
    let r = (kernel.len() / 2) as isize;
    let mut out = Array3::<f32>::zeros(input.raw_dim());
    Zip::from(out.lanes_mut(axis))
        .and(input.lanes(axis))
        .for_each(|mut dst, src| {
            for i in 0..len {
                let mut acc = 0.0;
                for (k, w) in kernel.iter().enumerate() {
                    let j = (i as isize + k as isize - r).clamp(0, last) as usize;
                    acc += w * src[j];
                }
                dst[i] = acc;
            }
        });
    out
}

/// Separable 2-D filter over rows and columns; channels are independent.
fn separable(values: &Array3<f32>, kernel: &[f32]) -> Array3<f32> {
    convolve_axis(&convolve_axis(values, kernel, Axis(0)), kernel, Axis(1))
}

/// `x + amount * (x - blur(x))`, clamped.
fn unsharp_values(values: &Array3<f32>, sigma: f64, amount: f32) -> Array3<f32> {
    let blurred = separable(values, &gaussian_kernel(sigma));
    let mut out = values.clone();
    Zip::from(&mut out)
        .and(&blurred)
        .for_each(|v, &b| *v = (*v + amount * (*v - b)).clamp(0.0, 1.0));
    out
}

fn gaussian_blur(handle: &ArrayImage, params: &ResolvedParams) -> ArrayImage {
    let values = to_float(handle.pixels());
    let kernel = gaussian_kernel(params.get("sigma"));
    handle.derive(to_ubyte(&separable(&values, &kernel)))
}

fn unsharp(handle: &ArrayImage, params: &ResolvedParams) -> ArrayImage {
    let values = to_float(handle.pixels());
    let out = unsharp_values(&values, params.get("radius"), params.get("amount") as f32);
    handle.derive(to_ubyte(&out))
}

fn mean_smooth(handle: &ArrayImage, params: &ResolvedParams) -> ArrayImage {
    let values = to_float(handle.pixels());
    let kernel = box_kernel(params.get("size").round() as usize);
    handle.derive(to_ubyte(&separable(&values, &kernel)))
}

fn local_contrast(handle: &ArrayImage, params: &ResolvedParams) -> ArrayImage {
    let values = to_float(handle.pixels());
    let gain = 1.0 + params.get("strength") as f32;
    let local_mean = separable(&values, &gaussian_kernel(params.get("radius")));

    let mut enhanced = values;
    Zip::from(&mut enhanced)
        .and(&local_mean)
        .for_each(|v, &m| *v = (m + gain * (*v - m)).clamp(0.0, 1.0));

    let sharpened = unsharp_values(&enhanced, 1.0, 1.0);
    Zip::from(&mut enhanced)
        .and(&sharpened)
        .for_each(|v, &s| *v = (1.0 - CUSTOM_SHARPEN_WEIGHT) * *v + CUSTOM_SHARPEN_WEIGHT * s);
    handle.derive(to_ubyte(&enhanced))
}
