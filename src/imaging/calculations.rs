//! Pure calculation functions for crop-then-resize.
//!
//! All functions here are pure and testable without any I/O or images.

/// Aspect-ratio difference above which an image counts as "too tall" for
/// the target and loses rows instead of columns.
pub const RATIO_TOLERANCE: f64 = 0.05;

/// How many pixels to remove from *each* side before resizing.
///
/// At most one of the two fields is non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CropPlan {
    /// Rows removed from the top and from the bottom.
    pub rows: u32,
    /// Columns removed from the left and from the right.
    pub cols: u32,
}

impl CropPlan {
    pub fn is_noop(&self) -> bool {
        self.rows == 0 && self.cols == 0
    }

    /// Dimensions `(width, height)` of the region left after cropping.
    pub fn remaining(&self, source: (u32, u32)) -> (u32, u32) {
        let (w, h) = source;
        (w - 2 * self.cols, h - 2 * self.rows)
    }
}

/// Decide which axis to crop so that `source` matches the aspect ratio of
/// `target` before a final exact resize.
///
/// Ratios are `height / width`. When `image_ratio - target_ratio` is at or
/// above [`RATIO_TOLERANCE`] rows are cropped symmetrically; otherwise
/// columns are. Ties at the tolerance go to the row crop.
///
/// A crop that would come out negative (image only slightly taller than the
/// target, inside the tolerance band) is treated as zero. A crop never
/// consumes the whole axis: at least one pixel row/column survives.
///
/// # Arguments
/// * `source` - Image dimensions (width, height), both non-zero
/// * `target` - Requested output dimensions (width, height), both non-zero
///
/// # Examples
/// ```
/// # use image_effect::imaging::{CropPlan, plan_crop};
/// // 1920x1080 into a 300x600 portrait: 690 columns off each side
/// assert_eq!(plan_crop((1920, 1080), (300, 600)), CropPlan { rows: 0, cols: 690 });
/// ```
pub fn plan_crop(source: (u32, u32), target: (u32, u32)) -> CropPlan {
    let (img_w, img_h) = source;
    let (tgt_w, tgt_h) = target;
    if img_w == 0 || img_h == 0 || tgt_w == 0 || tgt_h == 0 {
        return CropPlan::default();
    }

    let image_ratio = img_h as f64 / img_w as f64;
    let target_ratio = tgt_h as f64 / tgt_w as f64;
    let ratio_delta = image_ratio - target_ratio;

    if ratio_delta >= RATIO_TOLERANCE {
        // Too tall: trim top and bottom
        let excess = (img_h as f64 - img_w as f64 * target_ratio) / 2.0;
        CropPlan {
            rows: clamp_crop(excess, img_h),
            cols: 0,
        }
    } else {
        // Too wide (or close enough): trim left and right
        let excess = (img_w as f64 - img_h as f64 / target_ratio) / 2.0;
        CropPlan {
            rows: 0,
            cols: clamp_crop(excess, img_w),
        }
    }
}

/// Floor a per-side crop and keep it inside `[0, (extent - 1) / 2]`.
fn clamp_crop(excess: f64, extent: u32) -> u32 {
    if !excess.is_finite() || excess <= 0.0 {
        return 0;
    }
    let max_per_side = (extent - 1) / 2;
    (excess.floor() as u32).min(max_per_side)
}

/// Anti-aliasing sigma for a downscale by `scale` (input / output).
///
/// Zero when upscaling or keeping size.
pub fn antialias_sigma(scale: f64) -> f64 {
    ((scale - 1.0) / 2.0).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // plan_crop tests
    // =========================================================================

    #[test]
    fn wide_source_to_portrait_target_crops_columns() {
        // ratio 0.5625 vs 2.0 → width branch, floor((1920 - 540) / 2) = 690
        let plan = plan_crop((1920, 1080), (300, 600));
        assert_eq!(plan, CropPlan { rows: 0, cols: 690 });
        assert_eq!(plan.remaining((1920, 1080)), (540, 1080));
    }

    #[test]
    fn tall_source_to_landscape_target_crops_rows() {
        // 600x1200 (ratio 2.0) → 400x200 (ratio 0.5): keep 600x300
        let plan = plan_crop((600, 1200), (400, 200));
        assert_eq!(plan, CropPlan { rows: 450, cols: 0 });
        assert_eq!(plan.remaining((600, 1200)), (600, 300));
    }

    #[test]
    fn same_ratio_crops_nothing() {
        assert!(plan_crop((800, 600), (400, 300)).is_noop());
        assert!(plan_crop((640, 480), (640, 480)).is_noop());
    }

    #[test]
    fn slightly_taller_inside_tolerance_crops_nothing() {
        // ratio 0.52 vs 0.5: width branch, but the computed crop is negative
        let plan = plan_crop((1000, 520), (400, 200));
        assert!(plan.is_noop());
    }

    #[test]
    fn tie_at_tolerance_prefers_row_crop() {
        // image ratio 0.55, target ratio 0.5 → delta exactly 0.05
        let plan = plan_crop((1000, 550), (200, 100));
        assert_eq!(plan.cols, 0);
        assert_eq!(plan.rows, 25);
    }

    #[test]
    fn crops_are_mutually_exclusive() {
        let sources = [(1920, 1080), (1080, 1920), (500, 500), (123, 4567), (4000, 130)];
        let targets = [(120, 120), (1080, 120), (120, 1080), (640, 480), (333, 777)];
        for &source in &sources {
            for &target in &targets {
                let plan = plan_crop(source, target);
                assert!(
                    plan.rows == 0 || plan.cols == 0,
                    "{source:?} → {target:?} cropped both axes: {plan:?}"
                );
                let (w, h) = plan.remaining(source);
                assert!(w >= 1 && h >= 1);
            }
        }
    }

    #[test]
    fn degenerate_inputs_do_not_crop() {
        assert!(plan_crop((0, 100), (200, 200)).is_noop());
        assert!(plan_crop((100, 100), (0, 200)).is_noop());
    }

    #[test]
    fn crop_never_consumes_whole_axis() {
        // 1x1000 strip into a very wide target
        let plan = plan_crop((3, 1000), (1080, 120));
        let (w, h) = plan.remaining((3, 1000));
        assert!(w >= 1 && h >= 1);
    }

    // =========================================================================
    // antialias_sigma tests
    // =========================================================================

    #[test]
    fn antialias_sigma_only_when_shrinking() {
        assert_eq!(antialias_sigma(0.5), 0.0);
        assert_eq!(antialias_sigma(1.0), 0.0);
        assert_eq!(antialias_sigma(3.0), 1.0);
    }
}
