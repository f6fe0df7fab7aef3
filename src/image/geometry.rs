//! Output geometry for the three resize modes.
//!
//! Everything here is integer arithmetic on `u64` so results are exact and
//! independent of float rounding. Uniform scaling rounds half up; an axis
//! derived from a single requested dimension truncates toward zero.

use crate::models::ResizeMode;
use crate::{Error, Result};

/// Largest requested or planned side (the JPEG frame limit).
pub const MAX_DIMENSION: u32 = 65_535;
/// Largest raster a plan may resample to, 1 GiB as RGBA8.
pub const MAX_PIXELS: u64 = 1 << 28;

/// Rectangle cut out of the scaled image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// What to do to an image: resample to `scaled_*`, then optionally crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizePlan {
    pub scaled_width: u32,
    pub scaled_height: u32,
    pub crop: Option<CropRect>,
}

impl ResizePlan {
    fn scale_only(width: u32, height: u32) -> Self {
        Self {
            scaled_width: width,
            scaled_height: height,
            crop: None,
        }
    }

    /// Final dimensions after any crop.
    pub fn output_dimensions(&self) -> (u32, u32) {
        match self.crop {
            Some(crop) => (crop.width, crop.height),
            None => (self.scaled_width, self.scaled_height),
        }
    }

    /// True when the plan leaves an `width`x`height` image untouched.
    pub fn is_identity(&self, width: u32, height: u32) -> bool {
        self.crop.is_none() && self.scaled_width == width && self.scaled_height == height
    }
}

/// `value * num / den`, truncated.
fn mul_div_floor(value: u32, num: u32, den: u32) -> u32 {
    let v = u64::from(value) * u64::from(num) / u64::from(den);
    v.min(u64::from(u32::MAX)) as u32
}

/// `value * num / den`, rounded half up.
fn mul_div_round(value: u32, num: u32, den: u32) -> u32 {
    let den = u64::from(den);
    let v = (2 * u64::from(value) * u64::from(num) + den) / (2 * den);
    v.min(u64::from(u32::MAX)) as u32
}

fn require_positive(name: &str, value: u32) -> Result<()> {
    if value == 0 {
        return Err(Error::InvalidArgument(format!(
            "{} must be a positive integer",
            name
        )));
    }
    Ok(())
}

/// Compute the resize plan for an `orig_w`x`orig_h` image.
///
/// With no requested dimension the plan is the identity. With exactly one,
/// the other axis follows the original aspect ratio regardless of `mode`.
/// With both, `mode` decides:
///
/// * [`ResizeMode::Exact`] scales each axis independently to the request.
/// * [`ResizeMode::Fit`] scales uniformly by the smaller ratio; the limiting
///   axis lands on the request and the other axis stays within it.
/// * [`ResizeMode::Fill`] scales uniformly by the larger ratio and crops the
///   centered request-sized rectangle (offsets floor-divided by two).
pub fn resolve(
    orig_w: u32,
    orig_h: u32,
    req_w: Option<u32>,
    req_h: Option<u32>,
    mode: ResizeMode,
) -> Result<ResizePlan> {
    require_positive("original width", orig_w)?;
    require_positive("original height", orig_h)?;
    if let Some(w) = req_w {
        require_positive("width", w)?;
    }
    if let Some(h) = req_h {
        require_positive("height", h)?;
    }

    let plan = match (req_w, req_h) {
        (None, None) => ResizePlan::scale_only(orig_w, orig_h),
        (Some(w), None) => ResizePlan::scale_only(w, mul_div_floor(orig_h, w, orig_w).max(1)),
        (None, Some(h)) => ResizePlan::scale_only(mul_div_floor(orig_w, h, orig_h).max(1), h),
        (Some(w), Some(h)) => match mode {
            ResizeMode::Exact => ResizePlan::scale_only(w, h),
            ResizeMode::Fit => fit(orig_w, orig_h, w, h),
            ResizeMode::Fill => fill(orig_w, orig_h, w, h),
        },
    };
    check_limits(&plan)?;
    Ok(plan)
}

/// Reject plans that would allocate an unreasonable intermediate raster.
fn check_limits(plan: &ResizePlan) -> Result<()> {
    let (w, h) = (plan.scaled_width, plan.scaled_height);
    if w > MAX_DIMENSION || h > MAX_DIMENSION {
        return Err(Error::InvalidArgument(format!(
            "resize to {}x{} exceeds the maximum side of {}",
            w, h, MAX_DIMENSION
        )));
    }
    let pixels = u64::from(w) * u64::from(h);
    if pixels > MAX_PIXELS {
        return Err(Error::InvalidArgument(format!(
            "resize to {}x{} ({} pixels) exceeds the limit of {} pixels",
            w, h, pixels, MAX_PIXELS
        )));
    }
    Ok(())
}

/// Compares `w/orig_w` with `h/orig_h` without division.
fn width_ratio_is_smaller(orig_w: u32, orig_h: u32, w: u32, h: u32) -> bool {
    u64::from(w) * u64::from(orig_h) <= u64::from(h) * u64::from(orig_w)
}

fn fit(orig_w: u32, orig_h: u32, w: u32, h: u32) -> ResizePlan {
    if width_ratio_is_smaller(orig_w, orig_h, w, h) {
        let scaled_h = mul_div_round(orig_h, w, orig_w).clamp(1, h);
        ResizePlan::scale_only(w, scaled_h)
    } else {
        let scaled_w = mul_div_round(orig_w, h, orig_h).clamp(1, w);
        ResizePlan::scale_only(scaled_w, h)
    }
}

fn fill(orig_w: u32, orig_h: u32, w: u32, h: u32) -> ResizePlan {
    let (scaled_w, scaled_h) = if width_ratio_is_smaller(orig_w, orig_h, w, h) {
        // height is the limiting axis for cover
        (mul_div_round(orig_w, h, orig_h).max(w), h)
    } else {
        (w, mul_div_round(orig_h, w, orig_w).max(h))
    };

    ResizePlan {
        scaled_width: scaled_w,
        scaled_height: scaled_h,
        crop: Some(CropRect {
            x: (scaled_w - w) / 2,
            y: (scaled_h - h) / 2,
            width: w,
            height: h,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODES: [ResizeMode; 3] = [ResizeMode::Fit, ResizeMode::Fill, ResizeMode::Exact];

    #[test]
    fn test_identity_for_every_mode() {
        for mode in MODES {
            let plan = resolve(1000, 500, None, None, mode).unwrap();
            assert_eq!(plan.output_dimensions(), (1000, 500));
            assert!(plan.crop.is_none());
            assert!(plan.is_identity(1000, 500));
        }
    }

    #[test]
    fn test_width_only_preserves_aspect_in_every_mode() {
        for mode in MODES {
            let plan = resolve(1000, 500, Some(200), None, mode).unwrap();
            assert_eq!(plan.output_dimensions(), (200, 100));
            assert!(plan.crop.is_none());
        }
    }

    #[test]
    fn test_height_only_truncates() {
        // 1920 * 600 / 1080 = 1066.67
        let plan = resolve(1920, 1080, None, Some(600), ResizeMode::Fit).unwrap();
        assert_eq!(plan.output_dimensions(), (1066, 600));
    }

    #[test]
    fn test_single_dimension_never_collapses_to_zero() {
        let plan = resolve(1000, 1, Some(10), None, ResizeMode::Fit).unwrap();
        assert_eq!(plan.output_dimensions(), (10, 1));
    }

    #[test]
    fn test_single_dimension_aspect_within_one_pixel() {
        let cases = [(1000, 500), (1920, 1080), (333, 777), (7, 3), (4000, 3000)];
        let requests = [1, 17, 200, 640, 5000];
        for (ow, oh) in cases {
            for r in requests {
                let plan = resolve(ow, oh, Some(r), None, ResizeMode::Fill).unwrap();
                let (w, h) = plan.output_dimensions();
                assert_eq!(w, r);
                let exact = f64::from(oh) * f64::from(r) / f64::from(ow);
                assert!((f64::from(h) - exact).abs() <= 1.0, "{ow}x{oh} -> {w}x{h}");

                let plan = resolve(ow, oh, None, Some(r), ResizeMode::Exact).unwrap();
                let (w, h) = plan.output_dimensions();
                assert_eq!(h, r);
                let exact = f64::from(ow) * f64::from(r) / f64::from(oh);
                assert!((f64::from(w) - exact).abs() <= 1.0, "{ow}x{oh} -> {w}x{h}");
            }
        }
    }

    #[test]
    fn test_fit_scenario() {
        let plan = resolve(1000, 500, Some(200), Some(200), ResizeMode::Fit).unwrap();
        assert_eq!(plan.output_dimensions(), (200, 100));
        assert!(plan.crop.is_none());
    }

    #[test]
    fn test_fill_scenario() {
        let plan = resolve(1000, 500, Some(200), Some(200), ResizeMode::Fill).unwrap();
        assert_eq!((plan.scaled_width, plan.scaled_height), (400, 200));
        assert_eq!(
            plan.crop,
            Some(CropRect {
                x: 100,
                y: 0,
                width: 200,
                height: 200,
            })
        );
        assert_eq!(plan.output_dimensions(), (200, 200));
    }

    #[test]
    fn test_exact_scenario() {
        let plan = resolve(1000, 500, Some(200), Some(200), ResizeMode::Exact).unwrap();
        assert_eq!(plan.output_dimensions(), (200, 200));
        assert!(plan.crop.is_none());
    }

    #[test]
    fn test_fill_portrait_crops_vertically() {
        let plan = resolve(500, 1000, Some(200), Some(100), ResizeMode::Fill).unwrap();
        assert_eq!((plan.scaled_width, plan.scaled_height), (200, 400));
        let crop = plan.crop.unwrap();
        assert_eq!((crop.x, crop.y), (0, 150));
    }

    #[test]
    fn test_fit_and_fill_bounds_across_grid() {
        let originals = [(1000, 500), (500, 1000), (640, 480), (3, 7), (1, 1), (4096, 170)];
        let requests = [(200, 200), (1, 1), (333, 100), (100, 333), (5000, 2000)];
        for (ow, oh) in originals {
            for (rw, rh) in requests {
                let fit = resolve(ow, oh, Some(rw), Some(rh), ResizeMode::Fit).unwrap();
                let (w, h) = fit.output_dimensions();
                assert!(w <= rw && h <= rh, "fit {ow}x{oh} into {rw}x{rh} gave {w}x{h}");
                assert!(w == rw || h == rh, "fit {ow}x{oh} into {rw}x{rh} gave {w}x{h}");

                let fill = resolve(ow, oh, Some(rw), Some(rh), ResizeMode::Fill).unwrap();
                assert_eq!(fill.output_dimensions(), (rw, rh));
                let crop = fill.crop.unwrap();
                assert!(crop.x + crop.width <= fill.scaled_width);
                assert!(crop.y + crop.height <= fill.scaled_height);

                let exact = resolve(ow, oh, Some(rw), Some(rh), ResizeMode::Exact).unwrap();
                assert_eq!(exact.output_dimensions(), (rw, rh));
            }
        }
    }

    #[test]
    fn test_upscaling_is_allowed() {
        let plan = resolve(100, 50, Some(400), Some(400), ResizeMode::Fit).unwrap();
        assert_eq!(plan.output_dimensions(), (400, 200));
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        assert!(matches!(
            resolve(100, 100, Some(0), None, ResizeMode::Fit),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            resolve(100, 100, Some(10), Some(0), ResizeMode::Fill),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            resolve(0, 100, Some(10), None, ResizeMode::Exact),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_oversized_requests_rejected() {
        let err = resolve(2, 2, Some(u32::MAX), Some(u32::MAX), ResizeMode::Exact).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        // every side in range, total area too large
        let err = resolve(100, 100, Some(60_000), Some(60_000), ResizeMode::Exact).unwrap_err();
        assert!(err.to_string().contains("pixels"));

        // a single requested side can still blow up the derived one
        assert!(resolve(1, 10_000, Some(1_000), None, ResizeMode::Fit).is_err());

        // fill's intermediate raster counts, not just the crop
        assert!(resolve(1, 1_000, Some(16_384), Some(16), ResizeMode::Fill).is_err());

        let plan = resolve(100, 100, Some(MAX_DIMENSION), Some(1), ResizeMode::Exact).unwrap();
        assert_eq!(plan.output_dimensions(), (MAX_DIMENSION, 1));
    }
}
