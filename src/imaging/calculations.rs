//! Pure calculation functions for crop and scale geometry.
//!
//! All functions here are pure and testable without any I/O or images.
//! Aspect ratios are compared by integer cross-multiplication so that
//! "same ratio" never depends on floating-point rounding.

use super::params::CropAnchor;
use std::cmp::Ordering;

/// A rectangle inside a source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Compare the aspect ratio of `a` against `b`, both as `(width, height)`.
///
/// `Greater` means `a` is wider than `b`.
pub fn compare_aspect(a: (u32, u32), b: (u32, u32)) -> Ordering {
    let lhs = a.0 as u64 * b.1 as u64;
    let rhs = a.1 as u64 * b.0 as u64;
    lhs.cmp(&rhs)
}

/// Start offset of a window of length `keep` inside `extent`.
///
/// The window's center sits at `extent × (1 − anchor)` from the start, then
/// the window is clamped so it never leaves `[0, extent)`.
///
/// ```
/// # use graphics_packer::imaging::calculations::anchored_offset;
/// assert_eq!(anchored_offset(200, 100, 0.0), 100); // keep the end
/// assert_eq!(anchored_offset(200, 100, 0.5), 50);  // keep the middle
/// assert_eq!(anchored_offset(200, 100, 1.0), 0);   // keep the start
/// ```
pub fn anchored_offset(extent: u32, keep: u32, anchor: f32) -> u32 {
    let keep = keep.min(extent);
    let max_offset = extent - keep;
    let center = extent as f64 * (1.0 - anchor.clamp(0.0, 1.0) as f64);
    let start = (center - keep as f64 / 2.0).round();
    start.clamp(0.0, max_offset as f64) as u32
}

/// Window that crops `source` to the aspect ratio of `target` along exactly one axis.
///
/// Returns `None` when the ratios already match. The axis that is "too long"
/// is cut; `anchor.x` positions a horizontal cut, `anchor.y` a vertical one.
/// Both axes go through the same [`anchored_offset`] routine.
pub fn calculate_trim_window(
    source: (u32, u32),
    target: (u32, u32),
    anchor: CropAnchor,
) -> Option<CropWindow> {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    match compare_aspect(source, target) {
        Ordering::Equal => None,
        Ordering::Greater => {
            // Too wide: keep full height, cut width
            let keep = scaled(src_h, tgt_w, tgt_h).clamp(1, src_w);
            Some(CropWindow {
                x: anchored_offset(src_w, keep, anchor.x),
                y: 0,
                width: keep,
                height: src_h,
            })
        }
        Ordering::Less => {
            // Too tall: keep full width, cut height
            let keep = scaled(src_w, tgt_h, tgt_w).clamp(1, src_h);
            Some(CropWindow {
                x: 0,
                y: anchored_offset(src_h, keep, anchor.y),
                width: src_w,
                height: keep,
            })
        }
    }
}

/// Dimensions that fit `source` inside `bounds` without cropping.
///
/// The result preserves the source aspect ratio (within rounding) and touches
/// at least one edge of the box. Small images are scaled up.
///
/// ```
/// # use graphics_packer::imaging::calculations::calculate_contain_dimensions;
/// assert_eq!(calculate_contain_dimensions((800, 600), (400, 400)), (400, 300));
/// assert_eq!(calculate_contain_dimensions((50, 100), (200, 100)), (50, 100));
/// ```
pub fn calculate_contain_dimensions(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (box_w, box_h) = bounds;

    match compare_aspect(source, bounds) {
        Ordering::Equal => bounds,
        // Source is wider: width matches, height shrinks
        Ordering::Greater => (box_w, scaled(box_w, src_h, src_w).clamp(1, box_h)),
        // Source is taller: height matches, width shrinks
        Ordering::Less => (scaled(box_h, src_w, src_h).clamp(1, box_w), box_h),
    }
}

/// `round(value × num / den)` in exact integer arithmetic.
fn scaled(value: u32, num: u32, den: u32) -> u32 {
    let value = value as u64 * num as u64;
    let den = den.max(1) as u64;
    ((value * 2 + den) / (den * 2)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // compare_aspect tests
    // =========================================================================

    #[test]
    fn aspect_equal_for_scaled_sizes() {
        assert_eq!(compare_aspect((200, 100), (2, 1)), Ordering::Equal);
    }

    #[test]
    fn aspect_wider_and_taller() {
        assert_eq!(compare_aspect((300, 100), (2, 1)), Ordering::Greater);
        assert_eq!(compare_aspect((100, 300), (2, 1)), Ordering::Less);
    }

    // =========================================================================
    // anchored_offset tests
    // =========================================================================

    #[test]
    fn offset_clamped_at_both_ends() {
        // Centers outside the extent are pulled back in bounds
        assert_eq!(anchored_offset(100, 80, 0.0), 20);
        assert_eq!(anchored_offset(100, 80, 1.0), 0);
    }

    #[test]
    fn offset_linear_between_ends() {
        // extent 400, keep 100: center = 400 × 0.75 = 300 → start 250
        assert_eq!(anchored_offset(400, 100, 0.25), 250);
        // center = 400 × 0.25 = 100 → start 50
        assert_eq!(anchored_offset(400, 100, 0.75), 50);
    }

    #[test]
    fn offset_keep_equal_extent_is_zero() {
        assert_eq!(anchored_offset(100, 100, 0.3), 0);
    }

    // =========================================================================
    // calculate_trim_window tests
    // =========================================================================

    #[test]
    fn trim_none_when_ratio_matches() {
        assert_eq!(
            calculate_trim_window((400, 200), (100, 50), CropAnchor::default()),
            None
        );
    }

    #[test]
    fn trim_wide_to_square_anchor_zero_keeps_right_half() {
        let w = calculate_trim_window((200, 100), (50, 50), CropAnchor::uniform(0.0)).unwrap();
        assert_eq!(
            w,
            CropWindow {
                x: 100,
                y: 0,
                width: 100,
                height: 100
            }
        );
    }

    #[test]
    fn trim_wide_to_square_anchor_one_keeps_left_half() {
        let w = calculate_trim_window((200, 100), (50, 50), CropAnchor::uniform(1.0)).unwrap();
        assert_eq!(w.x, 0);
        assert_eq!((w.width, w.height), (100, 100));
    }

    #[test]
    fn trim_wide_to_square_centered() {
        let w = calculate_trim_window((200, 100), (50, 50), CropAnchor::default()).unwrap();
        assert_eq!(w.x, 50);
        assert_eq!((w.width, w.height), (100, 100));
    }

    #[test]
    fn trim_tall_to_square_anchor_zero_keeps_bottom_half() {
        let w = calculate_trim_window((100, 200), (50, 50), CropAnchor::uniform(0.0)).unwrap();
        assert_eq!(
            w,
            CropWindow {
                x: 0,
                y: 100,
                width: 100,
                height: 100
            }
        );
    }

    #[test]
    fn trim_tall_uses_y_anchor_only() {
        let anchor = CropAnchor { x: 0.0, y: 1.0 };
        let w = calculate_trim_window((100, 200), (50, 50), anchor).unwrap();
        assert_eq!(w.y, 0);
    }

    #[test]
    fn trim_result_matches_target_ratio() {
        // 1920x1080 → 4:5 portrait box
        let w = calculate_trim_window((1920, 1080), (400, 500), CropAnchor::default()).unwrap();
        assert_eq!(w.height, 1080);
        assert_eq!(w.width, 864); // 1080 × 4/5
        assert_eq!(compare_aspect((w.width, w.height), (400, 500)), Ordering::Equal);
        assert_eq!(w.x, 528); // (1920 − 864) / 2
    }

    // =========================================================================
    // calculate_contain_dimensions tests
    // =========================================================================

    #[test]
    fn contain_wider_source() {
        assert_eq!(calculate_contain_dimensions((800, 600), (400, 400)), (400, 300));
    }

    #[test]
    fn contain_taller_source() {
        assert_eq!(calculate_contain_dimensions((600, 800), (400, 400)), (300, 400));
    }

    #[test]
    fn contain_same_ratio_fills_box() {
        assert_eq!(calculate_contain_dimensions((1000, 500), (200, 100)), (200, 100));
    }

    #[test]
    fn contain_scales_up_small_images() {
        assert_eq!(calculate_contain_dimensions((10, 20), (100, 100)), (50, 100));
    }

    #[test]
    fn contain_never_collapses_to_zero() {
        assert_eq!(calculate_contain_dimensions((1000, 1), (10, 10)), (10, 1));
    }

    #[test]
    fn contain_fits_and_touches_an_edge() {
        let boxes = [(64, 64), (120, 80), (80, 120), (1, 50)];
        let sources = [(1, 1), (1920, 1080), (333, 777), (5, 2), (2048, 2049)];
        for bounds in boxes {
            for source in sources {
                let (w, h) = calculate_contain_dimensions(source, bounds);
                assert!(w <= bounds.0 && h <= bounds.1, "{source:?} in {bounds:?} → {w}x{h}");
                assert!(
                    w == bounds.0 || h == bounds.1,
                    "{source:?} in {bounds:?} → {w}x{h} touches no edge"
                );
            }
        }
    }
}
