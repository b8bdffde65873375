//! Luma conversion and the two heuristic image statistics.
//!
//! - `luma_bt601`: RGB → 8-bit gray with ITU-R BT.601 weights (Q14 fixed point).
//! - `laplacian_variance`: population variance of the 4-neighbour Laplacian,
//!   borders reflected without repeating the edge pixel (`dcb|abcd|cba`).
//! - `compute_metrics`: sharpness and brightness for one decoded image.

use image::{DynamicImage, GrayImage, Luma};
use scanpro_core::ClassificationMetrics;

// BT.601 weights in Q14 fixed point; they sum to 1 << 14.
const LUMA_R: u32 = 4899;
const LUMA_G: u32 = 9617;
const LUMA_B: u32 = 1868;
const LUMA_SHIFT: u32 = 14;

/// BT.601 luma in the fixed-point form of the usual RGB → GRAY conversion,
/// so results agree bit for bit on rounding edges.
pub fn luma_bt601(img: &DynamicImage) -> GrayImage {
    let rgb = img.to_rgb8();
    let mut out = GrayImage::new(rgb.width(), rgb.height());
    for (x, y, px) in rgb.enumerate_pixels() {
        let [r, g, b] = px.0.map(u32::from);
        let yv = (r * LUMA_R + g * LUMA_G + b * LUMA_B + (1 << (LUMA_SHIFT - 1))) >> LUMA_SHIFT;
        out.put_pixel(x, y, Luma([yv.min(255) as u8]));
    }
    out
}

/// Reflect an out-of-range index back into `0..n`, edge pixel not repeated.
#[inline]
fn reflect101(i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let n = n as isize;
    let mut i = i;
    loop {
        if i < 0 {
            i = -i;
        } else if i >= n {
            i = 2 * n - 2 - i;
        } else {
            return i as usize;
        }
    }
}

/// Variance of `[[0,1,0],[1,-4,1],[0,1,0]]` applied to `gray`.
pub fn laplacian_variance(gray: &GrayImage) -> f64 {
    let (w, h) = (gray.width() as usize, gray.height() as usize);
    if w == 0 || h == 0 {
        return 0.0;
    }
    let px = |x: isize, y: isize| -> f64 {
        let xi = reflect101(x, w) as u32;
        let yi = reflect101(y, h) as u32;
        f64::from(gray.get_pixel(xi, yi).0[0])
    };
    let n = (w * h) as f64;
    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for y in 0..h as isize {
        for x in 0..w as isize {
            let lap = px(x - 1, y) + px(x + 1, y) + px(x, y - 1) + px(x, y + 1) - 4.0 * px(x, y);
            sum += lap;
            sum_sq += lap * lap;
        }
    }
    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0)
}

pub fn mean_luma(gray: &GrayImage) -> f64 {
    let raw = gray.as_raw();
    if raw.is_empty() {
        return 0.0;
    }
    raw.iter().map(|v| f64::from(*v)).sum::<f64>() / raw.len() as f64
}

#[inline]
fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub fn compute_metrics(img: &DynamicImage) -> ClassificationMetrics {
    let gray = luma_bt601(img);
    ClassificationMetrics {
        sharpness: round2(laplacian_variance(&gray) / 1000.0),
        brightness: mean_luma(&gray),
    }
}
