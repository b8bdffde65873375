//! Heatmap rendering: Gaussian smoothing, diverging colour map, PNG output.

use std::fs;
use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use scanpro_core::{NormalizedGrid, Renderer, ScanError};

/// Cool-warm diverging map anchors (blue → light grey → red).
const COOLWARM: [(f32, [f32; 3]); 5] = [
    (0.00, [59.0, 76.0, 192.0]),
    (0.25, [141.0, 176.0, 254.0]),
    (0.50, [221.0, 221.0, 221.0]),
    (0.75, [244.0, 154.0, 123.0]),
    (1.00, [180.0, 4.0, 38.0]),
];

const INVALID: Rgb<u8> = Rgb([255, 255, 255]);

/// Map `t` in `[0, 1]` onto the cool-warm palette.
pub fn coolwarm(t: f32) -> Rgb<u8> {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.5 };
    let mut lo = COOLWARM[0];
    for hi in &COOLWARM[1..] {
        if t <= hi.0 {
            let f = (t - lo.0) / (hi.0 - lo.0);
            let c = |i: usize| (lo.1[i] + f * (hi.1[i] - lo.1[i])).round() as u8;
            return Rgb([c(0), c(1), c(2)]);
        }
        lo = *hi;
    }
    let [r, g, b] = COOLWARM[COOLWARM.len() - 1].1;
    Rgb([r as u8, g as u8, b as u8])
}

/// Half-sample symmetric reflection (`cba|abcd|dcb`).
#[inline]
fn reflect(i: isize, n: usize) -> usize {
    let n = n as isize;
    let mut i = i;
    loop {
        if i < 0 {
            i = -i - 1;
        } else if i >= n {
            i = 2 * n - i - 1;
        } else {
            return i as usize;
        }
    }
}

fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    // Truncate at 4 sigma.
    let radius = (4.0 * sigma + 0.5) as isize;
    let mut k: Vec<f32> = (-radius..=radius)
        .map(|x| (-(x * x) as f32 / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f32 = k.iter().sum();
    for v in &mut k {
        *v /= sum;
    }
    k
}

/// Separable Gaussian blur over a row-major `rows x cols` buffer.
pub fn gaussian_smooth(values: &[f32], rows: usize, cols: usize, sigma: f32) -> Vec<f32> {
    if !(sigma.is_finite() && sigma > 0.0) || rows == 0 || cols == 0 {
        return values.to_vec();
    }
    let k = gaussian_kernel(sigma);
    let r = (k.len() / 2) as isize;
    let mut tmp = vec![0.0f32; values.len()];
    for y in 0..rows {
        for x in 0..cols {
            tmp[y * cols + x] = k
                .iter()
                .enumerate()
                .map(|(j, w)| w * values[y * cols + reflect(x as isize + j as isize - r, cols)])
                .sum();
        }
    }
    let mut out = vec![0.0f32; values.len()];
    for y in 0..rows {
        for x in 0..cols {
            out[y * cols + x] = k
                .iter()
                .enumerate()
                .map(|(j, w)| w * tmp[reflect(y as isize + j as isize - r, rows) * cols + x])
                .sum();
        }
    }
    out
}

pub fn ensure_parent_dir(path: &Path) -> Result<(), ScanError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .map_err(|e| ScanError::Render(format!("create {}: {e}", parent.display())))?;
    }
    Ok(())
}

/// Writes `heatmap_YYYY-mm-dd_HH-MM-SS.png` files into a directory.
#[derive(Debug, Clone)]
pub struct HeatmapRenderer {
    dir: PathBuf,
    width: u32,
    height: u32,
    sigma: f32,
}

impl HeatmapRenderer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            width: 800,
            height: 640,
            sigma: 1.0,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width.max(1);
        self.height = height.max(1);
        self
    }

    pub fn with_sigma(mut self, sigma: f32) -> Self {
        self.sigma = sigma;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Colour image for `grid`; invalid cells are white.
    pub fn draw(&self, grid: &NormalizedGrid) -> RgbImage {
        let (rows, cols) = grid.shape();
        let smooth = gaussian_smooth(grid.values(), rows, cols, self.sigma);
        let (lo, hi) = smooth
            .iter()
            .zip(grid.mask())
            .filter(|(_, ok)| **ok)
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), (v, _)| {
                (lo.min(*v), hi.max(*v))
            });
        let span = hi - lo;
        RgbImage::from_fn(self.width, self.height, |px, py| {
            let c = (px as usize * cols / self.width as usize).min(cols.saturating_sub(1));
            let r = (py as usize * rows / self.height as usize).min(rows.saturating_sub(1));
            let i = r * cols + c;
            if !grid.mask()[i] {
                return INVALID;
            }
            let t = if span > 0.0 { (smooth[i] - lo) / span } else { 0.5 };
            coolwarm(t)
        })
    }

    /// Render to an explicit path.
    pub fn render_to(&self, grid: &NormalizedGrid, path: &Path) -> Result<(), ScanError> {
        ensure_parent_dir(path)?;
        self.draw(grid)
            .save(path)
            .map_err(|e| ScanError::Render(format!("save {}: {e}", path.display())))
    }

    pub fn timestamped_path(&self) -> PathBuf {
        let stamp = chrono::Local::now().format("heatmap_%Y-%m-%d_%H-%M-%S.png");
        self.dir.join(stamp.to_string())
    }
}

impl Renderer for HeatmapRenderer {
    fn render(&self, grid: &NormalizedGrid) -> Result<PathBuf, ScanError> {
        let path = self.timestamped_path();
        self.render_to(grid, &path)?;
        tracing::debug!(path = %path.display(), rows = grid.rows(), cols = grid.cols(), "heatmap saved");
        Ok(path)
    }
}
