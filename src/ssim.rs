//! Structural-similarity scoring of rendered frames.
//!
//! The aggregation core only ever sees this as an opaque measurement
//! function behind the `Scorer` trait. The implementation computes a
//! global SSIM index per channel (K1 = 0.01, K2 = 0.03, L = 255) and
//! averages the three channels; identical frames score exactly 1.0.

use engine::Scorer;
use errors::*;
use image;
use image::RgbImage;
use std::path::{Path, PathBuf};

const K1: f64 = 0.01;
const K2: f64 = 0.03;
const LEVELS: f64 = 255.0;

/// Computes the similarity score of `image` against `reference`.
/// The two frames must have identical dimensions; a mismatch is an error,
/// never a silent mismeasure.
pub fn score(reference: &RgbImage, image: &RgbImage) -> Result<f64> {
    if reference.dimensions() != image.dimensions() {
        bail!(ErrorKind::DimensionMismatch(
            reference.dimensions(),
            image.dimensions()
        ));
    }

    let n = (reference.width() * reference.height()) as f64;
    let c1 = (K1 * LEVELS) * (K1 * LEVELS);
    let c2 = (K2 * LEVELS) * (K2 * LEVELS);

    let mut total = 0.0;
    for channel in 0..3 {
        let xs: Vec<f64> = reference.pixels().map(|p| p.0[channel] as f64).collect();
        let ys: Vec<f64> = image.pixels().map(|p| p.0[channel] as f64).collect();

        let mean_x = xs.iter().sum::<f64>() / n;
        let mean_y = ys.iter().sum::<f64>() / n;

        let mut var_x = 0.0;
        let mut var_y = 0.0;
        let mut cov = 0.0;
        for (x, y) in xs.iter().zip(ys.iter()) {
            var_x += (x - mean_x) * (x - mean_x);
            var_y += (y - mean_y) * (y - mean_y);
            cov += (x - mean_x) * (y - mean_y);
        }
        var_x /= n;
        var_y /= n;
        cov /= n;

        total += (2.0 * mean_x * mean_y + c1) * (2.0 * cov + c2)
            / ((mean_x * mean_x + mean_y * mean_y + c1) * (var_x + var_y + c2));
    }
    Ok(total / 3.0)
}

/// Loads a rendered frame as RGB.
pub fn load(path: &Path) -> Result<RgbImage> {
    let img = image::open(path)
        .chain_err(|| format!("failed to read image '{}'", path.display()))?;
    Ok(img.to_rgb8())
}

/// `Scorer` over image paths: loads both frames at comparison time and
/// scores the sample against its group's baseline frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct SsimScorer;

impl Scorer for SsimScorer {
    type Value = PathBuf;

    fn absolute(&self, _value: &PathBuf) -> Result<f64> {
        bail!("similarity sweeps require a baseline image")
    }

    fn against(&self, value: &PathBuf, baseline: &PathBuf) -> Result<f64> {
        let img = load(value)?;
        let base = load(baseline)?;
        score(&base, &img)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn identical_frames_score_one() {
        let a = RgbImage::from_pixel(8, 8, Rgb([100, 150, 200]));
        let b = a.clone();
        let s = score(&a, &b).unwrap();
        assert!((s - 1.0).abs() < 1e-12, "got {}", s);
    }

    #[test]
    fn different_frames_score_below_one() {
        let a = RgbImage::from_pixel(8, 8, Rgb([100, 150, 200]));
        let b = RgbImage::from_pixel(8, 8, Rgb([90, 160, 180]));
        let s = score(&a, &b).unwrap();
        assert!(s < 1.0);
        assert!(s > 0.0);
    }

    #[test]
    fn varying_content_tracks_similarity() {
        let mut a = RgbImage::new(8, 8);
        let mut b = RgbImage::new(8, 8);
        for (x, y, p) in a.enumerate_pixels_mut() {
            *p = Rgb([(x * 30) as u8, (y * 30) as u8, 128]);
        }
        for (x, y, p) in b.enumerate_pixels_mut() {
            *p = Rgb([(x * 30) as u8, (y * 30) as u8, 128]);
        }
        assert!((score(&a, &b).unwrap() - 1.0).abs() < 1e-12);

        // Perturb one frame; similarity drops.
        b.put_pixel(0, 0, Rgb([255, 255, 255]));
        assert!(score(&a, &b).unwrap() < 1.0);
    }

    #[test]
    fn dimension_mismatch_fails() {
        let a = RgbImage::new(8, 8);
        let b = RgbImage::new(8, 4);
        let err = score(&a, &b).unwrap_err();
        match *err.kind() {
            ErrorKind::DimensionMismatch(x, y) => {
                assert_eq!(x, (8, 8));
                assert_eq!(y, (8, 4));
            }
            ref k => panic!("unexpected kind: {:?}", k),
        }
    }
}
