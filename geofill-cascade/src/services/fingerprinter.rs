//! Perceptual image fingerprinting (pHash)
//!
//! Image is converted to grayscale, resized to 32x32, transformed with a 2-D
//! DCT-II, and the top-left 8x8 low-frequency block is thresholded against
//! its median. Bits are packed row-major, first bit most significant.
//!
//! Decoding and hashing are CPU-bound and run under `spawn_blocking`.

use async_trait::async_trait;
use image::imageops::FilterType;
use image::DynamicImage;
use std::f64::consts::PI;
use std::path::Path;

use crate::types::{EvidenceError, Fingerprint, Fingerprinter};

const SAMPLE_SIZE: usize = 32;
const HASH_SIZE: usize = 8;

/// pHash fingerprinter backed by the `image` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct PerceptualHasher;

impl PerceptualHasher {
    pub fn new() -> Self {
        Self
    }

    /// Decode and hash an image file (blocking)
    pub fn hash_file(path: &Path) -> Result<Fingerprint, EvidenceError> {
        let img = image::open(path)
            .map_err(|e| EvidenceError::Parse(format!("cannot decode {}: {}", path.display(), e)))?;
        Ok(perceptual_hash(&img))
    }
}

#[async_trait]
impl Fingerprinter for PerceptualHasher {
    async fn fingerprint(&self, path: &Path) -> Result<Fingerprint, EvidenceError> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || Self::hash_file(&path))
            .await
            .map_err(|e| EvidenceError::Internal(format!("fingerprint task failed: {}", e)))?
    }
}

/// 64-bit perceptual hash of an image
pub fn perceptual_hash(img: &DynamicImage) -> Fingerprint {
    let gray = img.to_luma8();
    let small = image::imageops::resize(&gray, SAMPLE_SIZE as u32, SAMPLE_SIZE as u32, FilterType::Lanczos3);

    let mut pixels = vec![[0.0f64; SAMPLE_SIZE]; SAMPLE_SIZE];
    for (x, y, p) in small.enumerate_pixels() {
        pixels[y as usize][x as usize] = f64::from(p.0[0]);
    }

    let coefficients = dct_2d(&pixels);
    let mut low = Vec::with_capacity(HASH_SIZE * HASH_SIZE);
    for row in coefficients.iter().take(HASH_SIZE) {
        low.extend_from_slice(&row[..HASH_SIZE]);
    }

    let threshold = median(&low);
    let bits = low
        .iter()
        .fold(0u64, |acc, &c| (acc << 1) | u64::from(c > threshold));
    Fingerprint(bits)
}

/// Unnormalized DCT-II of one sequence
fn dct_1d(input: &[f64; SAMPLE_SIZE]) -> [f64; SAMPLE_SIZE] {
    let n = SAMPLE_SIZE as f64;
    let mut out = [0.0; SAMPLE_SIZE];
    for (k, slot) in out.iter_mut().enumerate() {
        let sum: f64 = input
            .iter()
            .enumerate()
            .map(|(i, x)| x * (PI * k as f64 * (2.0 * i as f64 + 1.0) / (2.0 * n)).cos())
            .sum();
        *slot = 2.0 * sum;
    }
    out
}

/// Column transform followed by row transform
fn dct_2d(pixels: &[[f64; SAMPLE_SIZE]]) -> Vec<[f64; SAMPLE_SIZE]> {
    let mut columns = vec![[0.0; SAMPLE_SIZE]; SAMPLE_SIZE];
    for x in 0..SAMPLE_SIZE {
        let mut column = [0.0; SAMPLE_SIZE];
        for (y, row) in pixels.iter().enumerate() {
            column[y] = row[x];
        }
        let transformed = dct_1d(&column);
        for (y, value) in transformed.iter().enumerate() {
            columns[y][x] = *value;
        }
    }
    columns.iter().map(dct_1d).collect()
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use tempfile::TempDir;

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_fn(width, height, |x, y| {
            Luma([((x * 255) / width) as u8 / 2 + ((y * 100) / height) as u8])
        }))
    }

    fn checkerboard(size: u32, cell: u32) -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_fn(size, size, |x, y| {
            if ((x / cell) + (y / cell)) % 2 == 0 {
                Luma([230])
            } else {
                Luma([20])
            }
        }))
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn test_dct_of_constant_is_dc_only() {
        let out = dct_1d(&[1.0; SAMPLE_SIZE]);
        assert!((out[0] - 2.0 * SAMPLE_SIZE as f64).abs() < 1e-9);
        assert!(out[1..].iter().all(|c| c.abs() < 1e-9));
    }

    #[test]
    fn test_hash_is_deterministic() {
        let img = gradient(120, 80);
        assert_eq!(perceptual_hash(&img), perceptual_hash(&img));
    }

    #[test]
    fn test_different_images_differ() {
        let a = perceptual_hash(&gradient(64, 64));
        let b = perceptual_hash(&checkerboard(64, 8));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_identical_files_share_fingerprint() {
        let temp = TempDir::new().unwrap();
        let first = temp.path().join("a.png");
        let second = temp.path().join("b.png");
        checkerboard(48, 6).save(&first).unwrap();
        checkerboard(48, 6).save(&second).unwrap();

        let hasher = PerceptualHasher::new();
        let a = hasher.fingerprint(&first).await.unwrap();
        let b = hasher.fingerprint(&second).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_undecodable_file_is_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.jpg");
        std::fs::write(&path, b"not an image").unwrap();
        let result = PerceptualHasher::new().fingerprint(&path).await;
        assert!(matches!(result, Err(EvidenceError::Parse(_))));
    }
}
