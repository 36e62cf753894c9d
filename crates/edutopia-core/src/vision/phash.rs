//! 64-bit DCT perceptual hash

use image::imageops::FilterType;
use image::DynamicImage;
use std::f64::consts::PI;

const SIZE: usize = 32;
const LOW: usize = 8;

/// Perceptual hash; visually similar images have a small Hamming distance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageHash(pub u64);

impl ImageHash {
    /// Number of differing bits
    pub fn distance(&self, other: &ImageHash) -> u32 {
        (self.0 ^ other.0).count_ones()
    }
}

impl std::fmt::Display for ImageHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Hash an image: 32x32 grayscale, 2D DCT-II, top-left 8x8 coefficients
/// thresholded at their median
pub fn phash(image: &DynamicImage) -> ImageHash {
    let gray = image
        .resize_exact(SIZE as u32, SIZE as u32, FilterType::Lanczos3)
        .to_luma8();
    let pixels: Vec<f64> = gray.pixels().map(|p| p.0[0] as f64).collect();

    let mut cos = [[0f64; SIZE]; LOW];
    for (k, row) in cos.iter_mut().enumerate() {
        for (n, c) in row.iter_mut().enumerate() {
            *c = (PI * k as f64 * (2 * n + 1) as f64 / (2 * SIZE) as f64).cos();
        }
    }

    // DCT along columns, keeping only the low-frequency rows
    let mut cols = [[0f64; SIZE]; LOW];
    for u in 0..LOW {
        for x in 0..SIZE {
            cols[u][x] = (0..SIZE).map(|y| pixels[y * SIZE + x] * cos[u][y]).sum();
        }
    }

    let mut coeffs = [0f64; LOW * LOW];
    for u in 0..LOW {
        for v in 0..LOW {
            coeffs[u * LOW + v] = (0..SIZE).map(|x| cols[u][x] * cos[v][x]).sum();
        }
    }

    let mut sorted = coeffs;
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median = (sorted[LOW * LOW / 2 - 1] + sorted[LOW * LOW / 2]) / 2.0;

    let bits = coeffs
        .iter()
        .enumerate()
        .fold(0u64, |acc, (i, &c)| if c > median { acc | (1 << (63 - i)) } else { acc });
    ImageHash(bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    /// Smooth synthetic scene defined in unit coordinates, so any size
    /// samples the same picture
    fn scene(width: u32, height: u32, inverted: bool) -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_fn(width, height, |x, y| {
            let u = x as f64 / width as f64;
            let v = y as f64 / height as f64;
            let value = 128.0
                + 60.0 * (2.0 * PI * 1.3 * u + 0.5).sin()
                + 40.0 * (2.0 * PI * 2.1 * v + 1.0).cos()
                + 20.0 * (2.0 * PI * 0.7 * (u + v)).sin();
            let value = value.clamp(0.0, 255.0) as u8;
            Luma([if inverted { 255 - value } else { value }])
        }))
    }

    #[test]
    fn test_identical_images_have_zero_distance() {
        let a = phash(&scene(200, 150, false));
        let b = phash(&scene(200, 150, false));
        assert_eq!(a.distance(&b), 0);
    }

    #[test]
    fn test_rescaled_image_is_similar() {
        let a = phash(&scene(640, 480, false));
        let b = phash(&scene(320, 240, false));
        assert!(a.distance(&b) < 9, "distance {}", a.distance(&b));
    }

    #[test]
    fn test_inverted_image_is_far_apart() {
        let a = phash(&scene(256, 256, false));
        let b = phash(&scene(256, 256, true));
        assert!(a.distance(&b) >= 9, "distance {}", a.distance(&b));
    }

    #[test]
    fn test_distance_is_hamming() {
        assert_eq!(ImageHash(0b1011).distance(&ImageHash(0b0001)), 2);
        assert_eq!(ImageHash(0).to_string(), "0000000000000000");
    }
}
