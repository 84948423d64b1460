//! Random image transforms applied around compositing.
//!
//! Every transform reads its input and returns a fresh buffer. All randomness
//! comes from the caller's `StdRng`, so a seeded run is reproducible.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgb, RgbImage};
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometric_transformations::{warp, Interpolation, Projection};
use imageproc::noise::{gaussian_noise_mut, salt_and_pepper_noise_mut};
use rand::rngs::StdRng;
use rand::Rng;
use tracing::warn;

pub trait Augment {
    fn apply(&self, image: &RgbImage, rng: &mut StdRng) -> RgbImage;
}

/// Uniform sample from `[low, high)`, or `low` when the range is empty.
fn sample(rng: &mut StdRng, low: f32, high: f32) -> f32 {
    if high > low {
        rng.gen_range(low..high)
    } else {
        low
    }
}

fn chance(rng: &mut StdRng, probability: f64) -> bool {
    rng.gen_bool(probability.clamp(0.0, 1.0))
}

/// Returns an unchanged copy.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Augment for Identity {
    fn apply(&self, image: &RgbImage, _rng: &mut StdRng) -> RgbImage {
        image.clone()
    }
}

/// Small rotation and shift of a rendered structure, optionally softened.
#[derive(Debug, Clone)]
pub struct MoleculeAugmenter {
    pub max_rotation_degrees: f32,
    /// Largest shift as a fraction of the image size.
    pub max_shift: f32,
    pub blur_probability: f64,
    pub max_blur_sigma: f32,
}

impl Default for MoleculeAugmenter {
    fn default() -> Self {
        Self {
            max_rotation_degrees: 5.0,
            max_shift: 0.05,
            blur_probability: 0.3,
            max_blur_sigma: 0.8,
        }
    }
}

impl Augment for MoleculeAugmenter {
    fn apply(&self, image: &RgbImage, rng: &mut StdRng) -> RgbImage {
        let (width, height) = image.dimensions();
        let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
        let angle = sample(rng, -self.max_rotation_degrees, self.max_rotation_degrees).to_radians();
        let dx = sample(rng, -self.max_shift, self.max_shift) * width as f32;
        let dy = sample(rng, -self.max_shift, self.max_shift) * height as f32;

        let projection = Projection::translate(cx + dx, cy + dy)
            * Projection::rotate(angle)
            * Projection::translate(-cx, -cy);
        let moved = warp(image, &projection, Interpolation::Bilinear, Rgb([255, 255, 255]));

        if chance(rng, self.blur_probability) {
            let sigma = sample(rng, 0.3, self.max_blur_sigma);
            if sigma > 0.0 {
                return gaussian_blur_f32(&moved, sigma);
            }
        }
        moved
    }
}

/// Crops, resizes and jitters a background texture to the canvas size.
#[derive(Debug, Clone)]
pub struct BackgroundAugmenter {
    /// Output width and height in pixels.
    pub size: u32,
    /// Smallest crop as a fraction of each side; 1.0 disables cropping.
    pub min_crop: f32,
    pub flips: bool,
    pub quarter_turns: bool,
    /// Largest brightness change, in intensity levels.
    pub max_brightness: i32,
    /// Largest contrast change, in percent.
    pub max_contrast: f32,
}

impl BackgroundAugmenter {
    pub fn new(size: u32) -> Self {
        Self {
            size,
            min_crop: 0.5,
            flips: true,
            quarter_turns: true,
            max_brightness: 30,
            max_contrast: 20.0,
        }
    }

    /// Only brings the background to the canvas size.
    pub fn fit_only(size: u32) -> Self {
        Self {
            size,
            min_crop: 1.0,
            flips: false,
            quarter_turns: false,
            max_brightness: 0,
            max_contrast: 0.0,
        }
    }
}

impl Augment for BackgroundAugmenter {
    fn apply(&self, image: &RgbImage, rng: &mut StdRng) -> RgbImage {
        let (width, height) = image.dimensions();
        let fraction = sample(rng, self.min_crop.clamp(0.05, 1.0), 1.0);
        let crop_w = ((width as f32 * fraction) as u32).clamp(1, width.max(1));
        let crop_h = ((height as f32 * fraction) as u32).clamp(1, height.max(1));
        let x = rng.gen_range(0..=width.saturating_sub(crop_w));
        let y = rng.gen_range(0..=height.saturating_sub(crop_h));
        let cropped = imageops::crop_imm(image, x, y, crop_w, crop_h).to_image();

        let mut out = if cropped.dimensions() == (self.size, self.size) {
            cropped
        } else {
            imageops::resize(&cropped, self.size, self.size, FilterType::Triangle)
        };

        if self.flips {
            if rng.gen_bool(0.5) {
                out = imageops::flip_horizontal(&out);
            }
            if rng.gen_bool(0.5) {
                out = imageops::flip_vertical(&out);
            }
        }
        if self.quarter_turns {
            out = match rng.gen_range(0..4) {
                1 => imageops::rotate90(&out),
                2 => imageops::rotate180(&out),
                3 => imageops::rotate270(&out),
                _ => out,
            };
        }
        if self.max_brightness > 0 {
            let value = rng.gen_range(-self.max_brightness..=self.max_brightness);
            out = imageops::brighten(&out, value);
        }
        if self.max_contrast > 0.0 {
            let value = sample(rng, -self.max_contrast, self.max_contrast);
            out = imageops::contrast(&out, value);
        }
        out
    }
}

/// Scan and photo artifacts applied to the finished composite.
#[derive(Debug, Clone)]
pub struct Degrader {
    pub blur_probability: f64,
    pub max_blur_sigma: f32,
    pub noise_probability: f64,
    pub max_noise_stddev: f64,
    pub salt_and_pepper_probability: f64,
    pub max_salt_and_pepper_rate: f64,
    pub jpeg_probability: f64,
    pub jpeg_quality: (u8, u8),
}

impl Default for Degrader {
    fn default() -> Self {
        Self {
            blur_probability: 0.5,
            max_blur_sigma: 1.0,
            noise_probability: 0.5,
            max_noise_stddev: 8.0,
            salt_and_pepper_probability: 0.2,
            max_salt_and_pepper_rate: 0.01,
            jpeg_probability: 0.5,
            jpeg_quality: (30, 95),
        }
    }
}

impl Augment for Degrader {
    fn apply(&self, image: &RgbImage, rng: &mut StdRng) -> RgbImage {
        let mut out = image.clone();
        if chance(rng, self.blur_probability) {
            let sigma = sample(rng, 0.2, self.max_blur_sigma);
            if sigma > 0.0 {
                out = gaussian_blur_f32(&out, sigma);
            }
        }
        if chance(rng, self.noise_probability) {
            let stddev = sample(rng, 0.0, self.max_noise_stddev as f32) as f64;
            gaussian_noise_mut(&mut out, 0.0, stddev, rng.gen());
        }
        if chance(rng, self.salt_and_pepper_probability) {
            let rate = sample(rng, 0.0, self.max_salt_and_pepper_rate as f32) as f64;
            salt_and_pepper_noise_mut(&mut out, rate, rng.gen());
        }
        if chance(rng, self.jpeg_probability) {
            let (low, high) = self.jpeg_quality;
            let quality = rng.gen_range(low.min(high)..=high.max(low)).clamp(1, 100);
            match jpeg_roundtrip(&out, quality) {
                Ok(decoded) => out = decoded,
                Err(err) => warn!(quality, "skipping JPEG degradation: {err}"),
            }
        }
        out
    }
}

/// Encodes as JPEG and decodes again.
pub fn jpeg_roundtrip(image: &RgbImage, quality: u8) -> Result<RgbImage, image::ImageError> {
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality).encode_image(image)?;
    Ok(image::load_from_memory_with_format(&buffer, ImageFormat::Jpeg)?.to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]))
    }

    #[test]
    fn identity_copies() {
        let image = gradient(16, 16);
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(Identity.apply(&image, &mut rng), image);
    }

    #[test]
    fn molecule_augmenter_keeps_shape_and_input() {
        let image = gradient(64, 64);
        let before = image.clone();
        let mut rng = StdRng::seed_from_u64(1);
        let out = MoleculeAugmenter::default().apply(&image, &mut rng);
        assert_eq!(out.dimensions(), (64, 64));
        assert_eq!(image, before);
    }

    #[test]
    fn same_seed_same_result() {
        let image = gradient(64, 64);
        let augmenter = MoleculeAugmenter::default();
        let a = augmenter.apply(&image, &mut StdRng::seed_from_u64(9));
        let b = augmenter.apply(&image, &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn background_is_brought_to_canvas_size() {
        let image = gradient(300, 200);
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..5 {
            assert_eq!(BackgroundAugmenter::new(256).apply(&image, &mut rng).dimensions(), (256, 256));
        }
        assert_eq!(BackgroundAugmenter::fit_only(64).apply(&image, &mut rng).dimensions(), (64, 64));
        let tiny = gradient(1, 1);
        assert_eq!(BackgroundAugmenter::new(8).apply(&tiny, &mut rng).dimensions(), (8, 8));
    }

    #[test]
    fn fit_only_keeps_a_correctly_sized_background() {
        let image = RgbImage::from_pixel(32, 32, Rgb([90, 90, 90]));
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(BackgroundAugmenter::fit_only(32).apply(&image, &mut rng), image);
    }

    #[test]
    fn degrader_keeps_shape() {
        let image = gradient(48, 48);
        let degrader = Degrader {
            blur_probability: 1.0,
            noise_probability: 1.0,
            salt_and_pepper_probability: 1.0,
            jpeg_probability: 1.0,
            ..Degrader::default()
        };
        let mut rng = StdRng::seed_from_u64(4);
        let out = degrader.apply(&image, &mut rng);
        assert_eq!(out.dimensions(), (48, 48));
        assert_ne!(out, image);
    }

    #[test]
    fn degrader_can_be_disabled() {
        let image = gradient(16, 16);
        let degrader = Degrader {
            blur_probability: 0.0,
            noise_probability: 0.0,
            salt_and_pepper_probability: 0.0,
            jpeg_probability: 0.0,
            ..Degrader::default()
        };
        assert_eq!(degrader.apply(&image, &mut StdRng::seed_from_u64(5)), image);
    }

    #[test]
    fn jpeg_roundtrip_keeps_dimensions() {
        let image = gradient(40, 24);
        let out = jpeg_roundtrip(&image, 50).unwrap();
        assert_eq!(out.dimensions(), (40, 24));
    }
}
