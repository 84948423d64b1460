use crate::CompositeError;
use image::RgbImage;

/// Blends a structure image onto a background:
/// `round(background * weight + structure * (1 - weight))` per channel.
pub fn composite(
    background: &RgbImage,
    structure: &RgbImage,
    weight: f32,
) -> Result<RgbImage, CompositeError> {
    if !(0.0..=1.0).contains(&weight) {
        return Err(CompositeError::InvalidWeight(weight));
    }
    if background.dimensions() != structure.dimensions() {
        return Err(CompositeError::DimensionMismatch {
            background: background.dimensions(),
            structure: structure.dimensions(),
        });
    }

    let mut out = structure.clone();
    for (pixel, under) in out.pixels_mut().zip(background.pixels()) {
        for (channel, b) in pixel.0.iter_mut().zip(under.0) {
            let blended = b as f32 * weight + *channel as f32 * (1.0 - weight);
            *channel = blended.round().clamp(0.0, 255.0) as u8;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn solid(value: u8) -> RgbImage {
        RgbImage::from_pixel(4, 4, Rgb([value, value, value]))
    }

    #[test]
    fn blends_per_channel() {
        let out = composite(&solid(100), &solid(200), 0.3).unwrap();
        assert!(out.pixels().all(|p| *p == Rgb([170, 170, 170])));
    }

    #[test]
    fn extreme_weights_pick_one_input() {
        let background = solid(10);
        let structure = solid(250);
        assert_eq!(composite(&background, &structure, 0.0).unwrap(), structure);
        assert_eq!(composite(&background, &structure, 1.0).unwrap(), background);
    }

    #[test]
    fn is_deterministic_and_leaves_inputs_alone() {
        let background = RgbImage::from_fn(8, 8, |x, y| Rgb([x as u8 * 30, y as u8 * 30, 7]));
        let structure = solid(255);
        let a = composite(&background, &structure, 0.3).unwrap();
        let b = composite(&background, &structure, 0.3).unwrap();
        assert_eq!(a, b);
        assert_eq!(structure, solid(255));
    }

    #[test]
    fn rejects_mismatched_shapes() {
        let err = composite(&RgbImage::new(4, 4), &RgbImage::new(4, 5), 0.3).unwrap_err();
        assert_eq!(
            err,
            CompositeError::DimensionMismatch {
                background: (4, 4),
                structure: (4, 5)
            }
        );
    }

    #[test]
    fn rejects_bad_weights() {
        for weight in [-0.1, 1.01, f32::NAN] {
            assert!(matches!(
                composite(&solid(0), &solid(0), weight),
                Err(CompositeError::InvalidWeight(_))
            ));
        }
    }
}
