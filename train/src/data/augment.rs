//! Random affine image augmentation.

use crate::{common::*, config::AugmentationConfig};

/// Samples and applies the transformations of an [AugmentationConfig].
#[derive(Debug, Clone)]
pub struct Augmentation {
    rescale: f64,
    rotation: f64,
    width_shift: f64,
    height_shift: f64,
    shear: f64,
    zoom: f64,
    horizontal_flip: bool,
    padding_mode: i64,
}

impl Augmentation {
    pub fn new(config: &AugmentationConfig) -> Result<Self> {
        let AugmentationConfig {
            rescale,
            rotation_range,
            width_shift_range,
            height_shift_range,
            shear_range,
            zoom_range,
            horizontal_flip,
            fill_mode,
        } = *config;

        ensure!(rescale > 0.0, "rescale must be positive");
        ensure!(rotation_range >= 0.0, "rotation_range must be non-negative");
        ensure!(
            width_shift_range >= 0.0 && height_shift_range >= 0.0,
            "shift ranges must be non-negative"
        );
        ensure!(shear_range >= 0.0, "shear_range must be non-negative");
        ensure!(
            (0.0..1.0).contains(&zoom_range.raw()),
            "zoom_range must be in range of [0, 1)"
        );

        Ok(Self {
            rescale: rescale.raw(),
            rotation: rotation_range.raw().to_radians(),
            width_shift: width_shift_range.raw(),
            height_shift: height_shift_range.raw(),
            shear: shear_range.raw().to_radians(),
            zoom: zoom_range.raw(),
            horizontal_flip,
            padding_mode: fill_mode.padding_mode(),
        })
    }

    /// Returns true if only rescaling is applied.
    pub fn is_rescale_only(&self) -> bool {
        self.rotation == 0.0
            && self.width_shift == 0.0
            && self.height_shift == 0.0
            && self.shear == 0.0
            && self.zoom == 0.0
            && !self.horizontal_flip
    }

    /// Transforms a `[channels, height, width]` image with raw `0..=255` values.
    pub fn forward<R>(&self, image: &Tensor, rng: &mut R) -> Result<Tensor>
    where
        R: Rng,
    {
        let (channels, height, width) = image.size3()?;
        let image = image * self.rescale;

        if self.is_rescale_only() {
            return Ok(image);
        }

        let transform = self.sample_transform(rng);
        let new_image = tch::no_grad(|| {
            let affine_grid = Tensor::affine_grid_generator(
                &transform
                    .to_device(image.device())
                    .i((0..2, ..))
                    .view([1, 2, 3]), // remove the last row
                &[1, channels, height, width],
                false,
            );
            image
                .view([1, channels, height, width])
                .grid_sampler(&affine_grid, 0, self.padding_mode, false)
                .view([channels, height, width])
        });

        Ok(new_image)
    }

    /// Samples a 3x3 matrix mapping output to input coordinates in the
    /// normalized `[-1, 1]` `(x, y)` space.
    fn sample_transform<R>(&self, rng: &mut R) -> Tensor
    where
        R: Rng,
    {
        let transform = Tensor::eye(3, (Kind::Float, Device::Cpu));

        let transform = if self.horizontal_flip && rng.gen::<bool>() {
            let flip = matrix([
                [-1.0, 0.0, 0.0], // row 1
                [0.0, 1.0, 0.0],  // row 2
                [0.0, 0.0, 1.0],  // row 3
            ]);
            flip.matmul(&transform)
        } else {
            transform
        };

        let transform = if self.zoom > 0.0 {
            let zx = rng.gen_range((1.0 - self.zoom)..=(1.0 + self.zoom)) as f32;
            let zy = rng.gen_range((1.0 - self.zoom)..=(1.0 + self.zoom)) as f32;
            let scaling = matrix([
                [zx, 0.0, 0.0],  // row 1
                [0.0, zy, 0.0],  // row 2
                [0.0, 0.0, 1.0], // row 3
            ]);
            scaling.matmul(&transform)
        } else {
            transform
        };

        let transform = if self.shear > 0.0 {
            let shear = rng.gen_range(-self.shear..=self.shear);
            let (sin, cos) = (shear.sin() as f32, shear.cos() as f32);
            let shearing = matrix([
                [1.0, -sin, 0.0], // row 1
                [0.0, cos, 0.0],  // row 2
                [0.0, 0.0, 1.0],  // row 3
            ]);
            shearing.matmul(&transform)
        } else {
            transform
        };

        let transform = if self.rotation > 0.0 {
            let angle = rng.gen_range(-self.rotation..=self.rotation);
            let (sin, cos) = (angle.sin() as f32, angle.cos() as f32);
            let rotation = matrix([
                [cos, -sin, 0.0], // row 1
                [sin, cos, 0.0],  // row 2
                [0.0, 0.0, 1.0],  // row 3
            ]);
            rotation.matmul(&transform)
        } else {
            transform
        };

        if self.width_shift > 0.0 || self.height_shift > 0.0 {
            // normalized coordinates span a length of 2
            let tx = (rng.gen_range(-self.width_shift..=self.width_shift) * 2.0) as f32;
            let ty = (rng.gen_range(-self.height_shift..=self.height_shift) * 2.0) as f32;
            let translation = matrix([
                [1.0, 0.0, tx],  // row 1
                [0.0, 1.0, ty],  // row 2
                [0.0, 0.0, 1.0], // row 3
            ]);
            translation.matmul(&transform)
        } else {
            transform
        }
    }
}

fn matrix(rows: [[f32; 3]; 3]) -> Tensor {
    Tensor::of_slice(&rows.concat()).view([3, 3])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn flip_only() -> AugmentationConfig {
        AugmentationConfig {
            horizontal_flip: true,
            ..AugmentationConfig::testing()
        }
    }

    #[test]
    fn testing_preset_only_rescales() -> Result<()> {
        let augmentation = Augmentation::new(&AugmentationConfig::testing())?;
        let image = Tensor::rand(&[3, 8, 8], (Kind::Float, Device::Cpu)) * 255.0;
        let mut rng = StdRng::seed_from_u64(0);

        let output = augmentation.forward(&image, &mut rng)?;
        let expect = &image / 255.0;
        assert_abs_diff_eq!(
            f64::from((output - expect).abs().max()),
            0.0,
            epsilon = 1e-6
        );
        Ok(())
    }

    #[test]
    fn flips_preserve_pixel_sums() -> Result<()> {
        let augmentation = Augmentation::new(&flip_only())?;
        let image = Tensor::rand(&[3, 8, 8], (Kind::Float, Device::Cpu)) * 255.0;
        let expect = f64::from((&image / 255.0).sum(Kind::Double));
        let mut rng = StdRng::seed_from_u64(0);

        for _ in 0..8 {
            let output = augmentation.forward(&image, &mut rng)?;
            assert_eq!(output.size(), vec![3, 8, 8]);
            let sum = f64::from(output.sum(Kind::Double));
            assert_abs_diff_eq!(sum, expect, epsilon = 1e-2);
        }
        Ok(())
    }

    #[test]
    fn training_preset_keeps_shape_and_range() -> Result<()> {
        let augmentation = Augmentation::new(&AugmentationConfig::training())?;
        let image = Tensor::rand(&[3, 16, 16], (Kind::Float, Device::Cpu)) * 255.0;
        let mut rng = StdRng::seed_from_u64(42);

        let output = augmentation.forward(&image, &mut rng)?;
        assert_eq!(output.size(), vec![3, 16, 16]);
        assert!(f64::from(output.min()) >= -1e-6);
        assert!(f64::from(output.max()) <= 1.0 + 1e-6);
        Ok(())
    }

    #[test]
    fn invalid_zoom_is_rejected() {
        let config = AugmentationConfig {
            zoom_range: r64(1.5),
            ..AugmentationConfig::testing()
        };
        assert!(Augmentation::new(&config).is_err());
    }
}
