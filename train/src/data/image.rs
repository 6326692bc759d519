//! Image decoding into tensors.

use crate::common::*;

/// Loads an image, resizes it to `size x size` with nearest-neighbour
/// sampling and returns a `[channels, size, size]` float tensor in `0..=255`.
///
/// One channel loads the image in grayscale, three channels in RGB.
pub fn load_image<P>(path: P, size: usize, channels: usize) -> Result<Tensor>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    ensure!(size > 0, "image size must be positive");

    let image = image::open(path)
        .with_context(|| format!("failed to decode image file '{}'", path.display()))?;
    let image = image.resize_exact(size as u32, size as u32, FilterType::Nearest);
    image_to_tensor(&image, channels)
}

/// Converts a decoded image to a `[channels, h, w]` float tensor in `0..=255`.
pub fn image_to_tensor(image: &DynamicImage, channels: usize) -> Result<Tensor> {
    let (height, width) = (image.height() as i64, image.width() as i64);
    let pixels = match channels {
        1 => image.to_luma8().into_raw(),
        3 => image.to_rgb8().into_raw(),
        _ => bail!("unsupported number of channels {}, expect 1 or 3", channels),
    };

    let tensor = Tensor::of_slice(pixels.as_slice())
        .view([height, width, channels as i64])
        .permute(&[2, 0, 1])
        .to_kind(Kind::Float);
    Ok(tensor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn tensor_layout_is_channel_first() -> Result<()> {
        let mut image = RgbImage::new(4, 2);
        image.put_pixel(3, 1, Rgb([10, 20, 30]));
        let tensor = image_to_tensor(&DynamicImage::ImageRgb8(image), 3)?;

        assert_eq!(tensor.size(), vec![3, 2, 4]);
        assert_eq!(tensor.double_value(&[0, 1, 3]), 10.0);
        assert_eq!(tensor.double_value(&[1, 1, 3]), 20.0);
        assert_eq!(tensor.double_value(&[2, 1, 3]), 30.0);
        assert_eq!(tensor.double_value(&[2, 0, 0]), 0.0);
        Ok(())
    }

    #[test]
    fn grayscale_has_one_channel() -> Result<()> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 3, Rgb([255, 255, 255])));
        let tensor = image_to_tensor(&image, 1)?;
        assert_eq!(tensor.size(), vec![1, 3, 3]);
        assert_eq!(tensor.double_value(&[0, 2, 2]), 255.0);
        Ok(())
    }

    #[test]
    fn resize_to_square() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("wide.png");
        RgbImage::from_pixel(20, 10, Rgb([0, 128, 255])).save(&path)?;

        let tensor = load_image(&path, 8, 3)?;
        assert_eq!(tensor.size(), vec![3, 8, 8]);
        assert_eq!(tensor.double_value(&[1, 4, 4]), 128.0);
        Ok(())
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_image("/nonexistent/image.png", 8, 3).is_err());
    }
}
