//! Fit-within-box resizing

use image::DynamicImage;
use tracing::debug;

use crate::config::SizeTarget;

/// Resampling filter used for every variant
pub const FILTER: image::imageops::FilterType = image::imageops::FilterType::Lanczos3;

/// Dimensions of `width`x`height` scaled to fit inside a `size`x`size` box,
/// preserving aspect ratio.
///
/// Images that already fit are left at their own size. Returns `None` for a
/// zero-sized box or an empty source.
pub fn fit_dimensions(width: u32, height: u32, size: SizeTarget) -> Option<(u32, u32)> {
    let size = size.get();
    if size == 0 || width == 0 || height == 0 {
        return None;
    }

    if width <= size && height <= size {
        return Some((width, height));
    }

    let scale = |side: u32, longer: u32| -> u32 {
        let scaled = (f64::from(side) * f64::from(size) / f64::from(longer)).round() as u32;
        scaled.clamp(1, size)
    };

    if width >= height {
        Some((size, scale(height, width)))
    } else {
        Some((scale(width, height), size))
    }
}

/// Resize `image` to fit a `size`x`size` box. `None` when the box is empty.
pub fn resize_to_fit(image: &DynamicImage, size: SizeTarget) -> Option<DynamicImage> {
    let (target_width, target_height) = fit_dimensions(image.width(), image.height(), size)?;

    debug!(
        "Resizing {}x{} -> {}x{} using {:?}",
        image.width(),
        image.height(),
        target_width,
        target_height,
        FILTER
    );

    if target_width == image.width() && target_height == image.height() {
        return Some(image.clone());
    }

    Some(image.resize_exact(target_width, target_height, FILTER))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn create_test_image(width: u32, height: u32) -> DynamicImage {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            let intensity = ((x + y) % 255) as u8;
            Rgb([intensity, intensity, intensity])
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_fit_dimensions() {
        // Landscape and portrait into a square
        assert_eq!(fit_dimensions(1000, 800, SizeTarget::new(600)), Some((600, 480)));
        assert_eq!(fit_dimensions(800, 1000, SizeTarget::new(600)), Some((480, 600)));

        // Square source
        assert_eq!(fit_dimensions(300, 300, SizeTarget::new(50)), Some((50, 50)));

        // 100x200 into 50 and 100
        assert_eq!(fit_dimensions(100, 200, SizeTarget::new(50)), Some((25, 50)));
        assert_eq!(fit_dimensions(100, 200, SizeTarget::new(100)), Some((50, 100)));
    }

    #[test]
    fn test_fit_never_upscales() {
        assert_eq!(fit_dimensions(40, 30, SizeTarget::new(100)), Some((40, 30)));
        assert_eq!(fit_dimensions(100, 100, SizeTarget::new(100)), Some((100, 100)));
    }

    #[test]
    fn test_fit_keeps_thin_images_visible() {
        assert_eq!(fit_dimensions(1000, 2, SizeTarget::new(10)), Some((10, 1)));
        assert_eq!(fit_dimensions(3, 900, SizeTarget::new(1)), Some((1, 1)));
    }

    #[test]
    fn test_zero_box_rejected() {
        assert_eq!(fit_dimensions(100, 100, SizeTarget::new(0)), None);
        assert!(resize_to_fit(&create_test_image(10, 10), SizeTarget::new(0)).is_none());
    }

    #[test]
    fn test_resize_to_fit() {
        let image = create_test_image(300, 150);
        let resized = resize_to_fit(&image, SizeTarget::new(100)).unwrap();
        assert_eq!((resized.width(), resized.height()), (100, 50));

        let untouched = resize_to_fit(&image, SizeTarget::new(500)).unwrap();
        assert_eq!((untouched.width(), untouched.height()), (300, 150));
    }
}
