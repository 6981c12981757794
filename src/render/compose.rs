//! Vertical sprite compositing.
//!
//! Sources are stacked top to bottom, left aligned, with `padding` fully
//! transparent rows between consecutive images. There is no padding after
//! the last image.

use image::{imageops, RgbaImage};

/// Stack `images` into a single sheet.
///
/// The sheet is as wide as the widest image. An empty slice produces a
/// 0x0 image.
pub fn compose(images: &[RgbaImage], padding: u32) -> RgbaImage {
    let width = images.iter().map(|i| i.width()).max().unwrap_or(0);
    let height = sheet_height(images.iter().map(|i| i.height()), padding);

    let mut sheet = RgbaImage::new(width, height);
    let mut cursor_y: u32 = 0;

    for image in images {
        imageops::replace(&mut sheet, image, 0, i64::from(cursor_y));
        cursor_y += image.height() + padding;
    }

    sheet
}

/// Total height of a sheet holding images of the given heights.
pub fn sheet_height(heights: impl IntoIterator<Item = u32>, padding: u32) -> u32 {
    let mut count: u32 = 0;
    let mut total: u32 = 0;
    for height in heights {
        total += height;
        count += 1;
    }
    total + padding * count.saturating_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    #[test]
    fn test_compose_empty() {
        let sheet = compose(&[], 10);
        assert_eq!(sheet.dimensions(), (0, 0));
    }

    #[test]
    fn test_compose_single() {
        let sheet = compose(&[RgbaImage::from_pixel(4, 3, RED)], 20);
        assert_eq!(sheet.dimensions(), (4, 3));
    }

    #[test]
    fn test_compose_no_trailing_padding() {
        let images = vec![
            RgbaImage::from_pixel(2, 2, RED),
            RgbaImage::from_pixel(2, 3, BLUE),
        ];
        let sheet = compose(&images, 5);

        assert_eq!(sheet.dimensions(), (2, 10));
        assert_eq!(*sheet.get_pixel(0, 1), RED);
        assert_eq!(sheet.get_pixel(0, 2).0[3], 0);
        assert_eq!(sheet.get_pixel(1, 6).0[3], 0);
        assert_eq!(*sheet.get_pixel(0, 7), BLUE);
        assert_eq!(*sheet.get_pixel(1, 9), BLUE);
    }

    #[test]
    fn test_compose_left_aligned() {
        let images = vec![
            RgbaImage::from_pixel(1, 1, RED),
            RgbaImage::from_pixel(3, 1, BLUE),
        ];
        let sheet = compose(&images, 0);

        assert_eq!(sheet.dimensions(), (3, 2));
        assert_eq!(*sheet.get_pixel(0, 0), RED);
        // Narrower images leave the remainder of their rows transparent.
        assert_eq!(sheet.get_pixel(2, 0).0[3], 0);
        assert_eq!(*sheet.get_pixel(2, 1), BLUE);
    }

    #[test]
    fn test_sheet_height() {
        assert_eq!(sheet_height([], 20), 0);
        assert_eq!(sheet_height([20], 20), 20);
        assert_eq!(sheet_height([20, 20], 20), 60);
        assert_eq!(sheet_height([1, 2, 3], 0), 6);
    }

    #[test]
    fn test_sheet_height_matches_composed_sheet() {
        let images = vec![
            RgbaImage::from_pixel(2, 7, RED),
            RgbaImage::from_pixel(2, 1, BLUE),
            RgbaImage::from_pixel(2, 4, RED),
        ];

        let expected = sheet_height(images.iter().map(|i| i.height()), 3);

        assert_eq!(expected, 18);
        assert_eq!(compose(&images, 3).height(), expected);
    }
}
