//! Post-process saturation scaling in HSV space.

use image::{Rgb, RgbImage};

use crate::math::{hsv_to_rgb, rgb_to_hsv};

/// Scale the saturation of every pixel by `factor`.
///
/// Saturation is clamped to [0, 1] after scaling and channels are rounded back
/// to 8 bits, so a factor of 1.0 returns the input unchanged and 0.0 yields a
/// grey image whose channels equal each pixel's maximum channel (HSV value).
pub fn adjust_saturation(image: &RgbImage, factor: f32) -> RgbImage {
    let mut out = RgbImage::new(image.width(), image.height());
    for (src, dst) in image.pixels().zip(out.pixels_mut()) {
        *dst = adjust_pixel(*src, factor);
    }
    out
}

fn adjust_pixel(Rgb([r, g, b]): Rgb<u8>, factor: f32) -> Rgb<u8> {
    let [h, s, v] = rgb_to_hsv(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
    let s = (s * factor).clamp(0.0, 1.0);
    let [r, g, b] = hsv_to_rgb(h, s, v);

    let to_u8 = |c: f32| (c * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgb([to_u8(r), to_u8(g), to_u8(b)])
}
