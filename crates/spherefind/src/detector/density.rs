//! Depth-band occupancy density.
//!
//! Pixels of the intensity surface that fall inside a thin depth slab are
//! binarized and summed over a square window. Compact blobs that sit entirely
//! inside the slab produce high scores, which is what a rounded object seen
//! from one side looks like.

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::integral_image::{integral_image, sum_image_pixels};

/// Per-pixel occupancy counts for one depth band.
pub type DensityMap = ImageBuffer<Luma<u32>, Vec<u32>>;

/// Mirror an out-of-range index back into `0..n` without repeating the edge
/// sample (`gfedcb|abcdefgh|gfedcba`).
#[inline]
fn reflect_101(i: i64, n: i64) -> u32 {
    if n == 1 {
        return 0;
    }
    let period = 2 * (n - 1);
    let mut i = i.rem_euclid(period);
    if i >= n {
        i = period - i;
    }
    i as u32
}

/// Binary mask of pixels whose intensity lies in `[level - half_width, level + half_width]`.
///
/// Set pixels are `1`; zero intensity (no return) never counts.
pub fn band_mask(intensity: &GrayImage, level: u8, half_width: u8) -> GrayImage {
    let lo = level.saturating_sub(half_width);
    let hi = level.saturating_add(half_width);
    let mut mask = intensity.clone();
    for p in mask.pixels_mut() {
        p[0] = u8::from(p[0] != 0 && (lo..=hi).contains(&p[0]));
    }
    mask
}

/// Sum of a binary mask over a `kernel_size` square window.
///
/// The kernel is anchored at `kernel_size / 2`, so for an even size the
/// window covers offsets `-k/2 ..= k/2 - 1`. Borders are reflected
/// (reflect-101): the mask is padded by mirroring, then every window is read
/// off one integral image of the padded mask.
pub fn box_sum(mask: &GrayImage, kernel_size: u32) -> DensityMap {
    let (width, height) = mask.dimensions();
    if width == 0 || height == 0 {
        return DensityMap::new(width, height);
    }
    let k = kernel_size.max(1);
    let anchor = (k / 2) as i64;
    let (w, h) = (width as i64, height as i64);

    let padded = GrayImage::from_fn(width + k - 1, height + k - 1, |px, py| {
        let sx = reflect_101(px as i64 - anchor, w);
        let sy = reflect_101(py as i64 - anchor, h);
        *mask.get_pixel(sx, sy)
    });
    let integral = integral_image::<_, u32>(&padded);

    DensityMap::from_fn(width, height, |x, y| {
        Luma([sum_image_pixels(&integral, x, y, x + k - 1, y + k - 1)[0]])
    })
}

/// Build the density map for one depth band.
pub fn band_density(
    intensity: &GrayImage,
    level: u8,
    half_width: u8,
    kernel_size: u32,
) -> DensityMap {
    box_sum(&band_mask(intensity, level, half_width), kernel_size)
}

/// First maximal cell in row-major order as `(x, y, score)`.
///
/// An all-zero map yields `(0, 0, 0)`; callers must tolerate such
/// zero-score candidates.
pub fn density_peak(map: &DensityMap) -> Option<(u32, u32, u32)> {
    let (w, _) = map.dimensions();
    if w == 0 {
        return None;
    }
    let mut best: Option<(usize, u32)> = None;
    for (i, &v) in map.as_raw().iter().enumerate() {
        match best {
            Some((_, b)) if b >= v => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, v)| ((i % w as usize) as u32, (i / w as usize) as u32, v))
}
