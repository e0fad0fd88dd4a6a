//! 3×3 convolutions with border clamping.
use crate::raster::{get_pixel, set_pixel, LumaBuffer};

type Kernel3 = [[f32; 3]; 3];

const GAUSSIAN_KERNEL: Kernel3 = [
    [1.0 / 16.0, 2.0 / 16.0, 1.0 / 16.0],
    [2.0 / 16.0, 4.0 / 16.0, 2.0 / 16.0],
    [1.0 / 16.0, 2.0 / 16.0, 1.0 / 16.0],
];

const SOBEL_KERNEL_X: Kernel3 = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];
const SOBEL_KERNEL_Y: Kernel3 = [[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]];

#[inline]
fn neighbourhood(w: usize, h: usize, x: usize, y: usize) -> ([usize; 3], [usize; 3]) {
    (
        [x.saturating_sub(1), x, (x + 1).min(w - 1)],
        [y.saturating_sub(1), y, (y + 1).min(h - 1)],
    )
}

#[inline]
fn convolve_at(src: &LumaBuffer, kernel: &Kernel3, xs: &[usize; 3], ys: &[usize; 3]) -> f32 {
    let mut sum = 0.0;
    for (ky, &yy) in ys.iter().enumerate() {
        for (kx, &xx) in xs.iter().enumerate() {
            sum += get_pixel(src, xx, yy) * kernel[ky][kx];
        }
    }
    sum
}

pub fn gaussian_blur(src: &LumaBuffer) -> LumaBuffer {
    let (w, h) = (src.width, src.height);
    let mut out = LumaBuffer::new(w, h);
    if src.is_empty() {
        return out;
    }
    for y in 0..h {
        for x in 0..w {
            let (xs, ys) = neighbourhood(w, h, x, y);
            set_pixel(&mut out, x, y, convolve_at(src, &GAUSSIAN_KERNEL, &xs, &ys));
        }
    }
    out
}

/// Gradient magnitude `sqrt(gx² + gy²)` from the Sobel pair.
pub fn sobel_magnitude(src: &LumaBuffer) -> LumaBuffer {
    let (w, h) = (src.width, src.height);
    let mut out = LumaBuffer::new(w, h);
    if src.is_empty() {
        return out;
    }
    for y in 0..h {
        for x in 0..w {
            let (xs, ys) = neighbourhood(w, h, x, y);
            let gx = convolve_at(src, &SOBEL_KERNEL_X, &xs, &ys);
            let gy = convolve_at(src, &SOBEL_KERNEL_Y, &xs, &ys);
            set_pixel(&mut out, x, y, (gx * gx + gy * gy).sqrt());
        }
    }
    out
}
