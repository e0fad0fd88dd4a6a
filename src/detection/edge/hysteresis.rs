use std::collections::VecDeque;

use crate::raster::{get_pixel, LumaBuffer};

pub(crate) const NEIGHBOURS_8: [(isize, isize); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

#[inline]
pub(crate) fn offset(
    x: usize,
    y: usize,
    (dx, dy): (isize, isize),
    w: usize,
    h: usize,
) -> Option<(usize, usize)> {
    let nx = x.checked_add_signed(dx)?;
    let ny = y.checked_add_signed(dy)?;
    (nx < w && ny < h).then_some((nx, ny))
}

/// Edge mask laid out like `mag`. A pixel is an edge when its magnitude is
/// above `high`, or above `low` and 8-connected to another edge pixel.
pub fn hysteresis(mag: &LumaBuffer, high: f32, low: f32) -> Vec<bool> {
    let (w, h) = (mag.width, mag.height);
    let mut edges = vec![false; w * h];
    let mut queue = VecDeque::new();

    for y in 0..h {
        for x in 0..w {
            if get_pixel(mag, x, y) > high {
                edges[y * w + x] = true;
                queue.push_back((x, y));
            }
        }
    }

    while let Some((x, y)) = queue.pop_front() {
        for step in NEIGHBOURS_8 {
            let Some((nx, ny)) = offset(x, y, step, w, h) else {
                continue;
            };
            let idx = ny * w + nx;
            if !edges[idx] && get_pixel(mag, nx, ny) > low {
                edges[idx] = true;
                queue.push_back((nx, ny));
            }
        }
    }

    edges
}
