use crate::models::BoundingBox;

use super::hysteresis::{offset, NEIGHBOURS_8};

/// One 8-connected region of edge pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Component {
    pub pixel_count: usize,
    pub min_x: usize,
    pub min_y: usize,
    pub max_x: usize,
    pub max_y: usize,
}

impl Component {
    pub fn width(&self) -> usize {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> usize {
        self.max_y - self.min_y + 1
    }

    pub fn bbox_area(&self) -> usize {
        self.width() * self.height()
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width() as f64 / self.height() as f64
    }

    /// Share of the bounding box covered by edge pixels.
    pub fn fill_ratio(&self) -> f64 {
        self.pixel_count as f64 / self.bbox_area() as f64
    }

    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::new(
            self.min_x as f64,
            self.min_y as f64,
            self.width() as f64,
            self.height() as f64,
        )
    }
}

/// Flood-fill the mask into connected components.
pub fn connected_components(mask: &[bool], w: usize, h: usize) -> Vec<Component> {
    let mut visited = vec![false; mask.len()];
    let mut components = Vec::new();
    let mut stack = Vec::new();

    for start in 0..mask.len().min(w * h) {
        if !mask[start] || visited[start] {
            continue;
        }
        visited[start] = true;
        stack.push((start % w, start / w));

        let mut comp = Component {
            pixel_count: 0,
            min_x: usize::MAX,
            min_y: usize::MAX,
            max_x: 0,
            max_y: 0,
        };

        while let Some((x, y)) = stack.pop() {
            comp.pixel_count += 1;
            comp.min_x = comp.min_x.min(x);
            comp.min_y = comp.min_y.min(y);
            comp.max_x = comp.max_x.max(x);
            comp.max_y = comp.max_y.max(y);

            for step in NEIGHBOURS_8 {
                let Some((nx, ny)) = offset(x, y, step, w, h) else {
                    continue;
                };
                let idx = ny * w + nx;
                if mask[idx] && !visited[idx] {
                    visited[idx] = true;
                    stack.push((nx, ny));
                }
            }
        }

        components.push(comp);
    }

    components
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagonal_pixels_join_one_component() {
        #[rustfmt::skip]
        let mask = [
            true,  false, false, false,
            false, true,  false, false,
            false, false, false, true,
        ];
        let comps = connected_components(&mask, 4, 3);
        assert_eq!(comps.len(), 2);
        assert_eq!(comps[0].pixel_count, 2);
        assert_eq!((comps[0].width(), comps[0].height()), (2, 2));
        assert_eq!(comps[1].bbox(), BoundingBox::new(3.0, 2.0, 1.0, 1.0));
    }
}
