use image::RgbImage;

/// Single-channel `f32` image, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct LumaBuffer {
    pub width: usize,
    pub height: usize,
    pub stride: usize,
    pub data: Vec<f32>,
}

const LUMA_R: f32 = 0.299;
const LUMA_G: f32 = 0.587;
const LUMA_B: f32 = 0.114;

impl LumaBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            stride: width,
            data: vec![0.0; width * height],
        }
    }

    pub fn filled(width: usize, height: usize, value: f32) -> Self {
        Self {
            width,
            height,
            stride: width,
            data: vec![value; width * height],
        }
    }

    /// Grayscale conversion with Rec. 601 luma weights.
    pub fn from_rgb(rgb: &RgbImage) -> Self {
        let (w, h) = (rgb.width() as usize, rgb.height() as usize);
        let mut out = Self::new(w, h);
        for (x, y, px) in rgb.enumerate_pixels() {
            let [r, g, b] = px.0;
            let luma = LUMA_R * r as f32 + LUMA_G * g as f32 + LUMA_B * b as f32;
            set_pixel(&mut out, x as usize, y as usize, luma);
        }
        out
    }

    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub fn row(&self, y: usize) -> &[f32] {
        let start = y * self.stride;
        &self.data[start..start + self.width]
    }

    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [f32] {
        let start = y * self.stride;
        &mut self.data[start..start + self.width]
    }

    /// Flat index of `(x, y)`, for side tables laid out like this buffer.
    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.stride + x
    }

    pub fn max_value(&self) -> f32 {
        (0..self.height)
            .flat_map(|y| self.row(y).iter().copied())
            .fold(0.0f32, f32::max)
    }
}

#[inline]
pub fn get_pixel(buf: &LumaBuffer, x: usize, y: usize) -> f32 {
    buf.data[y * buf.stride + x]
}

#[inline]
pub fn set_pixel(buf: &mut LumaBuffer, x: usize, y: usize, value: f32) {
    buf.data[y * buf.stride + x] = value;
}
