use std::io::Cursor;

use anyhow::{Context, Result};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use crate::models::{BoundingBox, CaptureFrame};

const OUTLINE: Rgb<u8> = Rgb([0, 200, 83]);

/// Snapshot with the measured box outlined, JPEG encoded. CPU bound; run it
/// on a blocking thread.
pub fn compose_overlay(frame: &CaptureFrame, bbox: &BoundingBox) -> Result<Vec<u8>> {
    let mut canvas = frame.image.to_rgb8();
    let thickness = (canvas.width().min(canvas.height()) / 200).max(2);
    draw_outline(&mut canvas, &bbox.clamp_to(frame.dims()), thickness);

    let mut bytes = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(canvas)
        .write_to(&mut bytes, ImageFormat::Jpeg)
        .context("failed to encode overlay photo")?;
    Ok(bytes.into_inner())
}

fn draw_outline(canvas: &mut RgbImage, bbox: &BoundingBox, thickness: u32) {
    let (w, h) = canvas.dimensions();
    if w == 0 || h == 0 {
        return;
    }
    let x0 = (bbox.x.floor() as u32).min(w - 1);
    let y0 = (bbox.y.floor() as u32).min(h - 1);
    let x1 = (bbox.right().ceil() as u32).clamp(x0 + 1, w);
    let y1 = (bbox.bottom().ceil() as u32).clamp(y0 + 1, h);

    for y in y0..y1 {
        for x in x0..x1 {
            let near_edge = x < x0 + thickness
                || x + thickness >= x1
                || y < y0 + thickness
                || y + thickness >= y1;
            if near_edge {
                canvas.put_pixel(x, y, OUTLINE);
            }
        }
    }
}
