#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::Utc;
use dimscan::capability::{DeviceFacts, OsFamily, OsVersion};
use dimscan::capture::{CameraSource, CaptureNotice, Effect};
use dimscan::detection::{ModelLoader, ObjectModel, RawDetection};
use dimscan::models::CaptureFrame;
use dimscan::utils::BoxFuture;
use image::{DynamicImage, Rgb, RgbImage};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tokio::sync::broadcast;

pub const GIB: u64 = 1024 * 1024 * 1024;

/// Square frame with a block of `stripe`-px vertical white/black stripes on
/// a `background` gray.
pub fn striped_block(size: u32, x0: u32, y0: u32, side: u32, stripe: u32, background: u8) -> RgbImage {
    RgbImage::from_fn(size, size, |x, y| {
        let inside = x >= x0 && x < x0 + side && y >= y0 && y < y0 + side;
        if !inside {
            Rgb([background; 3])
        } else if ((x - x0) / stripe) % 2 == 0 {
            Rgb([255, 255, 255])
        } else {
            Rgb([0, 0, 0])
        }
    })
}

/// Add seeded uniform noise of `amplitude` to every channel.
pub fn with_noise(mut img: RgbImage, amplitude: i16, seed: u64) -> RgbImage {
    let mut rng = StdRng::seed_from_u64(seed);
    for px in img.pixels_mut() {
        for c in px.0.iter_mut() {
            let v = *c as i16 + rng.gen_range(-amplitude..=amplitude);
            *c = v.clamp(0, 255) as u8;
        }
    }
    img
}

pub fn frame(img: RgbImage) -> CaptureFrame {
    CaptureFrame::new(DynamicImage::ImageRgb8(img), Utc::now())
}

/// A 200x200 frame whose block fills roughly half of it.
pub fn ready_frame() -> CaptureFrame {
    frame(striped_block(200, 30, 30, 140, 2, 0))
}

pub fn blank_frame() -> CaptureFrame {
    frame(RgbImage::from_pixel(200, 200, Rgb([90, 90, 90])))
}

pub struct StubCamera {
    frame: CaptureFrame,
    pub snapshots: AtomicUsize,
    pub fail: AtomicBool,
}

impl StubCamera {
    pub fn new(frame: CaptureFrame) -> Arc<Self> {
        Arc::new(Self {
            frame,
            snapshots: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        })
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.load(Ordering::SeqCst)
    }
}

impl CameraSource for StubCamera {
    fn snapshot(&self) -> BoxFuture<'_, Result<CaptureFrame>> {
        Box::pin(async move {
            self.snapshots.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                bail!("camera busy");
            }
            Ok(self.frame.clone())
        })
    }
}

pub struct CenterBoxModel;

impl ObjectModel for CenterBoxModel {
    fn input_size(&self) -> (u32, u32) {
        (32, 32)
    }

    fn infer(&self, _input: &RgbImage) -> Result<Vec<RawDetection>> {
        Ok(vec![RawDetection {
            class_id: 3,
            score: 0.875,
            bbox: [0.25, 0.25, 0.5, 0.5],
        }])
    }
}

#[derive(Default)]
pub struct StubLoader {
    pub loads: AtomicUsize,
}

impl ModelLoader for StubLoader {
    fn load(&self) -> Result<Box<dyn ObjectModel>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CenterBoxModel))
    }
}

pub fn capable_device() -> DeviceFacts {
    DeviceFacts {
        is_physical_device: true,
        year_class: Some(2022),
        total_memory_bytes: 6 * GIB,
        os: OsVersion {
            family: OsFamily::Android,
            major: 13,
        },
    }
}

pub fn emulator() -> DeviceFacts {
    DeviceFacts {
        is_physical_device: false,
        ..capable_device()
    }
}

/// Receive notices until one carries an effect matching `pred`.
pub async fn wait_for_effect(
    notices: &mut broadcast::Receiver<CaptureNotice>,
    pred: impl Fn(&Effect) -> bool,
) -> Effect {
    loop {
        match notices.recv().await {
            Ok(CaptureNotice::Transition { effect, .. }) if pred(&effect) => return effect,
            Ok(_) => continue,
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => panic!("notice channel closed"),
        }
    }
}
