use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::redaction::domain::frame_redactor::FrameRedactor;
use crate::shared::constants::DEFAULT_PIXEL_SIZE;
use crate::shared::frame::{Frame, FRAME_CHANNELS};
use crate::shared::region::Region;

/// Mosaic redactor: each region is downsampled to a small fixed grid and
/// scaled back up with nearest-neighbor interpolation.
///
/// The round trip through `pixel_size x pixel_size` destroys all detail
/// finer than one mosaic cell; no smoothing is applied on the way back up,
/// so the loss is unrecoverable.
pub struct PixelateRedactor {
    pixel_size: u32,
}

impl PixelateRedactor {
    pub fn new(pixel_size: u32) -> Self {
        Self {
            pixel_size: pixel_size.max(1),
        }
    }
}

impl Default for PixelateRedactor {
    fn default() -> Self {
        Self::new(DEFAULT_PIXEL_SIZE)
    }
}

impl FrameRedactor for PixelateRedactor {
    fn redact(
        &self,
        frame: &mut Frame,
        regions: &[Region],
    ) -> Result<(), Box<dyn std::error::Error>> {
        let fw = frame.width() as usize;
        let fh = frame.height() as usize;
        let data = frame.data_mut();

        for r in regions {
            let rx = r.x.max(0) as usize;
            let ry = r.y.max(0) as usize;
            let rw = (r.width.max(0) as usize).min(fw.saturating_sub(rx));
            let rh = (r.height.max(0) as usize).min(fh.saturating_sub(ry));

            // Degenerate crop (e.g. a detection fully outside the frame):
            // skipped, never attempted.
            if rw == 0 || rh == 0 {
                continue;
            }

            let mut roi = vec![0u8; rw * rh * FRAME_CHANNELS];
            for row in 0..rh {
                let src = ((ry + row) * fw + rx) * FRAME_CHANNELS;
                let dst = row * rw * FRAME_CHANNELS;
                roi[dst..dst + rw * FRAME_CHANNELS]
                    .copy_from_slice(&data[src..src + rw * FRAME_CHANNELS]);
            }

            let roi_img = RgbImage::from_raw(rw as u32, rh as u32, roi)
                .ok_or("ROI buffer size mismatch")?;
            let small = imageops::resize(
                &roi_img,
                self.pixel_size,
                self.pixel_size,
                FilterType::Triangle,
            );
            let mosaic = imageops::resize(&small, rw as u32, rh as u32, FilterType::Nearest);

            let mosaic_data = mosaic.into_raw();
            for row in 0..rh {
                let dst = ((ry + row) * fw + rx) * FRAME_CHANNELS;
                let src = row * rw * FRAME_CHANNELS;
                data[dst..dst + rw * FRAME_CHANNELS]
                    .copy_from_slice(&mosaic_data[src..src + rw * FRAME_CHANNELS]);
            }
        }

        Ok(())
    }
}
