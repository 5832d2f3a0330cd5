use std::path::{Path, PathBuf};

use ab_glyph::{FontVec, PxScale};
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgb, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use thiserror::Error;

use crate::overlay::domain::overlay_renderer::OverlayRenderer;
use crate::shared::constants::{LOGO_WIDTH_RATIO, OVERLAY_MARGIN};
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum OverlayError {
    #[error("failed to load logo {path}: {source}")]
    LogoLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to read font {path}: {source}")]
    FontRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid font file {path}")]
    FontParse { path: PathBuf },
    #[error("frame too small for the watermark")]
    FrameTooSmall,
}

/// Identification text burned in beneath the watermark.
#[derive(Clone, Debug)]
pub struct Caption {
    pub font_path: PathBuf,
    pub name: String,
    pub document_id: String,
}

/// Burns a logo and optional identification text into the top-right corner.
///
/// The logo is loaded and scaled once per run (15% of frame width), and
/// caption lines are word-wrapped once at construction; `render` is a pure
/// composite. The logo's alpha channel is honored when present.
#[derive(Debug)]
pub struct WatermarkOverlay {
    logo: RgbaImage,
    logo_x: u32,
    logo_y: u32,
    caption: Option<PreparedCaption>,
}

#[derive(Debug)]
struct PreparedCaption {
    font: FontVec,
    scale: PxScale,
    lines: Vec<String>,
    x: i32,
    y: i32,
    line_spacing: i32,
}

impl WatermarkOverlay {
    pub fn new(
        logo_path: &Path,
        caption: Option<Caption>,
        frame_width: u32,
        frame_height: u32,
    ) -> Result<Self, OverlayError> {
        let logo = image::open(logo_path)
            .map_err(|source| OverlayError::LogoLoad {
                path: logo_path.to_path_buf(),
                source,
            })?
            .to_rgba8();

        let scaled_w = ((frame_width as f64 * LOGO_WIDTH_RATIO) as u32).max(1);
        let scaled_h =
            ((scaled_w as f64 / logo.width() as f64) * logo.height() as f64).max(1.0) as u32;
        let logo = imageops::resize(&logo, scaled_w, scaled_h, FilterType::Triangle);

        if frame_width < scaled_w + 2 * OVERLAY_MARGIN || frame_height < scaled_h + OVERLAY_MARGIN
        {
            return Err(OverlayError::FrameTooSmall);
        }

        let logo_x = frame_width - scaled_w - OVERLAY_MARGIN;
        let logo_y = OVERLAY_MARGIN;

        let caption = caption
            .map(|c| prepare_caption(c, frame_width, logo_x, logo_y + scaled_h))
            .transpose()?;

        Ok(Self {
            logo,
            logo_x,
            logo_y,
            caption,
        })
    }
}

fn prepare_caption(
    caption: Caption,
    frame_width: u32,
    anchor_x: u32,
    anchor_bottom: u32,
) -> Result<PreparedCaption, OverlayError> {
    let bytes = std::fs::read(&caption.font_path).map_err(|source| OverlayError::FontRead {
        path: caption.font_path.clone(),
        source,
    })?;
    let font = FontVec::try_from_vec(bytes).map_err(|_| OverlayError::FontParse {
        path: caption.font_path.clone(),
    })?;

    // Text size tracks the frame resolution so the caption stays legible
    // at any output size.
    let scale = PxScale::from((frame_width as f32 * 0.022).max(12.0));
    let line_spacing = (scale.y * 1.5) as i32;
    let max_width = frame_width.saturating_sub(anchor_x + OVERLAY_MARGIN);

    let mut lines = wrap_text(&format!("Issued to: {}", caption.name), max_width, |s| {
        text_size(scale, &font, s).0
    });
    lines.push(format!("Document: {}", caption.document_id));

    Ok(PreparedCaption {
        font,
        scale,
        lines,
        x: anchor_x as i32,
        y: (anchor_bottom + OVERLAY_MARGIN) as i32,
        line_spacing,
    })
}

/// Greedy word wrap: fills each line with as many words as `measure` says
/// fit in `max_width`. A single word wider than the limit gets its own
/// overflowing line rather than being split.
fn wrap_text(text: &str, max_width: u32, measure: impl Fn(&str) -> u32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };

        if current.is_empty() || measure(&candidate) <= max_width {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

impl OverlayRenderer for WatermarkOverlay {
    fn render(&self, frame: &mut Frame) -> Result<(), Box<dyn std::error::Error>> {
        let fw = frame.width() as usize;
        let fh = frame.height() as usize;

        blend_logo(
            frame.data_mut(),
            fw,
            fh,
            &self.logo,
            self.logo_x as usize,
            self.logo_y as usize,
        );

        if let Some(caption) = &self.caption {
            let width = frame.width();
            let height = frame.height();
            let mut canvas: ImageBuffer<Rgb<u8>, &mut [u8]> =
                ImageBuffer::from_raw(width, height, frame.data_mut())
                    .ok_or("frame buffer size mismatch")?;

            for (i, line) in caption.lines.iter().enumerate() {
                draw_text_mut(
                    &mut canvas,
                    Rgb([255, 255, 255]),
                    caption.x,
                    caption.y + i as i32 * caption.line_spacing,
                    caption.scale,
                    &caption.font,
                    line,
                );
            }
        }

        Ok(())
    }
}

/// Alpha-composites `logo` over the RGB frame buffer at `(ox, oy)`,
/// clipped to the frame bounds.
fn blend_logo(data: &mut [u8], fw: usize, fh: usize, logo: &RgbaImage, ox: usize, oy: usize) {
    let lw = (logo.width() as usize).min(fw.saturating_sub(ox));
    let lh = (logo.height() as usize).min(fh.saturating_sub(oy));

    for row in 0..lh {
        for col in 0..lw {
            let px = logo.get_pixel(col as u32, row as u32);
            let alpha = px[3] as f64 / 255.0;
            let idx = ((oy + row) * fw + ox + col) * 3;
            for c in 0..3 {
                let over = px[c] as f64;
                let under = data[idx + c] as f64;
                data[idx + c] = (alpha * over + (1.0 - alpha) * under).round() as u8;
            }
        }
    }
}
