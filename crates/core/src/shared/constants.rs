/// Symmetric box growth applied to every raw detection (0.40 = 40%).
pub const DEFAULT_EXPAND_MARGIN: f64 = 0.40;

/// Frames a track survives without a fresh detection match.
pub const DEFAULT_FACE_TTL: u32 = 10;

/// Minimum IoU for a detection to refresh an existing track.
pub const DEFAULT_IOU_THRESHOLD: f64 = 0.3;

/// Side length of the mosaic grid a redacted region is resampled through.
pub const DEFAULT_PIXEL_SIZE: u32 = 22;

/// Watermark width as a fraction of the frame width.
pub const LOGO_WIDTH_RATIO: f64 = 0.15;

/// Distance in pixels between the watermark block and the frame edges.
pub const OVERLAY_MARGIN: u32 = 20;
