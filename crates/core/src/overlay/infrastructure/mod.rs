pub mod watermark_overlay;
