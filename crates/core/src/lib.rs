//! Face anonymization pipeline: detection tracking, pixelation, overlay
//! stamping, and video transcoding behind narrow port traits.

pub mod detection;
pub mod overlay;
pub mod pipeline;
pub mod redaction;
pub mod shared;
pub mod video;
