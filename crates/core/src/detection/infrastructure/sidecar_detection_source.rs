use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::detection::domain::face_detector::{FaceDetector, PointCloud};
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum SidecarError {
    #[error("failed to read detections file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse detections file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One frame's landmark output in the sidecar file.
#[derive(Deserialize)]
struct FrameEntry {
    frame: usize,
    faces: Vec<Vec<(i32, i32)>>,
}

/// Detector fed by a JSON sidecar file produced by an external landmark
/// model run offline.
///
/// The file is a JSON array of `{"frame": N, "faces": [[[x, y], ...], ...]}`
/// entries. Frames without an entry yield zero detections, which is the
/// normal no-faces case, never an error.
#[derive(Debug)]
pub struct SidecarDetectionSource {
    by_frame: HashMap<usize, Vec<PointCloud>>,
}

impl SidecarDetectionSource {
    pub fn load(path: &Path) -> Result<Self, SidecarError> {
        let text = fs::read_to_string(path).map_err(|source| SidecarError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let entries: Vec<FrameEntry> =
            serde_json::from_str(&text).map_err(|source| SidecarError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let mut by_frame: HashMap<usize, Vec<PointCloud>> = HashMap::new();
        for entry in entries {
            // Duplicate frame entries accumulate rather than overwrite.
            by_frame.entry(entry.frame).or_default().extend(entry.faces);
        }

        log::debug!(
            "Loaded detections for {} frames from {}",
            by_frame.len(),
            path.display()
        );

        Ok(Self { by_frame })
    }

    /// Number of frames with at least one detection entry.
    pub fn frame_count(&self) -> usize {
        self.by_frame.len()
    }
}

impl FaceDetector for SidecarDetectionSource {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<PointCloud>, Box<dyn std::error::Error>> {
        Ok(self
            .by_frame
            .get(&frame.index())
            .cloned()
            .unwrap_or_default())
    }
}
