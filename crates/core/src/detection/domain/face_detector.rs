use crate::shared::frame::Frame;

/// Raw landmark points for one detected face, in pixel coordinates.
pub type PointCloud = Vec<(i32, i32)>;

/// Domain interface for the external face landmark detector.
///
/// Returns zero or more point clouds per frame; what model produced them
/// is opaque to the pipeline. Implementations may be stateful, hence
/// `&mut self`.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<PointCloud>, Box<dyn std::error::Error>>;
}
