use crate::shared::frame::Frame;

/// Domain interface for burning provenance marks into a frame.
///
/// Purely cosmetic: implementations must not touch redaction regions'
/// correctness, only composite on top of whatever is already in the frame.
pub trait OverlayRenderer: Send {
    fn render(&self, frame: &mut Frame) -> Result<(), Box<dyn std::error::Error>>;
}
