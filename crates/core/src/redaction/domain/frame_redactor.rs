use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Domain interface for irreversibly redacting regions of a frame.
///
/// Implementations modify the frame in place (`&mut Frame`); the redacted
/// pixels must not be recoverable from the output.
pub trait FrameRedactor: Send {
    fn redact(
        &self,
        frame: &mut Frame,
        regions: &[Region],
    ) -> Result<(), Box<dyn std::error::Error>>;
}
