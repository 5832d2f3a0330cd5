use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_tracker::{FaceTracker, TrackerConfig};
use crate::overlay::domain::overlay_renderer::OverlayRenderer;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::redaction::domain::frame_redactor::FrameRedactor;
use crate::shared::constants::DEFAULT_EXPAND_MARGIN;
use crate::shared::region::Region;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

/// Called after each frame with (frames_done, total_frames). Returning
/// `false` stops the pipeline after the current frame.
pub type ProgressCallback = Box<dyn Fn(usize, usize) -> bool + Send>;

#[derive(Clone, Copy, Debug)]
pub struct RedactVideoConfig {
    /// Fractional growth applied to each detected face box before tracking.
    pub expand_margin: f64,
    pub tracker: TrackerConfig,
}

impl Default for RedactVideoConfig {
    fn default() -> Self {
        Self {
            expand_margin: DEFAULT_EXPAND_MARGIN,
            tracker: TrackerConfig::default(),
        }
    }
}

/// Outcome of a pipeline run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RedactVideoReport {
    pub frames_processed: usize,
    pub total_frames: usize,
    pub cancelled: bool,
}

/// Reads a video, pixelates every tracked face in each frame, optionally
/// stamps an overlay, and writes the result.
///
/// Frames are processed strictly one at a time: a frame is fully redacted
/// and written before the next one is decoded. Cancellation lets the
/// in-flight frame finish, then stops acquiring new ones.
pub struct RedactVideoUseCase {
    reader: Box<dyn VideoReader>,
    writer: Box<dyn VideoWriter>,
    detector: Box<dyn FaceDetector>,
    redactor: Box<dyn FrameRedactor>,
    overlay: Option<Box<dyn OverlayRenderer>>,
    logger: Box<dyn PipelineLogger>,
    config: RedactVideoConfig,
    cancelled: Arc<AtomicBool>,
}

impl RedactVideoUseCase {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        reader: Box<dyn VideoReader>,
        writer: Box<dyn VideoWriter>,
        detector: Box<dyn FaceDetector>,
        redactor: Box<dyn FrameRedactor>,
        overlay: Option<Box<dyn OverlayRenderer>>,
        logger: Box<dyn PipelineLogger>,
        config: RedactVideoConfig,
    ) -> Self {
        Self {
            reader,
            writer,
            detector,
            redactor,
            overlay,
            logger,
            config,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle for requesting cancellation from another thread.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn execute(
        &mut self,
        input_path: &Path,
        output_path: &Path,
        progress: Option<ProgressCallback>,
    ) -> Result<RedactVideoReport, Box<dyn std::error::Error>> {
        let metadata = self.reader.open(input_path)?;
        let result = self.run_loop(output_path, &metadata, progress.as_ref());

        // Close both ends regardless of how the loop exited so partial
        // output files are finalized and decoder state is released.
        let writer_close = self.writer.close();
        self.reader.close();

        let report = result?;
        writer_close?;

        self.logger.summary();
        Ok(report)
    }

    fn run_loop(
        &mut self,
        output_path: &Path,
        metadata: &crate::shared::video_metadata::VideoMetadata,
        progress: Option<&ProgressCallback>,
    ) -> Result<RedactVideoReport, Box<dyn std::error::Error>> {
        self.writer.open(output_path, metadata)?;

        let total = metadata.total_frames;
        let mut tracker = FaceTracker::new(self.config.tracker);
        let mut processed = 0usize;
        let mut cancelled = false;

        let frames = self.reader.frames();
        for frame in frames {
            if self.cancelled.load(Ordering::Relaxed) {
                cancelled = true;
                break;
            }

            let mut frame = frame?;

            let detect_start = Instant::now();
            let clouds = self.detector.detect(&frame)?;
            self.logger
                .timing("detect", detect_start.elapsed().as_secs_f64() * 1000.0);

            let detections: Vec<Region> = clouds
                .iter()
                .filter_map(|points| Region::enclosing(points))
                .map(|region| {
                    region.expanded(
                        self.config.expand_margin,
                        frame.width() as i32,
                        frame.height() as i32,
                    )
                })
                .filter(|region| !region.is_empty())
                .collect();

            let faces = tracker.update(&detections);
            self.logger.metric("live_tracks", faces.len() as f64);

            let regions: Vec<Region> = faces
                .iter()
                .map(|face| face.region)
                .filter(|region| !region.is_empty())
                .collect();

            if !regions.is_empty() {
                let redact_start = Instant::now();
                self.redactor.redact(&mut frame, &regions)?;
                self.logger
                    .timing("redact", redact_start.elapsed().as_secs_f64() * 1000.0);
            }

            if let Some(overlay) = &self.overlay {
                overlay.render(&mut frame)?;
            }

            let write_start = Instant::now();
            self.writer.write(&frame)?;
            self.logger
                .timing("write", write_start.elapsed().as_secs_f64() * 1000.0);

            processed += 1;
            self.logger.progress(processed, total);
            if let Some(callback) = progress {
                if !callback(processed, total) {
                    cancelled = true;
                    break;
                }
            }
        }

        Ok(RedactVideoReport {
            frames_processed: processed,
            total_frames: total,
            cancelled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::face_detector::PointCloud;
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::shared::frame::Frame;
    use crate::shared::video_metadata::VideoMetadata;
    use std::path::PathBuf;
    use std::sync::Mutex;

    fn solid_frame(index: usize) -> Frame {
        Frame::new(vec![128; 64 * 64 * 3], 64, 64, index)
    }

    struct StubReader {
        frames: Vec<Frame>,
        closed: Arc<AtomicBool>,
    }

    impl VideoReader for StubReader {
        fn open(
            &mut self,
            _path: &Path,
        ) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
            Ok(VideoMetadata {
                width: 64,
                height: 64,
                fps: 30.0,
                total_frames: self.frames.len(),
                codec: "stub".to_string(),
                source_path: None,
            })
        }

        fn frames(
            &mut self,
        ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
            let frames: Vec<_> = self.frames.clone().into_iter().map(Ok).collect();
            Box::new(frames.into_iter())
        }

        fn close(&mut self) {
            self.closed.store(true, Ordering::Relaxed);
        }
    }

    #[derive(Default)]
    struct WriterState {
        opened: bool,
        closed: bool,
        written: Vec<usize>,
    }

    struct StubWriter {
        state: Arc<Mutex<WriterState>>,
    }

    impl VideoWriter for StubWriter {
        fn open(
            &mut self,
            _path: &Path,
            _metadata: &VideoMetadata,
        ) -> Result<(), Box<dyn std::error::Error>> {
            self.state.lock().unwrap().opened = true;
            Ok(())
        }

        fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            self.state.lock().unwrap().written.push(frame.index());
            Ok(())
        }

        fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
            self.state.lock().unwrap().closed = true;
            Ok(())
        }
    }

    /// Returns one fixed face on the frame indices it is given.
    struct StubDetector {
        face_on_frames: Vec<usize>,
        fail_on_frame: Option<usize>,
    }

    impl FaceDetector for StubDetector {
        fn detect(
            &mut self,
            frame: &Frame,
        ) -> Result<Vec<PointCloud>, Box<dyn std::error::Error>> {
            if self.fail_on_frame == Some(frame.index()) {
                return Err("detector exploded".into());
            }
            if self.face_on_frames.contains(&frame.index()) {
                Ok(vec![vec![(10, 10), (30, 30)]])
            } else {
                Ok(vec![])
            }
        }
    }

    struct RecordingRedactor {
        calls: Arc<Mutex<Vec<Vec<Region>>>>,
    }

    impl FrameRedactor for RecordingRedactor {
        fn redact(
            &self,
            _frame: &mut Frame,
            regions: &[Region],
        ) -> Result<(), Box<dyn std::error::Error>> {
            self.calls.lock().unwrap().push(regions.to_vec());
            Ok(())
        }
    }

    struct MarkingOverlay;

    impl OverlayRenderer for MarkingOverlay {
        fn render(&self, frame: &mut Frame) -> Result<(), Box<dyn std::error::Error>> {
            frame.data_mut()[0] = 255;
            Ok(())
        }
    }

    fn build_use_case(
        frames: Vec<Frame>,
        detector: StubDetector,
        overlay: Option<Box<dyn OverlayRenderer>>,
    ) -> (
        RedactVideoUseCase,
        Arc<AtomicBool>,
        Arc<Mutex<WriterState>>,
        Arc<Mutex<Vec<Vec<Region>>>>,
    ) {
        let reader_closed = Arc::new(AtomicBool::new(false));
        let writer_state = Arc::new(Mutex::new(WriterState::default()));
        let redactor_calls = Arc::new(Mutex::new(Vec::new()));

        let use_case = RedactVideoUseCase::new(
            Box::new(StubReader {
                frames,
                closed: Arc::clone(&reader_closed),
            }),
            Box::new(StubWriter {
                state: Arc::clone(&writer_state),
            }),
            Box::new(detector),
            Box::new(RecordingRedactor {
                calls: Arc::clone(&redactor_calls),
            }),
            overlay,
            Box::new(NullPipelineLogger),
            RedactVideoConfig::default(),
        );

        (use_case, reader_closed, writer_state, redactor_calls)
    }

    fn paths() -> (PathBuf, PathBuf) {
        (PathBuf::from("in.mp4"), PathBuf::from("out.mp4"))
    }

    #[test]
    fn test_processes_all_frames_in_order() {
        let frames: Vec<_> = (0..5).map(solid_frame).collect();
        let (mut use_case, _, writer_state, _) = build_use_case(
            frames,
            StubDetector {
                face_on_frames: vec![],
                fail_on_frame: None,
            },
            None,
        );
        let (input, output) = paths();

        let report = use_case.execute(&input, &output, None).unwrap();

        assert_eq!(report.frames_processed, 5);
        assert!(!report.cancelled);
        assert_eq!(writer_state.lock().unwrap().written, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_empty_video_writes_nothing() {
        let (mut use_case, _, writer_state, _) = build_use_case(
            vec![],
            StubDetector {
                face_on_frames: vec![],
                fail_on_frame: None,
            },
            None,
        );
        let (input, output) = paths();

        let report = use_case.execute(&input, &output, None).unwrap();

        assert_eq!(report.frames_processed, 0);
        assert!(writer_state.lock().unwrap().written.is_empty());
    }

    #[test]
    fn test_closes_reader_and_writer_on_success() {
        let frames: Vec<_> = (0..2).map(solid_frame).collect();
        let (mut use_case, reader_closed, writer_state, _) = build_use_case(
            frames,
            StubDetector {
                face_on_frames: vec![],
                fail_on_frame: None,
            },
            None,
        );
        let (input, output) = paths();

        use_case.execute(&input, &output, None).unwrap();

        assert!(reader_closed.load(Ordering::Relaxed));
        assert!(writer_state.lock().unwrap().closed);
    }

    #[test]
    fn test_closes_reader_and_writer_on_detector_error() {
        let frames: Vec<_> = (0..5).map(solid_frame).collect();
        let (mut use_case, reader_closed, writer_state, _) = build_use_case(
            frames,
            StubDetector {
                face_on_frames: vec![],
                fail_on_frame: Some(2),
            },
            None,
        );
        let (input, output) = paths();

        let err = use_case.execute(&input, &output, None).unwrap_err();

        assert!(err.to_string().contains("detector exploded"));
        assert!(reader_closed.load(Ordering::Relaxed));
        assert!(writer_state.lock().unwrap().closed);
        // Frames before the failure still made it out.
        assert_eq!(writer_state.lock().unwrap().written, vec![0, 1]);
    }

    #[test]
    fn test_redactor_called_only_when_faces_present() {
        let frames: Vec<_> = (0..3).map(solid_frame).collect();
        let (mut use_case, _, _, redactor_calls) = build_use_case(
            frames,
            StubDetector {
                face_on_frames: vec![1],
                fail_on_frame: None,
            },
            None,
        );
        let (input, output) = paths();

        use_case.execute(&input, &output, None).unwrap();

        // Frame 1 detects a face; tracker TTL keeps it alive on frame 2.
        let calls = redactor_calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].len(), 1);
        assert_eq!(calls[0], calls[1]);
    }

    #[test]
    fn test_tracker_bridges_detection_gaps() {
        let frames: Vec<_> = (0..8).map(solid_frame).collect();
        let (mut use_case, _, _, redactor_calls) = build_use_case(
            frames,
            StubDetector {
                face_on_frames: vec![0, 4],
                fail_on_frame: None,
            },
            None,
        );
        let (input, output) = paths();

        use_case.execute(&input, &output, None).unwrap();

        // TTL 10 carries the track across every frame of this clip.
        assert_eq!(redactor_calls.lock().unwrap().len(), 8);
    }

    #[test]
    fn test_detection_regions_are_expanded() {
        let frames = vec![solid_frame(0)];
        let (mut use_case, _, _, redactor_calls) = build_use_case(
            frames,
            StubDetector {
                face_on_frames: vec![0],
                fail_on_frame: None,
            },
            None,
        );
        let (input, output) = paths();

        use_case.execute(&input, &output, None).unwrap();

        let calls = redactor_calls.lock().unwrap();
        let region = calls[0][0];
        let expected = Region::new(10, 10, 20, 20).expanded(DEFAULT_EXPAND_MARGIN, 64, 64);
        assert_eq!(region, expected);
    }

    #[test]
    fn test_overlay_applied_to_every_frame() {
        let frames: Vec<_> = (0..2).map(solid_frame).collect();
        let (mut use_case, _, writer_state, _) = build_use_case(
            frames,
            StubDetector {
                face_on_frames: vec![],
                fail_on_frame: None,
            },
            Some(Box::new(MarkingOverlay)),
        );
        let (input, output) = paths();

        use_case.execute(&input, &output, None).unwrap();

        assert_eq!(writer_state.lock().unwrap().written.len(), 2);
    }

    #[test]
    fn test_progress_callback_receives_counts() {
        let frames: Vec<_> = (0..3).map(solid_frame).collect();
        let (mut use_case, _, _, _) = build_use_case(
            frames,
            StubDetector {
                face_on_frames: vec![],
                fail_on_frame: None,
            },
            None,
        );
        let (input, output) = paths();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in_callback = Arc::clone(&seen);
        let callback: ProgressCallback = Box::new(move |current, total| {
            seen_in_callback.lock().unwrap().push((current, total));
            true
        });

        use_case.execute(&input, &output, Some(callback)).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[test]
    fn test_progress_callback_can_cancel() {
        let frames: Vec<_> = (0..10).map(solid_frame).collect();
        let (mut use_case, _, writer_state, _) = build_use_case(
            frames,
            StubDetector {
                face_on_frames: vec![],
                fail_on_frame: None,
            },
            None,
        );
        let (input, output) = paths();

        let callback: ProgressCallback = Box::new(|current, _| current < 3);
        let report = use_case.execute(&input, &output, Some(callback)).unwrap();

        assert!(report.cancelled);
        assert_eq!(report.frames_processed, 3);
        // Cancellation finishes the frame in flight before stopping.
        assert_eq!(writer_state.lock().unwrap().written, vec![0, 1, 2]);
    }

    #[test]
    fn test_cancel_flag_stops_before_next_frame() {
        let frames: Vec<_> = (0..10).map(solid_frame).collect();
        let (mut use_case, _, writer_state, _) = build_use_case(
            frames,
            StubDetector {
                face_on_frames: vec![],
                fail_on_frame: None,
            },
            None,
        );
        let (input, output) = paths();

        let flag = use_case.cancel_flag();
        let callback: ProgressCallback = Box::new(move |current, _| {
            if current == 2 {
                flag.store(true, Ordering::Relaxed);
            }
            true
        });

        let report = use_case.execute(&input, &output, Some(callback)).unwrap();

        assert!(report.cancelled);
        assert_eq!(report.frames_processed, 2);
        assert_eq!(writer_state.lock().unwrap().written, vec![0, 1]);
    }
}
