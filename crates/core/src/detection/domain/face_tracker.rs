use crate::shared::constants::{DEFAULT_FACE_TTL, DEFAULT_IOU_THRESHOLD};
use crate::shared::region::Region;

/// Tunables for track matching and expiry.
#[derive(Clone, Copy, Debug)]
pub struct TrackerConfig {
    /// Frames a track survives without a matching detection.
    pub face_ttl: u32,
    /// Minimum IoU (strict) for a detection to refresh a track.
    pub iou_threshold: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            face_ttl: DEFAULT_FACE_TTL,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
        }
    }
}

/// A live face identity after one tracker update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrackedFace {
    pub id: u64,
    pub region: Region,
}

#[derive(Clone, Debug)]
struct TrackState {
    id: u64,
    region: Region,
    ttl: u32,
}

/// Greedy per-track multi-face tracker.
///
/// Each call to [`FaceTracker::update`] associates one frame's detections
/// with persistent track ids: tracks are visited in ascending creation
/// order and each claims the unclaimed detection with the highest IoU
/// against its last region, so older tracks win ties. A matched track is
/// refreshed to full TTL; an unmatched track decays by one and is evicted
/// when its TTL runs out; leftover detections become new tracks.
///
/// This is deliberately a greedy assignment, not a minimum-cost bipartite
/// matching. When two tracks compete for one detection the earlier-created
/// track takes it and the other decays, which keeps the per-frame cost
/// linear in tracks x detections.
///
/// State is order-dependent: `update` must be called exactly once per
/// frame, in frame order.
pub struct FaceTracker {
    tracks: Vec<TrackState>,
    next_id: u64,
    config: TrackerConfig,
}

impl FaceTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            tracks: Vec::new(),
            next_id: 1,
            config,
        }
    }

    /// Consumes one frame's detections and returns every track alive after
    /// this call, in ascending id order.
    ///
    /// An empty slice is not an error; it simply decays every live track
    /// one step toward eviction.
    pub fn update(&mut self, detections: &[Region]) -> Vec<TrackedFace> {
        let mut claimed = vec![false; detections.len()];
        let mut survivors: Vec<TrackState> = Vec::with_capacity(self.tracks.len());

        // `tracks` is kept in ascending id order (ids are monotonic and new
        // tracks append), so iteration order is the creation order.
        for track in &self.tracks {
            let mut best_iou = 0.0;
            let mut best_det = None;
            for (i, det) in detections.iter().enumerate() {
                if claimed[i] {
                    continue;
                }
                let score = track.region.iou(det);
                if score > best_iou {
                    best_iou = score;
                    best_det = Some(i);
                }
            }

            if best_iou > self.config.iou_threshold {
                let i = best_det.unwrap();
                claimed[i] = true;
                survivors.push(TrackState {
                    id: track.id,
                    region: detections[i],
                    ttl: self.config.face_ttl,
                });
            } else if track.ttl > 1 {
                survivors.push(TrackState {
                    id: track.id,
                    region: track.region,
                    ttl: track.ttl - 1,
                });
            }
            // ttl would reach 0: the track is dropped here and its id is
            // never reissued.
        }

        for (i, det) in detections.iter().enumerate() {
            if !claimed[i] {
                survivors.push(TrackState {
                    id: self.next_id,
                    region: *det,
                    ttl: self.config.face_ttl,
                });
                self.next_id += 1;
            }
        }

        // The live set is rebuilt wholesale; nothing from the previous
        // frame can leak through.
        self.tracks = survivors;

        self.tracks
            .iter()
            .map(|t| TrackedFace {
                id: t.id,
                region: t.region,
            })
            .collect()
    }

    /// Number of live tracks.
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

impl Default for FaceTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}
