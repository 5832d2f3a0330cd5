/// An axis-aligned pixel rectangle with its origin at the frame's top-left.
///
/// Regions are value objects: every pipeline stage produces fresh ones
/// rather than mutating existing ones. A region built by [`Region::expanded`]
/// is always a valid in-frame crop rectangle, except that a detection lying
/// fully outside the frame collapses to zero size on the offending axis
/// (callers skip those via [`Region::is_empty`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Region {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Minimal enclosing rectangle of a landmark point cloud.
    ///
    /// Returns `None` for an empty cloud. A single point yields a
    /// zero-size region.
    pub fn enclosing(points: &[(i32, i32)]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let (mut min_x, mut min_y) = *first;
        let (mut max_x, mut max_y) = *first;
        for &(px, py) in rest {
            min_x = min_x.min(px);
            min_y = min_y.min(py);
            max_x = max_x.max(px);
            max_y = max_y.max(py);
        }
        Some(Self {
            x: min_x,
            y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        })
    }

    /// Grows the region symmetrically around its center by `margin`
    /// (0.40 = 40% larger per dimension), then clamps it into the frame.
    ///
    /// Clamping is origin-first: the origin is clamped to `>= 0`, then the
    /// size is reduced so the region never crosses the right or bottom
    /// edge. The origin is never pushed negative.
    pub fn expanded(&self, margin: f64, frame_width: i32, frame_height: i32) -> Self {
        let cx = self.x + self.width / 2;
        let cy = self.y + self.height / 2;
        let grown_w = (self.width as f64 * (1.0 + margin)) as i32;
        let grown_h = (self.height as f64 * (1.0 + margin)) as i32;
        let x = (cx - grown_w / 2).max(0);
        let y = (cy - grown_h / 2).max(0);
        Self {
            x,
            y,
            width: grown_w.min((frame_width - x).max(0)),
            height: grown_h.min((frame_height - y).max(0)),
        }
    }

    /// Intersection-over-union in `[0, 1]`. Disjoint or merely touching
    /// regions score exactly `0.0`.
    pub fn iou(&self, other: &Region) -> f64 {
        let ix1 = self.x.max(other.x);
        let iy1 = self.y.max(other.y);
        let ix2 = (self.x + self.width).min(other.x + other.width);
        let iy2 = (self.y + self.height).min(other.y + other.height);

        let inter = (ix2 - ix1).max(0) as f64 * (iy2 - iy1).max(0) as f64;
        if inter == 0.0 {
            return 0.0;
        }

        let area_a = self.width as f64 * self.height as f64;
        let area_b = other.width as f64 * other.height as f64;
        inter / (area_a + area_b - inter)
    }

    /// True when the region has no area on at least one axis.
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}
