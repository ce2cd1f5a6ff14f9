//! Region carving: clipping straight drawings against an axis-aligned
//! rectangular window.
//!
//! A carve removes everything inside the region. A line fully inside
//! disappears; a line crossing the boundary is cut at the crossing points and
//! only the parts outside survive. Endpoints exactly on the boundary count as
//! inside.

use crate::board::{Drawing, GrLine, Pcb};
use crate::error::{CarveError, GeometryError};
use crate::geometry::Point;

/// Two crossing points closer than this are treated as one. A line passing
/// exactly through a region corner intersects two boundary edges at the same
/// point.
const CROSSING_EPSILON: f64 = 1e-9;

/// A straight line segment between two points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}

impl Segment {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    fn is_vertical(&self) -> bool {
        let grad = self.gradient();
        grad.is_nan() || grad.is_infinite()
    }

    fn gradient(&self) -> f64 {
        (self.end.y - self.start.y) / (self.end.x - self.start.x)
    }

    fn intercept(&self) -> f64 {
        self.start.y - self.gradient() * self.start.x
    }

    fn y_at(&self, x: f64) -> f64 {
        self.gradient() * x + self.intercept()
    }
}

/// An axis-aligned rectangular region. Construction normalizes the corners,
/// so `from` is always the minimum corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub from: Point,
    pub to: Point,
}

impl Region {
    pub fn new(p1: Point, p2: Point) -> Self {
        Self {
            from: Point::new(p1.x.min(p2.x), p1.y.min(p2.y)),
            to: Point::new(p1.x.max(p2.x), p1.y.max(p2.y)),
        }
    }

    pub fn size(&self) -> Point {
        Point::new(self.to.x - self.from.x, self.to.y - self.from.y)
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.from.x + self.to.x) / 2.0,
            (self.from.y + self.to.y) / 2.0,
        )
    }

    /// Whether the point lies inside the region, boundary included.
    pub fn contains(&self, p: Point) -> bool {
        self.from.x <= p.x && p.x <= self.to.x && self.from.y <= p.y && p.y <= self.to.y
    }

    fn boundaries(&self) -> [Segment; 4] {
        let top_right = Point::new(self.to.x, self.from.y);
        let bottom_left = Point::new(self.from.x, self.to.y);
        [
            Segment::new(self.from, top_right),
            Segment::new(self.to, bottom_left),
            Segment::new(self.from, bottom_left),
            Segment::new(top_right, self.to),
        ]
    }
}

/// What carving did to a single segment.
#[derive(Debug, Clone, PartialEq)]
pub enum CarveOutcome {
    /// The segment never enters the region.
    Unchanged,
    /// The segment lies entirely inside the region.
    Removed,
    /// The segment crosses the boundary; these parts survive.
    Clipped(Vec<Segment>),
}

/// The point where the infinite extensions of two segments meet, or `None`
/// for parallel non-touching segments. Shared endpoints short-circuit, which
/// also covers collinear segments that touch.
fn intersection(a: Segment, b: Segment) -> Option<Point> {
    if a.start == b.start || a.start == b.end {
        return Some(a.start);
    }
    if a.end == b.end || a.end == b.start {
        return Some(a.end);
    }

    match (a.is_vertical(), b.is_vertical()) {
        (true, true) => {
            if a.start.x != b.start.x {
                return None;
            }
            let (a_min, a_max) = (a.start.y.min(a.end.y), a.start.y.max(a.end.y));
            let (b_min, b_max) = (b.start.y.min(b.end.y), b.start.y.max(b.end.y));
            if b_min <= a_min && a_min <= b_max {
                Some(Point::new(a.start.x, a_min))
            } else if a_min <= b_min && b_min <= a_max {
                Some(Point::new(b.start.x, b_min))
            } else {
                None
            }
        }
        (false, true) => Some(Point::new(b.start.x, a.y_at(b.start.x))),
        (true, false) => Some(Point::new(a.start.x, b.y_at(a.start.x))),
        (false, false) => {
            let d = a.gradient() - b.gradient();
            if d == 0.0 {
                return None;
            }
            let x = (b.intercept() - a.intercept()) / d;
            Some(Point::new(x, a.y_at(x)))
        }
    }
}

/// Whether two segments cross within both of their extents.
fn segments_cross(a: Segment, b: Segment) -> Option<Point> {
    let p = intersection(a, b)?;
    if Region::new(a.start, a.end).contains(p) && Region::new(b.start, b.end).contains(p) {
        Some(p)
    } else {
        None
    }
}

/// Clip one segment against the region.
pub fn carve_segment(segment: Segment, region: Region) -> Result<CarveOutcome, GeometryError> {
    if region.contains(segment.start) && region.contains(segment.end) {
        return Ok(CarveOutcome::Removed);
    }

    let mut crossings: Vec<Point> = Vec::with_capacity(4);
    for bound in region.boundaries() {
        if let Some(p) = segments_cross(segment, bound) {
            if !crossings
                .iter()
                .any(|seen| seen.distance(p) < CROSSING_EPSILON)
            {
                crossings.push(p);
            }
        }
    }

    match crossings.len() {
        0 => Ok(CarveOutcome::Unchanged),
        1 => {
            // A single crossing with both endpoints outside can only be a
            // deduped corner graze; nothing of the line lies inside.
            if !region.contains(segment.start) && !region.contains(segment.end) {
                return Ok(CarveOutcome::Unchanged);
            }
            // The endpoint nearer the region center is the one being cut off.
            let center = region.center();
            let survivor = if center.distance(segment.start) < center.distance(segment.end) {
                Segment::new(crossings[0], segment.end)
            } else {
                Segment::new(segment.start, crossings[0])
            };
            Ok(CarveOutcome::Clipped(vec![survivor]))
        }
        2 => {
            // Pair each endpoint with the crossing nearer to it; the middle
            // span between the crossings is discarded.
            let (c1, c2) = (crossings[0], crossings[1]);
            let parts = if segment.start.distance(c1) <= segment.start.distance(c2) {
                vec![
                    Segment::new(segment.start, c1),
                    Segment::new(c2, segment.end),
                ]
            } else {
                vec![
                    Segment::new(segment.start, c2),
                    Segment::new(c1, segment.end),
                ]
            };
            Ok(CarveOutcome::Clipped(parts))
        }
        count => Err(GeometryError::TooManyCrossings { count }),
    }
}

/// Clip a drawn line against the region.
pub fn carve_line(line: &GrLine, region: Region) -> Result<CarveOutcome, GeometryError> {
    carve_segment(Segment::new(line.start, line.end), region)
}

impl Pcb {
    /// Carve the region out of the board's drawings.
    ///
    /// Clipped lines keep their layer and width and stay at the original
    /// drawing's position in the list. Only straight lines can be carved.
    pub fn carve(&mut self, region: Region) -> Result<(), CarveError> {
        log::debug!(
            "carving ({}, {})..({}, {}) out of {} drawings",
            region.from.x,
            region.from.y,
            region.to.x,
            region.to.y,
            self.drawings.len()
        );

        let mut kept: Vec<Drawing> = Vec::with_capacity(self.drawings.len());
        for drawing in &self.drawings {
            let Drawing::Line(line) = drawing else {
                return Err(CarveError::Unsupported {
                    kind: drawing.kind(),
                });
            };
            match carve_line(line, region)? {
                CarveOutcome::Unchanged => kept.push(drawing.clone()),
                CarveOutcome::Removed => {}
                CarveOutcome::Clipped(parts) => {
                    for part in parts {
                        let mut clipped = line.clone();
                        clipped.start = part.start;
                        clipped.end = part.end;
                        kept.push(Drawing::Line(clipped));
                    }
                }
            }
        }
        self.drawings = kept;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::GrLine;

    fn region() -> Region {
        Region::new(Point::new(10.0, 10.0), Point::new(50.0, 50.0))
    }

    fn clip(start: (f64, f64), end: (f64, f64), re: Region) -> CarveOutcome {
        carve_segment(
            Segment::new(Point::new(start.0, start.1), Point::new(end.0, end.1)),
            re,
        )
        .unwrap()
    }

    #[test]
    fn region_normalizes_corners() {
        let r = Region::new(Point::new(50.0, 10.0), Point::new(10.0, 50.0));
        assert_eq!(r.from, Point::new(10.0, 10.0));
        assert_eq!(r.to, Point::new(50.0, 50.0));
        assert_eq!(r.size(), Point::new(40.0, 40.0));
        assert_eq!(r.center(), Point::new(30.0, 30.0));
    }

    #[test]
    fn containment_includes_boundary() {
        let r = region();
        assert!(r.contains(Point::new(10.0, 10.0)));
        assert!(r.contains(Point::new(50.0, 30.0)));
        assert!(r.contains(Point::new(30.0, 30.0)));
        assert!(!r.contains(Point::new(9.999, 30.0)));
        assert!(!r.contains(Point::new(30.0, 50.001)));
    }

    #[test]
    fn vertical_intersections() {
        let vertical = Segment::new(Point::new(5.0, 0.0), Point::new(5.0, 10.0));
        let horizontal = Segment::new(Point::new(0.0, 5.0), Point::new(10.0, 5.0));
        assert_eq!(
            intersection(vertical, horizontal),
            Some(Point::new(5.0, 5.0))
        );
        assert_eq!(
            intersection(horizontal, vertical),
            Some(Point::new(5.0, 5.0))
        );

        // Parallel verticals on different X never meet.
        let other = Segment::new(Point::new(7.0, 0.0), Point::new(7.0, 10.0));
        assert_eq!(intersection(vertical, other), None);

        // Collinear verticals report the overlapping endpoint.
        let overlap = Segment::new(Point::new(5.0, 4.0), Point::new(5.0, 20.0));
        assert_eq!(intersection(vertical, overlap), Some(Point::new(5.0, 4.0)));

        // Disjoint collinear verticals do not.
        let apart = Segment::new(Point::new(5.0, 11.0), Point::new(5.0, 20.0));
        assert_eq!(intersection(vertical, apart), None);
    }

    #[test]
    fn shared_endpoints_short_circuit() {
        let a = Segment::new(Point::new(0.0, 0.0), Point::new(5.0, 5.0));
        let b = Segment::new(Point::new(5.0, 5.0), Point::new(9.0, 2.0));
        assert_eq!(intersection(a, b), Some(Point::new(5.0, 5.0)));
    }

    #[test]
    fn untouched_line_is_unchanged() {
        assert_eq!(clip((0.0, 0.0), (5.0, 5.0), region()), CarveOutcome::Unchanged);
    }

    #[test]
    fn inner_line_is_removed() {
        assert_eq!(
            clip((20.0, 20.0), (40.0, 40.0), region()),
            CarveOutcome::Removed
        );
        // Endpoints on the boundary count as inside.
        assert_eq!(
            clip((10.0, 10.0), (50.0, 50.0), region()),
            CarveOutcome::Removed
        );
    }

    #[test]
    fn clips_at_top_boundary() {
        assert_eq!(
            clip((0.0, 0.0), (30.0, 10.0), region()),
            CarveOutcome::Clipped(vec![Segment::new(
                Point::new(0.0, 0.0),
                Point::new(30.0, 10.0)
            )])
        );
    }

    #[test]
    fn clips_at_left_boundary() {
        assert_eq!(
            clip((-50.0, 30.0), (20.0, 30.0), region()),
            CarveOutcome::Clipped(vec![Segment::new(
                Point::new(-50.0, 30.0),
                Point::new(10.0, 30.0)
            )])
        );
    }

    #[test]
    fn clips_at_right_boundary() {
        assert_eq!(
            clip((60.0, 30.0), (40.0, 30.0), region()),
            CarveOutcome::Clipped(vec![Segment::new(
                Point::new(60.0, 30.0),
                Point::new(50.0, 30.0)
            )])
        );
    }

    #[test]
    fn clips_at_bottom_boundary() {
        assert_eq!(
            clip((30.0, 80.0), (30.0, 40.0), region()),
            CarveOutcome::Clipped(vec![Segment::new(
                Point::new(30.0, 80.0),
                Point::new(30.0, 50.0)
            )])
        );
    }

    #[test]
    fn through_line_splits_in_two() {
        assert_eq!(
            clip((0.0, 0.0), (60.0, 20.0), region()),
            CarveOutcome::Clipped(vec![
                Segment::new(Point::new(0.0, 0.0), Point::new(30.0, 10.0)),
                Segment::new(Point::new(50.0, 16.666666666666664), Point::new(60.0, 20.0)),
            ])
        );
    }

    #[test]
    fn through_line_direction_does_not_change_pairing() {
        assert_eq!(
            clip((60.0, 20.0), (0.0, 0.0), region()),
            CarveOutcome::Clipped(vec![
                Segment::new(Point::new(60.0, 20.0), Point::new(50.0, 16.666666666666664)),
                Segment::new(Point::new(30.0, 10.0), Point::new(0.0, 0.0)),
            ])
        );
    }

    #[test]
    fn clips_inside_offset_region() {
        let re = Region::new(Point::new(-21.9, 3.0), Point::new(25.0, 50.0));
        assert_eq!(
            clip((22.5, 8.5), (-22.5, 8.5), re),
            CarveOutcome::Clipped(vec![Segment::new(
                Point::new(-21.9, 8.5),
                Point::new(-22.5, 8.5)
            )])
        );
    }

    #[test]
    fn corner_crossing_counts_once() {
        // Diagonal through the (10, 10) corner: both the top and the left
        // boundary report the same point.
        let out = clip((0.0, 0.0), (20.0, 20.0), region());
        assert_eq!(
            out,
            CarveOutcome::Clipped(vec![Segment::new(
                Point::new(0.0, 0.0),
                Point::new(10.0, 10.0)
            )])
        );
    }

    fn edge_line(start: Point, end: Point) -> Drawing {
        Drawing::Line(GrLine {
            start,
            end,
            layer: "Edge.Cuts".to_string(),
            width: 0.15,
            sequence: 0,
        })
    }

    #[test]
    fn board_carve_splices_in_place() {
        let mut pcb = Pcb::new();
        pcb.drawings.push(edge_line(
            Point::new(0.0, 0.0),
            Point::new(60.0, 20.0),
        ));
        pcb.drawings.push(edge_line(
            Point::new(20.0, 20.0),
            Point::new(40.0, 40.0),
        ));
        pcb.drawings.push(edge_line(
            Point::new(0.0, 60.0),
            Point::new(5.0, 60.0),
        ));

        pcb.carve(region()).unwrap();

        assert_eq!(pcb.drawings.len(), 3);
        let Drawing::Line(first) = &pcb.drawings[0] else {
            panic!("expected a line");
        };
        assert_eq!(first.end, Point::new(30.0, 10.0));
        assert_eq!(first.layer, "Edge.Cuts");
        assert_eq!(first.width, 0.15);
        let Drawing::Line(second) = &pcb.drawings[1] else {
            panic!("expected a line");
        };
        assert_eq!(second.start, Point::new(50.0, 16.666666666666664));
        let Drawing::Line(last) = &pcb.drawings[2] else {
            panic!("expected a line");
        };
        assert_eq!(last.start, Point::new(0.0, 60.0));
    }

    #[test]
    fn non_line_drawings_are_rejected() {
        let mut pcb = Pcb::new();
        pcb.drawings
            .push(Drawing::Text(crate::board::GrText::default()));
        let err = pcb.carve(region()).unwrap_err();
        assert!(matches!(
            err,
            CarveError::Unsupported { kind: "gr_text" }
        ));
    }

    #[test]
    fn corner_graze_keeps_the_whole_line() {
        // Tangent at the (10, 10) corner with both endpoints outside: the
        // deduped corner crossing must not be mistaken for an entry point.
        assert_eq!(
            clip((0.0, 20.0), (30.0, -10.0), region()),
            CarveOutcome::Unchanged
        );
        assert_eq!(
            clip((30.0, -10.0), (0.0, 20.0), region()),
            CarveOutcome::Unchanged
        );
    }

    #[test]
    fn line_along_an_edge_is_cut_at_the_corners() {
        // Collinear with the top edge: the parallel edges contribute nothing,
        // the perpendicular ones cut at the corners.
        assert_eq!(
            clip((0.0, 10.0), (60.0, 10.0), region()),
            CarveOutcome::Clipped(vec![
                Segment::new(Point::new(0.0, 10.0), Point::new(10.0, 10.0)),
                Segment::new(Point::new(50.0, 10.0), Point::new(60.0, 10.0)),
            ])
        );
    }
}
