//! Geometry primitives shared by the spatial indices, the pipeline and the fog.
//!
//! All predicates are inclusive at the boundary: touching shapes overlap.

use std::f32::consts::TAU;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle described by its minimum and maximum corners.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    min: Vec2,
    max: Vec2,
}

impl Rect {
    /// Creates a rectangle from two corners, ordering the components.
    #[must_use]
    pub fn new(a: Vec2, b: Vec2) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Creates a rectangle anchored at the origin with the provided extent.
    #[must_use]
    pub fn from_size(width: f32, height: f32) -> Self {
        Self::new(Vec2::ZERO, Vec2::new(width, height))
    }

    /// Bounding box of a circle.
    #[must_use]
    pub fn from_circle(center: Vec2, radius: f32) -> Self {
        let extent = Vec2::splat(radius.abs());
        Self {
            min: center - extent,
            max: center + extent,
        }
    }

    /// Lower corner of the rectangle.
    #[must_use]
    pub const fn min(&self) -> Vec2 {
        self.min
    }

    /// Upper corner of the rectangle.
    #[must_use]
    pub const fn max(&self) -> Vec2 {
        self.max
    }

    /// Horizontal extent.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    /// Vertical extent.
    #[must_use]
    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    /// Geometric center of the rectangle.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Reports whether the point lies inside or on the border of the rectangle.
    #[must_use]
    pub fn contains_point(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    /// Reports whether the two rectangles share at least one point.
    #[must_use]
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    /// Projects the rectangle onto `outer`, clamping both corners.
    ///
    /// Clamping preserves overlap: two rectangles that overlap still overlap
    /// after both are clamped to the same outer rectangle.
    #[must_use]
    pub fn clamped_to(&self, outer: &Rect) -> Rect {
        Rect {
            min: self.min.clamp(outer.min, outer.max),
            max: self.max.clamp(outer.min, outer.max),
        }
    }

    /// Splits the rectangle into four equal quadrants (NW, NE, SW, SE).
    #[must_use]
    pub fn quadrants(&self) -> [Rect; 4] {
        let mid = self.center();
        [
            Rect::new(self.min, mid),
            Rect::new(Vec2::new(mid.x, self.min.y), Vec2::new(self.max.x, mid.y)),
            Rect::new(Vec2::new(self.min.x, mid.y), Vec2::new(mid.x, self.max.y)),
            Rect::new(mid, self.max),
        ]
    }
}

/// Circle used as the collision and visibility shape of every entity.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    /// Center of the circle in world units.
    pub center: Vec2,
    /// Radius of the circle in world units.
    pub radius: f32,
}

impl Circle {
    /// Creates a new circle.
    #[must_use]
    pub const fn new(center: Vec2, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Bounding box of the circle.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::from_circle(self.center, self.radius)
    }

    /// Reports whether the point lies inside or on the circle.
    #[must_use]
    pub fn contains_point(&self, point: Vec2) -> bool {
        self.center.distance_squared(point) <= self.radius * self.radius
    }

    /// Reports whether the two circles overlap or touch.
    #[must_use]
    pub fn overlaps_circle(&self, other: &Circle) -> bool {
        let reach = self.radius + other.radius;
        self.center.distance_squared(other.center) <= reach * reach
    }

    /// Reports whether the circle overlaps the rectangle.
    #[must_use]
    pub fn overlaps_rect(&self, rect: &Rect) -> bool {
        let closest = self.center.clamp(rect.min(), rect.max());
        self.center.distance_squared(closest) <= self.radius * self.radius
    }

    /// Reports whether the rectangle lies entirely inside the circle.
    #[must_use]
    pub fn covers_rect(&self, rect: &Rect) -> bool {
        let min = rect.min();
        let max = rect.max();
        [min, Vec2::new(max.x, min.y), Vec2::new(min.x, max.y), max]
            .into_iter()
            .all(|corner| self.contains_point(corner))
    }
}

/// Line segment between two points.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// First endpoint.
    pub start: Vec2,
    /// Second endpoint.
    pub end: Vec2,
}

impl Segment {
    /// Creates a new segment.
    #[must_use]
    pub const fn new(start: Vec2, end: Vec2) -> Self {
        Self { start, end }
    }

    /// Point on the segment nearest to `point`.
    #[must_use]
    pub fn closest_point(&self, point: Vec2) -> Vec2 {
        let direction = self.end - self.start;
        let length_sq = direction.length_squared();
        if length_sq <= f32::EPSILON {
            return self.start;
        }
        let t = ((point - self.start).dot(direction) / length_sq).clamp(0.0, 1.0);
        self.start + direction * t
    }

    /// Squared distance from the segment to `point`.
    #[must_use]
    pub fn distance_squared_to_point(&self, point: Vec2) -> f32 {
        self.closest_point(point).distance_squared(point)
    }

    /// Reports whether the segment passes through the circle.
    #[must_use]
    pub fn intersects_circle(&self, circle: &Circle) -> bool {
        self.distance_squared_to_point(circle.center) <= circle.radius * circle.radius
    }

    /// Bounding box of the segment.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::new(self.start, self.end)
    }
}

/// Query shape accepted by broad-phase lookups.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    /// A single point.
    Point(Vec2),
    /// A filled circle.
    Circle(Circle),
    /// A line segment.
    Segment(Segment),
}

impl Shape {
    /// Bounding box of the shape.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        match self {
            Self::Point(point) => Rect::new(*point, *point),
            Self::Circle(circle) => circle.bounds(),
            Self::Segment(segment) => segment.bounds(),
        }
    }

    /// Exact overlap test against a circle.
    #[must_use]
    pub fn overlaps_circle(&self, circle: &Circle) -> bool {
        match self {
            Self::Point(point) => circle.contains_point(*point),
            Self::Circle(own) => own.overlaps_circle(circle),
            Self::Segment(segment) => segment.intersects_circle(circle),
        }
    }
}

/// Tests two circles moving linearly over one tick for contact.
///
/// Both circles travel from their start to their end position as `t` goes
/// from 0 to 1. The relative motion is a line, so the squared separation is a
/// quadratic in `t`; its minimum over `[0, 1]` is compared against the
/// combined radius.
#[must_use]
pub fn sweep_collides_relative(
    a_start: Vec2,
    a_end: Vec2,
    a_radius: f32,
    b_start: Vec2,
    b_end: Vec2,
    b_radius: f32,
) -> bool {
    let reach = a_radius + b_radius;
    let offset = b_start - a_start;
    let relative_motion = (b_end - b_start) - (a_end - a_start);

    // |offset + motion * t|^2 = a t^2 + b t + c
    let a = relative_motion.length_squared();
    let c = offset.length_squared() - reach * reach;
    if c <= 0.0 {
        return true;
    }
    if a <= f32::EPSILON {
        return false;
    }
    let b = 2.0 * offset.dot(relative_motion);
    let t = (-b / (2.0 * a)).clamp(0.0, 1.0);
    a * t * t + b * t + c <= 0.0
}

/// Wraps an angle in radians into `[0, 2π)`.
#[must_use]
pub fn normalize_angle(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs.
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Reports whether `angle` lies on the arc between `start` and `end`.
///
/// The arc starts at the smaller of the two bounds and extends
/// counter-clockwise by their difference, so bounds may be given in either
/// order and in any winding. The lower bound is inclusive, the upper bound
/// exclusive.
#[must_use]
pub fn angle_in_span(angle: f32, start: f32, end: f32) -> bool {
    let (low, high) = if start <= end { (start, end) } else { (end, start) };
    let width = high - low;
    if width >= TAU {
        return true;
    }
    normalize_angle(angle - low) < width
}

/// Bearing of `point` as seen from `origin`, normalized into `[0, 2π)`.
#[must_use]
pub fn bearing(origin: Vec2, point: Vec2) -> f32 {
    let delta = point - origin;
    normalize_angle(delta.y.atan2(delta.x))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::f32::consts::PI;

    #[test]
    fn rect_quadrants_tile_the_parent() {
        let rect = Rect::from_size(100.0, 60.0);
        let quadrants = rect.quadrants();
        assert_eq!(quadrants[0], Rect::new(Vec2::ZERO, Vec2::new(50.0, 30.0)));
        assert_eq!(quadrants[3], Rect::new(Vec2::new(50.0, 30.0), Vec2::new(100.0, 60.0)));
        let area: f32 = quadrants.iter().map(|q| q.width() * q.height()).sum();
        assert!((area - 6_000.0).abs() < 1e-3);
    }

    #[test]
    fn touching_circles_overlap() {
        let a = Circle::new(Vec2::ZERO, 5.0);
        let b = Circle::new(Vec2::new(10.0, 0.0), 5.0);
        assert!(a.overlaps_circle(&b));
        let c = Circle::new(Vec2::new(10.1, 0.0), 5.0);
        assert!(!a.overlaps_circle(&c));
    }

    #[test]
    fn circle_rect_overlap_uses_closest_point() {
        let rect = Rect::new(Vec2::new(10.0, 10.0), Vec2::new(20.0, 20.0));
        assert!(Circle::new(Vec2::new(5.0, 15.0), 5.0).overlaps_rect(&rect));
        assert!(!Circle::new(Vec2::new(5.0, 5.0), 5.0).overlaps_rect(&rect));
        assert!(Circle::new(Vec2::new(15.0, 15.0), 8.0).covers_rect(&rect));
        assert!(!Circle::new(Vec2::new(15.0, 15.0), 7.0).covers_rect(&rect));
    }

    #[test]
    fn segment_passing_through_circle_intersects() {
        let segment = Segment::new(Vec2::new(-10.0, 0.0), Vec2::new(10.0, 0.0));
        assert!(segment.intersects_circle(&Circle::new(Vec2::new(0.0, 2.0), 3.0)));
        assert!(!segment.intersects_circle(&Circle::new(Vec2::new(0.0, 4.0), 3.0)));
        assert!(!segment.intersects_circle(&Circle::new(Vec2::new(15.0, 0.0), 3.0)));
    }

    #[test]
    fn sweep_detects_pass_through_missed_by_endpoints() {
        // A fast bolt crosses a stationary target entirely within one tick.
        let hit = sweep_collides_relative(
            Vec2::new(-100.0, 0.0),
            Vec2::new(100.0, 0.0),
            2.0,
            Vec2::ZERO,
            Vec2::ZERO,
            5.0,
        );
        assert!(hit);

        let end_overlap = Circle::new(Vec2::new(100.0, 0.0), 2.0)
            .overlaps_circle(&Circle::new(Vec2::ZERO, 5.0));
        assert!(!end_overlap, "discrete check alone would tunnel");
    }

    #[test]
    fn sweep_accounts_for_both_bodies_moving() {
        // Moving in parallel at the same speed never closes the gap.
        let parallel = sweep_collides_relative(
            Vec2::new(0.0, 0.0),
            Vec2::new(50.0, 0.0),
            1.0,
            Vec2::new(0.0, 10.0),
            Vec2::new(50.0, 10.0),
            1.0,
        );
        assert!(!parallel);

        // Head-on approach meets in the middle of the tick.
        let head_on = sweep_collides_relative(
            Vec2::new(0.0, 0.0),
            Vec2::new(30.0, 0.0),
            1.0,
            Vec2::new(50.0, 0.0),
            Vec2::new(20.0, 0.0),
            1.0,
        );
        assert!(head_on);
    }

    #[test]
    fn sweep_without_relative_motion_is_static_overlap() {
        let start = Vec2::new(3.0, 4.0);
        assert!(sweep_collides_relative(start, start, 1.0, Vec2::ZERO, Vec2::ZERO, 4.0));
        assert!(!sweep_collides_relative(start, start, 1.0, Vec2::ZERO, Vec2::ZERO, 3.0));
    }

    #[test]
    fn angle_span_crossing_the_seam_contains_zero() {
        assert!(angle_in_span(0.0, 3.0, -3.0));
        assert!(angle_in_span(2.9, 3.0, -3.0));
        assert!(!angle_in_span(PI, 3.0, -3.0));
    }

    #[test]
    fn angle_span_handles_unbounded_headings() {
        let heading = 20.0 * PI + 0.25;
        assert!(angle_in_span(0.25, heading - 0.1, heading + 0.1));
        assert!(!angle_in_span(0.5, heading - 0.1, heading + 0.1));
        assert!(angle_in_span(1.234, 0.0, 2.0 * PI));
    }

    #[test]
    fn bearing_is_normalized() {
        let origin = Vec2::new(10.0, 10.0);
        assert!(bearing(origin, Vec2::new(20.0, 10.0)).abs() < 1e-6);
        assert!((bearing(origin, Vec2::new(10.0, 0.0)) - 1.5 * PI).abs() < 1e-5);
    }

    proptest! {
        #[test]
        fn normalized_angles_stay_in_range(angle in -1_000.0f32..1_000.0) {
            let normalized = normalize_angle(angle);
            prop_assert!((0.0..TAU).contains(&normalized));
        }

        #[test]
        fn sweep_agrees_with_overlap_at_endpoints(
            ax in -50.0f32..50.0, ay in -50.0f32..50.0,
            bx in -50.0f32..50.0, by in -50.0f32..50.0,
            ra in 0.5f32..10.0, rb in 0.5f32..10.0,
        ) {
            let a = Vec2::new(ax, ay);
            let b = Vec2::new(bx, by);
            let overlapping = Circle::new(a, ra).overlaps_circle(&Circle::new(b, rb));
            if overlapping {
                prop_assert!(sweep_collides_relative(a, a, ra, b, b, rb));
            }
        }
    }
}
