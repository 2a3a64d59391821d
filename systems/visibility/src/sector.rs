//! Rotating searchlight sectors.

use bastion_core::{angle_in_span, bearing, Circle, SectorSpec, Segment, StructureId};
use glam::Vec2;

/// Angular slice of a disc that reveals whatever lies inside it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sector {
    /// Apex of the sector.
    pub center: Vec2,
    /// Reach of the sector.
    pub radius: f32,
    /// One bound of the angular span, in radians.
    pub start: f32,
    /// Other bound of the angular span, in radians.
    pub end: f32,
    /// Strength in `[0, 1]`; sectors with zero weight reveal nothing.
    pub weight: f32,
}

impl Sector {
    /// Reports whether the sector is active and contains `point`.
    ///
    /// The span runs counter-clockwise from the smaller bound, so a sector
    /// from `3.0` to `-3.0` covers bearing `0.0`.
    #[must_use]
    pub fn contains_point(&self, point: Vec2) -> bool {
        self.touches_circle(point, 0.0)
    }

    /// Reports whether the sector is active and reaches any part of the circle.
    ///
    /// A circle whose center bears inside the span touches once it reaches the
    /// arc. Any other circle touches only by reaching one of the two edges.
    #[must_use]
    pub fn touches_circle(&self, center: Vec2, radius: f32) -> bool {
        if self.weight <= 0.0 {
            return false;
        }
        if self.center.distance(center) > self.radius + radius {
            return false;
        }
        if angle_in_span(bearing(self.center, center), self.start, self.end) {
            return true;
        }
        let body = Circle::new(center, radius);
        [self.start, self.end].into_iter().any(|angle| {
            let rim = self.center + Vec2::from_angle(angle) * self.radius;
            Segment::new(self.center, rim).intersects_circle(&body)
        })
    }
}

/// Beacon that carries a rotating sector.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Beacon {
    pub(crate) id: StructureId,
    pub(crate) center: Vec2,
    pub(crate) spec: SectorSpec,
    pub(crate) placed_at: u64,
}

impl Beacon {
    /// Sector swept by the beacon at `tick`.
    pub(crate) fn sector_at(&self, tick: u64, fade_ticks: u32) -> Sector {
        let age = tick.saturating_sub(self.placed_at);
        let heading = self.spec.angular_speed * age as f32;
        let weight = if fade_ticks == 0 {
            1.0
        } else {
            (age as f32 / fade_ticks as f32).min(1.0)
        };
        Sector {
            center: self.center,
            radius: self.spec.radius,
            start: heading - self.spec.half_width,
            end: heading + self.spec.half_width,
            weight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

    fn sector(start: f32, end: f32) -> Sector {
        Sector {
            center: Vec2::ZERO,
            radius: 100.0,
            start,
            end,
            weight: 1.0,
        }
    }

    #[test]
    fn span_crossing_the_seam_contains_bearing_zero() {
        let seam = sector(3.0, -3.0);
        assert!(seam.contains_point(Vec2::new(50.0, 0.0)));
        assert!(seam.contains_point(Vec2::new(0.0, 50.0)));
    }

    #[test]
    fn narrow_span_around_the_seam() {
        let seam = sector(-0.2, 0.2);
        assert!(seam.contains_point(Vec2::new(50.0, 0.0)));
        assert!(seam.contains_point(Vec2::new(50.0, -5.0)));
        assert!(!seam.contains_point(Vec2::new(0.0, 50.0)));
    }

    #[test]
    fn reach_and_weight_gate_the_sector() {
        let mut beam = sector(0.0, FRAC_PI_2);
        assert!(beam.contains_point(Vec2::new(30.0, 30.0)));
        assert!(!beam.contains_point(Vec2::new(90.0, 90.0)));
        beam.weight = 0.0;
        assert!(!beam.contains_point(Vec2::new(30.0, 30.0)));
    }

    #[test]
    fn circles_grazing_the_edge_are_touched() {
        let beam = sector(0.0, 0.1);
        assert!(!beam.contains_point(Vec2::new(50.0, -3.0)));
        assert!(beam.touches_circle(Vec2::new(50.0, -3.0), 4.0));
        assert!(beam.touches_circle(Vec2::new(103.0, 0.0), 4.0));
    }

    #[test]
    fn circles_past_the_arc_corner_must_reach_the_corner() {
        let quarter = sector(0.0, FRAC_PI_2);
        // Nearest sector point is the corner at (100, 0), about 4.47 away.
        assert!(!quarter.touches_circle(Vec2::new(102.0, -4.0), 4.3));
        assert!(quarter.touches_circle(Vec2::new(102.0, -4.0), 4.6));
        assert!(!quarter.touches_circle(Vec2::new(-4.0, 102.0), 4.3));

        let mid = Vec2::from_angle(FRAC_PI_4) * 105.0;
        assert!(quarter.touches_circle(mid, 6.0));
        assert!(!quarter.touches_circle(mid, 4.0));
    }

    #[test]
    fn circle_around_the_apex_touches_any_active_sector() {
        let beam = sector(1.0, 1.1);
        assert!(beam.touches_circle(Vec2::new(-2.0, -2.0), 3.0));
        assert!(!beam.touches_circle(Vec2::new(-20.0, -20.0), 3.0));
    }

    #[test]
    fn beacons_rotate_and_fade_in() {
        let beacon = Beacon {
            id: StructureId::new(0),
            center: Vec2::ZERO,
            spec: SectorSpec {
                radius: 200.0,
                half_width: 0.25,
                angular_speed: 0.1,
            },
            placed_at: 10,
        };
        let fresh = beacon.sector_at(10, 30);
        assert_eq!(fresh.weight, 0.0);
        let later = beacon.sector_at(40, 30);
        assert_eq!(later.weight, 1.0);
        assert!((later.start - 2.75).abs() < 1e-5);
        assert!((later.end - 3.25).abs() < 1e-5);
    }
}
