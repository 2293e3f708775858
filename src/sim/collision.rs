//! Proximity tests for the lane
//!
//! Gates hit with a rectangular region: independent thresholds on each axis.
//! Target arrival and gate culling are single-axis line tests.

use glam::Vec2;

/// Half-extents of a gate's hit rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitBox {
    pub half_width: f32,
    pub half_height: f32,
}

impl HitBox {
    pub fn new(half_width: f32, half_height: f32) -> Self {
        Self {
            half_width,
            half_height,
        }
    }

    /// Whether `point` lies inside the box centred on `center` (edges inclusive)
    #[inline]
    pub fn contains(&self, center: Vec2, point: Vec2) -> bool {
        let delta = (point - center).abs();
        delta.x <= self.half_width && delta.y <= self.half_height
    }
}

/// Index of the first gate whose hit box contains the unit
pub fn first_gate_hit<'a, I>(unit_pos: Vec2, gates: I, hit: HitBox) -> Option<usize>
where
    I: IntoIterator<Item = &'a Vec2>,
{
    gates
        .into_iter()
        .position(|&gate_pos| hit.contains(gate_pos, unit_pos))
}

/// Unit has crossed the target line
#[inline]
pub fn reached_target(pos: Vec2, target_x: f32) -> bool {
    pos.x >= target_x
}

/// Gate has left the far side of the playfield
#[inline]
pub fn past_cull_line(pos: Vec2, cull_x: f32) -> bool {
    pos.x < cull_x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_box_is_rectangular() {
        let hit = HitBox::new(10.0, 30.0);
        let gate = Vec2::new(100.0, 100.0);

        assert!(hit.contains(gate, Vec2::new(100.0, 100.0)));
        // Corner of the rectangle is inside; a circle of radius 30 would miss it
        assert!(hit.contains(gate, Vec2::new(110.0, 130.0)));
        // Inside the tall axis but outside the narrow one
        assert!(!hit.contains(gate, Vec2::new(115.0, 100.0)));
        assert!(!hit.contains(gate, Vec2::new(100.0, 131.0)));
    }

    #[test]
    fn test_first_gate_hit_wins() {
        let hit = HitBox::new(10.0, 10.0);
        let gates = [
            Vec2::new(0.0, 0.0),
            Vec2::new(50.0, 50.0),
            Vec2::new(52.0, 50.0),
        ];
        assert_eq!(first_gate_hit(Vec2::new(51.0, 50.0), &gates, hit), Some(1));
        assert_eq!(first_gate_hit(Vec2::new(200.0, 0.0), &gates, hit), None);
    }

    #[test]
    fn test_line_tests() {
        assert!(reached_target(Vec2::new(440.0, 0.0), 440.0));
        assert!(!reached_target(Vec2::new(439.9, 0.0), 440.0));
        assert!(past_cull_line(Vec2::new(-21.0, 0.0), -20.0));
        assert!(!past_cull_line(Vec2::new(-20.0, 0.0), -20.0));
    }
}
