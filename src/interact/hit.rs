//! Hit-test service
//!
//! Candidates are recorded while the draw pass walks the scene; the best
//! one becomes the hit result promoted at the start of the next frame.
//! Ranking is by pixel distance to the candidate rectangle, falling back to
//! candidate area when two distances tie within a noise threshold, so a
//! small port pin wins over the node body that contains it.

use crate::constants::hit;
use crate::graph::store::{NodeId, PortId};
use egui::{Pos2, Rect};

/// What a hit candidate refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Node(NodeId),
    Port(PortId),
    /// Inline value editor box of a port
    Editor(PortId),
    /// Row in the add-node menu, by registry type index
    MenuItem(usize),
}

#[derive(Debug, Clone, Copy)]
pub struct HitCandidate {
    pub target: HitTarget,
    /// Distance from the pointer to the candidate rectangle, 0 inside
    pub distance: f32,
    /// Candidate rectangle area; the tie-breaker
    pub area: f32,
}

/// Minimum distance from a point to any point within a rectangle.
pub fn distance_point_to_rect(point: Pos2, rect: Rect) -> f32 {
    let closest_x = point.x.clamp(rect.min.x, rect.max.x);
    let closest_y = point.y.clamp(rect.min.y, rect.max.y);
    let dx = point.x - closest_x;
    let dy = point.y - closest_y;
    (dx * dx + dy * dy).sqrt()
}

#[derive(Debug, Default)]
pub struct HitTester {
    /// Pointer position for the current frame
    pub mouse: Pos2,
    /// Best candidate resolved from the previous frame's draw pass
    result: Option<HitCandidate>,
    /// Candidates accumulate here during the current frame
    partial: Option<HitCandidate>,
}

impl HitTester {
    pub fn new() -> Self {
        Self::default()
    }

    /// Promotes the previous frame's best candidate to the current result.
    pub fn new_frame(&mut self, mouse: Pos2) {
        self.mouse = mouse;
        self.result = self.partial.take();
    }

    /// Is the pointer within the padded rectangle? Cheap pre-filter before
    /// recording a candidate.
    pub fn hit_test_rect(&self, rect: Rect) -> bool {
        self.mouse.x >= rect.min.x - hit::MAX_DISTANCE
            && self.mouse.x < rect.max.x + hit::MAX_DISTANCE
            && self.mouse.y >= rect.min.y - hit::MAX_DISTANCE
            && self.mouse.y < rect.max.y + hit::MAX_DISTANCE
    }

    fn better(new: &HitCandidate, old: &HitCandidate) -> bool {
        if old.distance >= hit::NOISE_THRESHOLD && new.distance < old.distance {
            return true;
        }
        if new.distance >= hit::NOISE_THRESHOLD {
            return false;
        }
        new.area < old.area
    }

    /// Records a candidate if the pointer is near its rectangle.
    pub fn record(&mut self, target: HitTarget, rect: Rect) {
        if !self.hit_test_rect(rect) {
            return;
        }
        let candidate = HitCandidate {
            target,
            distance: distance_point_to_rect(self.mouse, rect),
            area: rect.width() * rect.height(),
        };
        match &self.partial {
            Some(old) if !Self::better(&candidate, old) => {}
            _ => self.partial = Some(candidate),
        }
    }

    pub fn result(&self) -> Option<&HitCandidate> {
        self.result.as_ref()
    }

    /// Replaces the resolved target for this frame. Used while connecting,
    /// when a hovered node body stands in for its single compatible port.
    pub fn retarget(&mut self, target: HitTarget) {
        if let Some(result) = &mut self.result {
            result.target = target;
        }
    }

    pub fn clear_result(&mut self) {
        self.result = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::{Pos2, Rect, Vec2};

    fn resolve(tester: &mut HitTester) {
        // Candidates resolve on the following frame
        let mouse = tester.mouse;
        tester.new_frame(mouse);
    }

    #[test]
    fn test_port_wins_over_enclosing_node() {
        let mut tester = HitTester::new();
        tester.new_frame(Pos2::new(105.0, 105.0));

        let node_rect = Rect::from_min_size(Pos2::new(50.0, 50.0), Vec2::new(200.0, 150.0));
        let port_rect = Rect::from_min_size(Pos2::new(100.0, 100.0), Vec2::new(15.0, 15.0));
        tester.record(HitTarget::Node(0), node_rect);
        tester.record(HitTarget::Port(3), port_rect);

        resolve(&mut tester);
        assert_eq!(tester.result().unwrap().target, HitTarget::Port(3));
    }

    #[test]
    fn test_record_order_does_not_matter() {
        let mut tester = HitTester::new();
        tester.new_frame(Pos2::new(105.0, 105.0));

        let node_rect = Rect::from_min_size(Pos2::new(50.0, 50.0), Vec2::new(200.0, 150.0));
        let port_rect = Rect::from_min_size(Pos2::new(100.0, 100.0), Vec2::new(15.0, 15.0));
        tester.record(HitTarget::Port(3), port_rect);
        tester.record(HitTarget::Node(0), node_rect);

        resolve(&mut tester);
        assert_eq!(tester.result().unwrap().target, HitTarget::Port(3));
    }

    #[test]
    fn test_area_breaks_ties_within_noise_threshold() {
        let mut tester = HitTester::new();
        tester.new_frame(Pos2::new(0.0, 50.0));

        // Both within the noise threshold of the pointer; the small target
        // wins even though it sits a pixel farther away.
        let near_big = Rect::from_min_size(Pos2::new(1.0, 0.0), Vec2::new(300.0, 300.0));
        let far_small = Rect::from_min_size(Pos2::new(2.0, 45.0), Vec2::new(10.0, 10.0));
        tester.record(HitTarget::Node(2), near_big);
        tester.record(HitTarget::Node(1), far_small);

        resolve(&mut tester);
        assert_eq!(tester.result().unwrap().target, HitTarget::Node(1));
    }

    #[test]
    fn test_pointer_far_from_everything_hits_nothing() {
        let mut tester = HitTester::new();
        tester.new_frame(Pos2::new(500.0, 500.0));
        tester.record(
            HitTarget::Node(0),
            Rect::from_min_size(Pos2::new(0.0, 0.0), Vec2::new(100.0, 100.0)),
        );
        resolve(&mut tester);
        assert!(tester.result().is_none());
    }
}
