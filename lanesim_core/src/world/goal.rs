use crate::geometry::{point, Point2d, Polygon2d};

/// Goal region an agent should reach.
#[derive(Debug, Clone, PartialEq)]
pub struct GoalDefinitionPolygon {
    polygon: Polygon2d,
}

impl GoalDefinitionPolygon {
    pub fn new(polygon: Polygon2d) -> Self {
        Self { polygon }
    }

    /// Axis-aligned square centered on `center`.
    pub fn around(center: Point2d, half_size: f64) -> Self {
        Self::new(Polygon2d::from_points(vec![
            point(center.x - half_size, center.y - half_size),
            point(center.x + half_size, center.y - half_size),
            point(center.x + half_size, center.y + half_size),
            point(center.x - half_size, center.y + half_size),
        ]))
    }

    pub fn polygon(&self) -> &Polygon2d {
        &self.polygon
    }

    pub fn at_goal(&self, position: Point2d) -> bool {
        self.polygon.contains_point(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goal_around_point() {
        let goal = GoalDefinitionPolygon::around(point(50.0, 0.0), 2.0);
        assert!(goal.at_goal(point(51.5, -1.0)));
        assert!(goal.at_goal(point(52.0, 0.0)));
        assert!(!goal.at_goal(point(47.0, 0.0)));
    }
}
