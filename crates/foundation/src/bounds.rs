use crate::math::Vec2;

/// Axis-aligned bounding box in the plane.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb2 {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl Aabb2 {
    pub fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        Aabb2 { min, max }
    }

    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Vec2>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut out = Self::new([first.x, first.y], [first.x, first.y]);
        for p in iter {
            out.include(p);
        }
        Some(out)
    }

    pub fn include(&mut self, p: Vec2) {
        self.min[0] = self.min[0].min(p.x);
        self.min[1] = self.min[1].min(p.y);
        self.max[0] = self.max[0].max(p.x);
        self.max[1] = self.max[1].max(p.y);
    }

    /// Smallest box covering both.
    pub fn union(self, other: Self) -> Self {
        Self::new(
            [self.min[0].min(other.min[0]), self.min[1].min(other.min[1])],
            [self.max[0].max(other.max[0]), self.max[1].max(other.max[1])],
        )
    }

    pub fn width(&self) -> f64 {
        self.max[0] - self.min[0]
    }

    pub fn height(&self) -> f64 {
        self.max[1] - self.min[1]
    }

    /// Length of the longer side; a convenient scale for tolerances.
    pub fn extent(&self) -> f64 {
        self.width().max(self.height())
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(
            0.5 * (self.min[0] + self.max[0]),
            0.5 * (self.min[1] + self.max[1]),
        )
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min[0] && p.x <= self.max[0] && p.y >= self.min[1] && p.y <= self.max[1]
    }

    pub fn intersects(&self, other: &Self) -> bool {
        self.min[0] <= other.max[0]
            && self.max[0] >= other.min[0]
            && self.min[1] <= other.max[1]
            && self.max[1] >= other.min[1]
    }
}

#[cfg(test)]
mod tests {
    use super::Aabb2;
    use crate::math::Vec2;

    #[test]
    fn grows_to_cover_points() {
        let b = Aabb2::from_points([
            Vec2::new(1.0, -2.0),
            Vec2::new(-3.0, 4.0),
            Vec2::new(0.0, 0.0),
        ])
        .unwrap();
        assert_eq!(b.min, [-3.0, -2.0]);
        assert_eq!(b.max, [1.0, 4.0]);
        assert_eq!(b.extent(), 6.0);
        assert!(b.contains(Vec2::new(0.5, 3.0)));
        assert!(!b.contains(Vec2::new(2.0, 0.0)));
    }

    #[test]
    fn union_covers_both_boxes() {
        let a = Aabb2::new([0.0, 0.0], [1.0, 1.0]);
        let b = Aabb2::new([-2.0, 0.5], [0.5, 3.0]);
        let u = a.union(b);
        assert_eq!(u.min, [-2.0, 0.0]);
        assert_eq!(u.max, [1.0, 3.0]);
    }

    #[test]
    fn empty_input_has_no_bounds() {
        assert!(Aabb2::from_points(std::iter::empty()).is_none());
    }
}
