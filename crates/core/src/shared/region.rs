/// An axis-aligned face candidate in pixel coordinates.
///
/// `x`/`y` are the top-left corner. Detectors only emit regions with a
/// positive width and height.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
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

    pub fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// True when `inner` lies fully inside `self`. Shared edges count as inside.
    pub fn contains(&self, inner: &Region) -> bool {
        self.x <= inner.x
            && self.right() >= inner.right()
            && self.y <= inner.y
            && self.bottom() >= inner.bottom()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_derived_edges() {
        let r = Region::new(10, 20, 30, 40);
        assert_eq!(r.right(), 40);
        assert_eq!(r.bottom(), 60);
        assert_eq!(r.area(), 1200);
    }

    #[test]
    fn test_area_does_not_overflow_i32() {
        let r = Region::new(0, 0, 100_000, 100_000);
        assert_eq!(r.area(), 10_000_000_000);
    }

    #[rstest]
    #[case::strictly_inside(Region::new(0, 0, 100, 100), Region::new(25, 25, 50, 50), true)]
    #[case::identical(Region::new(10, 10, 50, 50), Region::new(10, 10, 50, 50), true)]
    #[case::shares_edges(Region::new(0, 0, 100, 100), Region::new(0, 0, 100, 40), true)]
    #[case::partial_overlap(Region::new(0, 0, 100, 100), Region::new(50, 50, 100, 100), false)]
    #[case::disjoint(Region::new(0, 0, 50, 50), Region::new(200, 200, 50, 50), false)]
    #[case::outer_inside_inner(Region::new(25, 25, 50, 50), Region::new(0, 0, 100, 100), false)]
    fn test_contains(#[case] outer: Region, #[case] inner: Region, #[case] expected: bool) {
        assert_eq!(outer.contains(&inner), expected);
    }
}
