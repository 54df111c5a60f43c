use crate::shared::region::Region;

/// Collapses nested duplicate detections into one region per face.
///
/// Detectors report the same face several times at different scales, each
/// box nested inside a larger one. The largest box always survives and comes
/// first; every other box survives only if no already-kept box contains it.
/// Disjoint or partially overlapping boxes are distinct faces and are kept.
///
/// Returns an empty list for empty input.
pub fn select_regions(regions: &[Region]) -> Vec<Region> {
    let Some(largest_idx) = largest_index(regions) else {
        return Vec::new();
    };

    let mut kept: Vec<Region> = Vec::with_capacity(regions.len());
    kept.push(regions[largest_idx]);

    for (idx, r) in regions.iter().enumerate() {
        if idx == largest_idx {
            continue;
        }
        if !kept.iter().any(|k| k.contains(r)) {
            kept.push(*r);
        }
    }
    kept
}

/// Index of the first region with the maximal area.
fn largest_index(regions: &[Region]) -> Option<usize> {
    regions
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, i64)>, (idx, r)| match best {
            Some((_, area)) if area >= r.area() => best,
            _ => Some((idx, r.area())),
        })
        .map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn region(x: i32, y: i32, w: i32, h: i32) -> Region {
        Region::new(x, y, w, h)
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        assert!(select_regions(&[]).is_empty());
    }

    #[test]
    fn test_single_region_is_kept() {
        let regions = vec![region(5, 5, 40, 40)];
        assert_eq!(select_regions(&regions), regions);
    }

    #[test]
    fn test_largest_comes_first() {
        let small = region(0, 0, 10, 10);
        let large = region(100, 100, 80, 80);
        let result = select_regions(&[small, large]);
        assert_eq!(result, vec![large, small]);
    }

    #[test]
    fn test_nested_detection_is_dropped() {
        let outer = region(0, 0, 100, 100);
        let inner = region(20, 20, 40, 40);
        assert_eq!(select_regions(&[inner, outer]), vec![outer]);
    }

    #[test]
    fn test_nested_chain_collapses_to_outermost() {
        let regions = vec![
            region(10, 10, 60, 60),
            region(0, 0, 100, 100),
            region(20, 20, 20, 20),
        ];
        assert_eq!(select_regions(&regions), vec![region(0, 0, 100, 100)]);
    }

    #[test]
    fn test_box_inside_a_kept_secondary_face_is_dropped() {
        let big_face = region(0, 0, 100, 100);
        let other_face = region(200, 0, 60, 60);
        let dup_of_other = region(210, 10, 30, 30);
        let result = select_regions(&[other_face, dup_of_other, big_face]);
        assert_eq!(result, vec![big_face, other_face]);
    }

    #[rstest]
    #[case::disjoint(region(0, 0, 50, 50), region(300, 300, 20, 20))]
    #[case::side_by_side(region(0, 0, 50, 50), region(50, 0, 50, 50))]
    #[case::partial_overlap(region(0, 0, 100, 100), region(60, 60, 80, 80))]
    fn test_non_nested_faces_are_all_kept(#[case] a: Region, #[case] b: Region) {
        let result = select_regions(&[a, b]);
        assert_eq!(result.len(), 2);
        assert!(result.contains(&a));
        assert!(result.contains(&b));
    }

    #[test]
    fn test_area_tie_keeps_first_encountered_as_primary() {
        let first = region(0, 0, 40, 40);
        let second = region(100, 0, 40, 40);
        let result = select_regions(&[first, second]);
        assert_eq!(result[0], first);
        assert_eq!(result[1], second);
    }

    #[test]
    fn test_identical_duplicates_collapse() {
        let r = region(10, 10, 30, 30);
        assert_eq!(select_regions(&[r, r, r]), vec![r]);
    }

    #[test]
    fn test_result_always_contains_maximal_area() {
        let regions = vec![
            region(0, 0, 10, 10),
            region(5, 5, 200, 10),
            region(300, 0, 40, 40),
            region(310, 10, 5, 5),
        ];
        let max_area = regions.iter().map(Region::area).max().unwrap();
        let result = select_regions(&regions);
        assert_eq!(result[0].area(), max_area);
    }

    #[test]
    fn test_selection_is_idempotent() {
        let regions = vec![
            region(0, 0, 100, 100),
            region(10, 10, 30, 30),
            region(150, 0, 60, 60),
            region(90, 90, 40, 40),
            region(160, 10, 20, 20),
        ];
        let once = select_regions(&regions);
        let twice = select_regions(&once);
        assert_eq!(once, twice);
    }
}
