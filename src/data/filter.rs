use super::model::PointCloud;

// ---------------------------------------------------------------------------
// Footprint predicate: which points lie inside the picked square
// ---------------------------------------------------------------------------

/// Axis-aligned XY bounding box of a set of picked corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl Footprint {
    /// Bounding box of the corners' XY coordinates; Z is ignored.
    ///
    /// Returns `None` when no corners are given.
    pub fn from_corners(corners: &[[f64; 3]]) -> Option<Self> {
        let (first, rest) = corners.split_first()?;
        let mut fp = Footprint {
            min: [first[0], first[1]],
            max: [first[0], first[1]],
        };
        for c in rest {
            fp.min = [fp.min[0].min(c[0]), fp.min[1].min(c[1])];
            fp.max = [fp.max[0].max(c[0]), fp.max[1].max(c[1])];
        }
        Some(fp)
    }

    /// Inclusive on all four edges.
    pub fn contains(&self, point: &[f64; 3]) -> bool {
        (self.min[0]..=self.max[0]).contains(&point[0])
            && (self.min[1]..=self.max[1]).contains(&point[1])
    }
}

/// Return indices of points whose XY position falls inside the footprint.
pub fn filtered_indices(cloud: &PointCloud, footprint: &Footprint) -> Vec<usize> {
    cloud
        .positions
        .iter()
        .enumerate()
        .filter(|(_, p)| footprint.contains(p))
        .map(|(i, _)| i)
        .collect()
}

/// Convenience: footprint of `corners`, then [`filtered_indices`].
pub fn select_in_footprint(cloud: &PointCloud, corners: &[[f64; 3]]) -> Vec<usize> {
    match Footprint::from_corners(corners) {
        Some(fp) => filtered_indices(cloud, &fp),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use palette::Srgb;

    use super::*;

    fn cloud(positions: Vec<[f64; 3]>) -> PointCloud {
        let colors = vec![Srgb::new(0.0, 0.0, 0.0); positions.len()];
        PointCloud::new(positions, colors).unwrap()
    }

    #[test]
    fn footprint_spans_all_corners() {
        // Corners given in arbitrary order, slightly skewed.
        let fp = Footprint::from_corners(&[
            [1.0, 0.1, 5.0],
            [0.0, 0.0, 0.0],
            [0.1, 1.0, -2.0],
            [1.1, 1.2, 0.0],
        ])
        .unwrap();
        assert_eq!(fp.min, [0.0, 0.0]);
        assert_eq!(fp.max, [1.1, 1.2]);
    }

    #[test]
    fn no_corners_selects_nothing() {
        assert!(Footprint::from_corners(&[]).is_none());
        assert!(select_in_footprint(&cloud(vec![[0.0; 3]]), &[]).is_empty());
    }

    #[test]
    fn selection_is_inclusive_and_ignores_z() {
        let c = cloud(vec![
            [0.5, 0.5, 100.0], // inside, far above
            [1.0, 1.0, 0.0],   // on the corner
            [0.0, 0.7, 0.0],   // on an edge
            [1.01, 0.5, 0.0],  // just outside in x
            [0.5, -0.01, 0.0], // just outside in y
        ]);
        let corners = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]];
        assert_eq!(select_in_footprint(&c, &corners), vec![0, 1, 2]);
    }
}
