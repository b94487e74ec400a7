//! The protection polygon: a 4-vertex convex quadrilateral in world
//! coordinates that filters vision detections down to the pickable region.

/// A configured 4-vertex protection polygon.
///
/// Inclusion is tested by sorting a *copy* of the vertices by polar angle
/// around their centroid before ray-casting, so the predicate is invariant
/// to the order the 4 vertices were supplied in — the stored vertex order
/// itself is never mutated.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProtectionPolygon {
    vertices: [(f64, f64); 4],
}

impl ProtectionPolygon {
    pub fn new(vertices: [(f64, f64); 4]) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> [(f64, f64); 4] {
        self.vertices
    }

    /// Ray-cast point-in-polygon test, robust to the input vertex order.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let sorted = Self::sorted_by_polar_angle(self.vertices);
        Self::ray_cast(&sorted, x, y)
    }

    fn centroid(vertices: [(f64, f64); 4]) -> (f64, f64) {
        let sum_x: f64 = vertices.iter().map(|p| p.0).sum();
        let sum_y: f64 = vertices.iter().map(|p| p.1).sum();
        (sum_x / 4.0, sum_y / 4.0)
    }

    fn sorted_by_polar_angle(vertices: [(f64, f64); 4]) -> [(f64, f64); 4] {
        let (cx, cy) = Self::centroid(vertices);
        let mut sorted = vertices;
        sorted.sort_by(|a, b| {
            let angle_a = (a.1 - cy).atan2(a.0 - cx);
            let angle_b = (b.1 - cy).atan2(b.0 - cx);
            angle_a.partial_cmp(&angle_b).expect("polygon coordinates are finite")
        });
        sorted
    }

    fn ray_cast(poly: &[(f64, f64); 4], x: f64, y: f64) -> bool {
        let mut inside = false;
        let mut j = poly.len() - 1;
        for i in 0..poly.len() {
            let (xi, yi) = poly[i];
            let (xj, yj) = poly[j];
            if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SQUARE: [(f64, f64); 4] = [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];

    #[test]
    fn contains_point_strictly_inside() {
        let poly = ProtectionPolygon::new(SQUARE);
        assert!(poly.contains(5.0, 5.0));
    }

    #[test]
    fn excludes_point_strictly_outside() {
        let poly = ProtectionPolygon::new(SQUARE);
        assert!(!poly.contains(20.0, 20.0));
        assert!(!poly.contains(-1.0, 5.0));
    }

    #[test]
    fn permutation_of_vertices_does_not_change_membership() {
        let rotations = [
            [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)],
            [(10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)],
            [(10.0, 10.0), (0.0, 10.0), (0.0, 0.0), (10.0, 0.0)],
            [(0.0, 10.0), (0.0, 0.0), (10.0, 0.0), (10.0, 10.0)],
        ];
        for vertices in rotations {
            let poly = ProtectionPolygon::new(vertices);
            assert!(poly.contains(5.0, 5.0));
            assert!(!poly.contains(50.0, 50.0));
        }
    }

    fn any_square_permutation() -> impl Strategy<Value = [(f64, f64); 4]> {
        prop::sample::select(vec![
            [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)],
            [(10.0, 0.0), (0.0, 0.0), (0.0, 10.0), (10.0, 10.0)],
            [(10.0, 10.0), (10.0, 0.0), (0.0, 0.0), (0.0, 10.0)],
            [(0.0, 10.0), (10.0, 10.0), (10.0, 0.0), (0.0, 0.0)],
            [(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0)],
        ])
    }

    proptest! {
        #[test]
        fn permutation_invariance_holds_for_sampled_points(
            vertices in any_square_permutation(),
            px in -5.0f64..15.0,
            py in -5.0f64..15.0,
        ) {
            let reference = ProtectionPolygon::new(SQUARE).contains(px, py);
            let permuted = ProtectionPolygon::new(vertices).contains(px, py);
            prop_assert_eq!(reference, permuted);
        }
    }
}
