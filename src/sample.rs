use geo::{Area, BoundingRect, Contains, Point, Polygon};
use rand::Rng;

use crate::error::SampleError;

/// Hard ceiling on rejection draws, guards near-degenerate rings whose area
/// is a vanishing fraction of their bounding rect.
const MAX_DRAWS: u32 = 100_000;

/// Returns a uniformly-drawn point strictly inside `polygon`.
///
/// Rejection-samples the axis-aligned bounding rect until a contained point is
/// found. Boundary points test as outside. The polygon must have non-zero area
/// or sampling would never terminate, so degenerate input is rejected up front.
pub fn random_point_in(
    polygon: &Polygon<f64>,
    rng: &mut impl Rng,
) -> Result<Point<f64>, SampleError> {
    if polygon.unsigned_area() == 0.0 {
        return Err(SampleError::DegenerateGeometry);
    }
    let rect = polygon
        .bounding_rect()
        .ok_or(SampleError::DegenerateGeometry)?;
    let (min, max) = (rect.min(), rect.max());

    for _ in 0..MAX_DRAWS {
        let point = Point::new(
            rng.random_range(min.x..=max.x),
            rng.random_range(min.y..=max.y),
        );
        if polygon.contains(&point) {
            return Ok(point);
        }
    }
    Err(SampleError::Exhausted(MAX_DRAWS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Contains, Coord, LineString};
    use rand::{SeedableRng, rngs::StdRng};

    fn ring(coords: &[(f64, f64)]) -> LineString<f64> {
        LineString(coords.iter().map(|&(x, y)| Coord { x, y }).collect())
    }

    #[test]
    fn square_contains_sampled_points() {
        let square = Polygon::new(
            ring(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0), (0.0, 0.0)]),
            vec![],
        );
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let point = random_point_in(&square, &mut rng).unwrap();
            assert!(square.contains(&point));
        }
    }

    #[test]
    fn non_convex_contains_sampled_points() {
        // L-shape: the bounding rect's upper-right quadrant is outside.
        let ell = Polygon::new(
            ring(&[
                (0.0, 0.0),
                (2.0, 0.0),
                (2.0, 1.0),
                (1.0, 1.0),
                (1.0, 2.0),
                (0.0, 2.0),
                (0.0, 0.0),
            ]),
            vec![],
        );
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let point = random_point_in(&ell, &mut rng).unwrap();
            assert!(ell.contains(&point));
        }
    }

    #[test]
    fn random_star_polygons_contain_sampled_points() {
        // Star-shaped (simple, generally non-convex) polygons around the origin.
        let mut rng = StdRng::seed_from_u64(13);
        for _ in 0..20 {
            let sides = rng.random_range(3..12);
            let coords: Vec<(f64, f64)> = (0..sides)
                .map(|i| {
                    let angle = (i as f64) / (sides as f64) * std::f64::consts::TAU;
                    let radius = rng.random_range(0.5..2.0);
                    (radius * angle.cos(), radius * angle.sin())
                })
                .collect();
            let mut closed = coords.clone();
            closed.push(coords[0]);
            let polygon = Polygon::new(ring(&closed), vec![]);

            let point = random_point_in(&polygon, &mut rng).unwrap();
            assert!(polygon.contains(&point));
        }
    }

    #[test]
    fn zero_area_polygon_is_rejected() {
        // All points collinear, zero area: must fail fast, not loop.
        let sliver = Polygon::new(
            ring(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (0.0, 0.0)]),
            vec![],
        );
        let mut rng = StdRng::seed_from_u64(17);
        assert_eq!(
            random_point_in(&sliver, &mut rng),
            Err(SampleError::DegenerateGeometry)
        );
    }

    #[test]
    fn point_with_hole_avoids_hole() {
        let donut = Polygon::new(
            ring(&[(0.0, 0.0), (6.0, 0.0), (6.0, 6.0), (0.0, 6.0), (0.0, 0.0)]),
            vec![ring(&[
                (2.0, 2.0),
                (4.0, 2.0),
                (4.0, 4.0),
                (2.0, 4.0),
                (2.0, 2.0),
            ])],
        );
        let mut rng = StdRng::seed_from_u64(19);
        for _ in 0..100 {
            let point = random_point_in(&donut, &mut rng).unwrap();
            assert!(donut.contains(&point));
        }
    }
}
