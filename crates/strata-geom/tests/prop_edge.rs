use proptest::prelude::*;
use proptest::strategy::Strategy;
use strata_geom::{Edge, Line, Vec2};

fn approx_abs_rel(a: f32, b: f32, atol: f32, rtol: f32) -> bool {
    let diff = (a - b).abs();
    let scale = a.abs().max(b.abs());
    diff <= atol + rtol * scale
}

fn coord() -> impl Strategy<Value = f32> {
    -1_000.0f32..1_000.0
}

fn arb_vec2() -> impl Strategy<Value = Vec2> {
    (coord(), coord()).prop_map(|(x, y)| Vec2::new(x, y))
}

fn arb_edge() -> impl Strategy<Value = Edge> {
    (arb_vec2(), arb_vec2()).prop_map(|(a, b)| Edge::new(a, b))
}

proptest! {
    // Intersection is symmetric in argument order
    #[test]
    fn intersects_is_symmetric(e in arb_edge(), f in arb_edge()) {
        prop_assert_eq!(e.intersects(&f), f.intersects(&e));
    }

    // Every segment intersects itself
    #[test]
    fn segment_intersects_itself(e in arb_edge()) {
        prop_assert!(e.intersects(&e));
    }

    // Distance to a segment never exceeds distance to either endpoint
    #[test]
    fn dist_sq_bounded_by_endpoints(e in arb_edge(), p in arb_vec2()) {
        let d = e.dist_sq(p);
        prop_assert!(d >= 0.0);
        prop_assert!(d <= p.distance_sq(e.a) * (1.0 + 1e-5) + 1e-3);
        prop_assert!(d <= p.distance_sq(e.b) * (1.0 + 1e-5) + 1e-3);
    }

    // Points on the segment are at distance zero (up to rounding)
    #[test]
    fn points_on_segment_have_zero_distance(e in arb_edge(), t in 0.0f32..=1.0) {
        let p = e.a.lerp(e.b, t);
        let scale = e.a.length_sq().max(e.b.length_sq()).max(1.0);
        prop_assert!(e.dist_sq(p) <= 1e-6 * scale);
    }

    // Bisector intersections are equidistant from all three generating points
    #[test]
    fn bisector_intersection_is_circumcenter(
        p in arb_vec2(),
        q in arb_vec2(),
        r in arb_vec2(),
    ) {
        prop_assume!(p.distance(q) > 1.0 && p.distance(r) > 1.0);
        let l1 = Line::bisector(p, q);
        let l2 = Line::bisector(p, r);
        if let Some(c) = l1.intersect(&l2) {
            let dp = c.distance(p);
            let dq = c.distance(q);
            let dr = c.distance(r);
            // Near-collinear triples push the center far away; loosen with distance.
            let tol = 1e-2 * dp.max(1.0);
            prop_assert!(approx_abs_rel(dp, dq, tol, 1e-3));
            prop_assert!(approx_abs_rel(dp, dr, tol, 1e-3));
        }
    }
}
