use strata_geom::{Edge, Line, Vec2, segments_intersect};

fn approx_eq(a: f32, b: f32, eps: f32) -> bool {
    (a - b).abs() <= eps
}

fn vec2_approx_eq(a: Vec2, b: Vec2, eps: f32) -> bool {
    approx_eq(a.x, b.x, eps) && approx_eq(a.y, b.y, eps)
}

#[test]
fn vec2_ops() {
    let a = Vec2::new(1.0, 2.0);
    let b = Vec2::new(-3.0, 0.5);
    assert!(vec2_approx_eq(a + b, Vec2::new(-2.0, 2.5), 1e-6));
    assert!(vec2_approx_eq(a - b, Vec2::new(4.0, 1.5), 1e-6));
    assert!(vec2_approx_eq(a * 2.0, Vec2::new(2.0, 4.0), 1e-6));
    assert!(vec2_approx_eq(-a, Vec2::new(-1.0, -2.0), 1e-6));
    assert!(approx_eq(a.dot(b), -2.0, 1e-6));
    assert!(approx_eq(a.cross(b), 1.0 * 0.5 - 2.0 * -3.0, 1e-6));
    assert!(approx_eq(a.perp().dot(a), 0.0, 1e-6));
}

#[test]
fn bisector_is_equidistant() {
    let p = Vec2::new(0.2, 0.3);
    let q = Vec2::new(1.7, 0.9);
    let line = Line::bisector(p, q);
    for t in [-2.0f32, -0.5, 0.0, 0.75, 3.0] {
        let s = line.origin + line.dir * t;
        assert!(approx_eq(s.distance(p), s.distance(q), 1e-4));
    }
}

#[test]
fn orthogonal_bisectors_meet_at_corner() {
    let c = Vec2::new(0.5, 0.5);
    let east = Line::bisector(c, Vec2::new(1.5, 0.5));
    let north = Line::bisector(c, Vec2::new(0.5, 1.5));
    let hit = east.intersect(&north).expect("corner");
    assert!(vec2_approx_eq(hit, Vec2::new(1.0, 1.0), 1e-6));
}

#[test]
fn point_segment_distance_clamps_to_endpoints() {
    let e = Edge::new(Vec2::new(0.0, 0.0), Vec2::new(2.0, 0.0));
    assert!(approx_eq(e.dist_sq(Vec2::new(1.0, 1.0)), 1.0, 1e-6));
    assert!(approx_eq(e.dist_sq(Vec2::new(-1.0, 0.0)), 1.0, 1e-6));
    assert!(approx_eq(e.dist_sq(Vec2::new(3.0, 2.0)), 5.0, 1e-6));
}

#[test]
fn zero_length_segment_measures_to_endpoint() {
    let e = Edge::new(Vec2::new(1.0, 1.0), Vec2::new(1.0, 1.0));
    assert!(approx_eq(e.dist_sq(Vec2::new(2.0, 1.0)), 1.0, 1e-6));
    assert_eq!(e.project(Vec2::new(5.0, 5.0)), 0.0);
}

#[test]
fn banded_distance_interpolates_radius() {
    let e = Edge::new(Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0));
    // Wide at `a`, narrow at `b`.
    let near_a = e.banded_dist_sq(Vec2::new(0.0, 0.1), 0.2, 0.05);
    let near_b = e.banded_dist_sq(Vec2::new(1.0, 0.1), 0.2, 0.05);
    assert!(approx_eq(near_a, 0.25, 1e-5));
    assert!(approx_eq(near_b, 4.0, 1e-4));
    let mid = e.banded_dist_sq(Vec2::new(0.5, 0.0), 0.2, 0.05);
    assert_eq!(mid, 0.0);
    assert_eq!(e.banded_dist_sq(Vec2::new(0.5, 0.1), 0.0, 0.0), f32::MAX);
}

#[test]
fn segment_intersection_cases() {
    let o = Vec2::new(0.0, 0.0);
    // crossing
    assert!(segments_intersect(o, Vec2::new(1.0, 1.0), Vec2::new(0.0, 1.0), Vec2::new(1.0, 0.0)));
    // touching endpoint
    assert!(segments_intersect(o, Vec2::new(1.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(2.0, 1.0)));
    // collinear overlap
    assert!(segments_intersect(o, Vec2::new(2.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(3.0, 0.0)));
    // collinear disjoint
    assert!(!segments_intersect(o, Vec2::new(1.0, 0.0), Vec2::new(2.0, 0.0), Vec2::new(3.0, 0.0)));
    // parallel
    assert!(!segments_intersect(o, Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0), Vec2::new(1.0, 1.0)));
    // T short of contact
    assert!(!segments_intersect(o, Vec2::new(1.0, 0.0), Vec2::new(0.5, 0.1), Vec2::new(0.5, 1.0)));
}

#[test]
fn none_edge_from_missing_point() {
    let a = Some(Vec2::new(0.0, 0.0));
    assert!(Edge::from_points(a, None).is_none());
    assert!(Edge::from_points(None, a).is_none());
    assert!(!Edge::from_points(a, a).is_none());
    assert!(Edge::default().is_none());
}
