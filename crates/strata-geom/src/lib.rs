//! Minimal 2D geometry for lattice meshes and river segments.
#![forbid(unsafe_code)]

use core::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// Cross products below this (relative to the operand lengths) are treated as parallel.
pub const PARALLEL_EPS: f32 = 1e-6;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };
    pub const MAX: Vec2 = Vec2 {
        x: f32::MAX,
        y: f32::MAX,
    };

    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn dot(self, rhs: Vec2) -> f32 {
        self.x * rhs.x + self.y * rhs.y
    }

    /// Z component of the 3D cross product (perp-dot).
    #[inline]
    pub fn cross(self, rhs: Vec2) -> f32 {
        self.x * rhs.y - self.y * rhs.x
    }

    /// Counter-clockwise perpendicular.
    #[inline]
    pub fn perp(self) -> Vec2 {
        Vec2::new(-self.y, self.x)
    }

    #[inline]
    pub fn length_sq(self) -> f32 {
        self.dot(self)
    }

    #[inline]
    pub fn length(self) -> f32 {
        self.length_sq().sqrt()
    }

    #[inline]
    pub fn distance_sq(self, other: Vec2) -> f32 {
        (self - other).length_sq()
    }

    #[inline]
    pub fn distance(self, other: Vec2) -> f32 {
        self.distance_sq(other).sqrt()
    }

    #[inline]
    pub fn normalized(self) -> Vec2 {
        let len = self.length();
        if len > 0.0 { self / len } else { self }
    }

    #[inline]
    pub fn lerp(self, to: Vec2, t: f32) -> Vec2 {
        self + (to - self) * t
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    #[inline]
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    #[inline]
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    #[inline]
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vec2 {
    #[inline]
    fn sub_assign(&mut self, rhs: Vec2) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    #[inline]
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f32> for Vec2 {
    type Output = Vec2;
    #[inline]
    fn div(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    #[inline]
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

/// Infinite line through `origin` along `dir`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Line {
    pub origin: Vec2,
    pub dir: Vec2,
}

impl Line {
    #[inline]
    pub const fn new(origin: Vec2, dir: Vec2) -> Self {
        Self { origin, dir }
    }

    /// Perpendicular bisector of `p`-`q`: passes through the midpoint, with
    /// `dir` the counter-clockwise perpendicular of `q - p`.
    #[inline]
    pub fn bisector(p: Vec2, q: Vec2) -> Self {
        Self {
            origin: (p + q) * 0.5,
            dir: (q - p).perp(),
        }
    }

    /// Intersection point, or `None` for parallel/coincident lines.
    pub fn intersect(&self, other: &Line) -> Option<Vec2> {
        let denom = self.dir.cross(other.dir);
        let scale = self.dir.length() * other.dir.length();
        if !(denom.abs() > PARALLEL_EPS * scale) {
            return None;
        }
        let t = (other.origin - self.origin).cross(other.dir) / denom;
        let hit = self.origin + self.dir * t;
        hit.is_finite().then_some(hit)
    }
}

/// Directed segment `a -> b`. `Edge::NONE` marks a culled or degenerate slot.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct Edge {
    pub a: Vec2,
    pub b: Vec2,
}

impl Default for Edge {
    fn default() -> Self {
        Edge::NONE
    }
}

impl Edge {
    pub const NONE: Edge = Edge {
        a: Vec2::MAX,
        b: Vec2::MAX,
    };

    #[inline]
    pub const fn new(a: Vec2, b: Vec2) -> Self {
        Self { a, b }
    }

    /// Builds an edge from two optional endpoints, `NONE` if either is missing.
    #[inline]
    pub fn from_points(a: Option<Vec2>, b: Option<Vec2>) -> Self {
        match (a, b) {
            (Some(a), Some(b)) => Edge::new(a, b),
            _ => Edge::NONE,
        }
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        self.a == Vec2::MAX || self.b == Vec2::MAX
    }

    #[inline]
    pub fn direction(&self) -> Vec2 {
        self.b - self.a
    }

    #[inline]
    pub fn length(&self) -> f32 {
        self.direction().length()
    }

    #[inline]
    pub fn midpoint(&self) -> Vec2 {
        (self.a + self.b) * 0.5
    }

    /// Parameter of the projection of `p` onto the segment, clamped to `[0, 1]`.
    #[inline]
    pub fn project(&self, p: Vec2) -> f32 {
        let d = self.direction();
        let len_sq = d.length_sq();
        if len_sq <= 0.0 {
            return 0.0;
        }
        ((p - self.a).dot(d) / len_sq).clamp(0.0, 1.0)
    }

    #[inline]
    pub fn dist_sq(&self, p: Vec2) -> f32 {
        let t = self.project(p);
        p.distance_sq(self.a.lerp(self.b, t))
    }

    /// Squared distance to `p` divided by the squared band radius at the
    /// closest point, where the radius runs linearly from `radius_a` at `a`
    /// to `radius_b` at `b`. Values below 1 lie inside the band.
    pub fn banded_dist_sq(&self, p: Vec2, radius_a: f32, radius_b: f32) -> f32 {
        let t = self.project(p);
        let d_sq = p.distance_sq(self.a.lerp(self.b, t));
        let r = radius_a + (radius_b - radius_a) * t;
        if r <= 0.0 {
            return f32::MAX;
        }
        d_sq / (r * r)
    }

    /// Inclusive intersection test: touching endpoints and collinear overlap count.
    pub fn intersects(&self, other: &Edge) -> bool {
        segments_intersect(self.a, self.b, other.a, other.b)
    }
}

#[inline]
fn orient(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    (b - a).cross(c - a)
}

#[inline]
fn within_box(a: Vec2, b: Vec2, p: Vec2) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

pub fn segments_intersect(p1: Vec2, p2: Vec2, q1: Vec2, q2: Vec2) -> bool {
    let d1 = orient(q1, q2, p1);
    let d2 = orient(q1, q2, p2);
    let d3 = orient(p1, p2, q1);
    let d4 = orient(p1, p2, q2);
    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }
    (d1 == 0.0 && within_box(q1, q2, p1))
        || (d2 == 0.0 && within_box(q1, q2, p2))
        || (d3 == 0.0 && within_box(p1, p2, q1))
        || (d4 == 0.0 && within_box(p1, p2, q2))
}
