use strata_geom::{Edge, PARALLEL_EPS, Vec2};

use crate::lattice::{LatticeCell, mix, rand};
use crate::worldgen::RiverParams;

const SALT_RIVER: i32 = 0x52_1BE4;
const SALT_LENGTH: i32 = 0x4C_454E;
const MIN_EDGE_LEN: f32 = 1e-4;
/// Sources stop just short of the cell boundary.
const SOURCE_INSET: f32 = 0.98;

/// Places short river segments running inland from a cell's coastline edges.
///
/// Each segment is stored source-first: `a` lies inland, `b` on the coast.
pub struct RiverGen<'p> {
    params: &'p RiverParams,
}

impl<'p> RiverGen<'p> {
    pub fn new(params: &'p RiverParams) -> Self {
        Self { params }
    }

    /// Seeded segment count for one edge: `(min + rand * range)` scaled by
    /// edge length. The base never reaches `min + range`.
    pub fn segment_count(&self, hash: i32, edge_len: f32) -> usize {
        let p = self.params;
        // f32 rounds min + 0.99999994 * range up to the bound
        let base = p.segments_min as f64 + rand(hash) as f64 * p.segments_range as f64;
        (base * edge_len as f64 * p.segments_per_unit as f64)
            .floor()
            .max(0.0) as usize
    }

    pub fn generate(&self, cell: &LatticeCell, coast: &[Edge; 8]) -> Vec<Edge> {
        let mut rivers: Vec<Edge> = Vec::new();
        let center = cell.point();
        for (slot, edge) in coast.iter().enumerate() {
            if edge.is_none() {
                continue;
            }
            let len = edge.length();
            if !(len > MIN_EDGE_LEN) {
                continue;
            }
            let h = mix(cell.hash, SALT_RIVER.wrapping_add(slot as i32));
            let count = self.segment_count(h, len);
            if count == 0 {
                continue;
            }
            let mut inward = (edge.direction() / len).perp();
            if (center - edge.midpoint()).dot(inward) < 0.0 {
                inward = -inward;
            }
            for k in 0..count {
                let hk = mix(h, k as i32);
                let t = (k as f32 + 0.5 + (rand(hk) - 0.5) * 0.5) / count as f32;
                let mouth = edge.a.lerp(edge.b, t);
                let mut length = self.params.length * (0.5 + rand(mix(hk, SALT_LENGTH)));
                // keep the source inside the triangle spanned by the centre and
                // the edge, which the convex cell contains
                for side in [edge.a, edge.b] {
                    if let Some(s) = ray_hit(mouth, inward, center, side) {
                        length = length.min(s * SOURCE_INSET);
                    }
                }
                let segment = Edge::new(mouth + inward * length, mouth);
                if rivers.iter().any(|r| r.intersects(&segment)) {
                    continue;
                }
                rivers.push(segment);
            }
        }
        rivers
    }
}

/// Distance along the unit ray `origin + dir * s` to segment `p`-`q`, if it
/// is hit ahead of the origin.
fn ray_hit(origin: Vec2, dir: Vec2, p: Vec2, q: Vec2) -> Option<f32> {
    let side = q - p;
    let denom = dir.cross(side);
    if denom.abs() < PARALLEL_EPS {
        return None;
    }
    let w = p - origin;
    let s = w.cross(side) / denom;
    let u = w.cross(dir) / denom;
    (s > 0.0 && (0.0..=1.0).contains(&u)).then_some(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::Lattice;

    #[test]
    fn segment_count_scales_with_length() {
        let params = RiverParams {
            segments_min: 2.0,
            segments_range: 2.0,
            segments_per_unit: 1.0,
            ..RiverParams::default()
        };
        let gen_ = RiverGen::new(&params);
        // rand(0) == 0 so the base is exactly segments_min
        assert_eq!(gen_.segment_count(0, 1.0), 2);
        assert_eq!(gen_.segment_count(0, 2.6), 5);
        assert_eq!(gen_.segment_count(0, 0.1), 0);
    }

    #[test]
    fn segment_count_upper_bound_is_exclusive() {
        let params = RiverParams {
            segments_min: 2.0,
            segments_range: 2.0,
            segments_per_unit: 1.0,
            ..RiverParams::default()
        };
        // largest value rand can produce
        assert!(rand(-1) > 0.9999);
        assert_eq!(RiverGen::new(&params).segment_count(-1, 1.0), 3);
    }

    #[test]
    fn long_segments_stop_inside_the_cell() {
        let params = RiverParams {
            segments_per_unit: 4.0,
            length: 5.0,
            ..RiverParams::default()
        };
        let cell = Lattice::new(1, 0.0, -1.0).cell(0, 0);
        let center = cell.point();
        let a = Vec2::new(center.x + 0.5, center.y - 0.5);
        let b = Vec2::new(center.x + 0.5, center.y + 0.5);
        let mut coast = [Edge::NONE; 8];
        coast[0] = Edge::new(a, b);
        let rivers = RiverGen::new(&params).generate(&cell, &coast);
        assert!(!rivers.is_empty());
        for r in &rivers {
            let src = r.a;
            // inside triangle (center, a, b): same side of each edge as the
            // opposite vertex
            for (p, q, opp) in [(a, b, center), (b, center, a), (center, a, b)] {
                let s1 = (q - p).cross(src - p);
                let s2 = (q - p).cross(opp - p);
                assert!(s1 * s2 > 0.0, "source {src:?} left the cell");
            }
        }
    }

    #[test]
    fn segments_start_inland_and_end_on_coast() {
        let params = RiverParams {
            segments_per_unit: 4.0,
            ..RiverParams::default()
        };
        let cell = Lattice::new(1, 0.0, -1.0).cell(0, 0);
        let mut coast = [Edge::NONE; 8];
        coast[0] = Edge::new(Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0));
        let rivers = RiverGen::new(&params).generate(&cell, &coast);
        assert!(!rivers.is_empty());
        for r in &rivers {
            assert_eq!(r.b.x, 1.0);
            assert!(r.b.y > 0.0 && r.b.y < 1.0);
            assert!(r.a.x < 1.0, "source should point toward the cell center");
        }
    }
}
