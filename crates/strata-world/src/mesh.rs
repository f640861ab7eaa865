//! Clipped Voronoi boundary of one lattice cell, plus its river segments.
//!
//! Slots follow compass order counter-clockwise from east, so even slots are
//! the orthogonal neighbors and odd slots the diagonals:
//! `E, NE, N, NW, W, SW, S, SE`.

use strata_geom::{Edge, Line, Vec2};

use crate::lattice::{CellKey, Lattice, LatticeCell};
use crate::river::RiverGen;
use crate::worldgen::RiverParams;

pub const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

const CULL_EPS: f32 = 1e-5;

#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    cell: LatticeCell,
    /// Full clipped boundary; `NONE` where a bisector was culled or degenerate.
    boundary: [Edge; 8],
    /// Boundary edges facing a neighbor of the other density.
    edges: [Edge; 8],
    rivers: Vec<Edge>,
}

impl Mesh {
    pub fn new(lattice: &Lattice, rivers: &RiverParams, key: CellKey) -> Self {
        let mut mesh = Self {
            cell: lattice.cell_at(key),
            boundary: [Edge::NONE; 8],
            edges: [Edge::NONE; 8],
            rivers: Vec::new(),
        };
        mesh.init(lattice, rivers);
        mesh
    }

    fn init(&mut self, lattice: &Lattice, rivers: &RiverParams) {
        let center = self.cell.point();
        let neighbors: [LatticeCell; 8] = std::array::from_fn(|i| {
            let (dx, dy) = NEIGHBOR_OFFSETS[i];
            lattice.cell(self.cell.cx.wrapping_add(dx), self.cell.cy.wrapping_add(dy))
        });

        let mut bisectors: [Option<Line>; 8] =
            std::array::from_fn(|i| Some(Line::bisector(center, neighbors[i].point())));

        cull_redundant_diagonals(center, &neighbors, &mut bisectors);
        self.boundary = connect(&bisectors);

        for (slot, edge) in self.boundary.iter().enumerate() {
            if !edge.is_none() && neighbors[slot].density != self.cell.density {
                self.edges[slot] = *edge;
            }
        }

        if self.cell.is_land() {
            self.rivers = RiverGen::new(rivers).generate(&self.cell, &self.edges);
        }
    }

    #[inline]
    pub fn cell(&self) -> &LatticeCell {
        &self.cell
    }

    #[inline]
    pub fn key(&self) -> CellKey {
        self.cell.key()
    }

    #[inline]
    pub fn boundary(&self) -> &[Edge; 8] {
        &self.boundary
    }

    /// Coastline edges by compass slot, `NONE` elsewhere.
    #[inline]
    pub fn edges(&self) -> &[Edge; 8] {
        &self.edges
    }

    pub fn coast_edges(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.iter().filter(|e| !e.is_none())
    }

    #[inline]
    pub fn rivers(&self) -> &[Edge] {
        &self.rivers
    }

    /// Smallest normalized banded distance from `p` to any river, capped at 1.
    pub fn river_value(&self, p: Vec2, rivers: &RiverParams) -> f32 {
        self.rivers
            .iter()
            .map(|r| r.banded_dist_sq(p, rivers.width_source, rivers.width_mouth))
            .fold(1.0f32, f32::min)
    }
}

/// Drops each diagonal bisector whose half-plane already contains the corner
/// formed by its two orthogonal flanks.
fn cull_redundant_diagonals(
    center: Vec2,
    neighbors: &[LatticeCell; 8],
    bisectors: &mut [Option<Line>; 8],
) {
    for mid in (1..8).step_by(2) {
        let (Some(prev), Some(line), Some(next)) =
            (bisectors[mid - 1], bisectors[mid], bisectors[(mid + 1) % 8])
        else {
            continue;
        };
        let Some(corner) = prev.intersect(&next) else {
            continue;
        };
        let normal = (neighbors[mid].point() - center).normalized();
        let reach = (line.origin - center).length();
        if (corner - center).dot(normal) <= reach * (1.0 + CULL_EPS) {
            bisectors[mid] = None;
        }
    }
}

/// Walks surviving bisectors in compass order; each edge runs from the
/// intersection with the previous survivor to the one with the next.
fn connect(bisectors: &[Option<Line>; 8]) -> [Edge; 8] {
    let mut out = [Edge::NONE; 8];
    let slots: Vec<usize> = (0..8).filter(|&i| bisectors[i].is_some()).collect();
    if slots.len() < 3 {
        return out;
    }
    let lines: Vec<Line> = slots.iter().filter_map(|&i| bisectors[i]).collect();
    let n = lines.len();
    // vertex k joins survivor k and survivor k + 1
    let vertices: Vec<Option<Vec2>> = (0..n)
        .map(|k| lines[k].intersect(&lines[(k + 1) % n]))
        .collect();
    for k in 0..n {
        let start = vertices[(k + n - 1) % n];
        let end = vertices[k];
        out[slots[k]] = Edge::from_points(start, end);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rivers() -> RiverParams {
        RiverParams::default()
    }

    #[test]
    fn regular_grid_cell_is_unit_square() {
        let lattice = Lattice::new(3, 0.0, 0.5);
        let mesh = Mesh::new(&lattice, &rivers(), CellKey::pack(0, 0));
        let b = mesh.boundary();
        for slot in (1..8).step_by(2) {
            assert!(b[slot].is_none(), "diagonal {slot} should be culled");
        }
        assert_eq!(b[0], Edge::new(Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0)));
        assert_eq!(b[2], Edge::new(Vec2::new(1.0, 1.0), Vec2::new(0.0, 1.0)));
        assert_eq!(b[4], Edge::new(Vec2::new(0.0, 1.0), Vec2::new(0.0, 0.0)));
        assert_eq!(b[6], Edge::new(Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0)));
    }

    #[test]
    fn all_land_lattice_has_no_coast_or_rivers() {
        let lattice = Lattice::new(11, 0.7, -1.0);
        for i in -10..10 {
            let mesh = Mesh::new(&lattice, &rivers(), CellKey::pack(i, -i));
            assert_eq!(mesh.coast_edges().count(), 0);
            assert!(mesh.rivers().is_empty());
            assert!(mesh.boundary().iter().filter(|e| !e.is_none()).count() >= 4);
        }
    }

    #[test]
    fn river_value_is_one_without_rivers() {
        let lattice = Lattice::new(11, 0.7, -1.0);
        let mesh = Mesh::new(&lattice, &rivers(), CellKey::pack(0, 0));
        assert_eq!(mesh.river_value(Vec2::new(0.5, 0.5), &rivers()), 1.0);
    }
}
