use std::sync::Arc;

use crate::CHUNK_SIZE;
use crate::region::RegionCoord;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TerrainClass {
    #[default]
    Ocean,
    Beach,
    Land,
    River,
    Mountain,
}

impl TerrainClass {
    pub const ALL: [TerrainClass; 5] = [
        TerrainClass::Ocean,
        TerrainClass::Beach,
        TerrainClass::Land,
        TerrainClass::River,
        TerrainClass::Mountain,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TerrainClass::Ocean => "ocean",
            TerrainClass::Beach => "beach",
            TerrainClass::Land => "land",
            TerrainClass::River => "river",
            TerrainClass::Mountain => "mountain",
        }
    }
}

/// One fully generated column sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColumnSample {
    pub height: i32,
    pub edge: f32,
    pub river: f32,
    pub terrain: TerrainClass,
}

/// Immutable per-region terrain: `size * size` columns in row-major `z, x` order.
#[derive(Debug, PartialEq)]
pub struct TerrainTile {
    region: RegionCoord,
    size: usize,
    origin: (i32, i32),
    heights: Arc<[i32]>,
    edge: Arc<[f32]>,
    river: Arc<[f32]>,
    terrain: Arc<[TerrainClass]>,
    pub compute_time_us: u32,
}

impl TerrainTile {
    pub fn from_columns(
        region: RegionCoord,
        size: usize,
        origin: (i32, i32),
        columns: &[ColumnSample],
        compute_time_us: u32,
    ) -> Self {
        debug_assert_eq!(columns.len(), size * size);
        Self {
            region,
            size,
            origin,
            heights: columns.iter().map(|c| c.height).collect(),
            edge: columns.iter().map(|c| c.edge).collect(),
            river: columns.iter().map(|c| c.river).collect(),
            terrain: columns.iter().map(|c| c.terrain).collect(),
            compute_time_us,
        }
    }

    #[inline]
    pub fn region(&self) -> RegionCoord {
        self.region
    }

    /// Columns per side.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn origin(&self) -> (i32, i32) {
        self.origin
    }

    #[inline]
    pub fn chunks_per_side(&self) -> usize {
        self.size / CHUNK_SIZE
    }

    #[inline]
    fn idx(&self, lx: usize, lz: usize) -> Option<usize> {
        (lx < self.size && lz < self.size).then_some(lz * self.size + lx)
    }

    #[inline]
    pub fn height(&self, lx: usize, lz: usize) -> Option<i32> {
        self.idx(lx, lz).map(|i| self.heights[i])
    }

    #[inline]
    pub fn edge(&self, lx: usize, lz: usize) -> Option<f32> {
        self.idx(lx, lz).map(|i| self.edge[i])
    }

    #[inline]
    pub fn river(&self, lx: usize, lz: usize) -> Option<f32> {
        self.idx(lx, lz).map(|i| self.river[i])
    }

    #[inline]
    pub fn terrain(&self, lx: usize, lz: usize) -> Option<TerrainClass> {
        self.idx(lx, lz).map(|i| self.terrain[i])
    }

    pub fn column(&self, lx: usize, lz: usize) -> Option<ColumnSample> {
        let i = self.idx(lx, lz)?;
        Some(ColumnSample {
            height: self.heights[i],
            edge: self.edge[i],
            river: self.river[i],
            terrain: self.terrain[i],
        })
    }

    /// Column at world block `(wx, wz)` if it falls inside this tile.
    pub fn column_at(&self, wx: i32, wz: i32) -> Option<ColumnSample> {
        let dx = wx.wrapping_sub(self.origin.0);
        let dz = wz.wrapping_sub(self.origin.1);
        if dx < 0 || dz < 0 {
            return None;
        }
        self.column(dx as usize, dz as usize)
    }

    pub fn class_counts(&self) -> [usize; 5] {
        let mut counts = [0usize; 5];
        for t in self.terrain.iter() {
            counts[*t as usize] += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile() -> TerrainTile {
        let size = CHUNK_SIZE * 2;
        let columns: Vec<ColumnSample> = (0..size * size)
            .map(|i| ColumnSample {
                height: i as i32,
                edge: 0.5,
                river: 1.0,
                terrain: if i % 2 == 0 {
                    TerrainClass::Land
                } else {
                    TerrainClass::Ocean
                },
            })
            .collect();
        TerrainTile::from_columns(RegionCoord::new(-1, 0), size, (-32, 0), &columns, 7)
    }

    #[test]
    fn indexes_row_major() {
        let t = tile();
        assert_eq!(t.chunks_per_side(), 2);
        assert_eq!(t.height(3, 0), Some(3));
        assert_eq!(t.height(0, 1), Some(32));
        assert_eq!(t.height(32, 0), None);
        assert_eq!(t.column_at(-32, 1).map(|c| c.height), Some(32));
        assert_eq!(t.column_at(-33, 0), None);
        assert_eq!(t.column_at(0, 0), None);
    }

    #[test]
    fn counts_classes() {
        let counts = tile().class_counts();
        assert_eq!(counts[TerrainClass::Land as usize], 512);
        assert_eq!(counts[TerrainClass::Ocean as usize], 512);
        assert_eq!(counts.iter().sum::<usize>(), 1024);
    }
}
