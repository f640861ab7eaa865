use serde::{Deserialize, Serialize};

use crate::CHUNK_SIZE;

// Block coordinates are `i32`. Chunk and region conversions to block space
// wrap rather than panic once they leave that range (|chunk| > i32::MAX / 16).

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub cx: i32,
    pub cz: i32,
}

impl ChunkCoord {
    #[inline]
    pub const fn new(cx: i32, cz: i32) -> Self {
        Self { cx, cz }
    }

    /// Chunk containing the block column `(wx, wz)`.
    #[inline]
    pub fn from_block(wx: i32, wz: i32) -> Self {
        let s = CHUNK_SIZE as i32;
        Self::new(wx.div_euclid(s), wz.div_euclid(s))
    }

    #[inline]
    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            cx: self.cx + dx,
            cz: self.cz + dz,
        }
    }

    #[inline]
    pub fn distance_sq(self, other: ChunkCoord) -> i64 {
        let dx = i64::from(self.cx - other.cx);
        let dz = i64::from(self.cz - other.cz);
        dx * dx + dz * dz
    }

    /// Owning region and this chunk's local position inside it.
    #[inline]
    pub fn to_region(self, region_chunks: i32) -> (RegionCoord, usize, usize) {
        let n = region_chunks.max(1);
        (
            RegionCoord::new(self.cx.div_euclid(n), self.cz.div_euclid(n)),
            self.cx.rem_euclid(n) as usize,
            self.cz.rem_euclid(n) as usize,
        )
    }
}

impl From<(i32, i32)> for ChunkCoord {
    fn from(value: (i32, i32)) -> Self {
        Self::new(value.0, value.1)
    }
}

impl From<ChunkCoord> for (i32, i32) {
    fn from(value: ChunkCoord) -> Self {
        (value.cx, value.cz)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegionCoord {
    pub rx: i32,
    pub rz: i32,
}

impl RegionCoord {
    #[inline]
    pub const fn new(rx: i32, rz: i32) -> Self {
        Self { rx, rz }
    }

    #[inline]
    pub fn first_chunk(self, region_chunks: i32) -> ChunkCoord {
        ChunkCoord::new(
            self.rx.wrapping_mul(region_chunks),
            self.rz.wrapping_mul(region_chunks),
        )
    }

    /// World block coordinate of the region's minimum corner.
    #[inline]
    pub fn block_origin(self, region_chunks: i32) -> (i32, i32) {
        let s = region_chunks.wrapping_mul(CHUNK_SIZE as i32);
        (self.rx.wrapping_mul(s), self.rz.wrapping_mul(s))
    }

    #[inline]
    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self::new(self.rx + dx, self.rz + dz)
    }
}

impl From<(i32, i32)> for RegionCoord {
    fn from(value: (i32, i32)) -> Self {
        Self::new(value.0, value.1)
    }
}

/// Floor-division mapping from chunk to owning region; correct for negatives.
#[inline]
pub fn chunk_to_region(cx: i32, cz: i32, region_chunks: i32) -> RegionCoord {
    ChunkCoord::new(cx, cz).to_region(region_chunks).0
}
