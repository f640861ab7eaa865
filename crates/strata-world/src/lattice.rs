//! Seeded jittered lattice: integer hash, unit-float rand, jitter and land/sea density.
//!
//! Every function here is bit-reproducible: hashing is pure wrapping integer
//! arithmetic and `rand` converts a 24-bit integer to `f32` exactly.

use strata_geom::Vec2;

const PRIME_X: i32 = 501_125_321;
const PRIME_Y: i32 = 1_136_930_381;
const HASH_MUL: i32 = 0x27d4_eb2d;

const SALT_JITTER_X: i32 = 0x68E3_1DA4;
const SALT_JITTER_Y: i32 = 0x1B56_C4E9;
const SALT_DENSITY: i32 = 0x3C6E_F372;

/// Packed `(cx, cy)` lattice coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey(u64);

impl CellKey {
    #[inline]
    pub const fn pack(cx: i32, cy: i32) -> Self {
        Self(((cx as u32 as u64) << 32) | (cy as u32 as u64))
    }

    #[inline]
    pub const fn cx(self) -> i32 {
        (self.0 >> 32) as u32 as i32
    }

    #[inline]
    pub const fn cy(self) -> i32 {
        self.0 as u32 as i32
    }

    #[inline]
    pub const fn unpack(self) -> (i32, i32) {
        (self.cx(), self.cy())
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

#[inline]
fn fold_seed(seed: i64) -> i32 {
    (seed ^ (seed >> 32)) as i32
}

pub fn hash(seed: i64, cx: i32, cy: i32) -> i32 {
    let mut h = fold_seed(seed) ^ cx.wrapping_mul(PRIME_X) ^ cy.wrapping_mul(PRIME_Y);
    h = h.wrapping_mul(HASH_MUL);
    h ^ (h >> 15)
}

/// Avalanche `hash` with `salt` so independent streams can be drawn from one cell hash.
pub fn mix(hash: i32, salt: i32) -> i32 {
    let mut x = (hash ^ salt) as u32;
    x ^= x >> 16;
    x = x.wrapping_mul(0x7feb_352d);
    x ^= x >> 15;
    x = x.wrapping_mul(0x846c_a68b);
    x ^= x >> 16;
    x as i32
}

/// Uniform value in `[0, 1)` from the top 24 bits of `hash`.
#[inline]
pub fn rand(hash: i32) -> f32 {
    ((hash as u32) >> 8) as f32 * (1.0 / 16_777_216.0)
}

#[inline]
pub fn jitter_x(hash: i32, cx: i32, jitter: f32) -> f32 {
    cx as f32 + 0.5 + (rand(mix(hash, SALT_JITTER_X)) - 0.5) * jitter
}

#[inline]
pub fn jitter_y(hash: i32, cy: i32, jitter: f32) -> f32 {
    cy as f32 + 0.5 + (rand(mix(hash, SALT_JITTER_Y)) - 0.5) * jitter
}

/// 1 for land, 0 for sea.
#[inline]
pub fn density(hash: i32, threshold: f32) -> u8 {
    u8::from(rand(mix(hash, SALT_DENSITY)) > threshold)
}

/// Seed, jitter and threshold shared by every cell of one lattice.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lattice {
    pub seed: i64,
    pub jitter: f32,
    pub threshold: f32,
}

impl Lattice {
    pub fn new(seed: i64, jitter: f32, threshold: f32) -> Self {
        Self {
            seed,
            jitter,
            threshold,
        }
    }

    #[inline]
    pub fn cell(&self, cx: i32, cy: i32) -> LatticeCell {
        LatticeCell::new(self, cx, cy)
    }

    #[inline]
    pub fn cell_at(&self, key: CellKey) -> LatticeCell {
        self.cell(key.cx(), key.cy())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LatticeCell {
    pub cx: i32,
    pub cy: i32,
    pub hash: i32,
    pub px: f32,
    pub py: f32,
    pub density: u8,
}

impl LatticeCell {
    pub fn new(lattice: &Lattice, cx: i32, cy: i32) -> Self {
        let hash = hash(lattice.seed, cx, cy);
        Self {
            cx,
            cy,
            hash,
            px: jitter_x(hash, cx, lattice.jitter),
            py: jitter_y(hash, cy, lattice.jitter),
            density: density(hash, lattice.threshold),
        }
    }

    #[inline]
    pub fn key(&self) -> CellKey {
        CellKey::pack(self.cx, self.cy)
    }

    #[inline]
    pub fn point(&self) -> Vec2 {
        Vec2::new(self.px, self.py)
    }

    #[inline]
    pub fn is_land(&self) -> bool {
        self.density != 0
    }

    #[inline]
    pub fn dist_sq(&self, x: f32, y: f32) -> f32 {
        let dx = self.px - x;
        let dy = self.py - y;
        dx * dx + dy * dy
    }
}
