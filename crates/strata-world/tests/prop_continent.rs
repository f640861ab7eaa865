use std::sync::Arc;
use std::thread;

use proptest::prelude::*;
use strata_world::{
    CellKey, ContinentGenerator, ContinentParams, FastNoiseSampler, NoiseSampler, RiverParams,
};

fn generator(seed: i64) -> ContinentGenerator {
    let params = ContinentParams {
        jitter: 0.7,
        threshold: 0.35,
        ..ContinentParams::default()
    };
    let noise: Arc<dyn NoiseSampler> = Arc::new(FastNoiseSampler::default());
    ContinentGenerator::new(seed, params, RiverParams::default(), noise, 1024)
}

fn point() -> impl Strategy<Value = f32> {
    -10_000.0f32..10_000.0
}

proptest! {
    #[test]
    fn edge_value_is_in_unit_range(seed in any::<i64>(), x in point(), y in point()) {
        let v = generator(seed).edge_value(x, y);
        prop_assert!((0.0..=1.0).contains(&v), "edge value {}", v);
    }

    #[test]
    fn river_value_is_in_unit_range(seed in any::<i64>(), x in point(), y in point()) {
        let v = generator(seed).river_value(x, y);
        prop_assert!((0.0..=1.0).contains(&v), "river value {}", v);
    }

    #[test]
    fn sampling_is_deterministic(seed in any::<i64>(), x in point(), y in point()) {
        let a = generator(seed);
        let b = generator(seed);
        prop_assert_eq!(a.edge_value(x, y).to_bits(), b.edge_value(x, y).to_bits());
        prop_assert_eq!(a.nearest(x, y), b.nearest(x, y));
        let key = CellKey::pack(x.floor() as i32, y.floor() as i32);
        prop_assert_eq!(a.compute_mesh(key), b.compute_mesh(key));
    }

    // a land result always names a land cell from the 3x3 neighborhood
    #[test]
    fn nearest_names_a_neighboring_land_cell(seed in any::<i64>(), x in point(), y in point()) {
        let g = generator(seed);
        if let Some(key) = g.nearest(x, y) {
            let cell = g.lattice().cell_at(key);
            prop_assert!(cell.is_land());
            prop_assert!((key.cx() - x.floor() as i32).abs() <= 1);
            prop_assert!((key.cy() - y.floor() as i32).abs() <= 1);
        }
    }
}

#[test]
fn nearest_at_origin_is_stable() {
    let g = generator(42);
    let p = g.nearest(0.0, 0.0);
    for _ in 0..16 {
        assert_eq!(g.nearest(0.0, 0.0), p);
    }
    assert_eq!(generator(42).nearest(0.0, 0.0), p);
}

#[test]
fn results_agree_across_threads() {
    let g = generator(7);
    let points: Vec<(f32, f32)> = (0..256)
        .map(|i| (i as f32 * 0.731 - 90.0, i as f32 * -0.377 + 12.0))
        .collect();
    let expected: Vec<(u32, Option<CellKey>, u32)> = points
        .iter()
        .map(|&(x, y)| {
            (
                g.edge_value(x, y).to_bits(),
                g.nearest(x, y),
                g.river_value(x, y).to_bits(),
            )
        })
        .collect();
    thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for (i, &(x, y)) in points.iter().enumerate() {
                    let got = (
                        g.edge_value(x, y).to_bits(),
                        g.nearest(x, y),
                        g.river_value(x, y).to_bits(),
                    );
                    assert_eq!(got, expected[i]);
                }
            });
        }
    });
}
