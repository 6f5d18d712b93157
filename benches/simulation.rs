//! Generation and round-throughput benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use hollowdeep::game::intent::Intent;
use hollowdeep::game::mapgen::{self, GeneratorConfig};
use hollowdeep::game::turn::play_turn;
use hollowdeep::{GameConfig, GameId, GameState};

fn bench_generate(c: &mut Criterion) {
    let config = GeneratorConfig::default();
    let mut seed = 0u64;

    c.bench_function("generate_level", |b| {
        b.iter(|| {
            seed = seed.wrapping_add(1);
            let grid = mapgen::generate(black_box(seed), 1, &config).unwrap();
            black_box(grid)
        })
    });
}

fn bench_rounds(c: &mut Criterion) {
    c.bench_function("play_100_waits", |b| {
        b.iter(|| {
            let mut state =
                GameState::new_game(GameId::new([0; 16]), 42, GameConfig::default()).unwrap();
            for _ in 0..100 {
                let _ = play_turn(&mut state, Intent::Wait);
            }
            black_box(state.compute_hash())
        })
    });
}

criterion_group!(benches, bench_generate, bench_rounds);
criterion_main!(benches);
