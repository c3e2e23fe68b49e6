//! Benchmark suite for quest-algo
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use quest_algo::{apply_reward, settlement_delta, MissionCategory, Profile, RewardDelta, Role};

fn bench_apply_reward(c: &mut Criterion) {
    let mut profile = Profile::new("s-1", Role::Student, "bench");
    for category in MissionCategory::ALL {
        profile.skills.insert(category.skill().to_string(), 40);
    }
    let delta = RewardDelta::default()
        .with_xp(35)
        .with_gold(5)
        .with_skill("문해력", 5);

    c.bench_function("apply_reward", |b| {
        b.iter(|| apply_reward(black_box(&profile), black_box(&delta), 0))
    });
}

fn bench_settlement_delta(c: &mut Criterion) {
    c.bench_function("settlement_delta", |b| {
        b.iter(|| settlement_delta(black_box(MissionCategory::ProblemSolving), 30, 10))
    });
}

criterion_group!(benches, bench_apply_reward, bench_settlement_delta);
criterion_main!(benches);
