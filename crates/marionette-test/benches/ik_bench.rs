//! Benchmarks for the CCD solver and forward kinematics

use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use marionette_core::Vec3;
use marionette_ik::{IkChain, IkSolver};
use marionette_pose::Skeleton;

fn bench_ccd_reachable(c: &mut Criterion) {
    let skeleton = Skeleton::humanoid();
    let pose = BTreeMap::new();
    let chain = IkChain::left_arm();
    let target = Vec3::new(0.3, 1.3, 0.35);

    c.bench_function("ccd_left_arm_reachable", |b| {
        b.iter(|| IkSolver::solve(&skeleton, &pose, &chain, black_box(target), black_box(20)))
    });
}

fn bench_ccd_unreachable(c: &mut Criterion) {
    let skeleton = Skeleton::humanoid();
    let pose = BTreeMap::new();
    let chain = IkChain::right_arm();
    let target = Vec3::new(-3.0, 2.0, 2.0);

    c.bench_function("ccd_right_arm_unreachable", |b| {
        b.iter(|| IkSolver::solve(&skeleton, &pose, &chain, black_box(target), black_box(20)))
    });
}

fn bench_world_transforms(c: &mut Criterion) {
    let skeleton = Skeleton::humanoid();
    let pose = BTreeMap::new();

    c.bench_function("world_transforms_humanoid", |b| {
        b.iter(|| black_box(skeleton.world_transforms(black_box(&pose))))
    });
}

criterion_group!(
    benches,
    bench_ccd_reachable,
    bench_ccd_unreachable,
    bench_world_transforms,
);
criterion_main!(benches);
