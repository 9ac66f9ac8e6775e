// Benchmark for the batch route precomputation stage — the dominant cost
// of a full generation run.

use criterion::{Criterion, criterion_group, criterion_main};
use starlane_gen::config::GalaxyConfig;
use starlane_gen::pipeline::generate;
use starlane_gen::routes::precompute_routes;
use std::hint::black_box;

fn bench_config() -> GalaxyConfig {
    let mut config = GalaxyConfig::default();
    config.placement.size = 120.0;
    config.placement.arm_count = 3;
    config.placement.deg = 120.0;
    config.placement.dyn_size_factor = 0.12;
    config.placement.spc_factor = 0.008;
    config.cluster.core_exclusion_radius = 15.0;
    config.cluster.target_size = 20;
    config.routes.max_range = 40.0;
    config
}

fn route_precompute(c: &mut Criterion) {
    let config = bench_config();
    let build = generate("bench-seed", &config).expect("bench galaxy generates");

    c.bench_function("precompute_routes", |b| {
        b.iter(|| {
            let routes =
                precompute_routes(&build.systems, &build.grid, &config.routes).unwrap();
            black_box(routes)
        })
    });
}

criterion_group!(benches, route_precompute);
criterion_main!(benches);
