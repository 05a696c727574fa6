use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use sv_data::{GeneratorConfig, InspectConfig, generate, inspect};
use sv_inference::{DesignMatrix, GibbsConfig, ModelSpec, OlsFit, fit_bayes, fit_ols};

const FULL: &str = "overall ~ clean + aroma + value + color + logdist + num_child + promo";

fn survey(n: usize) -> sv_data::DataFrame {
    let raw = generate(&GeneratorConfig::with_seed(555, n)).unwrap();
    inspect(&raw, &InspectConfig::default()).unwrap().0
}

fn bench_ols_n_scaling(c: &mut Criterion) {
    let spec: ModelSpec = FULL.parse().unwrap();
    let mut group = c.benchmark_group("ols/full_model/n_scaling");
    for n in [500usize, 5_000, 50_000] {
        let df = survey(n);
        group.bench_with_input(BenchmarkId::new("fit_ols", n), &df, |b, df| {
            b.iter(|| black_box(fit_ols(black_box(df), &spec).unwrap().r_squared))
        });
        let design = DesignMatrix::build(&df, &spec).unwrap();
        group.bench_with_input(BenchmarkId::new("from_design", n), &design, |b, d| {
            b.iter(|| black_box(OlsFit::from_design(black_box(d)).unwrap().rss))
        });
    }
    group.finish();
}

fn bench_gibbs(c: &mut Criterion) {
    let spec: ModelSpec = FULL.parse().unwrap();
    let df = survey(500);
    let cfg = GibbsConfig { burn_in: 100, n_samples: 1_000, ..GibbsConfig::default() };
    c.bench_function("gibbs/full_model/n=500/1100_iters", |b| {
        b.iter(|| black_box(fit_bayes(black_box(&df), &spec, &cfg).unwrap().posterior.sigma2.mean))
    });
}

criterion_group!(benches, bench_ols_n_scaling, bench_gibbs);
criterion_main!(benches);
