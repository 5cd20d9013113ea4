use criterion::{criterion_group, criterion_main, Criterion};
use orthtree::metric::ScaledDistance;
use orthtree::orthtree::{Orthtree, OrthtreeIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rstar::RTree;

fn load_data(n: usize) -> Vec<[f64; 2]> {
    let mut rng = StdRng::seed_from_u64(0);
    (0..n)
        .map(|_| [rng.gen_range(0.0..1000.0), rng.gen_range(0.0..1000.0)])
        .collect()
}

fn construct_orthtree(points: &[[f64; 2]]) -> Orthtree<&[f64; 2], 2> {
    let mut tree = Orthtree::new([0.0, 0.0], [1000.0, 1000.0]).unwrap();
    for p in points {
        tree.add(p).unwrap();
    }
    tree
}

fn construct_rstar(points: &[[f64; 2]]) -> RTree<[f64; 2]> {
    let mut tree = RTree::new();
    for p in points {
        tree.insert(*p);
    }
    tree
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let points = load_data(100_000);
    let queries = load_data(1000);

    c.bench_function("construction (orthtree)", |b| {
        b.iter(|| construct_orthtree(&points))
    });

    c.bench_function("construction (rstar)", |b| b.iter(|| construct_rstar(&points)));

    let orthtree = construct_orthtree(&points);
    let rstar_tree = construct_rstar(&points);

    c.bench_function("nearest (orthtree)", |b| {
        b.iter(|| {
            for q in &queries {
                orthtree.find_nearest(q);
            }
        })
    });

    c.bench_function("nearest (rstar)", |b| {
        b.iter(|| {
            for q in &queries {
                rstar_tree.nearest_neighbor(q);
            }
        })
    });

    let metric = ScaledDistance::new([1.0, 10.0]);
    c.bench_function("nearest anisotropic (orthtree)", |b| {
        b.iter(|| {
            for q in &queries {
                orthtree.find_nearest_with_metric(q, &metric);
            }
        })
    });

    c.bench_function("remove and add (orthtree)", |b| {
        let mut tree = construct_orthtree(&points);
        b.iter(|| {
            for p in &points[..1000] {
                tree.remove(&p).unwrap();
            }
            for p in &points[..1000] {
                tree.add(p).unwrap();
            }
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
