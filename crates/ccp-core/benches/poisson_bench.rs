use ccp_core::boundary::DirichletSet;
use ccp_core::poisson::{assemble_poisson_system, solve_phi};
use criterion::{criterion_group, criterion_main, Criterion};
use ndarray::Array2;
use std::hint::black_box;

fn plate_problem(nz: usize, nr: usize) -> (Array2<f64>, DirichletSet) {
    let mut eps = Array2::from_elem((nz, nr), 1.0);
    for k in nz / 3..nz / 2 {
        for j in 0..nr {
            eps[[k, j]] = 4.0;
        }
    }
    let mut mask = Array2::from_elem((nz, nr), false);
    let mut values = Array2::zeros((nz, nr));
    for j in 0..nr {
        mask[[0, j]] = true;
        values[[0, j]] = 1.0;
        mask[[nz - 1, j]] = true;
    }
    (eps, DirichletSet { mask, values })
}

fn bench_assemble_64(c: &mut Criterion) {
    let (eps, dirichlet) = plate_problem(64, 64);

    c.bench_function("poisson_assemble_64x64", |b| {
        b.iter(|| {
            let (matrix, rhs) = assemble_poisson_system(&eps, 0.5, 0.5, &dirichlet);
            black_box((matrix.n, rhs.len()));
        })
    });
}

fn bench_solve_32(c: &mut Criterion) {
    let (eps, dirichlet) = plate_problem(32, 32);
    let (matrix, rhs) = assemble_poisson_system(&eps, 0.5, 0.5, &dirichlet);

    let mut group = c.benchmark_group("poisson_solve_32x32");
    group.sample_size(20);
    group.bench_function("solve_phi", |b| {
        b.iter(|| {
            let phi = solve_phi(&matrix, &rhs, 32, 32, &mut Vec::new()).unwrap();
            black_box(phi[[16, 16]]);
        })
    });
    group.finish();
}

criterion_group!(benches, bench_assemble_64, bench_solve_32);
criterion_main!(benches);
