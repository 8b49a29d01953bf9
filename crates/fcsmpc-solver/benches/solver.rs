//! Benchmarks for the switching-sequence solvers.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use fcsmpc_core::{ConverterLevels, DiscreteStateSpace, SwitchPosition};
use fcsmpc_solver::{HorizonTrajectory, MpcProblem, MpcWeights, SolverKind};
use nalgebra::{DMatrix, Vector2, dmatrix, dvector};

fn grid_model() -> DiscreteStateSpace {
    let b = 0.08 * 2.0 / 3.0;
    let s = 3.0_f64.sqrt() / 2.0;
    DiscreteStateSpace::new(
        dmatrix![0.99, 0.0; 0.0, 0.99],
        dmatrix![b, -0.5 * b, -0.5 * b; 0.0, s * b, -s * b],
        dmatrix![-0.02, 0.0; 0.0, -0.02],
        DMatrix::identity(2, 2),
    )
    .unwrap()
}

fn bench_solvers(c: &mut Criterion, levels: ConverterLevels, horizons: &[usize]) {
    let model = grid_model();
    let x = dvector![0.05, -0.02];
    let previous = match levels {
        ConverterLevels::Two => SwitchPosition::new(1, -1, -1),
        ConverterLevels::Three => SwitchPosition::new(1, 0, -1),
    };
    let weights = MpcWeights::identity(2, 0.01);

    for kind in SolverKind::ALL {
        let mut group = c.benchmark_group(format!("{}/{}", kind.name(), levels));
        let solver = kind.build(weights.clone()).unwrap();

        for &horizon in horizons {
            // Exhaustive search grows as nl^(3 Np)
            if kind == SolverKind::Enumeration && horizon > 2 {
                continue;
            }
            let traj = HorizonTrajectory::rotating(Vector2::new(0.1, 0.0), 0.0314, horizon)
                .unwrap()
                .with_rotating_disturbance(Vector2::new(1.0, 0.0), 0.0314)
                .unwrap();
            let problem = MpcProblem::new(&model, levels, &x, &traj, previous).unwrap();

            group.bench_with_input(
                BenchmarkId::from_parameter(horizon),
                &problem,
                |bencher, problem| bencher.iter(|| solver.solve(black_box(problem)).unwrap()),
            );
        }

        group.finish();
    }
}

fn bench_two_level(c: &mut Criterion) {
    bench_solvers(c, ConverterLevels::Two, &[1, 2, 3, 4]);
}

fn bench_three_level(c: &mut Criterion) {
    bench_solvers(c, ConverterLevels::Three, &[1, 2, 3]);
}

criterion_group!(benches, bench_two_level, bench_three_level);
criterion_main!(benches);
