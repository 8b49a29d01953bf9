//! Property-based tests for the switching-sequence solvers using proptest.
//!
//! Covers enumeration/branch-and-bound equivalence on a fixed grid model and on
//! random plants with random tracking weights, switching-constraint satisfaction,
//! pruning efficiency, sphere decoder agreement, and the single-step brute-force
//! reduction.

use fcsmpc_core::{ConverterLevels, DiscreteStateSpace, SwitchPosition, SwitchSpace};
use fcsmpc_solver::{
    BranchAndBoundSolver, EnumerationSolver, HorizonTrajectory, MpcProblem, MpcWeights,
    SphereDecoderSolver,
};
use nalgebra::{DMatrix, DVector, Vector2, dmatrix};
use proptest::prelude::*;

/// Discretized RL load in alpha-beta coordinates driven through the Clarke transform.
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

fn levels_strategy() -> impl Strategy<Value = ConverterLevels> {
    prop_oneof![Just(ConverterLevels::Two), Just(ConverterLevels::Three)]
}

/// A valid previous switch position for `levels`.
fn previous_for(levels: ConverterLevels, index: usize) -> SwitchPosition {
    let space = SwitchSpace::new(levels);
    space.combinations()[index % space.len()]
}

/// Random three-state, two-output plant with a random PSD tracking weight `Q = M M'`.
#[derive(Debug, Clone)]
struct RandomPlant {
    model: DiscreteStateSpace,
    q: DMatrix<f64>,
    state: DVector<f64>,
    reference: DVector<f64>,
}

fn random_plant() -> impl Strategy<Value = RandomPlant> {
    let entries = |n: usize| prop::collection::vec(-1.0f64..1.0, n);
    (entries(9), entries(9), entries(6), entries(4), entries(3), entries(2)).prop_map(
        |(a, b1, c, m, x, r)| {
            let m = DMatrix::from_row_slice(2, 2, &m);
            let model = DiscreteStateSpace::without_disturbance(
                DMatrix::from_row_slice(3, 3, &a),
                DMatrix::from_row_slice(3, 3, &b1),
                DMatrix::from_row_slice(2, 3, &c),
            )
            .unwrap();
            RandomPlant {
                model,
                q: &m * m.transpose(),
                state: DVector::from_vec(x),
                reference: DVector::from_vec(r),
            }
        },
    )
}

struct Case {
    model: DiscreteStateSpace,
    state: DVector<f64>,
    trajectory: HorizonTrajectory,
}

fn case(x: (f64, f64), reference: (f64, f64), theta_step: f64, horizon: usize) -> Case {
    let reference = Vector2::new(reference.0, reference.1);
    let trajectory = HorizonTrajectory::rotating(reference, theta_step, horizon)
        .unwrap()
        .with_rotating_disturbance(Vector2::new(1.0, 0.0), theta_step)
        .unwrap();
    Case {
        model: grid_model(),
        state: DVector::from_vec(vec![x.0, x.1]),
        trajectory,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Branch-and-bound returns exactly the enumeration optimum, including ties.
    #[test]
    fn bnb_matches_enumeration(
        levels in levels_strategy(),
        horizon in 1usize..=2,
        prev in 0usize..27,
        x in (-0.2f64..0.2, -0.2f64..0.2),
        reference in (-0.2f64..0.2, -0.2f64..0.2),
        theta_step in 0.0f64..0.1,
        lambda_u in 0.0f64..0.05,
    ) {
        let case = case(x, reference, theta_step, horizon);
        let previous = previous_for(levels, prev);
        let problem = MpcProblem::new(&case.model, levels, &case.state, &case.trajectory, previous).unwrap();
        let weights = MpcWeights::identity(2, lambda_u);

        let reference = EnumerationSolver::new(weights.clone()).unwrap().solve(&problem).unwrap();
        let bnb = BranchAndBoundSolver::new(weights).unwrap().solve(&problem).unwrap();

        prop_assert_eq!(bnb.switch_position, reference.switch_position);
        prop_assert_eq!(&bnb.sequence, &reference.sequence);
        prop_assert!((bnb.cost - reference.cost).abs() < 1e-9);
        prop_assert!(bnb.stats.nodes_visited <= reference.stats.nodes_visited);
    }

    /// No solver ever selects a direct -1/+1 transition on a three-level leg.
    #[test]
    fn three_level_sequences_respect_constraint(
        horizon in 1usize..=2,
        prev in 0usize..27,
        x in (-0.2f64..0.2, -0.2f64..0.2),
        reference in (-0.3f64..0.3, -0.3f64..0.3),
        lambda_u in 0.001f64..0.05,
    ) {
        let case = case(x, reference, 0.0314, horizon);
        let previous = previous_for(ConverterLevels::Three, prev);
        let problem = MpcProblem::new(&case.model, ConverterLevels::Three, &case.state, &case.trajectory, previous).unwrap();
        let weights = MpcWeights::identity(2, lambda_u);

        let solutions = [
            EnumerationSolver::new(weights.clone()).unwrap().solve(&problem).unwrap(),
            BranchAndBoundSolver::new(weights.clone()).unwrap().solve(&problem).unwrap(),
            SphereDecoderSolver::new(weights).unwrap().solve(&problem).unwrap(),
        ];
        for solution in &solutions {
            let mut last = previous;
            for u in &solution.sequence {
                for phase in 0..3 {
                    prop_assert!((i16::from(u[phase]) - i16::from(last[phase])).abs() < 2);
                }
                last = *u;
            }
        }
    }

    /// The sphere decoder reaches the enumeration optimum.
    #[test]
    fn sphere_matches_enumeration_cost(
        levels in levels_strategy(),
        horizon in 1usize..=2,
        prev in 0usize..27,
        x in (-0.2f64..0.2, -0.2f64..0.2),
        reference in (-0.2f64..0.2, -0.2f64..0.2),
        lambda_u in 0.005f64..0.05,
    ) {
        let case = case(x, reference, 0.0314, horizon);
        let previous = previous_for(levels, prev);
        let problem = MpcProblem::new(&case.model, levels, &case.state, &case.trajectory, previous).unwrap();
        let weights = MpcWeights::identity(2, lambda_u);

        let reference = EnumerationSolver::new(weights.clone()).unwrap().solve(&problem).unwrap();
        let sphere = SphereDecoderSolver::new(weights).unwrap().solve(&problem).unwrap();

        prop_assert!((sphere.cost - reference.cost).abs() < 1e-9, "{} vs {}", sphere.cost, reference.cost);
    }

    /// With a single step, the optimum is the cheapest of the reachable candidates.
    #[test]
    fn single_step_is_brute_force_minimum(
        levels in levels_strategy(),
        prev in 0usize..27,
        x in (-0.2f64..0.2, -0.2f64..0.2),
        reference in (-0.2f64..0.2, -0.2f64..0.2),
        lambda_u in 0.0f64..0.05,
    ) {
        let case = case(x, reference, 0.0, 1);
        let previous = previous_for(levels, prev);
        let problem = MpcProblem::new(&case.model, levels, &case.state, &case.trajectory, previous).unwrap();
        let solver = BranchAndBoundSolver::new(MpcWeights::identity(2, lambda_u)).unwrap();
        let solution = solver.solve(&problem).unwrap();

        let space = SwitchSpace::new(levels);
        let brute = space
            .iter()
            .map(|u| problem.evaluate(solver.cost_evaluator(), &[*u]).unwrap())
            .fold(f64::INFINITY, f64::min);

        prop_assert!((solution.cost - brute).abs() < 1e-12);
    }

    /// Holding the previous position wins when it already tracks the reference.
    #[test]
    fn hold_preferred_when_reference_is_hold_output(
        levels in levels_strategy(),
        prev in 0usize..27,
        x in (-0.2f64..0.2, -0.2f64..0.2),
        lambda_u in 0.001f64..0.05,
    ) {
        let model = grid_model();
        let state = DVector::from_vec(vec![x.0, x.1]);
        let previous = previous_for(levels, prev);
        let disturbance = DVector::from_vec(vec![0.5, -0.2]);

        let zero_reference = HorizonTrajectory::constant(DVector::zeros(2), 1)
            .unwrap()
            .with_constant_disturbance(disturbance.clone())
            .unwrap();
        let prediction = fcsmpc_solver::PredictionModel::new(&model, &zero_reference);
        let y_hold = prediction.output(&prediction.predict(&state, &previous, 0));

        let trajectory = HorizonTrajectory::constant(y_hold, 1)
            .unwrap()
            .with_constant_disturbance(disturbance)
            .unwrap();
        let problem = MpcProblem::new(&model, levels, &state, &trajectory, previous).unwrap();
        let weights = MpcWeights::identity(2, lambda_u);

        let enumeration = EnumerationSolver::new(weights.clone()).unwrap().solve(&problem).unwrap();
        let bnb = BranchAndBoundSolver::new(weights).unwrap().solve(&problem).unwrap();

        prop_assert_eq!(enumeration.switch_position, previous);
        prop_assert_eq!(bnb.switch_position, previous);
        prop_assert_eq!(bnb.cost, 0.0);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Branch-and-bound matches enumeration for arbitrary plants and PSD weights,
    /// never visiting more nodes.
    #[test]
    fn bnb_matches_enumeration_on_random_plants(
        plant in random_plant(),
        levels in levels_strategy(),
        horizon in 1usize..=2,
        prev in 0usize..27,
        lambda_u in 0.0f64..0.5,
    ) {
        let trajectory = HorizonTrajectory::constant(plant.reference.clone(), horizon).unwrap();
        let previous = previous_for(levels, prev);
        let problem =
            MpcProblem::new(&plant.model, levels, &plant.state, &trajectory, previous).unwrap();
        let weights = MpcWeights::new(plant.q.clone(), lambda_u);

        let reference = EnumerationSolver::new(weights.clone()).unwrap().solve(&problem).unwrap();
        let bnb = BranchAndBoundSolver::new(weights).unwrap().solve(&problem).unwrap();

        prop_assert_eq!(&bnb.sequence, &reference.sequence);
        prop_assert!((bnb.cost - reference.cost).abs() < 1e-9);
        prop_assert!(bnb.stats.nodes_visited <= reference.stats.nodes_visited);
    }

    /// The sphere decoder reaches the enumeration optimum for arbitrary plants and
    /// PSD weights once the effort weight keeps the problem nonsingular.
    #[test]
    fn sphere_matches_enumeration_on_random_plants(
        plant in random_plant(),
        levels in levels_strategy(),
        horizon in 1usize..=2,
        prev in 0usize..27,
        lambda_u in 0.05f64..0.5,
    ) {
        let trajectory = HorizonTrajectory::constant(plant.reference.clone(), horizon).unwrap();
        let previous = previous_for(levels, prev);
        let problem =
            MpcProblem::new(&plant.model, levels, &plant.state, &trajectory, previous).unwrap();
        let weights = MpcWeights::new(plant.q.clone(), lambda_u);

        let reference = EnumerationSolver::new(weights.clone()).unwrap().solve(&problem).unwrap();
        let sphere = SphereDecoderSolver::new(weights).unwrap().solve(&problem).unwrap();

        let tol = 1e-9 * reference.cost.abs().max(1.0);
        prop_assert!(
            (sphere.cost - reference.cost).abs() < tol,
            "{} vs {}",
            sphere.cost,
            reference.cost
        );
    }
}
