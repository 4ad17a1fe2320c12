use approx::assert_relative_eq;

use rocket_sizing::config::{self, SearchSettings};
use rocket_sizing::trajectory::{
    AeroParams, AscentDynamics, AscentSimulator, BurnContext, DragShape, FlightState,
    InfeasibleReason, IntegrationError, Phase, PayloadSearch, PayloadSolution, SearchError,
    StageIntegrator, StageSpec, VehicleConfig,
};

fn stage(
    thrust_n: f64,
    mass_flow_kg_s: f64,
    structural_mass_kg: f64,
    propellant_mass_kg: f64,
) -> StageSpec {
    StageSpec {
        thrust_n,
        mass_flow_kg_s,
        structural_mass_kg,
        propellant_mass_kg,
    }
}

fn srb_vulcain() -> VehicleConfig {
    let document =
        config::load_vehicle("configs/vehicles/srb_vulcain.toml").expect("vehicle document");
    VehicleConfig::from_document(&document).expect("vehicle conversion")
}

fn solve(vehicle: VehicleConfig) -> PayloadSolution {
    PayloadSearch::new(vehicle, &SearchSettings::default())
        .expect("settings")
        .run()
        .expect("search terminates")
}

fn assert_strictly_increasing(values: &[f64]) {
    for (i, pair) in values.windows(2).enumerate() {
        assert!(
            pair[1] > pair[0],
            "sample {} not increasing: {} -> {}",
            i + 1,
            pair[0],
            pair[1]
        );
    }
}

#[test]
fn srb_vulcain_payload_is_sharp() {
    let vehicle = srb_vulcain();
    let solution = solve(vehicle.clone());

    assert_relative_eq!(solution.payload_kg, 9_900.0);
    assert_relative_eq!(solution.payload_kg % 100.0, 0.0);
    assert_strictly_increasing(&solution.record.heights());
    assert_strictly_increasing(&solution.record.times());
    assert_eq!(solution.record.heights().len(), solution.record.velocities().len());

    let simulator = AscentSimulator::new(vehicle, &SearchSettings::default());
    assert!(simulator.simulate(solution.payload_kg).is_feasible());
    let heavier = simulator.simulate(solution.payload_kg + 100.0);
    assert!(matches!(
        heavier.reason(),
        Some(InfeasibleReason::InsufficientVelocity { .. })
    ));
}

#[test]
fn accepted_run_stays_below_insertion_altitude() {
    let solution = solve(srb_vulcain());
    let last = solution.record.samples.last().expect("non-empty trajectory");
    assert!(last.altitude_m <= 100_000.0);
    let insertion = solution.record.insertion.expect("insertion evaluated");
    assert_relative_eq!(insertion.orbital_velocity_m_s, 7_668.64, epsilon = 0.01);
    assert!(insertion.final_velocity_m_s > insertion.orbital_velocity_m_s);
}

#[test]
fn more_thrust_never_reduces_payload() {
    let baseline = solve(srb_vulcain()).payload_kg;

    let mut upper = srb_vulcain();
    upper.stages[1].thrust_n *= 1.1;
    let upper_payload = solve(upper).payload_kg;
    assert!(upper_payload >= baseline, "{upper_payload} < {baseline}");

    let mut booster = srb_vulcain();
    booster.stages[0].thrust_n = 13.7e6;
    let booster_payload = solve(booster).payload_kg;
    assert!(booster_payload >= baseline, "{booster_payload} < {baseline}");
}

#[test]
fn repeated_searches_are_identical() {
    let first = solve(srb_vulcain());
    let second = solve(srb_vulcain());
    assert_eq!(first, second);
}

#[test]
fn three_stage_vehicle_chains_stage_advances() {
    let vehicle = VehicleConfig::new(
        vec![
            stage(12.45e6, 5290.0, 6.75e4, 5.0e5),
            stage(2.1e6, 764.0, 1.2e4, 9.0e4),
            stage(0.8e6, 188.33, 1.5e4, 5.0e4),
        ],
        4.0,
        DragShape::Cone { half_angle_deg: 15.0 },
    )
    .expect("vehicle");
    let solution = solve(vehicle);
    assert!(solution.payload_kg > 9_900.0);
    assert_relative_eq!(solution.payload_kg % 100.0, 0.0);
    assert_strictly_increasing(&solution.record.heights());
}

#[test]
fn single_stage_exhausted_low_returns_zero_payload() {
    let cases = [
        stage(7.5e5, 500.0, 30_000.0, 40_000.0),
        stage(7.0e5, 500.0, 30_000.0, 30_000.0),
        stage(6.0e5, 300.0, 40_000.0, 20_000.0),
    ];
    for spec in cases {
        let vehicle = VehicleConfig::new(vec![spec], 3.0, DragShape::Sphere).expect("vehicle");
        let solution = solve(vehicle);
        assert_relative_eq!(solution.payload_kg, 0.0);
        assert_eq!(solution.trials, 1);
        assert_eq!(solution.record.samples.len(), 500);
        assert!(!solution.is_orbit_capable());
        match solution.limiting_reason {
            InfeasibleReason::PropellantExhausted { phase, altitude_m } => {
                assert_eq!(phase, Phase::VerticalAscent);
                assert!(altitude_m < 10_000.0);
            }
            other => panic!("unexpected limit {other:?}"),
        }
    }
}

#[test]
fn burn_margin_keeps_empty_stage_mass_positive() {
    let spec = stage(5.0e5, 250.0, 0.0, 25_000.0);
    let burn = BurnContext {
        thrust_n: spec.thrust_n,
        initial_mass_kg: spec.gross_mass_kg(),
        mass_flow_kg_s: spec.mass_flow_kg_s,
        thrust_angle_rad: 0.0,
        flight_path_angle_rad: std::f64::consts::FRAC_PI_2,
        payload_kg: 0.0,
    };
    let aero = AeroParams {
        drag_coefficient: 0.42,
        reference_area_m2: 1.0,
    };
    let integrator = StageIntegrator::default();

    let window = integrator.burn_window(spec.propellant_mass_kg, spec.mass_flow_kg_s);
    assert_relative_eq!(window, 95.0);
    integrator
        .integrate(AscentDynamics::new(burn, aero), FlightState::default(), window)
        .expect("margin leaves mass in the tank");

    let err = integrator
        .integrate(
            AscentDynamics::new(burn, aero),
            FlightState::default(),
            spec.burn_time_s() + 1.0,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        IntegrationError::NonPositiveMass { .. } | IntegrationError::NonFinite { .. }
    ));
}

#[test]
fn search_bound_is_reported_as_non_termination() {
    let settings = SearchSettings {
        max_iterations: 5,
        ..SearchSettings::default()
    };
    let search = PayloadSearch::new(srb_vulcain(), &settings).expect("settings");
    let err = search.run().unwrap_err();
    assert!(matches!(
        err,
        SearchError::NonTermination {
            max_iterations: 5,
            ..
        }
    ));
}
