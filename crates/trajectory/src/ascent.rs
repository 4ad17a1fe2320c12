//! Phase state machine flying one payload trial from the pad to orbit insertion.

use std::fmt;

use sizing_config::SearchSettings;
use sizing_core::{orbit::circular_velocity, units::deg_to_rad};
use thiserror::Error;
use tracing::{debug, warn};

use crate::aero::AeroParams;
use crate::dynamics::{AscentDynamics, BurnContext, FlightState};
use crate::integrator::{IntegrationError, StageIntegrator, TrajectorySample};
use crate::vehicle::VehicleConfig;

const GRAVITY_TURN_THRUST_ANGLE_DEG: f64 = 5.0;
const GRAVITY_TURN_FLIGHT_PATH_DEG: f64 = 135.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    VerticalAscent,
    GravityTurn,
    OrbitInsertion,
}

impl Phase {
    /// Thrust angle off the flight path, radians.
    pub fn thrust_angle_rad(self) -> f64 {
        match self {
            Phase::GravityTurn => deg_to_rad(GRAVITY_TURN_THRUST_ANGLE_DEG),
            Phase::VerticalAscent | Phase::OrbitInsertion => 0.0,
        }
    }

    /// Flight-path angle used by the gravity term, radians.
    pub fn flight_path_angle_rad(self) -> f64 {
        match self {
            Phase::GravityTurn => deg_to_rad(GRAVITY_TURN_FLIGHT_PATH_DEG),
            Phase::VerticalAscent | Phase::OrbitInsertion => deg_to_rad(90.0),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::VerticalAscent => "vertical ascent",
            Phase::GravityTurn => "gravity turn",
            Phase::OrbitInsertion => "orbit insertion",
        };
        f.write_str(name)
    }
}

/// Why a trial failed to reach orbit.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InfeasibleReason {
    #[error("insertion velocity {final_velocity_m_s:.2} m/s does not exceed orbital velocity {orbital_velocity_m_s:.2} m/s")]
    InsufficientVelocity {
        final_velocity_m_s: f64,
        orbital_velocity_m_s: f64,
    },
    #[error("propellant exhausted during {phase} at {altitude_m:.1} m")]
    PropellantExhausted { phase: Phase, altitude_m: f64 },
    #[error("{phase}, stage {stage}: {source}")]
    Integration {
        phase: Phase,
        stage: usize,
        #[source]
        source: IntegrationError,
    },
}

/// Impulsive insertion budget evaluated at the end of the gravity turn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Insertion {
    pub stage: usize,
    pub crossing_velocity_m_s: f64,
    /// Mass of the active stage and everything above it at the crossing, payload excluded.
    pub active_mass_kg: f64,
    pub remaining_propellant_kg: f64,
    /// Delta-v left in the active stage after the crossing.
    pub active_stage_delta_v_m_s: f64,
    /// Delta-v of the stages that never fired during the integrated ascent.
    pub unused_stages_delta_v_m_s: f64,
    pub final_velocity_m_s: f64,
    pub orbital_velocity_m_s: f64,
}

/// Everything recorded for one trial payload.
#[derive(Debug, Clone, PartialEq)]
pub struct AscentRecord {
    pub payload_kg: f64,
    pub samples: Vec<TrajectorySample>,
    pub insertion: Option<Insertion>,
}

impl AscentRecord {
    fn new(payload_kg: f64) -> Self {
        Self {
            payload_kg,
            samples: Vec::new(),
            insertion: None,
        }
    }

    pub fn heights(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.altitude_m).collect()
    }

    pub fn velocities(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.velocity_m_s).collect()
    }

    pub fn times(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.time_s).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrialOutcome {
    Feasible(AscentRecord),
    Infeasible {
        record: AscentRecord,
        reason: InfeasibleReason,
    },
}

impl TrialOutcome {
    pub fn is_feasible(&self) -> bool {
        matches!(self, TrialOutcome::Feasible(_))
    }

    pub fn record(&self) -> &AscentRecord {
        match self {
            TrialOutcome::Feasible(record) | TrialOutcome::Infeasible { record, .. } => record,
        }
    }

    pub fn into_record(self) -> AscentRecord {
        match self {
            TrialOutcome::Feasible(record) | TrialOutcome::Infeasible { record, .. } => record,
        }
    }

    pub fn reason(&self) -> Option<&InfeasibleReason> {
        match self {
            TrialOutcome::Feasible(_) => None,
            TrialOutcome::Infeasible { reason, .. } => Some(reason),
        }
    }
}

/// Stage currently burning and what is left of it.
#[derive(Debug, Clone, Copy)]
struct ActiveBurn {
    stage: usize,
    /// Mass of this stage and everything above it, payload excluded.
    initial_mass_kg: f64,
    propellant_kg: f64,
}

impl ActiveBurn {
    fn fresh(vehicle: &VehicleConfig, stage: usize) -> Self {
        Self {
            stage,
            initial_mass_kg: vehicle.stack_mass_from(stage),
            propellant_kg: vehicle.stages[stage].propellant_mass_kg,
        }
    }

    /// Account for `elapsed_s` seconds already burned.
    fn consume(&mut self, mass_flow_kg_s: f64, elapsed_s: f64) {
        let burned = mass_flow_kg_s * elapsed_s;
        self.initial_mass_kg -= burned;
        self.propellant_kg -= burned;
    }
}

/// Run-level trajectory log with mission elapsed time.
struct FlightLog {
    record: AscentRecord,
    clock_s: f64,
}

impl FlightLog {
    fn append(&mut self, samples: &[TrajectorySample]) {
        let offset = self.clock_s;
        self.record
            .samples
            .extend(samples.iter().map(|s| TrajectorySample {
                time_s: s.time_s + offset,
                ..*s
            }));
    }
}

/// Flies a vehicle through vertical ascent and gravity turn, then checks orbit insertion.
#[derive(Debug, Clone)]
pub struct AscentSimulator {
    vehicle: VehicleConfig,
    aero: AeroParams,
    integrator: StageIntegrator,
    vertical_ceiling_m: f64,
    insertion_altitude_m: f64,
    orbital_velocity_m_s: f64,
}

impl AscentSimulator {
    pub fn new(vehicle: VehicleConfig, settings: &SearchSettings) -> Self {
        let aero = AeroParams::for_vehicle(&vehicle);
        Self {
            vehicle,
            aero,
            integrator: StageIntegrator {
                grid_points: settings.grid_points,
                substeps: settings.substeps_per_interval,
                burn_margin_s: settings.burn_margin_s,
            },
            vertical_ceiling_m: settings.vertical_ascent_ceiling_m,
            insertion_altitude_m: settings.insertion_altitude_m,
            orbital_velocity_m_s: circular_velocity(settings.target_orbit_altitude_m),
        }
    }

    pub fn vehicle(&self) -> &VehicleConfig {
        &self.vehicle
    }

    pub fn orbital_velocity_m_s(&self) -> f64 {
        self.orbital_velocity_m_s
    }

    /// Simulate one trial payload. Numerical trouble is reported as an infeasible outcome.
    pub fn simulate(&self, payload_kg: f64) -> TrialOutcome {
        let mut log = FlightLog {
            record: AscentRecord::new(payload_kg),
            clock_s: 0.0,
        };
        match self.fly(payload_kg, &mut log) {
            Ok(insertion) => {
                log.record.insertion = Some(insertion);
                if insertion.final_velocity_m_s > insertion.orbital_velocity_m_s {
                    TrialOutcome::Feasible(log.record)
                } else {
                    TrialOutcome::Infeasible {
                        record: log.record,
                        reason: InfeasibleReason::InsufficientVelocity {
                            final_velocity_m_s: insertion.final_velocity_m_s,
                            orbital_velocity_m_s: insertion.orbital_velocity_m_s,
                        },
                    }
                }
            }
            Err(reason) => {
                if let InfeasibleReason::Integration { phase, stage, source } = &reason {
                    warn!(payload_kg, %phase, stage, error = %source, "integration aborted trial");
                }
                TrialOutcome::Infeasible {
                    record: log.record,
                    reason,
                }
            }
        }
    }

    fn fly(&self, payload_kg: f64, log: &mut FlightLog) -> Result<Insertion, InfeasibleReason> {
        let mut burn = ActiveBurn::fresh(&self.vehicle, 0);
        let mut state = FlightState::default();

        self.fly_phase(
            Phase::VerticalAscent,
            self.vertical_ceiling_m,
            payload_kg,
            &mut burn,
            &mut state,
            log,
        )?;
        let crossing = self.fly_phase(
            Phase::GravityTurn,
            self.insertion_altitude_m,
            payload_kg,
            &mut burn,
            &mut state,
            log,
        )?;
        self.insert(payload_kg, &burn, crossing)
    }

    /// Integrate stage burns until the altitude strictly exceeds `threshold_m`.
    ///
    /// Samples before the crossing are logged; the crossing sample becomes the start of the
    /// next phase and `burn` is reduced by the propellant spent up to it.
    fn fly_phase(
        &self,
        phase: Phase,
        threshold_m: f64,
        payload_kg: f64,
        burn: &mut ActiveBurn,
        state: &mut FlightState,
        log: &mut FlightLog,
    ) -> Result<TrajectorySample, InfeasibleReason> {
        let first_stage = burn.stage;
        for stage in first_stage..self.vehicle.stage_count() {
            if stage != first_stage {
                *burn = ActiveBurn::fresh(&self.vehicle, stage);
            }
            let spec = self.vehicle.stages[stage];
            let context = BurnContext {
                thrust_n: spec.thrust_n,
                initial_mass_kg: burn.initial_mass_kg,
                mass_flow_kg_s: spec.mass_flow_kg_s,
                thrust_angle_rad: phase.thrust_angle_rad(),
                flight_path_angle_rad: phase.flight_path_angle_rad(),
                payload_kg,
            };
            let segment = self
                .integrator
                .integrate_burn(
                    AscentDynamics::new(context, self.aero),
                    *state,
                    burn.propellant_kg,
                )
                .map_err(|source| InfeasibleReason::Integration {
                    phase,
                    stage,
                    source,
                })?;

            // A continuation segment starts on the previous segment's final sample.
            let skip = usize::from(stage != first_stage);

            if let Some(index) = segment.first_crossing(threshold_m) {
                log.append(&segment.samples[skip.min(index)..index]);
                let crossing = segment.samples[index];
                burn.consume(spec.mass_flow_kg_s, crossing.time_s);
                *state = crossing.state();
                log.clock_s += crossing.time_s;
                debug!(
                    %phase,
                    stage,
                    time_s = log.clock_s,
                    velocity_m_s = crossing.velocity_m_s,
                    "phase threshold crossed"
                );
                return Ok(TrajectorySample {
                    time_s: log.clock_s,
                    ..crossing
                });
            }

            log.append(&segment.samples[skip.min(segment.samples.len())..]);
            log.clock_s += segment.duration_s;
            if let Some(last) = segment.last() {
                *state = last.state();
            }
            debug!(
                %phase,
                stage,
                altitude_m = state.altitude_m,
                "stage burned out below threshold"
            );
        }

        Err(InfeasibleReason::PropellantExhausted {
            phase,
            altitude_m: state.altitude_m,
        })
    }

    /// Impulsive delta-v budget at the gravity turn exit.
    fn insert(
        &self,
        payload_kg: f64,
        burn: &ActiveBurn,
        crossing: TrajectorySample,
    ) -> Result<Insertion, InfeasibleReason> {
        let spec = self.vehicle.stages[burn.stage];
        let wet = burn.initial_mass_kg + payload_kg;
        let dry = wet - burn.propellant_kg;
        if !(dry > 0.0) {
            return Err(self.insertion_mass_error(burn.stage, crossing.time_s, dry));
        }
        let active = spec.thrust_n / spec.mass_flow_kg_s * (wet / dry).ln();

        let mut unused = 0.0;
        for stage in burn.stage + 1..self.vehicle.stage_count() {
            let upper = self.vehicle.stages[stage];
            let burn_time = upper.burn_time_s();
            let burnout_mass = self.vehicle.stack_mass_from(stage) + payload_kg
                - upper.mass_flow_kg_s * burn_time;
            if !(burnout_mass > 0.0) {
                return Err(self.insertion_mass_error(stage, crossing.time_s, burnout_mass));
            }
            unused += upper.thrust_n / burnout_mass * burn_time;
        }

        let final_velocity = crossing.velocity_m_s / 2.0 + active + unused;
        if !final_velocity.is_finite() {
            return Err(InfeasibleReason::Integration {
                phase: Phase::OrbitInsertion,
                stage: burn.stage,
                source: IntegrationError::NonFinite {
                    time_s: crossing.time_s,
                },
            });
        }

        Ok(Insertion {
            stage: burn.stage,
            crossing_velocity_m_s: crossing.velocity_m_s,
            active_mass_kg: burn.initial_mass_kg,
            remaining_propellant_kg: burn.propellant_kg,
            active_stage_delta_v_m_s: active,
            unused_stages_delta_v_m_s: unused,
            final_velocity_m_s: final_velocity,
            orbital_velocity_m_s: self.orbital_velocity_m_s,
        })
    }

    fn insertion_mass_error(&self, stage: usize, time_s: f64, mass_kg: f64) -> InfeasibleReason {
        InfeasibleReason::Integration {
            phase: Phase::OrbitInsertion,
            stage,
            source: IntegrationError::NonPositiveMass { time_s, mass_kg },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::{DragShape, StageSpec};
    use approx::assert_relative_eq;

    fn two_stage() -> VehicleConfig {
        VehicleConfig::new(
            vec![
                StageSpec {
                    thrust_n: 12.45e6,
                    mass_flow_kg_s: 5290.0,
                    structural_mass_kg: 67_500.0,
                    propellant_mass_kg: 500_000.0,
                },
                StageSpec {
                    thrust_n: 0.8e6,
                    mass_flow_kg_s: 188.33,
                    structural_mass_kg: 15_000.0,
                    propellant_mass_kg: 100_000.0,
                },
            ],
            4.0,
            DragShape::Cone { half_angle_deg: 15.0 },
        )
        .unwrap()
    }

    fn weak_single_stage() -> VehicleConfig {
        VehicleConfig::new(
            vec![StageSpec {
                thrust_n: 6.0e5,
                mass_flow_kg_s: 300.0,
                structural_mass_kg: 40_000.0,
                propellant_mass_kg: 20_000.0,
            }],
            3.0,
            DragShape::Sphere,
        )
        .unwrap()
    }

    fn three_stage(booster: StageSpec) -> VehicleConfig {
        VehicleConfig::new(
            vec![
                booster,
                StageSpec {
                    thrust_n: 2.1e6,
                    mass_flow_kg_s: 764.0,
                    structural_mass_kg: 12_000.0,
                    propellant_mass_kg: 90_000.0,
                },
                StageSpec {
                    thrust_n: 0.8e6,
                    mass_flow_kg_s: 188.33,
                    structural_mass_kg: 15_000.0,
                    propellant_mass_kg: 50_000.0,
                },
            ],
            4.0,
            DragShape::Cone { half_angle_deg: 15.0 },
        )
        .unwrap()
    }

    #[test]
    fn phase_angles() {
        assert_relative_eq!(Phase::VerticalAscent.thrust_angle_rad(), 0.0);
        assert_relative_eq!(
            Phase::VerticalAscent.flight_path_angle_rad(),
            std::f64::consts::FRAC_PI_2
        );
        assert_relative_eq!(Phase::GravityTurn.thrust_angle_rad(), 5.0_f64.to_radians());
        assert_relative_eq!(
            Phase::GravityTurn.flight_path_angle_rad(),
            135.0_f64.to_radians()
        );
    }

    #[test]
    fn light_payload_reaches_orbit() {
        let sim = AscentSimulator::new(two_stage(), &SearchSettings::default());
        let outcome = sim.simulate(0.0);
        assert!(outcome.is_feasible(), "{:?}", outcome.reason());
        let record = outcome.record();
        let insertion = record.insertion.unwrap();
        assert_eq!(insertion.stage, 1);
        assert!(insertion.final_velocity_m_s > insertion.orbital_velocity_m_s);
        assert!(record.samples.last().unwrap().altitude_m <= 100_000.0);
    }

    #[test]
    fn recorded_samples_are_strictly_ordered() {
        let sim = AscentSimulator::new(two_stage(), &SearchSettings::default());
        let record = sim.simulate(5_000.0).into_record();
        for pair in record.samples.windows(2) {
            assert!(pair[1].time_s > pair[0].time_s);
            assert!(pair[1].altitude_m > pair[0].altitude_m);
        }
    }

    #[test]
    fn heavy_payload_falls_short() {
        let sim = AscentSimulator::new(two_stage(), &SearchSettings::default());
        let outcome = sim.simulate(10_000.0);
        assert!(matches!(
            outcome.reason(),
            Some(InfeasibleReason::InsufficientVelocity { .. })
        ));
        assert!(outcome.record().insertion.is_some());
    }

    #[test]
    fn exhausted_single_stage_keeps_partial_record() {
        let sim = AscentSimulator::new(weak_single_stage(), &SearchSettings::default());
        let outcome = sim.simulate(0.0);
        match outcome.reason() {
            Some(InfeasibleReason::PropellantExhausted { phase, altitude_m }) => {
                assert_eq!(*phase, Phase::VerticalAscent);
                assert!(*altitude_m < 10_000.0);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(outcome.record().samples.len(), 500);
        assert!(outcome.record().insertion.is_none());
    }

    #[test]
    fn insertion_budget_follows_rocket_equation() {
        let booster = StageSpec {
            thrust_n: 12.45e6,
            mass_flow_kg_s: 5290.0,
            structural_mass_kg: 67_500.0,
            propellant_mass_kg: 500_000.0,
        };
        let sim = AscentSimulator::new(three_stage(booster), &SearchSettings::default());
        let payload = 1_000.0;
        let insertion = sim
            .simulate(payload)
            .into_record()
            .insertion
            .expect("gravity turn completed");
        let vehicle = sim.vehicle();
        assert_eq!(insertion.stage, 1);

        let active = vehicle.stages[insertion.stage];
        assert!(insertion.remaining_propellant_kg > 0.0);
        assert!(insertion.remaining_propellant_kg < active.propellant_mass_kg);
        assert_relative_eq!(
            insertion.active_mass_kg - insertion.remaining_propellant_kg,
            vehicle.stack_mass_from(insertion.stage) - active.propellant_mass_kg,
            max_relative = 1e-12
        );

        let wet = insertion.active_mass_kg + payload;
        let dry = wet - insertion.remaining_propellant_kg;
        assert_relative_eq!(
            insertion.active_stage_delta_v_m_s,
            active.thrust_n / active.mass_flow_kg_s * (wet / dry).ln(),
            max_relative = 1e-12
        );

        // Only the top stage is unused: full burn, burnout mass = its structure plus payload.
        let burn_time = 50_000.0 / 188.33;
        let unused = 0.8e6 / (65_000.0 + payload - 188.33 * burn_time) * burn_time;
        assert_relative_eq!(insertion.unused_stages_delta_v_m_s, unused, max_relative = 1e-12);
        assert_relative_eq!(insertion.unused_stages_delta_v_m_s, 13_274.571_231, epsilon = 1e-5);

        assert_relative_eq!(
            insertion.final_velocity_m_s,
            insertion.crossing_velocity_m_s / 2.0
                + insertion.active_stage_delta_v_m_s
                + insertion.unused_stages_delta_v_m_s,
            max_relative = 1e-12
        );
    }

    #[test]
    fn booster_burnout_below_ceiling_hands_over_to_next_stage() {
        let booster = StageSpec {
            thrust_n: 3.0e6,
            mass_flow_kg_s: 1_500.0,
            structural_mass_kg: 5_000.0,
            propellant_mass_kg: 40_000.0,
        };
        let sim = AscentSimulator::new(three_stage(booster), &SearchSettings::default());
        let record = sim.simulate(0.0).into_record();

        assert!(record.samples.len() > 500);
        let burnout = record.samples[499];
        assert_relative_eq!(burnout.time_s, 40_000.0 / 1_500.0 - 5.0, epsilon = 1e-9);
        assert!(burnout.altitude_m < 10_000.0);

        let handover = record.samples[500];
        assert!(handover.time_s > burnout.time_s);
        assert!(handover.altitude_m > burnout.altitude_m);
        for pair in record.samples.windows(2) {
            assert!(pair[1].time_s > pair[0].time_s);
            assert!(pair[1].altitude_m > pair[0].altitude_m);
        }
    }

    #[test]
    fn too_short_burn_is_an_integration_failure() {
        let vehicle = VehicleConfig::new(
            vec![StageSpec {
                thrust_n: 1.0e6,
                mass_flow_kg_s: 1_000.0,
                structural_mass_kg: 1_000.0,
                propellant_mass_kg: 4_000.0,
            }],
            2.0,
            DragShape::Sphere,
        )
        .unwrap();
        let sim = AscentSimulator::new(vehicle, &SearchSettings::default());
        let outcome = sim.simulate(0.0);
        assert!(matches!(
            outcome.reason(),
            Some(InfeasibleReason::Integration {
                phase: Phase::VerticalAscent,
                stage: 0,
                source: IntegrationError::DegenerateWindow { .. },
            })
        ));
        assert!(outcome.record().samples.is_empty());
    }
}
