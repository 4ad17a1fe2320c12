//! Incremental search for the largest payload the vehicle can put into orbit.

use sizing_config::{ConfigError, SearchSettings};
use thiserror::Error;
use tracing::{debug, info};

use crate::ascent::{AscentRecord, AscentSimulator, InfeasibleReason, TrialOutcome};
use crate::vehicle::VehicleConfig;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("payload search did not terminate within {max_iterations} trials (last payload {last_payload_kg} kg still feasible)")]
    NonTermination {
        max_iterations: usize,
        last_payload_kg: f64,
    },
    #[error(transparent)]
    Settings(#[from] ConfigError),
}

/// Accepted payload together with the trajectory that supports it.
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadSolution {
    pub payload_kg: f64,
    /// Last feasible run, or the partial run of the first trial when nothing was feasible.
    pub record: AscentRecord,
    pub trials: usize,
    /// Why the first rejected payload failed.
    pub limiting_reason: InfeasibleReason,
}

impl PayloadSolution {
    pub fn is_orbit_capable(&self) -> bool {
        self.record.insertion.is_some_and(|insertion| {
            insertion.final_velocity_m_s > insertion.orbital_velocity_m_s
        })
    }
}

/// Walks payload upward from zero in fixed steps until a trial becomes infeasible.
#[derive(Debug, Clone)]
pub struct PayloadSearch {
    simulator: AscentSimulator,
    payload_step_kg: f64,
    max_iterations: usize,
}

impl PayloadSearch {
    pub fn new(vehicle: VehicleConfig, settings: &SearchSettings) -> Result<Self, SearchError> {
        settings.validate()?;
        Ok(Self {
            simulator: AscentSimulator::new(vehicle, settings),
            payload_step_kg: settings.payload_step_kg,
            max_iterations: settings.max_iterations,
        })
    }

    pub fn simulator(&self) -> &AscentSimulator {
        &self.simulator
    }

    pub fn run(&self) -> Result<PayloadSolution, SearchError> {
        let mut accepted: Option<AscentRecord> = None;

        for iteration in 0..self.max_iterations {
            let payload_kg = iteration as f64 * self.payload_step_kg;
            let outcome = self.simulator.simulate(payload_kg);
            debug!(iteration, payload_kg, feasible = outcome.is_feasible(), "payload trial");

            match outcome {
                TrialOutcome::Feasible(record) => accepted = Some(record),
                TrialOutcome::Infeasible { record, reason } => {
                    let trials = iteration + 1;
                    let record = accepted.unwrap_or(AscentRecord {
                        payload_kg: 0.0,
                        ..record
                    });
                    info!(
                        payload_kg = record.payload_kg,
                        trials,
                        limit = %reason,
                        "payload search finished"
                    );
                    return Ok(PayloadSolution {
                        payload_kg: record.payload_kg,
                        record,
                        trials,
                        limiting_reason: reason,
                    });
                }
            }
        }

        Err(SearchError::NonTermination {
            max_iterations: self.max_iterations,
            last_payload_kg: accepted.map_or(0.0, |record| record.payload_kg),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::{DragShape, StageSpec};
    use approx::assert_relative_eq;

    fn vehicle(upper_thrust_n: f64) -> VehicleConfig {
        VehicleConfig::new(
            vec![
                StageSpec {
                    thrust_n: 12.45e6,
                    mass_flow_kg_s: 5290.0,
                    structural_mass_kg: 67_500.0,
                    propellant_mass_kg: 500_000.0,
                },
                StageSpec {
                    thrust_n: upper_thrust_n,
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

    #[test]
    fn finds_largest_feasible_step() {
        let search = PayloadSearch::new(vehicle(0.8e6), &SearchSettings::default()).unwrap();
        let solution = search.run().unwrap();
        assert_relative_eq!(solution.payload_kg, 9_900.0);
        assert_eq!(solution.trials, 101);
        assert!(solution.is_orbit_capable());
        let next = search.simulator().simulate(solution.payload_kg + 100.0);
        assert!(!next.is_feasible());
        assert!(matches!(
            solution.limiting_reason,
            InfeasibleReason::InsufficientVelocity { .. }
        ));
    }

    #[test]
    fn iteration_bound_is_fatal() {
        let settings = SearchSettings {
            max_iterations: 3,
            ..SearchSettings::default()
        };
        let search = PayloadSearch::new(vehicle(0.8e6), &settings).unwrap();
        match search.run() {
            Err(SearchError::NonTermination {
                max_iterations,
                last_payload_kg,
            }) => {
                assert_eq!(max_iterations, 3);
                assert_relative_eq!(last_payload_kg, 200.0);
            }
            other => panic!("expected non-termination, got {other:?}"),
        }
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let settings = SearchSettings {
            payload_step_kg: 0.0,
            ..SearchSettings::default()
        };
        let err = PayloadSearch::new(vehicle(0.8e6), &settings).unwrap_err();
        assert!(matches!(err, SearchError::Settings(_)));
    }
}
