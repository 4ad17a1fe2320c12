//! Fixed-grid RK4 integration of a single stage burn.

use std::ops::{Add, Mul};

use serde::Serialize;
use thiserror::Error;

use crate::dynamics::{AscentDynamics, EquationsOfMotion, FlightState};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntegrationError {
    #[error("burn window {window_s} s is not positive")]
    DegenerateWindow { window_s: f64 },
    #[error("vehicle mass {mass_kg} kg is not positive at t = {time_s} s")]
    NonPositiveMass { time_s: f64, mass_kg: f64 },
    #[error("state became non-finite at t = {time_s} s")]
    NonFinite { time_s: f64 },
}

/// Classic fourth-order Runge-Kutta stepper over any equations of motion.
pub struct Rk4<E: EquationsOfMotion> {
    eom: E,
}

impl<E> Rk4<E>
where
    E: EquationsOfMotion,
    E::State: Clone + Add<Output = E::State> + Mul<f64, Output = E::State>,
{
    pub fn new(eom: E) -> Self {
        Self { eom }
    }

    pub fn step(&self, t: f64, state: &E::State, dt: f64) -> Result<E::State, IntegrationError> {
        let half = dt / 2.0;
        let k1 = self.eom.compute_derivative(t, state)?;

        let state2 = state.clone() + k1.clone() * half;
        let k2 = self.eom.compute_derivative(t + half, &state2)?;

        let state3 = state.clone() + k2.clone() * half;
        let k3 = self.eom.compute_derivative(t + half, &state3)?;

        let state4 = state.clone() + k3.clone() * dt;
        let k4 = self.eom.compute_derivative(t + dt, &state4)?;

        Ok(state.clone() + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (dt / 6.0))
    }
}

/// One recorded point of the ascent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrajectorySample {
    pub time_s: f64,
    pub altitude_m: f64,
    pub velocity_m_s: f64,
}

impl TrajectorySample {
    pub fn state(&self) -> FlightState {
        FlightState::new(self.altitude_m, self.velocity_m_s)
    }
}

/// Samples of one integration call, times relative to the start of the burn.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub samples: Vec<TrajectorySample>,
    pub duration_s: f64,
}

impl Segment {
    /// Index of the first sample strictly above `threshold_m`.
    pub fn first_crossing(&self, threshold_m: f64) -> Option<usize> {
        self.samples
            .iter()
            .position(|sample| sample.altitude_m > threshold_m)
    }

    pub fn last(&self) -> Option<&TrajectorySample> {
        self.samples.last()
    }
}

/// Integrates a burn on `grid_points` equally spaced samples over
/// `[0, propellant / mdot - burn_margin_s]`, taking `substeps` RK4 steps per interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageIntegrator {
    pub grid_points: usize,
    pub substeps: usize,
    pub burn_margin_s: f64,
}

impl Default for StageIntegrator {
    fn default() -> Self {
        Self {
            grid_points: 500,
            substeps: 8,
            burn_margin_s: 5.0,
        }
    }
}

impl StageIntegrator {
    /// Usable burn window for `propellant_kg` at `mass_flow_kg_s`.
    pub fn burn_window(&self, propellant_kg: f64, mass_flow_kg_s: f64) -> f64 {
        propellant_kg / mass_flow_kg_s - self.burn_margin_s
    }

    pub fn integrate_burn(
        &self,
        dynamics: AscentDynamics,
        initial: FlightState,
        propellant_kg: f64,
    ) -> Result<Segment, IntegrationError> {
        let window = self.burn_window(propellant_kg, dynamics.burn().mass_flow_kg_s);
        self.integrate(dynamics, initial, window)
    }

    pub fn integrate<E>(
        &self,
        eom: E,
        initial: FlightState,
        t_final: f64,
    ) -> Result<Segment, IntegrationError>
    where
        E: EquationsOfMotion<State = FlightState>,
    {
        if !(t_final.is_finite() && t_final > 0.0) {
            return Err(IntegrationError::DegenerateWindow { window_s: t_final });
        }
        if !initial.is_finite() {
            return Err(IntegrationError::NonFinite { time_s: 0.0 });
        }

        let points = self.grid_points.max(2);
        let substeps = self.substeps.max(1);
        let intervals = (points - 1) as f64;
        let rk4 = Rk4::new(eom);

        let mut samples = Vec::with_capacity(points);
        samples.push(TrajectorySample {
            time_s: 0.0,
            altitude_m: initial.altitude_m,
            velocity_m_s: initial.velocity_m_s,
        });

        let mut state = initial;
        for i in 0..points - 1 {
            let t_start = t_final * i as f64 / intervals;
            let t_end = t_final * (i + 1) as f64 / intervals;
            let h = (t_end - t_start) / substeps as f64;
            for j in 0..substeps {
                state = rk4.step(t_start + h * j as f64, &state, h)?;
            }
            if !state.is_finite() {
                return Err(IntegrationError::NonFinite { time_s: t_end });
            }
            samples.push(TrajectorySample {
                time_s: t_end,
                altitude_m: state.altitude_m,
                velocity_m_s: state.velocity_m_s,
            });
        }

        Ok(Segment {
            samples,
            duration_s: t_final,
        })
    }
}
