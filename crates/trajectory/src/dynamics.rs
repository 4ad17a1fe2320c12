//! One-dimensional point-mass equations of motion along the flight path.

use std::ops::{Add, Mul};

use sizing_core::constants::G;

use crate::aero::AeroParams;
use crate::integrator::IntegrationError;

/// ODE state: position along the flight path and speed along it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlightState {
    pub altitude_m: f64,
    pub velocity_m_s: f64,
}

impl FlightState {
    pub fn new(altitude_m: f64, velocity_m_s: f64) -> Self {
        Self {
            altitude_m,
            velocity_m_s,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.altitude_m.is_finite() && self.velocity_m_s.is_finite()
    }
}

impl Add for FlightState {
    type Output = FlightState;

    fn add(self, rhs: FlightState) -> FlightState {
        FlightState {
            altitude_m: self.altitude_m + rhs.altitude_m,
            velocity_m_s: self.velocity_m_s + rhs.velocity_m_s,
        }
    }
}

impl Mul<f64> for FlightState {
    type Output = FlightState;

    fn mul(self, rhs: f64) -> FlightState {
        FlightState {
            altitude_m: self.altitude_m * rhs,
            velocity_m_s: self.velocity_m_s * rhs,
        }
    }
}

pub trait EquationsOfMotion {
    type State;

    fn compute_derivative(
        &self,
        t: f64,
        state: &Self::State,
    ) -> Result<Self::State, IntegrationError>;
}

/// Quantities held constant during a single stage burn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BurnContext {
    pub thrust_n: f64,
    /// Vehicle mass at the start of the burn, payload excluded.
    pub initial_mass_kg: f64,
    pub mass_flow_kg_s: f64,
    /// Thrust angle off the flight path, radians.
    pub thrust_angle_rad: f64,
    /// Flight-path angle entering the gravity term, radians.
    pub flight_path_angle_rad: f64,
    pub payload_kg: f64,
}

impl BurnContext {
    /// Instantaneous vehicle mass `t` seconds into the burn.
    pub fn mass_at(&self, t: f64) -> f64 {
        self.initial_mass_kg + self.payload_kg - self.mass_flow_kg_s * t
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AscentDynamics {
    burn: BurnContext,
    aero: AeroParams,
    gravity_m_s2: f64,
}

impl AscentDynamics {
    pub fn new(burn: BurnContext, aero: AeroParams) -> Self {
        Self {
            burn,
            aero,
            gravity_m_s2: G,
        }
    }

    pub fn burn(&self) -> &BurnContext {
        &self.burn
    }
}

impl EquationsOfMotion for AscentDynamics {
    type State = FlightState;

    fn compute_derivative(
        &self,
        t: f64,
        state: &FlightState,
    ) -> Result<FlightState, IntegrationError> {
        let mass = self.burn.mass_at(t);
        if mass.is_nan() || mass <= 0.0 {
            return Err(IntegrationError::NonPositiveMass {
                time_s: t,
                mass_kg: mass,
            });
        }

        let v = state.velocity_m_s;
        let rho = sizing_atmosphere::density(state.altitude_m);
        let thrust = self.burn.thrust_n / mass * self.burn.thrust_angle_rad.cos();
        let drag = 0.5 * self.aero.drag_area_m2() * rho * v * v / mass;
        let gravity = self.gravity_m_s2 * self.burn.flight_path_angle_rad.sin();

        let derivative = FlightState {
            altitude_m: v,
            velocity_m_s: thrust - drag - gravity,
        };
        if !derivative.is_finite() {
            return Err(IntegrationError::NonFinite { time_s: t });
        }
        Ok(derivative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    fn vertical_burn() -> BurnContext {
        BurnContext {
            thrust_n: 2.0e5,
            initial_mass_kg: 1.0e4,
            mass_flow_kg_s: 50.0,
            thrust_angle_rad: 0.0,
            flight_path_angle_rad: FRAC_PI_2,
            payload_kg: 0.0,
        }
    }

    fn aero() -> AeroParams {
        AeroParams {
            drag_coefficient: 0.42,
            reference_area_m2: 1.0,
        }
    }

    #[test]
    fn liftoff_acceleration_is_thrust_minus_weight() {
        let eom = AscentDynamics::new(vertical_burn(), aero());
        let d = eom.compute_derivative(0.0, &FlightState::default()).unwrap();
        assert_relative_eq!(d.altitude_m, 0.0);
        assert_relative_eq!(d.velocity_m_s, 20.0 - G, epsilon = 1e-12);
    }

    #[test]
    fn drag_uses_sea_level_density_below_ground() {
        let eom = AscentDynamics::new(vertical_burn(), aero());
        let state = FlightState::new(-50.0, 100.0);
        let d = eom.compute_derivative(0.0, &state).unwrap();
        let drag = 0.5 * 0.42 * 1.225 * 100.0 * 100.0 / 1.0e4;
        assert_relative_eq!(d.velocity_m_s, 20.0 - drag - G, epsilon = 1e-12);
        assert_relative_eq!(d.altitude_m, 100.0);
    }

    #[test]
    fn burned_out_mass_is_an_error() {
        let eom = AscentDynamics::new(vertical_burn(), aero());
        let err = eom
            .compute_derivative(200.0, &FlightState::default())
            .unwrap_err();
        assert!(matches!(err, IntegrationError::NonPositiveMass { .. }));
    }

    #[test]
    fn state_arithmetic() {
        let s = FlightState::new(1.0, 2.0) + FlightState::new(3.0, 4.0) * 0.5;
        assert_eq!(s, FlightState::new(2.5, 4.0));
    }
}
