//! Constraint checks run against a finished ascent.
//!
//! Every check reports a scalar where `value <= 0` means the constraint is satisfied.
//! [`cost`] estimates the launcher production cost from the same stage breakdown.

pub mod cost;

pub use cost::{CostBreakdown, StageCost, StageCostInput, launcher_cost};

use serde::Serialize;
use sizing_config::{PayloadBay, StructureLimits, TemperatureLimits, TrajectoryProfile};
use sizing_core::constants::RHO_SEA_LEVEL;
use thiserror::Error;
use tracing::debug;

/// Ratio of specific heats term `(gamma - 1) / 2` for air.
const STAGNATION_FACTOR: f64 = 0.2;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConstraintError {
    #[error("vehicle has no stages")]
    NoStages,
    #[error("trajectory has no samples")]
    EmptyTrajectory,
    #[error("trajectory has {heights} heights but {velocities} velocities")]
    LengthMismatch { heights: usize, velocities: usize },
    #[error("{field} must be positive and finite (got {value})")]
    InvalidLimit { field: &'static str, value: f64 },
}

/// Outcome of one constraint check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConstraintReport {
    /// Worst excess over the limit; satisfied when `<= 0`.
    pub value: f64,
    /// Sample index at which `value` was attained, if trajectory based.
    pub critical_index: Option<usize>,
}

impl ConstraintReport {
    pub fn is_satisfied(&self) -> bool {
        self.value <= 0.0
    }
}

fn check_profile(profile: &TrajectoryProfile) -> Result<(), ConstraintError> {
    if profile.height.len() != profile.velocity.len() {
        return Err(ConstraintError::LengthMismatch {
            heights: profile.height.len(),
            velocities: profile.velocity.len(),
        });
    }
    if profile.height.is_empty() {
        return Err(ConstraintError::EmptyTrajectory);
    }
    Ok(())
}

fn positive(field: &'static str, value: f64) -> Result<f64, ConstraintError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConstraintError::InvalidLimit { field, value })
    }
}

/// Largest excess of `excess(h, v)` over the trajectory.
fn worst<F>(profile: &TrajectoryProfile, excess: F) -> ConstraintReport
where
    F: Fn(f64, f64) -> f64,
{
    let (index, value) = profile
        .height
        .iter()
        .zip(&profile.velocity)
        .map(|(&h, &v)| excess(h, v))
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, value)| {
            if value > best.1 { (i, value) } else { best }
        });
    ConstraintReport {
        value,
        critical_index: Some(index),
    }
}

/// Dynamic pressure `0.5 rho v^2` at a trajectory point.
pub fn dynamic_pressure(altitude_m: f64, velocity_m_s: f64) -> f64 {
    let rho = if altitude_m < 0.0 {
        RHO_SEA_LEVEL
    } else {
        sizing_atmosphere::density(altitude_m)
    };
    0.5 * rho * velocity_m_s * velocity_m_s
}

/// Stagnation temperature `T (1 + 0.2 M^2)` of the free stream at a trajectory point.
pub fn stagnation_temperature(altitude_m: f64, velocity_m_s: f64) -> f64 {
    let air = sizing_atmosphere::clamped(altitude_m);
    let mach = velocity_m_s / air.speed_of_sound_m_s;
    air.temperature_k + STAGNATION_FACTOR * mach * mach * air.temperature_k
}

/// Peak dynamic pressure minus the allowed maximum.
pub fn structural(
    limits: &StructureLimits,
    trajectory: &TrajectoryProfile,
) -> Result<ConstraintReport, ConstraintError> {
    check_profile(trajectory)?;
    let max_q = positive("max_q_pa", limits.max_q_pa)?;
    let report = worst(trajectory, |h, v| dynamic_pressure(h, v) - max_q);
    debug!(value = report.value, index = ?report.critical_index, "structural constraint");
    Ok(report)
}

/// Peak stagnation temperature minus the allowed maximum.
pub fn thermal(
    limits: &TemperatureLimits,
    trajectory: &TrajectoryProfile,
) -> Result<ConstraintReport, ConstraintError> {
    check_profile(trajectory)?;
    let t_max = positive("t_max_k", limits.t_max_k)?;
    let report = worst(trajectory, |h, v| stagnation_temperature(h, v) - t_max);
    debug!(value = report.value, index = ?report.critical_index, "thermal constraint");
    Ok(report)
}

/// Volume the payload occupies beyond what the fairing offers.
pub fn payload_volume(bay: &PayloadBay) -> Result<ConstraintReport, ConstraintError> {
    let density = positive("density_kg_m3", bay.density_kg_m3)?;
    if !(bay.mass_kg.is_finite() && bay.mass_kg >= 0.0) {
        return Err(ConstraintError::InvalidLimit {
            field: "mass_kg",
            value: bay.mass_kg,
        });
    }
    let value = bay.mass_kg / density - bay.available_volume_m3;
    debug!(value, "payload volume constraint");
    Ok(ConstraintReport {
        value,
        critical_index: None,
    })
}
