//! Drag coefficient and reference area derived from the vehicle geometry.

use std::f64::consts::PI;

use crate::vehicle::{DragShape, VehicleConfig};

const SPHERE_CD: f64 = 0.42;

/// Aerodynamic parameters held constant for a whole simulation run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AeroParams {
    pub drag_coefficient: f64,
    pub reference_area_m2: f64,
}

impl AeroParams {
    pub fn for_vehicle(vehicle: &VehicleConfig) -> Self {
        Self {
            drag_coefficient: drag_coefficient(vehicle.drag_shape),
            reference_area_m2: reference_area(vehicle.diameter_m),
        }
    }

    /// `S * cd`, the product the drag term actually uses.
    pub fn drag_area_m2(&self) -> f64 {
        self.drag_coefficient * self.reference_area_m2
    }
}

/// Empirical zero-lift drag coefficient of the nose shape.
///
/// Cones scale linearly with half angle; ellipses fall off slowly with slenderness.
/// A zero or negative shape parameter falls back to the sphere value.
pub fn drag_coefficient(shape: DragShape) -> f64 {
    match shape {
        DragShape::Cone { half_angle_deg } if half_angle_deg > 0.0 => {
            0.0122 * half_angle_deg + 0.162
        }
        DragShape::Ellipse { length_ratio } if length_ratio > 0.0 => {
            0.305 - (0.01 / 15.0) * (length_ratio - 10.0)
        }
        _ => SPHERE_CD,
    }
}

/// Frontal area of the body tube.
pub fn reference_area(diameter_m: f64) -> f64 {
    PI * diameter_m * diameter_m / 4.0
}
