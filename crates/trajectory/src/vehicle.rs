//! Launch vehicle description consumed by the ascent simulator.

use sizing_config::{ConfigError, HeadShape, VehicleDocument};
use thiserror::Error;

/// One propulsive stage. Index 0 of [`VehicleConfig::stages`] fires first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageSpec {
    pub thrust_n: f64,
    pub mass_flow_kg_s: f64,
    pub structural_mass_kg: f64,
    pub propellant_mass_kg: f64,
}

impl StageSpec {
    /// Unloaded plus propellant mass of this stage alone.
    pub fn gross_mass_kg(&self) -> f64 {
        self.structural_mass_kg + self.propellant_mass_kg
    }

    /// Full burn duration with no margin.
    pub fn burn_time_s(&self) -> f64 {
        self.propellant_mass_kg / self.mass_flow_kg_s
    }
}

/// Nose shape driving the drag coefficient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragShape {
    Cone { half_angle_deg: f64 },
    Sphere,
    Ellipse { length_ratio: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct VehicleConfig {
    pub stages: Vec<StageSpec>,
    pub diameter_m: f64,
    pub drag_shape: DragShape,
}

#[derive(Debug, Error)]
pub enum VehicleError {
    #[error("vehicle has no stages")]
    NoStages,
    #[error("stage {stage}: {field} must be positive and finite (got {value})")]
    InvalidStage {
        stage: usize,
        field: &'static str,
        value: f64,
    },
    #[error("vehicle diameter must be positive (got {0})")]
    InvalidDiameter(f64),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl VehicleConfig {
    /// Build a validated vehicle from its parts.
    pub fn new(
        stages: Vec<StageSpec>,
        diameter_m: f64,
        drag_shape: DragShape,
    ) -> Result<Self, VehicleError> {
        let vehicle = Self {
            stages,
            diameter_m,
            drag_shape,
        };
        vehicle.validate()?;
        Ok(vehicle)
    }

    /// Convert a loaded vehicle document, resolving each stage's mass breakdown.
    pub fn from_document(doc: &VehicleDocument) -> Result<Self, VehicleError> {
        doc.validate()?;
        let drag_shape = match doc.geometry.head_shape {
            HeadShape::Cone => DragShape::Cone {
                half_angle_deg: doc.geometry.shape_parameter()?.unwrap_or(0.0),
            },
            HeadShape::Sphere => DragShape::Sphere,
            HeadShape::Elliptical => DragShape::Ellipse {
                length_ratio: doc.geometry.shape_parameter()?.unwrap_or(0.0),
            },
        };

        let stages = doc
            .stages
            .iter()
            .enumerate()
            .map(|(index, stage)| -> Result<StageSpec, ConfigError> {
                let mass = stage.mass.resolve(index)?;
                Ok(StageSpec {
                    thrust_n: stage.engines.thrust_n,
                    mass_flow_kg_s: stage.engines.mdot_kg_s,
                    structural_mass_kg: mass.structural_kg,
                    propellant_mass_kg: mass.propellant_kg,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(stages, doc.geometry.diameter_m, drag_shape)
    }

    pub fn validate(&self) -> Result<(), VehicleError> {
        if self.stages.is_empty() {
            return Err(VehicleError::NoStages);
        }
        if !(self.diameter_m.is_finite() && self.diameter_m > 0.0) {
            return Err(VehicleError::InvalidDiameter(self.diameter_m));
        }
        for (stage, spec) in self.stages.iter().enumerate() {
            let checks = [
                ("mass flow", spec.mass_flow_kg_s, spec.mass_flow_kg_s > 0.0),
                ("thrust", spec.thrust_n, spec.thrust_n >= 0.0),
                (
                    "structural mass",
                    spec.structural_mass_kg,
                    spec.structural_mass_kg >= 0.0,
                ),
                (
                    "propellant mass",
                    spec.propellant_mass_kg,
                    spec.propellant_mass_kg >= 0.0,
                ),
            ];
            for (field, value, ok) in checks {
                if !(value.is_finite() && ok) {
                    return Err(VehicleError::InvalidStage {
                        stage,
                        field,
                        value,
                    });
                }
            }
        }
        Ok(())
    }

    /// Mass of stage `index` and every stage above it, fully fuelled and without payload.
    pub fn stack_mass_from(&self, index: usize) -> f64 {
        self.stages
            .iter()
            .skip(index)
            .map(StageSpec::gross_mass_kg)
            .sum()
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}
