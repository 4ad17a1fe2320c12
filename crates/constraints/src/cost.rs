//! Launcher production cost from engine, propellant and structure contributions.
//!
//! Engine costs follow the TRANSCOST production-cost relations in work-years, converted
//! to dollars.

use serde::Serialize;
use sizing_config::{ConfigError, MassBreakdown, VehicleDocument};
use tracing::debug;

use crate::ConstraintError;

/// Dollars per TRANSCOST work-year.
const DOLLARS_PER_WORK_YEAR: f64 = 366_518.0;
/// Learning factor applied to every engine production estimate.
const LEARNING_FACTOR: f64 = 0.85;
const SOLID_COST_PER_KG: f64 = 5.0;
const LOX_COST_PER_KG: f64 = 0.27;
const LH2_COST_PER_KG: f64 = 6.1;
const STRUCTURE_COST_PER_KG: f64 = 3.0;

/// What the cost model needs from one stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageCostInput {
    pub engine_count: u32,
    pub mass: MassBreakdown,
}

impl StageCostInput {
    /// Per-stage inputs of a vehicle document, in firing order.
    pub fn from_document(document: &VehicleDocument) -> Result<Vec<Self>, ConfigError> {
        document
            .stages
            .iter()
            .enumerate()
            .map(|(index, stage)| -> Result<Self, ConfigError> {
                Ok(Self {
                    engine_count: stage.engines.count,
                    mass: stage.mass.breakdown(index)?,
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StageCost {
    pub engines_usd: f64,
    pub propellant_usd: f64,
    pub structure_usd: f64,
}

impl StageCost {
    pub fn total_usd(&self) -> f64 {
        self.engines_usd + self.propellant_usd + self.structure_usd
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostBreakdown {
    pub stages: Vec<StageCost>,
    pub total_usd: f64,
}

/// Engine production cost of a stage in work-years.
///
/// Stages burning solid propellant use the solid motor relation on casing plus propellant,
/// the rest use the liquid engine relation on the engine hardware mass.
fn engine_work_years(stage: &StageCostInput) -> f64 {
    let n = f64::from(stage.engine_count);
    let mass = &stage.mass;
    if mass.solid_propellant_kg > 0.0 {
        LEARNING_FACTOR * n * 2.3 * (mass.engine_kg + mass.solid_propellant_kg).powf(0.399)
    } else {
        LEARNING_FACTOR * n * 5.16 * mass.engine_kg.powf(0.45)
    }
}

fn propellant_usd(mass: &MassBreakdown) -> f64 {
    if mass.hydrogen_kg > 0.0 {
        mass.hydrogen_kg * LH2_COST_PER_KG + mass.lox_kg * LOX_COST_PER_KG
    } else {
        mass.solid_propellant_kg * SOLID_COST_PER_KG
    }
}

pub fn stage_cost(stage: &StageCostInput) -> StageCost {
    StageCost {
        engines_usd: engine_work_years(stage) * DOLLARS_PER_WORK_YEAR,
        propellant_usd: propellant_usd(&stage.mass),
        structure_usd: stage.mass.structure_kg.max(0.0) * STRUCTURE_COST_PER_KG,
    }
}

/// Total production cost of the launcher.
pub fn launcher_cost(stages: &[StageCostInput]) -> Result<CostBreakdown, ConstraintError> {
    if stages.is_empty() {
        return Err(ConstraintError::NoStages);
    }
    for stage in stages {
        if stage.engine_count == 0 {
            return Err(ConstraintError::InvalidLimit {
                field: "engine_count",
                value: 0.0,
            });
        }
        let masses = [
            ("engine_kg", stage.mass.engine_kg),
            ("solid_propellant_kg", stage.mass.solid_propellant_kg),
            ("hydrogen_kg", stage.mass.hydrogen_kg),
            ("lox_kg", stage.mass.lox_kg),
        ];
        for (field, value) in masses {
            if !value.is_finite() || value < 0.0 {
                return Err(ConstraintError::InvalidLimit { field, value });
            }
        }
    }

    let stages: Vec<StageCost> = stages.iter().map(stage_cost).collect();
    let total_usd = stages.iter().map(StageCost::total_usd).sum();
    debug!(total_usd, stages = stages.len(), "launcher cost");
    Ok(CostBreakdown { stages, total_usd })
}
