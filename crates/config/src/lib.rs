//! Document models and loaders for the rocket sizing tools.
//!
//! Every tool reads one document describing (a slice of) the shared vehicle model. Field
//! names accept both the snake_case spelling used in this workspace and the spelling of
//! the shared vehicle model (`Thrust`, `Head_shape`, `LOX`, ...).

use std::fs::File;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Launch vehicle description consumed by the trajectory tool.
#[derive(Debug, Deserialize, Clone)]
pub struct VehicleDocument {
    #[serde(alias = "Geometry")]
    pub geometry: GeometryDocument,
    /// Stages ordered bottom-first: index 0 fires first.
    #[serde(rename = "stage", alias = "Stage", alias = "stages")]
    pub stages: Vec<StageDocument>,
}

/// Vehicle-level geometry relevant to drag.
#[derive(Debug, Deserialize, Clone)]
pub struct GeometryDocument {
    #[serde(alias = "Head_shape")]
    pub head_shape: HeadShape,
    #[serde(default, alias = "Cone_angle")]
    pub cone_angle_deg: Option<f64>,
    #[serde(default, alias = "L_ratio_ellipse")]
    pub l_ratio_ellipse: Option<f64>,
    #[serde(alias = "Diameter")]
    pub diameter_m: f64,
}

/// Nose (head) shape of the top stage.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum HeadShape {
    #[serde(alias = "cone")]
    Cone,
    #[serde(alias = "sphere")]
    Sphere,
    #[serde(alias = "elliptical", alias = "Ellipse")]
    Elliptical,
}

/// One propulsion stage as written by the engine and mass tools.
#[derive(Debug, Deserialize, Clone)]
pub struct StageDocument {
    #[serde(alias = "Engines")]
    pub engines: EnginesDocument,
    #[serde(alias = "Mass")]
    pub mass: StageMassDocument,
}

/// Aggregate engine performance of a stage.
#[derive(Debug, Deserialize, Clone)]
pub struct EnginesDocument {
    #[serde(alias = "Thrust")]
    pub thrust_n: f64,
    #[serde(alias = "mdot")]
    pub mdot_kg_s: f64,
    /// Number of engines on the stage, used by the cost model.
    #[serde(default = "one_engine", alias = "Count", alias = "n_engines")]
    pub count: u32,
}

fn one_engine() -> u32 {
    1
}

/// Mass breakdown of a stage. Solid stages carry `propellant` and `casing`, liquid stages
/// carry `pumps`, `hydrogen`, `lox`, `tanks` and `insulation`. `structure` is the optional
/// head structure of the top stage.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct StageMassDocument {
    #[serde(default, alias = "Propellant")]
    pub propellant: Option<f64>,
    #[serde(default, alias = "Casing")]
    pub casing: Option<f64>,
    #[serde(default, alias = "Pumps")]
    pub pumps: Option<f64>,
    #[serde(default, alias = "Hydrogen")]
    pub hydrogen: Option<f64>,
    #[serde(default, alias = "LOX")]
    pub lox: Option<f64>,
    #[serde(default, alias = "Tanks")]
    pub tanks: Option<f64>,
    #[serde(default, alias = "Insulation")]
    pub insulation: Option<f64>,
    #[serde(default, alias = "Structure")]
    pub structure: Option<f64>,
}

/// Propellant family a stage mass breakdown resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropellantKind {
    Solid,
    Liquid,
}

/// Structural and propellant mass of a stage after resolving its breakdown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageMass {
    pub kind: PropellantKind,
    pub structural_kg: f64,
    pub propellant_kg: f64,
}

/// Stage mass split by the role each part plays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassBreakdown {
    pub kind: PropellantKind,
    /// Casing of a solid motor, or pumps, tanks and insulation of a liquid stage.
    pub engine_kg: f64,
    pub solid_propellant_kg: f64,
    pub hydrogen_kg: f64,
    pub lox_kg: f64,
    pub structure_kg: f64,
}

impl MassBreakdown {
    pub fn structural_kg(&self) -> f64 {
        self.engine_kg + self.structure_kg
    }

    pub fn propellant_kg(&self) -> f64 {
        self.solid_propellant_kg + self.hydrogen_kg + self.lox_kg
    }
}

impl StageMassDocument {
    /// Split the document into engine, propellant and structure masses.
    ///
    /// A complete liquid breakdown wins over a solid one.
    pub fn breakdown(&self, stage: usize) -> Result<MassBreakdown, ConfigError> {
        let liquid = (
            self.pumps,
            self.hydrogen,
            self.lox,
            self.tanks,
            self.insulation,
        );
        let structure_kg = self.structure.unwrap_or(0.0);
        match (liquid, self.propellant, self.casing) {
            ((Some(pumps), Some(hydrogen), Some(lox), Some(tanks), Some(insulation)), _, _) => {
                Ok(MassBreakdown {
                    kind: PropellantKind::Liquid,
                    engine_kg: pumps + tanks + insulation,
                    solid_propellant_kg: 0.0,
                    hydrogen_kg: hydrogen,
                    lox_kg: lox,
                    structure_kg,
                })
            }
            (_, Some(propellant), Some(casing)) => Ok(MassBreakdown {
                kind: PropellantKind::Solid,
                engine_kg: casing,
                solid_propellant_kg: propellant,
                hydrogen_kg: 0.0,
                lox_kg: 0.0,
                structure_kg,
            }),
            _ => Err(ConfigError::IncompleteStageMass { stage }),
        }
    }

    /// Resolve the breakdown into structural and propellant mass.
    ///
    /// `structure` is added to the structural mass of either kind.
    pub fn resolve(&self, stage: usize) -> Result<StageMass, ConfigError> {
        let breakdown = self.breakdown(stage)?;
        let mass = StageMass {
            kind: breakdown.kind,
            structural_kg: breakdown.structural_kg(),
            propellant_kg: breakdown.propellant_kg(),
        };

        if !mass.structural_kg.is_finite() || mass.structural_kg < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: format!("stage[{stage}].mass.structural"),
                value: mass.structural_kg,
            });
        }
        if !mass.propellant_kg.is_finite() || mass.propellant_kg < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: format!("stage[{stage}].mass.propellant"),
                value: mass.propellant_kg,
            });
        }
        Ok(mass)
    }
}

impl GeometryDocument {
    /// Shape parameter required by the head shape (cone half-angle or ellipse length ratio).
    pub fn shape_parameter(&self) -> Result<Option<f64>, ConfigError> {
        match self.head_shape {
            HeadShape::Cone => self
                .cone_angle_deg
                .map(Some)
                .ok_or(ConfigError::MissingField("Geometry/Cone_angle")),
            HeadShape::Elliptical => self
                .l_ratio_ellipse
                .map(Some)
                .ok_or(ConfigError::MissingField("Geometry/L_ratio_ellipse")),
            HeadShape::Sphere => Ok(None),
        }
    }
}

impl VehicleDocument {
    /// Check the document for missing or malformed fields without building a model.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stages.is_empty() {
            return Err(ConfigError::NoStages);
        }
        self.geometry.shape_parameter()?;
        if !self.geometry.diameter_m.is_finite() || self.geometry.diameter_m <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "Geometry/Diameter".to_string(),
                value: self.geometry.diameter_m,
            });
        }
        for (index, stage) in self.stages.iter().enumerate() {
            stage.mass.resolve(index)?;
            if !stage.engines.mdot_kg_s.is_finite() || stage.engines.mdot_kg_s <= 0.0 {
                return Err(ConfigError::InvalidValue {
                    field: format!("stage[{index}].engines.mdot"),
                    value: stage.engines.mdot_kg_s,
                });
            }
            if !stage.engines.thrust_n.is_finite() || stage.engines.thrust_n < 0.0 {
                return Err(ConfigError::InvalidValue {
                    field: format!("stage[{index}].engines.thrust"),
                    value: stage.engines.thrust_n,
                });
            }
            if stage.engines.count == 0 {
                return Err(ConfigError::InvalidValue {
                    field: format!("stage[{index}].engines.count"),
                    value: 0.0,
                });
            }
        }
        Ok(())
    }
}

/// Height and velocity profile produced by the trajectory tool.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct TrajectoryProfile {
    #[serde(alias = "Height")]
    pub height: Vec<f64>,
    #[serde(alias = "Velocity")]
    pub velocity: Vec<f64>,
}

/// Maximum dynamic pressure the structure withstands.
#[derive(Debug, Deserialize, Clone)]
pub struct StructureLimits {
    #[serde(alias = "Max_q")]
    pub max_q_pa: f64,
}

/// Maximum stagnation temperature the vehicle skin withstands.
#[derive(Debug, Deserialize, Clone)]
pub struct TemperatureLimits {
    #[serde(alias = "T_max")]
    pub t_max_k: f64,
}

/// Payload fairing capacity and the payload it must hold.
#[derive(Debug, Deserialize, Clone)]
pub struct PayloadBay {
    #[serde(alias = "Available_volume")]
    pub available_volume_m3: f64,
    #[serde(alias = "Mass")]
    pub mass_kg: f64,
    #[serde(alias = "Density")]
    pub density_kg_m3: f64,
}

/// Input of the structural (max-q) check.
#[derive(Debug, Deserialize, Clone)]
pub struct StructuralInput {
    #[serde(alias = "Structure")]
    pub structure: StructureLimits,
    #[serde(alias = "Trajectory")]
    pub trajectory: TrajectoryProfile,
}

/// Input of the thermal (stagnation temperature) check.
#[derive(Debug, Deserialize, Clone)]
pub struct ThermalInput {
    #[serde(alias = "Temperature")]
    pub temperature: TemperatureLimits,
    #[serde(alias = "Trajectory")]
    pub trajectory: TrajectoryProfile,
}

/// Input of the payload volume check.
#[derive(Debug, Deserialize, Clone)]
pub struct PayloadInput {
    #[serde(alias = "Payload")]
    pub payload: PayloadBay,
}

/// Tuning of the ascent integration and payload search.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SearchSettings {
    /// Payload increment between consecutive trials (kg).
    pub payload_step_kg: f64,
    /// Trials allowed before the search is declared non-terminating.
    pub max_iterations: usize,
    /// Samples on each integration segment, endpoints included.
    pub grid_points: usize,
    /// RK4 steps taken between consecutive grid samples.
    pub substeps_per_interval: usize,
    /// Burn time withheld from each integration window (s).
    pub burn_margin_s: f64,
    /// Altitude closing the vertical ascent phase (m).
    pub vertical_ascent_ceiling_m: f64,
    /// Altitude closing the gravity turn and triggering orbit insertion (m).
    pub insertion_altitude_m: f64,
    /// Altitude of the circular target orbit (m).
    pub target_orbit_altitude_m: f64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            payload_step_kg: 100.0,
            max_iterations: 10_000,
            grid_points: 500,
            substeps_per_interval: 8,
            burn_margin_s: 5.0,
            vertical_ascent_ceiling_m: 10_000.0,
            insertion_altitude_m: 100_000.0,
            target_orbit_altitude_m: 400_000.0,
        }
    }
}

impl SearchSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.payload_step_kg > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "payload_step_kg".to_string(),
                value: self.payload_step_kg,
            });
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_iterations".to_string(),
                value: 0.0,
            });
        }
        if self.grid_points < 2 {
            return Err(ConfigError::InvalidValue {
                field: "grid_points".to_string(),
                value: self.grid_points as f64,
            });
        }
        if self.substeps_per_interval == 0 {
            return Err(ConfigError::InvalidValue {
                field: "substeps_per_interval".to_string(),
                value: 0.0,
            });
        }
        if !(self.burn_margin_s >= 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "burn_margin_s".to_string(),
                value: self.burn_margin_s,
            });
        }
        if !(self.insertion_altitude_m > self.vertical_ascent_ceiling_m) {
            return Err(ConfigError::InvalidValue {
                field: "insertion_altitude_m".to_string(),
                value: self.insertion_altitude_m,
            });
        }
        Ok(())
    }
}

/// Errors that can occur while loading or validating documents.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read document: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("required field '{0}' is missing")]
    MissingField(&'static str),
    #[error("stage {stage} has neither a complete solid nor a complete liquid mass breakdown")]
    IncompleteStageMass { stage: usize },
    #[error("field '{field}' has invalid value {value}")]
    InvalidValue { field: String, value: f64 },
    #[error("vehicle document declares no stages")]
    NoStages,
}

/// Load and validate a vehicle document.
pub fn load_vehicle<P: AsRef<Path>>(path: P) -> Result<VehicleDocument, ConfigError> {
    let document: VehicleDocument = load_document(path)?;
    document.validate()?;
    Ok(document)
}

/// Load search settings, falling back to defaults for omitted fields.
pub fn load_search_settings<P: AsRef<Path>>(path: P) -> Result<SearchSettings, ConfigError> {
    let settings: SearchSettings = load_document(path)?;
    settings.validate()?;
    Ok(settings)
}

pub fn load_structural_input<P: AsRef<Path>>(path: P) -> Result<StructuralInput, ConfigError> {
    load_document(path)
}

pub fn load_thermal_input<P: AsRef<Path>>(path: P) -> Result<ThermalInput, ConfigError> {
    load_document(path)
}

pub fn load_payload_input<P: AsRef<Path>>(path: P) -> Result<PayloadInput, ConfigError> {
    load_document(path)
}

/// Read a single document, as TOML when the extension says so and as YAML otherwise.
/// JSON documents go through the YAML parser.
pub fn load_document<T, P>(path: P) -> Result<T, ConfigError>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if path.extension().map(|ext| ext == "toml").unwrap_or(false) {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    } else {
        let reader = File::open(path)?;
        Ok(serde_yaml::from_reader(reader)?)
    }
}
