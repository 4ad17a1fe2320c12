//! End-to-end tool runners.

use std::path::Path;

use sizing_config::{
    self as config, ConfigError, PayloadInput, SearchSettings, StructuralInput, ThermalInput,
    VehicleDocument,
};
use sizing_constraints::{self as constraints, ConstraintError, StageCostInput};
use sizing_export::{self as export, ConstraintOutput, CostOutput, ExportError, PayloadOutput};
use sizing_trajectory::{PayloadSearch, PayloadSolution, SearchError, VehicleConfig, VehicleError};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("vehicle error: {0}")]
    Vehicle(#[from] VehicleError),
    #[error("payload search failed: {0}")]
    Search(#[from] SearchError),
    #[error("constraint evaluation failed: {0}")]
    Constraint(#[from] ConstraintError),
    #[error("export failed: {0}")]
    Export(#[from] ExportError),
}

/// Find the maximum payload of an already loaded vehicle.
pub fn size_vehicle(
    document: &VehicleDocument,
    settings: &SearchSettings,
) -> Result<PayloadSolution, ToolError> {
    let vehicle = VehicleConfig::from_document(document)?;
    let search = PayloadSearch::new(vehicle, settings)?;
    Ok(search.run()?)
}

/// Paths used by the trajectory tool.
#[derive(Debug, Clone, Copy)]
pub struct TrajectoryPaths<'a> {
    pub vehicle: &'a Path,
    /// Search settings document; defaults apply when absent.
    pub settings: Option<&'a Path>,
    pub output: &'a Path,
    /// Optional CSV copy of the accepted trajectory.
    pub csv: Option<&'a Path>,
}

pub fn run_trajectory_tool(paths: TrajectoryPaths<'_>) -> Result<PayloadOutput, ToolError> {
    let document = config::load_vehicle(paths.vehicle)?;
    let settings = match paths.settings {
        Some(path) => config::load_search_settings(path)?,
        None => SearchSettings::default(),
    };

    let solution = size_vehicle(&document, &settings)?;
    let output = PayloadOutput::from_solution(&solution);
    export::write_json(paths.output, &output)?;
    if let Some(csv) = paths.csv {
        export::write_trajectory_csv(csv, &solution.record.samples)?;
    }

    info!(
        payload_kg = solution.payload_kg,
        samples = output.trajectory.len(),
        trials = solution.trials,
        output = %paths.output.display(),
        "trajectory tool finished"
    );
    Ok(output)
}

pub fn run_structural_tool(input: &Path, output: &Path) -> Result<ConstraintOutput, ToolError> {
    let StructuralInput {
        structure,
        trajectory,
    } = config::load_structural_input(input)?;
    let report = constraints::structural(&structure, &trajectory)?;
    finish("structural", report.into(), output)
}

pub fn run_thermal_tool(input: &Path, output: &Path) -> Result<ConstraintOutput, ToolError> {
    let ThermalInput {
        temperature,
        trajectory,
    } = config::load_thermal_input(input)?;
    let report = constraints::thermal(&temperature, &trajectory)?;
    finish("thermal", report.into(), output)
}

pub fn run_payload_volume_tool(input: &Path, output: &Path) -> Result<ConstraintOutput, ToolError> {
    let PayloadInput { payload } = config::load_payload_input(input)?;
    let report = constraints::payload_volume(&payload)?;
    finish("payload volume", report.into(), output)
}

/// Production cost of the vehicle described by a vehicle document.
pub fn run_cost_tool(vehicle: &Path, output: &Path) -> Result<CostOutput, ToolError> {
    let document = config::load_vehicle(vehicle)?;
    let stages = StageCostInput::from_document(&document)?;
    let breakdown = constraints::launcher_cost(&stages)?;
    let result = CostOutput::from(&breakdown);
    export::write_json(output, &result)?;
    info!(
        total_usd = breakdown.total_usd,
        output = %output.display(),
        "cost tool finished"
    );
    Ok(result)
}

fn finish(
    tool: &str,
    result: ConstraintOutput,
    output: &Path,
) -> Result<ConstraintOutput, ToolError> {
    export::write_json(output, &result)?;
    info!(
        tool,
        constraint = result.constraint,
        satisfied = result.satisfied,
        "constraint tool finished"
    );
    Ok(result)
}
