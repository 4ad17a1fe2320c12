//! Output documents of the sizing tools, written as JSON, plus trajectory CSV export.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sizing_constraints::{ConstraintReport, CostBreakdown};
use sizing_trajectory::{PayloadSolution, TrajectorySample};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Create a writer for the target path, handling stdout (`-`) by convention.
pub fn writer_for_path(path: &Path) -> io::Result<Box<dyn Write>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufWriter::new(io::stdout())));
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    Ok(Box::new(BufWriter::new(file)))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadMass {
    pub mass: f64,
}

/// Sampled ascent, one entry per sample in each vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryTable {
    pub height: Vec<f64>,
    pub velocity: Vec<f64>,
    #[serde(default)]
    pub time: Vec<f64>,
}

impl TrajectoryTable {
    pub fn from_samples(samples: &[TrajectorySample]) -> Self {
        Self {
            height: samples.iter().map(|s| s.altitude_m).collect(),
            velocity: samples.iter().map(|s| s.velocity_m_s).collect(),
            time: samples.iter().map(|s| s.time_s).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.height.len()
    }

    pub fn is_empty(&self) -> bool {
        self.height.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertionSummary {
    pub final_velocity_m_s: f64,
    pub orbital_velocity_m_s: f64,
    pub stage: usize,
}

/// Trajectory tool output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadOutput {
    pub payload: PayloadMass,
    pub trajectory: TrajectoryTable,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insertion: Option<InsertionSummary>,
    pub trials: usize,
    pub limiting_reason: String,
}

impl PayloadOutput {
    pub fn from_solution(solution: &PayloadSolution) -> Self {
        Self {
            payload: PayloadMass {
                mass: solution.payload_kg,
            },
            trajectory: TrajectoryTable::from_samples(&solution.record.samples),
            insertion: solution.record.insertion.map(|insertion| InsertionSummary {
                final_velocity_m_s: insertion.final_velocity_m_s,
                orbital_velocity_m_s: insertion.orbital_velocity_m_s,
                stage: insertion.stage,
            }),
            trials: solution.trials,
            limiting_reason: solution.limiting_reason.to_string(),
        }
    }
}

/// Output of a structural, thermal or payload volume check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintOutput {
    pub constraint: f64,
    pub satisfied: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critical_index: Option<usize>,
}

impl From<ConstraintReport> for ConstraintOutput {
    fn from(report: ConstraintReport) -> Self {
        Self {
            constraint: report.value,
            satisfied: report.is_satisfied(),
            critical_index: report.critical_index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostSummary {
    pub total_cost: f64,
    pub stages: Vec<StageCostSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageCostSummary {
    pub engines: f64,
    pub propellant: f64,
    pub structure: f64,
}

/// Cost tool output, totals in US dollars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostOutput {
    pub cost: CostSummary,
}

impl From<&CostBreakdown> for CostOutput {
    fn from(breakdown: &CostBreakdown) -> Self {
        Self {
            cost: CostSummary {
                total_cost: breakdown.total_usd,
                stages: breakdown
                    .stages
                    .iter()
                    .map(|stage| StageCostSummary {
                        engines: stage.engines_usd,
                        propellant: stage.propellant_usd,
                        structure: stage.structure_usd,
                    })
                    .collect(),
            },
        }
    }
}

/// Serialize any output document as pretty JSON.
pub fn write_json<T: Serialize>(path: &Path, document: &T) -> Result<(), ExportError> {
    let mut writer = writer_for_path(path)?;
    serde_json::to_writer_pretty(&mut writer, document)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

pub fn read_payload_output(path: &Path) -> Result<PayloadOutput, ExportError> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(io::BufReader::new(file))?)
}

#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    time_s: f64,
    height_m: f64,
    velocity_m_s: f64,
}

/// Write `time_s,height_m,velocity_m_s` rows, one per sample.
pub fn write_trajectory_csv(path: &Path, samples: &[TrajectorySample]) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_writer(writer_for_path(path)?);
    for sample in samples {
        writer.serialize(CsvRow {
            time_s: sample.time_s,
            height_m: sample.altitude_m,
            velocity_m_s: sample.velocity_m_s,
        })?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_trajectory_csv(path: &Path) -> Result<Vec<TrajectorySample>, ExportError> {
    let mut reader = csv::Reader::from_path(path)?;
    reader
        .deserialize::<CsvRow>()
        .map(|row| -> Result<TrajectorySample, ExportError> {
            let row = row?;
            Ok(TrajectorySample {
                time_s: row.time_s,
                altitude_m: row.height_m,
                velocity_m_s: row.velocity_m_s,
            })
        })
        .collect()
}
