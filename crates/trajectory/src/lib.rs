//! Ascent trajectory integration with a maximum payload search.
//!
//! [`PayloadSearch`] drives [`AscentSimulator`] with increasing trial payloads. Each trial
//! flies the vehicle through a vertical ascent and a gravity turn, integrating one stage
//! burn at a time with [`StageIntegrator`], and closes with an impulsive orbit insertion.

pub mod aero;
pub mod ascent;
pub mod dynamics;
pub mod integrator;
pub mod search;
pub mod vehicle;

pub use aero::AeroParams;
pub use ascent::{AscentRecord, AscentSimulator, InfeasibleReason, Insertion, Phase, TrialOutcome};
pub use dynamics::{AscentDynamics, BurnContext, EquationsOfMotion, FlightState};
pub use integrator::{IntegrationError, Rk4, Segment, StageIntegrator, TrajectorySample};
pub use search::{PayloadSearch, PayloadSolution, SearchError};
pub use vehicle::{DragShape, StageSpec, VehicleConfig, VehicleError};
