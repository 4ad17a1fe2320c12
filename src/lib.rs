//! Rocket sizing toolkit.
//!
//! The member crates hold the physics; this facade re-exports them and wires each
//! tool end to end in [`tools`]: load the input documents, calculate, write the output.

pub use sizing_atmosphere as atmosphere;
pub use sizing_config as config;
pub use sizing_constraints as constraints;
pub use sizing_core as common;
pub use sizing_export as export;
pub use sizing_trajectory as trajectory;

pub mod logging;
pub mod tools;

/// Returns the version of the library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
