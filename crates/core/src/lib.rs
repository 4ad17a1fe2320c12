//! Core constants and unit helpers shared by every rocket sizing tool.

/// Physical constants expressed in SI units.
pub mod constants {
    /// Gravity used by the ascent equation of motion (m/s²).
    pub const G: f64 = 9.81;
    /// Standard gravity used by the standard-atmosphere layer equations (m/s²).
    pub const G0: f64 = 9.80665;
    /// Earth's gravitational parameter (m³/s²).
    pub const MU_EARTH: f64 = 3.986_004_418e14;
    /// Earth radius used for the target circular orbit (m).
    pub const R_EARTH: f64 = 6_378_000.0;
    /// Altitude of the reference circular target orbit (m).
    pub const TARGET_ORBIT_ALTITUDE: f64 = 400_000.0;
    /// Sea-level air density (kg/m³).
    pub const RHO_SEA_LEVEL: f64 = 1.225;
}

/// Basic unit conversion helpers.
pub mod units {
    /// Convert degrees to radians.
    #[inline]
    pub fn deg_to_rad(v: f64) -> f64 {
        v.to_radians()
    }
}

/// Orbital helpers for circular target orbits.
pub mod orbit {
    use super::constants::{MU_EARTH, R_EARTH};

    /// Circular orbit speed at the given altitude above `R_EARTH` (m/s).
    #[inline]
    pub fn circular_velocity(altitude_m: f64) -> f64 {
        (MU_EARTH / (R_EARTH + altitude_m)).sqrt()
    }
}
